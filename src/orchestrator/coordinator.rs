//! 每日协调器 - 协调层
//!
//! 职责：
//! - 按日期解析当日谜题：先查缓存，未命中才触发生成
//! - 同进程并发请求同一日期时合并为一次生成（进程内单飞）
//! - 生成失败时接入兜底链，保证 resolve 是全函数：任意日期都返回谜题
//!
//! 正确性以存储层唯一索引为准：进程内锁只是省钱手段，
//! 多实例并发下靠 `scheduled_for` 唯一约束兜底，冲突方丢弃自己的
//! 结果并回读赢家。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::infrastructure::PuzzleStore;
use crate::models::{GenerationAttemptLog, PuzzleRecord};
use crate::services::{
    weekday_target_difficulty, CandidateGenerator, FingerprintService, GenerationRequest,
};
use crate::workflow::{AcceptedGeneration, FallbackChain, GenerationFlow};

/// 每日协调器
pub struct DailyCoordinator {
    store: Arc<PuzzleStore>,
    flow: GenerationFlow,
    fallback: FallbackChain,
    fingerprints: FingerprintService,
    puzzle_type: String,
    /// 进程内按日期合并并发生成的锁表
    inflight: Mutex<HashMap<NaiveDate, Arc<Mutex<()>>>>,
}

impl DailyCoordinator {
    /// 创建新的协调器
    pub fn new(config: &Config, store: Arc<PuzzleStore>, generator: CandidateGenerator) -> Self {
        Self {
            store,
            flow: GenerationFlow::new(config, generator),
            fallback: FallbackChain::new(),
            fingerprints: FingerprintService::new(),
            puzzle_type: config.puzzle_type.clone(),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// 生成流程（预览接口借用）
    pub fn flow(&self) -> &GenerationFlow {
        &self.flow
    }

    /// 解析指定日期的谜题
    ///
    /// 全函数：缓存命中直接返回；未命中则生成；生成失败走兜底链；
    /// 兜底落库失败返回应急谜题。本方法绝不返回错误。
    pub async fn resolve(&self, date: NaiveDate) -> PuzzleRecord {
        // 第一次缓存检查：读失败按未命中处理
        match self.store.find_by_date(date) {
            Ok(Some(record)) => {
                info!("✓ 缓存命中: {} (方式: {})", date, record.generation_method.as_str());
                return record;
            }
            Ok(None) => {}
            Err(e) => warn!("⚠️ 缓存读取失败，按未命中处理: {}", e),
        }

        // 进程内按日期单飞：同日期并发请求只有一个真正生成
        let date_lock = {
            let mut table = self.inflight.lock().await;
            table.entry(date).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        let _guard = date_lock.lock().await;

        // 拿到锁后复查：等待期间可能已有请求完成落库
        if let Ok(Some(record)) = self.store.find_by_date(date) {
            info!("✓ 等锁期间已落库: {}", date);
            self.release_inflight(date).await;
            return record;
        }

        let record = self.generate_and_persist(date).await;
        self.release_inflight(date).await;
        record
    }

    /// 生成并持久化一条谜题记录
    async fn generate_and_persist(&self, date: NaiveDate) -> PuzzleRecord {
        let request = GenerationRequest {
            target_difficulty: weekday_target_difficulty(date),
            puzzle_type: self.puzzle_type.clone(),
            category: None,
            theme: None,
        };

        info!(
            "🚀 开始生成: {} (目标难度: {})",
            date, request.target_difficulty
        );

        match self.flow.generate(&self.store, date, &request).await {
            Ok(accepted) => self.persist_accepted(date, accepted),
            Err(e) => {
                error!("❌ 生成彻底失败，进入兜底链: {} ({})", date, e);
                self.resolve_fallback(date).await
            }
        }
    }

    /// 落库一条通过闸门的生成结果
    ///
    /// 唯一约束冲突说明别的实例已赢得该日期，丢弃本地结果回读赢家；
    /// 其它存储错误返回未落库的记录（可用性优先于持久化）
    fn persist_accepted(&self, date: NaiveDate, accepted: AcceptedGeneration) -> PuzzleRecord {
        let AcceptedGeneration {
            candidate,
            metrics,
            fingerprint,
            profile,
            mut attempt_log,
        } = accepted;

        let record = PuzzleRecord {
            id: Uuid::new_v4(),
            content: candidate.content,
            answer: candidate.answer,
            explanation: candidate.explanation,
            difficulty: profile.calibrated,
            hints: candidate.hints,
            scheduled_for: date,
            generation_method: crate::models::GenerationMethod::AiGenerated,
            fallback_tier: crate::models::FallbackTier::None,
            ai_model: Some(self.flow.model_name().to_string()),
            quality_score: Some(metrics.overall_score),
            uniqueness_score: Some(f64::from(profile.pattern_novelty) * 10.0),
            created_at: Utc::now(),
        };

        match self
            .store
            .insert_resolved(&record, &fingerprint, Some(&metrics), Some(&profile))
        {
            Ok(()) => {
                info!(
                    "📤 谜题落库: {} (难度: {}, 质量: {:.1})",
                    date, record.difficulty, metrics.overall_score
                );
                attempt_log.puzzle_id = Some(record.id);
                self.log_attempt(&attempt_log);
                record
            }
            Err(e) if e.is_conflict() => {
                info!("⚠️ 落库冲突，回读赢家记录: {}", date);
                match self.store.find_by_date(date) {
                    Ok(Some(winner)) => winner,
                    _ => {
                        warn!("⚠️ 冲突后回读失败，返回未落库记录: {}", date);
                        record
                    }
                }
            }
            Err(e) => {
                error!("❌ 落库失败，返回未落库记录: {} ({})", date, e);
                record
            }
        }
    }

    /// 兜底链解析
    ///
    /// 确定性兜底谜题的指纹加日期盐，池内容跨日期复用不触发指纹冲突
    async fn resolve_fallback(&self, date: NaiveDate) -> PuzzleRecord {
        let started = Instant::now();
        let record = self.fallback.select(date);
        let salt = date.to_string();
        let fingerprint = self.fingerprints.compute_parts(
            &record.content,
            &record.answer,
            "fallback_pool",
            Some(&salt),
        );

        match self.store.insert_resolved(&record, &fingerprint, None, None) {
            Ok(()) => {
                self.log_attempt(&fallback_attempt_log(
                    Some(record.id),
                    date,
                    "fallback_pool",
                    started,
                ));
                record
            }
            Err(e) if e.is_conflict() => {
                info!("⚠️ 兜底落库冲突，回读赢家记录: {}", date);
                match self.store.find_by_date(date) {
                    Ok(Some(winner)) => winner,
                    _ => record,
                }
            }
            Err(e) => {
                // 存储不可达：最后一道防线，不再尝试持久化
                error!("❌ 兜底落库失败，返回应急谜题: {} ({})", date, e);
                let emergency = self.fallback.emergency(date);
                self.log_attempt(&fallback_attempt_log(
                    Some(emergency.id),
                    date,
                    "emergency",
                    started,
                ));
                emergency
            }
        }
    }

    /// 尝试日志尽力而为，失败只告警不影响主流程
    fn log_attempt(&self, log: &GenerationAttemptLog) {
        if let Err(e) = self.store.insert_attempt_log(log) {
            warn!("⚠️ 尝试日志写入失败: {}", e);
        }
    }

    async fn release_inflight(&self, date: NaiveDate) {
        let mut table = self.inflight.lock().await;
        table.remove(&date);
    }
}

fn fallback_attempt_log(
    puzzle_id: Option<Uuid>,
    date: NaiveDate,
    method: &str,
    started: Instant,
) -> GenerationAttemptLog {
    GenerationAttemptLog {
        puzzle_id,
        scheduled_for: date,
        method: method.to_string(),
        attempt: 1,
        candidates_seen: 0,
        elapsed_ms: started.elapsed().as_millis() as u64,
        provider: "fallback".to_string(),
        model: "none".to_string(),
        estimated_tokens: 0,
        created_at: Utc::now(),
    }
}
