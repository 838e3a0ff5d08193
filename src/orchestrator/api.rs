//! 公共 API - 协调层对外入口
//!
//! 职责：
//! - 组装存储、AI 提供方与协调器
//! - 暴露稳定的消费接口：当日谜题、指定日期谜题、预生成、干跑预览
//! - 在边界做输入校验（日期格式、预览范围上限）

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::clients::{ChatProvider, OpenAiProvider};
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::infrastructure::PuzzleStore;
use crate::models::{DifficultyProfile, PuzzleCandidate, PuzzleRecord, QualityMetrics};
use crate::services::{weekday_target_difficulty, CandidateGenerator, GenerationRequest};

use super::coordinator::DailyCoordinator;

/// 日期范围预览的上限（天）
const MAX_PREVIEW_DAYS: i64 = 90;

/// 干跑预览结果（不落库）
#[derive(Debug, Clone, Serialize)]
pub struct GenerationPreview {
    pub candidate: PuzzleCandidate,
    pub metrics: QualityMetrics,
    pub profile: DifficultyProfile,
}

/// 范围预览中的单日条目
#[derive(Debug, Serialize)]
pub struct DatePreview {
    pub date: NaiveDate,
    pub target_difficulty: u8,
    pub preview: Option<GenerationPreview>,
    pub error: Option<String>,
}

/// 谜题流水线应用
///
/// 持有全部长生命周期资源，消费方只跟它交互
pub struct App {
    config: Config,
    store: Arc<PuzzleStore>,
    coordinator: DailyCoordinator,
}

impl App {
    /// 按配置初始化整条流水线
    ///
    /// 数据库文件打不开时降级为内存库继续服务（缓存跨进程失效，
    /// 但解析入口保持可用），只有内存库也建不起来才返回错误
    pub fn initialize(config: Config) -> Result<Self> {
        let store = match PuzzleStore::open(&config.database_path) {
            Ok(store) => store,
            Err(e) => {
                warn!(
                    "⚠️ 打开谜题库失败，降级为内存库: {} ({})",
                    config.database_path, e
                );
                PuzzleStore::open_in_memory().context("内存谜题库初始化失败")?
            }
        };
        let provider: Arc<dyn ChatProvider> = Arc::new(OpenAiProvider::new(&config));
        Ok(Self::with_provider(config, Arc::new(store), provider))
    }

    /// 用指定提供方组装应用（测试注入点）
    pub fn with_provider(
        config: Config,
        store: Arc<PuzzleStore>,
        provider: Arc<dyn ChatProvider>,
    ) -> Self {
        let generator = CandidateGenerator::new(provider);
        let coordinator = DailyCoordinator::new(&config, Arc::clone(&store), generator);
        Self {
            config,
            store,
            coordinator,
        }
    }

    /// 配置只读访问
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 存储只读访问（测试与运维工具用）
    pub fn store(&self) -> &Arc<PuzzleStore> {
        &self.store
    }

    /// 获取今天的谜题
    ///
    /// 全函数：任何情况下都返回一条谜题记录
    pub async fn get_todays_puzzle(&self) -> PuzzleRecord {
        self.coordinator.resolve(Utc::now().date_naive()).await
    }

    /// 获取指定日期的谜题
    ///
    /// # 参数
    /// - `date`: YYYY-MM-DD 格式字符串，格式非法返回 `MalformedDate`
    pub async fn get_puzzle_for_date(&self, date: &str) -> PipelineResult<PuzzleRecord> {
        let parsed = parse_date(date)?;
        Ok(self.coordinator.resolve(parsed).await)
    }

    /// 定时任务入口：提前填充当日缓存
    ///
    /// 与 `get_todays_puzzle` 等价，在低峰期由 cron 调用，
    /// 让首个用户请求直接命中缓存
    pub async fn generate_next_puzzle(&self) -> PuzzleRecord {
        let today = Utc::now().date_naive();
        info!("🗓️ 定时预生成当日谜题: {}", today);
        self.coordinator.resolve(today).await
    }

    /// 干跑一次生成（不落库）
    ///
    /// 返回候选、质量评分与难度档案，供调参和提示词调试
    pub async fn preview_generation(
        &self,
        request: &GenerationRequest,
    ) -> PipelineResult<GenerationPreview> {
        let date = Utc::now().date_naive();
        let accepted = self.coordinator.flow().generate(&self.store, date, request).await?;
        Ok(GenerationPreview {
            candidate: accepted.candidate,
            metrics: accepted.metrics,
            profile: accepted.profile,
        })
    }

    /// 对一段日期范围逐日干跑预览（不落库）
    ///
    /// 范围闭区间，最长 90 天；单日失败不终止整体，错误记在该日条目上
    pub async fn generate_date_range_preview(
        &self,
        start: &str,
        end: &str,
    ) -> PipelineResult<Vec<DatePreview>> {
        let start = parse_date(start)?;
        let end = parse_date(end)?;
        if end < start {
            return Err(PipelineError::MalformedDate(format!(
                "结束日期 {} 早于开始日期 {}",
                end, start
            )));
        }

        let days = (end - start).num_days() + 1;
        if days > MAX_PREVIEW_DAYS {
            return Err(PipelineError::PreviewRangeTooLarge {
                days,
                max: MAX_PREVIEW_DAYS,
            });
        }

        info!("🔍 范围预览: {} → {} ({} 天)", start, end, days);

        let mut previews = Vec::with_capacity(days as usize);
        for offset in 0..days {
            let date = start + Duration::days(offset);
            let target_difficulty = weekday_target_difficulty(date);
            let request = GenerationRequest {
                target_difficulty,
                puzzle_type: self.config.puzzle_type.clone(),
                category: None,
                theme: None,
            };

            let entry = match self.coordinator.flow().generate(&self.store, date, &request).await {
                Ok(accepted) => DatePreview {
                    date,
                    target_difficulty,
                    preview: Some(GenerationPreview {
                        candidate: accepted.candidate,
                        metrics: accepted.metrics,
                        profile: accepted.profile,
                    }),
                    error: None,
                },
                Err(e) => DatePreview {
                    date,
                    target_difficulty,
                    preview: None,
                    error: Some(e.to_string()),
                },
            };
            previews.push(entry);
        }

        Ok(previews)
    }
}

/// 解析 YYYY-MM-DD 日期字符串
fn parse_date(date: &str) -> PipelineResult<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| PipelineError::MalformedDate(date.to_string()))
}
