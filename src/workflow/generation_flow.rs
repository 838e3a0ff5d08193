//! 生成流程 - 流程层
//!
//! 核心职责：定义"一次生成"的完整尝试循环
//!
//! 流程顺序（每次尝试）：
//! 1. 调用提供方生成候选（带硬截止时间）
//! 2. 唯一性闸门（指纹预检）
//! 3. 质量闸门（判级 + 对抗性检查）
//!
//! 先查唯一性再评质量：注定重复的候选不值得花一次质量评分。
//! 提供方瞬时错误也消耗尝试预算——尝试就是尝试，
//! 适配器内部的退避重试是另一本账。

use std::time::Instant;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{PipelineError, ProviderError};
use crate::infrastructure::PuzzleStore;
use crate::models::{
    DifficultyProfile, Fingerprint, GenerationAttemptLog, PuzzleCandidate, QualityMetrics,
};
use crate::services::{
    CandidateGenerator, DifficultyCalibrator, FingerprintService, GenerationRequest, QualityGate,
};

/// 通过两道闸门的采纳结果
#[derive(Debug, Clone)]
pub struct AcceptedGeneration {
    pub candidate: PuzzleCandidate,
    pub metrics: QualityMetrics,
    pub fingerprint: Fingerprint,
    pub profile: DifficultyProfile,
    pub attempt_log: GenerationAttemptLog,
}

/// 生成流程
///
/// - 编排完整的尝试循环
/// - 决定何时生成、何时查重、何时评分
/// - 不持有任何资源（数据库连接由调用方借入）
/// - 只依赖业务能力（services）
pub struct GenerationFlow {
    generator: CandidateGenerator,
    quality_gate: QualityGate,
    fingerprints: FingerprintService,
    calibrator: DifficultyCalibrator,
    max_attempts: u32,
}

impl GenerationFlow {
    /// 创建新的生成流程
    pub fn new(config: &Config, generator: CandidateGenerator) -> Self {
        Self {
            generator,
            quality_gate: QualityGate::new(config),
            fingerprints: FingerprintService::new(),
            calibrator: DifficultyCalibrator::new(),
            max_attempts: config.max_attempts,
        }
    }

    /// 生成所用模型名
    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    /// 在尝试预算内生成一个可采纳的候选
    ///
    /// 预算耗尽返回 `TotalGenerationFailure`，由调用方触发兜底链
    pub async fn generate(
        &self,
        store: &PuzzleStore,
        date: NaiveDate,
        request: &GenerationRequest,
    ) -> Result<AcceptedGeneration, PipelineError> {
        for attempt in 1..=self.max_attempts {
            let started = Instant::now();

            // ========== 第一步：生成候选 ==========
            let (candidate, estimated_tokens) = match self.generator.generate(request).await {
                Ok(result) => result,
                Err(ProviderError::QuotaExceeded { reset_hint }) => {
                    // 配额错误单独打日志，让运维看到恢复时间估计
                    warn!(
                        "[尝试 {}/{}] ⚠️ LLM 配额耗尽，预计恢复: {}",
                        attempt, self.max_attempts, reset_hint
                    );
                    continue;
                }
                Err(e) => {
                    warn!("[尝试 {}/{}] ⚠️ 生成失败: {}", attempt, self.max_attempts, e);
                    continue;
                }
            };

            // ========== 第二步：唯一性闸门 ==========
            let fingerprint = self.fingerprints.compute(&candidate);
            match self.fingerprints.is_unique(store, &fingerprint) {
                Ok(false) => {
                    info!(
                        "[尝试 {}/{}] 指纹与历史谜题重复，丢弃候选 (答案: {})",
                        attempt, self.max_attempts, fingerprint.normalized_answer
                    );
                    continue;
                }
                Ok(true) => {}
                Err(e) => {
                    // 预检只是优化；存储暂时不可用时放行，落库时的唯一索引兜底
                    warn!("[尝试 {}/{}] 指纹预检失败，跳过预检: {}", attempt, self.max_attempts, e);
                }
            }

            // ========== 第三步：质量闸门 ==========
            let metrics = self.quality_gate.score(&candidate);
            if !metrics.verdict.is_acceptable() || !metrics.adversarial_passed {
                info!(
                    "[尝试 {}/{}] 质量不达标，丢弃候选 (判级: {}, 对抗检查: {})",
                    attempt,
                    self.max_attempts,
                    metrics.verdict.as_str(),
                    metrics.adversarial_passed
                );
                continue;
            }

            // ========== 采纳 ==========
            let profile = self.calibrator.calibrate(&candidate, request.target_difficulty);
            let attempt_log = GenerationAttemptLog {
                puzzle_id: None,
                scheduled_for: date,
                method: "ai_generated".to_string(),
                attempt,
                candidates_seen: attempt,
                elapsed_ms: started.elapsed().as_millis() as u64,
                provider: self.generator.provider_name().to_string(),
                model: self.generator.model_name().to_string(),
                estimated_tokens,
                created_at: Utc::now(),
            };

            info!(
                "✓ 第 {} 次尝试采纳候选 (总分 {:.1}, 校准难度 {})",
                attempt, metrics.overall_score, profile.calibrated
            );

            return Ok(AcceptedGeneration {
                candidate,
                metrics,
                fingerprint,
                profile,
                attempt_log,
            });
        }

        warn!("❌ 生成彻底失败: {} 次尝试均未产出可用谜题", self.max_attempts);
        Err(PipelineError::TotalGenerationFailure {
            attempts: self.max_attempts,
        })
    }
}
