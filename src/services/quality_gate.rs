//! 质量闸门 - 业务能力层
//!
//! 只负责"候选打分"能力，纯函数、无状态，不关心流程
//!
//! ## 评分规则
//!
//! 七个维度按固定权重合成总分（权重之和为 1，长期稳定）：
//!
//! | 维度 | 权重 |
//! |------|------|
//! | 清晰度 clarity | 0.20 |
//! | 可解性 solvability | 0.20 |
//! | 创意性 creativity | 0.15 |
//! | 趣味性 fun_factor | 0.15 |
//! | 适宜性 appropriateness | 0.10 |
//! | 视觉表现 visual_appeal | 0.10 |
//! | 知识价值 educational_value | 0.10 |
//!
//! 判级阈值来自配置而非硬编码；对抗性压力检查独立于分数，
//! 可以一票否决高分候选。

use tracing::debug;

use crate::config::Config;
use crate::models::{PuzzleCandidate, QualityMetrics, Verdict};

// 固定权重，见模块文档
const WEIGHT_CLARITY: f64 = 0.20;
const WEIGHT_CREATIVITY: f64 = 0.15;
const WEIGHT_SOLVABILITY: f64 = 0.20;
const WEIGHT_APPROPRIATENESS: f64 = 0.10;
const WEIGHT_VISUAL_APPEAL: f64 = 0.10;
const WEIGHT_EDUCATIONAL_VALUE: f64 = 0.10;
const WEIGHT_FUN_FACTOR: f64 = 0.15;

/// 判级阈值（总分 0-100）
#[derive(Debug, Clone)]
pub struct VerdictThresholds {
    pub excellent: f64,
    pub good: f64,
    pub acceptable: f64,
    pub needs_work: f64,
}

impl VerdictThresholds {
    pub fn from_config(config: &Config) -> Self {
        Self {
            excellent: config.threshold_excellent,
            good: config.threshold_good,
            acceptable: config.threshold_acceptable,
            needs_work: config.threshold_needs_work,
        }
    }
}

/// 质量闸门
///
/// 职责：
/// - 合成七维分为总分并判级
/// - 对抗性压力检查（歧义一票否决）
/// - 只处理单个候选
/// - 不关心流程顺序
pub struct QualityGate {
    thresholds: VerdictThresholds,
}

impl QualityGate {
    /// 创建新的质量闸门
    pub fn new(config: &Config) -> Self {
        Self {
            thresholds: VerdictThresholds::from_config(config),
        }
    }

    /// 给候选打分
    pub fn score(&self, candidate: &PuzzleCandidate) -> QualityMetrics {
        let d = &candidate.scores;
        let overall_score = d.clarity * WEIGHT_CLARITY
            + d.creativity * WEIGHT_CREATIVITY
            + d.solvability * WEIGHT_SOLVABILITY
            + d.appropriateness * WEIGHT_APPROPRIATENESS
            + d.visual_appeal * WEIGHT_VISUAL_APPEAL
            + d.educational_value * WEIGHT_EDUCATIONAL_VALUE
            + d.fun_factor * WEIGHT_FUN_FACTOR;

        let verdict = self.verdict_for(overall_score);
        let adversarial_passed = self.adversarial_check(candidate);

        debug!(
            "质量评分: 总分 {:.1}, 判级 {}, 对抗检查 {}",
            overall_score,
            verdict.as_str(),
            if adversarial_passed { "通过" } else { "否决" }
        );

        QualityMetrics {
            dimensions: *d,
            overall_score,
            verdict,
            adversarial_passed,
        }
    }

    /// 总分 → 判级
    fn verdict_for(&self, overall_score: f64) -> Verdict {
        if overall_score >= self.thresholds.excellent {
            Verdict::Excellent
        } else if overall_score >= self.thresholds.good {
            Verdict::Good
        } else if overall_score >= self.thresholds.acceptable {
            Verdict::Acceptable
        } else if overall_score >= self.thresholds.needs_work {
            Verdict::NeedsWork
        } else {
            Verdict::Reject
        }
    }

    /// 对抗性压力检查
    ///
    /// 针对歧义和结构缺陷的独立检查，任一命中即否决：
    /// - 模型自报谜面有歧义
    /// - 答案原文泄露在谜面中
    /// - 缺少解析或提示
    /// - 谜面为空或没有任何符号字形
    fn adversarial_check(&self, candidate: &PuzzleCandidate) -> bool {
        if candidate.ambiguous {
            return false;
        }

        let content_lower = candidate.content.to_lowercase();
        let answer_lower = candidate.answer.to_lowercase();
        if !answer_lower.is_empty() && content_lower.contains(&answer_lower) {
            return false;
        }

        if candidate.explanation.trim().is_empty() || candidate.hints.is_empty() {
            return false;
        }

        let has_glyph = candidate
            .content
            .chars()
            .any(|c| !c.is_alphanumeric() && !c.is_whitespace() && !c.is_ascii_punctuation());
        if candidate.content.trim().is_empty() || !has_glyph {
            return false;
        }

        true
    }
}
