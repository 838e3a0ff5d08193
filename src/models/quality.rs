//! 质量评分数据模型

use serde::{Deserialize, Serialize};

/// 七维质量分（0-100）
///
/// 由模型自评产出，质量闸门按固定权重合成总分
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DimensionScores {
    /// 清晰度
    pub clarity: f64,
    /// 创意性
    pub creativity: f64,
    /// 可解性
    pub solvability: f64,
    /// 内容适宜性
    pub appropriateness: f64,
    /// 视觉表现
    pub visual_appeal: f64,
    /// 知识价值
    pub educational_value: f64,
    /// 趣味性
    pub fun_factor: f64,
}

/// 分类判级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Excellent,
    Good,
    Acceptable,
    NeedsWork,
    Reject,
}

impl Verdict {
    /// 是否达到编排器的采纳线
    ///
    /// 只有 Excellent / Good / Acceptable 三级可被采纳
    pub fn is_acceptable(&self) -> bool {
        matches!(self, Verdict::Excellent | Verdict::Good | Verdict::Acceptable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Excellent => "excellent",
            Verdict::Good => "good",
            Verdict::Acceptable => "acceptable",
            Verdict::NeedsWork => "needs_work",
            Verdict::Reject => "reject",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "excellent" => Verdict::Excellent,
            "good" => Verdict::Good,
            "acceptable" => Verdict::Acceptable,
            "needs_work" => Verdict::NeedsWork,
            _ => Verdict::Reject,
        }
    }
}

/// 单个候选的质量评分结果
///
/// 每次生成尝试产出一份；只有被采纳候选的评分会随谜题持久化
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// 七维分
    pub dimensions: DimensionScores,
    /// 加权总分（0-100）
    pub overall_score: f64,
    /// 分类判级
    pub verdict: Verdict,
    /// 对抗性压力检查是否通过（可一票否决高分候选）
    pub adversarial_passed: bool,
}
