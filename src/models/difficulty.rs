//! 难度数据模型
//!
//! 数值难度（1-10）是生成与校准的规范刻度；
//! 分类难度（easy / medium / hard）只通过 `DifficultyBand::from_numeric`
//! 这一张转换表产生，全仓库不允许出现第二张映射。

use serde::{Deserialize, Serialize};

/// 分类难度档位
///
/// 规范转换表：1-3 = easy，4-6 = medium，7-10 = hard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DifficultyBand {
    Easy,
    Medium,
    Hard,
}

impl DifficultyBand {
    /// 数值难度 → 分类档位的唯一规范映射
    pub fn from_numeric(difficulty: u8) -> Self {
        match difficulty {
            0..=3 => DifficultyBand::Easy,
            4..=6 => DifficultyBand::Medium,
            _ => DifficultyBand::Hard,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyBand::Easy => "easy",
            DifficultyBand::Medium => "medium",
            DifficultyBand::Hard => "hard",
        }
    }
}

/// 难度校准档案
///
/// 把三个独立难度估计（目标值 / AI 实测值 / 规则计算值）
/// 调和成一个 1-10 的校准值，并附带五个子维度分供分析使用。
/// 子维度不参与采纳判断。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifficultyProfile {
    /// 生成器的目标难度
    pub proposed: u8,
    /// AI 实测难度
    pub ai_tested: u8,
    /// 规则计算难度
    pub rule_calculated: u8,
    /// 调和后的校准难度（1-10）
    pub calibrated: u8,
    /// 视觉歧义度（1-10）
    pub visual_ambiguity: u8,
    /// 认知步数（1-10）
    pub cognitive_steps: u8,
    /// 文化知识依赖（1-10）
    pub cultural_knowledge: u8,
    /// 词汇水平（1-10）
    pub vocabulary_level: u8,
    /// 模式新颖度（1-10）
    pub pattern_novelty: u8,
}
