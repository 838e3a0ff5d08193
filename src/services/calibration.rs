//! 难度校准服务 - 业务能力层
//!
//! 只负责"难度调和"能力，纯函数、无状态，不关心流程
//!
//! ## 调和规则
//!
//! 三个独立难度估计按固定权重调和，四舍五入到整数并夹在 1-10 内，
//! 绝不静默偏袒单一来源：
//!
//! calibrated = round(0.3 × proposed + 0.4 × ai_tested + 0.3 × rule_calculated)
//!
//! 周几 → 目标难度的固定查表只作为编排器的初始 `target_difficulty`
//! 输入，与校准本身无关。

use chrono::{Datelike, NaiveDate};
use phf::phf_map;
use tracing::debug;

use crate::models::{DifficultyProfile, PuzzleCandidate};

// 调和权重：AI 实测值略重，目标值与规则值对称
const WEIGHT_PROPOSED: f64 = 0.3;
const WEIGHT_AI_TESTED: f64 = 0.4;
const WEIGHT_RULE: f64 = 0.3;

/// 周几 → 当日目标难度
///
/// 周三最难（7），周末偏易，键为 chrono 的三字母缩写
static WEEKDAY_TARGET: phf::Map<&'static str, u8> = phf_map! {
    "Sun" => 5u8,
    "Mon" => 4u8,
    "Tue" => 5u8,
    "Wed" => 7u8,
    "Thu" => 6u8,
    "Fri" => 5u8,
    "Sat" => 4u8,
};

/// 指定日期的目标难度
pub fn weekday_target_difficulty(date: NaiveDate) -> u8 {
    WEEKDAY_TARGET
        .get(date.weekday().to_string().as_str())
        .copied()
        .unwrap_or(5)
}

/// 难度校准服务
///
/// 职责：
/// - 调和三个独立难度估计为一个校准值
/// - 从谜面结构推导规则难度和五维子档案
/// - 只处理单个候选
/// - 不关心流程顺序
pub struct DifficultyCalibrator;

impl DifficultyCalibrator {
    /// 创建新的校准服务
    pub fn new() -> Self {
        Self
    }

    /// 为候选生成完整难度档案
    ///
    /// `proposed` 是生成时的目标难度；AI 实测值缺失时退回目标值
    pub fn calibrate(&self, candidate: &PuzzleCandidate, proposed: u8) -> DifficultyProfile {
        let ai_tested = candidate.ai_tested_difficulty.unwrap_or(proposed);
        let rule_calculated = self.rule_difficulty(candidate);
        let calibrated = reconcile(proposed, ai_tested, rule_calculated);

        let glyphs = glyph_count(&candidate.content);
        let answer_len = candidate
            .answer
            .chars()
            .filter(|c| c.is_alphanumeric())
            .count();

        let profile = DifficultyProfile {
            proposed,
            ai_tested,
            rule_calculated,
            calibrated,
            visual_ambiguity: clamp_difficulty(2 + glyphs as i32),
            cognitive_steps: clamp_difficulty(candidate.content.chars().count() as i32 / 4),
            cultural_knowledge: cultural_knowledge(&candidate.pattern_type),
            vocabulary_level: clamp_difficulty(answer_len as i32 / 2),
            pattern_novelty: pattern_novelty(&candidate.pattern_type),
        };

        debug!(
            "难度校准: 目标 {} / 实测 {} / 规则 {} → 校准 {}",
            proposed, ai_tested, rule_calculated, calibrated
        );

        profile
    }

    /// 规则难度：从谜面结构计算
    ///
    /// 基线 5；字形数 ≥5 加 2、≥3 加 1；长答案加 1、短答案减 1；
    /// 提示 ≥3 条减 1
    pub fn rule_difficulty(&self, candidate: &PuzzleCandidate) -> u8 {
        let glyphs = glyph_count(&candidate.content);
        let answer_len = candidate
            .answer
            .chars()
            .filter(|c| c.is_alphanumeric())
            .count();

        let mut score: i32 = 5;
        if glyphs >= 5 {
            score += 2;
        } else if glyphs >= 3 {
            score += 1;
        }
        if answer_len > 12 {
            score += 1;
        } else if answer_len < 5 {
            score -= 1;
        }
        if candidate.hints.len() >= 3 {
            score -= 1;
        }
        clamp_difficulty(score)
    }
}

impl Default for DifficultyCalibrator {
    fn default() -> Self {
        Self::new()
    }
}

/// 三估计调和：加权平均四舍五入，夹在 1-10
pub fn reconcile(proposed: u8, ai_tested: u8, rule_calculated: u8) -> u8 {
    let weighted = proposed as f64 * WEIGHT_PROPOSED
        + ai_tested as f64 * WEIGHT_AI_TESTED
        + rule_calculated as f64 * WEIGHT_RULE;
    clamp_difficulty(weighted.round() as i32)
}

fn clamp_difficulty(value: i32) -> u8 {
    value.clamp(1, 10) as u8
}

fn glyph_count(content: &str) -> usize {
    content
        .chars()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace() && !c.is_ascii_punctuation())
        .count()
}

/// 模式分类 → 文化知识依赖（1-10）
fn cultural_knowledge(pattern_type: &str) -> u8 {
    match pattern_type {
        "phonetic" => 7,
        "visual_pun" => 6,
        _ => 4,
    }
}

/// 模式分类 → 新颖度基分（1-10）
///
/// 被采纳候选的独特性评分 = pattern_novelty × 10（0-100 刻度）
fn pattern_novelty(pattern_type: &str) -> u8 {
    match pattern_type {
        "visual_pun" => 7,
        "phonetic" => 6,
        "compound_words" => 4,
        _ => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DimensionScores;

    fn candidate(content: &str, answer: &str, hints: usize) -> PuzzleCandidate {
        PuzzleCandidate {
            content: content.to_string(),
            answer: answer.to_string(),
            explanation: "解析".to_string(),
            difficulty: 5,
            hints: (0..hints).map(|i| format!("提示{}", i)).collect(),
            pattern_type: "compound_words".to_string(),
            ai_tested_difficulty: Some(6),
            ambiguous: false,
            scores: DimensionScores::default(),
        }
    }

    #[test]
    fn test_weekday_table() {
        // 2024-03-10 是周日，2024-03-13 是周三
        assert_eq!(
            weekday_target_difficulty(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()),
            5
        );
        assert_eq!(
            weekday_target_difficulty(NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()),
            4
        );
        assert_eq!(
            weekday_target_difficulty(NaiveDate::from_ymd_opt(2024, 3, 13).unwrap()),
            7
        );
        assert_eq!(
            weekday_target_difficulty(NaiveDate::from_ymd_opt(2024, 3, 16).unwrap()),
            4
        );
    }

    #[test]
    fn test_reconcile_weighted_average() {
        // 0.3*4 + 0.4*6 + 0.3*5 = 5.1 → 5
        assert_eq!(reconcile(4, 6, 5), 5);
        // 0.3*7 + 0.4*8 + 0.3*9 = 8.0 → 8
        assert_eq!(reconcile(7, 8, 9), 8);
        // 三者一致时恒等
        assert_eq!(reconcile(3, 3, 3), 3);
    }

    #[test]
    fn test_reconcile_clamps() {
        assert_eq!(reconcile(1, 1, 1), 1);
        assert_eq!(reconcile(10, 10, 10), 10);
    }

    #[test]
    fn test_rule_difficulty_structure() {
        let calibrator = DifficultyCalibrator::new();
        // 2 个字形、中等长度答案、少量提示 → 基线 5
        assert_eq!(calibrator.rule_difficulty(&candidate("🐝+🍯", "honeybee", 1)), 5);
        // 5 个字形 +2
        assert_eq!(
            calibrator.rule_difficulty(&candidate("🐝🍯🌙⭐🔥", "honeybee", 1)),
            7
        );
        // 短答案 -1
        assert_eq!(calibrator.rule_difficulty(&candidate("🐝+🍯", "bee", 1)), 4);
        // 提示多 -1
        assert_eq!(calibrator.rule_difficulty(&candidate("🐝+🍯", "honeybee", 3)), 4);
    }

    #[test]
    fn test_calibrate_uses_ai_tested_fallback() {
        let calibrator = DifficultyCalibrator::new();
        let mut c = candidate("🐝+🍯", "honeybee", 1);
        c.ai_tested_difficulty = None;
        let profile = calibrator.calibrate(&c, 7);
        assert_eq!(profile.ai_tested, 7);
        assert_eq!(profile.proposed, 7);
    }

    #[test]
    fn test_profile_dimensions_in_range() {
        let calibrator = DifficultyCalibrator::new();
        let profile = calibrator.calibrate(&candidate("🐝🍯🌙⭐🔥🎵⚡", "extraordinarily", 2), 8);
        for value in [
            profile.calibrated,
            profile.visual_ambiguity,
            profile.cognitive_steps,
            profile.cultural_knowledge,
            profile.vocabulary_level,
            profile.pattern_novelty,
        ] {
            assert!((1..=10).contains(&value));
        }
    }
}
