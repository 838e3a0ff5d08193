//! 兜底链 - 流程层
//!
//! 谜题可用性是独立于 AI 和存储健康度的硬性活性要求：
//! - 生成彻底失败 → 按 `dayOfYear(date) mod 池大小` 确定性选取池内谜题，
//!   同一日期反复调用选中同一条
//! - 连兜底落库都失败 → 直接返回硬编码应急谜题，不再尝试持久化，
//!   本路径绝不出错
//!
//! 降级谜题对用户与正常谜题不可区分，仅在出处元数据中打标供告警。

use chrono::{Datelike, NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;

use crate::models::{FallbackTier, GenerationMethod, PuzzleRecord};

/// 兜底池条目
struct PoolEntry {
    content: &'static str,
    answer: &'static str,
    explanation: &'static str,
    difficulty: u8,
    hints: &'static [&'static str],
}

/// 固定兜底池
///
/// 条目按难度交错排布，避免连续降级日难度扎堆
static FALLBACK_POOL: &[PoolEntry] = &[
    PoolEntry {
        content: "🐝 + 🍯",
        answer: "蜜糖",
        explanation: "蜜蜂酿的蜂蜜，合起来是蜜糖",
        difficulty: 3,
        hints: &["和昆虫有关", "甜的"],
    },
    PoolEntry {
        content: "🌙 + 🍰",
        answer: "月饼",
        explanation: "月亮加糕点，中秋节吃的月饼",
        difficulty: 4,
        hints: &["节日食品", "中秋"],
    },
    PoolEntry {
        content: "🔥 + 🍲",
        answer: "火锅",
        explanation: "火加锅，冬天最受欢迎的火锅",
        difficulty: 3,
        hints: &["一种吃法", "冬天流行"],
    },
    PoolEntry {
        content: "💧 + 📅",
        answer: "水历",
        explanation: "水加日历，谐音\"水利\"",
        difficulty: 7,
        hints: &["谐音", "和工程有关"],
    },
    PoolEntry {
        content: "🐎 + 🖥️",
        answer: "马上",
        explanation: "马在屏幕上方，表示\"马上\"",
        difficulty: 5,
        hints: &["一个副词", "表示很快"],
    },
    PoolEntry {
        content: "👁️ + 🥛",
        answer: "目光如牛奶",
        explanation: "眼睛加牛奶，打趣\"目光如炬\"的反义",
        difficulty: 8,
        hints: &["成语变体", "和眼神有关"],
    },
    PoolEntry {
        content: "⛰️ + ⛰️",
        answer: "出",
        explanation: "两座山叠起来是汉字\"出\"",
        difficulty: 6,
        hints: &["一个汉字", "拆字"],
    },
];

/// 兜底链
///
/// 职责：
/// - 确定性选取兜底池谜题
/// - 提供永不失败的应急谜题
/// - 不关心持久化（由协调器负责）
pub struct FallbackChain;

impl FallbackChain {
    /// 创建新的兜底链
    pub fn new() -> Self {
        Self
    }

    /// 确定性选取指定日期的兜底谜题
    ///
    /// 选取规则：`pool[dayOfYear(date) mod 池大小]`，同一日期恒定
    pub fn select(&self, date: NaiveDate) -> PuzzleRecord {
        let index = date.ordinal() as usize % FALLBACK_POOL.len();
        let entry = &FALLBACK_POOL[index];

        info!(
            "🧯 启用确定性兜底: {} 选中池内第 {} 条 (答案: {})",
            date, index, entry.answer
        );

        build_record(
            entry,
            date,
            GenerationMethod::FallbackPool,
            FallbackTier::Deterministic,
        )
    }

    /// 硬编码应急谜题
    ///
    /// 存储不可达时的最后一道防线，绝不出错、绝不落库
    pub fn emergency(&self, date: NaiveDate) -> PuzzleRecord {
        info!("🚨 启用应急谜题: {}", date);

        static EMERGENCY: PoolEntry = PoolEntry {
            content: "☀️ + 🌧️",
            answer: "彩虹",
            explanation: "太阳加雨，雨后天晴见彩虹",
            difficulty: 2,
            hints: &["天气现象", "七种颜色"],
        };

        build_record(
            &EMERGENCY,
            date,
            GenerationMethod::Emergency,
            FallbackTier::Emergency,
        )
    }

    /// 池大小（测试用）
    pub fn pool_size(&self) -> usize {
        FALLBACK_POOL.len()
    }
}

impl Default for FallbackChain {
    fn default() -> Self {
        Self::new()
    }
}

fn build_record(
    entry: &PoolEntry,
    date: NaiveDate,
    method: GenerationMethod,
    tier: FallbackTier,
) -> PuzzleRecord {
    PuzzleRecord {
        id: Uuid::new_v4(),
        content: entry.content.to_string(),
        answer: entry.answer.to_string(),
        explanation: entry.explanation.to_string(),
        difficulty: entry.difficulty,
        hints: entry.hints.iter().map(|h| h.to_string()).collect(),
        scheduled_for: date,
        generation_method: method,
        fallback_tier: tier,
        ai_model: None,
        quality_score: None,
        uniqueness_score: None,
        created_at: Utc::now(),
    }
}
