//! 谜题数据模型
//!
//! 定义已发布谜题、候选谜题和去重指纹的类型

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::quality::DimensionScores;

/// 生成方式
///
/// 记录一条谜题记录是如何产生的，用于运维监控降级情况
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationMethod {
    /// AI 实时生成
    AiGenerated,
    /// 确定性兜底池选取
    FallbackPool,
    /// 硬编码应急谜题
    Emergency,
}

impl GenerationMethod {
    /// 数据库存储用的文本表示
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMethod::AiGenerated => "ai_generated",
            GenerationMethod::FallbackPool => "fallback_pool",
            GenerationMethod::Emergency => "emergency",
        }
    }

    /// 从数据库文本解析
    pub fn from_str(s: &str) -> Self {
        match s {
            "fallback_pool" => GenerationMethod::FallbackPool,
            "emergency" => GenerationMethod::Emergency,
            _ => GenerationMethod::AiGenerated,
        }
    }
}

/// 兜底层级
///
/// `None` 表示正常生成；其余两级对用户不可见，仅供内部告警
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackTier {
    /// 正常生成，未降级
    None,
    /// 确定性兜底池
    Deterministic,
    /// 硬编码应急谜题
    Emergency,
}

impl FallbackTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackTier::None => "none",
            FallbackTier::Deterministic => "deterministic",
            FallbackTier::Emergency => "emergency",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "deterministic" => FallbackTier::Deterministic,
            "emergency" => FallbackTier::Emergency,
            _ => FallbackTier::None,
        }
    }
}

/// 已发布的每日谜题记录
///
/// 每个日历日至多一条，由存储层 `scheduled_for` 唯一索引保证。
/// 插入后不可变，正常运行中永不删除。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleRecord {
    /// 唯一 ID
    pub id: Uuid,
    /// 展示内容（emoji 谜面）
    pub content: String,
    /// 答案
    pub answer: String,
    /// 答案解析
    pub explanation: String,
    /// 数值难度（1-10）
    pub difficulty: u8,
    /// 提示列表
    pub hints: Vec<String>,
    /// 发布日期（唯一键，UTC）
    pub scheduled_for: NaiveDate,
    /// 生成方式
    pub generation_method: GenerationMethod,
    /// 兜底层级
    pub fallback_tier: FallbackTier,
    /// 生成所用模型（兜底谜题为 None）
    pub ai_model: Option<String>,
    /// 质量总分（0-100，兜底谜题为 None）
    pub quality_score: Option<f64>,
    /// 独特性评分（0-100，兜底谜题为 None）
    pub uniqueness_score: Option<f64>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl PuzzleRecord {
    /// 谜题是否为 AI 实时生成
    pub fn ai_generated(&self) -> bool {
        self.generation_method == GenerationMethod::AiGenerated
    }
}

/// 未持久化的候选谜题
///
/// 由 AI 提供方返回的结构化输出解析而来，
/// 通过唯一性和质量两道闸门后才会成为 `PuzzleRecord`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleCandidate {
    /// 谜面内容
    pub content: String,
    /// 答案
    pub answer: String,
    /// 答案解析
    pub explanation: String,
    /// 生成时的目标难度（1-10）
    pub difficulty: u8,
    /// 提示列表
    pub hints: Vec<String>,
    /// 模式分类（如 compound_words / phonetic / visual_pun，视为不透明字符串）
    pub pattern_type: String,
    /// 模型自测难度（1-10，可选）
    #[serde(default)]
    pub ai_tested_difficulty: Option<u8>,
    /// 模型是否认为谜面存在歧义
    #[serde(default)]
    pub ambiguous: bool,
    /// 模型自评的七维质量分（0-100）
    pub scores: DimensionScores,
}

/// 去重指纹
///
/// 与 `PuzzleRecord` 一一对应，hash 全局唯一（存储层唯一索引保证）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// SHA-256 十六进制指纹（全局唯一）
    pub hash: String,
    /// 归一化答案（小写、仅保留字母数字）
    pub normalized_answer: String,
    /// 符号签名（谜面中非文字字形的有序序列）
    pub symbol_signature: String,
    /// 模式分类
    pub pattern_type: String,
}
