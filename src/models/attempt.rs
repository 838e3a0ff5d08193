//! 生成尝试日志模型

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 单次生成尝试的可观测性记录
///
/// 只追加，不修改；一条谜题记录可对应多条尝试日志
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationAttemptLog {
    /// 归属谜题（尝试全部失败时为 None）
    pub puzzle_id: Option<Uuid>,
    /// 目标日期
    pub scheduled_for: NaiveDate,
    /// 生成方式（ai_generated / fallback_pool / emergency）
    pub method: String,
    /// 第几次尝试（1 起）
    pub attempt: u32,
    /// 本轮看过的候选数
    pub candidates_seen: u32,
    /// 耗时（毫秒）
    pub elapsed_ms: u64,
    /// 提供方标识
    pub provider: String,
    /// 模型名
    pub model: String,
    /// 估算 token 消耗
    pub estimated_tokens: u64,
    /// 记录时间
    pub created_at: DateTime<Utc>,
}
