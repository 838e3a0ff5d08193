//! 错误类型定义
//!
//! 错误分两类：
//! - 真正的错误（提供方故障、存储故障、入参格式错误），用 `thiserror` 定义；
//! - 控制信号（质量不达标、指纹撞车），是生成循环内部的流转状态，
//!   表现为跳过本次尝试，不属于错误。
//!
//! 传播策略：协调器边界以下的所有内部错误都被吸收，
//! `resolve` / `get_todays_puzzle` 对调用方是全函数——永远返回可用的谜题记录。

use std::fmt;

use thiserror::Error;

/// AI 提供方错误
#[derive(Debug, Error)]
pub enum ProviderError {
    /// 网络 / 5xx 等瞬时故障，适配器层按指数退避重试
    #[error("LLM 调用瞬时失败: {0}")]
    Transient(String),
    /// 配额耗尽，带给运维可读的恢复时间估计
    #[error("LLM 配额耗尽，预计恢复时间: {reset_hint}")]
    QuotaExceeded { reset_hint: String },
    /// 单次调用超过硬截止时间
    #[error("LLM 调用超过截止时间 ({deadline_ms} 毫秒)")]
    DeadlineExceeded { deadline_ms: u64 },
    /// 返回内容无法解析为结构化候选
    #[error("LLM 返回内容无法解析: {reason}")]
    MalformedResponse { reason: String },
}

impl ProviderError {
    /// 是否值得在适配器层重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

/// 唯一约束冲突的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// 同一日期已有谜题（并发竞态中对方先落库）
    ScheduledDate,
    /// 指纹 hash 已存在（历史谜题重复）
    FingerprintHash,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::ScheduledDate => write!(f, "scheduled_for 日期"),
            ConflictKind::FingerprintHash => write!(f, "fingerprint hash"),
        }
    }
}

/// 持久化存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 唯一约束冲突——协调器层面的良性竞态，通过重读解决，永不外泄
    #[error("唯一约束冲突: {0}")]
    Conflict(ConflictKind),
    /// 数据库不可达
    #[error("数据库不可用: {0}")]
    Unavailable(String),
    /// 其他查询失败
    #[error("数据库查询失败: {0}")]
    Query(String),
}

impl StoreError {
    /// 把 rusqlite 错误归入本分类
    ///
    /// 约束冲突按出错的索引区分日期冲突和指纹冲突
    pub fn from_sqlite(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref failure, ref message) = err {
            if failure.code == rusqlite::ErrorCode::ConstraintViolation {
                let message = message.as_deref().unwrap_or("");
                if message.contains("fingerprints.hash") {
                    return StoreError::Conflict(ConflictKind::FingerprintHash);
                }
                if message.contains("puzzles.scheduled_for") {
                    return StoreError::Conflict(ConflictKind::ScheduledDate);
                }
                // 其余约束失败（如外键）不是良性竞态，不得用重读吞掉
                return StoreError::Query(err.to_string());
            }
            if failure.code == rusqlite::ErrorCode::CannotOpen
                || failure.code == rusqlite::ErrorCode::DatabaseBusy
                || failure.code == rusqlite::ErrorCode::DatabaseLocked
            {
                return StoreError::Unavailable(err.to_string());
            }
        }
        StoreError::Query(err.to_string())
    }

    /// 是否是唯一约束冲突
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// 流水线顶层错误
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 日期入参格式错误——调用方错误，直接返回，不算系统故障
    #[error("日期格式错误，应为 YYYY-MM-DD: {0}")]
    MalformedDate(String),
    /// 所有生成尝试耗尽——触发兜底链
    #[error("生成彻底失败: {attempts} 次尝试均未产出可用谜题")]
    TotalGenerationFailure { attempts: u32 },
    /// 预览范围超限
    #[error("预览范围超限: {days} 天，最多允许 {max} 天")]
    PreviewRangeTooLarge { days: i64, max: i64 },
    #[error("提供方错误: {0}")]
    Provider(#[from] ProviderError),
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
}

/// 流水线结果类型
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_is_retryable() {
        assert!(ProviderError::Transient("503".into()).is_retryable());
        assert!(!ProviderError::MalformedResponse { reason: "x".into() }.is_retryable());
        assert!(!ProviderError::DeadlineExceeded { deadline_ms: 1000 }.is_retryable());
    }

    #[test]
    fn test_conflict_detection() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            Some("UNIQUE constraint failed: fingerprints.hash".to_string()),
        );
        match StoreError::from_sqlite(err) {
            StoreError::Conflict(ConflictKind::FingerprintHash) => {}
            other => panic!("意外的错误分类: {:?}", other),
        }

        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            Some("UNIQUE constraint failed: puzzles.scheduled_for".to_string()),
        );
        assert!(StoreError::from_sqlite(err).is_conflict());
    }

    #[test]
    fn test_unrelated_constraint_is_not_a_conflict() {
        // 外键等其它约束失败不是良性竞态，不能归为冲突
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            Some("FOREIGN KEY constraint failed".to_string()),
        );
        let classified = StoreError::from_sqlite(err);
        assert!(!classified.is_conflict());
        assert!(matches!(classified, StoreError::Query(_)));
    }
}
