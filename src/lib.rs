//! 每日谜题生成与唯一性流水线
//!
//! # 架构分层
//!
//! ```text
//! orchestrator (协调层)    —— 每日缓存、单飞、公共 API
//!     ↓
//! workflow (流程层)        —— 生成尝试循环、兜底链
//!     ↓
//! services (业务能力层)    —— 候选生成、指纹、质量闸门、难度校准
//!     ↓
//! clients / infrastructure —— AI 提供方、重试策略、SQLite 存储
//! ```
//!
//! 上层只依赖下层；models 与 error 横贯各层。
//!
//! # 核心不变量
//!
//! - 同一日期恒定对应同一条谜题，以存储层唯一索引为准
//! - 指纹全局唯一，历史答案永不复用
//! - 解析入口是全函数：AI 与数据库全挂也能返回谜题

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

pub use config::Config;
pub use error::{ConflictKind, PipelineError, PipelineResult, ProviderError, StoreError};
pub use infrastructure::PuzzleStore;
pub use models::{
    DifficultyBand, DifficultyProfile, FallbackTier, Fingerprint, GenerationAttemptLog,
    GenerationMethod, PuzzleCandidate, PuzzleRecord, QualityMetrics, Verdict,
};
pub use orchestrator::{App, DatePreview, GenerationPreview};
pub use services::GenerationRequest;
