//! 协调层 - 最外层装配与对外入口
//!
//! - coordinator: 每日缓存协调与单飞生成
//! - api: 公共消费接口（今日谜题、指定日期、预生成、干跑预览）

pub mod api;
pub mod coordinator;

pub use api::{App, DatePreview, GenerationPreview};
pub use coordinator::DailyCoordinator;
