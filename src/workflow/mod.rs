//! 流程层 - 多步骤业务流程编排
//!
//! 把服务层的单步能力串成完整流程：
//! - generation_flow: 生成→唯一性→质量→校准的尝试循环
//! - fallback: 生成彻底失败后的确定性兜底与应急谜题

pub mod fallback;
pub mod generation_flow;

pub use fallback::FallbackChain;
pub use generation_flow::{AcceptedGeneration, GenerationFlow};
