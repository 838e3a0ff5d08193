//! 数据模型模块

pub mod attempt;
pub mod difficulty;
pub mod puzzle;
pub mod quality;

pub use attempt::GenerationAttemptLog;
pub use difficulty::{DifficultyBand, DifficultyProfile};
pub use puzzle::{FallbackTier, Fingerprint, GenerationMethod, PuzzleCandidate, PuzzleRecord};
pub use quality::{DimensionScores, QualityMetrics, Verdict};
