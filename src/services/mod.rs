pub mod calibration;
pub mod fingerprint;
pub mod generator;
pub mod quality_gate;

pub use calibration::{weekday_target_difficulty, DifficultyCalibrator};
pub use fingerprint::FingerprintService;
pub use generator::{CandidateGenerator, GenerationRequest};
pub use quality_gate::QualityGate;
