pub mod ai_provider;
pub mod retry;

pub use ai_provider::{ChatProvider, OpenAiProvider};
pub use retry::RetryPolicy;
