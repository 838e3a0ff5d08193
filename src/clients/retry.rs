//! 通用重试策略
//!
//! 提供方瞬时错误的指数退避重试，与编排器的"质量 / 唯一性"
//! 尝试预算是两个独立的关注点，各自单独参数化。

use std::time::Duration;

use crate::config::Config;

/// 指数退避重试策略
///
/// 延迟序列：initial * multiplier^(attempt-1)，封顶 max_delay，
/// 可选地叠加至多 10% 的抖动避免惊群
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大尝试次数（含首次）
    pub max_attempts: u32,
    /// 首次重试延迟
    pub initial_delay: Duration,
    /// 每次重试的延迟倍率
    pub multiplier: f64,
    /// 延迟上限
    pub max_delay: Duration,
    /// 是否叠加抖动
    pub jitter: bool,
}

impl RetryPolicy {
    /// 从配置构建提供方重试策略
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.retry_max_attempts,
            initial_delay: Duration::from_millis(config.retry_initial_delay_ms),
            multiplier: config.retry_multiplier,
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
            jitter: true,
        }
    }

    /// 第 `attempt` 次失败后的等待时长（attempt 从 1 起）
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_millis() as f64
            * self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let capped = base.min(self.max_delay.as_millis() as f64);
        let with_jitter = if self.jitter {
            capped + capped * 0.1 * pseudo_unit()
        } else {
            capped
        };
        Duration::from_millis(with_jitter as u64)
    }
}

/// 廉价的 [0, 1) 伪随机数，只用于退避抖动
fn pseudo_unit() -> f64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0) as u64;
    let mut x = nanos.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(1);
    x ^= x >> 33;
    (x % 1000) as f64 / 1000.0
}
