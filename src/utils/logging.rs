//! 日志初始化与启动横幅

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::PuzzleRecord;

/// 初始化全局日志订阅器
///
/// 级别由 RUST_LOG 控制，默认 info
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// 打印启动配置横幅
pub fn log_startup(config: &Config) {
    info!("========================================");
    info!("🚀 每日谜题流水线启动");
    info!("  模型: {}", config.llm_model_name);
    info!("  数据库: {}", config.database_path);
    info!("  尝试预算: {}", config.max_attempts);
    info!("  提供方时限: {}s", config.provider_deadline_secs);
    info!("========================================");
}

/// 打印一条解析结果摘要
pub fn log_resolution(record: &PuzzleRecord) {
    info!("========================================");
    info!("✓ 谜题已就绪: {}", record.scheduled_for);
    info!("  内容: {}", record.content);
    info!("  难度: {}", record.difficulty);
    info!("  方式: {}", record.generation_method.as_str());
    if let Some(score) = record.quality_score {
        info!("  质量: {:.1}", score);
    }
    if let Some(model) = &record.ai_model {
        info!("  模型: {}", model);
    }
    info!("========================================");
}
