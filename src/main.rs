//! 每日谜题流水线入口
//!
//! 解析今日谜题（缓存未命中则生成），适合放进定时任务每天跑一次。
//! 谜题可用性是硬性要求：即使初始化或生成全部降级，
//! 进程也要输出一条谜题并以 0 退出。

use anyhow::Result;
use chrono::Utc;
use tracing::error;

use daily_puzzle::utils::logging;
use daily_puzzle::workflow::FallbackChain;
use daily_puzzle::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = Config::from_env();
    logging::log_startup(&config);

    // 初始化失败不是致命错误：直接输出应急谜题
    let app = match App::initialize(config) {
        Ok(app) => app,
        Err(e) => {
            error!("❌ 初始化失败，输出应急谜题: {:#}", e);
            let emergency = FallbackChain::new().emergency(Utc::now().date_naive());
            logging::log_resolution(&emergency);
            return Ok(());
        }
    };

    let today = app.generate_next_puzzle().await;
    logging::log_resolution(&today);

    Ok(())
}
