/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// SQLite 数据库路径
    pub database_path: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 单次 LLM 调用的硬截止时间（秒）
    pub provider_deadline_secs: u64,
    // --- 编排器重试（质量 / 唯一性预算）---
    /// 编排器最大生成尝试次数
    pub max_attempts: u32,
    // --- 提供方瞬时错误重试（指数退避）---
    pub retry_max_attempts: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_multiplier: f64,
    pub retry_max_delay_ms: u64,
    // --- 质量判级阈值（总分 0-100）---
    pub threshold_excellent: f64,
    pub threshold_good: f64,
    pub threshold_acceptable: f64,
    pub threshold_needs_work: f64,
    /// 谜题类型（传给生成提示词）
    pub puzzle_type: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "daily_puzzle.db".to_string(),
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o".to_string(),
            provider_deadline_secs: 60,
            max_attempts: 2,
            retry_max_attempts: 3,
            retry_initial_delay_ms: 500,
            retry_multiplier: 2.0,
            retry_max_delay_ms: 8_000,
            threshold_excellent: 90.0,
            threshold_good: 80.0,
            threshold_acceptable: 70.0,
            threshold_needs_work: 50.0,
            puzzle_type: "emoji_riddle".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            database_path: std::env::var("DATABASE_PATH").unwrap_or(default.database_path),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            provider_deadline_secs: std::env::var("PROVIDER_DEADLINE_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.provider_deadline_secs),
            max_attempts: std::env::var("MAX_ATTEMPTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_attempts),
            retry_max_attempts: std::env::var("RETRY_MAX_ATTEMPTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.retry_max_attempts),
            retry_initial_delay_ms: std::env::var("RETRY_INITIAL_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.retry_initial_delay_ms),
            retry_multiplier: std::env::var("RETRY_MULTIPLIER").ok().and_then(|v| v.parse().ok()).unwrap_or(default.retry_multiplier),
            retry_max_delay_ms: std::env::var("RETRY_MAX_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.retry_max_delay_ms),
            threshold_excellent: std::env::var("THRESHOLD_EXCELLENT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.threshold_excellent),
            threshold_good: std::env::var("THRESHOLD_GOOD").ok().and_then(|v| v.parse().ok()).unwrap_or(default.threshold_good),
            threshold_acceptable: std::env::var("THRESHOLD_ACCEPTABLE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.threshold_acceptable),
            threshold_needs_work: std::env::var("THRESHOLD_NEEDS_WORK").ok().and_then(|v| v.parse().ok()).unwrap_or(default.threshold_needs_work),
            puzzle_type: std::env::var("PUZZLE_TYPE").unwrap_or(default.puzzle_type),
        }
    }
}
