//! 流水线端到端测试
//!
//! 用脚本化提供方替代真实 LLM，在内存数据库上验证核心不变量：
//! 同日恒一、指纹全局唯一、质量下限、兜底确定性与全函数解析。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;

use daily_puzzle::clients::ChatProvider;
use daily_puzzle::error::ProviderError;
use daily_puzzle::workflow::FallbackChain;
use daily_puzzle::{
    App, Config, FallbackTier, GenerationMethod, GenerationRequest, PipelineError, PuzzleStore,
    Verdict,
};

/// 脚本化提供方
///
/// 依次吐出预置响应，脚本耗尽后重复最后一条；记录调用次数与最近提示词
struct MockProvider {
    script: Mutex<VecDeque<Result<String, String>>>,
    repeat_last: Mutex<Option<Result<String, String>>>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockProvider {
    fn scripted(responses: Vec<Result<String, String>>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            repeat_last: Mutex::new(None),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    fn always_failing() -> Self {
        Self::scripted(vec![Err("上游服务不可用".to_string())])
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_prompt(&self) -> String {
        self.last_prompt.lock().unwrap().clone().unwrap_or_default()
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    async fn complete(
        &self,
        user_message: &str,
        _system_message: Option<&str>,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(user_message.to_string());

        let next = {
            let mut script = self.script.lock().unwrap();
            match script.pop_front() {
                Some(entry) => {
                    *self.repeat_last.lock().unwrap() = Some(entry.clone());
                    entry
                }
                None => self
                    .repeat_last
                    .lock()
                    .unwrap()
                    .clone()
                    .unwrap_or_else(|| Err("脚本耗尽".to_string())),
            }
        };

        next.map_err(ProviderError::Transient)
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

/// 构建一条合法的候选响应 JSON
fn puzzle_json(content: &str, answer: &str, score: f64) -> String {
    json!({
        "content": content,
        "answer": answer,
        "explanation": format!("{} 的解析", answer),
        "difficulty": 5,
        "hints": ["提示一", "提示二"],
        "pattern_type": "compound_words",
        "ai_tested_difficulty": 5,
        "ambiguous": false,
        "scores": {
            "clarity": score,
            "creativity": score,
            "solvability": score,
            "appropriateness": score,
            "visual_appeal": score,
            "educational_value": score,
            "fun_factor": score
        }
    })
    .to_string()
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.database_path = ":memory:".to_string();
    config.max_attempts = 2;
    config
}

fn build_app(provider: Arc<MockProvider>) -> App {
    let store = Arc::new(PuzzleStore::open_in_memory().expect("打开内存数据库失败"));
    App::with_provider(test_config(), store, provider)
}

#[tokio::test]
async fn test_same_date_resolves_to_same_puzzle() {
    let provider = Arc::new(MockProvider::scripted(vec![Ok(puzzle_json(
        "🐝 + 📚",
        "蜂书",
        90.0,
    ))]));
    let app = build_app(Arc::clone(&provider));

    let first = app.get_puzzle_for_date("2024-03-10").await.unwrap();
    let second = app.get_puzzle_for_date("2024-03-10").await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.answer, second.answer);
    // 第二次命中缓存，不再调用提供方
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_concurrent_requests_coalesce_into_one_generation() {
    let provider = Arc::new(MockProvider::scripted(vec![Ok(puzzle_json(
        "🌙 + 🚪",
        "月门",
        90.0,
    ))]));
    let app = Arc::new(build_app(Arc::clone(&provider)));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let app = Arc::clone(&app);
        handles.push(tokio::spawn(async move {
            app.get_puzzle_for_date("2024-03-10").await.unwrap()
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().id);
    }

    assert!(ids.windows(2).all(|w| w[0] == w[1]), "并发请求应拿到同一条记录");
    assert_eq!(provider.call_count(), 1, "同日期并发只应触发一次生成");
    let count = app.store().count_for_date(date(2024, 3, 10)).unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_duplicate_answer_is_rejected_across_dates() {
    // 第二天先吐出与第一天相同的候选，指纹闸门应丢弃并采纳重试结果
    let provider = Arc::new(MockProvider::scripted(vec![
        Ok(puzzle_json("🔥 + 🏔️", "火山", 90.0)),
        Ok(puzzle_json("🔥 + 🏔️", "火山", 90.0)),
        Ok(puzzle_json("💧 + 🏔️", "水山", 90.0)),
    ]));
    let app = build_app(Arc::clone(&provider));

    let day1 = app.get_puzzle_for_date("2024-03-10").await.unwrap();
    let day2 = app.get_puzzle_for_date("2024-03-11").await.unwrap();

    assert_eq!(day1.answer, "火山");
    assert_eq!(day2.answer, "水山");
    assert_eq!(app.store().fingerprint_count().unwrap(), 2);
    // 第二天消耗了两次调用：一次撞指纹、一次成功
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test]
async fn test_low_quality_candidate_is_discarded() {
    let provider = Arc::new(MockProvider::scripted(vec![
        Ok(puzzle_json("🗑️ + ❓", "垃圾谜", 40.0)),
        Ok(puzzle_json("⭐ + 🌊", "星海", 85.0)),
    ]));
    let app = build_app(provider);

    let record = app.get_puzzle_for_date("2024-03-10").await.unwrap();

    assert_eq!(record.answer, "星海");
    assert!(record.quality_score.unwrap() >= 70.0);

    let metrics = app.store().find_metrics(record.id).unwrap().unwrap();
    assert!(metrics.verdict.is_acceptable());
    assert!(metrics.adversarial_passed);
}

#[tokio::test]
async fn test_exhausted_attempts_fall_back_deterministically() {
    let provider = Arc::new(MockProvider::always_failing());
    let app = build_app(provider);

    let target = date(2024, 3, 10);
    let record = app.get_puzzle_for_date("2024-03-10").await.unwrap();

    assert_eq!(record.generation_method, GenerationMethod::FallbackPool);
    assert_eq!(record.fallback_tier, FallbackTier::Deterministic);
    // 选取与池公式一致
    let expected = FallbackChain::new().select(target);
    assert_eq!(record.content, expected.content);
    assert_eq!(record.answer, expected.answer);

    // 兜底结果同样落库，再次请求命中缓存
    let again = app.get_puzzle_for_date("2024-03-10").await.unwrap();
    assert_eq!(record.id, again.id);
}

#[tokio::test]
async fn test_prompt_carries_weekday_target_difficulty() {
    // 2024-03-10 是周日，目标难度 5
    let provider = Arc::new(MockProvider::scripted(vec![Ok(puzzle_json(
        "🎈 + 🌤️",
        "气球天",
        90.0,
    ))]));
    let app = build_app(Arc::clone(&provider));
    app.get_puzzle_for_date("2024-03-10").await.unwrap();
    assert!(provider.last_prompt().contains("目标难度：5"));

    // 2024-03-13 是周三，目标难度 7
    let provider = Arc::new(MockProvider::scripted(vec![Ok(puzzle_json(
        "🎄 + 🌊",
        "树海",
        90.0,
    ))]));
    let app = build_app(Arc::clone(&provider));
    app.get_puzzle_for_date("2024-03-13").await.unwrap();
    assert!(provider.last_prompt().contains("目标难度：7"));
}

#[tokio::test]
async fn test_total_failure_returns_emergency_puzzle() {
    // AI 与存储同时不可用：解析仍须返回谜题且不恐慌
    let provider = Arc::new(MockProvider::always_failing());
    let store = Arc::new(PuzzleStore::open_in_memory().unwrap());
    store
        .with_connection(|conn| {
            conn.execute_batch(
                "DROP TABLE puzzles; DROP TABLE fingerprints; DROP TABLE generation_attempts;",
            )
        })
        .unwrap()
        .unwrap();
    let app = App::with_provider(test_config(), store, provider);

    let record = app.get_puzzle_for_date("2024-03-10").await.unwrap();

    assert_eq!(record.generation_method, GenerationMethod::Emergency);
    assert_eq!(record.fallback_tier, FallbackTier::Emergency);
    assert!(!record.content.is_empty());
}

#[tokio::test]
async fn test_cron_entrypoint_fills_todays_cache() {
    let provider = Arc::new(MockProvider::scripted(vec![Ok(puzzle_json(
        "🌅 + 📰",
        "晨报",
        90.0,
    ))]));
    let app = build_app(Arc::clone(&provider));

    let today = chrono::Utc::now().date_naive();
    let record = app.generate_next_puzzle().await;
    assert_eq!(record.scheduled_for, today, "定时任务应填充当日缓存");
    assert_eq!(app.store().count_for_date(today).unwrap(), 1);

    // 用户入口命中同一条缓存，不再触发生成
    let served = app.get_todays_puzzle().await;
    assert_eq!(served.id, record.id);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_initialize_degrades_to_in_memory_store() {
    // 数据库路径不可用时初始化不得失败，降级为内存库继续服务
    let mut config = test_config();
    config.database_path = "/nonexistent-dir/daily_puzzle.db".to_string();

    let app = App::initialize(config).expect("初始化不应因数据库路径失败");
    let today = chrono::Utc::now().date_naive();
    assert_eq!(app.store().count_for_date(today).unwrap(), 0);
}

#[tokio::test]
async fn test_malformed_date_is_rejected() {
    let app = build_app(Arc::new(MockProvider::always_failing()));

    for bad in ["2024/03/10", "10-03-2024", "tomorrow", ""] {
        match app.get_puzzle_for_date(bad).await {
            Err(PipelineError::MalformedDate(_)) => {}
            other => panic!("非法日期 {:?} 应返回格式错误，实际: {:?}", bad, other.map(|r| r.id)),
        }
    }
}

#[tokio::test]
async fn test_preview_does_not_persist() {
    let provider = Arc::new(MockProvider::scripted(vec![Ok(puzzle_json(
        "🦉 + 🌃",
        "夜枭",
        90.0,
    ))]));
    let app = build_app(provider);

    let request = GenerationRequest {
        target_difficulty: 5,
        puzzle_type: "emoji_riddle".to_string(),
        category: None,
        theme: None,
    };
    let preview = app.preview_generation(&request).await.unwrap();

    assert_eq!(preview.candidate.answer, "夜枭");
    assert_eq!(preview.metrics.verdict, Verdict::Excellent);
    assert_eq!(app.store().fingerprint_count().unwrap(), 0, "干跑不得落库");
}

#[tokio::test]
async fn test_range_preview_rejects_over_ninety_days() {
    let app = build_app(Arc::new(MockProvider::always_failing()));

    match app
        .generate_date_range_preview("2024-01-01", "2024-04-15")
        .await
    {
        Err(PipelineError::PreviewRangeTooLarge { days, max }) => {
            assert_eq!(days, 106);
            assert_eq!(max, 90);
        }
        other => panic!("超长范围应被拒绝，实际: {:?}", other.map(|v| v.len())),
    }

    // 结束早于开始同样拒绝
    assert!(matches!(
        app.generate_date_range_preview("2024-03-10", "2024-03-01")
            .await,
        Err(PipelineError::MalformedDate(_))
    ));
}

#[tokio::test]
async fn test_range_preview_produces_per_date_entries() {
    let provider = Arc::new(MockProvider::scripted(vec![
        Ok(puzzle_json("🌱 + 🌧️", "春雨", 90.0)),
        Ok(puzzle_json("🍂 + 💨", "秋风", 90.0)),
        Ok(puzzle_json("❄️ + 🌙", "冬月", 90.0)),
    ]));
    let app = build_app(provider);

    let previews = app
        .generate_date_range_preview("2024-03-10", "2024-03-12")
        .await
        .unwrap();

    assert_eq!(previews.len(), 3);
    assert_eq!(previews[0].date, date(2024, 3, 10));
    assert_eq!(previews[0].target_difficulty, 5); // 周日
    assert_eq!(previews[1].target_difficulty, 4); // 周一
    assert!(previews.iter().all(|p| p.preview.is_some()));
    assert_eq!(app.store().count_for_date(date(2024, 3, 10)).unwrap(), 0);
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
