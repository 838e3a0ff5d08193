//! 候选生成服务 - 业务能力层
//!
//! 只负责"生成一个候选"能力：构建提示词、调用提供方、
//! 解析结构化输出。不做质量判断，不做唯一性判断，不关心流程。

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clients::ChatProvider;
use crate::error::ProviderError;
use crate::models::PuzzleCandidate;

/// 一次生成请求的参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// 目标难度（1-10）
    pub target_difficulty: u8,
    /// 谜题类型（如 emoji_riddle）
    pub puzzle_type: String,
    /// 类目（可选）
    pub category: Option<String>,
    /// 主题（可选）
    pub theme: Option<String>,
}

/// 候选生成服务
///
/// 职责：
/// - 构建生成提示词
/// - 调用 AI 提供方
/// - 把文本响应解析为结构化候选
/// - 只处理单个候选
/// - 不关心流程顺序
pub struct CandidateGenerator {
    provider: Arc<dyn ChatProvider>,
}

impl CandidateGenerator {
    /// 创建新的生成服务
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self { provider }
    }

    /// 提供方标识（写入尝试日志）
    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    /// 模型名（写入出处元数据）
    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// 生成一个候选谜题
    ///
    /// # 返回
    /// 返回 (候选, 估算 token 数)
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<(PuzzleCandidate, u64), ProviderError> {
        let (user_message, system_message) = self.build_messages(request);

        debug!(
            "生成候选谜题: 类型 {}, 目标难度 {}",
            request.puzzle_type, request.target_difficulty
        );

        let response = self
            .provider
            .complete(&user_message, Some(&system_message))
            .await?;

        let candidate = self.parse_candidate(&response)?;

        // 粗估：中英混合文本约 4 字符一个 token
        let estimated_tokens = ((user_message.len() + response.len()) / 4) as u64;

        Ok((candidate, estimated_tokens))
    }

    /// 构建生成提示词
    ///
    /// 返回 (user_message, system_message)
    fn build_messages(&self, request: &GenerationRequest) -> (String, String) {
        let system_message = "你是一个专业的每日谜题设计师，擅长设计 emoji 谜题。\
                             你必须只返回一个 JSON 对象，不要返回任何其他内容。"
            .to_string();

        let category_line = match &request.category {
            Some(c) => format!("类目：{}", c),
            None => "类目：不限".to_string(),
        };
        let theme_line = match &request.theme {
            Some(t) => format!("主题：{}", t),
            None => "主题：不限".to_string(),
        };

        let user_message = format!(
            r#"请设计一个全新的谜题。

【要求】
- 谜题类型：{}
- 目标难度：{}（1 最易，10 最难）
- {}
- {}
- 谜面必须包含 emoji 等符号字形
- 答案不得出现在谜面中
- 必须给出解析和至少一条提示
- 对每个质量维度按 0-100 自评

【输出格式】
只返回如下 JSON 对象：
{{
  "content": "谜面",
  "answer": "答案",
  "explanation": "答案解析",
  "difficulty": {},
  "hints": ["提示1", "提示2"],
  "pattern_type": "compound_words | phonetic | visual_pun",
  "ai_tested_difficulty": 1-10 的整数,
  "ambiguous": false,
  "scores": {{
    "clarity": 0-100,
    "creativity": 0-100,
    "solvability": 0-100,
    "appropriateness": 0-100,
    "visual_appeal": 0-100,
    "educational_value": 0-100,
    "fun_factor": 0-100
  }}
}}"#,
            request.puzzle_type,
            request.target_difficulty,
            category_line,
            theme_line,
            request.target_difficulty,
        );

        (user_message, system_message)
    }

    /// 解析提供方响应为候选
    ///
    /// 容忍代码围栏和前后缀闲话；解析失败视为响应格式错误
    fn parse_candidate(&self, response: &str) -> Result<PuzzleCandidate, ProviderError> {
        let json_text = extract_json(response).ok_or_else(|| {
            warn!("无法从响应中提取 JSON: {}", truncate(response, 120));
            ProviderError::MalformedResponse {
                reason: "响应中不包含 JSON 对象".to_string(),
            }
        })?;

        let mut candidate: PuzzleCandidate =
            serde_json::from_str(&json_text).map_err(|e| ProviderError::MalformedResponse {
                reason: format!("JSON 解析失败: {}", e),
            })?;

        if candidate.answer.trim().is_empty() || candidate.content.trim().is_empty() {
            return Err(ProviderError::MalformedResponse {
                reason: "候选缺少谜面或答案".to_string(),
            });
        }

        // 难度越界时夹回合法区间，不因此废弃整个候选
        candidate.difficulty = candidate.difficulty.clamp(1, 10);
        if let Some(d) = candidate.ai_tested_difficulty {
            candidate.ai_tested_difficulty = Some(d.clamp(1, 10));
        }

        Ok(candidate)
    }
}

/// 从自由文本中提取 JSON 对象
///
/// 优先匹配 ``` 围栏内的对象，否则取首个 '{' 到末个 '}' 的片段
fn extract_json(text: &str) -> Option<String> {
    if let Ok(re) = Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```") {
        if let Some(caps) = re.captures(text) {
            return caps.get(1).map(|m| m.as_str().to_string());
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(text[start..=end].to_string())
    } else {
        None
    }
}

/// 截断长文本用于日志显示
fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedProvider {
        response: String,
    }

    #[async_trait]
    impl ChatProvider for FixedProvider {
        async fn complete(
            &self,
            _user_message: &str,
            _system_message: Option<&str>,
        ) -> Result<String, ProviderError> {
            Ok(self.response.clone())
        }

        fn model_name(&self) -> &str {
            "fixed-model"
        }
    }

    fn sample_json() -> String {
        r#"{
            "content": "🐝 + 🍯",
            "answer": "honeybee",
            "explanation": "蜜蜂加蜂蜜",
            "difficulty": 5,
            "hints": ["昆虫"],
            "pattern_type": "compound_words",
            "ai_tested_difficulty": 6,
            "ambiguous": false,
            "scores": {
                "clarity": 88, "creativity": 82, "solvability": 90,
                "appropriateness": 95, "visual_appeal": 85,
                "educational_value": 75, "fun_factor": 80
            }
        }"#
        .to_string()
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            target_difficulty: 5,
            puzzle_type: "emoji_riddle".to_string(),
            category: None,
            theme: None,
        }
    }

    #[tokio::test]
    async fn test_parse_plain_json() {
        let generator = CandidateGenerator::new(Arc::new(FixedProvider {
            response: sample_json(),
        }));
        let (candidate, tokens) = generator.generate(&request()).await.unwrap();
        assert_eq!(candidate.answer, "honeybee");
        assert_eq!(candidate.ai_tested_difficulty, Some(6));
        assert!(tokens > 0);
    }

    #[tokio::test]
    async fn test_parse_fenced_json_with_prose() {
        let response = format!("好的，这是为您生成的谜题：\n```json\n{}\n```\n希望您满意！", sample_json());
        let generator = CandidateGenerator::new(Arc::new(FixedProvider { response }));
        let (candidate, _) = generator.generate(&request()).await.unwrap();
        assert_eq!(candidate.answer, "honeybee");
    }

    #[tokio::test]
    async fn test_malformed_response_is_rejected() {
        let generator = CandidateGenerator::new(Arc::new(FixedProvider {
            response: "抱歉，我无法完成这个请求。".to_string(),
        }));
        let err = generator.generate(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_out_of_range_difficulty_is_clamped() {
        let response = sample_json().replace("\"difficulty\": 5", "\"difficulty\": 99");
        let generator = CandidateGenerator::new(Arc::new(FixedProvider { response }));
        let (candidate, _) = generator.generate(&request()).await.unwrap();
        assert_eq!(candidate.difficulty, 10);
    }

    #[test]
    fn test_extract_json_prefers_fence() {
        let text = "前言 {\"a\":1} ```json\n{\"b\":2}\n``` 后记";
        assert_eq!(extract_json(text).unwrap(), "{\"b\":2}");
    }
}
