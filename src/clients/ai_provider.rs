//! AI 提供方适配器
//!
//! 封装所有与 LLM API 相关的调用逻辑：
//! - `ChatProvider` 是提供方接缝，方便在测试中注入脚本化提供方
//! - `OpenAiProvider` 基于 `async-openai`，兼容 OpenAI API 的服务
//!   （如 Azure, Gemini, Doubao 等）
//! - 每次调用带硬截止时间；瞬时错误在适配器内按指数退避重试，
//!   与编排器的尝试预算互不占用

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::clients::retry::RetryPolicy;
use crate::config::Config;
use crate::error::ProviderError;

/// AI 提供方接缝
///
/// 提示词进、原始文本出；候选解析是服务层的职责
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// 发送一轮对话，返回模型的文本响应
    async fn complete(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> Result<String, ProviderError>;

    /// 模型名（写入谜题出处元数据）
    fn model_name(&self) -> &str;

    /// 提供方标识（写入尝试日志）
    fn provider_name(&self) -> &str {
        "openai"
    }
}

/// OpenAI 兼容提供方
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    model_name: String,
    deadline: Duration,
    retry: RetryPolicy,
}

impl OpenAiProvider {
    /// 创建新的提供方适配器
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            deadline: Duration::from_secs(config.provider_deadline_secs),
            retry: RetryPolicy::from_config(config),
        }
    }

    /// 单次调用（无重试），超时按截止错误处理
    async fn call_once(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> Result<String, ProviderError> {
        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()
                .map_err(|e| ProviderError::Transient(e.to_string()))?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(|e| ProviderError::Transient(e.to_string()))?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.8)
            .max_tokens(2048u32)
            .build()
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        // 硬截止时间：超时的调用记为失败尝试，不留悬挂
        let response = match timeout(self.deadline, self.client.chat().create(request)).await {
            Err(_) => {
                return Err(ProviderError::DeadlineExceeded {
                    deadline_ms: self.deadline.as_millis() as u64,
                })
            }
            Ok(result) => result.map_err(classify_api_error)?,
        };

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| ProviderError::MalformedResponse {
                reason: "LLM 返回内容为空".to_string(),
            })?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    async fn complete(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> Result<String, ProviderError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        // 瞬时错误重试循环，截止超时和配额错误直接上抛
        let mut last_err = None;
        for attempt in 1..=self.retry.max_attempts {
            match self.call_once(user_message, system_message).await {
                Ok(content) => {
                    debug!("LLM API 调用成功");
                    return Ok(content);
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "LLM 瞬时失败 (尝试 {}/{}), {} 毫秒后重试: {}",
                        attempt,
                        self.retry.max_attempts,
                        delay.as_millis(),
                        e
                    );
                    sleep(delay).await;
                    last_err = Some(e);
                }
                Err(e) => {
                    warn!("LLM API 调用失败: {}", e);
                    return Err(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| ProviderError::Transient("重试预算耗尽".to_string())))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// 把 async-openai 的错误归入提供方错误分类
fn classify_api_error(err: async_openai::error::OpenAIError) -> ProviderError {
    let text = err.to_string();
    if text.contains("429") || text.contains("quota") || text.contains("rate limit") {
        return ProviderError::QuotaExceeded {
            reset_hint: "下一个配额窗口（通常 1 小时内）".to_string(),
        };
    }
    ProviderError::Transient(text)
}
