//! LLM 服务 - 业务能力层
//!
//! 只负责"把提示词发给 LLM、拿回文本"，不关心返回内容的格式
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Gemini 的 OpenAI 兼容端点）

use anyhow::{Context, Result};
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;

/// 一个 LLM 调用目标（端点 + 模型）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleTarget {
    pub api_base_url: String,
    pub model: String,
}

impl OracleTarget {
    pub fn new(api_base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            model: model.into(),
        }
    }

    /// 主调用目标
    pub fn primary(config: &Config) -> Self {
        Self::new(&config.llm_api_base_url, &config.llm_model_name)
    }

    /// 备用调用目标，未配置备用模型时为 `None`
    pub fn fallback(config: &Config) -> Option<Self> {
        let model = config.llm_fallback_model_name.as_ref()?;
        let base = config
            .llm_fallback_api_base_url
            .as_ref()
            .unwrap_or(&config.llm_api_base_url);
        Some(Self::new(base, model))
    }
}

/// 文本进、文本出的 LLM 接口
///
/// 每次 `call` 恰好发出一次请求，不做重试
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn call(&self, target: &OracleTarget, prompt: &str) -> Result<String>;
}

/// 系统消息
const SYSTEM_MESSAGE: &str = "Tu es un professeur qui rédige des QCM pédagogiques pour collégiens et lycéens. \
Tu réponds uniquement avec du JSON valide.";

/// 基于 OpenAI 兼容 API 的 LLM 服务
pub struct LlmService {
    api_key: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        Self {
            api_key: config.llm_api_key.clone(),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
        }
    }

    fn client_for(&self, target: &OracleTarget) -> Client<OpenAIConfig> {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&self.api_key)
            .with_api_base(&target.api_base_url);
        Client::with_config(openai_config)
    }

    /// 发送一次聊天请求
    ///
    /// # 参数
    /// - `target`: 端点和模型
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（字符串）
    pub async fn send_to_llm(
        &self,
        target: &OracleTarget,
        user_message: &str,
        system_message: Option<&str>,
    ) -> Result<String> {
        debug!("调用 LLM API，模型: {}", target.model);
        debug!("用户消息长度: {} 字符", user_message.chars().count());

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&target.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()?;

        let response = self
            .client_for(target)
            .chat()
            .create(request)
            .await
            .map_err(|e| {
                warn!("LLM API 调用失败: {}", e);
                anyhow::anyhow!("LLM API 调用失败: {}", e)
            })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .context("LLM 返回内容为空")?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl Oracle for LlmService {
    async fn call(&self, target: &OracleTarget, prompt: &str) -> Result<String> {
        self.send_to_llm(target, prompt, Some(SYSTEM_MESSAGE)).await
    }
}
