//! OpenAI-compatible chat client
//!
//! Works with any endpoint speaking the chat-completions API (OpenAI,
//! Azure, Gemini's compatibility layer, local gateways). There is no search
//! grounding here, so sources are whatever URLs the model cites in its text.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::LookupError;
use crate::services::response_parser::{extract_url_sources, RawAnswer};

/// LLM client
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model_name: String,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            timeout: config.lookup_timeout(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Send one chat turn and return the trimmed reply
    pub async fn chat(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> Result<String, LookupError> {
        debug!("Calling LLM API, model: {}", self.model_name);

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()
                .map_err(|e| LookupError::Terminal(format!("invalid system message: {}", e)))?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(|e| LookupError::Terminal(format!("invalid user message: {}", e)))?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.1)
            .max_tokens(200u32)
            .build()
            .map_err(|e| LookupError::Terminal(format!("invalid request: {}", e)))?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| LookupError::Transient("LLM request timed out".to_string()))?
            .map_err(|e| {
                warn!("LLM API call failed: {}", e);
                LookupError::classify(format!("LLM API call failed: {}", e))
            })?;

        debug!("LLM API call succeeded");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        Ok(content.trim().to_string())
    }

    /// Ask the model and keep any cited URLs as sources
    pub async fn ask(&self, prompt: &str, system_message: &str) -> Result<RawAnswer, LookupError> {
        let text = self.chat(prompt, Some(system_message)).await?;
        let sources = extract_url_sources(&text);
        Ok(RawAnswer { text, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // needs LLM_API_KEY: cargo test -- --ignored
    async fn test_chat_roundtrip() {
        let _ = tracing_subscriber::fmt::try_init();

        let config = Config::from_env().unwrap();
        let client = LlmClient::new(&config);

        let reply = client
            .chat("Reply with the single word: pong", Some("You are terse."))
            .await
            .unwrap();
        assert!(!reply.is_empty());
    }
}
