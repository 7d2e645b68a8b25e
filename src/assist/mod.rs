//! Client for the code completion and explanation service.
//!
//! Talks to any OpenAI compatible chat completions endpoint. It holds no room state and is only
//! ever called from its own HTTP request task.

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AssistConfig;

const COMPLETION_SYSTEM_PROMPT: &str = "You are a code completion assistant. Only return the code \
  completion without any explanations or markdown formatting.";
const EXPLANATION_SYSTEM_PROMPT: &str =
  "You are a helpful coding assistant. Explain code clearly and concisely.";

#[derive(Clone, Debug)]
pub struct Assistant {
  client: Client,
  config: AssistConfig,
}

impl Assistant {
  pub fn new(config: AssistConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(config.timeout)
      .build()
      .context("failed to build assistant HTTP client")?;
    Ok(Self { client, config })
  }

  pub async fn complete(&self, code: &str, language: &str) -> Result<String> {
    debug!("complete language={language} len={}", code.len());
    self.chat(&self.completion_request(code, language)).await
  }

  pub async fn explain(&self, code: &str) -> Result<String> {
    debug!("explain len={}", code.len());
    self.chat(&self.explanation_request(code)).await
  }

  fn completion_request(&self, code: &str, language: &str) -> ChatRequest<'_> {
    ChatRequest {
      model: &self.config.model,
      messages: [
        ChatMessage { role: "system", content: COMPLETION_SYSTEM_PROMPT.to_owned() },
        ChatMessage {
          role: "user",
          content: format!(
            "Complete this {language} code. Only return the completion, no explanations:\n\n{code}"
          ),
        },
      ],
      max_tokens: 1000,
      temperature: 0.1,
    }
  }

  fn explanation_request(&self, code: &str) -> ChatRequest<'_> {
    ChatRequest {
      model: &self.config.model,
      messages: [
        ChatMessage { role: "system", content: EXPLANATION_SYSTEM_PROMPT.to_owned() },
        ChatMessage {
          role: "user",
          content: format!("Explain this code in simple terms:\n\n{code}"),
        },
      ],
      max_tokens: 500,
      temperature: 0.3,
    }
  }

  async fn chat(&self, request: &ChatRequest<'_>) -> Result<String> {
    let Some(api_key) = self.config.api_key.as_deref() else {
      bail!("assistant API key is not configured");
    };

    let response = self
      .client
      .post(&self.config.url)
      .bearer_auth(api_key)
      .json(request)
      .send()
      .await
      .context("assistant service is unreachable")?;

    let status = response.status();
    if !status.is_success() {
      bail!("assistant service returned {status}");
    }

    let body: ChatResponse = response.json().await.context("malformed assistant response")?;
    body.into_content()
  }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
  model: &'a str,
  messages: [ChatMessage; 2],
  max_tokens: u32,
  temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
  role: &'static str,
  content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
  choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
  message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
  content: String,
}

impl ChatResponse {
  fn into_content(self) -> Result<String> {
    self
      .choices
      .into_iter()
      .next()
      .map(|choice| choice.message.content.trim().to_owned())
      .context("assistant returned no choices")
  }
}
