use std::time::Duration;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_HEARTBEAT_SECS: u64 = 10;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_ASSIST_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_ASSIST_MODEL: &str = "llama3-8b-8192";

#[derive(Clone, Debug)]
pub struct Config {
  pub port: u16,
  /// Ping period; a connection that misses one full period is dropped.
  pub heartbeat_interval: Duration,
  /// CORS origin accepted by release builds. Debug builds accept any origin.
  pub allowed_origin: String,
  pub assist: AssistConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      port: DEFAULT_PORT,
      heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
      allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_owned(),
      assist: AssistConfig::default(),
    }
  }
}

#[derive(Clone, Debug)]
pub struct AssistConfig {
  pub url: String,
  pub api_key: Option<String>,
  pub model: String,
  pub timeout: Duration,
}

impl Default for AssistConfig {
  fn default() -> Self {
    Self {
      url: DEFAULT_ASSIST_URL.to_owned(),
      api_key: None,
      model: DEFAULT_ASSIST_MODEL.to_owned(),
      timeout: Duration::from_secs(10),
    }
  }
}
