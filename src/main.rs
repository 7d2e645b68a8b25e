use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use codesync::config::{
  DEFAULT_ALLOWED_ORIGIN, DEFAULT_ASSIST_MODEL, DEFAULT_ASSIST_URL, DEFAULT_HEARTBEAT_SECS,
  DEFAULT_PORT,
};
use codesync::{AssistConfig, Config, Gateway, Server};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// Server port
  #[arg(
    short,
    long,
    env,
    default_value_t = DEFAULT_PORT,
    value_parser = clap::value_parser!(u16).range(1025..)
  )]
  port: u16,

  /// Seconds between heartbeat pings
  #[arg(
    long,
    env,
    default_value_t = DEFAULT_HEARTBEAT_SECS,
    value_parser = clap::value_parser!(u64).range(1..)
  )]
  heartbeat_secs: u64,

  /// CORS origin allowed in release builds
  #[arg(long, env, default_value = DEFAULT_ALLOWED_ORIGIN)]
  allowed_origin: String,

  /// Chat completions endpoint of the assistant service
  #[arg(long, env, default_value = DEFAULT_ASSIST_URL)]
  assist_url: String,

  /// API key of the assistant service
  #[arg(long, env, hide_env_values = true)]
  assist_key: Option<String>,

  /// Model requested from the assistant service
  #[arg(long, env, default_value = DEFAULT_ASSIST_MODEL)]
  assist_model: String,
}

impl From<Args> for Config {
  fn from(args: Args) -> Self {
    Self {
      port: args.port,
      heartbeat_interval: Duration::from_secs(args.heartbeat_secs),
      allowed_origin: args.allowed_origin,
      assist: AssistConfig {
        url: args.assist_url,
        api_key: args.assist_key,
        model: args.assist_model,
        ..Default::default()
      },
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let level = if cfg!(debug_assertions) { Level::DEBUG } else { Level::INFO };
  let filter = EnvFilter::builder()
    .with_default_directive(level.into())
    .from_env_lossy()
    .add_directive("hyper=off".parse()?)
    .add_directive("tungstenite=off".parse()?);

  if cfg!(not(debug_assertions)) {
    tracing_subscriber::fmt().with_env_filter(filter).init();
  } else {
    tracing_subscriber::fmt().with_env_filter(filter).without_time().init();
  }

  let args = Args::parse();
  let server = Server::new(args.into(), Gateway::new());
  server.listen().await
}
