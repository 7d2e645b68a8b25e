mod handlers;
mod state;

use std::net::{SocketAddr, TcpListener};

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::{info, Level};

use crate::assist::Assistant;
use crate::collab::Gateway;
use crate::config::Config;

use self::state::ServerState;

pub struct Server {
  config: Config,
  gateway: Gateway,
}

impl Server {
  pub fn new(config: Config, gateway: Gateway) -> Self {
    Self { config, gateway }
  }

  pub async fn listen(self) -> Result<()> {
    info!("starting server: {}", self.config.port);
    let addr = SocketAddr::new([0, 0, 0, 0].into(), self.config.port);
    let listener = TcpListener::bind(addr).with_context(|| format!("failed to bind {addr}"))?;
    self.serve(listener).await
  }

  /// Serves on an already bound listener.
  pub async fn serve(self, listener: TcpListener) -> Result<()> {
    let app = self.router()?;
    axum::Server::from_tcp(listener)?
      .serve(app.into_make_service_with_connect_info::<SocketAddr>())
      .await?;

    Ok(())
  }

  fn router(self) -> Result<Router> {
    let assistant = Assistant::new(self.config.assist.clone())?;
    let state = ServerState::new(self.gateway, assistant, self.config.heartbeat_interval);
    let app = Router::new()
      .route("/", get(handlers::session))
      .route("/info", get(handlers::info))
      .route("/api/complete", post(handlers::complete))
      .route("/api/explain", post(handlers::explain))
      .layer(cors(&self.config.allowed_origin)?)
      .layer(trace())
      .with_state(state);

    Ok(app)
  }
}

fn cors(allowed_origin: &str) -> Result<CorsLayer> {
  let layer = CorsLayer::new()
    .allow_methods([Method::GET, Method::POST])
    .allow_headers([header::CONTENT_TYPE]);

  if cfg!(not(debug_assertions)) {
    let origin: HeaderValue =
      allowed_origin.parse().with_context(|| format!("invalid allowed origin {allowed_origin}"))?;
    Ok(layer.allow_origin([origin]))
  } else {
    Ok(layer.allow_origin(Any))
  }
}

fn trace() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
  TraceLayer::new_for_http()
    .on_response(DefaultOnResponse::new().level(Level::INFO).latency_unit(LatencyUnit::Micros))
}
