use std::time::Duration;

use crate::assist::Assistant;
use crate::collab::Gateway;

#[derive(Clone)]
pub(crate) struct ServerState {
  pub gateway: Gateway,
  pub assistant: Assistant,
  pub heartbeat_interval: Duration,
}

impl ServerState {
  pub fn new(gateway: Gateway, assistant: Assistant, heartbeat_interval: Duration) -> Self {
    Self { gateway, assistant, heartbeat_interval }
  }
}
