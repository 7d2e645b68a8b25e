use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Result};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::stream::{self, SplitSink, SplitStream};
use futures_util::StreamExt;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_stream::wrappers::{IntervalStream, UnboundedReceiverStream};
use tracing::{debug, error, info, instrument};

use crate::collab::{Gateway, Inbound, Outbound, ParticipantId};
use crate::server::state::ServerState;

pub(crate) async fn session(
  ws: WebSocketUpgrade,
  State(state): State<ServerState>,
  ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
  ws.on_upgrade(move |socket| handle_socket(socket, state, addr))
}

#[instrument(name = "socket", skip_all, fields(addr = addr.to_string()))]
async fn handle_socket(socket: WebSocket, state: ServerState, addr: SocketAddr) {
  let (ws_sender, ws_receiver) = socket.split();
  let (outbox, events) = mpsc::unbounded_channel();
  let (pinger, pings) = mpsc::unbounded_channel();
  let gateway = state.gateway;
  let participant_id = gateway.connect(outbox);
  info!("{participant_id} connected");

  tokio::select! {
    _ = handle_channel(events, pings, ws_sender) => {},
    _ = handle_heartbeats(participant_id, pinger, gateway.clone(), state.heartbeat_interval) => {},
    _ = handle_messages(participant_id, ws_receiver, gateway.clone()) => {},
  }

  if let Err(e) = gateway.disconnect(participant_id) {
    error!("{e}");
  }
}

async fn handle_channel(
  events: UnboundedReceiver<Outbound>,
  pings: UnboundedReceiver<Message>,
  ws_sender: SplitSink<WebSocket, Message>,
) -> Result<()> {
  let events = UnboundedReceiverStream::new(events).map(|event| Message::Text(event.to_string()));
  stream::select(events, UnboundedReceiverStream::new(pings))
    .map(Ok::<_, axum::Error>)
    .forward(ws_sender)
    .await
    .map_err(Into::into)
}

#[instrument(name = "heartbeat", skip_all, fields(peer = participant_id.to_string()))]
async fn handle_heartbeats(
  participant_id: ParticipantId,
  pinger: UnboundedSender<Message>,
  gateway: Gateway,
  period: Duration,
) -> Result<()> {
  let mut stream = IntervalStream::new(tokio::time::interval(period));
  while stream.next().await.is_some() {
    if gateway.is_alive(participant_id) {
      debug!("send ping");
      gateway.set_alive(participant_id, false)?;
      pinger.send(Message::Ping(Vec::new()))?;
    } else {
      info!("connection timeout");
      break;
    }
  }
  Ok(())
}

#[instrument(name = "message", skip_all, fields(peer = participant_id.to_string()))]
async fn handle_messages(
  participant_id: ParticipantId,
  mut ws_receiver: SplitStream<WebSocket>,
  gateway: Gateway,
) {
  while let Some(Ok(message)) = ws_receiver.next().await {
    if let Message::Close(_) = message {
      info!("disconnected");
      break;
    }

    if let Err(e) = handle_message(message, participant_id, &gateway) {
      error!("{e}")
    }
  }
}

fn handle_message(
  message: Message,
  participant_id: ParticipantId,
  gateway: &Gateway,
) -> Result<()> {
  match message {
    Message::Text(payload) => handle_event(&payload, participant_id, gateway),
    Message::Binary(_) => bail!("unsupported binary message"),
    Message::Pong(_) => {
      debug!("recv pong");
      gateway.set_alive(participant_id, true)
    }
    Message::Ping(_) => {
      debug!("recv ping");
      Ok(())
    }
    Message::Close(_) => Ok(()),
  }
}

fn handle_event(payload: &str, participant_id: ParticipantId, gateway: &Gateway) -> Result<()> {
  let event: Inbound = payload.parse()?;
  info!("recv event event={}", event.name());
  gateway.handle(participant_id, event)
}
