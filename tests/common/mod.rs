use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use codesync::{Config, Gateway, Server};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);
const SILENCE: Duration = Duration::from_millis(300);

pub struct TestServer {
  pub addr: SocketAddr,
  pub gateway: Gateway,
}

impl TestServer {
  pub async fn start() -> Self {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let gateway = Gateway::new();
    let server = Server::new(Config::default(), gateway.clone());
    tokio::spawn(server.serve(listener));
    Self { addr, gateway }
  }

  pub async fn connect(&self) -> Client {
    let (socket, _) = connect_async(format!("ws://{}/", self.addr)).await.unwrap();
    let mut client = Client { socket, id: String::new() };
    let connected = client.recv().await;
    assert_eq!(connected["event"], "connected");
    client.id = connected["data"]["user_id"].as_str().unwrap().to_owned();
    client
  }

  pub fn url(&self, path: &str) -> String {
    format!("http://{}{path}", self.addr)
  }
}

pub struct Client {
  socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
  pub id: String,
}

impl Client {
  pub async fn send(&mut self, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data });
    self.socket.send(Message::Text(frame.to_string())).await.unwrap();
  }

  pub async fn join(&mut self, room_id: &str, username: &str) -> Value {
    self.send("join_room", json!({ "room_id": room_id, "username": username })).await;
    let state = self.recv().await;
    assert_eq!(state["event"], "room_state");
    state["data"].clone()
  }

  /// Next application event, skipping websocket control frames.
  pub async fn recv(&mut self) -> Value {
    loop {
      let message = timeout(RECV_TIMEOUT, self.socket.next())
        .await
        .expect("timed out waiting for an event")
        .expect("socket closed")
        .unwrap();
      if let Message::Text(text) = message {
        return serde_json::from_str(&text).unwrap();
      }
    }
  }

  pub async fn expect_silence(&mut self) {
    let deadline = tokio::time::Instant::now() + SILENCE;
    loop {
      match tokio::time::timeout_at(deadline, self.socket.next()).await {
        Err(_) => return,
        Ok(Some(Ok(Message::Text(text)))) => panic!("unexpected event {text}"),
        Ok(Some(Ok(_))) => continue,
        Ok(other) => panic!("socket ended: {other:?}"),
      }
    }
  }

  pub async fn close(mut self) {
    self.socket.close(None).await.unwrap();
  }
}
