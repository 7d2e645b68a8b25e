use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::participant::ParticipantId;
use super::presence::CursorPosition;
use super::room::{RoomId, RoomSnapshot};

/// Actions a connection can send. Every frame is `{"event": <name>, "data": {..}}`.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Inbound {
  JoinRoom {
    room_id: RoomId,
    username: String,
  },
  LeaveRoom {
    room_id: RoomId,
  },
  CodeChange {
    room_id: RoomId,
    file_path: String,
    content: String,
    #[serde(default, deserialize_with = "lenient_cursor")]
    cursor_position: CursorPosition,
  },
  CursorMove {
    room_id: RoomId,
    cursor_position: CursorPosition,
  },
  CreateFile {
    room_id: RoomId,
    file_path: String,
    #[serde(default)]
    content: String,
  },
  DeleteFile {
    room_id: RoomId,
    file_path: String,
  },
  SelectFile {
    room_id: RoomId,
    file_path: String,
  },
  Ping,
}

impl Inbound {
  pub fn name(&self) -> &'static str {
    match self {
      Self::JoinRoom { .. } => "join_room",
      Self::LeaveRoom { .. } => "leave_room",
      Self::CodeChange { .. } => "code_change",
      Self::CursorMove { .. } => "cursor_move",
      Self::CreateFile { .. } => "create_file",
      Self::DeleteFile { .. } => "delete_file",
      Self::SelectFile { .. } => "select_file",
      Self::Ping => "ping",
    }
  }
}

impl FromStr for Inbound {
  type Err = serde_json::Error;

  fn from_str(s: &str) -> serde_json::Result<Self> {
    serde_json::from_str(s)
  }
}

/// A cursor that is missing, null or malformed must not cost the edit it rides along with.
fn lenient_cursor<'de, D: Deserializer<'de>>(deserializer: D) -> Result<CursorPosition, D::Error> {
  let value = serde_json::Value::deserialize(deserializer)?;
  Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Notifications pushed to connections.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Outbound {
  Connected {
    user_id: String,
    status: String,
  },
  RoomState(RoomSnapshot),
  UserJoined {
    username: String,
    user_id: String,
  },
  UserLeft {
    username: String,
    user_id: String,
  },
  CodeUpdate {
    file_path: String,
    content: String,
    user_id: String,
    cursor_position: CursorPosition,
  },
  CursorUpdate {
    user_id: String,
    cursor_position: CursorPosition,
    username: String,
  },
  FileCreated {
    file_path: String,
    content: String,
  },
  FileDeleted {
    file_path: String,
  },
  FileSelected {
    file_path: String,
    content: String,
  },
  Pong,
}

impl Outbound {
  pub fn connected(participant_id: ParticipantId) -> Self {
    Self::Connected { user_id: participant_id.to_string(), status: "Connected to CodeSync".into() }
  }
}

impl fmt::Display for Outbound {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&serde_json::to_string(self).map_err(|_| fmt::Error)?)
  }
}
