use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::participant::ParticipantId;

/// 1-based caret location inside a file.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CursorPosition {
  pub line: u32,
  pub column: u32,
}

impl CursorPosition {
  pub fn new(line: u32, column: u32) -> Self {
    Self { line, column }
  }
}

impl Default for CursorPosition {
  fn default() -> Self {
    Self { line: 1, column: 1 }
  }
}

#[derive(Clone, Debug)]
pub struct Cursor {
  pub position: CursorPosition,
  pub username: Option<String>,
}

/// Last known cursor of every connection. Advisory only: nothing reads it back into
/// document state and it is never part of a room snapshot.
#[derive(Clone, Debug, Default)]
pub struct Presence {
  cursors: Arc<RwLock<HashMap<ParticipantId, Cursor>>>,
}

impl Presence {
  pub fn set_cursor(
    &self,
    participant_id: ParticipantId,
    position: CursorPosition,
    username: Option<String>,
  ) {
    debug!(
      "set cursor participant={participant_id} line={} column={}",
      position.line, position.column
    );

    let mut cursors = self.cursors.write();
    match cursors.get_mut(&participant_id) {
      Some(cursor) => {
        cursor.position = position;
        if username.is_some() {
          cursor.username = username;
        }
      }
      None => {
        cursors.insert(participant_id, Cursor { position, username });
      }
    }
  }

  pub fn clear(&self, participant_id: ParticipantId) {
    if self.cursors.write().remove(&participant_id).is_some() {
      debug!("clear cursor participant={participant_id}");
    }
  }

  pub fn get(&self, participant_id: ParticipantId) -> Option<CursorPosition> {
    self.cursors.read().get(&participant_id).map(|cursor| cursor.position)
  }

  pub fn len(&self) -> usize {
    self.cursors.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.cursors.read().is_empty()
  }
}
