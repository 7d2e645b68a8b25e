use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::error;

use super::event::Outbound;
use super::participant::{Outbox, ParticipantId};

/// Case-sensitive room identifier chosen by the clients.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct RoomId(String);

impl RoomId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl From<&str> for RoomId {
  fn from(id: &str) -> Self {
    Self::new(id)
  }
}

impl fmt::Display for RoomId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct MemberInfo {
  pub user_id: String,
  pub username: String,
}

/// Everything a newly joined connection needs to catch up.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct RoomSnapshot {
  pub files: IndexMap<String, String>,
  pub users: Vec<MemberInfo>,
  pub current_file: Option<String>,
}

#[derive(Debug)]
pub struct Member {
  pub id: ParticipantId,
  pub username: String,
  pub outbox: Outbox,
}

impl Member {
  fn info(&self) -> MemberInfo {
    MemberInfo { user_id: self.id.to_string(), username: self.username.clone() }
  }
}

#[derive(Debug)]
pub struct Room {
  pub id: RoomId,
  pub files: IndexMap<String, String>,
  pub members: IndexMap<ParticipantId, Member>,
  pub current_file: Option<String>,
  // Set once the registry has dropped this room; a joiner holding a stale handle retries.
  pub(super) retired: bool,
}

impl Room {
  pub(super) fn new(id: RoomId) -> Self {
    Self {
      id,
      files: Default::default(),
      members: Default::default(),
      current_file: None,
      retired: false,
    }
  }

  pub fn is_member(&self, participant_id: ParticipantId) -> bool {
    self.members.contains_key(&participant_id)
  }

  pub fn member_infos(&self) -> Vec<MemberInfo> {
    self.members.values().map(Member::info).collect()
  }

  pub fn snapshot(&self) -> RoomSnapshot {
    RoomSnapshot {
      files: self.files.clone(),
      users: self.member_infos(),
      current_file: self.current_file.clone(),
    }
  }

  /// Queues `event` for every member except `from`.
  pub fn broadcast(&self, from: ParticipantId, event: &Outbound) {
    self.members.values().filter(|member| member.id != from).for_each(|member| {
      if member.outbox.send(event.clone()).is_err() {
        error!("room {} member {} is gone, dropping event", self.id, member.id)
      }
    });
  }

  pub fn send(&self, to: ParticipantId, event: Outbound) {
    if let Some(member) = self.members.get(&to) {
      if member.outbox.send(event).is_err() {
        error!("room {} member {} is gone, dropping event", self.id, member.id)
      }
    }
  }
}
