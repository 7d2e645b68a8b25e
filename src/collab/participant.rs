use std::fmt;

use tokio::sync::mpsc::UnboundedSender;
use ulid::Ulid;

use super::event::Outbound;
use super::room::RoomId;

pub const MAX_USERNAME_LEN: usize = 20;

const ANONYMOUS: &str = "anonymous";

pub type Outbox = UnboundedSender<Outbound>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(Ulid);

impl ParticipantId {
  pub(super) fn new() -> Self {
    Self(Ulid::new())
  }
}

impl fmt::Display for ParticipantId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0.to_string().to_lowercase())
  }
}

/// A live connection and the room it currently sits in, if any.
#[derive(Debug)]
pub struct Participant {
  pub id: ParticipantId,
  pub room: Option<RoomId>,
  pub is_alive: bool,
  pub outbox: Outbox,
}

impl Participant {
  pub(super) fn new(id: ParticipantId, outbox: Outbox) -> Self {
    Self { id, room: None, is_alive: true, outbox }
  }
}

/// Trims a user supplied name and caps it at [`MAX_USERNAME_LEN`] characters.
pub fn display_name(raw: &str) -> String {
  let name: String = raw.trim().chars().take(MAX_USERNAME_LEN).collect();
  let name = name.trim_end();
  if name.is_empty() {
    ANONYMOUS.to_owned()
  } else {
    name.to_owned()
  }
}
