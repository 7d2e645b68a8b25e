use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::room::{Room, RoomId};

pub type RoomHandle = Arc<RwLock<Room>>;

/// Live rooms by id. A room exists exactly while it has members.
#[derive(Clone, Debug, Default)]
pub struct RoomRegistry {
  rooms: Arc<RwLock<HashMap<RoomId, RoomHandle>>>,
}

impl RoomRegistry {
  pub fn get_or_create(&self, room_id: &RoomId) -> RoomHandle {
    if let Some(room) = self.get(room_id) {
      return room;
    }

    self
      .rooms
      .write()
      .entry(room_id.clone())
      .or_insert_with(|| {
        debug!("create room room_id={room_id}");
        Arc::new(RwLock::new(Room::new(room_id.clone())))
      })
      .clone()
  }

  pub fn get(&self, room_id: &RoomId) -> Option<RoomHandle> {
    self.rooms.read().get(room_id).cloned()
  }

  /// Drops the room if nobody is left in it. Returns whether it was dropped.
  pub fn remove_if_empty(&self, room_id: &RoomId) -> bool {
    // Lock order is registry, then room.
    let mut rooms = self.rooms.write();
    let Some(room) = rooms.get(room_id).cloned() else {
      return false;
    };

    let mut room = room.write();
    if !room.members.is_empty() {
      return false;
    }

    room.retired = true;
    rooms.remove(room_id);
    debug!("remove room room_id={room_id}");
    true
  }

  pub fn rooms(&self) -> Vec<RoomHandle> {
    self.rooms.read().values().cloned().collect()
  }

  pub fn len(&self) -> usize {
    self.rooms.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.rooms.read().is_empty()
  }
}

#[cfg(test)]
mod tests {
  use tokio::sync::mpsc;

  use super::*;
  use crate::collab::participant::ParticipantId;
  use crate::collab::room::Member;

  #[test]
  fn get_or_create_returns_same_room() {
    let registry = RoomRegistry::default();
    let id = RoomId::from("R1");

    let first = registry.get_or_create(&id);
    first.write().files.insert("main.js".into(), "x".into());
    let second = registry.get_or_create(&id);

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.len(), 1);
  }

  #[test]
  fn get_does_not_create() {
    let registry = RoomRegistry::default();
    assert!(registry.get(&RoomId::from("nope")).is_none());
    assert!(registry.is_empty());
  }

  #[test]
  fn remove_if_empty_keeps_occupied_rooms() {
    let registry = RoomRegistry::default();
    let id = RoomId::from("R1");
    let room = registry.get_or_create(&id);
    let (outbox, _inbox) = mpsc::unbounded_channel();
    let member_id = ParticipantId::new();
    room.write().members.insert(member_id, Member { id: member_id, username: "a".into(), outbox });

    assert!(!registry.remove_if_empty(&id));
    assert!(registry.get(&id).is_some());
  }

  #[test]
  fn remove_if_empty_retires_room_and_is_idempotent() {
    let registry = RoomRegistry::default();
    let id = RoomId::from("R1");
    let room = registry.get_or_create(&id);

    assert!(registry.remove_if_empty(&id));
    assert!(!registry.remove_if_empty(&id));
    assert!(room.read().retired);
    assert!(registry.get(&id).is_none());
  }
}
