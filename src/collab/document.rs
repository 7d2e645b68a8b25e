use tracing::{debug, warn};

use super::event::Outbound;
use super::participant::ParticipantId;
use super::presence::CursorPosition;
use super::registry::RoomRegistry;
use super::room::{Room, RoomId};

/// Applies file operations to a room and fans the result out to the other members.
///
/// Content is replicated whole: the last accepted write for a path wins and nothing is merged.
/// Each operation mutates and broadcasts under the room's write lock, so members observe
/// changes to one room in the order they were applied.
#[derive(Clone, Debug)]
pub struct Documents {
  registry: RoomRegistry,
}

impl Documents {
  pub fn new(registry: RoomRegistry) -> Self {
    Self { registry }
  }

  pub fn create_file(
    &self,
    room_id: &RoomId,
    from: ParticipantId,
    path: String,
    content: String,
  ) -> bool {
    debug!("create file room_id={room_id} path={path}");

    self.with_room(room_id, from, "create_file", |room| {
      room.files.insert(path.clone(), content.clone());
      room.broadcast(from, &Outbound::FileCreated { file_path: path, content });
    })
  }

  /// Deleting an unknown path changes nothing and notifies nobody.
  pub fn delete_file(&self, room_id: &RoomId, from: ParticipantId, path: String) -> bool {
    debug!("delete file room_id={room_id} path={path}");

    self.with_room(room_id, from, "delete_file", |room| {
      if room.files.shift_remove(&path).is_some() {
        if room.current_file.as_deref() == Some(path.as_str()) {
          room.current_file = None;
        }
        room.broadcast(from, &Outbound::FileDeleted { file_path: path });
      }
    })
  }

  /// Replaces the content of `path`, creating it if needed.
  pub fn update_file(
    &self,
    room_id: &RoomId,
    from: ParticipantId,
    path: String,
    content: String,
    cursor_position: CursorPosition,
  ) -> bool {
    debug!("update file room_id={room_id} path={path} len={}", content.len());

    self.with_room(room_id, from, "code_change", |room| {
      room.files.insert(path.clone(), content.clone());
      room.broadcast(
        from,
        &Outbound::CodeUpdate {
          file_path: path,
          content,
          user_id: from.to_string(),
          cursor_position,
        },
      );
    })
  }

  /// Points the room at `path`. The file does not have to exist.
  pub fn select_file(&self, room_id: &RoomId, from: ParticipantId, path: String) -> bool {
    debug!("select file room_id={room_id} path={path}");

    self.with_room(room_id, from, "select_file", |room| {
      let content = room.files.get(&path).cloned().unwrap_or_default();
      room.current_file = Some(path.clone());
      room.broadcast(from, &Outbound::FileSelected { file_path: path, content });
    })
  }

  fn with_room<F>(&self, room_id: &RoomId, from: ParticipantId, action: &str, op: F) -> bool
  where
    F: FnOnce(&mut Room),
  {
    let Some(room) = self.registry.get(room_id) else {
      warn!("drop {action}: room {room_id} does not exist");
      return false;
    };

    let mut room = room.write();
    if !room.is_member(from) {
      warn!("drop {action}: {from} is not a member of {room_id}");
      return false;
    }

    op(&mut *room);
    true
  }
}
