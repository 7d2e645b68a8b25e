use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::event::Outbound;
use super::participant::{display_name, Outbox, Participant, ParticipantId};
use super::presence::Presence;
use super::registry::RoomRegistry;
use super::room::{Member, MemberInfo, RoomId, RoomSnapshot};

/// Tracks which connection sits in which room.
///
/// A connection is a member of at most one room. Joining another room leaves the current
/// one first, and leaving the last member out of a room drops that room from the registry.
#[derive(Clone, Debug)]
pub struct Membership {
  participants: Arc<RwLock<HashMap<ParticipantId, Arc<Mutex<Participant>>>>>,
  registry: RoomRegistry,
  presence: Presence,
}

impl Membership {
  pub fn new(registry: RoomRegistry, presence: Presence) -> Self {
    Self { participants: Default::default(), registry, presence }
  }

  pub fn connect(&self, outbox: Outbox) -> ParticipantId {
    let participant_id = ParticipantId::new();
    debug!("add participant participant={participant_id}");

    let participant = Arc::new(Mutex::new(Participant::new(participant_id, outbox)));
    self.participants.write().insert(participant_id, participant);
    participant_id
  }

  pub fn disconnect(&self, participant_id: ParticipantId) -> Result<()> {
    debug!("remove participant participant={participant_id}");

    self.leave(participant_id)?;
    self.participants.write().remove(&participant_id);
    self.presence.clear(participant_id);
    Ok(())
  }

  /// Puts the connection in `room_id`, creating the room on the fly.
  ///
  /// Other members get `user_joined`; the joiner gets the room snapshot, queued under the room
  /// lock so that it precedes any later broadcast from that room.
  pub fn join(
    &self,
    participant_id: ParticipantId,
    room_id: RoomId,
    username: &str,
  ) -> Result<RoomSnapshot> {
    debug!("join room participant={participant_id} room_id={room_id}");

    let participant = self.participant(participant_id)?;
    let mut participant = participant.lock();
    let username = display_name(username);

    match participant.room.take() {
      Some(current) if current == room_id => {
        if let Some(room) = self.registry.get(&current) {
          let mut room = room.write();
          if let Some(member) = room.members.get_mut(&participant_id) {
            // Re-joining is a rename; peers learn the new name through a fresh `user_joined`.
            let renamed = member.username != username;
            member.username = username.clone();
            if renamed {
              room.broadcast(
                participant_id,
                &Outbound::UserJoined { username, user_id: participant_id.to_string() },
              );
            }
            let snapshot = room.snapshot();
            room.send(participant_id, Outbound::RoomState(snapshot.clone()));
            participant.room = Some(current);
            return Ok(snapshot);
          }
        }
      }
      Some(previous) => self.leave_room(participant_id, &previous),
      None => {}
    }

    let snapshot = loop {
      let room = self.registry.get_or_create(&room_id);
      let mut room = room.write();
      if room.retired {
        continue;
      }

      room.members.insert(
        participant_id,
        Member {
          id: participant_id,
          username: username.clone(),
          outbox: participant.outbox.clone(),
        },
      );
      room.broadcast(
        participant_id,
        &Outbound::UserJoined { username: username.clone(), user_id: participant_id.to_string() },
      );

      let snapshot = room.snapshot();
      room.send(participant_id, Outbound::RoomState(snapshot.clone()));
      break snapshot;
    };

    participant.room = Some(room_id);
    Ok(snapshot)
  }

  /// Takes the connection out of its room. Returns the room it left, if any.
  pub fn leave(&self, participant_id: ParticipantId) -> Result<Option<RoomId>> {
    let participant = self.participant(participant_id)?;
    let mut participant = participant.lock();

    let Some(room_id) = participant.room.take() else {
      return Ok(None);
    };

    self.leave_room(participant_id, &room_id);
    Ok(Some(room_id))
  }

  fn leave_room(&self, participant_id: ParticipantId, room_id: &RoomId) {
    debug!("leave room participant={participant_id} room_id={room_id}");

    self.presence.clear(participant_id);
    if let Some(room) = self.registry.get(room_id) {
      let mut room = room.write();
      if let Some(member) = room.members.shift_remove(&participant_id) {
        room.broadcast(
          participant_id,
          &Outbound::UserLeft { username: member.username, user_id: participant_id.to_string() },
        );
      }
    }

    self.registry.remove_if_empty(room_id);
  }

  pub fn members_of(&self, room_id: &RoomId) -> Vec<MemberInfo> {
    self.registry.get(room_id).map(|room| room.read().member_infos()).unwrap_or_default()
  }

  pub fn room_of(&self, participant_id: ParticipantId) -> Option<RoomId> {
    self.participants.read().get(&participant_id).and_then(|p| p.lock().room.clone())
  }

  pub fn set_alive(&self, participant_id: ParticipantId, is_alive: bool) -> Result<()> {
    debug!("set participant alive is_alive={is_alive}");
    self.participant(participant_id)?.lock().is_alive = is_alive;
    Ok(())
  }

  pub fn is_alive(&self, participant_id: ParticipantId) -> bool {
    self.participants.read().get(&participant_id).map(|p| p.lock().is_alive).unwrap_or(false)
  }

  /// Queues `event` for a single connection regardless of its room.
  pub fn send(&self, participant_id: ParticipantId, event: Outbound) -> Result<()> {
    self
      .participant(participant_id)?
      .lock()
      .outbox
      .send(event)
      .with_context(|| format!("participant {participant_id} is gone"))
  }

  pub fn len(&self) -> usize {
    self.participants.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.participants.read().is_empty()
  }

  fn participant(&self, participant_id: ParticipantId) -> Result<Arc<Mutex<Participant>>> {
    self
      .participants
      .read()
      .get(&participant_id)
      .cloned()
      .with_context(|| format!("participant {participant_id} does not exist"))
  }
}
