mod document;
mod event;
mod membership;
mod participant;
mod presence;
mod registry;
mod room;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

pub use self::document::Documents;
pub use self::event::{Inbound, Outbound};
pub use self::membership::Membership;
pub use self::participant::{display_name, Outbox, ParticipantId, MAX_USERNAME_LEN};
pub use self::presence::{Cursor, CursorPosition, Presence};
pub use self::registry::{RoomHandle, RoomRegistry};
pub use self::room::{MemberInfo, Room, RoomId, RoomSnapshot};

/// Entry point for everything a connection does.
///
/// A connection is either unjoined or joined to exactly one room. Every action except
/// `join_room` and `ping` needs the joined state and must name the room the connection is in;
/// anything else is logged and dropped without a reply.
#[derive(Clone, Debug)]
pub struct Gateway {
  registry: RoomRegistry,
  membership: Membership,
  documents: Documents,
  presence: Presence,
}

impl Default for Gateway {
  fn default() -> Self {
    Self::new()
  }
}

impl Gateway {
  pub fn new() -> Self {
    let registry = RoomRegistry::default();
    let presence = Presence::default();
    let membership = Membership::new(registry.clone(), presence.clone());
    let documents = Documents::new(registry.clone());
    Self { registry, membership, documents, presence }
  }

  pub fn connect(&self, outbox: Outbox) -> ParticipantId {
    let participant_id = self.membership.connect(outbox);
    if let Err(e) = self.membership.send(participant_id, Outbound::connected(participant_id)) {
      warn!("{e}");
    }
    participant_id
  }

  /// Transport went away: implicit leave, then forget the connection.
  pub fn disconnect(&self, participant_id: ParticipantId) -> Result<()> {
    info!("{participant_id} disconnected");
    self.membership.disconnect(participant_id)
  }

  pub fn set_alive(&self, participant_id: ParticipantId, is_alive: bool) -> Result<()> {
    self.membership.set_alive(participant_id, is_alive)
  }

  pub fn is_alive(&self, participant_id: ParticipantId) -> bool {
    self.membership.is_alive(participant_id)
  }

  pub fn handle(&self, participant_id: ParticipantId, event: Inbound) -> Result<()> {
    match event {
      Inbound::JoinRoom { room_id, username } => {
        self.membership.join(participant_id, room_id, &username)?;
      }
      Inbound::LeaveRoom { room_id } => {
        if self.joined(participant_id, &room_id, "leave_room").is_some() {
          self.membership.leave(participant_id)?;
        }
      }
      Inbound::CodeChange { room_id, file_path, content, cursor_position } => {
        if let Some(room_id) = self.joined(participant_id, &room_id, "code_change") {
          let applied = self.documents.update_file(
            &room_id,
            participant_id,
            file_path,
            content,
            cursor_position,
          );
          if applied {
            self.presence.set_cursor(participant_id, cursor_position, None);
          }
        }
      }
      Inbound::CursorMove { room_id, cursor_position } => {
        if let Some(room_id) = self.joined(participant_id, &room_id, "cursor_move") {
          self.move_cursor(participant_id, &room_id, cursor_position);
        }
      }
      Inbound::CreateFile { room_id, file_path, content } => {
        if let Some(room_id) = self.joined(participant_id, &room_id, "create_file") {
          self.documents.create_file(&room_id, participant_id, file_path, content);
        }
      }
      Inbound::DeleteFile { room_id, file_path } => {
        if let Some(room_id) = self.joined(participant_id, &room_id, "delete_file") {
          self.documents.delete_file(&room_id, participant_id, file_path);
        }
      }
      Inbound::SelectFile { room_id, file_path } => {
        if let Some(room_id) = self.joined(participant_id, &room_id, "select_file") {
          self.documents.select_file(&room_id, participant_id, file_path);
        }
      }
      Inbound::Ping => self.membership.send(participant_id, Outbound::Pong)?,
    }

    Ok(())
  }

  pub fn cursor(&self, participant_id: ParticipantId) -> Option<CursorPosition> {
    self.presence.get(participant_id)
  }

  pub fn room_of(&self, participant_id: ParticipantId) -> Option<RoomId> {
    self.membership.room_of(participant_id)
  }

  pub fn snapshot(&self, room_id: &RoomId) -> Option<RoomSnapshot> {
    self.registry.get(room_id).map(|room| room.read().snapshot())
  }

  pub fn info(&self) -> Info {
    let mut rooms: Vec<RoomInfo> = self
      .registry
      .rooms()
      .iter()
      .map(|room| {
        let room = room.read();
        RoomInfo {
          id: room.id.clone(),
          users: room.member_infos(),
          files: room.files.keys().cloned().collect(),
          current_file: room.current_file.clone(),
        }
      })
      .collect();
    rooms.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));

    Info { connections: self.membership.len(), cursors: self.presence.len(), rooms }
  }

  fn joined(
    &self,
    participant_id: ParticipantId,
    claimed: &RoomId,
    action: &str,
  ) -> Option<RoomId> {
    match self.membership.room_of(participant_id) {
      Some(room_id) if room_id == *claimed => Some(room_id),
      Some(room_id) => {
        warn!("drop {action}: {participant_id} is in {room_id}, not {claimed}");
        None
      }
      None => {
        warn!("drop {action}: {participant_id} has not joined a room");
        None
      }
    }
  }

  fn move_cursor(&self, participant_id: ParticipantId, room_id: &RoomId, position: CursorPosition) {
    let Some(room) = self.registry.get(room_id) else {
      warn!("drop cursor_move: room {room_id} does not exist");
      return;
    };

    let room = room.read();
    let Some(member) = room.members.get(&participant_id) else {
      warn!("drop cursor_move: {participant_id} is not a member of {room_id}");
      return;
    };

    self.presence.set_cursor(participant_id, position, Some(member.username.clone()));
    room.broadcast(
      participant_id,
      &Outbound::CursorUpdate {
        user_id: participant_id.to_string(),
        cursor_position: position,
        username: member.username.clone(),
      },
    );
  }
}

#[derive(Debug, Serialize)]
pub struct Info {
  pub connections: usize,
  pub cursors: usize,
  pub rooms: Vec<RoomInfo>,
}

#[derive(Debug, Serialize)]
pub struct RoomInfo {
  pub id: RoomId,
  pub users: Vec<MemberInfo>,
  pub files: Vec<String>,
  pub current_file: Option<String>,
}

#[cfg(test)]
mod tests {
  use std::thread;

  use tokio::sync::mpsc::{self, UnboundedReceiver};

  use super::*;

  fn connect(gateway: &Gateway) -> (ParticipantId, UnboundedReceiver<Outbound>) {
    let (outbox, mut inbox) = mpsc::unbounded_channel();
    let id = gateway.connect(outbox);
    assert!(matches!(inbox.try_recv(), Ok(Outbound::Connected { .. })));
    (id, inbox)
  }

  fn drain(inbox: &mut UnboundedReceiver<Outbound>) -> Vec<Outbound> {
    std::iter::from_fn(|| inbox.try_recv().ok()).collect()
  }

  fn join(room_id: &str, username: &str) -> Inbound {
    Inbound::JoinRoom { room_id: room_id.into(), username: username.into() }
  }

  #[test]
  fn connected_event_carries_participant_id() {
    let gateway = Gateway::new();
    let (outbox, mut inbox) = mpsc::unbounded_channel();
    let id = gateway.connect(outbox);

    match inbox.try_recv().unwrap() {
      Outbound::Connected { user_id, .. } => assert_eq!(user_id, id.to_string()),
      other => panic!("unexpected event {other:?}"),
    }
  }

  #[test]
  fn actions_while_unjoined_are_dropped() {
    let gateway = Gateway::new();
    let (alice, mut alice_inbox) = connect(&gateway);

    gateway
      .handle(
        alice,
        Inbound::CreateFile { room_id: "R1".into(), file_path: "a".into(), content: "x".into() },
      )
      .unwrap();
    gateway
      .handle(
        alice,
        Inbound::CursorMove { room_id: "R1".into(), cursor_position: CursorPosition::new(1, 2) },
      )
      .unwrap();
    gateway.handle(alice, Inbound::LeaveRoom { room_id: "R1".into() }).unwrap();

    assert!(gateway.snapshot(&"R1".into()).is_none());
    assert_eq!(gateway.cursor(alice), None);
    assert!(drain(&mut alice_inbox).is_empty());
  }

  #[test]
  fn actions_naming_another_room_are_dropped() {
    let gateway = Gateway::new();
    let (alice, _alice_inbox) = connect(&gateway);
    let (bob, _bob_inbox) = connect(&gateway);
    gateway.handle(alice, join("R1", "alice")).unwrap();
    gateway.handle(bob, join("R2", "bob")).unwrap();

    gateway
      .handle(
        alice,
        Inbound::CreateFile { room_id: "R2".into(), file_path: "a".into(), content: "x".into() },
      )
      .unwrap();
    gateway.handle(alice, Inbound::LeaveRoom { room_id: "R2".into() }).unwrap();

    assert!(gateway.snapshot(&"R2".into()).unwrap().files.is_empty());
    assert_eq!(gateway.room_of(alice), Some("R1".into()));
  }

  #[test]
  fn code_change_records_originator_cursor() {
    let gateway = Gateway::new();
    let (alice, _alice_inbox) = connect(&gateway);
    gateway.handle(alice, join("R1", "alice")).unwrap();

    gateway
      .handle(
        alice,
        Inbound::CodeChange {
          room_id: "R1".into(),
          file_path: "main.js".into(),
          content: "let x".into(),
          cursor_position: CursorPosition::new(1, 6),
        },
      )
      .unwrap();

    assert_eq!(gateway.cursor(alice), Some(CursorPosition::new(1, 6)));
    assert_eq!(
      gateway.snapshot(&"R1".into()).unwrap().files.get("main.js").map(String::as_str),
      Some("let x")
    );
  }

  #[test]
  fn cursor_move_broadcasts_with_username() {
    let gateway = Gateway::new();
    let (alice, mut alice_inbox) = connect(&gateway);
    let (bob, mut bob_inbox) = connect(&gateway);
    gateway.handle(alice, join("R1", "alice")).unwrap();
    gateway.handle(bob, join("R1", "bob")).unwrap();
    drain(&mut alice_inbox);
    drain(&mut bob_inbox);

    let position = CursorPosition::new(5, 9);
    gateway
      .handle(bob, Inbound::CursorMove { room_id: "R1".into(), cursor_position: position })
      .unwrap();

    assert_eq!(
      drain(&mut alice_inbox),
      vec![Outbound::CursorUpdate {
        user_id: bob.to_string(),
        cursor_position: position,
        username: "bob".into()
      }]
    );
    assert!(drain(&mut bob_inbox).is_empty());
  }

  #[test]
  fn disconnect_notifies_room_and_clears_cursor() {
    let gateway = Gateway::new();
    let (alice, mut alice_inbox) = connect(&gateway);
    let (bob, _bob_inbox) = connect(&gateway);
    gateway.handle(alice, join("R1", "alice")).unwrap();
    gateway.handle(bob, join("R1", "bob")).unwrap();
    let position = CursorPosition::new(2, 3);
    gateway
      .handle(bob, Inbound::CursorMove { room_id: "R1".into(), cursor_position: position })
      .unwrap();
    drain(&mut alice_inbox);

    gateway.disconnect(bob).unwrap();

    assert_eq!(
      drain(&mut alice_inbox),
      vec![Outbound::UserLeft { username: "bob".into(), user_id: bob.to_string() }]
    );
    assert_eq!(gateway.cursor(bob), None);
    assert_eq!(gateway.info().connections, 1);
  }

  #[test]
  fn snapshot_seeds_current_file_for_late_joiner() {
    let gateway = Gateway::new();
    let (alice, _alice_inbox) = connect(&gateway);
    let (bob, mut bob_inbox) = connect(&gateway);
    gateway.handle(alice, join("R1", "alice")).unwrap();
    gateway
      .handle(
        alice,
        Inbound::CreateFile {
          room_id: "R1".into(),
          file_path: "main.js".into(),
          content: "//".into(),
        },
      )
      .unwrap();
    gateway
      .handle(alice, Inbound::SelectFile { room_id: "R1".into(), file_path: "main.js".into() })
      .unwrap();

    gateway.handle(bob, join("R1", "bob")).unwrap();

    match drain(&mut bob_inbox).as_slice() {
      [Outbound::RoomState(snapshot)] => {
        assert_eq!(snapshot.current_file.as_deref(), Some("main.js"));
        assert_eq!(snapshot.files.get("main.js").map(String::as_str), Some("//"));
        assert_eq!(snapshot.users.len(), 2);
      }
      other => panic!("unexpected events {other:?}"),
    }
  }

  #[test]
  fn ping_is_answered_even_when_unjoined() {
    let gateway = Gateway::new();
    let (alice, mut alice_inbox) = connect(&gateway);

    gateway.handle(alice, Inbound::Ping).unwrap();

    assert_eq!(drain(&mut alice_inbox), vec![Outbound::Pong]);
  }

  #[test]
  fn info_lists_live_rooms() {
    let gateway = Gateway::new();
    let (alice, _alice_inbox) = connect(&gateway);
    gateway.handle(alice, join("R1", "alice")).unwrap();

    let info = gateway.info();
    assert_eq!(info.rooms.len(), 1);
    assert_eq!(info.rooms[0].id, RoomId::from("R1"));

    gateway.handle(alice, Inbound::LeaveRoom { room_id: "R1".into() }).unwrap();
    assert!(gateway.info().rooms.is_empty());
  }

  #[test]
  fn concurrent_joins_keep_one_room_per_connection() {
    let gateway = Gateway::new();

    let workers: Vec<_> = (0..8)
      .map(|worker| {
        let gateway = gateway.clone();
        thread::spawn(move || {
          let (outbox, mut inbox) = mpsc::unbounded_channel();
          let id = gateway.connect(outbox);
          for round in 0..500 {
            let room_id = if (worker + round) % 2 == 0 { "R1" } else { "R2" };
            gateway.handle(id, join(room_id, "worker")).unwrap();
            assert_eq!(gateway.room_of(id), Some(room_id.into()));
            let memberships =
              gateway.registry.rooms().iter().filter(|room| room.read().is_member(id)).count();
            assert_eq!(memberships, 1);

            gateway
              .handle(
                id,
                Inbound::CreateFile {
                  room_id: room_id.into(),
                  file_path: format!("{worker}.txt"),
                  content: round.to_string(),
                },
              )
              .unwrap();

            if round % 3 == 0 {
              gateway.handle(id, Inbound::LeaveRoom { room_id: room_id.into() }).unwrap();
              assert_eq!(gateway.room_of(id), None);
            }
            drain(&mut inbox);
          }
          gateway.disconnect(id).unwrap();
        })
      })
      .collect();

    for worker in workers {
      worker.join().unwrap();
    }

    let info = gateway.info();
    assert!(info.rooms.is_empty());
    assert_eq!(info.connections, 0);
    assert_eq!(info.cursors, 0);
  }

  #[test]
  fn racing_updates_reach_observer_in_accepted_order() {
    const EDITS: usize = 1000;

    let gateway = Gateway::new();
    let (observer, mut observer_inbox) = connect(&gateway);
    gateway.handle(observer, join("R1", "observer")).unwrap();

    let (alice, _alice_inbox) = connect(&gateway);
    let (bob, _bob_inbox) = connect(&gateway);
    gateway.handle(alice, join("R1", "alice")).unwrap();
    gateway.handle(bob, join("R1", "bob")).unwrap();
    drain(&mut observer_inbox);

    let writers: Vec<_> = [(alice, "alice"), (bob, "bob")]
      .into_iter()
      .map(|(id, name)| {
        let gateway = gateway.clone();
        thread::spawn(move || {
          for seq in 0..EDITS {
            let edit = Inbound::CodeChange {
              room_id: "R1".into(),
              file_path: "main.js".into(),
              content: format!("{name}:{seq}"),
              cursor_position: CursorPosition::default(),
            };
            gateway.handle(id, edit).unwrap();
          }
        })
      })
      .collect();

    for writer in writers {
      writer.join().unwrap();
    }

    let received: Vec<String> = drain(&mut observer_inbox)
      .into_iter()
      .map(|event| match event {
        Outbound::CodeUpdate { content, .. } => content,
        other => panic!("unexpected event {other:?}"),
      })
      .collect();
    assert_eq!(received.len(), 2 * EDITS);

    for name in ["alice", "bob"] {
      let seqs: Vec<usize> = received
        .iter()
        .filter_map(|content| content.strip_prefix(name)?.strip_prefix(':')?.parse().ok())
        .collect();
      assert_eq!(seqs, (0..EDITS).collect::<Vec<_>>());
    }

    let stored = gateway.snapshot(&"R1".into()).unwrap().files["main.js"].clone();
    assert_eq!(received.last(), Some(&stored));
  }
}
