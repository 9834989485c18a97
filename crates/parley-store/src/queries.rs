use crate::models::{GroupRoomRow, JoinedMessageRow, MessageRow, PairwiseRoomRow};
use crate::Store;
use anyhow::Result;
use chrono::Utc;
use rusqlite::params;
use tracing::warn;
use uuid::Uuid;

use parley_types::models::Topology;

/// The two topologies are stored in two independent (room, message) table
/// pairs; every query selects its tables through these helpers.
fn message_table(topology: Topology) -> &'static str {
    match topology {
        Topology::Pairwise => "chat_messages",
        Topology::Group => "together_messages",
    }
}

fn room_table(topology: Topology) -> &'static str {
    match topology {
        Topology::Pairwise => "chat_rooms",
        Topology::Group => "together_rooms",
    }
}

impl Store {
    // -- Messages --

    /// Append a message to a room. The room id is not checked against the
    /// room table — an append to an unknown room succeeds and is only
    /// logged. `seq` is assigned per room inside the same lock hold, so
    /// listing by `seq` always equals append order.
    pub fn append_message(
        &self,
        topology: Topology,
        room_id: i64,
        sender_id: &str,
        message: &str,
        write_day: &str,
    ) -> Result<MessageRow> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().to_rfc3339();

        self.with_conn(|conn| {
            let room_known: bool = conn.query_row(
                &format!(
                    "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)",
                    room_table(topology)
                ),
                [room_id],
                |row| row.get(0),
            )?;
            if !room_known {
                warn!("append targets unknown {} room {}", topology, room_id);
            }

            let table = message_table(topology);

            // The connection mutex serializes appends, so the max(seq) read
            // and the insert form one atomic step per room.
            let seq: i64 = conn.query_row(
                &format!(
                    "SELECT COALESCE(MAX(seq), 0) + 1 FROM {} WHERE room_id = ?1",
                    table
                ),
                [room_id],
                |row| row.get(0),
            )?;

            conn.execute(
                &format!(
                    "INSERT INTO {} (id, room_id, sender_id, message, write_day, read, seq, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)",
                    table
                ),
                params![&id, room_id, sender_id, message, write_day, seq, &created_at],
            )?;

            Ok(MessageRow {
                id,
                room_id,
                sender_id: sender_id.to_string(),
                message: message.to_string(),
                write_day: write_day.to_string(),
                read: false,
                seq,
                created_at,
            })
        })
    }

    /// All messages in a room, in append order.
    pub fn messages_in_room(&self, topology: Topology, room_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT id, room_id, sender_id, message, write_day, read, seq, created_at
                 FROM {} WHERE room_id = ?1 ORDER BY seq",
                message_table(topology)
            ))?;

            let rows = stmt
                .query_map([room_id], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        room_id: row.get(1)?,
                        sender_id: row.get(2)?,
                        message: row.get(3)?,
                        write_day: row.get(4)?,
                        read: row.get(5)?,
                        seq: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Set `read = 1` on every message currently in the room. No unread
    /// filter: re-running matches the same rows again, which keeps the
    /// operation idempotent. Returns the matched count; zero means the room
    /// has no messages at all.
    pub fn mark_room_read(&self, topology: Topology, room_id: i64) -> Result<usize> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                &format!(
                    "UPDATE {} SET read = 1 WHERE room_id = ?1",
                    message_table(topology)
                ),
                [room_id],
            )?;
            Ok(updated)
        })
    }

    // -- Rooms --

    /// Returns false if a pairwise room with this id already exists.
    pub fn create_pairwise_room(&self, id: i64, member1: &str, member2: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO chat_rooms (id, member1, member2) VALUES (?1, ?2, ?3)",
                params![id, member1, member2],
            )?;
            Ok(inserted == 1)
        })
    }

    /// Returns false if a group room with this id already exists. The member
    /// list is persisted as JSON text, order preserved.
    pub fn create_group_room(&self, id: i64, together_id: &str, members: &[String]) -> Result<bool> {
        let members_json = serde_json::to_string(members)?;
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO together_rooms (id, together_id, members) VALUES (?1, ?2, ?3)",
                params![id, together_id, &members_json],
            )?;
            Ok(inserted == 1)
        })
    }

    // -- Joined room views --

    /// Every pairwise room with its full message sequence. Rooms with zero
    /// messages still appear, with an empty sequence. Ordering is stable:
    /// rooms by id, messages by seq.
    pub fn pairwise_rooms_joined(&self) -> Result<Vec<(PairwiseRoomRow, Vec<JoinedMessageRow>)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.member1, r.member2, m.sender_id, m.message, m.write_day, m.read
                 FROM chat_rooms r
                 LEFT JOIN chat_messages m ON m.room_id = r.id
                 ORDER BY r.id, m.seq",
            )?;

            let mut out: Vec<(PairwiseRoomRow, Vec<JoinedMessageRow>)> = Vec::new();
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let room_id: i64 = row.get(0)?;
                if out.last().map(|(room, _)| room.id) != Some(room_id) {
                    out.push((
                        PairwiseRoomRow {
                            id: room_id,
                            member1: row.get(1)?,
                            member2: row.get(2)?,
                        },
                        Vec::new(),
                    ));
                }
                // NULL sender marks a room with no messages
                let sender_id: Option<String> = row.get(3)?;
                if let (Some((_, messages)), Some(sender_id)) = (out.last_mut(), sender_id) {
                    messages.push(JoinedMessageRow {
                        sender_id,
                        message: row.get(4)?,
                        write_day: row.get(5)?,
                        read: row.get(6)?,
                    });
                }
            }

            Ok(out)
        })
    }

    /// Group-topology counterpart of [`Store::pairwise_rooms_joined`]. The
    /// two listings are never merged: group rooms join on their own message
    /// table and id namespace.
    pub fn group_rooms_joined(&self) -> Result<Vec<(GroupRoomRow, Vec<JoinedMessageRow>)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.together_id, r.members, m.sender_id, m.message, m.write_day, m.read
                 FROM together_rooms r
                 LEFT JOIN together_messages m ON m.room_id = r.id
                 ORDER BY r.id, m.seq",
            )?;

            let mut out: Vec<(GroupRoomRow, Vec<JoinedMessageRow>)> = Vec::new();
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let room_id: i64 = row.get(0)?;
                if out.last().map(|(room, _)| room.id) != Some(room_id) {
                    out.push((
                        GroupRoomRow {
                            id: room_id,
                            together_id: row.get(1)?,
                            members: row.get(2)?,
                        },
                        Vec::new(),
                    ));
                }
                let sender_id: Option<String> = row.get(3)?;
                if let (Some((_, messages)), Some(sender_id)) = (out.last_mut(), sender_id) {
                    messages.push(JoinedMessageRow {
                        sender_id,
                        message: row.get(4)?,
                        write_day: row.get(5)?,
                        read: row.get(6)?,
                    });
                }
            }

            Ok(out)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::open_in_memory().unwrap()
    }

    #[test]
    fn empty_room_appears_in_joined_view() {
        let store = store();
        store.create_pairwise_room(1, "alice", "bob").unwrap();

        let rooms = store.pairwise_rooms_joined().unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].0.id, 1);
        assert!(rooms[0].1.is_empty());
    }

    #[test]
    fn append_order_is_preserved() {
        let store = store();
        store.create_pairwise_room(1, "alice", "bob").unwrap();

        for i in 0..5 {
            store
                .append_message(Topology::Pairwise, 1, "alice", &format!("msg {i}"), "2024-01-01")
                .unwrap();
        }

        let messages = store.messages_in_room(Topology::Pairwise, 1).unwrap();
        assert_eq!(messages.len(), 5);
        for (i, msg) in messages.iter().enumerate() {
            assert_eq!(msg.message, format!("msg {i}"));
            assert_eq!(msg.seq, i as i64 + 1);
        }
    }

    #[test]
    fn append_succeeds_without_room_record() {
        let store = store();
        let row = store
            .append_message(Topology::Pairwise, 42, "ghost", "anyone here?", "2024-01-01")
            .unwrap();
        assert_eq!(row.room_id, 42);
        assert_eq!(store.messages_in_room(Topology::Pairwise, 42).unwrap().len(), 1);
    }

    #[test]
    fn send_then_read_scenario() {
        let store = store();
        store
            .append_message(Topology::Pairwise, 5, "u1", "hi", "2024-01-01")
            .unwrap();

        let messages = store.messages_in_room(Topology::Pairwise, 5).unwrap();
        assert_eq!(messages.len(), 1);
        assert!(!messages[0].read);
        assert_eq!(messages[0].sender_id, "u1");
        assert_eq!(messages[0].message, "hi");
        assert_eq!(messages[0].write_day, "2024-01-01");

        let updated = store.mark_room_read(Topology::Pairwise, 5).unwrap();
        assert_eq!(updated, 1);

        let messages = store.messages_in_room(Topology::Pairwise, 5).unwrap();
        assert!(messages[0].read);
    }

    #[test]
    fn mark_room_read_is_idempotent() {
        let store = store();
        store
            .append_message(Topology::Group, 3, "a", "one", "2024-01-01")
            .unwrap();
        store
            .append_message(Topology::Group, 3, "b", "two", "2024-01-01")
            .unwrap();

        // Update-matched semantics: the second run matches the same rows
        assert_eq!(store.mark_room_read(Topology::Group, 3).unwrap(), 2);
        assert_eq!(store.mark_room_read(Topology::Group, 3).unwrap(), 2);

        let messages = store.messages_in_room(Topology::Group, 3).unwrap();
        assert!(messages.iter().all(|m| m.read));
    }

    #[test]
    fn mark_room_read_matches_nothing_for_empty_room() {
        let store = store();
        assert_eq!(store.mark_room_read(Topology::Pairwise, 999).unwrap(), 0);
    }

    #[test]
    fn topologies_do_not_share_an_id_namespace() {
        let store = store();
        store.create_pairwise_room(5, "alice", "bob").unwrap();
        store
            .create_group_room(5, "badminton", &["a".into(), "b".into(), "c".into()])
            .unwrap();

        store
            .append_message(Topology::Pairwise, 5, "alice", "pairwise", "2024-01-01")
            .unwrap();
        store
            .append_message(Topology::Group, 5, "a", "group", "2024-01-01")
            .unwrap();

        let pairwise = store.messages_in_room(Topology::Pairwise, 5).unwrap();
        let group = store.messages_in_room(Topology::Group, 5).unwrap();
        assert_eq!(pairwise.len(), 1);
        assert_eq!(group.len(), 1);
        assert_eq!(pairwise[0].message, "pairwise");
        assert_eq!(group[0].message, "group");

        // Marking one topology read leaves the other untouched
        store.mark_room_read(Topology::Pairwise, 5).unwrap();
        assert!(store.messages_in_room(Topology::Pairwise, 5).unwrap()[0].read);
        assert!(!store.messages_in_room(Topology::Group, 5).unwrap()[0].read);
    }

    #[test]
    fn duplicate_room_id_is_rejected() {
        let store = store();
        assert!(store.create_pairwise_room(1, "alice", "bob").unwrap());
        assert!(!store.create_pairwise_room(1, "carol", "dave").unwrap());

        // First write wins
        let rooms = store.pairwise_rooms_joined().unwrap();
        assert_eq!(rooms[0].0.member1, "alice");
    }

    #[test]
    fn group_joined_view_keeps_member_order() {
        let store = store();
        let members: Vec<String> = vec!["c".into(), "a".into(), "b".into()];
        store.create_group_room(9, "climbing", &members).unwrap();

        let rooms = store.group_rooms_joined().unwrap();
        assert_eq!(rooms.len(), 1);
        let stored: Vec<String> = serde_json::from_str(&rooms[0].0.members).unwrap();
        assert_eq!(stored, members);
    }

    #[test]
    fn joined_view_is_deterministic() {
        let store = store();
        store.create_pairwise_room(2, "c", "d").unwrap();
        store.create_pairwise_room(1, "a", "b").unwrap();
        store
            .append_message(Topology::Pairwise, 2, "c", "first", "2024-01-01")
            .unwrap();
        store
            .append_message(Topology::Pairwise, 2, "d", "second", "2024-01-01")
            .unwrap();

        let first = store.pairwise_rooms_joined().unwrap();
        let second = store.pairwise_rooms_joined().unwrap();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.0.id, b.0.id);
            assert_eq!(a.1.len(), b.1.len());
        }
        assert_eq!(first[0].0.id, 1);
        assert_eq!(first[1].1[0].message, "first");
        assert_eq!(first[1].1[1].message, "second");
    }
}
