use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{RoomKey, Topology};

/// Events pushed to clients over the WebSocket channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms the connection and hands out the session id
    Ready { session_id: Uuid },

    /// A new message was persisted in a subscribed room
    MessageCreate {
        topology: Topology,
        room_id: i64,
        id: Uuid,
        sender_id: String,
        message: String,
        write_day: String,
        read: bool,
        created_at: DateTime<Utc>,
    },
}

impl GatewayEvent {
    /// Returns the room key if this event is scoped to a specific room.
    /// Events that return `None` are connection-local.
    pub fn room_key(&self) -> Option<RoomKey> {
        match self {
            Self::MessageCreate {
                topology, room_id, ..
            } => Some(RoomKey {
                topology: *topology,
                room_id: *room_id,
            }),
            Self::Ready { .. } => None,
        }
    }
}

/// Commands sent FROM client TO server over the WebSocket channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Declare interest in a room's live traffic
    Subscribe { topology: Topology, room_id: i64 },

    /// Withdraw interest in a room
    Unsubscribe { topology: Topology, room_id: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_command_wire_shape() {
        let cmd: GatewayCommand = serde_json::from_str(
            r#"{"type":"Subscribe","data":{"topology":"pairwise","room_id":7}}"#,
        )
        .unwrap();
        match cmd {
            GatewayCommand::Subscribe { topology, room_id } => {
                assert_eq!(topology, Topology::Pairwise);
                assert_eq!(room_id, 7);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn message_create_is_room_scoped() {
        let event = GatewayEvent::MessageCreate {
            topology: Topology::Group,
            room_id: 3,
            id: Uuid::new_v4(),
            sender_id: "a".into(),
            message: "hello".into(),
            write_day: "2024-01-01".into(),
            read: false,
            created_at: Utc::now(),
        };
        assert_eq!(event.room_key(), Some(RoomKey::group(3)));

        let ready = GatewayEvent::Ready {
            session_id: Uuid::new_v4(),
        };
        assert_eq!(ready.room_key(), None);
    }
}
