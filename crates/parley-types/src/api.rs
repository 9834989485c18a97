use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Sending --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendPairwiseMessage {
    pub room_id: i64,
    pub sender_id: String,
    pub message: String,
    pub write_day: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendGroupMessage {
    pub group_room_id: i64,
    pub sender_id: String,
    pub message: String,
    pub write_day: String,
}

/// A stored message as returned by the list and send endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: Uuid,
    pub room_id: i64,
    pub sender_id: String,
    pub message: String,
    pub write_day: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

// -- Joined room views --

/// Per-message projection inside a joined room view. Only the
/// author-controlled fields plus the read flag survive the projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub sender_id: String,
    pub message: String,
    pub write_day: String,
    pub read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairwiseRoomView {
    pub room_id: i64,
    pub member1: String,
    pub member2: String,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRoomView {
    pub room_id: i64,
    pub together_id: String,
    pub members: Vec<String>,
    pub messages: Vec<MessageView>,
}

// -- Room creation --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePairwiseRoom {
    pub id: i64,
    pub member1: String,
    pub member2: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateGroupRoom {
    pub id: i64,
    pub together_id: String,
    pub members: Vec<String>,
}

// -- Read receipts --

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub updated: u64,
}
