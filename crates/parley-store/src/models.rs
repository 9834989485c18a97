/// Store row types — these map directly to SQLite rows.
/// Distinct from the parley-types wire models to keep the store layer
/// independent of the HTTP surface.

pub struct MessageRow {
    pub id: String,
    pub room_id: i64,
    pub sender_id: String,
    pub message: String,
    pub write_day: String,
    pub read: bool,
    pub seq: i64,
    pub created_at: String,
}

pub struct PairwiseRoomRow {
    pub id: i64,
    pub member1: String,
    pub member2: String,
}

pub struct GroupRoomRow {
    pub id: i64,
    pub together_id: String,
    /// JSON-encoded ordered member list
    pub members: String,
}

/// Message projection inside a joined room view — only the fields the
/// view exposes.
pub struct JoinedMessageRow {
    pub sender_id: String,
    pub message: String,
    pub write_day: String,
    pub read: bool,
}
