use serde::{Deserialize, Serialize};

/// Conversation topology. Pairwise rooms have exactly two fixed members;
/// group rooms carry a group identity and a member list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    Pairwise,
    Group,
}

impl Topology {
    pub fn as_str(self) -> &'static str {
        match self {
            Topology::Pairwise => "pairwise",
            Topology::Group => "group",
        }
    }
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One room within one topology. Pairwise and group rooms live in separate
/// id namespaces, so the bare integer id is never a key on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomKey {
    pub topology: Topology,
    pub room_id: i64,
}

impl RoomKey {
    pub fn pairwise(room_id: i64) -> Self {
        Self {
            topology: Topology::Pairwise,
            room_id,
        }
    }

    pub fn group(room_id: i64) -> Self {
        Self {
            topology: Topology::Group,
            room_id,
        }
    }
}

impl std::fmt::Display for RoomKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.topology, self.room_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairwiseRoom {
    pub id: i64,
    pub member1: String,
    pub member2: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRoom {
    pub id: i64,
    pub together_id: String,
    pub members: Vec<String>,
}
