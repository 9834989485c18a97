use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::warn;

use parley_store::models::JoinedMessageRow;
use parley_types::api::{
    CreateGroupRoom, CreatePairwiseRoom, GroupRoomView, MessageView, PairwiseRoomView,
};

use crate::error::ApiError;
use crate::AppState;

fn to_view(row: JoinedMessageRow) -> MessageView {
    MessageView {
        sender_id: row.sender_id,
        message: row.message,
        write_day: row.write_day,
        read: row.read,
    }
}

// -- Joined room views --

/// Joined view of every pairwise room: room metadata plus the full message
/// sequence, recomputed on every call.
pub async fn list_pairwise_rooms(
    State(state): State<AppState>,
) -> Result<Json<Vec<PairwiseRoomView>>, ApiError> {
    let rooms = tokio::task::spawn_blocking(move || state.store.pairwise_rooms_joined())
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {e}"))??;

    let views = rooms
        .into_iter()
        .map(|(room, messages)| PairwiseRoomView {
            room_id: room.id,
            member1: room.member1,
            member2: room.member2,
            messages: messages.into_iter().map(to_view).collect(),
        })
        .collect();

    Ok(Json(views))
}

pub async fn list_group_rooms(
    State(state): State<AppState>,
) -> Result<Json<Vec<GroupRoomView>>, ApiError> {
    let rooms = tokio::task::spawn_blocking(move || state.store.group_rooms_joined())
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {e}"))??;

    let views = rooms
        .into_iter()
        .map(|(room, messages)| GroupRoomView {
            room_id: room.id,
            together_id: room.together_id,
            members: serde_json::from_str(&room.members).unwrap_or_else(|e| {
                warn!("corrupt member list on group room {}: {}", room.id, e);
                Vec::new()
            }),
            messages: messages.into_iter().map(to_view).collect(),
        })
        .collect();

    Ok(Json(views))
}

// -- Room creation --

pub async fn create_pairwise_room(
    State(state): State<AppState>,
    Json(req): Json<CreatePairwiseRoom>,
) -> Result<StatusCode, ApiError> {
    let inserted = tokio::task::spawn_blocking(move || {
        state
            .store
            .create_pairwise_room(req.id, &req.member1, &req.member2)
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {e}"))??;

    if !inserted {
        return Err(ApiError::Conflict("room id already exists"));
    }

    Ok(StatusCode::CREATED)
}

/// Member list order is preserved as given; at least two members are
/// required.
pub async fn create_group_room(
    State(state): State<AppState>,
    Json(req): Json<CreateGroupRoom>,
) -> Result<StatusCode, ApiError> {
    if req.members.len() < 2 {
        return Err(ApiError::BadRequest("a group room needs at least two members"));
    }

    let inserted = tokio::task::spawn_blocking(move || {
        state
            .store
            .create_group_room(req.id, &req.together_id, &req.members)
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {e}"))??;

    if !inserted {
        return Err(ApiError::Conflict("room id already exists"));
    }

    Ok(StatusCode::CREATED)
}
