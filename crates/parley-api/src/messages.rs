use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{debug, warn};
use uuid::Uuid;

use parley_store::models::MessageRow;
use parley_types::api::{MessageRecord, ReadReceipt, SendGroupMessage, SendPairwiseMessage};
use parley_types::events::GatewayEvent;
use parley_types::models::{RoomKey, Topology};

use crate::error::ApiError;
use crate::AppState;

pub(crate) fn to_record(row: MessageRow) -> MessageRecord {
    MessageRecord {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("corrupt message id '{}': {}", row.id, e);
            Uuid::default()
        }),
        room_id: row.room_id,
        sender_id: row.sender_id,
        message: row.message,
        write_day: row.write_day,
        read: row.read,
        created_at: row.created_at.parse().unwrap_or_else(|e| {
            warn!("corrupt created_at '{}': {}", row.created_at, e);
            chrono::DateTime::default()
        }),
    }
}

// -- Listing --

pub async fn list_pairwise_messages(
    State(state): State<AppState>,
    Path(room_id): Path<i64>,
) -> Result<Json<Vec<MessageRecord>>, ApiError> {
    list_messages(state, Topology::Pairwise, room_id).await
}

pub async fn list_group_messages(
    State(state): State<AppState>,
    Path(room_id): Path<i64>,
) -> Result<Json<Vec<MessageRecord>>, ApiError> {
    list_messages(state, Topology::Group, room_id).await
}

async fn list_messages(
    state: AppState,
    topology: Topology,
    room_id: i64,
) -> Result<Json<Vec<MessageRecord>>, ApiError> {
    // Run the blocking store read off the async runtime
    let rows = tokio::task::spawn_blocking(move || {
        state.store.messages_in_room(topology, room_id)
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {e}"))??;

    Ok(Json(rows.into_iter().map(to_record).collect()))
}

// -- Sending --

pub async fn send_pairwise_message(
    State(state): State<AppState>,
    Json(req): Json<SendPairwiseMessage>,
) -> Result<(StatusCode, Json<MessageRecord>), ApiError> {
    send_message(
        state,
        Topology::Pairwise,
        req.room_id,
        req.sender_id,
        req.message,
        req.write_day,
    )
    .await
}

pub async fn send_group_message(
    State(state): State<AppState>,
    Json(req): Json<SendGroupMessage>,
) -> Result<(StatusCode, Json<MessageRecord>), ApiError> {
    send_message(
        state,
        Topology::Group,
        req.group_room_id,
        req.sender_id,
        req.message,
        req.write_day,
    )
    .await
}

async fn send_message(
    state: AppState,
    topology: Topology,
    room_id: i64,
    sender_id: String,
    message: String,
    write_day: String,
) -> Result<(StatusCode, Json<MessageRecord>), ApiError> {
    // Insert and fan-out run in their own task: the durable write is the
    // commit point, so a caller that gives up mid-request cannot cancel the
    // publish once the row is in.
    let task = tokio::spawn(async move {
        let store_state = state.clone();
        let row = tokio::task::spawn_blocking(move || {
            store_state
                .store
                .append_message(topology, room_id, &sender_id, &message, &write_day)
        })
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {e}"))??;

        let record = to_record(row);
        let delivered = state
            .dispatcher
            .publish(
                RoomKey { topology, room_id },
                GatewayEvent::MessageCreate {
                    topology,
                    room_id,
                    id: record.id,
                    sender_id: record.sender_id.clone(),
                    message: record.message.clone(),
                    write_day: record.write_day.clone(),
                    read: record.read,
                    created_at: record.created_at,
                },
            )
            .await;
        debug!("message {} fanned out to {} sessions", record.id, delivered);

        Ok::<_, anyhow::Error>(record)
    });

    let record = task
        .await
        .map_err(|e| anyhow::anyhow!("send task join error: {e}"))??;

    Ok((StatusCode::CREATED, Json(record)))
}

// -- Read receipts --

pub async fn mark_pairwise_read(
    State(state): State<AppState>,
    Path(room_id): Path<i64>,
) -> Result<Json<ReadReceipt>, ApiError> {
    mark_read(state, Topology::Pairwise, room_id).await
}

pub async fn mark_group_read(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<ReadReceipt>, ApiError> {
    let room_id: i64 = room_id
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("missing or invalid room id"))?;
    mark_read(state, Topology::Group, room_id).await
}

async fn mark_read(
    state: AppState,
    topology: Topology,
    room_id: i64,
) -> Result<Json<ReadReceipt>, ApiError> {
    let updated = tokio::task::spawn_blocking(move || {
        state.store.mark_room_read(topology, room_id)
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {e}"))??;

    if updated == 0 {
        return Err(ApiError::NotFound("no messages for room"));
    }

    Ok(Json(ReadReceipt {
        updated: updated as u64,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_store::Store;

    fn test_state() -> AppState {
        std::sync::Arc::new(crate::AppStateInner {
            store: Store::open_in_memory().unwrap(),
            dispatcher: parley_gateway::dispatcher::Dispatcher::new(),
        })
    }

    fn send_req(room_id: i64, sender: &str, body: &str) -> SendPairwiseMessage {
        SendPairwiseMessage {
            room_id,
            sender_id: sender.into(),
            message: body.into(),
            write_day: "2024-01-01".into(),
        }
    }

    #[tokio::test]
    async fn send_fans_out_to_subscribed_sessions_only() {
        let state = test_state();
        let key = RoomKey::pairwise(7);

        let (s1, mut rx1) = state.dispatcher.register_session().await;
        let (s2, mut rx2) = state.dispatcher.register_session().await;
        let (_s3, mut rx3) = state.dispatcher.register_session().await;
        state.dispatcher.subscribe(s1, key).await;
        state.dispatcher.subscribe(s2, key).await;

        let (status, Json(record)) =
            send_pairwise_message(State(state.clone()), Json(send_req(7, "u1", "hi")))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        for rx in [&mut rx1, &mut rx2] {
            match rx.try_recv().unwrap() {
                GatewayEvent::MessageCreate {
                    id,
                    room_id,
                    message,
                    read,
                    ..
                } => {
                    assert_eq!(id, record.id);
                    assert_eq!(room_id, 7);
                    assert_eq!(message, "hi");
                    assert!(!read);
                }
                other => panic!("unexpected event: {other:?}"),
            }
            // exactly one push per session
            assert!(rx.try_recv().is_err());
        }
        assert!(rx3.try_recv().is_err());
    }

    #[tokio::test]
    async fn sent_message_round_trips_through_listing() {
        let state = test_state();

        let (_, Json(sent)) =
            send_pairwise_message(State(state.clone()), Json(send_req(5, "u1", "hi")))
                .await
                .unwrap();

        let Json(listed) = list_pairwise_messages(State(state.clone()), Path(5))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].sender_id, sent.sender_id);
        assert_eq!(listed[0].message, sent.message);
        assert_eq!(listed[0].write_day, sent.write_day);
        assert!(!listed[0].read);

        let Json(receipt) = mark_pairwise_read(State(state.clone()), Path(5))
            .await
            .unwrap();
        assert_eq!(receipt.updated, 1);

        let Json(listed) = list_pairwise_messages(State(state), Path(5)).await.unwrap();
        assert!(listed[0].read);
    }

    #[tokio::test]
    async fn mark_read_on_empty_room_is_not_found() {
        let state = test_state();
        let err = mark_pairwise_read(State(state), Path(999)).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn group_mark_read_rejects_malformed_room_id() {
        let state = test_state();
        let err = mark_group_read(State(state), Path(" ".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn group_namespace_is_independent() {
        let state = test_state();

        send_pairwise_message(State(state.clone()), Json(send_req(5, "u1", "pairwise")))
            .await
            .unwrap();
        send_group_message(
            State(state.clone()),
            Json(SendGroupMessage {
                group_room_id: 5,
                sender_id: "a".into(),
                message: "group".into(),
                write_day: "2024-01-01".into(),
            }),
        )
        .await
        .unwrap();

        let Json(pairwise) = list_pairwise_messages(State(state.clone()), Path(5))
            .await
            .unwrap();
        let Json(group) = list_group_messages(State(state), Path(5)).await.unwrap();
        assert_eq!(pairwise.len(), 1);
        assert_eq!(group.len(), 1);
        assert_eq!(pairwise[0].message, "pairwise");
        assert_eq!(group[0].message, "group");
    }
}
