use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use parley_api::{messages, rooms, AppState, AppStateInner};
use parley_gateway::connection;
use parley_gateway::dispatcher::Dispatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=debug,tower_http=debug".into()),
        )
        .init();

    // Store location is required config: without a validated store the
    // process must not serve traffic.
    let data_dir = std::env::var("PARLEY_DATA_DIR").context("PARLEY_DATA_DIR is not set")?;
    let db_name = std::env::var("PARLEY_DB_NAME").context("PARLEY_DB_NAME is not set")?;
    let host = std::env::var("PARLEY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("PARLEY_PORT")
        .unwrap_or_else(|_| "8888".into())
        .parse()?;

    let db_path = PathBuf::from(&data_dir).join(&db_name);
    let store = parley_store::Store::open(&db_path)
        .with_context(|| format!("failed to open store at {}", db_path.display()))?;

    // Shared state
    let dispatcher = Dispatcher::new();
    let state: AppState = Arc::new(AppStateInner {
        store,
        dispatcher: dispatcher.clone(),
    });

    // Routes
    let api_routes = Router::new()
        .route("/api/messages", post(messages::send_pairwise_message))
        .route("/api/messages/{room_id}", get(messages::list_pairwise_messages))
        .route("/api/messages/{room_id}/read", put(messages::mark_pairwise_read))
        .route(
            "/api/chatRooms",
            get(rooms::list_pairwise_rooms).post(rooms::create_pairwise_room),
        )
        .route("/api/togetherMessages", post(messages::send_group_message))
        .route(
            "/api/togetherMessages/{room_id}",
            get(messages::list_group_messages),
        )
        .route(
            "/api/togetherMessages/{room_id}/read",
            put(messages::mark_group_read),
        )
        .route(
            "/api/togetherChatRooms",
            get(rooms::list_group_rooms).post(rooms::create_group_room),
        )
        .with_state(state);

    let ws_route = Router::new()
        .route("/ws", get(ws_upgrade))
        .with_state(dispatcher);

    let app = Router::new()
        .merge(api_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Parley relay listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(
    State(dispatcher): State<Dispatcher>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher))
}
