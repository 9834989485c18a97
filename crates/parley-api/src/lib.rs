pub mod error;
pub mod messages;
pub mod rooms;

use std::sync::Arc;

use parley_gateway::dispatcher::Dispatcher;
use parley_store::Store;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Store,
    pub dispatcher: Dispatcher,
}
