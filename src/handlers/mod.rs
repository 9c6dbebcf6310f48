pub mod health;
pub mod invoke;
pub mod records;

pub use health::health_handler;
pub use invoke::invoke_handler;
pub use records::{collection_handler, item_handler};

use crate::routes;
use crate::state::AppState;
use axum::{
    routing::{any, get, post},
    Router,
};

/// All application routes, with state applied
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(routes::HEALTH, get(health_handler))
        .route(routes::INVOKE, post(invoke_handler))
        .route(routes::RECORDS, any(collection_handler))
        .route(routes::RECORD_ITEM, any(item_handler))
        .with_state(state)
}
