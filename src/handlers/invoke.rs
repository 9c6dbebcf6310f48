use crate::error::{DispatchError, ErrorResponse};
use crate::models::{ApiResponse, InboundEvent, Invocation};
use crate::routes;
use crate::state::AppState;
use axum::{extract::State, Json};

/// POST /invoke handler - Run the dispatcher on a raw event
///
/// Accepts the event exactly as the ingress adapter would deliver it and returns the
/// invocation output unchanged: the response envelope, or the store acknowledgment for
/// deletes. Failures that escape the dispatcher become a 400 or 500.
#[utoipa::path(
    post,
    path = routes::INVOKE,
    request_body = InboundEvent,
    responses(
        (status = 200, description = "Invocation output (envelope, or store acknowledgment for DELETE)", body = ApiResponse),
        (status = 400, description = "Invalid request body or missing id", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    ),
    tag = "dispatch"
)]
pub async fn invoke_handler(
    State(state): State<AppState>,
    Json(event): Json<InboundEvent>,
) -> Result<Json<Invocation>, DispatchError> {
    let invocation = state.dispatcher.dispatch(event).await?;
    Ok(Json(invocation))
}
