use crate::error::{DispatchError, ErrorResponse};
use crate::models::{InboundEvent, Invocation, PathParameters};
use crate::routes;
use crate::state::AppState;
use crate::store::StoreAck;
use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

/// ANY /records handler - collection requests (fetch all, create)
///
/// The request is turned into an event without a path id and dispatched; the resulting
/// envelope becomes the HTTP response.
#[utoipa::path(
    method(get, post, put),
    path = routes::RECORDS,
    request_body(content = serde_json::Value, description = "Record attributes (POST)"),
    responses(
        (status = 200, description = "Array of records (GET) or creation confirmation with the stored item (POST)", body = serde_json::Value),
        (status = 400, description = "Invalid HTTP method or invalid request body", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    ),
    tag = "records"
)]
pub async fn collection_handler(
    State(state): State<AppState>,
    method: Method,
    body: String,
) -> Result<Response, DispatchError> {
    dispatch_request(&state, method, None, body).await
}

/// ANY /records/{id} handler - item requests (fetch one, update, delete)
#[utoipa::path(
    method(get, put, delete),
    path = routes::RECORD_ITEM,
    params(
        ("id" = String, Path, description = "Record id")
    ),
    request_body(content = serde_json::Value, description = "Full replacement attributes (PUT)"),
    responses(
        (status = 200, description = "Record or `{}` (GET), update confirmation (PUT), store acknowledgment (DELETE)", body = serde_json::Value),
        (status = 400, description = "Invalid HTTP method or invalid request body", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    ),
    tag = "records"
)]
pub async fn item_handler(
    State(state): State<AppState>,
    method: Method,
    Path(id): Path<String>,
    body: String,
) -> Result<Response, DispatchError> {
    dispatch_request(&state, method, Some(id), body).await
}

async fn dispatch_request(
    state: &AppState,
    method: Method,
    id: Option<String>,
    body: String,
) -> Result<Response, DispatchError> {
    tracing::debug!(
        "Dispatching {} {:?} against table {}",
        method,
        id,
        state.config.table_name
    );

    let event = InboundEvent {
        http_method: method.as_str().to_string(),
        path_parameters: id.map(|id| PathParameters { id: Some(id) }),
        body: (!body.is_empty()).then_some(body),
    };

    let invocation = state.dispatcher.dispatch(event).await?;
    Ok(render(invocation))
}

/// Turn an invocation output into a real HTTP response
fn render(invocation: Invocation) -> Response {
    match invocation {
        Invocation::Response(response) => {
            let status = StatusCode::from_u16(response.status_code)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status,
                [(header::CONTENT_TYPE, response.headers.content_type)],
                response.body,
            )
                .into_response()
        }
        Invocation::Acknowledged(ack) => (StatusCode::OK, Json::<StoreAck>(ack)).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{INVALID_HTTP_METHOD, UPDATED_MESSAGE};
    use crate::handlers::test_support::{body_bytes, test_state};
    use crate::store::testing::{FailingStore, MemoryStore};
    use crate::store::RecordStore;
    use axum::{body::Body, http::Request, routing::any, Router};
    use serde_json::{json, Value as JsonValue};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn setup_test_app(store: Arc<dyn RecordStore>) -> Router {
        Router::new()
            .route(crate::routes::RECORDS, any(collection_handler))
            .route(crate::routes::RECORD_ITEM, any(item_handler))
            .with_state(test_state(store))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<JsonValue>) -> Response {
        let body = match body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        };

        app.clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> JsonValue {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let app = setup_test_app(Arc::new(MemoryStore::default()));

        let response = send(&app, "POST", "/records", Some(json!({"name": "Ann"}))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let created = json_body(response).await;
        let id = created["item"]["id"].as_str().unwrap().to_string();
        assert_eq!(id.len(), 32);

        let response = send(&app, "GET", &format!("/records/{}", id), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"id": id, "name": "Ann"}));
    }

    #[tokio::test]
    async fn test_list_records() {
        let app = setup_test_app(Arc::new(MemoryStore::default()));

        let response = send(&app, "GET", "/records", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!([]));

        send(&app, "POST", "/records", Some(json!({"n": 1}))).await;
        send(&app, "POST", "/records", Some(json!({"n": 2}))).await;

        let listed = json_body(send(&app, "GET", "/records", None).await).await;
        assert_eq!(listed.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_uses_path_id() {
        let store = Arc::new(MemoryStore::default());
        let app = setup_test_app(store.clone());

        let response = send(
            &app,
            "PUT",
            "/records/abc",
            Some(json!({"id": "xyz", "name": "Bob"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"message": UPDATED_MESSAGE}));

        let fetched = json_body(send(&app, "GET", "/records/abc", None).await).await;
        assert_eq!(fetched, json!({"id": "abc", "name": "Bob"}));
        assert!(store.stored("xyz").is_none());
    }

    #[tokio::test]
    async fn test_delete_returns_acknowledgment() {
        let app = setup_test_app(Arc::new(MemoryStore::default()));

        let response = send(&app, "DELETE", "/records/never-existed", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let ack: StoreAck = serde_json::from_value(json_body(response).await).unwrap();
        assert_eq!(ack.key, "never-existed");
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_empty_object() {
        let app = setup_test_app(Arc::new(MemoryStore::default()));

        let response = send(&app, "GET", "/records/unknown", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({}));
    }

    #[tokio::test]
    async fn test_unsupported_method_is_plain_text_400() {
        let app = setup_test_app(Arc::new(MemoryStore::default()));

        for (method, uri) in [("PATCH", "/records/abc"), ("DELETE", "/records")] {
            let response = send(&app, method, uri, None).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
            let body = body_bytes(response).await;
            assert_eq!(body, INVALID_HTTP_METHOD.as_bytes());
        }
    }

    #[tokio::test]
    async fn test_put_without_id_is_400() {
        let app = setup_test_app(Arc::new(MemoryStore::default()));

        let response = send(&app, "PUT", "/records", Some(json!({"name": "Bob"}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = serde_json::from_value(json_body(response).await).unwrap();
        assert!(error.error.contains("id"));
    }

    #[tokio::test]
    async fn test_store_failures() {
        let app = setup_test_app(Arc::new(FailingStore));

        // Converted by the dispatcher
        let response = send(&app, "POST", "/records", Some(json!({"name": "Ann"}))).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({"error": "Internal Server Error"})
        );

        // Propagated and mapped at the boundary
        let response = send(&app, "DELETE", "/records/abc", None).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({"error": "Internal Server Error"})
        );
    }
}
