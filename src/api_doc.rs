use utoipa::OpenApi;

use crate::error::{ErrorResponse, HealthResponse, UnhealthyResponse};
use crate::handlers;
use crate::models::{ApiResponse, InboundEvent, PathParameters, ResponseHeaders};
use crate::store::StoreAck;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "spanner-record-gateway API",
        version = "1.0.0",
        description = "HTTP-triggered CRUD dispatcher for JSON records stored in Google Cloud Spanner"
    ),
    paths(
        handlers::health::health_handler,
        handlers::invoke::invoke_handler,
        handlers::records::collection_handler,
        handlers::records::item_handler
    ),
    components(
        schemas(
            InboundEvent,
            PathParameters,
            ApiResponse,
            ResponseHeaders,
            StoreAck,
            ErrorResponse,
            HealthResponse,
            UnhealthyResponse
        )
    ),
    tags(
        (name = "health", description = "Health check operations"),
        (name = "dispatch", description = "Raw event invocation"),
        (name = "records", description = "Record CRUD operations")
    )
)]
pub struct ApiDoc;
