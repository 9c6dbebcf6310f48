use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::store::StoreAck;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

/// Normalized HTTP event handed over by the ingress adapter
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    pub http_method: String,
    #[serde(default)]
    pub path_parameters: Option<PathParameters>,
    #[serde(default)]
    pub body: Option<String>,
}

impl InboundEvent {
    /// The path id, if one was routed and it is non-empty
    pub fn path_id(&self) -> Option<&str> {
        self.path_parameters
            .as_ref()
            .and_then(|params| params.id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PathParameters {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ResponseHeaders {
    #[serde(rename = "Content-Type")]
    pub content_type: String,
}

/// HTTP-shaped response produced for the ingress adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status_code: u16,
    pub headers: ResponseHeaders,
    pub body: String,
}

impl ApiResponse {
    pub fn json(status_code: u16, body: JsonValue) -> Self {
        ApiResponse {
            status_code,
            headers: ResponseHeaders {
                content_type: CONTENT_TYPE_JSON.to_string(),
            },
            body: body.to_string(),
        }
    }

    pub fn text(status_code: u16, body: impl Into<String>) -> Self {
        ApiResponse {
            status_code,
            headers: ResponseHeaders {
                content_type: CONTENT_TYPE_TEXT.to_string(),
            },
            body: body.into(),
        }
    }
}

/// Output of one dispatcher invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Invocation {
    Response(ApiResponse),
    /// Delete hands back the store's acknowledgment as-is
    Acknowledged(StoreAck),
}
