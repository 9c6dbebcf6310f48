use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{DispatchError, INTERNAL_SERVER_ERROR};
use crate::models::{ApiResponse, InboundEvent, Invocation};
use crate::store::{Record, RecordStore, StoreAck};

pub const INVALID_HTTP_METHOD: &str = "Invalid HTTP method";
pub const CREATED_MESSAGE: &str = "Item created successfully";
pub const UPDATED_MESSAGE: &str = "Item updated successfully";

/// Routes one inbound event to one store operation and shapes the response.
///
/// Holds nothing but a shared handle to the store, so it is cheap to clone into every
/// request.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn RecordStore>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// Handle a single event.
    ///
    /// | method | path id | operation |
    /// |--------|---------|-----------|
    /// | GET    | yes     | fetch one |
    /// | GET    | no      | fetch all |
    /// | POST   | any     | create    |
    /// | DELETE | yes     | delete    |
    /// | PUT    | any     | update    |
    ///
    /// Anything else is a 400 with a plain-text body. Fetch-all and create turn store
    /// failures into a 500 response; the other operations return them as `Err`.
    pub async fn dispatch(&self, event: InboundEvent) -> Result<Invocation, DispatchError> {
        tracing::info!("request {:?}", event);

        match (event.http_method.as_str(), event.path_id()) {
            ("GET", Some(id)) => self.get_record(id).await.map(Invocation::Response),
            ("GET", None) => Ok(Invocation::Response(self.get_all_records().await)),
            ("POST", _) => Ok(Invocation::Response(
                self.create_record(event.body.as_deref()).await,
            )),
            ("DELETE", Some(id)) => self.delete_record(id).await.map(Invocation::Acknowledged),
            ("PUT", id) => self
                .update_record(id, event.body.as_deref())
                .await
                .map(Invocation::Response),
            _ => Ok(Invocation::Response(ApiResponse::text(
                400,
                INVALID_HTTP_METHOD,
            ))),
        }
    }

    /// A missing record is answered with 200 and `{}`, not 404.
    async fn get_record(&self, id: &str) -> Result<ApiResponse, DispatchError> {
        let item = self
            .store
            .get(id)
            .await
            .inspect_err(|e| tracing::error!("Failed to get record {}: {:#}", id, e))?;

        let body = match item {
            Some(record) => JsonValue::from(record),
            None => {
                tracing::debug!("Record not found with id: {}", id);
                json!({})
            }
        };

        Ok(ApiResponse::json(200, body))
    }

    async fn get_all_records(&self) -> ApiResponse {
        match self.store.scan().await {
            Ok(records) => {
                tracing::debug!("Scanned {} records", records.len());
                let items = records.into_iter().map(JsonValue::from).collect();
                ApiResponse::json(200, JsonValue::Array(items))
            }
            Err(e) => {
                tracing::error!("Failed to scan records: {:#}", e);
                internal_error()
            }
        }
    }

    async fn create_record(&self, body: Option<&str>) -> ApiResponse {
        let id = Uuid::new_v4().simple().to_string();

        let record = match Record::from_body(id, body) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Rejected create request: {}", e);
                return ApiResponse::json(400, json!({ "error": e.to_string() }));
            }
        };

        if let Err(e) = self.store.put(&record).await {
            tracing::error!("Failed to create record {}: {:#}", record.id, e);
            return internal_error();
        }

        tracing::info!("Successfully created record with id: {}", record.id);
        ApiResponse::json(
            200,
            json!({
                "message": CREATED_MESSAGE,
                "item": JsonValue::from(record),
            }),
        )
    }

    /// Full overwrite of the stored record; the id always comes from the path.
    async fn update_record(
        &self,
        id: Option<&str>,
        body: Option<&str>,
    ) -> Result<ApiResponse, DispatchError> {
        let id = id.ok_or(DispatchError::MissingId)?;
        let record = Record::from_body(id, body)
            .inspect_err(|e| tracing::warn!("Rejected update request for {}: {}", id, e))?;

        self.store
            .put(&record)
            .await
            .inspect_err(|e| tracing::error!("Failed to update record {}: {:#}", id, e))?;

        tracing::info!("Successfully updated record with id: {}", id);
        Ok(ApiResponse::json(200, json!({ "message": UPDATED_MESSAGE })))
    }

    async fn delete_record(&self, id: &str) -> Result<StoreAck, DispatchError> {
        let ack = self
            .store
            .delete(id)
            .await
            .inspect_err(|e| tracing::error!("Failed to delete record {}: {:#}", id, e))?;

        tracing::info!("Successfully deleted record with id: {}", id);
        Ok(ack)
    }
}

fn internal_error() -> ApiResponse {
    ApiResponse::json(500, json!({ "error": INTERNAL_SERVER_ERROR }))
}
