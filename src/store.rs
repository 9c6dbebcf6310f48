use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::future::Future;
use std::pin::Pin;

use crate::error::DispatchError;

/// Future returned by every [`RecordStore`] operation
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// The single persisted entity: an `id` plus caller-supplied attributes.
///
/// Serializes as one flat JSON object, e.g. `{"id": "...", "name": "Ann"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(flatten)]
    pub attributes: Map<String, JsonValue>,
}

impl Record {
    /// Parse a request body into a record stored under `id`.
    ///
    /// An absent or `null` body yields a record with no attributes. Any `id` member in the
    /// body is discarded so the key always comes from the caller of this function.
    pub fn from_body(id: impl Into<String>, body: Option<&str>) -> Result<Self, DispatchError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DispatchError::MissingId);
        }

        let attributes = match body {
            None => Map::new(),
            Some(raw) => match serde_json::from_str::<JsonValue>(raw)? {
                JsonValue::Null => Map::new(),
                JsonValue::Object(mut map) => {
                    map.remove("id");
                    map
                }
                other => {
                    return Err(DispatchError::InvalidBody(format!(
                        "expected a JSON object, got {}",
                        json_kind(&other)
                    )));
                }
            },
        };

        Ok(Record { id, attributes })
    }
}

impl From<Record> for JsonValue {
    fn from(record: Record) -> Self {
        let mut object = Map::with_capacity(record.attributes.len() + 1);
        object.insert("id".to_string(), JsonValue::String(record.id));
        object.extend(record.attributes);
        JsonValue::Object(object)
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

/// Acknowledgment returned by the store for a delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoreAck {
    pub table: String,
    pub key: String,
    pub acknowledged_at: String,
}

/// Item-level access to the external key-value store.
///
/// Each method performs exactly one call against the store; the table is fixed when the
/// store is constructed.
pub trait RecordStore: Send + Sync {
    /// Fetch one record by key
    fn get<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Option<Record>>;

    /// Write the whole record, replacing any existing item with the same id
    fn put<'a>(&'a self, record: &'a Record) -> StoreFuture<'a, ()>;

    /// Full scan of the table, in whatever order the store returns
    fn scan(&self) -> StoreFuture<'_, Vec<Record>>;

    /// Remove the record for `id`; missing keys are not an error
    fn delete<'a>(&'a self, id: &'a str) -> StoreFuture<'a, StoreAck>;

    /// Cheap round trip used by the health endpoint
    fn health_check(&self) -> StoreFuture<'_, ()>;
}

#[cfg(test)]
pub mod testing {
    //! In-process stores for dispatcher and handler tests.

    use super::*;
    use anyhow::anyhow;
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub const TEST_TABLE: &str = "records";

    #[derive(Default)]
    pub struct MemoryStore {
        items: Mutex<HashMap<String, Record>>,
    }

    impl MemoryStore {
        pub fn len(&self) -> usize {
            self.items.lock().unwrap().len()
        }

        pub fn stored(&self, id: &str) -> Option<Record> {
            self.items.lock().unwrap().get(id).cloned()
        }
    }

    impl RecordStore for MemoryStore {
        fn get<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Option<Record>> {
            Box::pin(async move { Ok(self.items.lock().unwrap().get(id).cloned()) })
        }

        fn put<'a>(&'a self, record: &'a Record) -> StoreFuture<'a, ()> {
            Box::pin(async move {
                self.items
                    .lock()
                    .unwrap()
                    .insert(record.id.clone(), record.clone());
                Ok(())
            })
        }

        fn scan(&self) -> StoreFuture<'_, Vec<Record>> {
            Box::pin(async move { Ok(self.items.lock().unwrap().values().cloned().collect()) })
        }

        fn delete<'a>(&'a self, id: &'a str) -> StoreFuture<'a, StoreAck> {
            Box::pin(async move {
                self.items.lock().unwrap().remove(id);
                Ok(StoreAck {
                    table: TEST_TABLE.to_string(),
                    key: id.to_string(),
                    acknowledged_at: chrono::Utc::now().to_rfc3339(),
                })
            })
        }

        fn health_check(&self) -> StoreFuture<'_, ()> {
            Box::pin(async move { Ok(()) })
        }
    }

    /// Store whose every call fails, standing in for an unreachable database
    pub struct FailingStore;

    impl RecordStore for FailingStore {
        fn get<'a>(&'a self, _id: &'a str) -> StoreFuture<'a, Option<Record>> {
            Box::pin(async move { Err(anyhow!("connection refused")) })
        }

        fn put<'a>(&'a self, _record: &'a Record) -> StoreFuture<'a, ()> {
            Box::pin(async move { Err(anyhow!("connection refused")) })
        }

        fn scan(&self) -> StoreFuture<'_, Vec<Record>> {
            Box::pin(async move { Err(anyhow!("connection refused")) })
        }

        fn delete<'a>(&'a self, _id: &'a str) -> StoreFuture<'a, StoreAck> {
            Box::pin(async move { Err(anyhow!("connection refused")) })
        }

        fn health_check(&self) -> StoreFuture<'_, ()> {
            Box::pin(async move { Err(anyhow!("connection refused")) })
        }
    }
}
