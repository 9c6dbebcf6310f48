// Route path constants - single source of truth for all API paths

pub const HEALTH: &str = "/health";
pub const INVOKE: &str = "/invoke";
pub const RECORDS: &str = "/records";
pub const RECORD_ITEM: &str = "/records/{id}";
pub const OPENAPI_JSON: &str = "/api-docs/openapi.json";
pub const SWAGGER_UI: &str = "/swagger-ui";
