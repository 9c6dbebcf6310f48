mod api_doc;
mod config;
mod dispatcher;
mod error;
mod handlers;
mod models;
mod routes;
mod spanner;
mod state;
mod store;

use api_doc::ApiDoc;
use config::Config;
use dispatcher::Dispatcher;
use spanner::SpannerStore;
use state::AppState;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("spanner-record-gateway starting");

    let config = Config::from_env()?;
    config.log_startup();

    // Connects lazily on the first request
    let store = Arc::new(SpannerStore::new(&config));

    let state = AppState {
        dispatcher: Dispatcher::new(store),
        config: Arc::new(config.clone()),
    };

    let app = handlers::router(state)
        .merge(SwaggerUi::new(routes::SWAGGER_UI).url(routes::OPENAPI_JSON, ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.service_host, config.service_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
