use std::env;
use anyhow::{bail, Context, Result};

/// Store location used when STORE_REGION is not set
pub const DEFAULT_STORE_REGION: &str = "europe-north1";

#[derive(Debug, Clone)]
pub struct Config {
    pub spanner_emulator_host: Option<String>,
    pub spanner_project: String,
    pub spanner_instance: String,
    pub spanner_database: String,
    pub table_name: String,
    pub store_region: String,
    pub service_port: u16,
    pub service_host: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let spanner_emulator_host = env::var("SPANNER_EMULATOR_HOST").ok();

        let spanner_project = env::var("SPANNER_PROJECT")
            .context("SPANNER_PROJECT environment variable is required")?;

        let spanner_instance = env::var("SPANNER_INSTANCE")
            .context("SPANNER_INSTANCE environment variable is required")?;

        let spanner_database = env::var("SPANNER_DATABASE")
            .context("SPANNER_DATABASE environment variable is required")?;

        let table_name = env::var("TABLE_NAME")
            .context("TABLE_NAME environment variable is required")?;
        validate_table_name(&table_name)?;

        let store_region = env::var("STORE_REGION")
            .unwrap_or_else(|_| DEFAULT_STORE_REGION.to_string());

        let service_port = env::var("SERVICE_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("SERVICE_PORT must be a valid port number (0-65535)")?;

        let service_host = env::var("SERVICE_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(Config {
            spanner_emulator_host,
            spanner_project,
            spanner_instance,
            spanner_database,
            table_name,
            store_region,
            service_port,
            service_host,
        })
    }

    pub fn log_startup(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Spanner emulator: {}",
            self.spanner_emulator_host.as_deref().unwrap_or("disabled (using production)"));
        tracing::info!("  Spanner project: {}", self.spanner_project);
        tracing::info!("  Spanner instance: {}", self.spanner_instance);
        tracing::info!("  Spanner database: {}", self.spanner_database);
        tracing::info!("  Table: {}", self.table_name);
        tracing::info!("  Store region: {}", self.store_region);
        tracing::info!("  Service listening on: {}:{}", self.service_host, self.service_port);
    }
}

/// Serializes tests that touch process environment variables
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// The table name is interpolated into SQL and DDL, so only plain identifiers are accepted.
fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    if !starts_with_letter || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!(
            "TABLE_NAME must start with a letter and contain only letters, digits and '_', got '{}'",
            name
        );
    }
    Ok(())
}
