use anyhow::{Context, Result};
use chrono::Utc;
use gcloud_gax::grpc::Code;
use gcloud_googleapis::spanner::admin::database::v1::{
    CreateDatabaseRequest, GetDatabaseDdlRequest, GetDatabaseRequest, UpdateDatabaseDdlRequest,
};
use gcloud_googleapis::spanner::admin::instance::v1::{
    CreateInstanceRequest, GetInstanceRequest, Instance,
};
use gcloud_spanner::admin::client::Client as AdminClient;
use gcloud_spanner::admin::AdminClientConfig;
use gcloud_spanner::client::{Client, ClientConfig};
use gcloud_spanner::key::Key;
use gcloud_spanner::mutation::{delete as delete_mutation, insert_or_update};
use gcloud_spanner::statement::Statement;
use gcloud_spanner::value::CommitTimestamp;
use serde_json::{Map, Value as JsonValue};
use tokio::sync::OnceCell;

use crate::config::Config;
use crate::store::{Record, RecordStore, StoreAck, StoreFuture};

/// Record store backed by a Spanner table.
///
/// The underlying client is created on first use and then shared by every request for
/// the lifetime of the process. Each row holds the record id and its remaining attributes
/// as a JSON document.
pub struct SpannerStore {
    config: Config,
    client: OnceCell<Client>,
}

impl SpannerStore {
    /// Create a store for `config.table_name`. No connection is made until the first call.
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            client: OnceCell::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.config.table_name
    }

    /// Get the shared client, connecting and provisioning on the first call
    async fn client(&self) -> Result<&Client> {
        self.client.get_or_try_init(|| connect(&self.config)).await
    }

    async fn query_one(&self, id: &str) -> Result<Option<Record>> {
        let client = self.client().await?;

        let mut statement =
            Statement::new(format!("SELECT data FROM {} WHERE id = @id", self.table()));
        let key = id.to_string();
        statement.add_param("id", &key);

        let mut tx = client
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query record from Spanner")?;

        if let Some(row) = result_set.next().await? {
            let data_str: String = row.column_by_name("data")?;
            tracing::debug!("Read record with id: {}", id);
            Ok(Some(decode_record(key, &data_str)?))
        } else {
            tracing::debug!("Record not found with id: {}", id);
            Ok(None)
        }
    }

    async fn upsert(&self, record: &Record) -> Result<()> {
        let client = self.client().await?;

        let data_str = serde_json::to_string(&record.attributes)
            .context("Failed to serialize record attributes")?;

        let mutation = insert_or_update(
            self.table(),
            &["id", "data", "updated_at"],
            &[&record.id, &data_str, &CommitTimestamp::new()],
        );

        client
            .apply(vec![mutation])
            .await
            .context("Failed to write record to Spanner")?;

        tracing::debug!("Upserted record with id: {}", record.id);
        Ok(())
    }

    async fn scan_all(&self) -> Result<Vec<Record>> {
        let client = self.client().await?;

        let statement = Statement::new(format!("SELECT id, data FROM {}", self.table()));

        let mut tx = client
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to scan records from Spanner")?;

        let mut records = Vec::new();
        while let Some(row) = result_set.next().await? {
            let id: String = row.column_by_name("id")?;
            let data_str: String = row.column_by_name("data")?;
            records.push(decode_record(id, &data_str)?);
        }

        tracing::debug!("Scanned {} records from {}", records.len(), self.table());
        Ok(records)
    }

    async fn remove(&self, id: &str) -> Result<StoreAck> {
        let client = self.client().await?;

        let key = id.to_string();
        let mutation = delete_mutation(self.table(), Key::new(&key));

        client
            .apply(vec![mutation])
            .await
            .context("Failed to delete record from Spanner")?;

        tracing::debug!("Deleted record with id: {}", id);
        Ok(StoreAck {
            table: self.table().to_string(),
            key,
            acknowledged_at: Utc::now().to_rfc3339(),
        })
    }

    /// Perform a health check by executing a simple query
    async fn ping(&self) -> Result<()> {
        let client = self.client().await?;
        let statement = Statement::new("SELECT 1");

        let mut tx = client
            .single()
            .await
            .context("Failed to create health check transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to execute health check query")?;

        if result_set.next().await?.is_some() {
            tracing::debug!("Health check query succeeded");
            Ok(())
        } else {
            Err(anyhow::anyhow!("Health check query returned no results"))
        }
    }
}

impl RecordStore for SpannerStore {
    fn get<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Option<Record>> {
        Box::pin(self.query_one(id))
    }

    fn put<'a>(&'a self, record: &'a Record) -> StoreFuture<'a, ()> {
        Box::pin(self.upsert(record))
    }

    fn scan(&self) -> StoreFuture<'_, Vec<Record>> {
        Box::pin(self.scan_all())
    }

    fn delete<'a>(&'a self, id: &'a str) -> StoreFuture<'a, StoreAck> {
        Box::pin(self.remove(id))
    }

    fn health_check(&self) -> StoreFuture<'_, ()> {
        Box::pin(self.ping())
    }
}

fn decode_record(id: String, data_str: &str) -> Result<Record> {
    let attributes: Map<String, JsonValue> =
        serde_json::from_str(data_str).context("Failed to deserialize record data")?;
    Ok(Record { id, attributes })
}

/// Connect to Spanner, creating instance, database and table if they are missing.
///
/// The gcloud-spanner library picks up SPANNER_EMULATOR_HOST from the environment and
/// connects to the emulator when it is set.
async fn connect(config: &Config) -> Result<Client> {
    auto_provision(config).await?;

    let database_path = format!(
        "projects/{}/instances/{}/databases/{}",
        config.spanner_project, config.spanner_instance, config.spanner_database
    );

    match &config.spanner_emulator_host {
        Some(host) => tracing::info!("Connecting to Spanner emulator at: {}", host),
        None => tracing::info!("Connecting to production Spanner"),
    }

    let client = Client::new(&database_path, ClientConfig::default())
        .await
        .context("Failed to create Spanner client")?;

    tracing::info!(
        "Successfully connected to Spanner database: {}",
        database_path
    );
    Ok(client)
}

async fn auto_provision(config: &Config) -> Result<()> {
    tracing::info!("Starting auto-provisioning checks...");

    let admin_client = AdminClient::new(AdminClientConfig::default())
        .await
        .context("Failed to create Spanner admin client")?;

    let project_path = format!("projects/{}", config.spanner_project);
    let instance_path = format!("{}/instances/{}", project_path, config.spanner_instance);
    let database_path = format!("{}/databases/{}", instance_path, config.spanner_database);

    ensure_instance_exists(&admin_client, config, &project_path, &instance_path).await?;
    ensure_database_exists(&admin_client, &instance_path, &database_path).await?;
    ensure_table_exists(&admin_client, &database_path, &config.table_name).await?;

    tracing::info!("Auto-provisioning complete");
    Ok(())
}

/// Instance config used when the instance has to be created
fn instance_config_path(config: &Config, project_path: &str) -> String {
    if config.spanner_emulator_host.is_some() {
        format!("{}/instanceConfigs/emulator-config", project_path)
    } else {
        format!("{}/instanceConfigs/regional-{}", project_path, config.store_region)
    }
}

async fn ensure_instance_exists(
    admin_client: &AdminClient,
    config: &Config,
    project_path: &str,
    instance_path: &str,
) -> Result<()> {
    let get_request = GetInstanceRequest {
        name: instance_path.to_string(),
        field_mask: None,
    };

    match admin_client.instance().get_instance(get_request, None).await {
        Ok(_) => {
            tracing::info!("Instance already exists: {}", instance_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Instance not found, creating: {}", instance_path);

            let create_request = CreateInstanceRequest {
                parent: project_path.to_string(),
                instance_id: config.spanner_instance.clone(),
                instance: Some(Instance {
                    name: instance_path.to_string(),
                    config: instance_config_path(config, project_path),
                    display_name: format!("{} instance", config.spanner_instance),
                    node_count: 1,
                    ..Default::default()
                }),
            };

            let mut operation = admin_client
                .instance()
                .create_instance(create_request, None)
                .await
                .context("Failed to start instance creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create instance")?;

            tracing::info!("Instance created successfully: {}", instance_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check instance existence: {}",
            e.message()
        )),
    }
}

async fn ensure_database_exists(
    admin_client: &AdminClient,
    instance_path: &str,
    database_path: &str,
) -> Result<()> {
    let get_request = GetDatabaseRequest {
        name: database_path.to_string(),
    };

    match admin_client
        .database()
        .get_database(get_request, None)
        .await
    {
        Ok(_) => {
            tracing::info!("Database already exists: {}", database_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Database not found, creating: {}", database_path);

            let database_id = database_path
                .split('/')
                .next_back()
                .context("Invalid database path")?;

            let create_request = CreateDatabaseRequest {
                parent: instance_path.to_string(),
                create_statement: format!("CREATE DATABASE `{}`", database_id),
                extra_statements: vec![],
                encryption_config: None,
                database_dialect: 1, // Google Standard SQL
                proto_descriptors: vec![],
            };

            let mut operation = admin_client
                .database()
                .create_database(create_request, None)
                .await
                .context("Failed to start database creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create database")?;

            tracing::info!("Database created successfully: {}", database_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check database existence: {}",
            e.message()
        )),
    }
}

fn create_table_ddl(table: &str) -> String {
    format!(
        r#"CREATE TABLE {table} (
    id STRING(MAX) NOT NULL,
    data JSON NOT NULL,
    updated_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
) PRIMARY KEY (id)"#
    )
}

fn ddl_declares_table(statement: &str, table: &str) -> bool {
    statement.starts_with(&format!("CREATE TABLE {} ", table))
        || statement.starts_with(&format!("CREATE TABLE `{}` ", table))
}

async fn ensure_table_exists(
    admin_client: &AdminClient,
    database_path: &str,
    table: &str,
) -> Result<()> {
    let get_ddl_request = GetDatabaseDdlRequest {
        database: database_path.to_string(),
    };

    let ddl_response = admin_client
        .database()
        .get_database_ddl(get_ddl_request, None)
        .await
        .context("Failed to get database DDL")?;

    let table_exists = ddl_response
        .into_inner()
        .statements
        .iter()
        .any(|stmt| ddl_declares_table(stmt, table));

    if table_exists {
        tracing::info!("Table '{}' already exists", table);
        return Ok(());
    }

    tracing::info!("Table '{}' not found, creating...", table);

    let update_request = UpdateDatabaseDdlRequest {
        database: database_path.to_string(),
        statements: vec![create_table_ddl(table)],
        operation_id: String::new(),
        proto_descriptors: vec![],
        throughput_mode: false,
    };

    let mut operation = admin_client
        .database()
        .update_database_ddl(update_request, None)
        .await
        .context("Failed to start table creation")?;

    operation
        .wait(None)
        .await
        .context("Failed to create table")?;

    tracing::info!("Table '{}' created successfully", table);
    Ok(())
}
