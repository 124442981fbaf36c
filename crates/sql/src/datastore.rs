//! Convenience entry points wiring config, connection, executor, and store.

use std::path::Path;
use std::time::Duration;

use log::info;
use sea_orm::{ConnectOptions, Database};

use lineal_store::{MetadataStore, MigrationOptions, StoreResult};

use crate::config::LinealConfig;
use crate::executor::SqlTransactionExecutor;
use crate::mao::map_db_err;

/// Default on-disk location of the sqlite store below a base directory.
pub fn default_sqlite_path(base_dir: &Path) -> std::path::PathBuf {
    base_dir.join("lineal.sqlite")
}

pub fn load_or_init_config(base_dir: &Path) -> StoreResult<LinealConfig> {
    LinealConfig::load_or_init(base_dir, &default_sqlite_path(base_dir))
}

/// Connects to the configured database and builds a ready store: migrations
/// are applied per `migration_options` and the simple-type catalog is
/// seeded. A requested downgrade is executed and surfaced as `Cancelled`.
pub async fn open_store(
    config: &LinealConfig,
    base_dir: &Path,
    migration_options: &MigrationOptions,
) -> StoreResult<MetadataStore<SqlTransactionExecutor>> {
    let url = config.connection_url(base_dir)?;
    let mut options = ConnectOptions::new(url);
    if let Some(pool) = &config.pool {
        if let Some(max) = pool.max_connections {
            options.max_connections(max);
        }
        if let Some(min) = pool.min_connections {
            options.min_connections(min);
        }
        if let Some(timeout_ms) = pool.connect_timeout_ms {
            options.connect_timeout(Duration::from_millis(timeout_ms));
        }
        if let Some(timeout_ms) = pool.acquire_timeout_ms {
            options.acquire_timeout(Duration::from_millis(timeout_ms));
        }
        if let Some(timeout_ms) = pool.idle_timeout_ms {
            options.idle_timeout(Duration::from_millis(timeout_ms));
        }
    }
    let conn = Database::connect(options).await.map_err(map_db_err)?;
    info!("connected to {} metadata source", config.backend_name());
    let executor = SqlTransactionExecutor::new(conn);
    let store = MetadataStore::create(executor, migration_options).await?;
    store
        .init_metadata_store_if_not_exists(migration_options.enable_upgrade_migration)
        .await?;
    Ok(store)
}
