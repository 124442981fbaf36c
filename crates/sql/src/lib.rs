pub mod config;
pub mod datastore;
pub mod db;
pub mod executor;
pub mod mao;
pub mod migration;
mod rows;

pub use config::{DatabaseConfig, LinealConfig, PoolConfig};
pub use datastore::{default_sqlite_path, load_or_init_config, open_store};
pub use executor::SqlTransactionExecutor;
pub use mao::SqlMetadataAccessObject;
pub use migration::Migrator;
