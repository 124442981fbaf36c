//! Transaction executor over a sea-orm connection pool.

use async_trait::async_trait;
use log::{debug, warn};
use sea_orm::{DatabaseConnection, TransactionTrait};

use lineal_store::executor::{TransactionExecutor, UnitFuture};
use lineal_store::{MetadataAccessObject, StoreResult, TransactionOptions};

use crate::mao::{is_transient, map_db_err, SqlMetadataAccessObject};

/// Bounded retry budget for transient backend faults (lock contention,
/// serialization failures). Domain errors are returned on the first attempt.
const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug)]
pub struct SqlTransactionExecutor {
    conn: DatabaseConnection,
}

impl SqlTransactionExecutor {
    pub fn new(conn: DatabaseConnection) -> Self {
        SqlTransactionExecutor { conn }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }
}

#[async_trait]
impl TransactionExecutor for SqlTransactionExecutor {
    async fn execute<R, F>(&self, options: TransactionOptions, mut work: F) -> StoreResult<R>
    where
        R: Send,
        F: for<'c> FnMut(&'c dyn MetadataAccessObject) -> UnitFuture<'c, R> + Send,
    {
        let tag = options.tag.as_deref().unwrap_or("-");
        let mut attempt = 1;
        loop {
            let txn = self.conn.begin().await.map_err(map_db_err)?;
            let outcome = {
                let mao = SqlMetadataAccessObject::for_transaction(&txn);
                work(&mao as &dyn MetadataAccessObject).await
            };
            match outcome {
                Ok(value) => match txn.commit().await.map_err(map_db_err) {
                    Ok(()) => return Ok(value),
                    Err(err) if is_transient(&err) && attempt < MAX_ATTEMPTS => {
                        warn!("commit of transaction `{tag}` failed transiently, retrying: {err}");
                        attempt += 1;
                    }
                    Err(err) => return Err(err),
                },
                Err(err) => {
                    if let Err(rollback_err) = txn.rollback().await {
                        warn!("rollback of transaction `{tag}` failed: {rollback_err}");
                    }
                    if is_transient(&err) && attempt < MAX_ATTEMPTS {
                        debug!("transaction `{tag}` hit a transient fault, retrying: {err}");
                        attempt += 1;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }
}
