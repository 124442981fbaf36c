//! Transaction discipline every public store operation runs under.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use crate::api::TransactionOptions;
use crate::mao::MetadataAccessObject;
use crate::StoreResult;

/// Boxed future tied to the borrow of the transaction-scoped access object.
pub type UnitFuture<'a, R> = Pin<Box<dyn Future<Output = StoreResult<R>> + Send + 'a>>;

/// Runs a unit of work inside one transaction.
///
/// The unit receives the access object bound to that transaction and returns
/// the operation's response. Implementations commit on Ok and roll back on
/// Err. They may re-invoke the unit after a transient backend failure, which
/// is why the unit is `FnMut` and must rebuild its response on every call.
/// Domain errors, `Aborted` included, are never retried here; retrying those
/// is the caller's decision.
#[async_trait]
pub trait TransactionExecutor: Send + Sync {
    async fn execute<R, F>(&self, options: TransactionOptions, work: F) -> StoreResult<R>
    where
        R: Send,
        F: for<'c> FnMut(&'c dyn MetadataAccessObject) -> UnitFuture<'c, R> + Send;
}
