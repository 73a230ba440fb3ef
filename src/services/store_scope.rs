//! Scoped access to the personal certificate store.

use crate::adapters::provider::{CertificateStore, SigningProvider};
use crate::domain::types::{StoreLocation, StoreName, StoreOpenMode};
use crate::infra::error::SigningResult;
use std::future::Future;
use std::pin::Pin;

/// Future produced by an operation running inside an open store.
pub type StoreFuture<'s, T> = Pin<Box<dyn Future<Output = SigningResult<T>> + Send + 's>>;

/// Open the current user's personal store, run `operation`, and close the store.
///
/// The close step runs after the operation whatever it returned. An error
/// from the operation wins over a close error; a close error after a
/// successful operation is logged and the operation's value is returned.
///
/// # Errors
///
/// Returns error if the store cannot be opened or the operation fails.
pub async fn with_personal_store<T, F>(
    provider: &dyn SigningProvider,
    operation: F,
) -> SigningResult<T>
where
    T: Send,
    F: for<'s> FnOnce(&'s mut dyn CertificateStore) -> StoreFuture<'s, T> + Send,
{
    let mut store = provider
        .open_store(
            StoreLocation::CurrentUser,
            StoreName::My,
            StoreOpenMode::MaximumAllowed,
        )
        .await?;
    log::debug!("Opened personal certificate store");

    let outcome = operation(store.as_mut()).await;
    let closed = store.close().await;
    log::debug!("Closed personal certificate store");

    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(value), Err(e)) => {
            log::warn!("Failed to close certificate store: {e}");
            Ok(value)
        }
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_error)) => {
            log::warn!("Failed to close certificate store after error: {close_error}");
            Err(e)
        }
    }
}
