//! Scoped release of created workloads
//!
//! A `CleanupGuard` is created right after a container or pod is created and
//! carries the call that removes it. The normal path awaits
//! [`CleanupGuard::release`]; if the owning future is dropped first (timeout
//! or cancellation by the caller), `Drop` hands the release to the runtime so
//! the workload is still removed. The release runs at most once.

use futures_util::future::BoxFuture;
use std::future::Future;
use tracing::{debug, warn};

use crate::error::{Result, RunError};

type ReleaseFn = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

pub struct CleanupGuard {
    resource: String,
    release: Option<ReleaseFn>,
}

impl CleanupGuard {
    /// Registers the release call for a freshly created resource
    ///
    /// # Arguments
    /// * `resource` - Human readable name used in logs (e.g., "pod default/x")
    /// * `release` - Removes the resource
    pub fn new<F, Fut>(resource: impl Into<String>, release: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            resource: resource.into(),
            release: Some(Box::new(move || -> BoxFuture<'static, Result<()>> {
                Box::pin(release())
            })),
        }
    }

    /// Drops the release call without running it
    ///
    /// Used when creation was rejected, so there is nothing to remove.
    pub fn disarm(mut self) {
        if self.release.take().is_some() {
            debug!("Nothing to release for {}", self.resource);
        }
    }

    /// Runs the release call and waits for it
    pub async fn release(mut self) -> Result<()> {
        match self.release.take() {
            Some(release) => {
                debug!("Releasing {}", self.resource);
                release().await
            }
            None => Ok(()),
        }
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let Some(release) = self.release.take() else {
            return;
        };

        let resource = std::mem::take(&mut self.resource);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("Releasing {} in the background", resource);
                handle.spawn(async move {
                    if let Err(e) = release().await {
                        warn!("Failed to release {}: {}", resource, e);
                    }
                });
            }
            Err(_) => {
                warn!("No async runtime available, {} was not released", resource);
            }
        }
    }
}

/// Combines the outcome of a run with the outcome of its cleanup
///
/// A cleanup failure never masks the primary error; it is logged instead.
/// After a successful run a cleanup failure becomes the error, since the
/// workload may still exist.
pub fn settle<T>(outcome: Result<T>, cleanup: Result<()>, resource: &str) -> Result<T> {
    match (outcome, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(cleanup_err)) => Err(cleanup_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(cleanup_err)) => {
            warn!(
                "Failed to clean up {} after error '{}': {}",
                resource, err, cleanup_err
            );
            Err(err)
        }
    }
}

/// Maps an elapsed timeout onto a run error
pub fn flatten_timeout<T>(
    result: std::result::Result<Result<T>, tokio::time::error::Elapsed>,
    timeout_error: impl FnOnce() -> RunError,
) -> Result<T> {
    result.unwrap_or_else(|_| Err(timeout_error()))
}
