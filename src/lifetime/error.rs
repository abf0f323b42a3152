// Error definitions for expired lifetimes.

use std::sync::Arc;

/// Error returned by `value` and `reset` once a lifetime has terminated.
///
/// If closing the wrapped value failed at expiry, that error is carried
/// as the `source` of this one, so callers can tell "expired cleanly"
/// apart from "expired and the release itself failed".
#[derive(Debug, Clone, thiserror::Error)]
#[error("lifetime expired")]
pub struct Expired {
    #[source]
    close_err: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Expired {
    pub(crate) fn new(close_err: Option<Arc<dyn std::error::Error + Send + Sync>>) -> Self {
        Self { close_err }
    }

    /// Returns the error the wrapped value's close call produced, if it failed.
    pub fn close_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.close_err.as_deref()
    }
}
