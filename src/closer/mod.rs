// Package closer defines the release contract for wrapped resources.

use async_trait::async_trait;

/// Error produced by releasing a wrapped resource.
pub type CloseError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A resource that must be released when its owner is done with it.
///
/// Implementations should tolerate being dropped without `close` having
/// been called; a [`crate::Lifetime`] calls it at most once.
#[async_trait]
pub trait Closer: Send + Sync {
    /// Releases the resource.
    async fn close(&mut self) -> Result<(), CloseError>;
}

#[async_trait]
impl<T: Closer + ?Sized> Closer for Box<T> {
    async fn close(&mut self) -> Result<(), CloseError> {
        (**self).close().await
    }
}
