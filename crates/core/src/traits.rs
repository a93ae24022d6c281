use crate::error::BackendError;
use crate::sentiment::Classification;
use async_trait::async_trait;

/// A pluggable sentiment model.
///
/// Implementations own their evaluation context; the scorer never shares
/// one backend's state with another.
#[async_trait]
pub trait SentimentBackend: Send + Sync {
    /// Stable model name recorded on every score this backend produces.
    fn name(&self) -> &str;

    /// Classifies a single piece of text.
    async fn score(&self, text: &str) -> Result<Classification, BackendError>;

    /// Checks the backend can serve requests before a run starts.
    async fn health_check(&self) -> Result<(), BackendError> {
        Ok(())
    }
}
