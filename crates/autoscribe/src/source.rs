use async_trait::async_trait;
use autoscribe_core::{AutoscribeResult, MessageData};

/// Message-retrieval seam to the host application.
///
/// The pipeline fetches a session's current messages through this trait at
/// flush time; tests inject an in-process mock. Implementations over the
/// host's API typically deserialize the raw response with
/// [`MessageData::from_json`].
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Returns the ordered messages of `session_id` as the host currently
    /// sees them. An unknown session yields an empty list, not an error.
    async fn messages(&self, session_id: &str) -> AutoscribeResult<Vec<MessageData>>;
}
