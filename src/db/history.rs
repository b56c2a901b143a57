use crate::{error::AppResult, models::HistoryEntry};

/// Read-only access to a user's listening history
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    /// Returns at most `limit` entries for the user, newest first
    async fn recent_tracks(&self, user_id: &str, limit: i64) -> AppResult<Vec<HistoryEntry>>;
}
