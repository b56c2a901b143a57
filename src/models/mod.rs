use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod catalog;

pub use catalog::{AudioFeatures, CatalogTrack};

/// A single play from the user's listening history
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct HistoryEntry {
    pub track_id: Option<String>,
    pub played_at: DateTime<Utc>,
}

/// Incoming recommendation request.
///
/// Both fields are optional at the type level; validation happens in the handler so that a
/// missing `user_id` produces our own 400 body instead of axum's rejection.
#[derive(Debug, Default, PartialEq)]
pub struct RecommendRequest {
    pub user_id: Option<String>,
    pub mood: Option<String>,
}

impl RecommendRequest {
    /// Parses a request body field by field.
    ///
    /// A body that isn't a JSON object reads as empty. A field of the wrong type reads as
    /// absent without affecting the other field.
    pub fn from_body(body: &[u8]) -> Self {
        let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
        let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);

        Self {
            user_id: field("user_id"),
            mood: field("mood"),
        }
    }
}

/// A recommended track with its blended similarity score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTrack {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub image: String,
    pub uri: String,
    pub preview_url: Option<String>,
    pub score: f64,
}

impl ScoredTrack {
    pub fn new(track: CatalogTrack, score: f64) -> Self {
        let artist = track
            .artists
            .into_iter()
            .next()
            .map(|a| a.name)
            .unwrap_or_default();
        let image = track
            .album
            .images
            .into_iter()
            .next()
            .map(|i| i.url)
            .unwrap_or_default();

        Self {
            id: track.id,
            name: track.name,
            artist,
            image,
            uri: track.uri,
            preview_url: track.preview_url,
            score,
        }
    }
}

/// Response body of the recommendation endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<ScoredTrack>,
}

impl RecommendationResponse {
    pub fn empty() -> Self {
        Self::default()
    }
}
