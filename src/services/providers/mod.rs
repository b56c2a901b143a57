/// Music catalog abstraction
///
/// The recommender needs three capabilities from a catalog: free-text track search, batched
/// audio-feature lookup and seed-based recommendations. Spotify is the only implementation
/// today, but handlers only ever see the trait.
use crate::{
    error::AppResult,
    models::{AudioFeatures, CatalogTrack},
};

pub mod spotify;

pub use spotify::SpotifyProvider;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogService: Send + Sync {
    /// Search for tracks matching free text
    async fn search_tracks(&self, query: &str, limit: u32) -> AppResult<Vec<CatalogTrack>>;

    /// Fetch audio features for a batch of track ids
    ///
    /// The result is positionally aligned with `ids`; ids the catalog has no features for
    /// yield `None`.
    async fn audio_features(&self, ids: &[String]) -> AppResult<Vec<Option<AudioFeatures>>>;

    /// Fetch up to `limit` tracks similar to the seed tracks
    async fn recommendations(
        &self,
        seed_ids: &[String],
        limit: u32,
    ) -> AppResult<Vec<CatalogTrack>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
