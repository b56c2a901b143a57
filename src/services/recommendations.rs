use std::sync::Arc;

use crate::{
    db::{CacheKey, HistoryStore, RecommendationCache},
    error::{AppError, AppResult},
    models::{AudioFeatures, CatalogTrack, RecommendationResponse},
    services::{
        providers::CatalogService,
        scoring::{self, mood_target},
    },
};

/// Mood used when the request does not name one
pub const DEFAULT_MOOD: &str = "chill";

const HISTORY_LIMIT: i64 = 20;
const SEARCH_LIMIT: u32 = 5;
const SEED_LIMIT: usize = 5;
const CANDIDATE_LIMIT: u32 = 20;
const TOP_N: usize = 10;

/// Generates mood-conditioned track recommendations
///
/// Blends the listener's recent history with the catalog's audio features:
/// candidates are scored by cosine similarity to the listener's average
/// (energy, valence, danceability) vector and to a fixed target for the mood.
#[derive(Clone)]
pub struct Recommender {
    history: Arc<dyn HistoryStore>,
    catalog: Arc<dyn CatalogService>,
    cache: Arc<dyn RecommendationCache>,
}

impl Recommender {
    pub fn new(
        history: Arc<dyn HistoryStore>,
        catalog: Arc<dyn CatalogService>,
        cache: Arc<dyn RecommendationCache>,
    ) -> Self {
        Self {
            history,
            catalog,
            cache,
        }
    }

    /// Recommends up to ten tracks for `user_id` in the given (already lower-cased) mood
    pub async fn recommend(&self, user_id: &str, mood: &str) -> AppResult<RecommendationResponse> {
        // 1. Cache
        self.cache.sweep_expired().await;
        let cache_key = CacheKey::recommendation(user_id, mood);
        if let Some(cached) = self.cache.get(&cache_key).await {
            tracing::info!(key = %cache_key, backend = self.cache.name(), "Cache hit");
            return Ok(cached);
        }

        // 2. Seeds from history, falling back to a search on the mood text
        let mut seed_ids = self.history_seeds(user_id).await?;
        tracing::info!(
            user_id = %user_id,
            seeds = seed_ids.len(),
            "Loaded seed tracks from history"
        );

        if seed_ids.is_empty() {
            seed_ids = self.search_seeds(mood).await?;
        }

        if seed_ids.is_empty() {
            return Ok(RecommendationResponse::empty());
        }

        // 3. Listener vector
        let seed_features: Vec<AudioFeatures> = self
            .catalog
            .audio_features(&seed_ids)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Audio features error");
                AppError::FeatureFetchFailed
            })?
            .into_iter()
            .flatten()
            .collect();

        let Some(user_vector) = scoring::mean_vector(&seed_features) else {
            return Ok(RecommendationResponse::empty());
        };
        let target = mood_target(mood);

        tracing::info!(user_vector = ?user_vector.0, mood = %mood, "Computed user vector");

        // 4. Candidates
        let seeds = &seed_ids[..seed_ids.len().min(SEED_LIMIT)];
        let candidates = self
            .catalog
            .recommendations(seeds, CANDIDATE_LIMIT)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Recommendations error");
                AppError::RecommendationFetchFailed
            })?;

        let candidate_features = self.candidate_features(&candidates).await;

        // 5. Score and rank
        let scored =
            scoring::score_candidates(candidates, &candidate_features, &user_vector, &target);
        let top = scoring::rank(scored, TOP_N);

        tracing::info!(returned = top.len(), "Returning recommendations");

        let result = RecommendationResponse {
            recommendations: top,
        };
        self.cache.insert(&cache_key, &result).await;

        Ok(result)
    }

    async fn history_seeds(&self, user_id: &str) -> AppResult<Vec<String>> {
        let history = self.history.recent_tracks(user_id, HISTORY_LIMIT).await?;

        Ok(history
            .into_iter()
            .filter_map(|entry| entry.track_id)
            .filter(|id| !id.is_empty())
            .collect())
    }

    async fn search_seeds(&self, mood: &str) -> AppResult<Vec<String>> {
        tracing::info!(mood = %mood, "No history, searching by mood");

        let tracks = self
            .catalog
            .search_tracks(mood, SEARCH_LIMIT)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Search error");
                AppError::SearchFailed
            })?;

        Ok(tracks.into_iter().map(|t| t.id).collect())
    }

    /// Features for every candidate, or all-`None` if the lookup fails
    async fn candidate_features(
        &self,
        candidates: &[CatalogTrack],
    ) -> Vec<Option<AudioFeatures>> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let ids: Vec<String> = candidates.iter().map(|t| t.id.clone()).collect();
        match self.catalog.audio_features(&ids).await {
            Ok(features) => features,
            Err(e) => {
                tracing::error!(error = %e, "Candidate features error, scoring nothing");
                vec![None; ids.len()]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{cache::MockRecommendationCache, history::MockHistoryStore, InMemoryCache},
        models::{catalog::Album, HistoryEntry, ScoredTrack},
        services::providers::MockCatalogService,
    };
    use chrono::Utc;
    use mockall::predicate::eq;

    fn entry(track_id: Option<&str>) -> HistoryEntry {
        HistoryEntry {
            track_id: track_id.map(str::to_string),
            played_at: Utc::now(),
        }
    }

    fn track(id: &str) -> CatalogTrack {
        CatalogTrack {
            id: id.to_string(),
            name: format!("Song {}", id),
            uri: format!("spotify:track:{}", id),
            preview_url: None,
            artists: vec![],
            album: Album::default(),
        }
    }

    fn features(id: &str, energy: f64, valence: f64, danceability: f64) -> AudioFeatures {
        AudioFeatures {
            id: id.to_string(),
            energy,
            valence,
            danceability,
        }
    }

    /// Features that vary with the id so scores differ between candidates
    fn varied_features(ids: &[String]) -> Vec<Option<AudioFeatures>> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| {
                let x = (i as f64 + 1.0) / (ids.len() as f64 + 1.0);
                Some(features(id, x, 1.0 - x, 0.5))
            })
            .collect()
    }

    fn recommender(
        history: MockHistoryStore,
        catalog: MockCatalogService,
        cache: Arc<dyn RecommendationCache>,
    ) -> Recommender {
        Recommender::new(Arc::new(history), Arc::new(catalog), cache)
    }

    fn history_with(ids: &'static [&'static str]) -> MockHistoryStore {
        let mut history = MockHistoryStore::new();
        history
            .expect_recent_tracks()
            .returning(move |_, _| Ok(ids.iter().map(|id| entry(Some(*id))).collect()));
        history
    }

    #[tokio::test]
    async fn test_cache_hit_skips_collaborators() {
        let cached = RecommendationResponse {
            recommendations: vec![ScoredTrack::new(track("cached"), 0.42)],
        };

        let mut cache = MockRecommendationCache::new();
        cache.expect_sweep_expired().times(1).return_const(());
        cache.expect_name().return_const("mock");
        let hit = cached.clone();
        cache
            .expect_get()
            .withf(|key| key.to_string() == "u1_happy")
            .returning(move |_| Some(hit.clone()));
        cache.expect_insert().never();

        let mut history = MockHistoryStore::new();
        history.expect_recent_tracks().never();
        let mut catalog = MockCatalogService::new();
        catalog.expect_search_tracks().never();
        catalog.expect_audio_features().never();
        catalog.expect_recommendations().never();

        let result = recommender(history, catalog, Arc::new(cache))
            .recommend("u1", "happy")
            .await
            .unwrap();

        assert_eq!(result, cached);
    }

    #[tokio::test]
    async fn test_history_limit_and_user_passed_through() {
        let mut history = MockHistoryStore::new();
        history
            .expect_recent_tracks()
            .with(eq("u7"), eq(20))
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let mut catalog = MockCatalogService::new();
        catalog
            .expect_search_tracks()
            .returning(|_, _| Ok(vec![]));

        let result = recommender(history, catalog, Arc::new(InMemoryCache::default()))
            .recommend("u7", "chill")
            .await
            .unwrap();

        assert!(result.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_no_history_and_empty_search_is_empty_success() {
        let history = history_with(&[]);

        let mut catalog = MockCatalogService::new();
        catalog
            .expect_search_tracks()
            .with(eq("sad"), eq(5))
            .times(1)
            .returning(|_, _| Ok(vec![]));
        catalog.expect_audio_features().never();
        catalog.expect_recommendations().never();

        let cache = Arc::new(InMemoryCache::default());
        let result = recommender(history, catalog, cache.clone())
            .recommend("u1", "sad")
            .await
            .unwrap();

        assert_eq!(result, RecommendationResponse::empty());
        assert!(cache.is_empty().await, "early empty results are not cached");
    }

    #[tokio::test]
    async fn test_history_entries_without_track_id_are_ignored() {
        let mut history = MockHistoryStore::new();
        history.expect_recent_tracks().returning(|_, _| {
            Ok(vec![entry(None), entry(Some("")), entry(Some("h1"))])
        });

        let mut catalog = MockCatalogService::new();
        catalog.expect_search_tracks().never();
        catalog
            .expect_audio_features()
            .withf(|ids| ids == ["h1".to_string()])
            .times(1)
            .returning(|_| Ok(vec![None]));

        let result = recommender(history, catalog, Arc::new(InMemoryCache::default()))
            .recommend("u1", "chill")
            .await
            .unwrap();

        // No features for the only seed
        assert!(result.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_search_failure_is_search_failed() {
        let history = history_with(&[]);
        let mut catalog = MockCatalogService::new();
        catalog
            .expect_search_tracks()
            .returning(|_, _| Err(AppError::ExternalApi("down".to_string())));

        let err = recommender(history, catalog, Arc::new(InMemoryCache::default()))
            .recommend("u1", "happy")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::SearchFailed));
    }

    #[tokio::test]
    async fn test_history_failure_is_fatal() {
        let mut history = MockHistoryStore::new();
        history
            .expect_recent_tracks()
            .returning(|_, _| Err(AppError::Internal("history unavailable".to_string())));
        let mut catalog = MockCatalogService::new();
        catalog.expect_search_tracks().never();

        let err = recommender(history, catalog, Arc::new(InMemoryCache::default()))
            .recommend("u1", "happy")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("history unavailable"));
    }

    #[tokio::test]
    async fn test_seed_feature_failure_is_feature_fetch_failed() {
        let history = history_with(&["a", "b"]);
        let mut catalog = MockCatalogService::new();
        catalog
            .expect_audio_features()
            .returning(|_| Err(AppError::ExternalApi("down".to_string())));

        let err = recommender(history, catalog, Arc::new(InMemoryCache::default()))
            .recommend("u1", "happy")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::FeatureFetchFailed));
    }

    #[tokio::test]
    async fn test_recommendation_failure_is_recommendation_fetch_failed() {
        let history = history_with(&["a"]);
        let mut catalog = MockCatalogService::new();
        catalog
            .expect_audio_features()
            .returning(|ids| Ok(varied_features(ids)));
        catalog
            .expect_recommendations()
            .returning(|_, _| Err(AppError::ExternalApi("down".to_string())));

        let err = recommender(history, catalog, Arc::new(InMemoryCache::default()))
            .recommend("u1", "happy")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::RecommendationFetchFailed));
    }

    #[tokio::test]
    async fn test_full_flow_returns_top_ten_sorted_and_caches() {
        let history = history_with(&["h1", "h2", "h3", "h4", "h5", "h6", "h7"]);

        let mut catalog = MockCatalogService::new();
        catalog
            .expect_audio_features()
            .returning(|ids| Ok(varied_features(ids)));
        catalog
            .expect_recommendations()
            .withf(|seeds, limit| seeds.len() == 5 && seeds[0] == "h1" && *limit == 20)
            .times(1)
            .returning(|_, limit| Ok((0..limit).map(|i| track(&format!("r{}", i))).collect()));

        let cache = Arc::new(InMemoryCache::default());
        let result = recommender(history, catalog, cache.clone())
            .recommend("u1", "party")
            .await
            .unwrap();

        let recs = &result.recommendations;
        assert_eq!(recs.len(), 10);
        assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));
        for r in recs {
            assert!((-1.0..=1.0).contains(&r.score));
            assert_eq!(r.score, (r.score * 1000.0).round() / 1000.0);
        }

        let key = CacheKey::recommendation("u1", "party");
        assert_eq!(cache.get(&key).await, Some(result));
    }

    #[tokio::test]
    async fn test_candidate_feature_failure_degrades_to_empty() {
        let history = history_with(&["h1", "h2", "h3"]);

        let mut catalog = MockCatalogService::new();
        let mut seq = mockall::Sequence::new();
        catalog
            .expect_audio_features()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|ids| Ok(varied_features(ids)));
        catalog
            .expect_recommendations()
            .returning(|_, _| Ok((0..20).map(|i| track(&format!("r{}", i))).collect()));
        catalog
            .expect_audio_features()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(AppError::ExternalApi("down".to_string())));

        let result = recommender(history, catalog, Arc::new(InMemoryCache::default()))
            .recommend("u1", "focus")
            .await
            .unwrap();

        assert!(result.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_output_bounded_by_candidates_with_features() {
        let history = history_with(&["h1"]);

        let mut catalog = MockCatalogService::new();
        catalog.expect_audio_features().returning(|ids| {
            // Only even positions have features
            Ok(varied_features(ids)
                .into_iter()
                .enumerate()
                .map(|(i, f)| if i % 2 == 0 { f } else { None })
                .collect())
        });
        catalog
            .expect_recommendations()
            .returning(|_, _| Ok((0..6).map(|i| track(&format!("r{}", i))).collect()));

        let result = recommender(history, catalog, Arc::new(InMemoryCache::default()))
            .recommend("u1", "chill")
            .await
            .unwrap();

        assert_eq!(result.recommendations.len(), 3);
    }
}
