/// Spotify Web API provider
///
/// Authenticates with the client-credentials flow and keeps the access token in memory until
/// shortly before it expires.
///
/// API Flow:
/// 1. Token: POST {token_url} (basic auth, grant_type=client_credentials)
/// 2. Search: GET /search?type=track
/// 3. Features: GET /audio-features?ids=... (max 100 ids per call)
/// 4. Recommendations: GET /recommendations?seed_tracks=...
use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{
        catalog::{
            ApiAudioFeaturesResponse, ApiRecommendationsResponse, ApiSearchResponse,
            ApiTokenResponse,
        },
        AudioFeatures, CatalogTrack,
    },
    services::providers::CatalogService,
};
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::{Client as HttpClient, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Spotify rejects audio-feature requests with more ids than this
const AUDIO_FEATURES_BATCH: usize = 100;
/// Refresh the token this long before Spotify says it expires
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + TimeDelta::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Clone)]
pub struct SpotifyProvider {
    http_client: HttpClient,
    client_id: String,
    client_secret: String,
    api_url: String,
    token_url: String,
    token: Arc<Mutex<Option<AccessToken>>>,
}

impl SpotifyProvider {
    pub fn new(client_id: String, client_secret: String, api_url: String, token_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            client_id,
            client_secret,
            api_url: api_url.trim_end_matches('/').to_string(),
            token_url,
            token: Arc::new(Mutex::new(None)),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.spotify_client_id.clone(),
            config.spotify_client_secret.clone(),
            config.spotify_api_url.clone(),
            config.spotify_token_url.clone(),
        )
    }

    /// Returns a valid access token, requesting a new one if the cached token is stale
    async fn access_token(&self) -> AppResult<String> {
        let mut guard = self.token.lock().await;

        if let Some(token) = guard.as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .http_client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let token: ApiTokenResponse = Self::parse(response).await?;
        // Spotify issues one-hour tokens; cap anything odd at a day
        let expires_in = token.expires_in.min(86_400) as i64;

        tracing::debug!(expires_in, provider = "spotify", "Obtained access token");

        let fresh = AccessToken {
            value: token.access_token,
            expires_at: Utc::now() + TimeDelta::seconds(expires_in),
        };
        let value = fresh.value.clone();
        *guard = Some(fresh);

        Ok(value)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> AppResult<T> {
        let token = self.access_token().await?;
        let url = format!("{}/{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> AppResult<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "API returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl CatalogService for SpotifyProvider {
    async fn search_tracks(&self, query: &str, limit: u32) -> AppResult<Vec<CatalogTrack>> {
        let response: ApiSearchResponse = self
            .get(
                "search",
                &[
                    ("q", query.to_string()),
                    ("type", "track".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        tracing::info!(
            query = %query,
            results = response.tracks.items.len(),
            provider = "spotify",
            "Track search completed"
        );

        Ok(response.tracks.items)
    }

    async fn audio_features(&self, ids: &[String]) -> AppResult<Vec<Option<AudioFeatures>>> {
        let mut features = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(AUDIO_FEATURES_BATCH) {
            let response: ApiAudioFeaturesResponse = self
                .get("audio-features", &[("ids", chunk.join(","))])
                .await?;

            let mut batch = response.audio_features;
            // Keep positional alignment even if the API returns a short array
            batch.resize(chunk.len(), None);
            features.extend(batch);
        }

        tracing::debug!(
            requested = ids.len(),
            found = features.iter().filter(|f| f.is_some()).count(),
            provider = "spotify",
            "Audio features fetched"
        );

        Ok(features)
    }

    async fn recommendations(
        &self,
        seed_ids: &[String],
        limit: u32,
    ) -> AppResult<Vec<CatalogTrack>> {
        let response: ApiRecommendationsResponse = self
            .get(
                "recommendations",
                &[
                    ("seed_tracks", seed_ids.join(",")),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        tracing::info!(
            seeds = seed_ids.len(),
            results = response.tracks.len(),
            provider = "spotify",
            "Recommendations fetched"
        );

        Ok(response.tracks)
    }

    fn name(&self) -> &'static str {
        "spotify"
    }
}
