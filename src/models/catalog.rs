use serde::{Deserialize, Serialize};

// ============================================================================
// Spotify Web API Types
// ============================================================================

/// A track object as returned by search and recommendations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogTrack {
    pub id: String,
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub album: Album,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
}

/// Perceptual attributes of a track. Spotify returns more fields; we only keep the three we score on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    #[serde(default)]
    pub id: String,
    pub energy: f64,
    pub valence: f64,
    pub danceability: f64,
}

/// Response of `GET /search?type=track`
#[derive(Debug, Deserialize)]
pub struct ApiSearchResponse {
    pub tracks: ApiTrackPage,
}

#[derive(Debug, Deserialize)]
pub struct ApiTrackPage {
    #[serde(default)]
    pub items: Vec<CatalogTrack>,
}

/// Response of `GET /audio-features`; unknown ids come back as `null`
#[derive(Debug, Deserialize)]
pub struct ApiAudioFeaturesResponse {
    #[serde(default)]
    pub audio_features: Vec<Option<AudioFeatures>>,
}

/// Response of `GET /recommendations`
#[derive(Debug, Deserialize)]
pub struct ApiRecommendationsResponse {
    #[serde(default)]
    pub tracks: Vec<CatalogTrack>,
}

/// Response of the client-credentials token endpoint
#[derive(Debug, Deserialize)]
pub struct ApiTokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}
