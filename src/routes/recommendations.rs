use axum::{
    body::Bytes,
    extract::State,
    http::{
        header::{ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS},
        StatusCode,
    },
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{RecommendRequest, RecommendationResponse},
    routes::AppState,
    services::recommendations::DEFAULT_MOOD,
};

/// CORS preflight: answered before any business logic
pub async fn preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (ACCESS_CONTROL_ALLOW_METHODS, "POST"),
            (ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        ],
    )
}

/// Handler for recommendations endpoint
///
/// The body is taken raw so that malformed JSON is treated like an empty object rather than
/// rejected by the extractor.
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    body: Bytes,
) -> AppResult<Json<RecommendationResponse>> {
    let request = RecommendRequest::from_body(&body);

    let user_id = request
        .user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::InvalidInput("user_id required".to_string()))?;
    let mood = request
        .mood
        .unwrap_or_else(|| DEFAULT_MOOD.to_string())
        .to_lowercase();

    tracing::info!(
        request_id = %request_id,
        user_id = %user_id,
        mood = %mood,
        "Processing recommendation request"
    );

    let response = state.recommender.recommend(&user_id, &mood).await?;

    tracing::info!(
        request_id = %request_id,
        count = response.recommendations.len(),
        "Recommendation completed"
    );

    Ok(Json(response))
}
