use super::{authenticate, ApiError, AppState};
use crate::auth::optional_bearer_token;
use crate::error::AuthError;
use crate::service::OAuthCallback;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Authorization code relayed by the client after the provider redirect
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubCallbackRequest {
    pub code: String,
    pub client_id: String,
    pub redirect_uri: String,
}

#[derive(Deserialize)]
pub struct UnlinkRequest {
    pub provider: String,
}

#[derive(Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// POST /auth/login
pub(super) async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state
        .service
        .login(&request.email, &request.password)
        .await?;
    Ok(Json(TokenResponse { token }))
}

/// POST /auth/github
///
/// With an Authorization header the GitHub account is linked to the caller;
/// without one the caller signs in (or up) with GitHub.
pub(super) async fn github(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<GitHubCallbackRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let existing = optional_bearer_token(&headers).map_err(AuthError::from)?;
    debug!(linking = existing.is_some(), "GitHub callback received");

    let callback = OAuthCallback {
        code: request.code,
        client_id: request.client_id,
        redirect_uri: request.redirect_uri,
    };
    let token = state
        .service
        .oauth_callback(&callback, existing.as_deref())
        .await?;
    Ok(Json(TokenResponse { token }))
}

/// POST /auth/unlink
pub(super) async fn unlink(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<UnlinkRequest>,
) -> Result<StatusCode, ApiError> {
    let subject = authenticate(&state, &headers)?;
    state.service.unlink(subject, &request.provider).await?;
    Ok(StatusCode::OK)
}
