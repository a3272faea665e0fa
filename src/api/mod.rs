// HTTP surface over the identity service

mod auth;
mod profile;

pub use profile::{LinkedProviderView, ProfileView};

use crate::auth::extract_bearer_token;
use crate::error::AuthError;
use crate::service::IdentityService;
use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

/// Shared application state for all routes
#[derive(Clone)]
pub struct AppState {
    pub service: IdentityService,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

/// Service error rendered as an HTTP response
pub struct ApiError(pub AuthError);

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            AuthError::AuthHeaderMissing
            | AuthError::TokenMalformed(_)
            | AuthError::TokenExpired
            | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::UserNotFound | AuthError::UnsupportedProvider(_) => StatusCode::BAD_REQUEST,
            AuthError::ConflictAlreadyLinked => StatusCode::CONFLICT,
            AuthError::HashingFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
            AuthError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            message: self.0.to_string(),
        });

        (status, body).into_response()
    }
}

/// Create the idgate router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/github", post(auth::github))
        .route("/auth/unlink", post(auth::unlink))
        .route("/api/me", get(profile::get_me).put(profile::put_me))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Resolve the request's bearer token to a subject id
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let token = extract_bearer_token(headers).map_err(AuthError::from)?;
    Ok(state.service.ensure_authenticated(&token)?)
}
