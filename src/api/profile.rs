use super::{authenticate, ApiError, AppState};
use crate::identity::{ProfileUpdate, UserRecord};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Public view of a user record (no password hash, no provider token)
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub picture: Option<String>,
    pub linked_provider: Option<LinkedProviderView>,
    pub temporary_password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedProviderView {
    pub provider: String,
    pub provider_id: String,
}

impl From<UserRecord> for ProfileView {
    fn from(user: UserRecord) -> Self {
        ProfileView {
            id: user.id(),
            linked_provider: user.linked_provider.map(|link| LinkedProviderView {
                provider: link.provider,
                provider_id: link.provider_id,
            }),
            email: user.email,
            display_name: user.display_name,
            picture: user.picture,
            temporary_password: user.temporary_password,
        }
    }
}

/// GET /api/me
pub(super) async fn get_me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ProfileView>, ApiError> {
    let subject = authenticate(&state, &headers)?;
    let user = state.service.get_profile(subject).await?;
    Ok(Json(user.into()))
}

/// PUT /api/me
pub(super) async fn put_me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(update): Json<ProfileUpdate>,
) -> Result<StatusCode, ApiError> {
    let subject = authenticate(&state, &headers)?;
    state.service.update_profile(subject, update).await?;
    Ok(StatusCode::OK)
}
