//! Group management and group file access.

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use super::{attachment, success};
use crate::error::ApiError;
use crate::form::RequestForm;
use crate::state::AppState;
use opencdn_common::{CapabilityKey, HashedKey};
use opencdn_store::GroupListing;

#[derive(Debug, Serialize)]
pub struct CreateGroupResponse {
    pub name: String,
    pub key: String,
    pub hashed_key: HashedKey,
    pub private_key: String,
}

/// `POST /group/{name}`
pub async fn create(
    State(state): State<AppState>,
    Path(name): Path<String>,
    form: RequestForm,
) -> Result<Json<CreateGroupResponse>, ApiError> {
    state
        .tokens
        .require_for_upload(form.field("authentication_token"))?;
    let created = state
        .groups
        .create_group(&name, form.secret("private_key")?)
        .await?;

    Ok(Json(CreateGroupResponse {
        key: created.key.as_str().to_string(),
        private_key: created.private_key.as_str().to_string(),
        hashed_key: created.hashed_key,
        name: created.name,
    }))
}

/// `PUT /group/{name}` lists the files under a key.
pub async fn list(
    State(state): State<AppState>,
    Path(name): Path<String>,
    form: RequestForm,
) -> Result<Json<GroupListing>, ApiError> {
    let key = form.require_key("key")?;
    let secret = form.require_secret("private_key")?;
    Ok(Json(state.groups.list_files(&name, &key, &secret).await?))
}

/// `DELETE /group/{name}`
pub async fn delete(
    State(state): State<AppState>,
    Path(name): Path<String>,
    form: RequestForm,
) -> Result<Response, ApiError> {
    let secret = form.require_secret("private_key")?;
    state.groups.delete_group(&name, &secret).await?;
    Ok(success())
}

/// `GET /{group}/{key}/{filename}`
pub async fn get_file(
    State(state): State<AppState>,
    Path((group, key, filename)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let key = CapabilityKey::new(key)?;
    let content = state.groups.get_file(&group, &key, &filename).await?;
    attachment(&filename, content)
}

/// `DELETE /{group}/{key}/{filename}`
pub async fn delete_file(
    State(state): State<AppState>,
    Path((group, key, filename)): Path<(String, String, String)>,
    form: RequestForm,
) -> Result<Response, ApiError> {
    let key = CapabilityKey::new(key)?;
    let secret = form.require_secret("private_key")?;
    state
        .groups
        .delete_file(&group, &key, &filename, &secret)
        .await?;
    Ok(success())
}
