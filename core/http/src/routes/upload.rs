//! `POST /upload`: store a single object or add a file to a group.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::error::ApiError;
use crate::form::RequestForm;
use crate::state::AppState;
use opencdn_common::{CapabilityKey, HashedKey, OwnershipSecret};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub key: String,
    pub hashed_key: HashedKey,
    pub filename: String,
    pub private_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

pub async fn handler(
    State(state): State<AppState>,
    mut form: RequestForm,
) -> Result<Json<UploadResponse>, ApiError> {
    state
        .tokens
        .require_for_upload(form.field("authentication_token"))?;
    let file = form.take_file()?;

    if let Some(group) = form.field("group") {
        let key = form.require_key("key")?;
        let secret = form.require_secret("private_key")?;
        let stored = state
            .groups
            .add_file(group, &key, file.content, &file.filename, &secret)
            .await?;

        return Ok(Json(UploadResponse {
            key: key.as_str().to_string(),
            hashed_key: stored.hashed_key,
            filename: stored.filename,
            private_key: secret.as_str().to_string(),
            group: Some(group.to_string()),
        }));
    }

    let key: CapabilityKey = state.engine.generate_capability_key()?;
    let secret: OwnershipSecret = match form.secret("private_key")? {
        Some(secret) => secret,
        None => state.engine.generate_ownership_secret()?,
    };
    let stored = state
        .objects
        .put(file.content, &key, &secret, &file.filename)
        .await?;

    Ok(Json(UploadResponse {
        key: key.as_str().to_string(),
        hashed_key: stored.hashed_key,
        filename: stored.filename,
        private_key: secret.as_str().to_string(),
        group: None,
    }))
}
