//! `GET` and `DELETE /{key}/{filename}`.

use axum::extract::{Path, State};
use axum::response::Response;

use super::{attachment, success};
use crate::error::ApiError;
use crate::form::RequestForm;
use crate::state::AppState;
use opencdn_common::CapabilityKey;

pub async fn get(
    State(state): State<AppState>,
    Path((key, filename)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let key = CapabilityKey::new(key)?;
    let content = state.objects.get(&key, &filename).await?;
    attachment(&filename, content)
}

pub async fn delete(
    State(state): State<AppState>,
    Path((key, filename)): Path<(String, String)>,
    form: RequestForm,
) -> Result<Response, ApiError> {
    let key = CapabilityKey::new(key)?;
    let secret = form.require_secret("private_key")?;
    state.objects.delete(&key, &filename, &secret).await?;
    Ok(success())
}
