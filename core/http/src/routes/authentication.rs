//! Token issue, revoke and test endpoints.

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use super::success;
use crate::error::ApiError;
use crate::form::RequestForm;
use crate::state::AppState;
use opencdn_common::Error;

const TOKEN_FIELD: &str = "authentication_token";

#[derive(Debug, Serialize)]
pub struct IssueResponse {
    pub encrypted_authentication_token: String,
}

/// `POST /authentication`
pub async fn issue(
    State(state): State<AppState>,
    form: RequestForm,
) -> Result<Json<IssueResponse>, ApiError> {
    let key_identifier = form.require("key_identifier")?;
    Ok(Json(IssueResponse {
        encrypted_authentication_token: state.tokens.issue_token(key_identifier)?,
    }))
}

/// `DELETE /authentication`
///
/// Unknown tokens are rejected as invalid before anything is removed.
pub async fn revoke(
    State(state): State<AppState>,
    form: RequestForm,
) -> Result<Response, ApiError> {
    let token = form.field(TOKEN_FIELD).ok_or(Error::TokenRequired)?;
    state.tokens.validate(Some(token))?;
    state.tokens.revoke(token)?;
    Ok(success())
}

/// `POST /authentication/test`
///
/// Answers only after the configured delay to slow down token guessing.
pub async fn test(
    State(state): State<AppState>,
    form: RequestForm,
) -> Result<Response, ApiError> {
    tokio::time::sleep(state.settings.test_delay).await;
    state.tokens.validate(form.field(TOKEN_FIELD))?;
    Ok(success())
}
