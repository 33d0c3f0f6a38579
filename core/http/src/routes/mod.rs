//! Route table and shared response helpers.

use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::json;

use crate::error::ApiError;
use crate::state::AppState;
use opencdn_common::Error;

pub mod authentication;
pub mod group;
pub mod index;
pub mod object;
pub mod upload;

/// Characters left readable in an RFC 5987 filename.
const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index::handler))
        .route("/upload", post(upload::handler))
        .route(
            "/authentication",
            post(authentication::issue).delete(authentication::revoke),
        )
        .route("/authentication/test", post(authentication::test))
        .route(
            "/group/{name}",
            post(group::create).put(group::list).delete(group::delete),
        )
        .route("/{key}/{filename}", get(object::get).delete(object::delete))
        .route(
            "/{group}/{key}/{filename}",
            get(group::get_file).delete(group::delete_file),
        )
        .fallback(not_found)
}

async fn not_found() -> ApiError {
    ApiError(Error::NotFound("No such route".to_string()))
}

/// `{"status": "success"}`.
pub(crate) fn success() -> Response {
    (StatusCode::OK, Json(json!({ "status": "success" }))).into_response()
}

/// Serve decrypted content as a download.
pub(crate) fn attachment(filename: &str, content: Vec<u8>) -> Result<Response, ApiError> {
    let mime = mime_guess::from_path(filename).first_or_octet_stream();
    let encoded = utf8_percent_encode(filename, FILENAME_ENCODE_SET);
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        encoded, encoded
    ))
    .map_err(|e| Error::Serialization(format!("Invalid Content-Disposition: {}", e)))?;
    let content_type = HeaderValue::from_str(mime.as_ref())
        .map_err(|e| Error::Serialization(format!("Invalid Content-Type: {}", e)))?;

    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, content_type), (CONTENT_DISPOSITION, disposition)],
        content,
    )
        .into_response())
}
