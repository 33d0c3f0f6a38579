//! Conversion of store errors into JSON error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use opencdn_common::{Error, ErrorKind};

/// Error returned by every handler.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub Error);

/// Wire shape of an error.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub id: u32,
    pub name: &'static str,
    pub description: &'static str,
}

impl From<ErrorKind> for ErrorBody {
    fn from(kind: ErrorKind) -> Self {
        Self {
            status: "error",
            id: kind.id(),
            name: kind.name(),
            description: kind.description(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();

        // Context stays in the log, the client only sees the kind
        if self.0.is_internal() {
            tracing::error!(error = %self.0, "Internal error");
        } else {
            tracing::debug!(error = %self.0, name = kind.name(), "Request rejected");
        }

        let status =
            StatusCode::from_u16(kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorBody::from(kind))).into_response()
    }
}
