//! Form extraction for both multipart and urlencoded bodies.

use std::collections::HashMap;

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::Form;

use crate::error::ApiError;
use opencdn_common::{CapabilityKey, Error, OwnershipSecret, Result};

/// Multipart field carrying the uploaded file.
pub const FILE_FIELD: &str = "file";

/// File part of a multipart request.
#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub content: Vec<u8>,
}

/// Text fields plus an optional file.
///
/// Requests without a form content type yield an empty form, so missing
/// fields surface as `BadRequest` from the handler rather than a rejection.
#[derive(Debug, Default)]
pub struct RequestForm {
    fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl RequestForm {
    /// Optional text field. Empty values count as absent.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Required text field.
    pub fn require(&self, name: &str) -> Result<&str> {
        self.field(name)
            .ok_or_else(|| Error::BadRequest(format!("Missing field '{}'", name)))
    }

    /// Required capability key field.
    pub fn require_key(&self, name: &str) -> Result<CapabilityKey> {
        CapabilityKey::new(self.require(name)?)
    }

    /// Required ownership secret field.
    pub fn require_secret(&self, name: &str) -> Result<OwnershipSecret> {
        OwnershipSecret::new(self.require(name)?)
    }

    /// Optional ownership secret field.
    pub fn secret(&self, name: &str) -> Result<Option<OwnershipSecret>> {
        self.field(name).map(OwnershipSecret::new).transpose()
    }

    /// Take the uploaded file.
    pub fn take_file(&mut self) -> Result<UploadedFile> {
        self.file
            .take()
            .ok_or_else(|| Error::BadRequest("No file in request".to_string()))
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();

            if name == FILE_FIELD {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content = field.bytes().await.map_err(multipart_error)?.to_vec();
                form.file = Some(UploadedFile { filename, content });
            } else {
                let value = field.text().await.map_err(multipart_error)?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::TooLarge(e.body_text())
    } else {
        Error::BadRequest(e.body_text())
    }
}

impl<S> FromRequest<S> for RequestForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| Error::BadRequest(e.body_text()))?;
            Ok(Self::from_multipart(multipart).await?)
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| {
                    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                        Error::TooLarge(e.body_text())
                    } else {
                        Error::BadRequest(e.body_text())
                    }
                })?;
            Ok(Self { fields, file: None })
        } else {
            Ok(Self::default())
        }
    }
}
