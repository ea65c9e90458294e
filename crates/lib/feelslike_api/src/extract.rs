//! Request extractors whose rejections render as [`AppError`].

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Multipart, Request};

use crate::error::AppError;

/// JSON body; malformed or incomplete bodies become 400.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string; unknown keys and unparsable values become 400.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Path parameters; an id that is not a UUID becomes 400.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// An uploaded file part.
#[derive(Debug, Clone)]
pub struct FormUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

/// A fully buffered `multipart/form-data` body.
///
/// Text parts are kept by name; parts that carry a filename are kept as
/// uploads. A file part with no content counts as absent.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, FormUpload>,
}

impl MultipartForm {
    /// A text field, if present.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// A text field that must be present and non-blank.
    pub fn required(&self, name: &str) -> Result<&str, AppError> {
        require(name, self.text(name))
    }

    /// Remove and return an uploaded file.
    pub fn take_file(&mut self, name: &str) -> Option<FormUpload> {
        self.files.remove(name)
    }
}

impl<S> FromRequest<S> for MultipartForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state).await?;
        let mut form = MultipartForm::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            match field.file_name().map(str::to_owned) {
                Some(file_name) => {
                    let bytes = field.bytes().await?;
                    if !bytes.is_empty() {
                        form.files.insert(name, FormUpload { file_name, bytes });
                    }
                }
                None => {
                    let text = field.text().await?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }
}

/// Reject a missing or blank value with `"<name>" is required`.
pub fn require<'a>(name: &str, value: Option<&'a str>) -> Result<&'a str, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::Validation(format!("\"{name}\" is required"))),
    }
}
