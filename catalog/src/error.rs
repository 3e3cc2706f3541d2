use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use tracing::error;

use crate::dto::ErrorResponse;

#[derive(Debug)]
pub enum AppError {
    /// Missing or malformed input, nothing was touched
    BadRequest(String),
    /// The upload body could not be read to the end
    Upload(anyhow::Error),
    NotFound(String),
    /// Blob read or write failed
    Io(anyhow::Error),
    /// Metadata engine failed
    Storage(anyhow::Error),
    InternalServerError(anyhow::Error),
}

impl AppError {
    pub fn bad_request<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::BadRequest(t.to_string())
    }

    pub fn not_found<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::NotFound(t.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Upload(err) => upload_status(err),
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Io(_) | AppError::Storage(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::BadRequest(msg) | AppError::NotFound(msg) => msg,
            AppError::Upload(err) => format!("upload failed: {err}"),
            AppError::Io(err) => {
                error!("blob io error: {:?}", err);
                err.to_string()
            }
            AppError::Storage(err) => {
                error!("database error: {:?}", err);
                err.to_string()
            }
            AppError::InternalServerError(err) => {
                error!("internal error: {:?}", err);
                err.to_string()
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Multipart failures carry their own status, e.g. 413 past the body limit
fn upload_status(err: &anyhow::Error) -> StatusCode {
    if let Some(e) = err.downcast_ref::<MultipartError>() {
        e.status()
    } else if let Some(e) = err.downcast_ref::<MultipartRejection>() {
        e.status()
    } else {
        StatusCode::BAD_REQUEST
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        AppError::InternalServerError(err.into())
    }
}
