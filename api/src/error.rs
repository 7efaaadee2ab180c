use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use doc_chat::Error;

use crate::text_response::ErrorResponse;

/// Converts a failure into a JSON error body at the HTTP boundary.
#[derive(Debug)]
pub struct AppError(pub Error);

impl AppError {
    pub fn missing(message: &str) -> Self {
        Self(Error::MissingInput(message.to_string()))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            err if err.is_caller_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.0.to_string();

        if status.is_server_error() {
            log::error!("{}", error);
        } else {
            log::debug!("Rejected request: {}", error);
        }

        (status, Json(ErrorResponse { error })).into_response()
    }
}
