use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::application::usecases::paywall::PaywallError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// A paywall operation failed. Only `message` reaches the client.
    #[error("{message}")]
    Operation {
        message: &'static str,
        #[source]
        source: PaywallError,
    },

    #[error("failed to unmarshal")]
    InvalidBody(#[from] JsonRejection),
}

impl ApiError {
    pub fn operation(message: &'static str) -> impl FnOnce(PaywallError) -> ApiError {
        move |source| ApiError::Operation { message, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Operation { source, .. } => {
                debug!(kind = ?source.kind(), error = %source, "http: responding with error");
            }
            ApiError::InvalidBody(rejection) => {
                debug!(error = %rejection, "http: rejected request body");
            }
        }

        // Every failure collapses to a generic server error for the caller.
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
