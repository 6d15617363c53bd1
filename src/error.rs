use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};
use serde_json::json;
use axum::Json;
use thiserror::Error;

use crate::services::export::ExportError;
use crate::services::generator::GeneratorError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Generator error: {0}")]
    Generator(#[from] GeneratorError),
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Export task failed: {}", err))
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Generator(GeneratorError::UnknownProvider(_))
            | AppError::Generator(GeneratorError::NotConfigured(_)) => StatusCode::BAD_REQUEST,
            AppError::Generator(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::generator::ProviderKind;

    #[test]
    fn maps_errors_to_status_codes() {
        assert_eq!(AppError::InvalidInput("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::from(GeneratorError::NotConfigured(ProviderKind::Anthropic)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(GeneratorError::EmptyResponse(ProviderKind::Gemini)).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(AppError::from(ExportError::NoStories).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn response_carries_status() {
        let response = AppError::InvalidInput("User story is required".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
