//! Error responses of the HTTP API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::pipeline::ValidationError;

/// Closed set of error codes returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RulesetNotFound,
    InvalidRequestBody,
    InvalidRuleset,
    SpectralError,
    ServerError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RulesetNotFound => "RULESET_NOT_FOUND",
            Self::InvalidRequestBody => "INVALID_REQUEST_BODY",
            Self::InvalidRuleset => "INVALID_RULESET",
            Self::SpectralError => "SPECTRAL_ERROR",
            Self::ServerError => "SERVER_ERROR",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::RulesetNotFound => "Ruleset not found",
            Self::InvalidRequestBody => "Invalid request body",
            Self::InvalidRuleset => "Invalid ruleset",
            Self::SpectralError => "Spectral error",
            Self::ServerError => "Server error",
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            Self::RulesetNotFound => StatusCode::NOT_FOUND,
            Self::InvalidRequestBody | Self::InvalidRuleset | Self::SpectralError => {
                StatusCode::BAD_REQUEST
            }
            Self::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error body: `{ code, title, detail, statusCode }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    pub code: ErrorCode,
    pub title: String,
    pub detail: String,
    pub status_code: u16,
}

/// An error that terminates a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub code: ErrorCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }

    /// 400 naming every missing field.
    pub fn missing_fields(fields: &[&str]) -> Self {
        let quoted = fields
            .iter()
            .map(|f| format!("'{}'", f))
            .collect::<Vec<_>>()
            .join(", ");
        Self::new(
            ErrorCode::InvalidRequestBody,
            format!("Missing required field(s): {}", quoted),
        )
    }

    pub fn invalid_request_body(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequestBody, detail)
    }

    pub fn to_response_body(&self) -> ApiErrorResponse {
        ApiErrorResponse {
            code: self.code,
            title: self.code.title().to_string(),
            detail: self.detail.clone(),
            status_code: self.code.status().as_u16(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self.to_response_body())).into_response()
    }
}
