//! POST /validate

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::problem::ValidationProblem;

use super::router::AppState;

/// Request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub document: String,
    pub ruleset: String,
}

/// Success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub items: Vec<ValidationProblem>,
}

/// POST /validate
pub async fn validate(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ValidationResponse>, ApiError> {
    // Oversized or unreadable bodies still get the error envelope.
    let body = body.map_err(|rejection| ApiError::invalid_request_body(rejection.body_text()))?;
    let request = parse_request(&body)?;
    let items = state
        .service
        .validate(request.document, &request.ruleset)
        .await?;
    Ok(Json(ValidationResponse { items }))
}

/// Check the body shape, reporting every missing field at once.
fn parse_request(body: &[u8]) -> Result<ValidationRequest, ApiError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        ApiError::invalid_request_body(format!("Request body is not valid JSON: {}", e))
    })?;
    let Value::Object(mut fields) = value else {
        return Err(ApiError::invalid_request_body(
            "Request body must be a JSON object",
        ));
    };

    let document = take_string(&mut fields, "document")?;
    let ruleset = take_string(&mut fields, "ruleset")?;
    match (document, ruleset) {
        (Some(document), Some(ruleset)) => Ok(ValidationRequest { document, ruleset }),
        (document, ruleset) => {
            let mut missing = Vec::new();
            if document.is_none() {
                missing.push("document");
            }
            if ruleset.is_none() {
                missing.push("ruleset");
            }
            Err(ApiError::missing_fields(&missing))
        }
    }
}

/// `None` when the field is absent or null.
fn take_string(fields: &mut Map<String, Value>, name: &str) -> Result<Option<String>, ApiError> {
    match fields.remove(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(ApiError::invalid_request_body(format!(
            "Field '{}' must be a string",
            name
        ))),
    }
}
