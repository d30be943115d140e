use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::error;

use crate::inference::extract::ExtractError;
use crate::inference::provider::{classify, ErrorContext, ProviderError};

/// Request-scoped failure taxonomy. Every variant maps onto one response
/// envelope `{error, message?, status?, details?, debug?}`; nothing here
/// carries state across requests.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing/invalid input or configuration; never fatal.
    #[error("{error}")]
    Validation {
        error: String,
        message: Option<String>,
        details: Option<Value>,
    },

    /// Classifier returned no candidates at all.
    #[error("no food detected")]
    NoDetection,

    /// Structured estimate below the acceptance threshold; unusable, not
    /// merely uncertain.
    #[error("estimate confidence {observed} below threshold {threshold}")]
    LowConfidenceEstimate { threshold: f64, observed: f64 },

    /// External provider failure, already classified for the caller.
    #[error("{message}")]
    Provider {
        headline: &'static str,
        message: String,
        http_status: u16,
        provider_status: u16,
        details: String,
        debug: Option<Value>,
    },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(error: impl Into<String>) -> Self {
        ApiError::Validation {
            error: error.into(),
            message: None,
            details: None,
        }
    }

    pub fn validation_with_message(error: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            error: error.into(),
            message: Some(message.into()),
            details: None,
        }
    }

    pub fn validation_with_details(error: impl Into<String>, details: Value) -> Self {
        ApiError::Validation {
            error: error.into(),
            message: None,
            details: Some(details),
        }
    }

    /// Wraps a provider failure, running the status/pattern decision table.
    /// The raw provider payload is attached as a debug block outside
    /// production.
    pub fn provider(
        headline: &'static str,
        err: ProviderError,
        ctx: ErrorContext,
        model: &str,
        requested_model: Option<&str>,
        production: bool,
    ) -> Self {
        let classified = classify(&err, ctx);
        let debug = (!production).then(|| {
            json!({
                "providerStatus": err.status.unwrap_or(classified.http_status),
                "providerResponse": err.body,
                "model": model,
                "requestedModel": requested_model,
            })
        });
        ApiError::Provider {
            headline,
            message: classified.user_message,
            http_status: classified.http_status,
            provider_status: err.status.unwrap_or(classified.http_status),
            details: err.details_text(),
            debug,
        }
    }

    /// The provider call succeeded but the reply broke the "valid JSON"
    /// contract; surfaced as a provider failure with a generic message.
    pub fn malformed_output(
        headline: &'static str,
        err: ExtractError,
        model: &str,
        production: bool,
    ) -> Self {
        let debug = (!production).then(|| {
            json!({
                "parseError": err.to_string(),
                "model": model,
            })
        });
        ApiError::Provider {
            headline,
            message: "The model returned an unreadable response. Please try again.".into(),
            http_status: 500,
            provider_status: 500,
            details: err.to_string(),
            debug,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation {
                error: headline,
                message,
                details,
            } => {
                let mut body = json!({ "error": headline });
                if let Some(m) = message {
                    body["message"] = Value::String(m);
                }
                if let Some(Value::Object(map)) = details {
                    for (k, v) in map {
                        body[k] = v;
                    }
                }
                (StatusCode::BAD_REQUEST, body)
            }
            ApiError::NoDetection => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": "No food detected",
                    "message": "No food detected in the image. Please try another image.",
                }),
            ),
            ApiError::LowConfidenceEstimate {
                threshold,
                observed,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": "Low confidence nutrition estimate",
                    "message": format!(
                        "Nutrition estimate confidence {observed:.2} is below the required {threshold:.2}."
                    ),
                    "threshold": threshold,
                    "observed": observed,
                }),
            ),
            ApiError::Provider {
                headline,
                message,
                http_status,
                provider_status,
                details,
                debug,
            } => {
                let mut body = json!({
                    "error": headline,
                    "message": message,
                    "status": provider_status,
                    "details": details,
                });
                if let Some(d) = debug {
                    body["debug"] = d;
                }
                (
                    StatusCode::from_u16(http_status)
                        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                    body,
                )
            }
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("{what} not found") }),
            ),
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": e.to_string() }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
