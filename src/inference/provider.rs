use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

/// Failure reported by the external model-hosting provider. `status` is the
/// provider's HTTP status when one was received; transport-level failures
/// carry none.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    pub status: Option<u16>,
    pub message: String,
    pub body: Option<Value>,
}

impl ProviderError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            body: None,
        }
    }

    pub fn http(status: u16, message: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            body,
        }
    }

    /// Provider detail as one string, preferring the raw response body.
    pub fn details_text(&self) -> String {
        match &self.body {
            Some(Value::String(s)) => s.clone(),
            Some(v) => v.to_string(),
            None => self.message.clone(),
        }
    }
}

/// Which call produced the failure; changes the task-mismatch hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorContext {
    ImageClassification,
    PlanGeneration,
}

lazy_static! {
    static ref IMAGE_CLASSIFICATION_RE: Regex = Regex::new(r"(?i)image[-\s]?classification").unwrap();
    static ref INCOMPAT_SIGNAL_RE: Regex =
        Regex::new(r"(?i)\bnot\b|\bunsupported\b|does not support|\btask\b").unwrap();
    static ref TASK_WORD_RE: Regex = Regex::new(r"(?i)\btask\b").unwrap();
    static ref NEGATION_RE: Regex =
        Regex::new(r"(?i)\bnot\b|\bunsupported\b|does not support").unwrap();
}

/// True when the provider's detail text indicates the model does not support
/// the invoked task (as opposed to a transient or auth failure). Requires an
/// explicit "task" mention so that e.g. "model not found" never qualifies.
pub fn is_task_mismatch(details: &str) -> bool {
    TASK_WORD_RE.is_match(details) && NEGATION_RE.is_match(details)
}

/// Classifier-side check for the image path: the original, looser pattern
/// that only has to fire when "image classification" itself is mentioned.
fn is_image_task_incompatibility(details: &str) -> bool {
    IMAGE_CLASSIFICATION_RE.is_match(details) && INCOMPAT_SIGNAL_RE.is_match(details)
}

pub struct ClassifiedError {
    pub http_status: u16,
    pub user_message: String,
}

enum Rule {
    /// Task-incompatibility text; only meaningful for the image path.
    TaskMismatch,
    Status(&'static [u16]),
    /// No status but a provider message: surface it verbatim.
    RawDetails,
}

/// Ordered decision table; first matching row wins. The task-mismatch check
/// deliberately precedes the status rows so a 400-with-task-text error gets
/// the configuration hint rather than a generic message.
const RULES: &[(Rule, &str)] = &[
    (
        Rule::TaskMismatch,
        "The configured model does not support image classification. Set HF_FOOD_MODEL to an image model (e.g., nateraw/food).",
    ),
    (
        Rule::Status(&[401, 403]),
        "The inference provider rejected the request. Check HF_TOKEN and model access (gated models require accepting terms).",
    ),
    (
        Rule::Status(&[404]),
        "Inference model not found. Verify the configured model id is correct.",
    ),
    (
        Rule::Status(&[429]),
        "Inference rate limit reached. Please wait and try again.",
    ),
    (
        Rule::Status(&[503]),
        "Inference provider is unavailable. Try again in a few minutes.",
    ),
    (Rule::RawDetails, ""),
];

const GENERIC_MESSAGE: &str = "Inference request failed. Please try again.";

/// Maps a provider failure onto the HTTP status to return and a user-facing
/// message. Statuses the provider reported pass through; everything else
/// becomes a 500.
pub fn classify(err: &ProviderError, ctx: ErrorContext) -> ClassifiedError {
    let details = err.details_text();
    let http_status = err.status.unwrap_or(500);

    for (rule, message) in RULES {
        match rule {
            Rule::TaskMismatch => {
                if ctx == ErrorContext::ImageClassification && is_image_task_incompatibility(&details)
                {
                    return ClassifiedError {
                        http_status,
                        user_message: (*message).to_string(),
                    };
                }
            }
            Rule::Status(codes) => {
                if err.status.map(|s| codes.contains(&s)).unwrap_or(false) {
                    return ClassifiedError {
                        http_status,
                        user_message: (*message).to_string(),
                    };
                }
            }
            Rule::RawDetails => {
                if err.status.is_none() && !details.is_empty() {
                    return ClassifiedError {
                        http_status: 500,
                        user_message: details,
                    };
                }
            }
        }
    }

    ClassifiedError {
        http_status,
        user_message: GENERIC_MESSAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_statuses_mention_token() {
        for status in [401, 403] {
            let err = ProviderError::http(status, "forbidden", None);
            let c = classify(&err, ErrorContext::PlanGeneration);
            assert_eq!(c.http_status, status);
            assert!(c.user_message.contains("HF_TOKEN"));
        }
    }

    #[test]
    fn rate_limit_passes_status_through() {
        let err = ProviderError::http(429, "too many requests", None);
        let c = classify(&err, ErrorContext::ImageClassification);
        assert_eq!(c.http_status, 429);
        assert!(c.user_message.contains("rate limit"));
    }

    #[test]
    fn unavailable_and_not_found() {
        let c = classify(
            &ProviderError::http(503, "down", None),
            ErrorContext::PlanGeneration,
        );
        assert_eq!(c.http_status, 503);
        assert!(c.user_message.contains("unavailable"));

        let c = classify(
            &ProviderError::http(404, "missing", None),
            ErrorContext::PlanGeneration,
        );
        assert_eq!(c.http_status, 404);
        assert!(c.user_message.contains("not found"));
    }

    #[test]
    fn task_text_beats_status_mapping() {
        // A 400 whose body says the model does not support image
        // classification should get the configuration hint, status preserved.
        let err = ProviderError::http(
            400,
            "bad request",
            Some(serde_json::json!(
                "Model gpt2 does not support task image-classification"
            )),
        );
        let c = classify(&err, ErrorContext::ImageClassification);
        assert_eq!(c.http_status, 400);
        assert!(c.user_message.contains("HF_FOOD_MODEL"));

        // Same text on the generation path is not a mismatch hint.
        let c = classify(&err, ErrorContext::PlanGeneration);
        assert!(!c.user_message.contains("HF_FOOD_MODEL"));
    }

    #[test]
    fn statusless_error_surfaces_raw_message() {
        let err = ProviderError::transport("connection reset by peer");
        let c = classify(&err, ErrorContext::ImageClassification);
        assert_eq!(c.http_status, 500);
        assert_eq!(c.user_message, "connection reset by peer");
    }

    #[test]
    fn mismatch_requires_task_wording() {
        assert!(is_task_mismatch(
            "Model gpt2 is not supported for task conversational"
        ));
        assert!(is_task_mismatch("Unsupported task: text-generation"));
        assert!(!is_task_mismatch("Model not found"));
        assert!(!is_task_mismatch("Rate limit reached"));
    }

    #[test]
    fn unknown_status_falls_back_to_generic() {
        let err = ProviderError::http(418, "teapot", None);
        let c = classify(&err, ErrorContext::PlanGeneration);
        assert_eq!(c.http_status, 418);
        assert_eq!(c.user_message, GENERIC_MESSAGE);
    }
}
