use serde_json::Value;

use super::estimator::NutritionEstimate;
use crate::error::ApiError;
use crate::inference::extract::coerce_number;

pub const LOW_CONFIDENCE_WARNING: &str = "Low confidence prediction.";
pub const UNSCORED_ESTIMATE_WARNING: &str = "Nutrition estimate is not confidence-scored.";

/// Classification and estimate thresholds; constructed from config, never
/// read from the environment here.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceGates {
    pub classification_min: f64,
    pub estimate_min: f64,
}

#[derive(Debug)]
pub struct ClassificationVerdict {
    pub high_confidence: bool,
    pub warning: Option<&'static str>,
}

impl ConfidenceGates {
    /// Below-threshold classifications are annotated, never rejected.
    pub fn gate_classification(&self, score: f64) -> ClassificationVerdict {
        let high_confidence = score >= self.classification_min;
        ClassificationVerdict {
            high_confidence,
            warning: (!high_confidence).then_some(LOW_CONFIDENCE_WARNING),
        }
    }

    /// Model-produced estimates must clear the estimate threshold when they
    /// carry a confidence; an unscored estimate passes as long as it has at
    /// least one usable number, with a soft warning. Failing this gate
    /// rejects the request: an estimate below threshold is unusable, not
    /// merely uncertain.
    pub fn gate_estimate(
        &self,
        estimate: &NutritionEstimate,
        raw: &Value,
    ) -> Result<Option<&'static str>, ApiError> {
        match estimate.confidence {
            Some(confidence) if confidence < self.estimate_min => {
                Err(ApiError::LowConfidenceEstimate {
                    threshold: self.estimate_min,
                    observed: confidence,
                })
            }
            Some(_) => Ok(None),
            None => {
                let has_any_number = ["calories", "protein", "carbs", "fats"]
                    .iter()
                    .any(|field| raw.get(field).and_then(coerce_number).is_some());
                if has_any_number {
                    Ok(Some(UNSCORED_ESTIMATE_WARNING))
                } else {
                    Err(ApiError::LowConfidenceEstimate {
                        threshold: self.estimate_min,
                        observed: 0.0,
                    })
                }
            }
        }
    }
}

/// Space-joins active warnings, or `None` when there are none.
pub fn join_warnings<'a, I>(warnings: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let joined = warnings.into_iter().collect::<Vec<_>>().join(" ");
    (!joined.is_empty()).then_some(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::estimator::estimate;
    use serde_json::json;

    fn gates() -> ConfidenceGates {
        ConfidenceGates {
            classification_min: 0.6,
            estimate_min: 0.4,
        }
    }

    #[test]
    fn classification_below_threshold_warns_without_rejecting() {
        let verdict = gates().gate_classification(0.59);
        assert!(!verdict.high_confidence);
        assert_eq!(verdict.warning, Some(LOW_CONFIDENCE_WARNING));
    }

    #[test]
    fn classification_at_threshold_is_high_confidence() {
        let verdict = gates().gate_classification(0.6);
        assert!(verdict.high_confidence);
        assert!(verdict.warning.is_none());
    }

    #[test]
    fn estimate_below_threshold_is_rejected() {
        let mut est = estimate("pizza");
        est.confidence = Some(0.3);
        let err = gates().gate_estimate(&est, &json!({})).unwrap_err();
        match err {
            ApiError::LowConfidenceEstimate {
                threshold,
                observed,
            } => {
                assert_eq!(threshold, 0.4);
                assert_eq!(observed, 0.3);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn scored_estimate_above_threshold_passes_clean() {
        let mut est = estimate("pizza");
        est.confidence = Some(0.9);
        assert_eq!(gates().gate_estimate(&est, &json!({})).unwrap(), None);
    }

    #[test]
    fn unscored_estimate_passes_with_warning_when_numbers_exist() {
        let est = estimate("pizza");
        let raw = json!({"calories": 285, "protein": 12});
        assert_eq!(
            gates().gate_estimate(&est, &raw).unwrap(),
            Some(UNSCORED_ESTIMATE_WARNING)
        );
    }

    #[test]
    fn unscored_estimate_without_numbers_is_rejected() {
        let est = estimate("pizza");
        let raw = json!({"calories": "unknown", "note": "n/a"});
        assert!(gates().gate_estimate(&est, &raw).is_err());
    }

    #[test]
    fn warnings_join_space_separated_or_none() {
        assert_eq!(join_warnings(Vec::<&str>::new()), None);
        assert_eq!(
            join_warnings([LOW_CONFIDENCE_WARNING]),
            Some(LOW_CONFIDENCE_WARNING.to_string())
        );
        assert_eq!(
            join_warnings([LOW_CONFIDENCE_WARNING, UNSCORED_ESTIMATE_WARNING]),
            Some(format!(
                "{LOW_CONFIDENCE_WARNING} {UNSCORED_ESTIMATE_WARNING}"
            ))
        );
    }
}
