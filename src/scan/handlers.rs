use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use tracing::{info, instrument, warn};

use crate::{
    auth::extractors::AuthUser,
    config::NutritionStrategy,
    error::ApiError,
    inference::{
        extract::parse_structured,
        provider::ErrorContext,
        task::{generate_with_fallback, select_task},
    },
    state::AppState,
};

use super::{
    ai_estimate::{estimate_from_value, nutrition_prompt},
    dto::ScanResponse,
    estimator,
    gate::{join_warnings, ConfidenceGates},
    label::to_display,
    upload::TempUpload,
};

pub fn scan_routes() -> Router<AppState> {
    Router::new()
        .route("/scan", post(scan_food))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
}

#[derive(Debug)]
struct ScanInput {
    image: Bytes,
    content_type: String,
    requested_model: Option<String>,
}

async fn read_multipart(mp: &mut Multipart) -> Result<ScanInput, ApiError> {
    let mut image = None;
    let mut content_type = "image/jpeg".to_string();
    let mut requested_model = None;

    loop {
        let field = match mp.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            // Truncated or malformed bodies are the client's fault, not a
            // missing field.
            Err(e) => {
                return Err(ApiError::validation_with_message(
                    "Invalid upload",
                    e.to_string(),
                ))
            }
        };
        match field.name() {
            Some("image") => {
                if let Some(ct) = field.content_type() {
                    content_type = ct.to_string();
                }
                image = Some(field.bytes().await.map_err(|e| {
                    ApiError::validation_with_message("Invalid upload", e.to_string())
                })?);
            }
            Some("model") => {
                let value = field.text().await.unwrap_or_default();
                if !value.trim().is_empty() {
                    requested_model = Some(value.trim().to_string());
                }
            }
            _ => {}
        }
    }

    let image = image.ok_or_else(|| {
        ApiError::validation_with_message(
            "No image uploaded",
            "Please upload an image file using the 'image' field.",
        )
    })?;
    Ok(ScanInput {
        image,
        content_type,
        requested_model,
    })
}

/// POST /scan: classify a food photo and return a nutrition estimate.
#[instrument(skip(state, mp), fields(user_id = %user_id))]
pub async fn scan_food(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<Json<ScanResponse>, ApiError> {
    let input = read_multipart(&mut mp).await?;

    if state.config.inference.token.is_none() {
        return Err(ApiError::validation_with_message(
            "Inference token not configured",
            "Please set HF_TOKEN in the environment.",
        ));
    }

    let requested_model = input.requested_model.clone();
    let model = input
        .requested_model
        .unwrap_or_else(|| state.config.inference.food_model.clone());

    // Held for the whole request; removed on every exit path.
    let _spool = match &state.config.scan.spool_dir {
        Some(dir) => Some(TempUpload::spool(dir, &input.image)?),
        None => None,
    };

    let production = state.config.production;
    let predictions = state
        .inference
        .classify_image(&model, input.image.clone(), &input.content_type)
        .await
        .map_err(|e| {
            ApiError::provider(
                "Failed to scan food image",
                e,
                ErrorContext::ImageClassification,
                &model,
                requested_model.as_deref(),
                production,
            )
        })?;

    let top = match predictions.first().filter(|p| !p.label.is_empty()) {
        Some(top) => top,
        None => {
            warn!(%model, "classifier returned no candidates");
            return Err(ApiError::NoDetection);
        }
    };

    let gates = ConfidenceGates {
        classification_min: state.config.scan.food_confidence_min,
        estimate_min: state.config.scan.nutrition_confidence_min,
    };
    let verdict = gates.gate_classification(top.score);
    let mut warnings = Vec::new();
    if let Some(w) = verdict.warning {
        warnings.push(w);
    }

    let nutrition = match state.config.scan.strategy {
        NutritionStrategy::Heuristic => estimator::estimate(&top.label),
        NutritionStrategy::Model => {
            let nutrition_model = state
                .config
                .inference
                .nutrition_model
                .clone()
                .ok_or_else(|| {
                    ApiError::validation_with_message(
                        "Nutrition model not configured",
                        "Set HF_NUTRITION_MODEL or HF_MODEL, or use the heuristic strategy.",
                    )
                })?;
            let task = select_task(&nutrition_model, state.config.inference.task_override);
            let req = nutrition_prompt(&top.label);
            let text = generate_with_fallback(
                state.inference.as_ref(),
                &nutrition_model,
                task,
                &req,
            )
            .await
            .map_err(|e| {
                ApiError::provider(
                    "Failed to scan food image",
                    e,
                    ErrorContext::PlanGeneration,
                    &nutrition_model,
                    None,
                    production,
                )
            })?;
            let value = parse_structured(&text).map_err(|e| {
                ApiError::malformed_output(
                    "Failed to scan food image",
                    e,
                    &nutrition_model,
                    production,
                )
            })?;
            let est = estimate_from_value(&value);
            if let Some(w) = gates.gate_estimate(&est, &value)? {
                warnings.push(w);
            }
            est
        }
    };

    info!(
        label = %top.label,
        score = top.score,
        high_confidence = verdict.high_confidence,
        "food scan complete"
    );

    Ok(Json(ScanResponse {
        food: to_display(&top.label),
        calories: nutrition.calories,
        protein: nutrition.protein_g,
        carbs: nutrition.carbs_g,
        fats: nutrition.fats_g,
        serving: nutrition.serving,
        calorie_note: nutrition.note,
        model,
        high_confidence: verdict.high_confidence,
        confidence: top.score,
        warning: join_warnings(warnings),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::Request;

    async fn multipart(body: &str) -> Multipart {
        let request = Request::builder()
            .header(
                "content-type",
                "multipart/form-data; boundary=XBOUNDARY",
            )
            .body(Body::from(body.to_string()))
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    #[tokio::test]
    async fn reads_image_and_model_fields() {
        let body = "--XBOUNDARY\r\n\
            Content-Disposition: form-data; name=\"image\"; filename=\"meal.jpg\"\r\n\
            Content-Type: image/png\r\n\r\n\
            fakeimagebytes\r\n\
            --XBOUNDARY\r\n\
            Content-Disposition: form-data; name=\"model\"\r\n\r\n\
            custom/model\r\n\
            --XBOUNDARY--\r\n";
        let mut mp = multipart(body).await;
        let input = read_multipart(&mut mp).await.unwrap();
        assert_eq!(input.image.as_ref(), &b"fakeimagebytes"[..]);
        assert_eq!(input.content_type, "image/png");
        assert_eq!(input.requested_model.as_deref(), Some("custom/model"));
    }

    #[tokio::test]
    async fn missing_image_field_is_rejected() {
        let body = "--XBOUNDARY\r\n\
            Content-Disposition: form-data; name=\"model\"\r\n\r\n\
            custom/model\r\n\
            --XBOUNDARY--\r\n";
        let mut mp = multipart(body).await;
        let err = read_multipart(&mut mp).await.unwrap_err();
        match err {
            ApiError::Validation { error, .. } => assert_eq!(error, "No image uploaded"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn stream_error_is_reported_as_invalid_upload() {
        // Garbage where part headers belong makes the stream fail, which must
        // not masquerade as a missing image field.
        let body = "--XBOUNDARY\r\n\
            this is not a part header\r\n\r\n\
            data\r\n\
            --XBOUNDARY--\r\n";
        let mut mp = multipart(body).await;
        let err = read_multipart(&mut mp).await.unwrap_err();
        match err {
            ApiError::Validation { error, .. } => assert_eq!(error, "Invalid upload"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
