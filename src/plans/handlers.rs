use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    inference::{
        extract::{parse_structured, ExtractError},
        provider::ErrorContext,
        task::{generate_with_fallback, select_task},
    },
    state::AppState,
};

use super::{
    dto::{DietPlanRequest, WorkoutPlanRequest},
    prompt::{
        calculate_calories, diet_plan_prompt, has_expected_field, workout_plan_prompt,
        DIET_PLAN_FIELDS, WORKOUT_PLAN_FIELDS,
    },
    repo::{self, PlanQuery},
};

pub fn nutrition_routes() -> Router<AppState> {
    Router::new()
        .route("/nutrition/profile", post(create_profile))
        .route("/nutrition/generate-plan", post(generate_diet_plan))
}

pub fn plan_routes() -> Router<AppState> {
    Router::new()
        .route("/workouts/ai-plan", post(generate_workout_plan))
        .route("/workouts/ai-plans", get(list_plans))
        .route("/workouts/ai-plans/:id", patch(rename_plan))
        .route("/workouts/ai-plans/:id", delete(delete_plan))
        .route("/workouts/ai-plans/:id/favorite", patch(favorite_plan))
}

/// Resolves the generation model: request override first, then config.
fn resolve_plan_model(state: &AppState, requested: Option<&str>) -> Result<String, ApiError> {
    if state.config.inference.token.is_none() {
        return Err(ApiError::validation_with_message(
            "Inference token not configured",
            "Please set HF_TOKEN in the environment.",
        ));
    }
    requested
        .map(str::to_string)
        .or_else(|| state.config.inference.plan_model.clone())
        .ok_or_else(|| {
            ApiError::validation_with_message(
                "Inference model not configured",
                "Please set HF_MODEL in the environment or pass model in the request body.",
            )
        })
}

/// Invoke → extract/repair → expected-field check. Shared by both plan
/// generators.
async fn generate_plan_json(
    state: &AppState,
    model: &str,
    requested_model: Option<&str>,
    req: crate::inference::client::GenerationRequest,
    headline: &'static str,
    expected_fields: &[&str],
) -> Result<Value, ApiError> {
    let production = state.config.production;
    let task = select_task(model, state.config.inference.task_override);
    let text = generate_with_fallback(state.inference.as_ref(), model, task, &req)
        .await
        .map_err(|e| {
            ApiError::provider(
                headline,
                e,
                ErrorContext::PlanGeneration,
                model,
                requested_model,
                production,
            )
        })?;

    let parsed = parse_structured(&text)
        .map_err(|e| ApiError::malformed_output(headline, e, model, production))?;
    if !has_expected_field(&parsed, expected_fields) {
        return Err(ApiError::malformed_output(
            headline,
            ExtractError::NoJson,
            model,
            production,
        ));
    }
    Ok(parsed)
}

#[instrument(skip(state, payload))]
pub async fn create_profile(
    State(state): State<AppState>,
    Json(payload): Json<DietPlanRequest>,
) -> Result<Json<repo::ProfileRecord>, ApiError> {
    let input = payload.validate()?;
    let target_calories = calculate_calories(&input);
    let profile = repo::save_profile(&state.db, &input, target_calories)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(profile))
}

#[instrument(skip(state, payload))]
pub async fn generate_diet_plan(
    State(state): State<AppState>,
    Json(payload): Json<DietPlanRequest>,
) -> Result<Json<Value>, ApiError> {
    let input = payload.validate()?;
    let model = resolve_plan_model(&state, payload.model.as_deref())?;
    let target_calories = calculate_calories(&input);
    info!(goal = %input.goal, target_calories, "generating diet plan");

    let plan = generate_plan_json(
        &state,
        &model,
        payload.model.as_deref(),
        diet_plan_prompt(&input, target_calories),
        "Failed to generate diet plan",
        DIET_PLAN_FIELDS,
    )
    .await?;

    info!("diet plan parsed");
    Ok(Json(plan))
}

#[instrument(skip(state, payload), fields(user_id = %user_id))]
pub async fn generate_workout_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<WorkoutPlanRequest>,
) -> Result<Json<Value>, ApiError> {
    let input = payload.validate()?;
    let model = resolve_plan_model(&state, payload.model.as_deref())?;
    info!(goal = %input.goal, days = input.days_per_week, "generating workout plan");

    let mut plan = generate_plan_json(
        &state,
        &model,
        payload.model.as_deref(),
        workout_plan_prompt(&input),
        "Failed to generate workout plan",
        WORKOUT_PLAN_FIELDS,
    )
    .await?;

    let title = input
        .title
        .clone()
        .unwrap_or_else(|| format!("{} • {} day plan", input.goal, input.days_per_week));
    let saved = repo::create(&state.db, user_id, &input, &model, &title, &plan)
        .await
        .map_err(ApiError::Internal)?;

    info!(plan_id = %saved.id, "workout plan saved");
    if let Some(map) = plan.as_object_mut() {
        map.insert("savedPlanId".into(), json!(saved.id));
        map.insert(
            "savedAt".into(),
            json!(saved
                .created_at
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_default()),
        );
    }
    Ok(Json(plan))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPlansParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub goal: Option<String>,
    pub muscle_group: Option<String>,
    pub favorite: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

#[instrument(skip(state), fields(user_id = %user_id))]
pub async fn list_plans(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<ListPlansParams>,
) -> Result<Json<Value>, ApiError> {
    let (page, limit) = PlanQuery::sanitize(params.page, params.limit);
    let query = PlanQuery {
        goal: params.goal.map(|g| g.to_lowercase()),
        muscle_groups: params
            .muscle_group
            .map(|raw| {
                raw.to_lowercase()
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        favorite_only: params.favorite.as_deref() == Some("true"),
        search: params.search.filter(|s| !s.trim().is_empty()),
        favorites_first: params.sort.as_deref() == Some("favorites"),
        page,
        limit,
    };

    let (plans, total) = repo::list(&state.db, user_id, &query)
        .await
        .map_err(ApiError::Internal)?;
    let total_pages = ((total + limit - 1) / limit).max(1);

    Ok(Json(json!({
        "data": plans,
        "page": page,
        "limit": limit,
        "total": total,
        "totalPages": total_pages,
    })))
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub title: Option<String>,
}

#[instrument(skip(state, payload), fields(user_id = %user_id))]
pub async fn rename_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RenameRequest>,
) -> Result<Json<repo::WorkoutPlanRecord>, ApiError> {
    let title = payload
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::validation("Title is required"))?;

    let record = repo::rename(&state.db, user_id, id, title)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("Plan"))?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    pub favorite: Option<bool>,
}

#[instrument(skip(state, payload), fields(user_id = %user_id))]
pub async fn favorite_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<FavoriteRequest>,
) -> Result<Json<repo::WorkoutPlanRecord>, ApiError> {
    let record = repo::set_favorite(&state.db, user_id, id, payload.favorite)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("Plan"))?;
    Ok(Json(record))
}

#[instrument(skip(state), fields(user_id = %user_id))]
pub async fn delete_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let deleted = repo::delete(&state.db, user_id, id)
        .await
        .map_err(ApiError::Internal)?;
    if !deleted {
        return Err(ApiError::NotFound("Plan"));
    }
    Ok(Json(json!({ "success": true })))
}
