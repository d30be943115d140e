use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{patch, post},
    Json, Router,
};
use rand::Rng;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::{auth::extractors::AuthUser, error::ApiError, state::AppState};

use super::repo::{self, WorkoutRecord};

pub fn workout_routes() -> Router<AppState> {
    Router::new()
        .route("/workouts", post(save_workout).get(get_workouts))
        .route("/workouts/session", post(start_session))
        .route("/workouts/session/:session_id", patch(update_session))
        .route(
            "/workouts/session/:session_id/complete",
            post(complete_session),
        )
}

/// Short opaque id for live session rows, base36 timestamp plus a random
/// suffix.
fn new_session_id() -> String {
    let millis = time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let mut n = millis as u128;
    let mut stamp = String::new();
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    while n > 0 {
        stamp.insert(0, DIGITS[(n % 36) as usize] as char);
        n /= 36;
    }
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6).map(|_| DIGITS[rng.gen_range(0..36)] as char).collect();
    format!("{stamp}{suffix}")
}

#[derive(Debug, Deserialize)]
pub struct SaveWorkoutRequest {
    pub exercise: Option<String>,
    pub reps: Option<i32>,
    pub duration: Option<i32>,
}

#[instrument(skip(state, payload), fields(user_id = %user_id))]
pub async fn save_workout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<SaveWorkoutRequest>,
) -> Result<(StatusCode, Json<WorkoutRecord>), ApiError> {
    let exercise = payload
        .exercise
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::validation("Exercise is required"))?;

    let record = repo::create(
        &state.db,
        user_id,
        exercise,
        payload.reps.unwrap_or(0),
        payload.duration.unwrap_or(0),
        None,
        "completed",
    )
    .await
    .map_err(ApiError::Internal)?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[instrument(skip(state), fields(user_id = %user_id))]
pub async fn get_workouts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<WorkoutRecord>>, ApiError> {
    let records = repo::list(&state.db, user_id)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(records))
}

#[instrument(skip(state, payload), fields(user_id = %user_id))]
pub async fn start_session(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<SaveWorkoutRequest>,
) -> Result<(StatusCode, Json<WorkoutRecord>), ApiError> {
    let exercise = payload
        .exercise
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::validation("Exercise is required"))?;

    let session_id = new_session_id();
    let record = repo::create(
        &state.db,
        user_id,
        exercise,
        0,
        0,
        Some(&session_id),
        "active",
    )
    .await
    .map_err(ApiError::Internal)?;

    info!(session_id, "workout session started");
    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Debug, Deserialize)]
pub struct SessionUpdateRequest {
    pub reps: Option<i32>,
    pub duration: Option<i32>,
}

#[instrument(skip(state, payload), fields(user_id = %user_id))]
pub async fn update_session(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(session_id): Path<String>,
    Json(payload): Json<SessionUpdateRequest>,
) -> Result<Json<WorkoutRecord>, ApiError> {
    let record = repo::update_session(&state.db, user_id, &session_id, payload.reps, payload.duration)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("Session"))?;
    Ok(Json(record))
}

#[instrument(skip(state, payload), fields(user_id = %user_id))]
pub async fn complete_session(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(session_id): Path<String>,
    Json(payload): Json<SessionUpdateRequest>,
) -> Result<Json<WorkoutRecord>, ApiError> {
    let record =
        repo::complete_session(&state.db, user_id, &session_id, payload.reps, payload.duration)
            .await
            .map_err(ApiError::Internal)?
            .ok_or(ApiError::NotFound("Session"))?;

    info!(session_id, "workout session completed");
    Ok(Json(record))
}
