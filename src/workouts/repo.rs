use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutRecord {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub exercise: String,
    pub reps: i32,
    pub duration: i32,
    pub session_id: Option<String>,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

const COLUMNS: &str = "id, user_id, exercise, reps, duration, session_id, status, created_at";

pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    exercise: &str,
    reps: i32,
    duration: i32,
    session_id: Option<&str>,
    status: &str,
) -> anyhow::Result<WorkoutRecord> {
    let record = sqlx::query_as::<_, WorkoutRecord>(&format!(
        r#"
        INSERT INTO workouts (user_id, exercise, reps, duration, session_id, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(exercise)
    .bind(reps)
    .bind(duration)
    .bind(session_id)
    .bind(status)
    .fetch_one(db)
    .await?;
    Ok(record)
}

pub async fn list(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<WorkoutRecord>> {
    let records = sqlx::query_as::<_, WorkoutRecord>(&format!(
        "SELECT {COLUMNS} FROM workouts WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(records)
}

/// Updates the live counters on an active session row. `None` fields are left
/// untouched.
pub async fn update_session(
    db: &PgPool,
    user_id: Uuid,
    session_id: &str,
    reps: Option<i32>,
    duration: Option<i32>,
) -> anyhow::Result<Option<WorkoutRecord>> {
    let record = sqlx::query_as::<_, WorkoutRecord>(&format!(
        r#"
        UPDATE workouts
        SET reps = COALESCE($3, reps), duration = COALESCE($4, duration)
        WHERE session_id = $1 AND user_id = $2
        RETURNING {COLUMNS}
        "#
    ))
    .bind(session_id)
    .bind(user_id)
    .bind(reps)
    .bind(duration)
    .fetch_optional(db)
    .await?;
    Ok(record)
}

pub async fn complete_session(
    db: &PgPool,
    user_id: Uuid,
    session_id: &str,
    reps: Option<i32>,
    duration: Option<i32>,
) -> anyhow::Result<Option<WorkoutRecord>> {
    let record = sqlx::query_as::<_, WorkoutRecord>(&format!(
        r#"
        UPDATE workouts
        SET status = 'completed',
            reps = COALESCE($3, reps),
            duration = COALESCE($4, duration)
        WHERE session_id = $1 AND user_id = $2
        RETURNING {COLUMNS}
        "#
    ))
    .bind(session_id)
    .bind(user_id)
    .bind(reps)
    .bind(duration)
    .fetch_optional(db)
    .await?;
    Ok(record)
}
