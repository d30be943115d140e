use serde::Serialize;
use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::{DietPlanInput, WorkoutPlanInput};

/// Generated workout plan plus the request metadata it was built from. The
/// pipeline only produces the `plan` payload; everything else is ours.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutPlanRecord {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub goal: String,
    pub experience_level: String,
    pub days_per_week: i32,
    pub equipment: String,
    pub time_per_session: Option<i32>,
    pub target_muscle_groups: Vec<String>,
    pub injuries: String,
    pub model: Option<String>,
    pub title: String,
    pub favorite: bool,
    pub plan: Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Parsed list-endpoint query: filters, sort and safe pagination.
#[derive(Debug, Default)]
pub struct PlanQuery {
    pub goal: Option<String>,
    pub muscle_groups: Vec<String>,
    pub favorite_only: bool,
    pub search: Option<String>,
    pub favorites_first: bool,
    pub page: i64,
    pub limit: i64,
}

impl PlanQuery {
    /// Clamps page/limit to sane bounds (page ≥ 1, limit 1..=100, default 20).
    pub fn sanitize(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let limit = limit.filter(|l| *l > 0 && *l <= 100).unwrap_or(20);
        (page, limit)
    }
}

const COLUMNS: &str = "id, user_id, goal, experience_level, days_per_week, equipment, \
     time_per_session, target_muscle_groups, injuries, model, title, favorite, plan, \
     created_at, updated_at";

pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    input: &WorkoutPlanInput,
    model: &str,
    title: &str,
    plan: &Value,
) -> anyhow::Result<WorkoutPlanRecord> {
    let record = sqlx::query_as::<_, WorkoutPlanRecord>(&format!(
        r#"
        INSERT INTO workout_plans
            (user_id, goal, experience_level, days_per_week, equipment,
             time_per_session, target_muscle_groups, injuries, model, title, plan)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(&input.goal)
    .bind(&input.experience_level)
    .bind(input.days_per_week)
    .bind(&input.equipment)
    .bind(input.time_per_session.map(|t| t as i32))
    .bind(&input.target_muscle_groups)
    .bind(&input.injuries)
    .bind(model)
    .bind(title)
    .bind(plan)
    .fetch_one(db)
    .await?;
    Ok(record)
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, user_id: Uuid, query: &'a PlanQuery) {
    qb.push(" WHERE user_id = ").push_bind(user_id);
    if let Some(goal) = &query.goal {
        qb.push(" AND goal = ").push_bind(goal);
    }
    if !query.muscle_groups.is_empty() {
        qb.push(" AND target_muscle_groups @> ")
            .push_bind(&query.muscle_groups);
    }
    if query.favorite_only {
        qb.push(" AND favorite = TRUE");
    }
    if let Some(search) = &query.search {
        qb.push(" AND title ILIKE ")
            .push_bind(format!("%{}%", search));
    }
}

pub async fn list(
    db: &PgPool,
    user_id: Uuid,
    query: &PlanQuery,
) -> anyhow::Result<(Vec<WorkoutPlanRecord>, i64)> {
    let mut count_qb: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM workout_plans");
    push_filters(&mut count_qb, user_id, query);
    let total: i64 = count_qb.build_query_scalar().fetch_one(db).await?;

    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {COLUMNS} FROM workout_plans"));
    push_filters(&mut qb, user_id, query);
    if query.favorites_first {
        qb.push(" ORDER BY favorite DESC, created_at DESC");
    } else {
        qb.push(" ORDER BY created_at DESC");
    }
    qb.push(" LIMIT ").push_bind(query.limit);
    qb.push(" OFFSET ").push_bind((query.page - 1) * query.limit);

    let plans = qb
        .build_query_as::<WorkoutPlanRecord>()
        .fetch_all(db)
        .await?;
    Ok((plans, total))
}

pub async fn rename(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    title: &str,
) -> anyhow::Result<Option<WorkoutPlanRecord>> {
    let record = sqlx::query_as::<_, WorkoutPlanRecord>(&format!(
        r#"
        UPDATE workout_plans
        SET title = $3, updated_at = now()
        WHERE id = $1 AND user_id = $2
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(user_id)
    .bind(title)
    .fetch_optional(db)
    .await?;
    Ok(record)
}

/// Sets the favorite flag, or toggles it when no explicit value is given.
pub async fn set_favorite(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    favorite: Option<bool>,
) -> anyhow::Result<Option<WorkoutPlanRecord>> {
    let record = sqlx::query_as::<_, WorkoutPlanRecord>(&format!(
        r#"
        UPDATE workout_plans
        SET favorite = COALESCE($3, NOT favorite), updated_at = now()
        WHERE id = $1 AND user_id = $2
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(user_id)
    .bind(favorite)
    .fetch_optional(db)
    .await?;
    Ok(record)
}

pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM workout_plans WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub id: Uuid,
    pub weight: f64,
    pub height: f64,
    pub age: i32,
    pub gender: String,
    pub activity_level: String,
    pub goal: String,
    pub target_calories: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub async fn save_profile(
    db: &PgPool,
    input: &DietPlanInput,
    target_calories: i32,
) -> anyhow::Result<ProfileRecord> {
    let record = sqlx::query_as::<_, ProfileRecord>(
        r#"
        INSERT INTO user_profiles
            (weight, height, age, gender, activity_level, goal, target_calories)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, weight, height, age, gender, activity_level, goal,
                  target_calories, created_at
        "#,
    )
    .bind(input.weight)
    .bind(input.height)
    .bind(input.age as i32)
    .bind(&input.gender)
    .bind(&input.activity_level)
    .bind(&input.goal)
    .bind(target_calories)
    .fetch_one(db)
    .await?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_clamped() {
        assert_eq!(PlanQuery::sanitize(None, None), (1, 20));
        assert_eq!(PlanQuery::sanitize(Some(0), Some(0)), (1, 20));
        assert_eq!(PlanQuery::sanitize(Some(-3), Some(500)), (1, 20));
        assert_eq!(PlanQuery::sanitize(Some(2), Some(50)), (2, 50));
        assert_eq!(PlanQuery::sanitize(Some(1), Some(100)), (1, 100));
    }
}
