use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;

pub const ALLOWED_GOALS: &[&str] = &[
    "fat loss",
    "muscle gain",
    "strength",
    "general fitness",
    "endurance",
    "maintenance",
];

pub const GOAL_ALIASES: &[(&str, &str)] = &[
    ("cut", "fat loss"),
    ("bulk", "muscle gain"),
    ("maintain", "maintenance"),
];

pub const ALLOWED_EXPERIENCE: &[&str] = &["beginner", "intermediate", "advanced"];

pub const ALLOWED_EQUIPMENT: &[&str] = &[
    "full gym",
    "home",
    "bodyweight",
    "dumbbells",
    "bands",
    "kettlebell",
    "barbell",
    "machines",
];

pub const ALLOWED_MUSCLE_GROUPS: &[&str] = &[
    "full body",
    "chest",
    "back",
    "legs",
    "glutes",
    "shoulders",
    "arms",
    "biceps",
    "triceps",
    "core",
    "calves",
];

pub const ALLOWED_ACTIVITY: &[(&str, f64)] = &[
    ("sedentary", 1.2),
    ("light", 1.375),
    ("moderate", 1.55),
    ("active", 1.725),
    ("very_active", 1.9),
];

pub const DIET_GOALS: &[&str] = &["cut", "bulk", "maintain"];

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DietPlanRequest {
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub activity_level: Option<String>,
    pub goal: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
}

/// Validated diet-plan inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct DietPlanInput {
    pub weight: f64,
    pub height: f64,
    pub age: u32,
    pub gender: String,
    pub activity_level: String,
    pub activity_factor: f64,
    pub goal: String,
}

impl DietPlanRequest {
    pub fn validate(&self) -> Result<DietPlanInput, ApiError> {
        let (weight, height, age, gender, activity, goal) = match (
            self.weight,
            self.height,
            self.age,
            self.gender.as_deref(),
            self.activity_level.as_deref(),
            self.goal.as_deref(),
        ) {
            (Some(w), Some(h), Some(a), Some(g), Some(act), Some(goal)) => {
                (w, h, a, g, act, goal)
            }
            _ => return Err(ApiError::validation("Missing required fields")),
        };

        check_provider(self.provider.as_deref())?;

        let gender = normalize(gender);
        if gender != "male" && gender != "female" {
            return Err(ApiError::validation_with_details(
                "Invalid gender",
                json!({ "allowed": ["male", "female"] }),
            ));
        }

        let activity_level = normalize(activity);
        let activity_factor = ALLOWED_ACTIVITY
            .iter()
            .find(|(name, _)| *name == activity_level)
            .map(|(_, factor)| *factor)
            .ok_or_else(|| {
                ApiError::validation_with_details(
                    "Invalid activityLevel",
                    json!({ "allowed": ALLOWED_ACTIVITY.iter().map(|(n, _)| *n).collect::<Vec<_>>() }),
                )
            })?;

        let goal = normalize(goal);
        if !DIET_GOALS.contains(&goal.as_str()) {
            return Err(ApiError::validation_with_details(
                "Invalid goal",
                json!({ "allowed": DIET_GOALS }),
            ));
        }

        Ok(DietPlanInput {
            weight,
            height,
            age,
            gender,
            activity_level,
            activity_factor,
            goal,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutPlanRequest {
    pub goal: Option<String>,
    pub experience_level: Option<String>,
    pub days_per_week: Option<serde_json::Value>,
    pub equipment: Option<String>,
    pub time_per_session: Option<u32>,
    pub target_muscle_groups: Option<serde_json::Value>,
    pub injuries: Option<String>,
    pub title: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutPlanInput {
    pub goal: String,
    pub experience_level: String,
    pub days_per_week: i32,
    pub equipment: String,
    pub time_per_session: Option<u32>,
    pub target_muscle_groups: Vec<String>,
    pub injuries: String,
    pub title: Option<String>,
}

fn check_provider(provider: Option<&str>) -> Result<(), ApiError> {
    match provider {
        Some(p) if p != "huggingface" => Err(ApiError::validation_with_details(
            "Unsupported provider",
            json!({ "details": p }),
        )),
        _ => Ok(()),
    }
}

impl WorkoutPlanRequest {
    pub fn validate(&self) -> Result<WorkoutPlanInput, ApiError> {
        let (goal, experience, equipment, days_raw) = match (
            self.goal.as_deref(),
            self.experience_level.as_deref(),
            self.equipment.as_deref(),
            self.days_per_week.as_ref(),
        ) {
            (Some(g), Some(x), Some(e), Some(d)) => (g, x, e, d),
            _ => {
                return Err(ApiError::validation_with_details(
                    "Missing required fields",
                    json!({ "required": ["goal", "experienceLevel", "daysPerWeek", "equipment"] }),
                ))
            }
        };

        check_provider(self.provider.as_deref())?;

        let goal = normalize(goal);
        let goal = GOAL_ALIASES
            .iter()
            .find(|(alias, _)| *alias == goal)
            .map(|(_, canonical)| canonical.to_string())
            .unwrap_or(goal);
        if !ALLOWED_GOALS.contains(&goal.as_str()) {
            return Err(ApiError::validation_with_details(
                "Invalid goal",
                json!({ "allowed": ALLOWED_GOALS }),
            ));
        }

        let experience_level = normalize(experience);
        if !ALLOWED_EXPERIENCE.contains(&experience_level.as_str()) {
            return Err(ApiError::validation_with_details(
                "Invalid experienceLevel",
                json!({ "allowed": ALLOWED_EXPERIENCE }),
            ));
        }

        let equipment = normalize(equipment);
        if !ALLOWED_EQUIPMENT.contains(&equipment.as_str()) {
            return Err(ApiError::validation_with_details(
                "Invalid equipment",
                json!({ "allowed": ALLOWED_EQUIPMENT }),
            ));
        }

        let days = match days_raw {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        let days_per_week = match days {
            Some(d) if d.fract() == 0.0 && (1.0..=7.0).contains(&d) => d as i32,
            _ => {
                return Err(ApiError::validation_with_details(
                    "Invalid daysPerWeek",
                    json!({ "allowed": "1-7" }),
                ))
            }
        };

        let target_muscle_groups = match &self.target_muscle_groups {
            None | Some(serde_json::Value::Null) => Vec::new(),
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(normalize)
                .filter(|s| !s.is_empty())
                .collect(),
            Some(serde_json::Value::String(s)) => s
                .split(',')
                .map(normalize)
                .filter(|s| !s.is_empty())
                .collect(),
            Some(_) => {
                return Err(ApiError::validation_with_details(
                    "Invalid targetMuscleGroups",
                    json!({ "allowed": ALLOWED_MUSCLE_GROUPS }),
                ))
            }
        };
        let invalid: Vec<&String> = target_muscle_groups
            .iter()
            .filter(|g| !ALLOWED_MUSCLE_GROUPS.contains(&g.as_str()))
            .collect();
        if !invalid.is_empty() {
            return Err(ApiError::validation_with_details(
                "Invalid targetMuscleGroups",
                json!({ "invalid": invalid, "allowed": ALLOWED_MUSCLE_GROUPS }),
            ));
        }

        Ok(WorkoutPlanInput {
            goal,
            experience_level,
            days_per_week,
            equipment,
            time_per_session: self.time_per_session,
            target_muscle_groups,
            injuries: self.injuries.clone().unwrap_or_default(),
            title: self
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn workout_request() -> WorkoutPlanRequest {
        WorkoutPlanRequest {
            goal: Some("Cut".into()),
            experience_level: Some("Beginner".into()),
            days_per_week: Some(json!(4)),
            equipment: Some("Dumbbells".into()),
            time_per_session: Some(45),
            target_muscle_groups: Some(json!("chest, back")),
            injuries: None,
            title: Some("  My Plan  ".into()),
            provider: None,
            model: None,
        }
    }

    #[test]
    fn workout_goal_aliases_resolve() {
        let input = workout_request().validate().unwrap();
        assert_eq!(input.goal, "fat loss");
        assert_eq!(input.experience_level, "beginner");
        assert_eq!(input.equipment, "dumbbells");
        assert_eq!(input.days_per_week, 4);
        assert_eq!(input.target_muscle_groups, vec!["chest", "back"]);
        assert_eq!(input.title.as_deref(), Some("My Plan"));
    }

    #[test]
    fn workout_rejects_unknown_goal() {
        let mut req = workout_request();
        req.goal = Some("get huge".into());
        assert!(req.validate().is_err());
    }

    #[test]
    fn workout_rejects_out_of_range_days() {
        for days in [json!(0), json!(8), json!(2.5), json!("abc")] {
            let mut req = workout_request();
            req.days_per_week = Some(days);
            assert!(req.validate().is_err());
        }
        let mut req = workout_request();
        req.days_per_week = Some(json!("5"));
        assert_eq!(req.validate().unwrap().days_per_week, 5);
    }

    #[test]
    fn workout_rejects_invalid_muscle_group() {
        let mut req = workout_request();
        req.target_muscle_groups = Some(json!(["chest", "wings"]));
        assert!(req.validate().is_err());
    }

    #[test]
    fn workout_rejects_foreign_provider() {
        let mut req = workout_request();
        req.provider = Some("openai".into());
        assert!(req.validate().is_err());
        req.provider = Some("huggingface".into());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn workout_missing_fields() {
        let mut req = workout_request();
        req.equipment = None;
        assert!(req.validate().is_err());
    }

    fn diet_request() -> DietPlanRequest {
        DietPlanRequest {
            weight: Some(80.0),
            height: Some(180.0),
            age: Some(30),
            gender: Some("Male".into()),
            activity_level: Some("moderate".into()),
            goal: Some("cut".into()),
            provider: None,
            model: None,
        }
    }

    #[test]
    fn diet_request_validates() {
        let input = diet_request().validate().unwrap();
        assert_eq!(input.gender, "male");
        assert_eq!(input.activity_factor, 1.55);
        assert_eq!(input.goal, "cut");
    }

    #[test]
    fn diet_rejects_bad_enums_and_missing_fields() {
        let mut req = diet_request();
        req.activity_level = Some("couch".into());
        assert!(req.validate().is_err());

        let mut req = diet_request();
        req.goal = Some("shredded".into());
        assert!(req.validate().is_err());

        let mut req = diet_request();
        req.weight = None;
        assert!(req.validate().is_err());
    }
}
