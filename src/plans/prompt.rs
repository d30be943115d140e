use serde_json::Value;

use super::dto::{DietPlanInput, WorkoutPlanInput};
use crate::inference::client::GenerationRequest;

/// Mifflin-St Jeor maintenance calories with the goal adjustment applied
/// (cut −500, bulk +400), rounded to the nearest kcal.
pub fn calculate_calories(input: &DietPlanInput) -> i32 {
    let bmr = 10.0 * input.weight + 6.25 * input.height - 5.0 * input.age as f64
        + if input.gender == "male" { 5.0 } else { -161.0 };
    let mut maintenance = bmr * input.activity_factor;
    match input.goal.as_str() {
        "cut" => maintenance -= 500.0,
        "bulk" => maintenance += 400.0,
        _ => {}
    }
    maintenance.round() as i32
}

pub fn diet_plan_prompt(input: &DietPlanInput, target_calories: i32) -> GenerationRequest {
    let prompt = format!(
        "You are a professional nutritionist and fitness expert.\n\n\
Create a detailed, personalized 7-day diet plan for a client with these stats:\n\
- Age: {age} years\n\
- Weight: {weight} kg\n\
- Height: {height} cm\n\
- Gender: {gender}\n\
- Activity Level: {activity}\n\
- Goal: {goal}\n\
- Target Calories: {target_calories} kcal/day\n\n\
Return ONLY a valid JSON object with NO markdown formatting, NO extra text, NO backticks. Exactly this structure:\n\
{{\n\
  \"summary\": \"Brief summary of the plan (2-3 sentences)\",\n\
  \"dailyCalories\": {target_calories},\n\
  \"macroTargets\": {{\n\
    \"protein\": number (in grams),\n\
    \"carbs\": number (in grams),\n\
    \"fats\": number (in grams)\n\
  }},\n\
  \"meals\": [\n\
    {{\n\
      \"day\": \"Day 1\",\n\
      \"breakfast\": \"meal description\",\n\
      \"breakfast_calories\": number,\n\
      \"lunch\": \"meal description\",\n\
      \"lunch_calories\": number,\n\
      \"dinner\": \"meal description\",\n\
      \"dinner_calories\": number,\n\
      \"snacks\": \"snack description\",\n\
      \"snacks_calories\": number,\n\
      \"daily_total\": number\n\
    }}\n\
  ],\n\
  \"tips\": [\"tip 1\", \"tip 2\", \"tip 3\", \"tip 4\", \"tip 5\"]\n\
}}\n\n\
Make meals realistic, practical, and aligned with the goal (cut/bulk/maintain).\n\
For cutting: reduce calories, high protein, lower carbs.\n\
For bulking: increase calories, balanced macros, high protein.\n\
For maintaining: moderate calories, balanced macros.\n\n\
Return ONLY valid JSON, nothing else.",
        age = input.age,
        weight = input.weight,
        height = input.height,
        gender = input.gender,
        activity = input.activity_level,
        goal = input.goal,
    );
    GenerationRequest {
        system: "You are a professional nutritionist and fitness expert.".into(),
        prompt,
        max_new_tokens: 1200,
        temperature: 0.4,
    }
}

pub fn workout_plan_prompt(input: &WorkoutPlanInput) -> GenerationRequest {
    let time = input
        .time_per_session
        .map(|t| t.to_string())
        .unwrap_or_else(|| "not specified".into());
    let muscles = if input.target_muscle_groups.is_empty() {
        "not specified".to_string()
    } else {
        input.target_muscle_groups.join(", ")
    };
    let injuries = if input.injuries.is_empty() {
        "none"
    } else {
        &input.injuries
    };
    let prompt = format!(
        "You are a certified strength & conditioning coach.\n\n\
Create a personalized workout plan based on:\n\
- Goal: {goal}\n\
- Experience Level: {experience}\n\
- Days per week: {days}\n\
- Equipment: {equipment}\n\
- Time per session: {time} minutes\n\
- Target muscle groups: {muscles}\n\
- Injuries or limitations: {injuries}\n\n\
Return ONLY a valid JSON object with NO markdown formatting, NO extra text, NO backticks. Exactly this structure:\n\
{{\n\
  \"summary\": \"2-3 sentence overview\",\n\
  \"split\": \"e.g., Push/Pull/Legs, Upper/Lower, Full Body\",\n\
  \"weeklySchedule\": [\n\
    {{\n\
      \"day\": \"Day 1\",\n\
      \"muscleFocus\": \"Primary muscle group(s)\",\n\
      \"warmup\": [\"item 1\", \"item 2\"],\n\
      \"exercises\": [\n\
        {{\n\
          \"name\": \"exercise name\",\n\
          \"sets\": number,\n\
          \"reps\": \"rep range (e.g., 8-12)\",\n\
          \"restSeconds\": number,\n\
          \"notes\": \"optional form cue or progression\"\n\
        }}\n\
      ],\n\
      \"cardio\": [\n\
        {{\n\
          \"type\": \"e.g., incline walk, cycling, rower, jump rope\",\n\
          \"durationMinutes\": number,\n\
          \"intensity\": \"low/moderate/high\"\n\
        }}\n\
      ],\n\
      \"cooldown\": [\"item 1\", \"item 2\"]\n\
    }}\n\
  ],\n\
  \"progressionTips\": [\"tip 1\", \"tip 2\", \"tip 3\", \"tip 4\"]\n\
}}\n\n\
Rules:\n\
- Choose exercises that match the equipment and experience level.\n\
- Include different exercises for different muscle groups across the week.\n\
- Align with goal:\n\
  - Fat loss: higher volume, moderate rest, compound + accessory, include cardio in each training day.\n\
  - Muscle gain: progressive overload, 8-12 reps, moderate rest.\n\
  - Strength: lower reps, longer rest, focus on main lifts.\n\
- Target muscle groups should be used as primary focus across the week.\n\
- Keep plan realistic for the time per session.\n\n\
Return ONLY valid JSON.",
        goal = input.goal,
        experience = input.experience_level,
        days = input.days_per_week,
        equipment = input.equipment,
    );
    GenerationRequest {
        system: "You are a certified strength & conditioning coach.".into(),
        prompt,
        max_new_tokens: 1100,
        temperature: 0.4,
    }
}

/// The only server-side shape check applied to a generated plan: valid JSON
/// object containing at least one of the expected top-level fields.
pub fn has_expected_field(value: &Value, fields: &[&str]) -> bool {
    value
        .as_object()
        .map(|map| fields.iter().any(|f| map.contains_key(*f)))
        .unwrap_or(false)
}

pub const DIET_PLAN_FIELDS: &[&str] = &["summary", "dailyCalories", "macroTargets", "meals"];
pub const WORKOUT_PLAN_FIELDS: &[&str] = &["summary", "split", "weeklySchedule", "progressionTips"];

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn diet_input(gender: &str, goal: &str) -> DietPlanInput {
        DietPlanInput {
            weight: 80.0,
            height: 180.0,
            age: 30,
            gender: gender.into(),
            activity_level: "moderate".into(),
            activity_factor: 1.55,
            goal: goal.into(),
        }
    }

    #[test]
    fn calories_for_male_cut() {
        // BMR = 800 + 1125 - 150 + 5 = 1780; x1.55 = 2759; -500 = 2259
        assert_eq!(calculate_calories(&diet_input("male", "cut")), 2259);
    }

    #[test]
    fn calories_for_female_bulk() {
        // BMR = 800 + 1125 - 150 - 161 = 1614; x1.55 = 2501.7; +400 = 2902
        assert_eq!(calculate_calories(&diet_input("female", "bulk")), 2902);
    }

    #[test]
    fn maintain_goal_leaves_maintenance() {
        assert_eq!(calculate_calories(&diet_input("male", "maintain")), 2759);
    }

    #[test]
    fn prompts_embed_inputs() {
        let input = diet_input("male", "cut");
        let req = diet_plan_prompt(&input, 2259);
        assert!(req.prompt.contains("Target Calories: 2259 kcal/day"));
        assert!(req.prompt.contains("Goal: cut"));

        let req = workout_plan_prompt(&WorkoutPlanInput {
            goal: "fat loss".into(),
            experience_level: "beginner".into(),
            days_per_week: 4,
            equipment: "dumbbells".into(),
            time_per_session: None,
            target_muscle_groups: vec!["chest".into(), "back".into()],
            injuries: String::new(),
            title: None,
        });
        assert!(req.prompt.contains("Days per week: 4"));
        assert!(req.prompt.contains("Target muscle groups: chest, back"));
        assert!(req.prompt.contains("Time per session: not specified"));
        assert!(req.prompt.contains("Injuries or limitations: none"));
    }

    #[test]
    fn expected_field_check() {
        assert!(has_expected_field(
            &json!({"summary": "ok"}),
            DIET_PLAN_FIELDS
        ));
        assert!(has_expected_field(
            &json!({"weeklySchedule": []}),
            WORKOUT_PLAN_FIELDS
        ));
        assert!(!has_expected_field(&json!({"other": 1}), DIET_PLAN_FIELDS));
        assert!(!has_expected_field(&json!([1, 2]), DIET_PLAN_FIELDS));
    }
}
