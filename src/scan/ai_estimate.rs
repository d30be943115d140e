use serde_json::Value;

use super::estimator::{macros_for, MacroSplit, NutritionEstimate, ESTIMATE_NOTE};
use crate::inference::client::GenerationRequest;
use crate::inference::extract::coerce_number;

/// Prompt for the model-backed nutrition strategy: one structured estimate
/// for a single detected dish.
pub fn nutrition_prompt(food: &str) -> GenerationRequest {
    let prompt = format!(
        "You are a registered dietitian.\n\n\
         Estimate the nutrition of one typical serving of: {food}\n\n\
         Return ONLY a valid JSON object with NO markdown formatting, NO extra text, NO backticks. Exactly this structure:\n\
         {{\n\
           \"calories\": number,\n\
           \"protein\": number (grams),\n\
           \"carbs\": number (grams),\n\
           \"fats\": number (grams),\n\
           \"serving\": \"serving description\",\n\
           \"confidence\": number between 0 and 1\n\
         }}\n\n\
         Return ONLY valid JSON, nothing else."
    );
    GenerationRequest {
        system: "You are a registered dietitian.".into(),
        prompt,
        max_new_tokens: 300,
        temperature: 0.2,
    }
}

/// Builds an estimate from the model's parsed JSON. Missing macros are
/// derived from calories with the generic split; missing calories fall back
/// to the generic default so the estimate gate decides acceptance, not a
/// parse error.
pub fn estimate_from_value(value: &Value) -> NutritionEstimate {
    let calories = value
        .get("calories")
        .and_then(coerce_number)
        .map(|c| c.round().max(0.0) as u32)
        .unwrap_or(420);
    let (dp, dc, df) = macros_for(
        calories,
        MacroSplit {
            protein: 0.3,
            carbs: 0.4,
            fats: 0.3,
        },
    );
    let grams = |field: &str, default: u32| {
        value
            .get(field)
            .and_then(coerce_number)
            .map(|g| g.round().max(0.0) as u32)
            .unwrap_or(default)
    };
    NutritionEstimate {
        calories,
        protein_g: grams("protein", dp),
        carbs_g: grams("carbs", dc),
        fats_g: grams("fats", df),
        serving: value
            .get("serving")
            .and_then(|s| s.as_str())
            .unwrap_or("1 serving")
            .to_string(),
        note: ESTIMATE_NOTE.to_string(),
        confidence: value.get("confidence").and_then(coerce_number),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_payload_maps_directly() {
        let est = estimate_from_value(&json!({
            "calories": 512.4,
            "protein": 21,
            "carbs": "60",
            "fats": 18,
            "serving": "1 large bowl",
            "confidence": 0.82,
        }));
        assert_eq!(est.calories, 512);
        assert_eq!(est.protein_g, 21);
        assert_eq!(est.carbs_g, 60);
        assert_eq!(est.fats_g, 18);
        assert_eq!(est.serving, "1 large bowl");
        assert_eq!(est.confidence, Some(0.82));
    }

    #[test]
    fn missing_macros_derive_from_calories() {
        let est = estimate_from_value(&json!({"calories": 520}));
        assert_eq!((est.protein_g, est.carbs_g, est.fats_g), (39, 52, 17));
        assert_eq!(est.serving, "1 serving");
        assert!(est.confidence.is_none());
    }

    #[test]
    fn non_finite_confidence_becomes_none() {
        let est = estimate_from_value(&json!({"calories": 200, "confidence": "NaN"}));
        assert!(est.confidence.is_none());
    }

    #[test]
    fn prompt_embeds_the_dish() {
        let req = nutrition_prompt("Chicken Curry");
        assert!(req.prompt.contains("Chicken Curry"));
        assert!(req.prompt.contains("ONLY valid JSON"));
    }
}
