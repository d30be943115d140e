use serde::Serialize;

/// Success envelope for a food scan, mirroring the public API contract.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub food: String,
    pub calories: u32,
    pub protein: u32,
    pub carbs: u32,
    pub fats: u32,
    pub serving: String,
    pub calorie_note: String,
    pub model: String,
    pub high_confidence: bool,
    pub confidence: f64,
    pub warning: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_serializes_camel_case() {
        let response = ScanResponse {
            food: "Fried Rice".into(),
            calories: 520,
            protein: 13,
            carbs: 75,
            fats: 20,
            serving: "1.5 cups (300 g)".into(),
            calorie_note: "Estimated per typical serving.".into(),
            model: "nateraw/food".into(),
            high_confidence: true,
            confidence: 0.91,
            warning: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["calorieNote"], "Estimated per typical serving.");
        assert_eq!(json["highConfidence"], true);
        assert!(json["warning"].is_null());
    }
}
