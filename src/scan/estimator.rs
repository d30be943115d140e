use super::label::normalize;

pub const ESTIMATE_NOTE: &str = "Estimated per typical serving.";

/// Calorie/macro estimate for one serving of a dish. `confidence` is only
/// present on model-produced estimates; the heuristic path never sets it.
#[derive(Debug, Clone, PartialEq)]
pub struct NutritionEstimate {
    pub calories: u32,
    pub protein_g: u32,
    pub carbs_g: u32,
    pub fats_g: u32,
    pub serving: String,
    pub note: String,
    pub confidence: Option<f64>,
}

/// Fractional allocation of total calories across macros; sums to 1.0 up to
/// rounding.
#[derive(Debug, Clone, Copy)]
pub struct MacroSplit {
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

const DEFAULT_SPLIT: MacroSplit = MacroSplit {
    protein: 0.3,
    carbs: 0.4,
    fats: 0.3,
};

/// Grams per macro from total calories, at 4 kcal/g for protein and carbs
/// and 9 kcal/g for fat, rounded to the nearest gram.
pub fn macros_for(calories: u32, split: MacroSplit) -> (u32, u32, u32) {
    let grams = |fraction: f64, kcal_per_g: f64| {
        ((calories as f64 * fraction) / kcal_per_g).round() as u32
    };
    (
        grams(split.protein, 4.0),
        grams(split.carbs, 4.0),
        grams(split.fats, 9.0),
    )
}

struct KnownDish {
    name: &'static str,
    calories: u32,
    protein_g: u32,
    carbs_g: u32,
    fats_g: u32,
    serving: &'static str,
}

macro_rules! dish {
    ($name:literal, $cal:literal, $serving:literal, $p:literal, $c:literal, $f:literal) => {
        KnownDish {
            name: $name,
            calories: $cal,
            serving: $serving,
            protein_g: $p,
            carbs_g: $c,
            fats_g: $f,
        }
    };
}

/// Dishes with per-serving values taken as-is; keys are normalized labels.
const KNOWN_DISHES: &[KnownDish] = &[
    dish!("fried rice", 520, "1.5 cups (300 g)", 13, 75, 20),
    dish!("white rice", 205, "1 cup cooked", 4, 45, 0),
    dish!("brown rice", 215, "1 cup cooked", 5, 45, 2),
    dish!("pho", 450, "1 bowl", 28, 50, 12),
    dish!("chicken curry", 480, "1 cup", 28, 25, 28),
    dish!("pad thai", 550, "1.5 cups", 18, 75, 22),
    dish!("ramen", 480, "1 bowl", 20, 60, 16),
    dish!("pizza", 285, "1 slice", 12, 36, 10),
    dish!("hamburger", 500, "1 burger", 26, 40, 24),
    dish!("hot dog", 300, "1 hot dog", 12, 22, 18),
    dish!("tacos", 210, "1 taco", 10, 20, 9),
    dish!("sushi", 300, "6 pieces", 12, 45, 6),
    dish!("french fries", 365, "1 medium", 4, 48, 17),
    dish!("lasagna", 520, "1 slice", 24, 45, 26),
    dish!("macaroni and cheese", 480, "1.5 cups", 18, 50, 22),
    dish!("chicken wings", 430, "6 wings", 28, 10, 32),
    dish!("steak", 650, "8 oz", 55, 0, 45),
    dish!("waffles", 420, "2 waffles", 10, 55, 16),
    dish!("pancakes", 350, "2 pancakes", 8, 55, 10),
    dish!("grilled chicken", 330, "6 oz", 52, 0, 7),
    dish!("fried chicken", 420, "2 pieces", 28, 18, 26),
    dish!("chicken biryani", 550, "1.5 cups", 25, 70, 18),
    dish!("vegetable biryani", 480, "1.5 cups", 9, 75, 14),
    dish!("butter chicken", 580, "1 cup", 28, 18, 40),
    dish!("paneer butter masala", 520, "1 cup", 18, 20, 38),
    dish!("dal", 230, "1 cup", 12, 34, 5),
    dish!("naan", 260, "1 naan", 8, 45, 6),
    dish!("chapati", 120, "1 roti", 3, 20, 3),
    dish!("samosa", 260, "1 samosa", 4, 28, 14),
    dish!("spring rolls", 300, "4 rolls", 7, 35, 15),
    dish!("caesar salad", 360, "1 bowl", 10, 18, 28),
    dish!("greek salad", 220, "1 bowl", 6, 12, 16),
    dish!("chicken salad", 380, "1 bowl", 28, 10, 24),
    dish!("tuna salad", 340, "1 bowl", 24, 8, 22),
    dish!("cheeseburger", 560, "1 burger", 30, 40, 32),
    dish!("bacon burger", 650, "1 burger", 35, 40, 40),
    dish!("club sandwich", 520, "1 sandwich", 24, 48, 24),
    dish!("grilled cheese", 400, "1 sandwich", 14, 32, 22),
    dish!("chicken sandwich", 430, "1 sandwich", 28, 38, 16),
    dish!("turkey sandwich", 380, "1 sandwich", 24, 38, 10),
    dish!("spaghetti bolognese", 520, "1.5 cups", 24, 60, 18),
    dish!("fettuccine alfredo", 680, "1.5 cups", 20, 62, 36),
    dish!("chicken alfredo", 700, "1.5 cups", 35, 60, 34),
    dish!("pesto pasta", 560, "1.5 cups", 14, 62, 26),
    dish!("risotto", 520, "1.5 cups", 12, 75, 18),
    dish!("beef taco", 240, "1 taco", 12, 20, 11),
    dish!("chicken taco", 210, "1 taco", 14, 18, 8),
    dish!("burrito", 700, "1 burrito", 28, 80, 24),
    dish!("quesadilla", 480, "1 quesadilla", 20, 40, 24),
    dish!("nachos", 520, "1 plate", 16, 52, 28),
    dish!("salmon", 370, "6 oz", 39, 0, 22),
    dish!("grilled salmon", 370, "6 oz", 39, 0, 22),
    dish!("tuna steak", 330, "6 oz", 42, 0, 12),
    dish!("shrimp", 200, "6 oz", 36, 2, 3),
    dish!("fried shrimp", 350, "6 oz", 24, 24, 18),
    dish!("chicken noodle soup", 220, "1 bowl", 15, 20, 8),
    dish!("tomato soup", 180, "1 bowl", 4, 26, 6),
    dish!("clam chowder", 300, "1 bowl", 10, 26, 16),
    dish!("miso soup", 80, "1 bowl", 6, 10, 2),
    dish!("scrambled eggs", 200, "2 eggs", 13, 2, 15),
    dish!("omelette", 250, "2 eggs", 16, 4, 18),
    dish!("avocado toast", 280, "1 slice", 6, 26, 16),
    dish!("oatmeal", 190, "1 cup", 6, 32, 4),
    dish!("granola", 280, "1/2 cup", 6, 40, 10),
    dish!("yogurt parfait", 260, "1 cup", 12, 40, 6),
    dish!("fruit salad", 160, "1.5 cups", 2, 38, 1),
    dish!("cheesecake", 420, "1 slice", 7, 34, 28),
    dish!("chocolate cake", 390, "1 slice", 5, 55, 16),
    dish!("ice cream", 200, "1/2 cup", 3, 24, 10),
    dish!("brownie", 320, "1 brownie", 4, 44, 14),
    dish!("donut", 260, "1 donut", 4, 34, 12),
];

struct KeywordRule {
    keywords: &'static [&'static str],
    calories: u32,
    serving: &'static str,
    split: MacroSplit,
    /// Keyword-conditional calorie/serving substitutions within the rule.
    overrides: &'static [(&'static str, u32, &'static str)],
}

macro_rules! rule {
    ($kw:expr, $cal:literal, $serving:literal, [$p:literal, $c:literal, $f:literal]) => {
        rule!($kw, $cal, $serving, [$p, $c, $f], &[])
    };
    ($kw:expr, $cal:literal, $serving:literal, [$p:literal, $c:literal, $f:literal], $ov:expr) => {
        KeywordRule {
            keywords: $kw,
            calories: $cal,
            serving: $serving,
            split: MacroSplit {
                protein: $p,
                carbs: $c,
                fats: $f,
            },
            overrides: $ov,
        }
    };
}

/// Evaluated in order; first rule with any matching substring wins. The order
/// is load-bearing (e.g. "chicken salad soup" is a salad, not a soup).
const KEYWORD_RULES: &[KeywordRule] = &[
    rule!(&["salad"], 250, "1 bowl", [0.2, 0.5, 0.3]),
    rule!(&["soup", "bisque", "chowder"], 220, "1 bowl", [0.2, 0.5, 0.3]),
    rule!(
        &["cake", "cheesecake", "tiramisu", "panna cotta", "baklava", "creme brulee", "brownie", "cup cake"],
        360,
        "1 slice",
        [0.08, 0.55, 0.37]
    ),
    rule!(&["ice cream", "frozen yogurt"], 200, "1/2 cup", [0.08, 0.6, 0.32]),
    rule!(&["pizza"], 285, "1 slice", [0.18, 0.45, 0.37]),
    rule!(
        &["sandwich", "burger", "hamburger", "hot dog", "club"],
        450,
        "1 sandwich",
        [0.22, 0.45, 0.33]
    ),
    rule!(
        &["spaghetti", "lasagna", "ravioli", "gnocchi", "risotto", "macaroni"],
        500,
        "1.5 cups",
        [0.18, 0.55, 0.27]
    ),
    rule!(&["rice"], 420, "1.5 cups", [0.12, 0.68, 0.2]),
    rule!(&["curry"], 480, "1 cup", [0.2, 0.45, 0.35]),
    rule!(&["fried", "fries"], 420, "1 serving", [0.1, 0.45, 0.45]),
    rule!(
        &["taco", "burrito", "quesadilla", "nachos"],
        260,
        "1 item",
        [0.2, 0.5, 0.3],
        &[("burrito", 700, "1 burrito")]
    ),
    rule!(
        &["sushi", "sashimi"],
        300,
        "6 pieces",
        [0.3, 0.5, 0.2],
        &[("sashimi", 200, "6 pieces")]
    ),
    rule!(
        &["steak", "ribs", "prime rib", "pork chop", "filet"],
        600,
        "8 oz",
        [0.4, 0.1, 0.5]
    ),
    rule!(
        &["waffle", "pancake", "french toast"],
        350,
        "2 pieces",
        [0.1, 0.6, 0.3]
    ),
    rule!(
        &["dumpling", "gyoza", "samosa", "spring roll"],
        320,
        "6 pieces",
        [0.15, 0.5, 0.35]
    ),
    rule!(
        &["salmon", "shrimp", "scallop", "mussels", "oyster", "tuna", "crab", "lobster"],
        350,
        "6 oz",
        [0.45, 0.1, 0.45]
    ),
];

/// Maps a food label to a calorie/macro estimate: exact dish match first,
/// then the keyword cascade, then a generic default. Pure and total.
pub fn estimate(label: &str) -> NutritionEstimate {
    let name = normalize(label);

    if let Some(dish) = KNOWN_DISHES.iter().find(|d| d.name == name) {
        return NutritionEstimate {
            calories: dish.calories,
            protein_g: dish.protein_g,
            carbs_g: dish.carbs_g,
            fats_g: dish.fats_g,
            serving: dish.serving.to_string(),
            note: ESTIMATE_NOTE.to_string(),
            confidence: None,
        };
    }

    let (calories, serving, split) = KEYWORD_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|kw| name.contains(kw)))
        .map(|rule| {
            let (calories, serving) = rule
                .overrides
                .iter()
                .find(|(kw, _, _)| name.contains(kw))
                .map(|&(_, cal, serving)| (cal, serving))
                .unwrap_or((rule.calories, rule.serving));
            (calories, serving, rule.split)
        })
        .unwrap_or((420, "1 serving", DEFAULT_SPLIT));

    let (protein_g, carbs_g, fats_g) = macros_for(calories, split);
    NutritionEstimate {
        calories,
        protein_g,
        carbs_g,
        fats_g,
        serving: serving.to_string(),
        note: ESTIMATE_NOTE.to_string(),
        confidence: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_dishes_return_table_values_verbatim() {
        for dish in KNOWN_DISHES {
            let est = estimate(dish.name);
            assert_eq!(est.calories, dish.calories, "{}", dish.name);
            assert_eq!(est.protein_g, dish.protein_g, "{}", dish.name);
            assert_eq!(est.carbs_g, dish.carbs_g, "{}", dish.name);
            assert_eq!(est.fats_g, dish.fats_g, "{}", dish.name);
            assert_eq!(est.serving, dish.serving, "{}", dish.name);
            assert_eq!(est.note, ESTIMATE_NOTE);
            assert!(est.confidence.is_none());
        }
    }

    #[test]
    fn exact_match_beats_keyword_rules() {
        // "caesar salad" is in the table; the salad rule (250 kcal) must not fire.
        let est = estimate("Caesar_Salad");
        assert_eq!(est.calories, 360);
        assert_eq!(est.serving, "1 bowl");
    }

    #[test]
    fn curry_rule_fires_on_substring() {
        let est = estimate("spicy chicken curry bowl");
        assert_eq!(est.calories, 480);
        assert_eq!(est.serving, "1 cup");
        // split {0.2, 0.45, 0.35}
        assert_eq!(est.protein_g, 24);
        assert_eq!(est.carbs_g, 54);
        assert_eq!(est.fats_g, 19);
    }

    #[test]
    fn salad_rule_wins_over_later_rules() {
        // Contains both "salad" and "rice"; salad is evaluated first.
        let est = estimate("rice salad");
        assert_eq!(est.calories, 250);
        assert_eq!(est.serving, "1 bowl");
    }

    #[test]
    fn burrito_and_sashimi_conditionals() {
        let burrito = estimate("breakfast burrito supreme");
        assert_eq!(burrito.calories, 700);
        assert_eq!(burrito.serving, "1 burrito");

        let other_taco = estimate("street taco plate");
        assert_eq!(other_taco.calories, 260);
        assert_eq!(other_taco.serving, "1 item");

        let sashimi = estimate("salmon sashimi platter");
        // "salmon" is a seafood keyword but sushi-family is evaluated first.
        assert_eq!(sashimi.calories, 200);
        assert_eq!(sashimi.serving, "6 pieces");
    }

    #[test]
    fn unknown_food_gets_default() {
        let est = estimate("unrecognized xyz food");
        assert_eq!(est.calories, 420);
        assert_eq!(est.serving, "1 serving");
        // split {0.3, 0.4, 0.3}
        assert_eq!(est.protein_g, 32);
        assert_eq!(est.carbs_g, 42);
        assert_eq!(est.fats_g, 14);
    }

    #[test]
    fn macro_rounding_matches_formula() {
        let (p, c, f) = macros_for(
            520,
            MacroSplit {
                protein: 0.3,
                carbs: 0.4,
                fats: 0.3,
            },
        );
        assert_eq!((p, c, f), (39, 52, 17));
    }
}
