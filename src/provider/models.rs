use serde::{Deserialize, Serialize};

/// Envelope of a provider complexSearch response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComplexSearchResponse {
    pub results: Vec<RecipeSummary>,
    pub offset: i64,
    pub number: i64,
    pub total_results: i64,
}

/// Search-result projection of a provider recipe. Read-only pass-through;
/// this engine never owns or mutates it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecipeSummary {
    pub id: i64,
    pub title: String,
    pub image: Option<String>,
    pub used_ingredients: Vec<Ingredient>,
    pub missed_ingredients: Vec<Ingredient>,
    pub used_ingredient_count: i64,
    pub missed_ingredient_count: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub amount: Option<f64>,
    pub unit: Option<String>,
    pub original: Option<String>,
}

/// Full provider recipe record, as fetched by the information endpoint and
/// as stored when a user saves a recipe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecipeDetail {
    pub id: i64,
    pub title: String,
    pub image: Option<String>,
    pub summary: Option<String>,
    pub cuisines: Vec<String>,
    pub diets: Vec<String>,
    pub dish_types: Vec<String>,
    pub ready_in_minutes: Option<i64>,
    pub servings: Option<i64>,
    pub vegetarian: bool,
    pub vegan: bool,
    pub gluten_free: bool,
    pub dairy_free: bool,
    pub health_score: Option<f64>,
    pub price_per_serving: Option<f64>,
    pub extended_ingredients: Vec<Ingredient>,
    pub analyzed_instructions: Vec<InstructionBlock>,
    pub instructions: Option<String>,
    pub nutrition: Option<Nutrition>,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstructionBlock {
    pub steps: Vec<InstructionStep>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstructionStep {
    pub number: i64,
    pub step: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Nutrition {
    pub nutrients: Vec<Nutrient>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Nutrient {
    pub name: String,
    pub amount: f64,
    pub unit: String,
}
