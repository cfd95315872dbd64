use crate::intent::SearchFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Discovery search parameters. `q` is free-text intent for the
/// translator; the remaining keys are explicit manual filters that take
/// precedence over anything the translator derives.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchParams {
    pub q: Option<String>,
    pub include_ingredients: Option<String>,
    pub exclude_ingredients: Option<String>,
    pub cuisine: Option<String>,
    #[serde(rename = "type")]
    pub meal_type: Option<String>,
    pub diet: Option<String>,
    pub intolerances: Option<String>,
    pub max_ready_time: Option<u32>,
    pub min_calories: Option<u32>,
    pub max_calories: Option<u32>,
    pub limit: Option<u32>,
}

impl SearchParams {
    /// Build the manual filter from the explicit parameters. Comma lists
    /// are split and blank entries dropped.
    pub fn manual_filter(&self) -> SearchFilter {
        SearchFilter {
            query: None,
            include_ingredients: split_list(self.include_ingredients.as_deref()),
            exclude_ingredients: split_list(self.exclude_ingredients.as_deref()),
            cuisine: clean(self.cuisine.as_deref()),
            meal_type: clean(self.meal_type.as_deref()),
            diet: split_set(self.diet.as_deref()),
            intolerances: split_set(self.intolerances.as_deref()),
            max_ready_time: self.max_ready_time,
            min_calories: self.min_calories,
            max_calories: self.max_calories,
        }
    }

    pub fn query_text(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn split_set(value: Option<&str>) -> BTreeSet<String> {
    split_list(value).into_iter().collect()
}

/// Semantic search over saved recipes.
#[derive(Debug, Clone, Deserialize)]
pub struct FavoritesSearchParams {
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_top_k")]
    pub limit: usize,
}

fn default_top_k() -> usize {
    crate::similarity::DEFAULT_TOP_K
}

/// Outcome of an add/remove favorite call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteMutation {
    pub message: String,
    pub recipe_id: i64,
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Readiness check response
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub database: String,
}
