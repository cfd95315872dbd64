use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Result ordering, derived from the shape of the merged filter. Not
/// caller-configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    MaxUsedIngredients,
    Popularity,
}

impl Sort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sort::MaxUsedIngredients => "max-used-ingredients",
            Sort::Popularity => "popularity",
        }
    }
}

/// Structured search intent over the closed, recognized key set. Absent or
/// empty values are never serialized; unrecognized keys in translator
/// output simply have no field to land in and are dropped.
///
/// `diet` and `intolerances` are sets (ordered sets, so their serialized
/// form is canonical); the ingredient lists keep caller order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include_ingredients: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude_ingredients: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<String>,

    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub diet: BTreeSet<String>,

    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub intolerances: BTreeSet<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_ready_time: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_calories: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_calories: Option<u32>,
}

impl SearchFilter {
    /// A filter carrying only the raw query text. The translator degrades
    /// to this on any failure.
    pub fn from_query(text: &str) -> Self {
        Self {
            query: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Derived ordering: maximize ingredient overlap when the caller named
    /// ingredients, popularity otherwise.
    pub fn sort(&self) -> Sort {
        if self.include_ingredients.is_empty() {
            Sort::Popularity
        } else {
            Sort::MaxUsedIngredients
        }
    }

    /// Canonical provider query string: fixed key order, list values
    /// comma-joined, absent values omitted. Semantically identical filters
    /// always produce identical strings, which is what makes the cache key
    /// deterministic.
    pub fn to_query_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        if let Some(query) = &self.query {
            push_param(&mut parts, "query", query);
        }
        if !self.include_ingredients.is_empty() {
            push_param(
                &mut parts,
                "includeIngredients",
                &self.include_ingredients.join(","),
            );
        }
        if !self.exclude_ingredients.is_empty() {
            push_param(
                &mut parts,
                "excludeIngredients",
                &self.exclude_ingredients.join(","),
            );
        }
        if let Some(cuisine) = &self.cuisine {
            push_param(&mut parts, "cuisine", cuisine);
        }
        if let Some(meal_type) = &self.meal_type {
            push_param(&mut parts, "type", meal_type);
        }
        if !self.diet.is_empty() {
            let joined: Vec<&str> = self.diet.iter().map(String::as_str).collect();
            push_param(&mut parts, "diet", &joined.join(","));
        }
        if !self.intolerances.is_empty() {
            let joined: Vec<&str> = self.intolerances.iter().map(String::as_str).collect();
            push_param(&mut parts, "intolerances", &joined.join(","));
        }
        if let Some(max_ready_time) = self.max_ready_time {
            push_param(&mut parts, "maxReadyTime", &max_ready_time.to_string());
        }
        if let Some(min_calories) = self.min_calories {
            push_param(&mut parts, "minCalories", &min_calories.to_string());
        }
        if let Some(max_calories) = self.max_calories {
            push_param(&mut parts, "maxCalories", &max_calories.to_string());
        }

        parts.join("&")
    }
}

fn push_param(parts: &mut Vec<String>, key: &str, value: &str) {
    parts.push(format!("{key}={}", urlencoding::encode(value)));
}

/// Combine an AI-derived filter with explicitly user-specified values.
/// Manual values win for every key except `includeIngredients`, which is
/// unioned so ingredients the user asked for survive translation.
pub fn merge(ai: SearchFilter, manual: SearchFilter) -> SearchFilter {
    let mut include_ingredients = ai.include_ingredients;
    for ingredient in manual.include_ingredients {
        let seen = include_ingredients
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(&ingredient));
        if !seen {
            include_ingredients.push(ingredient);
        }
    }

    SearchFilter {
        query: manual.query.or(ai.query),
        include_ingredients,
        exclude_ingredients: if manual.exclude_ingredients.is_empty() {
            ai.exclude_ingredients
        } else {
            manual.exclude_ingredients
        },
        cuisine: manual.cuisine.or(ai.cuisine),
        meal_type: manual.meal_type.or(ai.meal_type),
        diet: if manual.diet.is_empty() {
            ai.diet
        } else {
            manual.diet
        },
        intolerances: if manual.intolerances.is_empty() {
            ai.intolerances
        } else {
            manual.intolerances
        },
        max_ready_time: manual.max_ready_time.or(ai.max_ready_time),
        min_calories: manual.min_calories.or(ai.min_calories),
        max_calories: manual.max_calories.or(ai.max_calories),
    }
}
