use crate::error::{Error, Result};
use crate::provider::RecipeDetail;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A user's saved recipe as stored. Nested recipe structures live in JSON
/// text columns; the embedding is a JSON float array.
#[derive(Debug, Clone, FromRow)]
pub struct FavoriteRow {
    pub user_id: i64,
    pub recipe_id: i64,
    pub title: String,
    pub image: Option<String>,
    pub summary: Option<String>,
    pub cuisines: String,
    pub diets: String,
    pub dish_types: String,
    pub ready_in_minutes: Option<i64>,
    pub servings: Option<i64>,
    pub vegetarian: bool,
    pub vegan: bool,
    pub gluten_free: bool,
    pub dairy_free: bool,
    pub health_score: Option<f64>,
    pub price_per_serving: Option<f64>,
    pub extended_ingredients: String,
    pub analyzed_instructions: String,
    pub instructions: Option<String>,
    pub nutrition: Option<String>,
    pub source_url: Option<String>,
    pub embedding: String,
    pub created_at: DateTime<Utc>,
}

impl FavoriteRow {
    /// Rebuild the provider-shaped record from the stored columns.
    pub fn to_detail(&self) -> Result<RecipeDetail> {
        Ok(RecipeDetail {
            id: self.recipe_id,
            title: self.title.clone(),
            image: self.image.clone(),
            summary: self.summary.clone(),
            cuisines: parse_json_column(&self.cuisines, "cuisines")?,
            diets: parse_json_column(&self.diets, "diets")?,
            dish_types: parse_json_column(&self.dish_types, "dish_types")?,
            ready_in_minutes: self.ready_in_minutes,
            servings: self.servings,
            vegetarian: self.vegetarian,
            vegan: self.vegan,
            gluten_free: self.gluten_free,
            dairy_free: self.dairy_free,
            health_score: self.health_score,
            price_per_serving: self.price_per_serving,
            extended_ingredients: parse_json_column(
                &self.extended_ingredients,
                "extended_ingredients",
            )?,
            analyzed_instructions: parse_json_column(
                &self.analyzed_instructions,
                "analyzed_instructions",
            )?,
            instructions: self.instructions.clone(),
            nutrition: match &self.nutrition {
                Some(raw) => Some(parse_json_column(raw, "nutrition")?),
                None => None,
            },
            source_url: self.source_url.clone(),
        })
    }

    /// Decode the stored embedding vector.
    pub fn embedding_vector(&self) -> Result<Vec<f32>> {
        parse_json_column(&self.embedding, "embedding")
    }
}

fn parse_json_column<T: serde::de::DeserializeOwned>(raw: &str, column: &str) -> Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| Error::Internal(format!("corrupt JSON in favorites.{column}: {e}")))
}
