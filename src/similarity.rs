use crate::db::{self, DbPool};
use crate::error::Result;
use crate::llm::LlmClient;
use crate::provider::RecipeDetail;
use crate::utils::text::strip_html;
use std::sync::Arc;
use tracing::debug;

/// Computes the vector representation of a saved recipe. Runs exactly once,
/// synchronously, at save time; a failure here aborts the save so no record
/// ever exists without a comparable vector.
#[derive(Clone)]
pub struct EmbeddingIndexer {
    llm: Arc<dyn LlmClient>,
}

impl EmbeddingIndexer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Canonical text block for a recipe: title, category tags, timing,
    /// ingredient names, and the HTML-stripped summary and instructions.
    pub fn context(recipe: &RecipeDetail) -> String {
        let mut lines: Vec<String> = Vec::new();

        lines.push(format!("Title: {}", recipe.title));

        let mut tags: Vec<&str> = Vec::new();
        tags.extend(recipe.dish_types.iter().map(String::as_str));
        tags.extend(recipe.cuisines.iter().map(String::as_str));
        tags.extend(recipe.diets.iter().map(String::as_str));
        if !tags.is_empty() {
            lines.push(format!("Categories: {}", tags.join(", ")));
        }

        if let Some(minutes) = recipe.ready_in_minutes {
            lines.push(format!("Ready in {minutes} minutes"));
        }

        let ingredients: Vec<&str> = recipe
            .extended_ingredients
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        if !ingredients.is_empty() {
            lines.push(format!("Ingredients: {}", ingredients.join(", ")));
        }

        if let Some(summary) = &recipe.summary {
            lines.push(strip_html(summary));
        }
        if let Some(instructions) = &recipe.instructions {
            lines.push(strip_html(instructions));
        }

        lines.join("\n")
    }

    /// Embed a saved recipe's canonical text block.
    pub async fn embed_recipe(&self, recipe: &RecipeDetail) -> Result<Vec<f32>> {
        self.llm.embed(&Self::context(recipe)).await
    }

    /// Embed free query text into the same space as the stored vectors.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.llm.embed(text).await
    }
}

/// Cosine distance: `1 - cosine_similarity`. 0 means identical direction,
/// 2 means opposite. Degenerate (zero-norm or length-mismatched) pairs are
/// treated as maximally dissimilar.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }

    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Ranks a user's saved recipes against free query text by cosine distance.
#[derive(Clone)]
pub struct SimilaritySearch {
    indexer: EmbeddingIndexer,
}

pub const DEFAULT_TOP_K: usize = 10;
pub const MAX_TOP_K: usize = 50;

impl SimilaritySearch {
    pub fn new(indexer: EmbeddingIndexer) -> Self {
        Self { indexer }
    }

    /// Return the `top_k` saved recipes closest to `query_text`, ascending
    /// by distance, ties broken by most recent save. A user with nothing
    /// saved gets an empty list without any embedding call being made.
    pub async fn search(
        &self,
        pool: &DbPool,
        user_id: i64,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<RecipeDetail>> {
        // Rows arrive newest-first; the stable sort below preserves that
        // order among equal distances
        let rows = db::favorites::list_favorites(pool, user_id).await?;
        if rows.is_empty() {
            debug!("User {} has no saved recipes, skipping embedding", user_id);
            return Ok(Vec::new());
        }

        let query_vector = self.indexer.embed_query(query_text).await?;

        let mut scored: Vec<(f32, RecipeDetail)> = Vec::with_capacity(rows.len());
        for row in &rows {
            let vector = row.embedding_vector()?;
            let distance = cosine_distance(&query_vector, &vector);
            scored.push((distance, row.to_detail()?));
        }

        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.truncate(top_k);

        Ok(scored.into_iter().map(|(_, detail)| detail).collect())
    }
}
