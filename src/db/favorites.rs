use crate::db::{models::FavoriteRow, DbPool};
use crate::error::{Error, Result};
use crate::provider::RecipeDetail;
use chrono::Utc;

/// List a user's saved recipes, most recently saved first.
pub async fn list_favorites(pool: &DbPool, user_id: i64) -> Result<Vec<FavoriteRow>> {
    let rows = sqlx::query_as::<_, FavoriteRow>(
        "SELECT * FROM favorites WHERE user_id = ? ORDER BY created_at DESC, recipe_id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Get one saved recipe by id.
pub async fn get_favorite(pool: &DbPool, user_id: i64, recipe_id: i64) -> Result<FavoriteRow> {
    let row = sqlx::query_as::<_, FavoriteRow>(
        "SELECT * FROM favorites WHERE user_id = ? AND recipe_id = ?",
    )
    .bind(user_id)
    .bind(recipe_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Favorite {recipe_id} not found")))?;

    Ok(row)
}

/// Count a user's saved recipes.
pub async fn count_favorites(pool: &DbPool, user_id: i64) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM favorites WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(count.0)
}

/// Insert a saved recipe with its embedding. Returns false when the user
/// already saved this recipe (conflict is a no-op, not an error).
pub async fn insert_favorite(
    pool: &DbPool,
    user_id: i64,
    recipe: &RecipeDetail,
    embedding: &[f32],
) -> Result<bool> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO favorites (
            user_id, recipe_id, title, image, summary,
            cuisines, diets, dish_types, ready_in_minutes, servings,
            vegetarian, vegan, gluten_free, dairy_free,
            health_score, price_per_serving,
            extended_ingredients, analyzed_instructions, instructions,
            nutrition, source_url, embedding, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (user_id, recipe_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(recipe.id)
    .bind(&recipe.title)
    .bind(&recipe.image)
    .bind(&recipe.summary)
    .bind(to_json(&recipe.cuisines)?)
    .bind(to_json(&recipe.diets)?)
    .bind(to_json(&recipe.dish_types)?)
    .bind(recipe.ready_in_minutes)
    .bind(recipe.servings)
    .bind(recipe.vegetarian)
    .bind(recipe.vegan)
    .bind(recipe.gluten_free)
    .bind(recipe.dairy_free)
    .bind(recipe.health_score)
    .bind(recipe.price_per_serving)
    .bind(to_json(&recipe.extended_ingredients)?)
    .bind(to_json(&recipe.analyzed_instructions)?)
    .bind(&recipe.instructions)
    .bind(match &recipe.nutrition {
        Some(nutrition) => Some(to_json(nutrition)?),
        None => None,
    })
    .bind(&recipe.source_url)
    .bind(to_json(&embedding)?)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a saved recipe. Returns false when nothing was deleted.
pub async fn remove_favorite(pool: &DbPool, user_id: i64, recipe_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND recipe_id = ?")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Internal(format!("JSON encoding failed: {e}")))
}
