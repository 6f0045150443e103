use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use super::AppState;
use crate::error::AppResult;

/// Recomputes and persists the user's recommendation set, returning the
/// ranked result.
pub async fn generate(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Value>> {
    let recommendations = state.engine.generate(user_id).await?;

    Ok(Json(json!({
        "message": "Recommendations generated successfully",
        "recommendations": recommendations,
    })))
}

/// Returns the persisted recommendation set for a user.
pub async fn list(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Value>> {
    let recommendations = state.engine.get_existing(user_id).await?;

    Ok(Json(json!({ "recommendations": recommendations })))
}

/// Returns the persisted recommendations for one category.
pub async fn list_by_category(
    State(state): State<AppState>,
    Path((user_id, category_id)): Path<(i64, i64)>,
) -> AppResult<Json<Value>> {
    let recommendations = state
        .engine
        .get_existing_for_category(user_id, category_id)
        .await?;

    Ok(Json(json!({ "recommendations": recommendations })))
}
