use axum::{extract::State, routing::get, Json, Router};

use crate::api::middleware::session::AppState;
use crate::error::Result;
use crate::models::category::Category;

/// Active categories for the public navigation
async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = Category::list_active(&state.pool).await?;

    Ok(Json(categories))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/categories", get(list_categories))
}
