use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::auth::{self, CurrentUser};
use crate::api::middleware::session::AppState;
use crate::error::{AppError, Result};
use crate::models::{ad::Ad, favorite::Favorite};

#[derive(Debug, Deserialize)]
pub struct AddFavoriteRequest {
    pub ad_id: Uuid,
}

async fn list_favorites(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<Ad>>> {
    let ads = Favorite::list_ads(&state.pool, user.user_id).await?;

    Ok(Json(ads))
}

async fn add_favorite(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<AddFavoriteRequest>,
) -> Result<StatusCode> {
    // Only active ads can be favorited
    Ad::find_by_id(&state.pool, body.ad_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ad not found".to_string()))?;

    Favorite::add(&state.pool, user.user_id, body.ad_id).await?;

    Ok(StatusCode::CREATED)
}

async fn remove_favorite(
    State(state): State<AppState>,
    Path(ad_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
) -> Result<StatusCode> {
    let removed = Favorite::remove(&state.pool, user.user_id, ad_id).await?;

    if removed == 0 {
        return Err(AppError::NotFound("Favorite not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/favorites", get(list_favorites).post(add_favorite))
        .route("/api/favorites/:ad_id", axum::routing::delete(remove_favorite))
        .route_layer(middleware::from_fn_with_state(state, auth::require_user))
}
