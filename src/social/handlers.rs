use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use crate::{
    auth::jwt::AuthUser,
    error::AppResult,
    listings::repo_types::AuctionListing,
    social::services,
    state::AppState,
};

pub fn watchlist_routes() -> Router<AppState> {
    Router::new().route("/watchlist", get(get_watchlist))
}

#[instrument(skip(state))]
pub async fn get_watchlist(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<AuctionListing>>> {
    Ok(Json(services::watchlist(state.store.as_ref(), user_id).await?))
}
