use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    bidding::{repo_types::Bid, services},
    error::AppResult,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/listing/:id/bids", get(list_bids))
}

#[instrument(skip(state))]
pub async fn list_bids(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<Bid>>> {
    Ok(Json(services::list_bids(state.store.as_ref(), id).await?))
}
