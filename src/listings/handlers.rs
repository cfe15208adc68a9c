use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Redirect,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::jwt::AuthUser,
    bidding,
    error::{AppError, AppResult},
    listings::{
        dto::{
            CategoryChoices, CategoryListings, CategoryPick, CreateListingRequest, ListingAction,
            ListingDetails,
        },
        repo_types::{category_choices, AuctionListing, CategoryFilter},
        services,
    },
    social,
    state::AppState,
};

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/category", get(category_form).post(pick_category))
        .route("/categories/:category", get(listings_in_category))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/create", get(create_form).post(create_listing))
        .route("/listing/:id", get(get_listing).post(listing_action))
}

fn choices() -> CategoryChoices {
    CategoryChoices {
        categories: category_choices().into_iter().map(String::from).collect(),
    }
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> AppResult<Json<Vec<AuctionListing>>> {
    Ok(Json(services::list_active(state.store.as_ref()).await?))
}

#[instrument(skip_all)]
pub async fn create_form(_user: AuthUser) -> Json<CategoryChoices> {
    Json(choices())
}

/// POST /create → 201 with `Location: /listing/{id}`.
#[instrument(skip(state, payload))]
pub async fn create_listing(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateListingRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<AuctionListing>)> {
    let listing = services::create_listing(state.store.as_ref(), payload, user_id).await?;

    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(&format!("/listing/{}", listing.id))
        .map_err(|e| AppError::Internal(e.into()))?;
    headers.insert(header::LOCATION, location);

    Ok((StatusCode::CREATED, headers, Json(listing)))
}

#[instrument(skip(state, user))]
pub async fn get_listing(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ListingDetails>> {
    let viewer = user.map(|AuthUser(user_id)| user_id);
    Ok(Json(
        services::listing_details(state.store.as_ref(), id, viewer).await?,
    ))
}

/// Every successful action redirects back to the listing page.
#[instrument(skip(state, action))]
pub async fn listing_action(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    Json(action): Json<ListingAction>,
) -> AppResult<Redirect> {
    let store = state.store.as_ref();
    services::get_listing(store, id).await?;

    match action {
        ListingAction::Watchlist => {
            social::services::add_to_watchlist(store, user_id, id).await?;
        }
        ListingAction::Close => {
            services::close_listing(store, id, user_id, state.config.restrict_close_to_creator)
                .await?;
        }
        ListingAction::RemoveFromWatchlist => {
            social::services::remove_from_watchlist(store, user_id, id).await?;
        }
        ListingAction::PostComment { comment } => {
            social::services::post_comment(store, id, user_id, comment.as_deref()).await?;
        }
        ListingAction::Bid { bid } => {
            bidding::services::place_bid(store, id, bid.as_ref(), user_id).await?;
        }
    }

    Ok(Redirect::to(&format!("/listing/{id}")))
}

#[instrument]
pub async fn category_form() -> Json<CategoryChoices> {
    Json(choices())
}

/// POST /category → 303 to `/categories/{category}`.
#[instrument(skip(payload))]
pub async fn pick_category(Json(payload): Json<CategoryPick>) -> AppResult<Redirect> {
    let category = payload.category.trim();
    category
        .parse::<CategoryFilter>()
        .map_err(|e| AppError::Validation(format!("Unknown category: {}", e.0)))?;
    Ok(Redirect::to(&format!("/categories/{category}")))
}

#[instrument(skip(state))]
pub async fn listings_in_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> AppResult<Json<CategoryListings>> {
    let listings = services::list_by_category(state.store.as_ref(), &category).await?;
    Ok(Json(CategoryListings {
        category,
        categories: choices().categories,
        listings,
    }))
}
