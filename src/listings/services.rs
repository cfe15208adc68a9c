use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    listings::{
        dto::{CreateListingRequest, ListingDetails},
        repo_types::{
            parse_listing_category, AuctionListing, CategoryFilter, NewListing, UnknownCategory,
        },
    },
    social,
    store::AuctionStore,
};

pub const MAX_TITLE_LEN: usize = 32;
pub const MAX_DESCRIPTION_LEN: usize = 200;

const MANDATORY_FIELDS_MESSAGE: &str = "Title, description and starting bid are mandatory";

fn is_valid_image_url(url: &str) -> bool {
    lazy_static! {
        static ref URL_RE: Regex = Regex::new(r"^https?://[^\s/$.?#][^\s]*$").unwrap();
    }
    URL_RE.is_match(url)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Turns the submitted form into a [`NewListing`]; nothing is stored on failure.
pub fn validate_new_listing(req: CreateListingRequest, creator_id: Uuid) -> AppResult<NewListing> {
    let title = non_blank(req.title);
    let description = non_blank(req.description);
    let (Some(title), Some(description), Some(raw_price)) = (title, description, req.price) else {
        return Err(AppError::Validation(MANDATORY_FIELDS_MESSAGE.into()));
    };

    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "Title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(AppError::Validation(format!(
            "Description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }

    let price = raw_price
        .value()
        .ok_or_else(|| AppError::Validation("Starting bid must be a number".into()))?;

    let category = parse_listing_category(req.category.as_deref())
        .map_err(|e| AppError::Validation(format!("Unknown category: {}", e.0)))?;

    let image = non_blank(req.image);
    if let Some(url) = image.as_deref() {
        if !is_valid_image_url(url) {
            return Err(AppError::Validation("Image must be an http(s) URL".into()));
        }
    }

    Ok(NewListing {
        title,
        description,
        price,
        category,
        image,
        creator_id,
    })
}

pub async fn create_listing(
    store: &dyn AuctionStore,
    req: CreateListingRequest,
    creator_id: Uuid,
) -> AppResult<AuctionListing> {
    let new = validate_new_listing(req, creator_id)?;
    let listing = store.insert_listing(&new).await?;
    info!(listing_id = listing.id, %creator_id, price = ?listing.price, "listing created");
    Ok(listing)
}

pub async fn get_listing(store: &dyn AuctionStore, id: i64) -> AppResult<AuctionListing> {
    store
        .get_listing(id)
        .await?
        .ok_or(AppError::NotFound("listing"))
}

pub async fn list_active(store: &dyn AuctionStore) -> AppResult<Vec<AuctionListing>> {
    Ok(store.list_active(CategoryFilter::All).await?)
}

/// `--` lists every active listing.
pub async fn list_by_category(
    store: &dyn AuctionStore,
    category: &str,
) -> AppResult<Vec<AuctionListing>> {
    let filter: CategoryFilter = category
        .parse()
        .map_err(|e: UnknownCategory| AppError::Validation(format!("Unknown category: {}", e.0)))?;
    Ok(store.list_active(filter).await?)
}

/// Marks the listing inactive. Any authenticated requester may close any
/// listing unless `restrict_to_creator` is set.
pub async fn close_listing(
    store: &dyn AuctionStore,
    id: i64,
    requester: Uuid,
    restrict_to_creator: bool,
) -> AppResult<AuctionListing> {
    let listing = get_listing(store, id).await?;

    if listing.creator_id != requester {
        if restrict_to_creator {
            warn!(listing_id = id, %requester, "close refused: requester is not the creator");
            return Err(AppError::Forbidden(
                "Only the creator can close this listing".into(),
            ));
        }
        warn!(listing_id = id, %requester, creator_id = %listing.creator_id, "listing closed by non-creator");
    }

    let closed = store
        .close_listing(id)
        .await?
        .ok_or(AppError::NotFound("listing"))?;
    info!(listing_id = id, winner_id = ?closed.winner_id, price = ?closed.price, "listing closed");
    Ok(closed)
}

/// Listing page payload; watch state is only looked up for signed-in viewers.
pub async fn listing_details(
    store: &dyn AuctionStore,
    id: i64,
    viewer: Option<Uuid>,
) -> AppResult<ListingDetails> {
    let listing = get_listing(store, id).await?;
    let comments = social::services::list_comments(store, id).await?;
    let watchlisted = match viewer {
        Some(user_id) => store.is_watched(user_id, id).await?,
        None => false,
    };
    Ok(ListingDetails {
        active: listing.active,
        listing,
        comments,
        watchlisted,
        logged_in: viewer.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listings::dto::NumberInput;
    use crate::listings::repo_types::Category;
    use crate::store::memory::MemoryStore;

    fn lamp_request() -> CreateListingRequest {
        CreateListingRequest {
            title: Some("Lamp".into()),
            description: Some("Desk lamp".into()),
            price: Some(NumberInput::Number(10.0)),
            category: Some("Home".into()),
            image: None,
        }
    }

    #[tokio::test]
    async fn created_listing_is_active_without_winner() {
        let store = MemoryStore::new();
        let creator = Uuid::new_v4();
        let listing = create_listing(&store, lamp_request(), creator).await.unwrap();

        assert!(listing.active);
        assert_eq!(listing.price, Some(10.0));
        assert_eq!(listing.winner_id, None);
        assert_eq!(listing.category, Some(Category::Home));
        assert_eq!(listing.creator_id, creator);
        assert_eq!(get_listing(&store, listing.id).await.unwrap(), listing);
    }

    #[tokio::test]
    async fn empty_description_fails_and_persists_nothing() {
        let store = MemoryStore::new();
        let req = CreateListingRequest {
            description: Some("   ".into()),
            ..lamp_request()
        };
        let err = create_listing(&store, req, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(list_active(&store).await.unwrap().is_empty());
    }

    #[test]
    fn missing_price_or_title_is_mandatory_field_error() {
        for req in [
            CreateListingRequest {
                price: None,
                ..lamp_request()
            },
            CreateListingRequest {
                title: None,
                ..lamp_request()
            },
        ] {
            let err = validate_new_listing(req, Uuid::new_v4()).unwrap_err();
            assert_eq!(err.to_string(), MANDATORY_FIELDS_MESSAGE);
        }
    }

    #[test]
    fn field_limits_are_enforced() {
        let long_title = CreateListingRequest {
            title: Some("x".repeat(MAX_TITLE_LEN + 1)),
            ..lamp_request()
        };
        assert!(validate_new_listing(long_title, Uuid::new_v4()).is_err());

        let long_description = CreateListingRequest {
            description: Some("x".repeat(MAX_DESCRIPTION_LEN + 1)),
            ..lamp_request()
        };
        assert!(validate_new_listing(long_description, Uuid::new_v4()).is_err());

        let exact = CreateListingRequest {
            title: Some("x".repeat(MAX_TITLE_LEN)),
            description: Some("y".repeat(MAX_DESCRIPTION_LEN)),
            ..lamp_request()
        };
        assert!(validate_new_listing(exact, Uuid::new_v4()).is_ok());
    }

    #[test]
    fn category_and_image_are_checked() {
        let unknown = CreateListingRequest {
            category: Some("Garden".into()),
            ..lamp_request()
        };
        assert!(validate_new_listing(unknown, Uuid::new_v4()).is_err());

        let unset = CreateListingRequest {
            category: Some("--".into()),
            image: Some("https://example.com/lamp.png".into()),
            ..lamp_request()
        };
        let new = validate_new_listing(unset, Uuid::new_v4()).unwrap();
        assert_eq!(new.category, None);
        assert_eq!(new.image.as_deref(), Some("https://example.com/lamp.png"));

        let bad_image = CreateListingRequest {
            image: Some("lamp.png".into()),
            ..lamp_request()
        };
        assert!(validate_new_listing(bad_image, Uuid::new_v4()).is_err());
    }

    #[tokio::test]
    async fn non_numeric_price_is_rejected() {
        let store = MemoryStore::new();
        let req = CreateListingRequest {
            price: Some(NumberInput::Text("ten".into())),
            ..lamp_request()
        };
        assert!(create_listing(&store, req, Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn missing_listing_is_not_found() {
        let store = MemoryStore::new();
        let err = get_listing(&store, 42).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("listing")));
    }

    #[tokio::test]
    async fn category_browse_uses_sentinel_for_all() {
        let store = MemoryStore::new();
        let creator = Uuid::new_v4();
        create_listing(&store, lamp_request(), creator).await.unwrap();
        create_listing(
            &store,
            CreateListingRequest {
                category: Some("Toys".into()),
                ..lamp_request()
            },
            creator,
        )
        .await
        .unwrap();

        assert_eq!(list_by_category(&store, "--").await.unwrap().len(), 2);
        assert_eq!(list_by_category(&store, "Toys").await.unwrap().len(), 1);
        assert!(list_by_category(&store, "Fashion").await.unwrap().is_empty());
        assert!(matches!(
            list_by_category(&store, "Garden").await.unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn anyone_may_close_unless_restricted() {
        let store = MemoryStore::new();
        let creator = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let listing = create_listing(&store, lamp_request(), creator).await.unwrap();

        let err = close_listing(&store, listing.id, stranger, true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(get_listing(&store, listing.id).await.unwrap().active);

        let closed = close_listing(&store, listing.id, stranger, false)
            .await
            .unwrap();
        assert!(!closed.active);
        assert!(list_active(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn details_report_watch_state_only_for_viewers() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let listing = create_listing(&store, lamp_request(), user).await.unwrap();
        store.add_watch(user, listing.id).await.unwrap();

        let anonymous = listing_details(&store, listing.id, None).await.unwrap();
        assert!(!anonymous.watchlisted);
        assert!(!anonymous.logged_in);

        let viewer = listing_details(&store, listing.id, Some(user)).await.unwrap();
        assert!(viewer.watchlisted);
        assert!(viewer.logged_in);
        assert!(viewer.active);
    }
}
