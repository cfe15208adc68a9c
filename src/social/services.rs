use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    listings::{repo_types::AuctionListing, services::get_listing},
    social::repo_types::{Comment, WatchListItem},
    store::AuctionStore,
};

pub const MAX_COMMENT_LEN: usize = 200;

/// At most one entry per (user, listing); watching twice returns the first entry.
pub async fn add_to_watchlist(
    store: &dyn AuctionStore,
    user_id: Uuid,
    listing_id: i64,
) -> AppResult<WatchListItem> {
    get_listing(store, listing_id).await?;
    let item = store.add_watch(user_id, listing_id).await?;
    info!(%user_id, listing_id, item_id = item.id, "listing watched");
    Ok(item)
}

/// Removes every entry for the pair; `NotFound` when there was none.
pub async fn remove_from_watchlist(
    store: &dyn AuctionStore,
    user_id: Uuid,
    listing_id: i64,
) -> AppResult<()> {
    let removed = store.remove_watch(user_id, listing_id).await?;
    if removed == 0 {
        return Err(AppError::NotFound("watchlist entry"));
    }
    info!(%user_id, listing_id, removed, "listing unwatched");
    Ok(())
}

pub async fn watchlist(store: &dyn AuctionStore, user_id: Uuid) -> AppResult<Vec<AuctionListing>> {
    Ok(store.list_watchlist(user_id).await?)
}

/// Blank content is ignored and yields `None`.
pub async fn post_comment(
    store: &dyn AuctionStore,
    listing_id: i64,
    author_id: Uuid,
    content: Option<&str>,
) -> AppResult<Option<Comment>> {
    let Some(content) = content.map(str::trim).filter(|c| !c.is_empty()) else {
        debug!(listing_id, %author_id, "empty comment ignored");
        return Ok(None);
    };
    if content.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::Validation(format!(
            "Comment must be at most {MAX_COMMENT_LEN} characters"
        )));
    }
    get_listing(store, listing_id).await?;
    let comment = store.insert_comment(listing_id, author_id, content).await?;
    info!(listing_id, %author_id, comment_id = comment.id, "comment posted");
    Ok(Some(comment))
}

pub async fn list_comments(store: &dyn AuctionStore, listing_id: i64) -> AppResult<Vec<Comment>> {
    Ok(store.list_comments(listing_id).await?)
}
