//! Persistence seam. Services only see [`AuctionStore`]; Postgres backs it in
//! production and [`memory::MemoryStore`] in dev mode and tests.

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::bidding::repo_types::{Bid, BidOutcome};
use crate::listings::repo_types::{AuctionListing, CategoryFilter, NewListing, UnknownCategory};
use crate::social::repo_types::{Comment, WatchListItem};

pub mod memory;
pub mod pg;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated on {0}")]
    Conflict(&'static str),

    #[error("corrupt row: {0}")]
    CorruptRow(#[from] UnknownCategory),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait AuctionStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the username is taken.
    async fn create_user(&self, username: &str, email: &str, password_hash: &str)
        -> StoreResult<User>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn insert_listing(&self, new: &NewListing) -> StoreResult<AuctionListing>;
    async fn get_listing(&self, id: i64) -> StoreResult<Option<AuctionListing>>;
    /// Active listings only, newest first.
    async fn list_active(&self, filter: CategoryFilter) -> StoreResult<Vec<AuctionListing>>;
    /// Returns `None` when the listing does not exist.
    async fn close_listing(&self, id: i64) -> StoreResult<Option<AuctionListing>>;

    /// Records the bid and moves price/winner only if `price` exceeds the
    /// current price of an active listing, as one atomic step.
    async fn place_bid(&self, listing_id: i64, bidder_id: Uuid, price: f64)
        -> StoreResult<BidOutcome>;
    /// Highest first.
    async fn list_bids(&self, listing_id: i64) -> StoreResult<Vec<Bid>>;

    async fn insert_comment(&self, listing_id: i64, author_id: Uuid, content: &str)
        -> StoreResult<Comment>;
    /// Insertion order.
    async fn list_comments(&self, listing_id: i64) -> StoreResult<Vec<Comment>>;

    /// Idempotent: returns the existing entry if the pair is already watched.
    async fn add_watch(&self, user_id: Uuid, listing_id: i64) -> StoreResult<WatchListItem>;
    /// Deletes every matching entry and returns how many went away.
    async fn remove_watch(&self, user_id: Uuid, listing_id: i64) -> StoreResult<u64>;
    async fn is_watched(&self, user_id: Uuid, listing_id: i64) -> StoreResult<bool>;
    /// Most recently watched first.
    async fn list_watchlist(&self, user_id: Uuid) -> StoreResult<Vec<AuctionListing>>;
}
