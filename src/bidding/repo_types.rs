use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::listings::repo_types::AuctionListing;

/// Accepted bid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Bid {
    pub id: i64,
    pub listing_id: i64,
    pub bidder_id: Uuid,
    pub price: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Result of the atomic compare-and-update a store performs for a bid.
#[derive(Debug, Clone, PartialEq)]
pub enum BidOutcome {
    Accepted { bid: Bid, listing: AuctionListing },
    /// Price did not exceed the current one; listing is returned unchanged.
    TooLow(AuctionListing),
    Closed(AuctionListing),
    ListingMissing,
}
