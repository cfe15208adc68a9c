use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    bidding::repo_types::{Bid, BidOutcome},
    error::{AppError, AppResult},
    listings::{dto::NumberInput, repo_types::AuctionListing, services::get_listing},
    store::AuctionStore,
};

/// Places a bid that must strictly exceed the current price. On success the
/// listing's price and winner already reflect the bid.
pub async fn place_bid(
    store: &dyn AuctionStore,
    listing_id: i64,
    bid: Option<&NumberInput>,
    bidder_id: Uuid,
) -> AppResult<(Bid, AuctionListing)> {
    let Some(price) = bid.and_then(NumberInput::value) else {
        let listing = get_listing(store, listing_id).await?;
        warn!(listing_id, %bidder_id, "bid rejected: not a number");
        return Err(AppError::invalid_bid(Some(listing)));
    };

    match store.place_bid(listing_id, bidder_id, price).await? {
        BidOutcome::Accepted { bid, listing } => {
            info!(listing_id, %bidder_id, price, bid_id = bid.id, "bid accepted");
            Ok((bid, listing))
        }
        BidOutcome::TooLow(listing) => {
            warn!(listing_id, %bidder_id, price, current = ?listing.price, "bid rejected: too low");
            Err(AppError::invalid_bid(Some(listing)))
        }
        BidOutcome::Closed(listing) => {
            warn!(listing_id, %bidder_id, price, "bid rejected: listing closed");
            Err(AppError::ListingClosed {
                listing: Box::new(listing),
            })
        }
        BidOutcome::ListingMissing => Err(AppError::NotFound("listing")),
    }
}

/// Bid history of a listing, highest first.
pub async fn list_bids(store: &dyn AuctionStore, listing_id: i64) -> AppResult<Vec<Bid>> {
    get_listing(store, listing_id).await?;
    Ok(store.list_bids(listing_id).await?)
}
