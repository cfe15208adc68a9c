use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{AuctionStore, StoreError, StoreResult};
use crate::auth::repo_types::User;
use crate::bidding::repo_types::{Bid, BidOutcome};
use crate::listings::repo_types::{AuctionListing, CategoryFilter, NewListing};
use crate::social::repo_types::{Comment, WatchListItem};

/// Process-local store. One lock covers every table, so each trait call is
/// atomic with respect to the others.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    listings: BTreeMap<i64, AuctionListing>,
    bids: Vec<Bid>,
    comments: Vec<Comment>,
    watchlist: Vec<WatchListItem>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuctionStore for MemoryStore {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> StoreResult<User> {
        let mut t = self.inner.lock().await;
        if t.users.iter().any(|u| u.username == username) {
            return Err(StoreError::Conflict("username"));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let t = self.inner.lock().await;
        Ok(t.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let t = self.inner.lock().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert_listing(&self, new: &NewListing) -> StoreResult<AuctionListing> {
        let mut t = self.inner.lock().await;
        let listing = AuctionListing {
            id: t.next_id(),
            title: new.title.clone(),
            description: new.description.clone(),
            price: Some(new.price),
            category: new.category,
            image: new.image.clone(),
            active: true,
            creator_id: new.creator_id,
            winner_id: None,
            created_at: OffsetDateTime::now_utc(),
        };
        t.listings.insert(listing.id, listing.clone());
        Ok(listing)
    }

    async fn get_listing(&self, id: i64) -> StoreResult<Option<AuctionListing>> {
        let t = self.inner.lock().await;
        Ok(t.listings.get(&id).cloned())
    }

    async fn list_active(&self, filter: CategoryFilter) -> StoreResult<Vec<AuctionListing>> {
        let t = self.inner.lock().await;
        Ok(t.listings
            .values()
            .rev()
            .filter(|l| l.active && filter.matches(l.category))
            .cloned()
            .collect())
    }

    async fn close_listing(&self, id: i64) -> StoreResult<Option<AuctionListing>> {
        let mut t = self.inner.lock().await;
        Ok(t.listings.get_mut(&id).map(|l| {
            l.active = false;
            l.clone()
        }))
    }

    async fn place_bid(
        &self,
        listing_id: i64,
        bidder_id: Uuid,
        price: f64,
    ) -> StoreResult<BidOutcome> {
        let mut t = self.inner.lock().await;

        let Some(listing) = t.listings.get_mut(&listing_id) else {
            return Ok(BidOutcome::ListingMissing);
        };
        if !listing.active {
            return Ok(BidOutcome::Closed(listing.clone()));
        }
        if listing.price.is_some_and(|current| price <= current) {
            return Ok(BidOutcome::TooLow(listing.clone()));
        }

        listing.price = Some(price);
        listing.winner_id = Some(bidder_id);
        let listing = listing.clone();

        let bid = Bid {
            id: t.next_id(),
            listing_id,
            bidder_id,
            price,
            created_at: OffsetDateTime::now_utc(),
        };
        t.bids.push(bid.clone());

        Ok(BidOutcome::Accepted { bid, listing })
    }

    async fn list_bids(&self, listing_id: i64) -> StoreResult<Vec<Bid>> {
        let t = self.inner.lock().await;
        let mut bids: Vec<Bid> = t
            .bids
            .iter()
            .filter(|b| b.listing_id == listing_id)
            .cloned()
            .collect();
        bids.sort_by(|a, b| b.price.total_cmp(&a.price).then(a.id.cmp(&b.id)));
        Ok(bids)
    }

    async fn insert_comment(
        &self,
        listing_id: i64,
        author_id: Uuid,
        content: &str,
    ) -> StoreResult<Comment> {
        let mut t = self.inner.lock().await;
        let comment = Comment {
            id: t.next_id(),
            listing_id,
            author_id,
            content: content.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        t.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, listing_id: i64) -> StoreResult<Vec<Comment>> {
        let t = self.inner.lock().await;
        Ok(t.comments
            .iter()
            .filter(|c| c.listing_id == listing_id)
            .cloned()
            .collect())
    }

    async fn add_watch(&self, user_id: Uuid, listing_id: i64) -> StoreResult<WatchListItem> {
        let mut t = self.inner.lock().await;
        if let Some(existing) = t
            .watchlist
            .iter()
            .find(|w| w.user_id == user_id && w.listing_id == listing_id)
        {
            return Ok(existing.clone());
        }
        let item = WatchListItem {
            id: t.next_id(),
            user_id,
            listing_id,
            created_at: OffsetDateTime::now_utc(),
        };
        t.watchlist.push(item.clone());
        Ok(item)
    }

    async fn remove_watch(&self, user_id: Uuid, listing_id: i64) -> StoreResult<u64> {
        let mut t = self.inner.lock().await;
        let before = t.watchlist.len();
        t.watchlist
            .retain(|w| !(w.user_id == user_id && w.listing_id == listing_id));
        Ok((before - t.watchlist.len()) as u64)
    }

    async fn is_watched(&self, user_id: Uuid, listing_id: i64) -> StoreResult<bool> {
        let t = self.inner.lock().await;
        Ok(t.watchlist
            .iter()
            .any(|w| w.user_id == user_id && w.listing_id == listing_id))
    }

    async fn list_watchlist(&self, user_id: Uuid) -> StoreResult<Vec<AuctionListing>> {
        let t = self.inner.lock().await;
        Ok(t.watchlist
            .iter()
            .rev()
            .filter(|w| w.user_id == user_id)
            .filter_map(|w| t.listings.get(&w.listing_id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listings::repo_types::Category;

    fn lamp(creator_id: Uuid) -> NewListing {
        NewListing {
            title: "Lamp".into(),
            description: "Desk lamp".into(),
            price: 10.0,
            category: Some(Category::Home),
            image: None,
            creator_id,
        }
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let store = MemoryStore::new();
        store.create_user("alice", "a@example.com", "h").await.unwrap();
        let err = store
            .create_user("alice", "other@example.com", "h")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict("username")));
    }

    #[tokio::test]
    async fn equal_bid_is_too_low_and_leaves_listing_untouched() {
        let store = MemoryStore::new();
        let creator = Uuid::new_v4();
        let listing = store.insert_listing(&lamp(creator)).await.unwrap();

        let outcome = store.place_bid(listing.id, Uuid::new_v4(), 10.0).await.unwrap();
        assert_eq!(outcome, BidOutcome::TooLow(listing.clone()));
        assert!(store.list_bids(listing.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_bids_do_not_consume_ids() {
        let store = MemoryStore::new();
        let creator = Uuid::new_v4();
        let listing = store.insert_listing(&lamp(creator)).await.unwrap();

        store.place_bid(listing.id, Uuid::new_v4(), 5.0).await.unwrap();
        store.place_bid(listing.id + 100, Uuid::new_v4(), 50.0).await.unwrap();

        let next = store.insert_listing(&lamp(creator)).await.unwrap();
        assert_eq!(next.id, listing.id + 1);
    }

    #[tokio::test]
    async fn bid_on_unpriced_listing_is_accepted() {
        let store = MemoryStore::new();
        let listing = store.insert_listing(&lamp(Uuid::new_v4())).await.unwrap();
        store.inner.lock().await.listings.get_mut(&listing.id).unwrap().price = None;

        let bidder = Uuid::new_v4();
        match store.place_bid(listing.id, bidder, 0.5).await.unwrap() {
            BidOutcome::Accepted { listing, .. } => {
                assert_eq!(listing.price, Some(0.5));
                assert_eq!(listing.winner_id, Some(bidder));
            }
            other => panic!("expected acceptance, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bids_are_listed_highest_first() {
        let store = MemoryStore::new();
        let listing = store.insert_listing(&lamp(Uuid::new_v4())).await.unwrap();
        for price in [11.0, 12.5, 20.0] {
            store.place_bid(listing.id, Uuid::new_v4(), price).await.unwrap();
        }
        let prices: Vec<f64> = store
            .list_bids(listing.id)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.price)
            .collect();
        assert_eq!(prices, vec![20.0, 12.5, 11.0]);
    }

    #[tokio::test]
    async fn watch_pairs_are_unique() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let listing = store.insert_listing(&lamp(user)).await.unwrap();

        let first = store.add_watch(user, listing.id).await.unwrap();
        let second = store.add_watch(user, listing.id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.remove_watch(user, listing.id).await.unwrap(), 1);
        assert_eq!(store.remove_watch(user, listing.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn active_listings_filter_by_category_newest_first() {
        let store = MemoryStore::new();
        let creator = Uuid::new_v4();
        let home = store.insert_listing(&lamp(creator)).await.unwrap();
        let toy = store
            .insert_listing(&NewListing {
                title: "Robot".into(),
                category: Some(Category::Toys),
                ..lamp(creator)
            })
            .await
            .unwrap();
        let closed = store.insert_listing(&lamp(creator)).await.unwrap();
        store.close_listing(closed.id).await.unwrap();

        let all: Vec<i64> = store
            .list_active(CategoryFilter::All)
            .await
            .unwrap()
            .iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(all, vec![toy.id, home.id]);

        let toys = store
            .list_active(CategoryFilter::Only(Category::Toys))
            .await
            .unwrap();
        assert_eq!(toys.len(), 1);
        assert_eq!(toys[0].id, toy.id);
    }
}
