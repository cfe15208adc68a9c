use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::instrument;
use uuid::Uuid;

use super::{AuctionStore, StoreError, StoreResult};
use crate::auth::repo_types::User;
use crate::bidding::repo_types::{Bid, BidOutcome};
use crate::listings::repo_types::{AuctionListing, CategoryFilter, ListingRow, NewListing};
use crate::social::repo_types::{Comment, WatchListItem};

const LISTING_COLUMNS: &str = "id, title, description, price, category, image, active, \
                               creator_id, winner_id, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_listing(&self, id: i64) -> StoreResult<Option<AuctionListing>> {
        let sql = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1");
        let row = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(AuctionListing::try_from).transpose()?)
    }
}

fn unique_violation(e: sqlx::Error, what: &'static str) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(what),
        _ => StoreError::Database(e),
    }
}

fn into_listings(rows: Vec<ListingRow>) -> StoreResult<Vec<AuctionListing>> {
    rows.into_iter()
        .map(|r| AuctionListing::try_from(r).map_err(StoreError::from))
        .collect()
}

#[async_trait]
impl AuctionStore for PgStore {
    #[instrument(skip(self, password_hash))]
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "username"))
    }

    #[instrument(skip(self))]
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, username, email, password_hash, created_at FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    #[instrument(skip(self, new), fields(title = %new.title))]
    async fn insert_listing(&self, new: &NewListing) -> StoreResult<AuctionListing> {
        let sql = format!(
            r#"
            INSERT INTO listings (title, description, price, category, image, active, creator_id)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6)
            RETURNING {LISTING_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(&new.title)
            .bind(&new.description)
            .bind(new.price)
            .bind(new.category.map(|c| c.as_str()))
            .bind(new.image.as_deref())
            .bind(new.creator_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(AuctionListing::try_from(row)?)
    }

    #[instrument(skip(self))]
    async fn get_listing(&self, id: i64) -> StoreResult<Option<AuctionListing>> {
        self.fetch_listing(id).await
    }

    #[instrument(skip(self))]
    async fn list_active(&self, filter: CategoryFilter) -> StoreResult<Vec<AuctionListing>> {
        let rows = match filter {
            CategoryFilter::All => {
                let sql = format!(
                    "SELECT {LISTING_COLUMNS} FROM listings WHERE active \
                     ORDER BY created_at DESC, id DESC"
                );
                sqlx::query_as::<_, ListingRow>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
            CategoryFilter::Only(category) => {
                let sql = format!(
                    "SELECT {LISTING_COLUMNS} FROM listings WHERE active AND category = $1 \
                     ORDER BY created_at DESC, id DESC"
                );
                sqlx::query_as::<_, ListingRow>(&sql)
                    .bind(category.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        into_listings(rows)
    }

    #[instrument(skip(self))]
    async fn close_listing(&self, id: i64) -> StoreResult<Option<AuctionListing>> {
        let sql = format!("UPDATE listings SET active = FALSE WHERE id = $1 RETURNING {LISTING_COLUMNS}");
        let row = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(AuctionListing::try_from).transpose()?)
    }

    #[instrument(skip(self))]
    async fn place_bid(
        &self,
        listing_id: i64,
        bidder_id: Uuid,
        price: f64,
    ) -> StoreResult<BidOutcome> {
        let mut tx = self.pool.begin().await?;

        // The WHERE clause is the comparison; a losing racer updates nothing.
        let sql = format!(
            r#"
            UPDATE listings
               SET price = $2, winner_id = $3
             WHERE id = $1 AND active AND (price IS NULL OR price < $2)
            RETURNING {LISTING_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(listing_id)
            .bind(price)
            .bind(bidder_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = updated else {
            tx.rollback().await?;
            return Ok(match self.fetch_listing(listing_id).await? {
                None => BidOutcome::ListingMissing,
                Some(listing) if !listing.active => BidOutcome::Closed(listing),
                Some(listing) => BidOutcome::TooLow(listing),
            });
        };

        let bid = sqlx::query_as::<_, Bid>(
            r#"
            INSERT INTO bids (listing_id, bidder_id, price)
            VALUES ($1, $2, $3)
            RETURNING id, listing_id, bidder_id, price, created_at
            "#,
        )
        .bind(listing_id)
        .bind(bidder_id)
        .bind(price)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(BidOutcome::Accepted {
            bid,
            listing: AuctionListing::try_from(row)?,
        })
    }

    #[instrument(skip(self))]
    async fn list_bids(&self, listing_id: i64) -> StoreResult<Vec<Bid>> {
        let bids = sqlx::query_as::<_, Bid>(
            r#"
            SELECT id, listing_id, bidder_id, price, created_at
              FROM bids
             WHERE listing_id = $1
             ORDER BY price DESC, created_at ASC
            "#,
        )
        .bind(listing_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(bids)
    }

    #[instrument(skip(self, content))]
    async fn insert_comment(
        &self,
        listing_id: i64,
        author_id: Uuid,
        content: &str,
    ) -> StoreResult<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (listing_id, author_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, listing_id, author_id, content, created_at
            "#,
        )
        .bind(listing_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    #[instrument(skip(self))]
    async fn list_comments(&self, listing_id: i64) -> StoreResult<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, listing_id, author_id, content, created_at
              FROM comments
             WHERE listing_id = $1
             ORDER BY id ASC
            "#,
        )
        .bind(listing_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    #[instrument(skip(self))]
    async fn add_watch(&self, user_id: Uuid, listing_id: i64) -> StoreResult<WatchListItem> {
        // the no-op update makes RETURNING yield the existing row on conflict
        let item = sqlx::query_as::<_, WatchListItem>(
            r#"
            INSERT INTO watchlist_items (user_id, listing_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, listing_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id, user_id, listing_id, created_at
            "#,
        )
        .bind(user_id)
        .bind(listing_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(item)
    }

    #[instrument(skip(self))]
    async fn remove_watch(&self, user_id: Uuid, listing_id: i64) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM watchlist_items WHERE user_id = $1 AND listing_id = $2")
            .bind(user_id)
            .bind(listing_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn is_watched(&self, user_id: Uuid, listing_id: i64) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM watchlist_items WHERE user_id = $1 AND listing_id = $2)",
        )
        .bind(user_id)
        .bind(listing_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn list_watchlist(&self, user_id: Uuid) -> StoreResult<Vec<AuctionListing>> {
        let rows = sqlx::query_as::<_, ListingRow>(
            r#"
            SELECT l.id, l.title, l.description, l.price, l.category, l.image, l.active,
                   l.creator_id, l.winner_id, l.created_at
              FROM watchlist_items w
              JOIN listings l ON l.id = w.listing_id
             WHERE w.user_id = $1
             ORDER BY w.created_at DESC, w.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        into_listings(rows)
    }
}
