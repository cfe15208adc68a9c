use serde::{Deserialize, Serialize};

use crate::listings::repo_types::AuctionListing;
use crate::social::repo_types::Comment;

/// A number as submitted by a form: either a JSON number or its text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Number(f64),
    Text(String),
}

impl NumberInput {
    /// The finite value, or `None` when the input is not a usable number.
    pub fn value(&self) -> Option<f64> {
        let v = match self {
            NumberInput::Number(n) => *n,
            NumberInput::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        v.is_finite().then_some(v)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateListingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<NumberInput>,
    pub category: Option<String>,
    pub image: Option<String>,
}

/// Body of `POST /listing/:id`, one variant per form button.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action")]
pub enum ListingAction {
    Watchlist,
    Close,
    #[serde(rename = "Remove from Watchlist")]
    RemoveFromWatchlist,
    #[serde(rename = "Post Comment")]
    PostComment {
        #[serde(default)]
        comment: Option<String>,
    },
    Bid {
        #[serde(default)]
        bid: Option<NumberInput>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListingDetails {
    pub listing: AuctionListing,
    pub comments: Vec<Comment>,
    pub watchlisted: bool,
    pub logged_in: bool,
    pub active: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryChoices {
    pub categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryPick {
    pub category: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryListings {
    pub category: String,
    pub categories: Vec<String>,
    pub listings: Vec<AuctionListing>,
}
