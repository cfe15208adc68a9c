use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Wire value meaning "no category" on creation and "every category" when filtering.
pub const ANY_CATEGORY: &str = "--";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Fashion,
    Toys,
    Electronics,
    Home,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Fashion,
        Category::Toys,
        Category::Electronics,
        Category::Home,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Fashion => "Fashion",
            Category::Toys => "Toys",
            Category::Electronics => "Electronics",
            Category::Home => "Home",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Category selector used by the browse routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(Category),
}

impl FromStr for CategoryFilter {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ANY_CATEGORY {
            return Ok(CategoryFilter::All);
        }
        s.parse().map(CategoryFilter::Only)
    }
}

impl CategoryFilter {
    pub fn matches(self, category: Option<Category>) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => category == Some(wanted),
        }
    }
}

/// Parses the optional category of a new listing; `--` and blank mean unset.
pub fn parse_listing_category(raw: Option<&str>) -> Result<Option<Category>, UnknownCategory> {
    match raw.map(str::trim) {
        None | Some("") | Some(ANY_CATEGORY) => Ok(None),
        Some(name) => name.parse().map(Some),
    }
}

/// Choices offered by category pickers, sentinel first.
pub fn category_choices() -> Vec<&'static str> {
    std::iter::once(ANY_CATEGORY)
        .chain(Category::ALL.iter().map(|c| c.as_str()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionListing {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// Current price: the starting price until the first accepted bid.
    pub price: Option<f64>,
    pub category: Option<Category>,
    pub image: Option<String>,
    pub active: bool,
    pub creator_id: Uuid,
    pub winner_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Validated input for a new listing.
#[derive(Debug, Clone, PartialEq)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: Option<Category>,
    pub image: Option<String>,
    pub creator_id: Uuid,
}

/// Raw `listings` row; category is stored as text.
#[derive(Debug, Clone, FromRow)]
pub struct ListingRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub active: bool,
    pub creator_id: Uuid,
    pub winner_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
}

impl TryFrom<ListingRow> for AuctionListing {
    type Error = UnknownCategory;

    fn try_from(r: ListingRow) -> Result<Self, Self::Error> {
        let category = r.category.as_deref().map(str::parse::<Category>).transpose()?;
        Ok(Self {
            id: r.id,
            title: r.title,
            description: r.description,
            price: r.price,
            category,
            image: r.image,
            active: r.active,
            creator_id: r.creator_id,
            winner_id: r.winner_id,
            created_at: r.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_filter_sentinel_means_all() {
        assert_eq!("--".parse::<CategoryFilter>(), Ok(CategoryFilter::All));
        assert_eq!(
            "Toys".parse::<CategoryFilter>(),
            Ok(CategoryFilter::Only(Category::Toys))
        );
        assert!("Garden".parse::<CategoryFilter>().is_err());
    }

    #[test]
    fn category_names_are_case_sensitive() {
        assert!("home".parse::<Category>().is_err());
        assert_eq!("Home".parse::<Category>(), Ok(Category::Home));
    }

    #[test]
    fn listing_category_treats_sentinel_and_blank_as_unset() {
        assert_eq!(parse_listing_category(None), Ok(None));
        assert_eq!(parse_listing_category(Some("--")), Ok(None));
        assert_eq!(parse_listing_category(Some("  ")), Ok(None));
        assert_eq!(
            parse_listing_category(Some("Electronics")),
            Ok(Some(Category::Electronics))
        );
    }

    #[test]
    fn choices_start_with_sentinel() {
        assert_eq!(
            category_choices(),
            vec!["--", "Fashion", "Toys", "Electronics", "Home"]
        );
    }

    #[test]
    fn filter_matches_only_its_category() {
        assert!(CategoryFilter::All.matches(None));
        assert!(CategoryFilter::Only(Category::Home).matches(Some(Category::Home)));
        assert!(!CategoryFilter::Only(Category::Home).matches(Some(Category::Toys)));
        assert!(!CategoryFilter::Only(Category::Home).matches(None));
    }
}
