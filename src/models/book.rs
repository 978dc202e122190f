//! Book (catalog) model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// Book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub isbn: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub total_copies: i32,
    pub available_copies: i32,
    /// Stored file name of the cover image, if any
    pub image: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Book details with the caller's borrow flag
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    /// Whether the requesting user currently has this book checked out
    pub is_borrowed: bool,
}

/// Book query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Substring search over title, author and description
    pub search: Option<String>,
    /// Exact category match
    pub category: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    /// ASC or DESC
    pub order: Option<String>,
}

/// Columns a book listing may be sorted by. Anything else falls back to
/// created_at so query parameters never reach the ORDER BY clause verbatim.
pub fn sort_column(requested: Option<&str>) -> &'static str {
    match requested {
        Some("id") => "id",
        Some("title") => "title",
        Some("author") => "author",
        Some("category") => "category",
        Some("publication_date") => "publication_date",
        _ => "created_at",
    }
}

/// Normalize the requested sort direction, defaulting to DESC.
pub fn sort_order(requested: Option<&str>) -> &'static str {
    match requested.map(str::to_uppercase).as_deref() {
        Some("ASC") => "ASC",
        _ => "DESC",
    }
}

/// Fields of a book create/update request. Assembled from the multipart
/// form in the API layer, so this is not a serde target.
#[derive(Debug, Default, Clone)]
pub struct BookFields {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub isbn: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub total_copies: Option<i32>,
    /// New cover image stored by the API layer before the service runs
    pub image: Option<String>,
}

/// Catalog aggregate statistics
#[derive(Debug, Serialize, ToSchema)]
pub struct BookStats {
    /// Total number of books in the catalog
    pub total: i64,
    /// Sum of available copies across all books
    pub available: i64,
    /// Number of currently active borrows
    pub borrowed: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_column_allow_list() {
        assert_eq!(sort_column(Some("title")), "title");
        assert_eq!(sort_column(Some("publication_date")), "publication_date");
        assert_eq!(sort_column(None), "created_at");
        // injection attempts fall back to the default column
        assert_eq!(sort_column(Some("id; DROP TABLE books")), "created_at");
        assert_eq!(sort_column(Some("created_at")), "created_at");
    }

    #[test]
    fn test_sort_order_normalization() {
        assert_eq!(sort_order(Some("asc")), "ASC");
        assert_eq!(sort_order(Some("ASC")), "ASC");
        assert_eq!(sort_order(Some("desc")), "DESC");
        assert_eq!(sort_order(Some("sideways")), "DESC");
        assert_eq!(sort_order(None), "DESC");
    }
}
