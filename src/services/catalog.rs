//! Catalog service: book CRUD, search and statistics

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookDetails, BookFields, BookQuery, BookStats},
    repository::Repository,
};

use super::storage::ImageStore;

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    images: ImageStore,
}

impl CatalogService {
    pub fn new(repository: Repository, images: ImageStore) -> Self {
        Self { repository, images }
    }

    /// Search books with filters and pagination. Returns the page of books
    /// and the total match count.
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        self.repository.books.search(query).await
    }

    /// Get a book with the caller's borrow flag. Anonymous callers always
    /// see is_borrowed = false.
    pub async fn get_book(&self, id: i32, viewer: Option<i32>) -> AppResult<BookDetails> {
        let book = self.repository.books.get_by_id(id).await?;

        let is_borrowed = match viewer {
            Some(user_id) => self.repository.borrows.has_active_borrow(user_id, id).await?,
            None => false,
        };

        Ok(BookDetails { book, is_borrowed })
    }

    /// Create a book from the assembled form fields.
    pub async fn create_book(&self, fields: BookFields) -> AppResult<Book> {
        let title = require_text(fields.title, "Title is required")?;
        let author = require_text(fields.author, "Author is required")?;

        let total_copies = fields.total_copies.unwrap_or(1);
        if total_copies < 0 {
            return Err(AppError::Validation(
                "Number of copies cannot be negative".to_string(),
            ));
        }

        let book = Book {
            id: 0,
            title,
            author,
            description: fields.description,
            category: fields.category,
            isbn: fields.isbn,
            publication_date: fields.publication_date,
            total_copies,
            available_copies: total_copies,
            image: fields.image,
            created_at: None,
        };

        let created = self.repository.books.create(&book).await?;
        tracing::info!(book_id = created.id, "Book created");

        Ok(created)
    }

    /// Update a book. Fields absent from the form keep their current value.
    /// Changing the copy count shifts the available count by the same delta.
    pub async fn update_book(&self, id: i32, fields: BookFields) -> AppResult<Book> {
        let current = self.repository.books.get_by_id(id).await?;

        let total_copies = fields.total_copies.unwrap_or(current.total_copies);
        if total_copies < 0 {
            return Err(AppError::Validation(
                "Number of copies cannot be negative".to_string(),
            ));
        }

        let available_copies =
            adjust_available(current.available_copies, current.total_copies, total_copies);

        let new_image = fields.image.is_some();
        let updated = Book {
            id,
            title: fields.title.unwrap_or(current.title),
            author: fields.author.unwrap_or(current.author),
            description: fields.description.or(current.description),
            category: fields.category.or(current.category),
            isbn: fields.isbn.or(current.isbn),
            publication_date: fields.publication_date.or(current.publication_date),
            total_copies,
            available_copies,
            image: fields.image.or_else(|| current.image.clone()),
            created_at: current.created_at,
        };

        let book = self.repository.books.update(id, &updated).await?;

        // old cover is unreachable once the row points at the new one
        if new_image {
            if let Some(old) = current.image {
                self.images.delete(&old).await;
            }
        }

        Ok(book)
    }

    /// Delete a book and its stored cover image.
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        let book = self.repository.books.get_by_id(id).await?;

        self.repository.books.delete(id).await?;

        if let Some(image) = book.image {
            self.images.delete(&image).await;
        }

        tracing::info!(book_id = id, "Book deleted");

        Ok(())
    }

    /// Distinct categories in the catalog
    pub async fn categories(&self) -> AppResult<Vec<String>> {
        self.repository.books.categories().await
    }

    /// Aggregate catalog statistics
    pub async fn stats(&self) -> AppResult<BookStats> {
        self.repository.books.stats().await
    }
}

fn require_text(value: Option<String>, message: &str) -> AppResult<String> {
    match value {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(AppError::Validation(message.to_string())),
    }
}

/// Recompute the available count when the copy total changes. The delta is
/// applied to the current availability and clamped to [0, new_total] so
/// outstanding loans never push it negative.
fn adjust_available(available: i32, old_total: i32, new_total: i32) -> i32 {
    (available + (new_total - old_total)).clamp(0, new_total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjust_available_follows_delta() {
        // 3 of 5 available, total grows to 8: availability grows by 3
        assert_eq!(adjust_available(3, 5, 8), 6);
        // total shrinks by 2: availability shrinks by 2
        assert_eq!(adjust_available(3, 5, 3), 1);
    }

    #[test]
    fn test_adjust_available_clamps() {
        // 1 of 5 available, total drops to 2: delta would go negative
        assert_eq!(adjust_available(1, 5, 2), 0);
        // availability can never exceed the new total
        assert_eq!(adjust_available(5, 5, 2), 2);
        assert_eq!(adjust_available(0, 3, 0), 0);
    }

    #[test]
    fn test_require_text() {
        assert!(require_text(None, "x").is_err());
        assert!(require_text(Some("  ".to_string()), "x").is_err());
        assert_eq!(require_text(Some("ok".to_string()), "x").unwrap(), "ok");
    }
}
