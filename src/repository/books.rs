//! Books repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{sort_column, sort_order, Book, BookQuery, BookStats},
};

const BOOK_COLUMNS: &str = "id, title, author, description, category, isbn, \
     publication_date, total_copies, available_copies, image, created_at";

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Search books with filters and pagination.
    ///
    /// The sort column and direction go through an allow-list; search and
    /// category values are bound parameters.
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(10).clamp(1, 100);
        let offset = (page - 1) * limit;

        let mut conditions = vec!["1=1".to_string()];
        let mut binds: Vec<String> = Vec::new();

        if let Some(ref search) = query.search {
            if !search.is_empty() {
                binds.push(format!("%{}%", search));
                let n = binds.len();
                conditions.push(format!(
                    "(title ILIKE ${n} OR author ILIKE ${n} OR description ILIKE ${n})"
                ));
            }
        }

        if let Some(ref category) = query.category {
            if !category.is_empty() {
                binds.push(category.clone());
                conditions.push(format!("category = ${}", binds.len()));
            }
        }

        let where_clause = conditions.join(" AND ");

        let count_query = format!("SELECT COUNT(*) FROM books WHERE {}", where_clause);
        let mut count = sqlx::query_scalar::<_, i64>(&count_query);
        for bind in &binds {
            count = count.bind(bind);
        }
        let total = count.fetch_one(&self.pool).await?;

        let select_query = format!(
            "SELECT {} FROM books WHERE {} ORDER BY {} {} LIMIT {} OFFSET {}",
            BOOK_COLUMNS,
            where_clause,
            sort_column(query.sort_by.as_deref()),
            sort_order(query.order.as_deref()),
            limit,
            offset
        );
        let mut select = sqlx::query_as::<_, Book>(&select_query);
        for bind in &binds {
            select = select.bind(bind);
        }
        let books = select.fetch_all(&self.pool).await?;

        Ok((books, total))
    }

    /// Create a new book. All copies start available.
    pub async fn create(&self, book: &Book) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (
                title, author, description, category, isbn, publication_date,
                total_copies, available_copies, image, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $8, NOW())
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.description)
        .bind(&book.category)
        .bind(&book.isbn)
        .bind(book.publication_date)
        .bind(book.total_copies)
        .bind(&book.image)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Full replace of a book's mutable fields, including the recomputed
    /// available-copy count.
    pub async fn update(&self, id: i32, book: &Book) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books SET
                title = $1, author = $2, description = $3, category = $4,
                isbn = $5, publication_date = $6, total_copies = $7,
                available_copies = $8, image = $9
            WHERE id = $10
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.description)
        .bind(&book.category)
        .bind(&book.isbn)
        .bind(book.publication_date)
        .bind(book.total_copies)
        .bind(book.available_copies)
        .bind(&book.image)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Delete a book
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        Ok(())
    }

    /// Distinct non-null categories
    pub async fn categories(&self) -> AppResult<Vec<String>> {
        let categories: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT category FROM books WHERE category IS NOT NULL ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Aggregate catalog statistics
    pub async fn stats(&self) -> AppResult<BookStats> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;

        let available: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(available_copies), 0) FROM books")
                .fetch_one(&self.pool)
                .await?;

        let borrowed: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM borrows WHERE status = 'ACTIVE'")
                .fetch_one(&self.pool)
                .await?;

        Ok(BookStats {
            total,
            available,
            borrowed,
        })
    }
}
