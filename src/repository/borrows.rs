//! Borrows repository: the workflow engine's state transitions.
//!
//! Every transition that touches both a borrow row and a book's copy count
//! (validate, return) runs inside a single transaction. The borrow row is
//! locked with FOR UPDATE and the copy-count change is a guarded UPDATE, so
//! two admins validating the last copy concurrently cannot both succeed.

use chrono::Utc;

use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::borrow::{
        expected_return_date, Borrow, BorrowDetails, BorrowQuery, BorrowStats, BorrowStatus,
        ValidationAction, ValidationHistoryEntry, MAX_PENDING_REQUESTS,
    },
};

const DETAILS_QUERY: &str = r#"
    SELECT b.id, b.user_id, b.book_id, b.request_date, b.expected_return_date,
           b.actual_return_date, b.status, b.validation_date, b.admin_id,
           b.rejection_reason,
           bk.title, bk.author, bk.image,
           u.name AS user_name, u.email AS user_email
    FROM borrows b
    JOIN books bk ON b.book_id = bk.id
    JOIN users u ON b.user_id = u.id
"#;

#[derive(Clone)]
pub struct BorrowsRepository {
    pool: Pool<Postgres>,
}

impl BorrowsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get borrow by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Borrow> {
        sqlx::query_as::<_, Borrow>("SELECT * FROM borrows WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow with id {} not found", id)))
    }

    /// Get borrow with book and user details
    pub async fn get_details_by_id(&self, id: i32) -> AppResult<BorrowDetails> {
        sqlx::query_as::<_, BorrowDetails>(&format!("{} WHERE b.id = $1", DETAILS_QUERY))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow with id {} not found", id)))
    }

    /// All borrows of one user, newest request first
    pub async fn find_by_user(&self, user_id: i32) -> AppResult<Vec<BorrowDetails>> {
        let borrows = sqlx::query_as::<_, BorrowDetails>(&format!(
            "{} WHERE b.user_id = $1 ORDER BY b.request_date DESC, b.id DESC",
            DETAILS_QUERY
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(borrows)
    }

    /// Paginated borrow listing, optionally filtered by status
    pub async fn search(&self, query: &BorrowQuery) -> AppResult<(Vec<BorrowDetails>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(10).clamp(1, 100);
        let offset = (page - 1) * limit;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrows WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(query.status.map(|s| s.as_str()))
        .fetch_one(&self.pool)
        .await?;

        let borrows = sqlx::query_as::<_, BorrowDetails>(&format!(
            r#"{}
            WHERE ($1::text IS NULL OR b.status = $1)
            ORDER BY b.request_date DESC, b.id DESC
            LIMIT {} OFFSET {}
            "#,
            DETAILS_QUERY, limit, offset
        ))
        .bind(query.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        Ok((borrows, total))
    }

    /// Check whether the user currently has this book checked out
    pub async fn has_active_borrow(&self, user_id: i32, book_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM borrows
                WHERE user_id = $1 AND book_id = $2 AND status IN ('ACTIVE', 'OVERDUE')
            )
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Submit a borrow request. Enforces the duplicate-pending rule and the
    /// per-user pending quota, then creates the borrow in PENDING.
    pub async fn create_request(&self, user_id: i32, book_id: i32) -> AppResult<Borrow> {
        let duplicate: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM borrows
                WHERE user_id = $1 AND book_id = $2 AND status = 'PENDING'
            )
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;

        if duplicate {
            return Err(AppError::Conflict(
                "You already have a pending request for this book".to_string(),
            ));
        }

        let pending_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrows WHERE user_id = $1 AND status = 'PENDING'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        if pending_count >= MAX_PENDING_REQUESTS {
            return Err(AppError::QuotaExceeded(format!(
                "Too many pending requests (max: {})",
                MAX_PENDING_REQUESTS
            )));
        }

        let today = Utc::now().date_naive();
        let due = expected_return_date(today);

        let borrow = sqlx::query_as::<_, Borrow>(
            r#"
            INSERT INTO borrows (user_id, book_id, request_date, expected_return_date, status)
            VALUES ($1, $2, $3, $4, 'PENDING')
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(today)
        .bind(due)
        .fetch_one(&self.pool)
        .await?;

        Ok(borrow)
    }

    /// Validate a pending request: promote it to ACTIVE, take one copy and
    /// append a VALIDATE audit entry, all in one transaction.
    pub async fn validate(&self, borrow_id: i32, admin_id: i32) -> AppResult<Borrow> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT book_id, status FROM borrows WHERE id = $1 FOR UPDATE")
            .bind(borrow_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow with id {} not found", borrow_id)))?;

        let status: BorrowStatus = row.get("status");
        let book_id: i32 = row.get("book_id");

        if !status.is_pending() {
            return Err(AppError::InvalidState(
                "This request can no longer be validated".to_string(),
            ));
        }

        // Guarded decrement: zero rows affected means no copy was left.
        let taken = sqlx::query(
            r#"
            UPDATE books SET available_copies = available_copies - 1
            WHERE id = $1 AND available_copies > 0
            "#,
        )
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

        if taken.rows_affected() == 0 {
            return Err(AppError::Unavailable("Book is not available".to_string()));
        }

        let borrow = sqlx::query_as::<_, Borrow>(
            r#"
            UPDATE borrows SET status = 'ACTIVE', validation_date = $1, admin_id = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(Utc::now().date_naive())
        .bind(admin_id)
        .bind(borrow_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO validation_history (borrow_id, admin_id, action, created_at) \
             VALUES ($1, $2, 'VALIDATE', NOW())",
        )
        .bind(borrow_id)
        .bind(admin_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(borrow)
    }

    /// Refuse a pending request with a reason
    pub async fn refuse(&self, borrow_id: i32, admin_id: i32, reason: &str) -> AppResult<Borrow> {
        self.reject(borrow_id, Some(admin_id), reason, ValidationAction::Refuse)
            .await
    }

    /// Cancel a pending request. Cancellation shares the REFUSED terminal
    /// state with refusal; only the audit action tag differs.
    pub async fn cancel(
        &self,
        borrow_id: i32,
        admin_id: Option<i32>,
        reason: &str,
    ) -> AppResult<Borrow> {
        self.reject(borrow_id, admin_id, reason, ValidationAction::Cancel)
            .await
    }

    async fn reject(
        &self,
        borrow_id: i32,
        admin_id: Option<i32>,
        reason: &str,
        action: ValidationAction,
    ) -> AppResult<Borrow> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT status FROM borrows WHERE id = $1 FOR UPDATE")
            .bind(borrow_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow with id {} not found", borrow_id)))?;

        let status: BorrowStatus = row.get("status");
        if !status.is_pending() {
            return Err(AppError::InvalidState(match action {
                ValidationAction::Cancel => "This request can no longer be cancelled".to_string(),
                _ => "This request can no longer be refused".to_string(),
            }));
        }

        let borrow = sqlx::query_as::<_, Borrow>(
            r#"
            UPDATE borrows SET
                status = 'REFUSED', validation_date = $1, admin_id = $2,
                rejection_reason = $3
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(Utc::now().date_naive())
        .bind(admin_id)
        .bind(reason)
        .bind(borrow_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO validation_history (borrow_id, admin_id, action, reason, created_at) \
             VALUES ($1, $2, $3, $4, NOW())",
        )
        .bind(borrow_id)
        .bind(admin_id)
        .bind(action)
        .bind(reason)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(borrow)
    }

    /// Return a checked-out borrow: mark it RETURNED and put the copy back.
    /// The increment is capped at total_copies so the availability invariant
    /// holds even against inconsistent historical rows.
    pub async fn return_borrow(&self, borrow_id: i32) -> AppResult<Borrow> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT book_id, status FROM borrows WHERE id = $1 FOR UPDATE")
            .bind(borrow_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow with id {} not found", borrow_id)))?;

        let status: BorrowStatus = row.get("status");
        let book_id: i32 = row.get("book_id");

        if status == BorrowStatus::Returned {
            return Err(AppError::InvalidState("Book already returned".to_string()));
        }
        if !status.is_returnable() {
            return Err(AppError::InvalidState(
                "Only a checked-out book can be returned".to_string(),
            ));
        }

        let borrow = sqlx::query_as::<_, Borrow>(
            r#"
            UPDATE borrows SET status = 'RETURNED', actual_return_date = $1
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(Utc::now().date_naive())
        .bind(borrow_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE books SET available_copies = LEAST(total_copies, available_copies + 1)
            WHERE id = $1
            "#,
        )
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(borrow)
    }

    /// Reclassify every ACTIVE borrow past its expected return date.
    /// Idempotent; returns the number of rows updated.
    pub async fn check_overdue(&self) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE borrows SET status = 'OVERDUE'
            WHERE status = 'ACTIVE' AND expected_return_date < $1
            "#,
        )
        .bind(Utc::now().date_naive())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Validation audit trail for a borrow, newest first
    pub async fn history(&self, borrow_id: i32) -> AppResult<Vec<ValidationHistoryEntry>> {
        let entries = sqlx::query_as::<_, ValidationHistoryEntry>(
            r#"
            SELECT vh.id, vh.borrow_id, vh.admin_id, vh.action, vh.reason,
                   vh.created_at, u.name AS admin_name
            FROM validation_history vh
            LEFT JOIN users u ON vh.admin_id = u.id
            WHERE vh.borrow_id = $1
            ORDER BY vh.created_at DESC
            "#,
        )
        .bind(borrow_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Per-status borrow counts
    pub async fn stats(&self) -> AppResult<BorrowStats> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'PENDING') AS pending,
                   COUNT(*) FILTER (WHERE status = 'VALIDATED') AS validated,
                   COUNT(*) FILTER (WHERE status = 'ACTIVE') AS active,
                   COUNT(*) FILTER (WHERE status = 'REFUSED') AS refused,
                   COUNT(*) FILTER (WHERE status = 'RETURNED') AS returned,
                   COUNT(*) FILTER (WHERE status = 'OVERDUE') AS overdue
            FROM borrows
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(BorrowStats {
            total: row.get("total"),
            pending: row.get("pending"),
            validated: row.get("validated"),
            active: row.get("active"),
            refused: row.get("refused"),
            returned: row.get("returned"),
            overdue: row.get("overdue"),
        })
    }
}
