//! Borrow workflow service.
//!
//! Ownership rules live here: regular users only act on their own borrows,
//! admins act on any. The repository enforces the state machine itself.

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::{
            Borrow, BorrowDetails, BorrowQuery, BorrowStats, BorrowStatus, ValidationHistoryEntry,
        },
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct BorrowsService {
    repository: Repository,
}

impl BorrowsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Submit a borrow request for a book.
    pub async fn submit_request(&self, user: &UserClaims, book_id: i32) -> AppResult<Borrow> {
        // surfaces a clean 404 before the quota checks run
        self.repository.books.get_by_id(book_id).await?;

        let borrow = self
            .repository
            .borrows
            .create_request(user.user_id, book_id)
            .await?;

        tracing::info!(
            borrow_id = borrow.id,
            user_id = user.user_id,
            book_id,
            "Borrow request submitted"
        );

        Ok(borrow)
    }

    /// The caller's own borrows, newest first
    pub async fn my_borrows(&self, user: &UserClaims) -> AppResult<Vec<BorrowDetails>> {
        self.repository.borrows.find_by_user(user.user_id).await
    }

    /// One borrow with details. Users may only see their own.
    pub async fn get_details(&self, user: &UserClaims, borrow_id: i32) -> AppResult<BorrowDetails> {
        let details = self.repository.borrows.get_details_by_id(borrow_id).await?;
        user.require_owner_or_admin(details.user_id)?;
        Ok(details)
    }

    /// Paginated listing over all borrows (admin console)
    pub async fn search(&self, query: &BorrowQuery) -> AppResult<(Vec<BorrowDetails>, i64)> {
        self.repository.borrows.search(query).await
    }

    /// Pending requests awaiting a decision (admin console)
    pub async fn pending(&self, query: &BorrowQuery) -> AppResult<(Vec<BorrowDetails>, i64)> {
        let query = BorrowQuery {
            page: query.page,
            limit: query.limit,
            status: Some(BorrowStatus::Pending),
        };
        self.repository.borrows.search(&query).await
    }

    /// Validate a pending request, checking out one copy.
    pub async fn validate(&self, admin: &UserClaims, borrow_id: i32) -> AppResult<Borrow> {
        let borrow = self.repository.borrows.validate(borrow_id, admin.user_id).await?;

        tracing::info!(borrow_id, admin_id = admin.user_id, "Borrow validated");

        Ok(borrow)
    }

    /// Refuse a pending request. A reason is mandatory.
    pub async fn refuse(
        &self,
        admin: &UserClaims,
        borrow_id: i32,
        reason: Option<String>,
    ) -> AppResult<Borrow> {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .ok_or_else(|| AppError::Validation("A refusal reason is required".to_string()))?;

        let borrow = self
            .repository
            .borrows
            .refuse(borrow_id, admin.user_id, &reason)
            .await?;

        tracing::info!(borrow_id, admin_id = admin.user_id, "Borrow refused");

        Ok(borrow)
    }

    /// Cancel a pending request. Users cancel their own; admins cancel any.
    pub async fn cancel(
        &self,
        user: &UserClaims,
        borrow_id: i32,
        reason: Option<String>,
    ) -> AppResult<Borrow> {
        let current = self.repository.borrows.get_by_id(borrow_id).await?;
        user.require_owner_or_admin(current.user_id)?;

        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "Cancelled by user".to_string());

        // only admin-driven cancellations carry an actor in the audit log
        let admin_id = user.is_admin().then_some(user.user_id);

        let borrow = self
            .repository
            .borrows
            .cancel(borrow_id, admin_id, &reason)
            .await?;

        tracing::info!(borrow_id, user_id = user.user_id, "Borrow cancelled");

        Ok(borrow)
    }

    /// Return a checked-out book. Users return their own; admins return any.
    pub async fn return_borrow(&self, user: &UserClaims, borrow_id: i32) -> AppResult<Borrow> {
        let current = self.repository.borrows.get_by_id(borrow_id).await?;
        user.require_owner_or_admin(current.user_id)?;

        let borrow = self.repository.borrows.return_borrow(borrow_id).await?;

        tracing::info!(borrow_id, user_id = user.user_id, "Borrow returned");

        Ok(borrow)
    }

    /// Sweep ACTIVE borrows past their due date into OVERDUE.
    pub async fn check_overdue(&self) -> AppResult<u64> {
        let updated = self.repository.borrows.check_overdue().await?;

        if updated > 0 {
            tracing::info!(updated, "Borrows marked overdue");
        }

        Ok(updated)
    }

    /// Validation audit trail for a borrow
    pub async fn history(&self, borrow_id: i32) -> AppResult<Vec<ValidationHistoryEntry>> {
        // ensure the borrow exists so the trail never silently reads as empty
        self.repository.borrows.get_by_id(borrow_id).await?;
        self.repository.borrows.history(borrow_id).await
    }

    /// Per-status borrow counts (admin dashboard)
    pub async fn stats(&self) -> AppResult<BorrowStats> {
        self.repository.borrows.stats().await
    }
}
