//! Borrow workflow endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::borrow::{
        Borrow, BorrowDetails, BorrowQuery, BorrowStats, CreateBorrowRequest, ReasonBody,
        ValidationHistoryEntry,
    },
    AppState,
};

use super::{AdminUser, AuthenticatedUser, PaginatedResponse};

/// Borrow request submission response
#[derive(Serialize, ToSchema)]
pub struct CreateBorrowResponse {
    pub message: String,
    #[serde(rename = "borrowId")]
    pub borrow_id: i32,
    #[serde(rename = "expectedReturnDate")]
    pub expected_return_date: NaiveDate,
}

/// Workflow transition response
#[derive(Serialize, ToSchema)]
pub struct BorrowActionResponse {
    pub message: String,
    pub borrow: Borrow,
}

/// Overdue sweep response
#[derive(Serialize, ToSchema)]
pub struct OverdueSweepResponse {
    pub message: String,
    pub updated: u64,
}

/// Submit a borrow request
#[utoipa::path(
    post,
    path = "/borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowRequest,
    responses(
        (status = 201, description = "Request submitted", body = CreateBorrowResponse),
        (status = 400, description = "Duplicate pending request or quota exceeded"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn create_borrow(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBorrowRequest>,
) -> AppResult<(StatusCode, Json<CreateBorrowResponse>)> {
    let borrow = state
        .services
        .borrows
        .submit_request(&claims, request.book_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateBorrowResponse {
            message: "Borrow request submitted".to_string(),
            borrow_id: borrow.id,
            expected_return_date: borrow.expected_return_date,
        }),
    ))
}

/// The caller's own borrows
#[utoipa::path(
    get,
    path = "/borrows/my-borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's borrows, newest first", body = Vec<BorrowDetails>)
    )
)]
pub async fn my_borrows(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowDetails>>> {
    let borrows = state.services.borrows.my_borrows(&claims).await?;
    Ok(Json(borrows))
}

/// All borrows with optional status filter (admin)
#[utoipa::path(
    get,
    path = "/borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(BorrowQuery),
    responses(
        (status = 200, description = "Page of borrows", body = super::BorrowPage),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn list_borrows(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<BorrowQuery>,
) -> AppResult<Json<PaginatedResponse<BorrowDetails>>> {
    let (borrows, total) = state.services.borrows.search(&query).await?;

    Ok(Json(PaginatedResponse::new(
        borrows,
        total,
        query.page,
        query.limit,
    )))
}

/// Pending requests awaiting a decision (admin)
#[utoipa::path(
    get,
    path = "/borrows/pending",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(BorrowQuery),
    responses(
        (status = 200, description = "Page of pending requests", body = super::BorrowPage),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn pending_borrows(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<BorrowQuery>,
) -> AppResult<Json<PaginatedResponse<BorrowDetails>>> {
    let (borrows, total) = state.services.borrows.pending(&query).await?;

    Ok(Json(PaginatedResponse::new(
        borrows,
        total,
        query.page,
        query.limit,
    )))
}

/// One borrow with details. Users may only read their own.
#[utoipa::path(
    get,
    path = "/borrows/{id}",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow ID")),
    responses(
        (status = 200, description = "Borrow details", body = BorrowDetails),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Borrow not found")
    )
)]
pub async fn get_borrow(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowDetails>> {
    let details = state.services.borrows.get_details(&claims, id).await?;
    Ok(Json(details))
}

/// Validate a pending request (admin)
#[utoipa::path(
    put,
    path = "/borrows/validate/{id}",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow ID")),
    responses(
        (status = 200, description = "Request validated", body = BorrowActionResponse),
        (status = 400, description = "Not pending or no copy available"),
        (status = 403, description = "Admin privileges required"),
        (status = 404, description = "Borrow not found")
    )
)]
pub async fn validate_borrow(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowActionResponse>> {
    let borrow = state.services.borrows.validate(&claims, id).await?;

    Ok(Json(BorrowActionResponse {
        message: "Borrow request validated".to_string(),
        borrow,
    }))
}

/// Refuse a pending request with a reason (admin)
#[utoipa::path(
    put,
    path = "/borrows/refuse/{id}",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow ID")),
    request_body = ReasonBody,
    responses(
        (status = 200, description = "Request refused", body = BorrowActionResponse),
        (status = 400, description = "Not pending or missing reason"),
        (status = 403, description = "Admin privileges required"),
        (status = 404, description = "Borrow not found")
    )
)]
pub async fn refuse_borrow(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
    Path(id): Path<i32>,
    body: Option<Json<ReasonBody>>,
) -> AppResult<Json<BorrowActionResponse>> {
    let reason = body.and_then(|Json(b)| b.reason);
    let borrow = state.services.borrows.refuse(&claims, id, reason).await?;

    Ok(Json(BorrowActionResponse {
        message: "Borrow request refused".to_string(),
        borrow,
    }))
}

/// Cancel a pending request. Users cancel their own, admins cancel any.
#[utoipa::path(
    put,
    path = "/borrows/cancel/{id}",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow ID")),
    request_body = ReasonBody,
    responses(
        (status = 200, description = "Request cancelled", body = BorrowActionResponse),
        (status = 400, description = "Request is no longer pending"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Borrow not found")
    )
)]
pub async fn cancel_borrow(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    body: Option<Json<ReasonBody>>,
) -> AppResult<Json<BorrowActionResponse>> {
    let reason = body.and_then(|Json(b)| b.reason);
    let borrow = state.services.borrows.cancel(&claims, id, reason).await?;

    Ok(Json(BorrowActionResponse {
        message: "Borrow request cancelled".to_string(),
        borrow,
    }))
}

/// Return a checked-out book
#[utoipa::path(
    put,
    path = "/borrows/return/{id}",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow ID")),
    responses(
        (status = 200, description = "Book returned", body = BorrowActionResponse),
        (status = 400, description = "Borrow is not checked out"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Borrow not found")
    )
)]
pub async fn return_borrow(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowActionResponse>> {
    let borrow = state.services.borrows.return_borrow(&claims, id).await?;

    Ok(Json(BorrowActionResponse {
        message: "Book returned successfully".to_string(),
        borrow,
    }))
}

/// Sweep overdue borrows (admin)
#[utoipa::path(
    post,
    path = "/borrows/check-overdue",
    tag = "borrows",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sweep completed", body = OverdueSweepResponse),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn check_overdue(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<OverdueSweepResponse>> {
    let updated = state.services.borrows.check_overdue().await?;

    Ok(Json(OverdueSweepResponse {
        message: "Overdue check completed".to_string(),
        updated,
    }))
}

/// Validation audit trail for a borrow
#[utoipa::path(
    get,
    path = "/borrows/history/{id}",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow ID")),
    responses(
        (status = 200, description = "Audit entries, newest first", body = Vec<ValidationHistoryEntry>),
        (status = 404, description = "Borrow not found")
    )
)]
pub async fn borrow_history(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<ValidationHistoryEntry>>> {
    let entries = state.services.borrows.history(id).await?;
    Ok(Json(entries))
}

/// Per-status borrow counts (admin dashboard)
#[utoipa::path(
    get,
    path = "/borrows/stats/borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Borrow statistics", body = BorrowStats),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn borrow_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<BorrowStats>> {
    let stats = state.services.borrows.stats().await?;
    Ok(Json(stats))
}
