//! API handlers for Biblio REST endpoints

pub mod auth;
pub mod books;
pub mod borrows;
pub mod health;
pub mod openapi;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

/// Extractor that additionally requires the ADMIN role
pub struct AdminUser(pub UserClaims);

/// Extractor for optionally authenticated routes. A missing or invalid
/// token yields None instead of a 401.
pub struct MaybeUser(pub Option<UserClaims>);

fn claims_from_parts(parts: &Parts, state: &AppState) -> Result<UserClaims, AppError> {
    // Get the Authorization header
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    // Check for Bearer token
    if !auth_header.starts_with("Bearer ") {
        return Err(AppError::Unauthorized(
            "Invalid authorization header format".to_string(),
        ));
    }

    let token = &auth_header[7..];

    UserClaims::from_token(token, &state.config.auth.jwt_secret)
        .map_err(|e| AppError::Unauthorized(e.to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(AuthenticatedUser(claims_from_parts(parts, state)?))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = claims_from_parts(parts, state)?;
        claims.require_admin()?;
        Ok(AdminUser(claims))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(claims_from_parts(parts, state).ok()))
    }
}

/// Paginated listing envelope
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    BookPage = PaginatedResponse<crate::models::book::Book>,
    BorrowPage = PaginatedResponse<crate::models::borrow::BorrowDetails>
)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: i64, page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(10).clamp(1, 100);

        Self {
            items,
            total,
            page,
            limit,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_envelope() {
        let r = PaginatedResponse::new(vec![1, 2, 3], 25, Some(2), Some(10));
        assert_eq!(r.page, 2);
        assert_eq!(r.limit, 10);
        assert_eq!(r.total_pages, 3);

        let r = PaginatedResponse::<i32>::new(vec![], 0, None, None);
        assert_eq!(r.page, 1);
        assert_eq!(r.total_pages, 0);

        // out-of-range parameters are normalized like the repository does
        let r = PaginatedResponse::<i32>::new(vec![], 10, Some(0), Some(1000));
        assert_eq!(r.page, 1);
        assert_eq!(r.limit, 100);
    }
}
