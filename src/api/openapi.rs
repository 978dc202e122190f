//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, borrows, health, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Biblio API",
        version = "1.0.0",
        description = "Library Management System REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api", description = "API root")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::get_profile,
        auth::update_profile,
        auth::change_password,
        // Users
        users::list_users,
        users::get_user,
        users::update_user,
        users::delete_user,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::categories,
        books::stats,
        books::serve_image,
        // Borrows
        borrows::create_borrow,
        borrows::my_borrows,
        borrows::list_borrows,
        borrows::pending_borrows,
        borrows::get_borrow,
        borrows::validate_borrow,
        borrows::refuse_borrow,
        borrows::cancel_borrow,
        borrows::return_borrow,
        borrows::check_overdue,
        borrows::borrow_history,
        borrows::borrow_stats,
    ),
    components(
        schemas(
            // Auth
            crate::models::user::RegisterRequest,
            crate::models::user::LoginRequest,
            crate::models::user::UpdateProfile,
            crate::models::user::ChangePassword,
            auth::RegisterResponse,
            auth::LoginResponse,
            auth::UserSummary,
            auth::MessageResponse,
            auth::ProfileResponse,
            // Users
            crate::models::user::User,
            crate::models::user::Role,
            crate::models::user::UpdateUser,
            // Books
            crate::models::book::Book,
            crate::models::book::BookDetails,
            crate::models::book::BookQuery,
            crate::models::book::BookStats,
            // Borrows
            crate::models::borrow::Borrow,
            crate::models::borrow::BorrowDetails,
            crate::models::borrow::BorrowStatus,
            crate::models::borrow::BorrowQuery,
            crate::models::borrow::BorrowStats,
            crate::models::borrow::CreateBorrowRequest,
            crate::models::borrow::ReasonBody,
            crate::models::borrow::ValidationAction,
            crate::models::borrow::ValidationHistoryEntry,
            borrows::CreateBorrowResponse,
            borrows::BorrowActionResponse,
            borrows::OverdueSweepResponse,
            // Pagination
            crate::api::BookPage,
            crate::api::BorrowPage,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication and profile endpoints"),
        (name = "users", description = "User administration"),
        (name = "books", description = "Book catalog management"),
        (name = "borrows", description = "Borrow request workflow")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
