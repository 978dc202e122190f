//! Book catalog endpoints.
//!
//! Create and update accept multipart forms so a cover image can ride along
//! with the text fields. The image is stored before the service runs and the
//! stored file name is what lands in the database.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookDetails, BookFields, BookQuery, BookStats},
    AppState,
};

use super::{auth::MessageResponse, AdminUser, MaybeUser, PaginatedResponse};

/// List books with search, filters and pagination
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "Page of matching books", body = super::BookPage)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<PaginatedResponse<Book>>> {
    let (books, total) = state.services.catalog.search(&query).await?;

    Ok(Json(PaginatedResponse::new(
        books,
        total,
        query.page,
        query.limit,
    )))
}

/// Get one book. With a valid token the response includes whether the
/// caller currently has the book checked out.
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = BookDetails),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    MaybeUser(claims): MaybeUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BookDetails>> {
    let viewer = claims.map(|c| c.user_id);
    let details = state.services.catalog.get_book(id, viewer).await?;
    Ok(Json(details))
}

/// Create a book (multipart form, admin only)
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Missing title or author, or bad image"),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    _admin: AdminUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<Book>)> {
    let fields = collect_fields(&state, multipart).await?;
    let book = state.services.catalog.create_book(fields).await?;

    Ok((StatusCode::CREATED, Json(book)))
}

/// Update a book (multipart form, admin only)
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 403, description = "Admin privileges required"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> AppResult<Json<Book>> {
    let fields = collect_fields(&state, multipart).await?;
    let book = state.services.catalog.update_book(id, fields).await?;

    Ok(Json(book))
}

/// Delete a book (admin only)
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book deleted", body = MessageResponse),
        (status = 403, description = "Admin privileges required"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i32>,
) -> AppResult<Json<MessageResponse>> {
    state.services.catalog.delete_book(id).await?;

    Ok(Json(MessageResponse {
        message: "Book deleted successfully".to_string(),
    }))
}

/// Distinct categories in the catalog
#[utoipa::path(
    get,
    path = "/books/categories",
    tag = "books",
    responses(
        (status = 200, description = "All categories", body = Vec<String>)
    )
)]
pub async fn categories(State(state): State<AppState>) -> AppResult<Json<Vec<String>>> {
    let categories = state.services.catalog.categories().await?;
    Ok(Json(categories))
}

/// Aggregate catalog statistics
#[utoipa::path(
    get,
    path = "/books/stats",
    tag = "books",
    responses(
        (status = 200, description = "Catalog statistics", body = BookStats)
    )
)]
pub async fn stats(State(state): State<AppState>) -> AppResult<Json<BookStats>> {
    let stats = state.services.catalog.stats().await?;
    Ok(Json(stats))
}

/// Serve a stored cover image
#[utoipa::path(
    get,
    path = "/books/image/{image_name}",
    tag = "books",
    params(("image_name" = String, Path, description = "Stored image file name")),
    responses(
        (status = 200, description = "Image bytes"),
        (status = 404, description = "Image not found")
    )
)]
pub async fn serve_image(
    State(state): State<AppState>,
    Path(image_name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let (bytes, content_type) = state.services.images.read(&image_name).await?;

    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}

/// Drain the multipart form into book fields, storing an uploaded image as
/// a side effect.
async fn collect_fields(state: &AppState, mut multipart: Multipart) -> AppResult<BookFields> {
    let mut fields = BookFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart form: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "image" {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?;

            if data.is_empty() {
                continue;
            }

            let stored = state
                .services
                .images
                .save(&file_name, &content_type, &data)
                .await?;
            fields.image = Some(stored);
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid field {}: {}", name, e)))?;

        // empty strings from the form mean "not provided"
        if value.is_empty() {
            continue;
        }

        match name.as_str() {
            "title" => fields.title = Some(value),
            "author" => fields.author = Some(value),
            "description" => fields.description = Some(value),
            "category" => fields.category = Some(value),
            "isbn" => fields.isbn = Some(value),
            "publication_date" => {
                let date = NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| {
                    AppError::Validation("Publication date must be YYYY-MM-DD".to_string())
                })?;
                fields.publication_date = Some(date);
            }
            "total_copies" => {
                let copies: i32 = value.parse().map_err(|_| {
                    AppError::Validation("Number of copies must be an integer".to_string())
                })?;
                fields.total_copies = Some(copies);
            }
            _ => {}
        }
    }

    Ok(fields)
}
