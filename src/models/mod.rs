//! Data models for Biblio

pub mod book;
pub mod borrow;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookDetails, BookStats};
pub use borrow::{Borrow, BorrowDetails, BorrowStatus, ValidationAction};
pub use user::{Role, User};
