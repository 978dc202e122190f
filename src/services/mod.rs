//! Service layer holding the business logic

pub mod auth;
pub mod borrows;
pub mod catalog;
pub mod storage;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub borrows: borrows::BorrowsService,
    pub images: storage::ImageStore,
}

impl Services {
    /// Create all services with the given repository and configuration
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let images = storage::ImageStore::new(&config.storage);

        Self {
            auth: auth::AuthService::new(repository.clone(), config.auth.clone()),
            catalog: catalog::CatalogService::new(repository.clone(), images.clone()),
            borrows: borrows::BorrowsService::new(repository),
            images,
        }
    }
}
