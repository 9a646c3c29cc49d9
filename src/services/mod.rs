//! Business logic services

pub mod categories;
pub mod equipment;
pub mod loans;
pub mod users;

use std::sync::Arc;

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub categories: categories::CategoriesService,
    pub equipment: equipment::EquipmentService,
    pub loans: loans::LoansService,
    pub users: users::UsersService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, loans_config: LoansConfig) -> Self {
        Self {
            categories: categories::CategoriesService::new(repository.clone()),
            equipment: equipment::EquipmentService::new(repository.clone()),
            loans: loans::LoansService::new(Arc::new(repository.loans.clone()), loans_config),
            users: users::UsersService::new(repository.clone()),
            repository,
        }
    }

    /// Database round-trip used by the readiness probe
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}

/// A body id, when sent, must name the resource in the path
pub(crate) fn check_path_id(path_id: i32, body_id: Option<i32>) -> AppResult<()> {
    match body_id {
        Some(body_id) if body_id != path_id => Err(AppError::BadRequest(format!(
            "Body id {} does not match path id {}",
            body_id, path_id
        ))),
        _ => Ok(()),
    }
}
