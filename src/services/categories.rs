//! Category management service

use crate::{
    error::AppResult,
    models::category::{Category, CreateCategory, UpdateCategory},
    repository::Repository,
};

#[derive(Clone)]
pub struct CategoriesService {
    repository: Repository,
}

impl CategoriesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<Category>> {
        self.repository.categories.list().await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Category> {
        self.repository.categories.get_by_id(id).await
    }

    pub async fn create(&self, data: CreateCategory) -> AppResult<Category> {
        self.repository.categories.create(&data).await
    }

    pub async fn update(&self, id: i32, data: UpdateCategory) -> AppResult<Category> {
        super::check_path_id(id, data.id)?;
        self.repository.categories.update(id, &data).await
    }

    /// Refused with `InUse` while equipment belongs to the category
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.categories.delete(id).await?;
        tracing::info!(category_id = id, "Category deleted");
        Ok(())
    }
}
