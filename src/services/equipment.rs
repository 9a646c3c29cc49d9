//! Equipment inventory service

use crate::{
    error::{AppError, AppResult},
    models::equipment::{CreateEquipment, Equipment, UpdateEquipment},
    repository::Repository,
};

#[derive(Clone)]
pub struct EquipmentService {
    repository: Repository,
}

impl EquipmentService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<Equipment>> {
        self.repository.equipment.list().await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        self.repository.equipment.get_by_id(id).await
    }

    /// Create equipment; the serial number must be unused
    pub async fn create(&self, data: CreateEquipment) -> AppResult<Equipment> {
        if self.repository.equipment.serial_exists(&data.serial, None).await? {
            return Err(AppError::Duplicate(format!("Serial '{}' already exists", data.serial)));
        }
        self.check_category(data.category_id).await?;

        let equipment = self.repository.equipment.create(&data).await?;
        tracing::info!(
            equipment_id = equipment.id,
            serial = %equipment.serial,
            "Equipment created"
        );
        Ok(equipment)
    }

    /// Update equipment.
    ///
    /// Writing `status` here is an administrative override: it is not paired
    /// with any loan transition.
    pub async fn update(&self, id: i32, data: UpdateEquipment) -> AppResult<Equipment> {
        super::check_path_id(id, data.id)?;

        if let Some(ref serial) = data.serial {
            if self.repository.equipment.serial_exists(serial, Some(id)).await? {
                return Err(AppError::Duplicate(format!("Serial '{}' already exists", serial)));
            }
        }
        self.check_category(data.category_id).await?;

        self.repository.equipment.update(id, &data).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.equipment.delete(id).await?;
        tracing::info!(equipment_id = id, "Equipment deleted");
        Ok(())
    }

    async fn check_category(&self, category_id: Option<i32>) -> AppResult<()> {
        if let Some(category_id) = category_id {
            if !self.repository.categories.exists(category_id).await? {
                return Err(AppError::NotFound(format!("Category {} not found", category_id)));
            }
        }
        Ok(())
    }
}
