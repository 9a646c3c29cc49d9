//! Equipment repository

use chrono::Utc;
use sqlx::{Pool, Postgres};

use super::{is_foreign_key_violation, is_unique_violation};
use crate::{
    error::{AppError, AppResult},
    models::{
        enums::EquipmentStatus,
        equipment::{CreateEquipment, Equipment, UpdateEquipment},
    },
};

#[derive(Clone)]
pub struct EquipmentRepository {
    pool: Pool<Postgres>,
}

impl EquipmentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List all equipment
    pub async fn list(&self) -> AppResult<Vec<Equipment>> {
        let rows = sqlx::query_as::<_, Equipment>("SELECT * FROM equipment ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Get equipment by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Check if a serial number is already used by another item
    pub async fn serial_exists(&self, serial: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM equipment WHERE serial = $1 AND id != $2)",
            )
            .bind(serial)
            .bind(id)
            .fetch_one(&self.pool)
            .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM equipment WHERE serial = $1)")
                .bind(serial)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// Create equipment
    pub async fn create(&self, data: &CreateEquipment) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>(
            r#"
            INSERT INTO equipment (name, serial, status, category_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.serial)
        .bind(data.status.unwrap_or(EquipmentStatus::Available))
        .bind(data.category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, &data.serial))
    }

    /// Update equipment (only provided fields)
    pub async fn update(&self, id: i32, data: &UpdateEquipment) -> AppResult<Equipment> {
        let now = Utc::now();
        let mut sets = vec!["updated_at = $1".to_string()];
        let mut idx = 2;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(data.name, "name");
        add_field!(data.serial, "serial");
        add_field!(data.status, "status");
        add_field!(data.category_id, "category_id");

        let query = format!(
            "UPDATE equipment SET {} WHERE id = ${} RETURNING *",
            sets.join(", "),
            idx
        );

        let mut builder = sqlx::query_as::<_, Equipment>(&query).bind(now);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.name);
        bind_field!(data.serial);
        bind_field!(data.status);
        bind_field!(data.category_id);

        builder
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| write_error(e, data.serial.as_deref().unwrap_or_default()))?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Delete equipment; refused while any loan references it
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let referenced: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE equipment_id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if referenced > 0 {
            return Err(AppError::InUse(format!(
                "Equipment {} is referenced by {} loan(s)",
                id, referenced
            )));
        }

        let result = sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    AppError::InUse(format!("Equipment {} is referenced by a loan", id))
                } else {
                    e.into()
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Equipment {} not found", id)));
        }
        Ok(())
    }
}

/// Translate store constraint violations raised on insert/update
fn write_error(err: sqlx::Error, serial: &str) -> AppError {
    if is_unique_violation(&err) {
        AppError::Duplicate(format!("Serial '{}' already exists", serial))
    } else if is_foreign_key_violation(&err) {
        AppError::NotFound("Category not found".to_string())
    } else {
        err.into()
    }
}
