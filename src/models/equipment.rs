//! Equipment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::EquipmentStatus;

/// Equipment record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Equipment {
    pub id: i32,
    pub name: String,
    /// Unique serial number
    pub serial: String,
    pub status: EquipmentStatus,
    pub category_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Short equipment representation embedded in loans
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EquipmentShort {
    pub id: i32,
    pub name: String,
    pub serial: String,
    pub status: EquipmentStatus,
}

/// Create equipment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEquipment {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "Serial must be 1-50 characters"))]
    pub serial: String,
    /// Initial status, Available when omitted
    pub status: Option<EquipmentStatus>,
    pub category_id: Option<i32>,
}

/// Update equipment request (admin override of status included)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateEquipment {
    /// Must match the path id when present
    pub id: Option<i32>,
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Serial must be 1-50 characters"))]
    pub serial: Option<String>,
    pub status: Option<EquipmentStatus>,
    pub category_id: Option<i32>,
}
