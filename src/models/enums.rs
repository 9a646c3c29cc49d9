//! Shared domain enums, stored as SMALLINT codes

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// EquipmentStatus
// ---------------------------------------------------------------------------

/// Equipment status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum EquipmentStatus {
    Available = 1,
    Loaned = 2,
    Maintenance = 3,
    Retired = 4,
}

impl std::fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EquipmentStatus::Available => "Available",
            EquipmentStatus::Loaned => "Loaned",
            EquipmentStatus::Maintenance => "Maintenance",
            EquipmentStatus::Retired => "Retired",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// LoanStatus
// ---------------------------------------------------------------------------

/// Loan lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum LoanStatus {
    Pending = 1,
    Active = 2,
    Finalized = 3,
    Rejected = 4,
    InRenewal = 5,
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LoanStatus::Pending => "Pending",
            LoanStatus::Active => "Active",
            LoanStatus::Finalized => "Finalized",
            LoanStatus::Rejected => "Rejected",
            LoanStatus::InRenewal => "InRenewal",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// ReturnCondition
// ---------------------------------------------------------------------------

/// Physical condition of returned equipment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReturnCondition {
    Good,
    Damaged,
}

impl ReturnCondition {
    /// Where the equipment goes once the loan is closed
    pub fn equipment_status(&self) -> EquipmentStatus {
        match self {
            ReturnCondition::Good => EquipmentStatus::Available,
            ReturnCondition::Damaged => EquipmentStatus::Maintenance,
        }
    }
}
