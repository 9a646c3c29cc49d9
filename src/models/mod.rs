//! Data models for SEGA

pub mod category;
pub mod enums;
pub mod equipment;
pub mod loan;
pub mod user;

// Re-export commonly used types
pub use category::Category;
pub use enums::{EquipmentStatus, LoanStatus, ReturnCondition};
pub use equipment::{Equipment, EquipmentShort};
pub use loan::{Loan, LoanAction, LoanDetails, LoanTransition};
pub use user::{Role, User, UserShort};
