//! User model, roles and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// User role (closed set, ids match the `roles` table)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum Role {
    Admin = 1,
    Manager = 2,
    Requester = 3,
}

/// Client views a role is allowed to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Catalog,
    MyLoans,
    LoanManagement,
    Users,
    Equipment,
    Categories,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Requester => "requester",
        }
    }

    /// Views rendered for this role
    pub fn views(&self) -> &'static [View] {
        match self {
            Role::Admin => &[View::Users, View::Equipment, View::Categories],
            Role::Manager => &[View::LoanManagement],
            Role::Requester => &[View::Catalog, View::MyLoans],
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Row of the `roles` table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RoleRecord {
    pub id: i16,
    pub name: String,
}

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub full_name: String,
    /// Login key
    pub email: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: String,
    #[sqlx(rename = "role_id")]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Short user representation embedded in loans
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserShort {
    pub id: i32,
    pub full_name: String,
    pub email: String,
    pub role: Role,
}

impl From<User> for UserShort {
    fn from(user: User) -> Self {
        UserShort {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            role: user.role,
        }
    }
}

/// Create user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 1, max = 150, message = "Full name must be 1-150 characters"))]
    pub full_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 3, message = "Password must be at least 3 characters"))]
    pub password: String,
    pub role: Role,
}

/// Update user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    /// Must match the path id when present
    pub id: Option<i32>,
    #[validate(length(min = 1, max = 150, message = "Full name must be 1-150 characters"))]
    pub full_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 3, message = "Password must be at least 3 characters"))]
    pub password: Option<String>,
    pub role: Option<Role>,
}

/// Login request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Session user returned on successful login
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionUser {
    pub user: UserShort,
    pub views: Vec<View>,
}

impl From<User> for SessionUser {
    fn from(user: User) -> Self {
        let views = user.role.views().to_vec();
        SessionUser {
            user: user.into(),
            views,
        }
    }
}
