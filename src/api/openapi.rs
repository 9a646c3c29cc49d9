//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, categories, equipment, health, loans, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SEGA API",
        version = "1.0.0",
        description = "Equipment Loan Management REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::list_roles,
        // Equipment
        equipment::list_equipment,
        equipment::get_equipment,
        equipment::create_equipment,
        equipment::update_equipment,
        equipment::delete_equipment,
        // Categories
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        users::get_user_loans,
        // Loans
        loans::list_loans,
        loans::get_loan,
        loans::create_loan,
        loans::decide_loan,
        loans::finalize_loan,
        loans::renew_loan,
        loans::notify_return,
    ),
    components(
        schemas(
            // Enums
            crate::models::enums::EquipmentStatus,
            crate::models::enums::LoanStatus,
            crate::models::enums::ReturnCondition,
            // Users
            crate::models::user::Role,
            crate::models::user::View,
            crate::models::user::RoleRecord,
            crate::models::user::User,
            crate::models::user::UserShort,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            crate::models::user::LoginRequest,
            crate::models::user::SessionUser,
            // Equipment
            crate::models::equipment::Equipment,
            crate::models::equipment::EquipmentShort,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::UpdateEquipment,
            crate::models::category::Category,
            crate::models::category::CreateCategory,
            crate::models::category::UpdateCategory,
            // Loans
            crate::models::loan::Loan,
            crate::models::loan::LoanDetails,
            crate::models::loan::CreateLoan,
            crate::models::loan::DecideLoan,
            crate::models::loan::FinalizeLoan,
            crate::models::loan::RenewLoan,
            crate::models::loan::NotifyReturn,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Login and roles"),
        (name = "equipment", description = "Equipment inventory"),
        (name = "categories", description = "Equipment categories"),
        (name = "users", description = "User management"),
        (name = "loans", description = "Loan workflow")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
