//! Authentication endpoints

use axum::{extract::State, Json};

use super::AppJson;
use crate::{
    error::AppResult,
    models::user::{LoginRequest, RoleRecord, SessionUser},
};

/// Login with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = SessionUser),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> AppResult<Json<SessionUser>> {
    let session = state
        .services
        .users
        .authenticate(&request.email, &request.password)
        .await?;
    Ok(Json(session))
}

/// List roles
#[utoipa::path(
    get,
    path = "/roles",
    tag = "auth",
    responses(
        (status = 200, description = "All roles", body = Vec<RoleRecord>)
    )
)]
pub async fn list_roles(State(state): State<crate::AppState>) -> AppResult<Json<Vec<RoleRecord>>> {
    let roles = state.services.users.roles().await?;
    Ok(Json(roles))
}
