//! Loan workflow endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use super::AppJson;
use crate::{
    error::{AppResult, ErrorResponse},
    models::loan::{
        CreateLoan, DecideLoan, FinalizeLoan, Loan, LoanDetails, NotifyReturn, RenewLoan,
    },
};

/// List all loans with equipment and borrower
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    responses(
        (status = 200, description = "All loans, newest first", body = Vec<LoanDetails>)
    )
)]
pub async fn list_loans(State(state): State<crate::AppState>) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.list().await?;
    Ok(Json(loans))
}

#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 404, description = "Loan not found", body = ErrorResponse)
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.get(id).await?;
    Ok(Json(loan))
}

/// Request a loan; the equipment is reserved immediately
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Pending loan created", body = Loan),
        (status = 400, description = "Invalid request or equipment unavailable",
            body = ErrorResponse),
        (status = 404, description = "User or equipment not found", body = ErrorResponse)
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    AppJson(request): AppJson<CreateLoan>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    request.validate()?;

    let loan = state.services.loans.request(request).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Approve or reject a pending loan or a renewal request
#[utoipa::path(
    put,
    path = "/loans/{id}/status",
    tag = "loans",
    params(("id" = i32, Path, description = "Loan ID")),
    request_body = DecideLoan,
    responses(
        (status = 200, description = "Decision applied", body = Loan),
        (status = 400, description = "Invalid transition or concurrent change",
            body = ErrorResponse),
        (status = 404, description = "Loan not found", body = ErrorResponse)
    )
)]
pub async fn decide_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    AppJson(decision): AppJson<DecideLoan>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.loans.decide(id, decision).await?;
    Ok(Json(loan))
}

/// Register the return of the equipment
#[utoipa::path(
    put,
    path = "/loans/{id}/finalize",
    tag = "loans",
    params(("id" = i32, Path, description = "Loan ID")),
    request_body = FinalizeLoan,
    responses(
        (status = 200, description = "Loan finalized", body = Loan),
        (status = 400, description = "Loan is not active", body = ErrorResponse),
        (status = 404, description = "Loan not found", body = ErrorResponse)
    )
)]
pub async fn finalize_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    AppJson(request): AppJson<FinalizeLoan>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.loans.finalize(id, request).await?;
    Ok(Json(loan))
}

/// Ask for a renewal of an active loan
#[utoipa::path(
    put,
    path = "/loans/{id}/renew",
    tag = "loans",
    params(("id" = i32, Path, description = "Loan ID")),
    request_body = RenewLoan,
    responses(
        (status = 200, description = "Renewal requested", body = Loan),
        (status = 400, description = "Loan is not active or invalid days", body = ErrorResponse),
        (status = 404, description = "Loan not found", body = ErrorResponse)
    )
)]
pub async fn renew_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    AppJson(request): AppJson<RenewLoan>,
) -> AppResult<Json<Loan>> {
    request.validate()?;

    let loan = state.services.loans.renew(id, request).await?;
    Ok(Json(loan))
}

/// Attach a return note to an open loan
#[utoipa::path(
    put,
    path = "/loans/{id}/notify",
    tag = "loans",
    params(("id" = i32, Path, description = "Loan ID")),
    request_body = NotifyReturn,
    responses(
        (status = 200, description = "Note saved", body = Loan),
        (status = 400, description = "Empty note or closed loan", body = ErrorResponse),
        (status = 404, description = "Loan not found", body = ErrorResponse)
    )
)]
pub async fn notify_return(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    AppJson(request): AppJson<NotifyReturn>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.loans.notify(id, request).await?;
    Ok(Json(loan))
}
