//! Loan workflow service
//!
//! Reads the current loan, asks [`Loan::plan`] for the transition and hands it
//! to the store, which writes the loan and its equipment together.

use std::sync::Arc;

use chrono::Utc;

use crate::{
    config::LoansConfig,
    error::AppResult,
    models::loan::{
        check_requested_days, CreateLoan, DecideLoan, FinalizeLoan, Loan, LoanAction, LoanDetails,
        NotifyReturn, RenewLoan,
    },
    repository::loans::LoanStore,
};

#[derive(Clone)]
pub struct LoansService {
    store: Arc<dyn LoanStore>,
    rules: LoansConfig,
}

impl LoansService {
    pub fn new(store: Arc<dyn LoanStore>, rules: LoansConfig) -> Self {
        Self { store, rules }
    }

    pub async fn list(&self) -> AppResult<Vec<LoanDetails>> {
        self.store.list().await
    }

    pub async fn get(&self, id: i32) -> AppResult<LoanDetails> {
        self.store.get_details(id).await
    }

    /// Open a pending loan and reserve the equipment
    pub async fn request(&self, request: CreateLoan) -> AppResult<Loan> {
        check_requested_days(request.requested_days, &self.rules)?;

        let loan = self.store.create_pending(&request).await?;
        tracing::info!(
            loan_id = loan.id,
            equipment_id = loan.equipment_id,
            user_id = loan.user_id,
            "Loan requested"
        );
        Ok(loan)
    }

    /// Approve or reject a pending loan or a renewal request
    pub async fn decide(&self, id: i32, decision: DecideLoan) -> AppResult<Loan> {
        self.transition(id, decision.into()).await
    }

    pub async fn finalize(&self, id: i32, request: FinalizeLoan) -> AppResult<Loan> {
        self.transition(id, LoanAction::Finalize(request.condition)).await
    }

    pub async fn renew(&self, id: i32, request: RenewLoan) -> AppResult<Loan> {
        self.transition(id, LoanAction::RequestRenewal { days: request.days }).await
    }

    pub async fn notify(&self, id: i32, request: NotifyReturn) -> AppResult<Loan> {
        self.transition(id, LoanAction::NotifyReturn { note: request.note }).await
    }

    async fn transition(&self, id: i32, action: LoanAction) -> AppResult<Loan> {
        let loan = self.store.get(id).await?;
        let transition = loan.plan(action, &self.rules, Utc::now())?;
        let updated = self.store.apply(&loan, &transition).await?;

        tracing::info!(
            loan_id = id,
            from = %transition.from,
            to = %transition.to,
            equipment_status = ?transition.equipment_status,
            "Loan updated"
        );
        Ok(updated)
    }
}
