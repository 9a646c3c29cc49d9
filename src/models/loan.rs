//! Loan model and the loan status state machine
//!
//! Every status change goes through [`Loan::plan`], which returns a
//! [`LoanTransition`] naming both the loan's next state and the equipment
//! status that must be written alongside it. The loans repository applies a
//! transition as a single unit.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::{EquipmentStatus, LoanStatus, ReturnCondition};
use super::equipment::EquipmentShort;
use super::user::UserShort;
use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
};

/// Maximum length of a return note
pub const MAX_NOTE_LEN: usize = 500;

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub equipment_id: i32,
    pub user_id: i32,
    pub requested_at: DateTime<Utc>,
    /// Set on approval
    pub due_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    /// Duration asked for by the requester, for the initial loan or a renewal
    pub requested_days: Option<i32>,
    pub return_note: Option<String>,
    /// Row version, incremented by every transition
    pub version: i32,
    pub updated_at: DateTime<Utc>,
}

/// Loan with equipment and borrower, as listed to clients
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub status: LoanStatus,
    pub requested_at: DateTime<Utc>,
    pub due_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub requested_days: Option<i32>,
    pub return_note: Option<String>,
    /// Computed at read time, never stored
    pub is_overdue: bool,
    pub equipment: EquipmentShort,
    pub user: UserShort,
}

/// New loan request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateLoan {
    pub equipment_id: i32,
    pub user_id: i32,
    #[validate(range(min = 1, message = "Requested days must be positive"))]
    pub requested_days: Option<i32>,
}

/// Manager decision on a pending loan or a renewal
#[derive(Debug, Deserialize, ToSchema)]
pub struct DecideLoan {
    pub approve: bool,
    /// Overrides the duration stored on the loan
    pub requested_days: Option<i32>,
    /// Explicit due date, wins over any duration
    pub due_at: Option<DateTime<Utc>>,
}

/// Return of the equipment to the manager
#[derive(Debug, Deserialize, ToSchema)]
pub struct FinalizeLoan {
    pub condition: ReturnCondition,
}

/// Requester asks for more time
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RenewLoan {
    #[validate(range(min = 1, message = "Renewal days must be positive"))]
    pub days: Option<i32>,
}

/// Requester leaves a note about the return
#[derive(Debug, Deserialize, ToSchema)]
pub struct NotifyReturn {
    pub note: String,
}

/// Operation requested on an existing loan
#[derive(Debug, Clone, PartialEq)]
pub enum LoanAction {
    Approve {
        requested_days: Option<i32>,
        due_at: Option<DateTime<Utc>>,
    },
    Reject,
    Finalize(ReturnCondition),
    RequestRenewal { days: Option<i32> },
    NotifyReturn { note: String },
}

impl From<DecideLoan> for LoanAction {
    fn from(decision: DecideLoan) -> Self {
        if decision.approve {
            LoanAction::Approve {
                requested_days: decision.requested_days,
                due_at: decision.due_at,
            }
        } else {
            LoanAction::Reject
        }
    }
}

/// Resulting state of a loan after an action, plus the paired equipment write
#[derive(Debug, Clone, PartialEq)]
pub struct LoanTransition {
    pub from: LoanStatus,
    pub to: LoanStatus,
    pub due_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub requested_days: Option<i32>,
    pub return_note: Option<String>,
    /// `None` leaves the equipment untouched
    pub equipment_status: Option<EquipmentStatus>,
}

/// Active loans past their due date
pub fn is_overdue(status: LoanStatus, due_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    status == LoanStatus::Active && due_at.map(|d| d < now).unwrap_or(false)
}

impl Loan {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        is_overdue(self.status, self.due_at, now)
    }

    /// Compute the transition for `action` without touching the store.
    pub fn plan(
        &self,
        action: LoanAction,
        rules: &LoansConfig,
        now: DateTime<Utc>,
    ) -> AppResult<LoanTransition> {
        let unchanged = LoanTransition {
            from: self.status,
            to: self.status,
            due_at: self.due_at,
            returned_at: self.returned_at,
            requested_days: self.requested_days,
            return_note: self.return_note.clone(),
            equipment_status: None,
        };

        match action {
            LoanAction::Approve { requested_days, due_at } => {
                self.require(&[LoanStatus::Pending, LoanStatus::InRenewal], "approved")?;

                let due_at = match due_at {
                    Some(due_at) if due_at <= now => {
                        return Err(AppError::Validation(
                            "Due date must be in the future".to_string(),
                        ))
                    }
                    Some(due_at) => due_at,
                    None => {
                        let days = [requested_days, self.requested_days]
                            .into_iter()
                            .flatten()
                            .find(|d| (1..=rules.max_days).contains(d))
                            .unwrap_or(rules.default_days);
                        now + Duration::days(days as i64)
                    }
                };

                Ok(LoanTransition {
                    to: LoanStatus::Active,
                    due_at: Some(due_at),
                    requested_days: None,
                    equipment_status: Some(EquipmentStatus::Loaned),
                    ..unchanged
                })
            }
            LoanAction::Reject => match self.status {
                LoanStatus::Pending => Ok(LoanTransition {
                    to: LoanStatus::Rejected,
                    equipment_status: Some(EquipmentStatus::Available),
                    ..unchanged
                }),
                // Renewal refused: the due date set before the renewal request stands
                LoanStatus::InRenewal => Ok(LoanTransition {
                    to: LoanStatus::Active,
                    requested_days: None,
                    ..unchanged
                }),
                other => Err(self.invalid(other, "rejected")),
            },
            LoanAction::Finalize(condition) => {
                self.require(&[LoanStatus::Active], "finalized")?;
                Ok(LoanTransition {
                    to: LoanStatus::Finalized,
                    returned_at: Some(now),
                    equipment_status: Some(condition.equipment_status()),
                    ..unchanged
                })
            }
            LoanAction::RequestRenewal { days } => {
                self.require(&[LoanStatus::Active], "renewed")?;
                let days = check_requested_days(days, rules)?;
                Ok(LoanTransition {
                    to: LoanStatus::InRenewal,
                    requested_days: days,
                    ..unchanged
                })
            }
            LoanAction::NotifyReturn { note } => {
                self.require(&[LoanStatus::Active, LoanStatus::InRenewal], "annotated")?;
                let note = note.trim();
                if note.is_empty() {
                    return Err(AppError::Validation("Note must not be empty".to_string()));
                }
                if note.chars().count() > MAX_NOTE_LEN {
                    return Err(AppError::Validation(format!(
                        "Note must be at most {} characters",
                        MAX_NOTE_LEN
                    )));
                }
                Ok(LoanTransition {
                    return_note: Some(note.to_string()),
                    ..unchanged
                })
            }
        }
    }

    fn require(&self, allowed: &[LoanStatus], verb: &str) -> AppResult<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(self.invalid(self.status, verb))
        }
    }

    fn invalid(&self, status: LoanStatus, verb: &str) -> AppError {
        AppError::InvalidTransition(format!(
            "Loan {} is {} and cannot be {}",
            self.id, status, verb
        ))
    }
}

/// Requested durations must fall within `1..=max_days`
pub fn check_requested_days(days: Option<i32>, rules: &LoansConfig) -> AppResult<Option<i32>> {
    match days {
        Some(d) if d < 1 || d > rules.max_days => Err(AppError::Validation(format!(
            "Requested days must be between 1 and {}",
            rules.max_days
        ))),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> LoansConfig {
        LoansConfig {
            default_days: 3,
            max_days: 30,
        }
    }

    fn loan(status: LoanStatus) -> Loan {
        let now = Utc::now();
        Loan {
            id: 10,
            equipment_id: 1,
            user_id: 3,
            requested_at: now - Duration::days(1),
            due_at: None,
            returned_at: None,
            status,
            requested_days: None,
            return_note: None,
            version: 1,
            updated_at: now,
        }
    }

    /// Mirror of what the repository writes for a transition
    fn applied(mut loan: Loan, t: &LoanTransition) -> Loan {
        loan.status = t.to;
        loan.due_at = t.due_at;
        loan.returned_at = t.returned_at;
        loan.requested_days = t.requested_days;
        loan.return_note = t.return_note.clone();
        loan.version += 1;
        loan
    }

    #[test]
    fn test_approve_pending_uses_requested_days() {
        let now = Utc::now();
        let mut pending = loan(LoanStatus::Pending);
        pending.requested_days = Some(7);

        let t = pending
            .plan(LoanAction::Approve { requested_days: None, due_at: None }, &rules(), now)
            .unwrap();

        assert_eq!(t.from, LoanStatus::Pending);
        assert_eq!(t.to, LoanStatus::Active);
        assert_eq!(t.due_at, Some(now + Duration::days(7)));
        assert_eq!(t.requested_days, None);
        assert_eq!(t.equipment_status, Some(EquipmentStatus::Loaned));
    }

    #[test]
    fn test_approve_explicit_days_override_stored() {
        let now = Utc::now();
        let mut pending = loan(LoanStatus::Pending);
        pending.requested_days = Some(7);

        let t = pending
            .plan(LoanAction::Approve { requested_days: Some(5), due_at: None }, &rules(), now)
            .unwrap();
        assert_eq!(t.due_at, Some(now + Duration::days(5)));
    }

    #[test]
    fn test_approve_defaults_to_three_days_when_missing_or_invalid() {
        let now = Utc::now();
        let mut pending = loan(LoanStatus::Pending);
        pending.requested_days = Some(0);

        let t = pending
            .plan(LoanAction::Approve { requested_days: Some(-4), due_at: None }, &rules(), now)
            .unwrap();
        assert_eq!(t.due_at, Some(now + Duration::days(3)));

        let huge = LoanAction::Approve { requested_days: Some(i32::MAX), due_at: None };
        let t = loan(LoanStatus::Pending).plan(huge, &rules(), now).unwrap();
        assert_eq!(t.due_at, Some(now + Duration::days(3)));
    }

    #[test]
    fn test_approve_explicit_due_date_wins() {
        let now = Utc::now();
        let due = now + Duration::days(12);
        let t = loan(LoanStatus::Pending)
            .plan(LoanAction::Approve { requested_days: Some(2), due_at: Some(due) }, &rules(), now)
            .unwrap();
        assert_eq!(t.due_at, Some(due));
    }

    #[test]
    fn test_approve_rejects_past_due_date() {
        let now = Utc::now();
        let err = loan(LoanStatus::Pending)
            .plan(
                LoanAction::Approve {
                    requested_days: None,
                    due_at: Some(now - Duration::hours(1)),
                },
                &rules(),
                now,
            )
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_reject_pending_releases_equipment() {
        let t = loan(LoanStatus::Pending)
            .plan(LoanAction::Reject, &rules(), Utc::now())
            .unwrap();
        assert_eq!(t.to, LoanStatus::Rejected);
        assert_eq!(t.equipment_status, Some(EquipmentStatus::Available));
    }

    #[test]
    fn test_finalize_dispatches_on_condition() {
        let now = Utc::now();
        let active = loan(LoanStatus::Active);

        let good = active
            .plan(LoanAction::Finalize(ReturnCondition::Good), &rules(), now)
            .unwrap();
        assert_eq!(good.to, LoanStatus::Finalized);
        assert_eq!(good.returned_at, Some(now));
        assert_eq!(good.equipment_status, Some(EquipmentStatus::Available));

        let damaged = active
            .plan(LoanAction::Finalize(ReturnCondition::Damaged), &rules(), now)
            .unwrap();
        assert_eq!(damaged.to, LoanStatus::Finalized);
        assert_eq!(damaged.equipment_status, Some(EquipmentStatus::Maintenance));
    }

    #[test]
    fn test_finalize_requires_active() {
        for status in [
            LoanStatus::Pending,
            LoanStatus::InRenewal,
            LoanStatus::Finalized,
            LoanStatus::Rejected,
        ] {
            let err = loan(status)
                .plan(LoanAction::Finalize(ReturnCondition::Good), &rules(), Utc::now())
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidTransition(_)), "{status}");
        }
    }

    #[test]
    fn test_terminal_loans_cannot_be_decided() {
        for status in [LoanStatus::Finalized, LoanStatus::Rejected, LoanStatus::Active] {
            let l = loan(status);
            assert!(l.plan(LoanAction::Reject, &rules(), Utc::now()).is_err());
            let approve = LoanAction::Approve { requested_days: None, due_at: None };
            assert!(l.plan(approve, &rules(), Utc::now()).is_err());
        }
    }

    #[test]
    fn test_renewal_request_stores_days_and_keeps_due_date() {
        let now = Utc::now();
        let mut active = loan(LoanStatus::Active);
        active.due_at = Some(now + Duration::days(2));

        let t = active
            .plan(LoanAction::RequestRenewal { days: Some(4) }, &rules(), now)
            .unwrap();
        assert_eq!(t.to, LoanStatus::InRenewal);
        assert_eq!(t.requested_days, Some(4));
        assert_eq!(t.due_at, active.due_at);
        assert_eq!(t.return_note, None);
        assert_eq!(t.equipment_status, None);
    }

    #[test]
    fn test_renewal_days_bounds() {
        let active = loan(LoanStatus::Active);
        for days in [0, -1, 31] {
            let err = active
                .plan(LoanAction::RequestRenewal { days: Some(days) }, &rules(), Utc::now())
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{days}");
        }
    }

    #[test]
    fn test_rejected_renewal_restores_original_due_date() {
        let now = Utc::now();
        let original_due = now + Duration::days(2);
        let mut active = loan(LoanStatus::Active);
        active.due_at = Some(original_due);

        let renewal = active
            .plan(LoanAction::RequestRenewal { days: Some(10) }, &rules(), now)
            .unwrap();
        let in_renewal = applied(active, &renewal);

        let t = in_renewal
            .plan(LoanAction::Reject, &rules(), now + Duration::hours(1))
            .unwrap();
        assert_eq!(t.from, LoanStatus::InRenewal);
        assert_eq!(t.to, LoanStatus::Active);
        assert_eq!(t.due_at, Some(original_due));
        assert_eq!(t.requested_days, None);
        assert_eq!(t.equipment_status, None);
    }

    #[test]
    fn test_approved_renewal_extends_from_now() {
        let now = Utc::now();
        let mut in_renewal = loan(LoanStatus::InRenewal);
        in_renewal.due_at = Some(now + Duration::days(1));
        in_renewal.requested_days = Some(6);

        let t = in_renewal
            .plan(LoanAction::Approve { requested_days: None, due_at: None }, &rules(), now)
            .unwrap();
        assert_eq!(t.to, LoanStatus::Active);
        assert_eq!(t.due_at, Some(now + Duration::days(6)));
    }

    #[test]
    fn test_notify_keeps_status() {
        let t = loan(LoanStatus::Active)
            .plan(
                LoanAction::NotifyReturn { note: "  Left it at the front desk ".to_string() },
                &rules(),
                Utc::now(),
            )
            .unwrap();
        assert_eq!(t.from, t.to);
        assert_eq!(t.return_note.as_deref(), Some("Left it at the front desk"));
        assert_eq!(t.equipment_status, None);
    }

    #[test]
    fn test_notify_rejects_blank_and_closed_loans() {
        let blank = loan(LoanStatus::Active).plan(
            LoanAction::NotifyReturn { note: "   ".to_string() },
            &rules(),
            Utc::now(),
        );
        assert!(matches!(blank, Err(AppError::Validation(_))));

        let closed = loan(LoanStatus::Finalized).plan(
            LoanAction::NotifyReturn { note: "done".to_string() },
            &rules(),
            Utc::now(),
        );
        assert!(matches!(closed, Err(AppError::InvalidTransition(_))));
    }

    #[test]
    fn test_full_lifecycle() {
        let start = Utc::now();
        let pending = loan(LoanStatus::Pending);

        let approve = pending
            .plan(LoanAction::Approve { requested_days: Some(5), due_at: None }, &rules(), start)
            .unwrap();
        let active = applied(pending, &approve);
        assert_eq!(active.status, LoanStatus::Active);
        assert_eq!(active.due_at, Some(start + Duration::days(5)));
        assert!(!active.is_overdue(start));
        assert!(active.is_overdue(start + Duration::days(6)));

        let finalize = active
            .plan(LoanAction::Finalize(ReturnCondition::Good), &rules(), start + Duration::days(4))
            .unwrap();
        let finalized = applied(active, &finalize);
        assert_eq!(finalized.status, LoanStatus::Finalized);
        assert_eq!(finalize.equipment_status, Some(EquipmentStatus::Available));
        assert!(!finalized.is_overdue(start + Duration::days(10)));
    }

    #[test]
    fn test_decision_maps_to_action() {
        let approve: LoanAction =
            DecideLoan { approve: true, requested_days: Some(2), due_at: None }.into();
        assert_eq!(approve, LoanAction::Approve { requested_days: Some(2), due_at: None });

        let reject: LoanAction =
            DecideLoan { approve: false, requested_days: Some(2), due_at: None }.into();
        assert_eq!(reject, LoanAction::Reject);
    }
}
