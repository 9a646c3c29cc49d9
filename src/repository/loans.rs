//! Loans repository for database operations

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};

use super::{is_foreign_key_violation, is_unique_violation};
use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{EquipmentStatus, LoanStatus},
        equipment::EquipmentShort,
        loan::{self, CreateLoan, Loan, LoanDetails, LoanTransition},
        user::UserShort,
    },
};

/// Persistence operations the loan state machine relies on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// All loans with equipment and borrower
    async fn list(&self) -> AppResult<Vec<LoanDetails>>;

    /// Loans of one user, newest first
    async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<LoanDetails>>;

    async fn get(&self, id: i32) -> AppResult<Loan>;

    async fn get_details(&self, id: i32) -> AppResult<LoanDetails>;

    /// Reserve the equipment and insert a pending loan in one transaction.
    ///
    /// Fails with `NotFound` when the user or equipment is missing and with
    /// `Conflict` when the equipment is not available.
    async fn create_pending(&self, loan: &CreateLoan) -> AppResult<Loan>;

    /// Write a planned transition and its paired equipment status atomically.
    ///
    /// The loan row is only updated if it is still at `loan.version` and
    /// `transition.from`; any write since `loan` was read gives `StaleWrite`.
    async fn apply(&self, loan: &Loan, transition: &LoanTransition) -> AppResult<Loan>;
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

const DETAILS_QUERY: &str = r#"
    SELECT l.id, l.status, l.requested_at, l.due_at, l.returned_at,
           l.requested_days, l.return_note,
           e.id AS equipment_id, e.name AS equipment_name,
           e.serial AS equipment_serial, e.status AS equipment_status,
           u.id AS user_id, u.full_name AS user_full_name,
           u.email AS user_email, u.role_id AS user_role
    FROM loans l
    JOIN equipment e ON e.id = l.equipment_id
    JOIN users u ON u.id = l.user_id
"#;

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM loans WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

fn details_from_row(row: &PgRow) -> Result<LoanDetails, sqlx::Error> {
    let status: LoanStatus = row.try_get("status")?;
    let due_at = row.try_get("due_at")?;

    Ok(LoanDetails {
        id: row.try_get("id")?,
        status,
        requested_at: row.try_get("requested_at")?,
        due_at,
        returned_at: row.try_get("returned_at")?,
        requested_days: row.try_get("requested_days")?,
        return_note: row.try_get("return_note")?,
        is_overdue: loan::is_overdue(status, due_at, Utc::now()),
        equipment: EquipmentShort {
            id: row.try_get("equipment_id")?,
            name: row.try_get("equipment_name")?,
            serial: row.try_get("equipment_serial")?,
            status: row.try_get("equipment_status")?,
        },
        user: UserShort {
            id: row.try_get("user_id")?,
            full_name: row.try_get("user_full_name")?,
            email: row.try_get("user_email")?,
            role: row.try_get("user_role")?,
        },
    })
}

#[async_trait]
impl LoanStore for LoansRepository {
    async fn list(&self) -> AppResult<Vec<LoanDetails>> {
        let query = format!("{} ORDER BY l.requested_at DESC, l.id DESC", DETAILS_QUERY);
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        let loans = rows.iter().map(details_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(loans)
    }

    async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        let query = format!(
            "{} WHERE l.user_id = $1 ORDER BY l.requested_at DESC, l.id DESC",
            DETAILS_QUERY
        );
        let rows = sqlx::query(&query).bind(user_id).fetch_all(&self.pool).await?;
        let loans = rows.iter().map(details_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(loans)
    }

    async fn get(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    async fn get_details(&self, id: i32) -> AppResult<LoanDetails> {
        let query = format!("{} WHERE l.id = $1", DETAILS_QUERY);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;
        Ok(details_from_row(&row)?)
    }

    async fn create_pending(&self, request: &CreateLoan) -> AppResult<Loan> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let user_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(request.user_id)
                .fetch_one(&mut *tx)
                .await?;
        if !user_exists {
            return Err(AppError::NotFound(format!("User with id {} not found", request.user_id)));
        }

        // Compare-and-swap: concurrent requests serialize on the row lock and
        // only the first one still sees the equipment as available.
        let reserved: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE equipment SET status = $1, updated_at = $2
            WHERE id = $3 AND status = $4
            RETURNING id
            "#,
        )
        .bind(EquipmentStatus::Loaned)
        .bind(now)
        .bind(request.equipment_id)
        .bind(EquipmentStatus::Available)
        .fetch_optional(&mut *tx)
        .await?;

        if reserved.is_none() {
            let status: Option<EquipmentStatus> =
                sqlx::query_scalar("SELECT status FROM equipment WHERE id = $1")
                    .bind(request.equipment_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            return Err(match status {
                None => AppError::NotFound(format!("Equipment {} not found", request.equipment_id)),
                Some(status) => AppError::Conflict(format!(
                    "Equipment {} is not available ({})",
                    request.equipment_id, status
                )),
            });
        }

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans
                (equipment_id, user_id, requested_at, status, requested_days, updated_at)
            VALUES ($1, $2, $3, $4, $5, $3)
            RETURNING *
            "#,
        )
        .bind(request.equipment_id)
        .bind(request.user_id)
        .bind(now)
        .bind(LoanStatus::Pending)
        .bind(request.requested_days)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!(
                    "Equipment {} already has an open loan",
                    request.equipment_id
                ))
            } else if is_foreign_key_violation(&e) {
                AppError::NotFound("User or equipment no longer exists".to_string())
            } else {
                e.into()
            }
        })?;

        tx.commit().await?;
        Ok(loan)
    }

    async fn apply(&self, current: &Loan, transition: &LoanTransition) -> AppResult<Loan> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans
            SET status = $1, due_at = $2, returned_at = $3,
                requested_days = $4, return_note = $5, updated_at = $6,
                version = version + 1
            WHERE id = $7 AND status = $8 AND version = $9
            RETURNING *
            "#,
        )
        .bind(transition.to)
        .bind(transition.due_at)
        .bind(transition.returned_at)
        .bind(transition.requested_days)
        .bind(&transition.return_note)
        .bind(now)
        .bind(current.id)
        .bind(transition.from)
        .bind(current.version)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            tx.rollback().await?;
            return Err(if self.exists(current.id).await? {
                AppError::StaleWrite(format!("Loan {} was modified concurrently", current.id))
            } else {
                AppError::NotFound(format!("Loan with id {} not found", current.id))
            });
        };

        if let Some(status) = transition.equipment_status {
            sqlx::query("UPDATE equipment SET status = $1, updated_at = $2 WHERE id = $3")
                .bind(status)
                .bind(now)
                .bind(current.equipment_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(updated)
    }
}
