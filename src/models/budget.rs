use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::ResourceKind;
use crate::errors::{AppError, AppResult};
use crate::gateway::ProjectResource;
use crate::utils::utc_now;

/// Ten significant digits with two after the point.
const MAX_AMOUNT_CENTS: i64 = 9_999_999_999;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Budget {
    pub id: Uuid,
    pub project_id: Uuid,
    #[schema(example = 2025)]
    pub year: u32,
    /// Derived from the stored cents. Amounts stay below 10^8 with two
    /// decimals, so the nearest `f64` always prints back as the exact decimal.
    #[schema(example = 150000.5)]
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    amount_cents: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbBudget {
    pub id: Uuid,
    pub project_id: Uuid,
    pub year: i64,
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbBudget> for Budget {
    type Error = AppError;

    fn try_from(value: DbBudget) -> Result<Self, Self::Error> {
        let year = u32::try_from(value.year)
            .map_err(|_| AppError::internal(format!("invalid budget year: {}", value.year)))?;

        Ok(Budget {
            id: value.id,
            project_id: value.project_id,
            year,
            amount: value.amount_cents as f64 / 100.0,
            created_at: value.created_at,
            amount_cents: value.amount_cents,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BudgetCreateRequest {
    #[schema(example = 2025)]
    pub year: u32,
    #[schema(example = 150000.5)]
    pub amount: f64,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct BudgetUpdateRequest {
    pub year: Option<u32>,
    pub amount: Option<f64>,
}

impl Budget {
    pub fn amount_cents(&self) -> i64 {
        self.amount_cents
    }

    /// Validates and refreshes the stored cent amount.
    fn validate(&mut self) -> AppResult<()> {
        if self.year == 0 {
            return Err(AppError::validation("year", "year must be a positive integer"));
        }
        self.amount_cents = to_cents(self.amount)?;
        Ok(())
    }
}

fn to_cents(amount: f64) -> AppResult<i64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(AppError::validation("amount", "amount must be a non-negative number"));
    }

    let scaled = amount * 100.0;
    let cents = scaled.round();
    if (scaled - cents).abs() > 1e-3 {
        return Err(AppError::validation("amount", "amount allows at most two decimal places"));
    }
    if cents > MAX_AMOUNT_CENTS as f64 {
        return Err(AppError::validation("amount", "amount allows at most ten digits"));
    }

    Ok(cents as i64)
}

#[async_trait]
impl ProjectResource for Budget {
    const KIND: ResourceKind = ResourceKind::Budget;
    const TABLE: &'static str = "budgets";
    const COLUMNS: &'static str = "id, project_id, year, amount_cents, created_at";

    type Row = DbBudget;
    type Create = BudgetCreateRequest;
    type Update = BudgetUpdateRequest;

    fn from_row(row: Self::Row) -> AppResult<Self> {
        row.try_into()
    }

    fn build(project_id: Uuid, payload: Self::Create) -> AppResult<Self> {
        let mut budget = Budget {
            id: Uuid::new_v4(),
            project_id,
            year: payload.year,
            amount: payload.amount,
            created_at: utc_now(),
            amount_cents: 0,
        };
        budget.validate()?;
        Ok(budget)
    }

    fn apply(&mut self, payload: Self::Update) -> AppResult<()> {
        if let Some(year) = payload.year {
            self.year = year;
        }
        if let Some(amount) = payload.amount {
            self.amount = amount;
        }
        self.validate()
    }

    async fn insert(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO budgets (id, project_id, year, amount_cents, created_at) VALUES (?, ?, ?, ?, ?)")
            .bind(self.id)
            .bind(self.project_id)
            .bind(i64::from(self.year))
            .bind(self.amount_cents)
            .bind(self.created_at)
            .execute(conn)
            .await?;
        Ok(())
    }

    async fn save(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE budgets SET year = ?, amount_cents = ? WHERE id = ? AND project_id = ?")
            .bind(i64::from(self.year))
            .bind(self.amount_cents)
            .bind(self.id)
            .bind(self.project_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    fn conflict_message(&self) -> String {
        format!("a budget for {} already exists in this project", self.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_converts_to_cents() {
        assert_eq!(to_cents(1500.25).expect("valid"), 150_025);
        assert_eq!(to_cents(0.0).expect("valid"), 0);
        assert_eq!(to_cents(99_999_999.99).expect("valid"), MAX_AMOUNT_CENTS);
    }

    #[test]
    fn amount_rejects_excess_precision_and_range() {
        assert!(to_cents(10.001).is_err());
        assert!(to_cents(-1.0).is_err());
        assert!(to_cents(100_000_000.0).is_err());
        assert!(to_cents(f64::NAN).is_err());
    }

    #[test]
    fn build_keeps_cents_in_sync() {
        let mut budget = Budget::build(Uuid::new_v4(), BudgetCreateRequest { year: 2025, amount: 12.5 }).expect("valid");
        assert_eq!(budget.amount_cents(), 1250);

        budget
            .apply(BudgetUpdateRequest {
                amount: Some(99.99),
                ..Default::default()
            })
            .expect("valid update");
        assert_eq!(budget.amount_cents(), 9999);
    }

    #[test]
    fn stored_cents_serialize_as_the_exact_decimal() {
        for (cents, expected) in [(MAX_AMOUNT_CENTS, "99999999.99"), (1, "0.01"), (150_025, "1500.25"), (10, "0.1")] {
            let budget = Budget::try_from(DbBudget {
                id: Uuid::new_v4(),
                project_id: Uuid::new_v4(),
                year: 2025,
                amount_cents: cents,
                created_at: Utc::now(),
            })
            .expect("valid row");
            let json = serde_json::to_value(&budget).expect("serializes");
            assert_eq!(json["amount"].to_string(), expected);
            assert_eq!(to_cents(budget.amount).expect("round trips"), cents);
        }
    }

    #[test]
    fn zero_year_is_rejected() {
        let err = Budget::build(Uuid::new_v4(), BudgetCreateRequest { year: 0, amount: 1.0 }).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "year"));
    }
}
