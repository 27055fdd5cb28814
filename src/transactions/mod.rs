use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{resolve_clinic_scope, ClinicScope};
use crate::shared::error::ApiError;
use crate::shared::schema::transactions;
use crate::shared::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }
}

/// A signed ledger entry. Amounts are stored positive; the direction lives in
/// `transaction_type`. Immutable once created: there is no update path.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = transactions)]
pub struct Transaction {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub amount: BigDecimal,
    pub transaction_type: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub transaction_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveTransactionRequest {
    pub customer_id: Option<Uuid>,
    pub amount: BigDecimal,
    pub transaction_type: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub transaction_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub customer_id: Option<Uuid>,
    pub transaction_type: Option<String>,
    pub limit: Option<i64>,
}

/// Balance of a customer is the signed sum of their ledger entries, always
/// recomputed from the log itself. No stored running total is authoritative.
pub fn signed_total(entries: &[(String, BigDecimal)]) -> BigDecimal {
    let mut total = BigDecimal::from(0);
    for (kind, amount) in entries {
        match TransactionKind::parse(kind) {
            Some(TransactionKind::Income) => total += amount,
            Some(TransactionKind::Expense) => total -= amount,
            None => {}
        }
    }
    total
}

pub fn insert_transaction(
    conn: &mut PgConnection,
    scope: &ClinicScope,
    req: SaveTransactionRequest,
) -> Result<Transaction, ApiError> {
    let kind = TransactionKind::parse(&req.transaction_type).ok_or_else(|| {
        ApiError::validation(format!("unknown transaction type: {}", req.transaction_type))
    })?;

    let entry = Transaction {
        id: Uuid::new_v4(),
        clinic_id: scope.clinic_id,
        customer_id: req.customer_id,
        amount: req.amount.abs(),
        transaction_type: kind.as_str().to_string(),
        category: req.category,
        description: req.description,
        transaction_date: req.transaction_date,
        created_at: Utc::now(),
    };

    let saved = diesel::insert_into(transactions::table)
        .values(&entry)
        .get_result(conn)?;

    Ok(saved)
}

pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;

    let mut q = transactions::table
        .filter(transactions::clinic_id.eq(scope.clinic_id))
        .into_boxed();

    if let Some(customer_id) = query.customer_id {
        q = q.filter(transactions::customer_id.eq(customer_id));
    }
    if let Some(kind) = query.transaction_type {
        q = q.filter(transactions::transaction_type.eq(kind));
    }

    let rows: Vec<Transaction> = q
        .order(transactions::transaction_date.desc())
        .limit(query.limit.unwrap_or(200))
        .load(&mut conn)?;

    Ok(Json(rows))
}

pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SaveTransactionRequest>,
) -> Result<Json<Transaction>, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;
    let saved = insert_transaction(&mut conn, &scope, req)?;
    Ok(Json(saved))
}

pub fn configure_transactions_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api/transactions",
        get(list_transactions).post(create_transaction),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn bd(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn signed_total_subtracts_expenses() {
        let entries = vec![
            ("income".to_string(), bd("1200.00")),
            ("expense".to_string(), bd("450.00")),
            ("expense".to_string(), bd("50.50")),
        ];
        assert_eq!(signed_total(&entries), bd("699.50"));
    }

    #[test]
    fn signed_total_of_empty_ledger_is_zero() {
        assert_eq!(signed_total(&[]), BigDecimal::from(0));
    }

    #[test]
    fn a_single_expense_yields_a_negative_balance() {
        let entries = vec![("expense".to_string(), bd("450"))];
        assert_eq!(signed_total(&entries), bd("-450"));
    }

    #[test]
    fn unknown_kinds_do_not_move_the_balance() {
        let entries = vec![
            ("income".to_string(), bd("100")),
            ("adjustment".to_string(), bd("9999")),
        ];
        assert_eq!(signed_total(&entries), bd("100"));
    }
}
