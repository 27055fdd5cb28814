use axum::{
    extract::State,
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::resolve_clinic_scope;
use crate::shared::error::ApiError;
use crate::shared::schema::{customers, payments};
use crate::shared::state::AppState;
use crate::transactions::{SaveTransactionRequest, Transaction, TransactionKind};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = payments)]
pub struct Payment {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub amount: BigDecimal,
    pub payment_method: String,
    pub payment_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SavePaymentRequest {
    pub customer_id: Option<Uuid>,
    pub amount: BigDecimal,
    pub payment_method: String,
    pub payment_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct PaymentWithCustomer {
    #[serde(flatten)]
    pub payment: Payment,
    pub customer_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SavePaymentResponse {
    pub payment: Payment,
    pub transaction: Transaction,
}

/// The income ledger entry every payment must be mirrored by.
pub(crate) fn mirror_transaction(payment: &Payment) -> SaveTransactionRequest {
    SaveTransactionRequest {
        customer_id: payment.customer_id,
        amount: payment.amount.clone(),
        transaction_type: TransactionKind::Income.as_str().to_string(),
        category: Some("Payment".to_string()),
        description: Some(format!("Payment - {}", payment.payment_method)),
        transaction_date: payment.payment_date.date_naive(),
    }
}

/// Records received funds. The payment and its mirrored income transaction
/// are written in one database transaction, so a payment without its mirror
/// cannot exist.
pub async fn save_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SavePaymentRequest>,
) -> Result<Json<SavePaymentResponse>, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;

    if req.payment_method.trim().is_empty() {
        return Err(ApiError::validation("payment method required"));
    }

    let payment = Payment {
        id: Uuid::new_v4(),
        clinic_id: scope.clinic_id,
        customer_id: req.customer_id,
        amount: req.amount.abs(),
        payment_method: req.payment_method.trim().to_string(),
        payment_date: req.payment_date.unwrap_or_else(Utc::now),
        created_at: Utc::now(),
    };
    let mirror = mirror_transaction(&payment);

    let (payment, transaction) = conn.transaction::<_, ApiError, _>(|conn| {
        let saved: Payment = diesel::insert_into(payments::table)
            .values(&payment)
            .get_result(conn)?;
        let transaction = crate::transactions::insert_transaction(conn, &scope, mirror)?;
        Ok((saved, transaction))
    })?;

    Ok(Json(SavePaymentResponse {
        payment,
        transaction,
    }))
}

pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<PaymentWithCustomer>>, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;

    let rows: Vec<(Payment, Option<String>)> = payments::table
        .left_join(customers::table)
        .filter(payments::clinic_id.eq(scope.clinic_id))
        .order(payments::payment_date.desc())
        .select((Payment::as_select(), customers::full_name.nullable()))
        .load(&mut conn)?;

    let joined = rows
        .into_iter()
        .map(|(payment, customer_name)| PaymentWithCustomer {
            payment,
            customer_name,
        })
        .collect();

    Ok(Json(joined))
}

pub fn configure_payments_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/payments", get(list_payments).post(save_payment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn sample_payment() -> Payment {
        Payment {
            id: Uuid::new_v4(),
            clinic_id: Uuid::new_v4(),
            customer_id: Some(Uuid::new_v4()),
            amount: BigDecimal::from_str("350.00").unwrap(),
            payment_method: "cash".to_string(),
            payment_date: Utc.with_ymd_and_hms(2025, 10, 23, 14, 30, 0).unwrap(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn mirror_is_an_income_entry_with_the_same_amount_and_customer() {
        let payment = sample_payment();
        let mirror = mirror_transaction(&payment);
        assert_eq!(mirror.transaction_type, "income");
        assert_eq!(mirror.amount, payment.amount);
        assert_eq!(mirror.customer_id, payment.customer_id);
    }

    #[test]
    fn mirror_uses_the_date_part_of_the_payment_time() {
        let payment = sample_payment();
        let mirror = mirror_transaction(&payment);
        assert_eq!(
            mirror.transaction_date,
            chrono::NaiveDate::from_ymd_opt(2025, 10, 23).unwrap()
        );
    }

    #[test]
    fn mirror_description_names_the_method() {
        let mirror = mirror_transaction(&sample_payment());
        assert_eq!(mirror.description.as_deref(), Some("Payment - cash"));
        assert_eq!(mirror.category.as_deref(), Some("Payment"));
    }
}
