use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::resolve_clinic_scope;
use crate::shared::error::ApiError;
use crate::shared::schema::{animals, appointments, customers, transactions};
use crate::shared::state::AppState;
use crate::transactions::{signed_total, Transaction};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = customers)]
pub struct Customer {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SaveCustomerRequest {
    pub id: Option<Uuid>,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CustomerWithBalance {
    #[serde(flatten)]
    pub customer: Customer,
    pub balance: BigDecimal,
}

#[derive(Debug, Serialize, Queryable)]
pub struct AnimalSummary {
    pub id: Uuid,
    pub name: String,
    pub species: String,
}

fn ledger_entries(
    conn: &mut PgConnection,
    customer_id: Uuid,
) -> Result<Vec<(String, BigDecimal)>, ApiError> {
    let rows = transactions::table
        .filter(transactions::customer_id.eq(customer_id))
        .select((transactions::transaction_type, transactions::amount))
        .load::<(String, BigDecimal)>(conn)?;
    Ok(rows)
}

/// Current balance for one customer, recomputed from the transaction log.
pub fn customer_balance(conn: &mut PgConnection, customer_id: Uuid) -> Result<BigDecimal, ApiError> {
    Ok(signed_total(&ledger_entries(conn, customer_id)?))
}

pub async fn list_customers(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Customer>>, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;

    let rows: Vec<Customer> = customers::table
        .filter(customers::clinic_id.eq(scope.clinic_id))
        .order(customers::full_name.asc())
        .load(&mut conn)?;

    Ok(Json(rows))
}

/// Every customer annotated with their balance, ordered by name. Balances
/// are derived from the full transaction set at read time; two sequential
/// calls after a write always see the new state.
pub async fn list_customers_with_balance(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<CustomerWithBalance>>, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;

    let rows: Vec<Customer> = customers::table
        .filter(customers::clinic_id.eq(scope.clinic_id))
        .order(customers::full_name.asc())
        .load(&mut conn)?;

    let entries: Vec<(Option<Uuid>, String, BigDecimal)> = transactions::table
        .filter(transactions::clinic_id.eq(scope.clinic_id))
        .filter(transactions::customer_id.is_not_null())
        .select((
            transactions::customer_id,
            transactions::transaction_type,
            transactions::amount,
        ))
        .load(&mut conn)?;

    let mut per_customer: HashMap<Uuid, Vec<(String, BigDecimal)>> = HashMap::new();
    for (customer_id, kind, amount) in entries {
        if let Some(customer_id) = customer_id {
            per_customer
                .entry(customer_id)
                .or_default()
                .push((kind, amount));
        }
    }

    let annotated = rows
        .into_iter()
        .map(|customer| {
            let balance = per_customer
                .get(&customer.id)
                .map(|e| signed_total(e))
                .unwrap_or_else(|| BigDecimal::from(0));
            CustomerWithBalance { customer, balance }
        })
        .collect();

    Ok(Json(annotated))
}

pub async fn get_customer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CustomerWithBalance>, ApiError> {
    let mut conn = state.conn.get()?;

    let customer: Customer = customers::table
        .filter(customers::id.eq(id))
        .first(&mut conn)
        .map_err(|_| ApiError::not_found(format!("customer {id} not found")))?;
    let balance = customer_balance(&mut conn, id)?;

    Ok(Json(CustomerWithBalance { customer, balance }))
}

pub async fn save_customer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SaveCustomerRequest>,
) -> Result<Json<Customer>, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;

    if req.full_name.trim().is_empty() {
        return Err(ApiError::validation("customer name required"));
    }

    let saved: Customer = match req.id {
        Some(id) => diesel::update(
            customers::table
                .filter(customers::id.eq(id))
                .filter(customers::clinic_id.eq(scope.clinic_id)),
        )
        .set((
            customers::full_name.eq(req.full_name.trim()),
            customers::email.eq(req.email),
            customers::phone.eq(req.phone),
            customers::address.eq(req.address),
        ))
        .get_result(&mut conn)?,
        None => {
            let customer = Customer {
                id: Uuid::new_v4(),
                clinic_id: scope.clinic_id,
                full_name: req.full_name.trim().to_string(),
                email: req.email,
                phone: req.phone,
                address: req.address,
                created_at: Utc::now(),
            };
            diesel::insert_into(customers::table)
                .values(&customer)
                .get_result(&mut conn)?
        }
    };

    Ok(Json(saved))
}

/// Explicit delete only. Deletion does not cascade in application logic;
/// owned animals keep a dangling owner reference cleared by the schema.
pub async fn delete_customer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;

    diesel::delete(
        customers::table
            .filter(customers::id.eq(id))
            .filter(customers::clinic_id.eq(scope.clinic_id)),
    )
    .execute(&mut conn)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_customer_animals(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AnimalSummary>>, ApiError> {
    let mut conn = state.conn.get()?;

    let rows: Vec<AnimalSummary> = animals::table
        .filter(animals::customer_id.eq(id))
        .select((animals::id, animals::name, animals::species))
        .load(&mut conn)?;

    Ok(Json(rows))
}

pub async fn list_customer_appointments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<crate::appointments::Appointment>>, ApiError> {
    let mut conn = state.conn.get()?;

    let rows = appointments::table
        .filter(appointments::customer_id.eq(id))
        .order(appointments::start_time.desc())
        .select(crate::appointments::Appointment::as_select())
        .load(&mut conn)?;

    Ok(Json(rows))
}

pub async fn list_customer_transactions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let mut conn = state.conn.get()?;

    let rows: Vec<Transaction> = transactions::table
        .filter(transactions::customer_id.eq(id))
        .order(transactions::transaction_date.desc())
        .select(Transaction::as_select())
        .load(&mut conn)?;

    Ok(Json(rows))
}

pub async fn get_customer_balance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut conn = state.conn.get()?;
    let balance = customer_balance(&mut conn, id)?;
    Ok(Json(serde_json::json!({ "customer_id": id, "balance": balance })))
}

pub fn configure_customers_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/customers", get(list_customers).post(save_customer))
        .route("/api/customers/with-balance", get(list_customers_with_balance))
        .route("/api/customers/:id", get(get_customer).delete(delete_customer))
        .route("/api/customers/:id/balance", get(get_customer_balance))
        .route("/api/customers/:id/animals", get(list_customer_animals))
        .route(
            "/api/customers/:id/appointments",
            get(list_customer_appointments),
        )
        .route(
            "/api/customers/:id/transactions",
            get(list_customer_transactions),
        )
}
