use axum::{extract::State, http::HeaderMap, routing::get, Json, Router};
use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;

use crate::auth::resolve_clinic_scope;
use crate::shared::error::ApiError;
use crate::shared::schema::{animals, customers, payments};
use crate::shared::state::AppState;

#[derive(Debug, Serialize)]
pub struct DashboardKpis {
    pub total_animals: i64,
    pub total_customers: i64,
    pub todays_payments: BigDecimal,
}

pub async fn get_kpis(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DashboardKpis>, ApiError> {
    let pool = state.conn.clone();

    let kpis = tokio::task::spawn_blocking(move || -> Result<DashboardKpis, ApiError> {
        let mut conn = pool.get()?;
        let scope = resolve_clinic_scope(&mut conn, &headers)?;

        let total_animals: i64 = animals::table
            .filter(animals::clinic_id.eq(scope.clinic_id))
            .count()
            .get_result(&mut conn)?;

        let total_customers: i64 = customers::table
            .filter(customers::clinic_id.eq(scope.clinic_id))
            .count()
            .get_result(&mut conn)?;

        let today_start = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc();
        let todays_payments: Option<BigDecimal> = payments::table
            .filter(payments::clinic_id.eq(scope.clinic_id))
            .filter(payments::payment_date.ge(today_start))
            .select(diesel::dsl::sum(payments::amount))
            .first(&mut conn)?;

        Ok(DashboardKpis {
            total_animals,
            total_customers,
            todays_payments: todays_payments.unwrap_or_else(|| BigDecimal::from(0)),
        })
    })
    .await
    .map_err(|e| ApiError::Persistence(format!("kpi task failed: {e}")))??;

    Ok(Json(kpis))
}

pub fn configure_dashboard_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/dashboard/kpis", get(get_kpis))
}
