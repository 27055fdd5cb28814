//! Combines the API endpoints of every domain module into one router.

use axum::Router;
use std::sync::Arc;

use crate::shared::state::AppState;

pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(crate::auth::configure_auth_routes())
        .merge(crate::animals::configure_animals_routes())
        .merge(crate::customers::configure_customers_routes())
        .merge(crate::appointments::configure_appointments_routes())
        .merge(crate::health::configure_health_routes())
        .merge(crate::transactions::configure_transactions_routes())
        .merge(crate::payments::configure_payments_routes())
        .merge(crate::products::configure_products_routes())
        .merge(crate::reminders::configure_reminders_routes())
        .merge(crate::audit::configure_audit_routes())
        .merge(crate::insights::configure_insights_routes())
        .merge(crate::dashboard::configure_dashboard_routes())
}
