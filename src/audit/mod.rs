use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::ClinicScope;
use crate::shared::error::ApiError;
use crate::shared::schema::audit_logs;
use crate::shared::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = audit_logs)]
pub struct AuditLog {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub target_table: String,
    pub target_id: Uuid,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Appends an audit entry. Best-effort: a failure here must never invalidate
/// the primary write, so errors are logged and swallowed.
pub fn record_entry(
    conn: &mut PgConnection,
    scope: &ClinicScope,
    action: &str,
    target_table: &str,
    target_id: Uuid,
    details: serde_json::Value,
) {
    let entry = AuditLog {
        id: Uuid::new_v4(),
        clinic_id: scope.clinic_id,
        user_id: Some(scope.user_id),
        action: action.to_string(),
        target_table: target_table.to_string(),
        target_id,
        details,
        created_at: Utc::now(),
    };

    if let Err(e) = diesel::insert_into(audit_logs::table)
        .values(&entry)
        .execute(conn)
    {
        warn!("audit log write failed for {target_table}/{target_id}: {e}");
    }
}

pub async fn list_animal_audit_logs(
    State(state): State<Arc<AppState>>,
    Path(animal_id): Path<Uuid>,
) -> Result<Json<Vec<AuditLog>>, ApiError> {
    let mut conn = state.conn.get()?;

    let entries: Vec<AuditLog> = audit_logs::table
        .filter(audit_logs::target_table.eq("animals"))
        .filter(audit_logs::target_id.eq(animal_id))
        .order(audit_logs::created_at.desc())
        .load(&mut conn)?;

    Ok(Json(entries))
}

pub fn configure_audit_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/animals/:id/audit", get(list_animal_audit_logs))
}
