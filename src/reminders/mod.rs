use axum::{extract::State, http::HeaderMap, routing::get, Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::resolve_clinic_scope;
use crate::shared::error::ApiError;
use crate::shared::schema::reminders;
use crate::shared::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = reminders)]
pub struct Reminder {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub animal_id: Uuid,
    pub due_date: NaiveDate,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn list_pending_reminders(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Reminder>>, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;

    let rows: Vec<Reminder> = reminders::table
        .filter(reminders::clinic_id.eq(scope.clinic_id))
        .filter(reminders::status.eq("pending"))
        .order(reminders::due_date.asc())
        .load(&mut conn)?;

    Ok(Json(rows))
}

pub fn configure_reminders_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/reminders", get(list_pending_reminders))
}
