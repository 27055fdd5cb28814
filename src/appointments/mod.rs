use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::resolve_clinic_scope;
use crate::shared::error::ApiError;
use crate::shared::schema::{animals, appointments, customers};
use crate::shared::state::AppState;

/// Address stored for an on-site visit whose address was left blank.
pub const UNSPECIFIED_ADDRESS: &str = "unspecified";

pub const DEFAULT_DURATION_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentType {
    Clinic,
    OnSite,
}

impl AppointmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clinic => "clinic",
            Self::OnSite => "on_site",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "clinic" => Some(Self::Clinic),
            "on_site" => Some(Self::OnSite),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = appointments)]
pub struct Appointment {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub customer_id: Uuid,
    pub animal_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub appointment_type: String,
    pub address: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SaveAppointmentRequest {
    pub id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub animal_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub appointment_type: Option<String>,
    pub address: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, Queryable)]
pub struct AnimalRef {
    pub name: String,
    pub species: String,
}

#[derive(Debug, Serialize)]
pub struct AppointmentWithNames {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub customer_name: String,
    pub animal: Option<AnimalRef>,
}

pub(crate) fn default_end_time(
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
) -> DateTime<Utc> {
    end.unwrap_or(start + Duration::minutes(DEFAULT_DURATION_MINUTES))
}

/// Clinic visits never carry an address; on-site visits always do, falling
/// back to the "unspecified" sentinel when the form left it blank.
pub(crate) fn normalized_address(
    kind: AppointmentType,
    address: Option<String>,
) -> Option<String> {
    match kind {
        AppointmentType::Clinic => None,
        AppointmentType::OnSite => Some(
            address
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| UNSPECIFIED_ADDRESS.to_string()),
        ),
    }
}

pub(crate) fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
    let end = date
        .and_hms_micro_opt(23, 59, 59, 999_999)
        .expect("end of day is always valid");
    (start.and_utc(), end.and_utc())
}

/// All appointments starting on the given date, ascending, joined with the
/// customer name and animal name/species for display.
pub async fn appointments_on_date(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<DayQuery>,
) -> Result<Json<Vec<AppointmentWithNames>>, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;
    let (day_start, day_end) = day_bounds(query.date);

    let rows: Vec<(Appointment, String, Option<AnimalRef>)> = appointments::table
        .inner_join(customers::table)
        .left_join(animals::table)
        .filter(appointments::clinic_id.eq(scope.clinic_id))
        .filter(appointments::start_time.ge(day_start))
        .filter(appointments::start_time.le(day_end))
        .order(appointments::start_time.asc())
        .select((
            Appointment::as_select(),
            customers::full_name,
            (animals::name, animals::species).nullable(),
        ))
        .load(&mut conn)?;

    let joined = rows
        .into_iter()
        .map(|(appointment, customer_name, animal)| AppointmentWithNames {
            appointment,
            customer_name,
            animal,
        })
        .collect();

    Ok(Json(joined))
}

pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentWithNames>, ApiError> {
    let mut conn = state.conn.get()?;

    let (appointment, customer_name, animal): (Appointment, String, Option<AnimalRef>) =
        appointments::table
            .inner_join(customers::table)
            .left_join(animals::table)
            .filter(appointments::id.eq(id))
            .select((
                Appointment::as_select(),
                customers::full_name,
                (animals::name, animals::species).nullable(),
            ))
            .first(&mut conn)
            .map_err(|_| ApiError::not_found(format!("appointment {id} not found")))?;

    Ok(Json(AppointmentWithNames {
        appointment,
        customer_name,
        animal,
    }))
}

pub async fn save_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SaveAppointmentRequest>,
) -> Result<Json<Appointment>, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;

    let customer_id = req
        .customer_id
        .ok_or_else(|| ApiError::validation("customer required"))?;

    let kind = match req.appointment_type.as_deref() {
        None => AppointmentType::Clinic,
        Some(raw) => AppointmentType::parse(raw)
            .ok_or_else(|| ApiError::validation(format!("unknown appointment type: {raw}")))?,
    };
    let status = match req.status.as_deref() {
        None => AppointmentStatus::Pending,
        Some(raw) => AppointmentStatus::parse(raw)
            .ok_or_else(|| ApiError::validation(format!("unknown appointment status: {raw}")))?,
    };

    let end_time = default_end_time(req.start_time, req.end_time);
    let address = normalized_address(kind, req.address);

    let saved: Appointment = match req.id {
        Some(id) => diesel::update(
            appointments::table
                .filter(appointments::id.eq(id))
                .filter(appointments::clinic_id.eq(scope.clinic_id)),
        )
        .set((
            appointments::customer_id.eq(customer_id),
            appointments::animal_id.eq(req.animal_id),
            appointments::start_time.eq(req.start_time),
            appointments::end_time.eq(end_time),
            appointments::appointment_type.eq(kind.as_str()),
            appointments::address.eq(address),
            appointments::status.eq(status.as_str()),
            appointments::notes.eq(req.notes),
        ))
        .get_result(&mut conn)?,
        None => {
            let appointment = Appointment {
                id: Uuid::new_v4(),
                clinic_id: scope.clinic_id,
                customer_id,
                animal_id: req.animal_id,
                start_time: req.start_time,
                end_time,
                appointment_type: kind.as_str().to_string(),
                address,
                status: status.as_str().to_string(),
                notes: req.notes,
                created_at: Utc::now(),
            };
            diesel::insert_into(appointments::table)
                .values(&appointment)
                .get_result(&mut conn)?
        }
    };

    Ok(Json(saved))
}

/// Unconditional status update: any status is reachable from any other,
/// including reopening cancelled or completed appointments. There is no
/// transition table; callers get exactly what they ask for.
pub async fn set_appointment_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Appointment>, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;

    let status = AppointmentStatus::parse(&req.status).ok_or_else(|| {
        ApiError::validation(format!("unknown appointment status: {}", req.status))
    })?;

    let updated: Appointment = diesel::update(
        appointments::table
            .filter(appointments::id.eq(id))
            .filter(appointments::clinic_id.eq(scope.clinic_id)),
    )
    .set(appointments::status.eq(status.as_str()))
    .get_result(&mut conn)?;

    Ok(Json(updated))
}

pub fn configure_appointments_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/appointments",
            get(appointments_on_date).post(save_appointment),
        )
        .route("/api/appointments/:id", get(get_appointment))
        .route("/api/appointments/:id/status", put(set_appointment_status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn missing_end_time_defaults_to_one_hour() {
        let start = at(2025, 10, 23, 10, 0);
        assert_eq!(default_end_time(start, None), at(2025, 10, 23, 11, 0));
    }

    #[test]
    fn explicit_end_time_is_kept() {
        let start = at(2025, 10, 23, 10, 0);
        let end = at(2025, 10, 23, 10, 30);
        assert_eq!(default_end_time(start, Some(end)), end);
    }

    #[test]
    fn clinic_visits_never_store_an_address() {
        assert_eq!(
            normalized_address(AppointmentType::Clinic, Some("Field 12".to_string())),
            None
        );
    }

    #[test]
    fn blank_on_site_address_becomes_the_sentinel() {
        assert_eq!(
            normalized_address(AppointmentType::OnSite, None),
            Some(UNSPECIFIED_ADDRESS.to_string())
        );
        assert_eq!(
            normalized_address(AppointmentType::OnSite, Some("  ".to_string())),
            Some(UNSPECIFIED_ADDRESS.to_string())
        );
    }

    #[test]
    fn provided_on_site_address_is_kept() {
        assert_eq!(
            normalized_address(AppointmentType::OnSite, Some("Farm Road 7".to_string())),
            Some("Farm Road 7".to_string())
        );
    }

    #[test]
    fn day_bounds_cover_the_whole_date() {
        let (start, end) = day_bounds(NaiveDate::from_ymd_opt(2025, 10, 23).unwrap());
        assert_eq!(start, at(2025, 10, 23, 0, 0));
        assert!(end > at(2025, 10, 23, 23, 59));
        assert!(end < at(2025, 10, 24, 0, 0));
    }

    #[test]
    fn every_status_is_reachable_by_name() {
        for s in ["pending", "confirmed", "cancelled", "completed"] {
            assert!(AppointmentStatus::parse(s).is_some());
        }
        assert!(AppointmentStatus::parse("rescheduled").is_none());
    }
}
