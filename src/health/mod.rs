use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{resolve_clinic_scope, ClinicScope};
use crate::reminders::Reminder;
use crate::shared::error::ApiError;
use crate::shared::schema::{health_records, reminders};
use crate::shared::state::AppState;

/// Message prefix identifying the single follow-up reminder an animal gets
/// for insemination checks. The upsert below keys on it.
pub const PREGNANCY_CHECK_PREFIX: &str = "Pregnancy check";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthEventType {
    Treatment,
    Vaccination,
    Insemination,
}

impl HealthEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Treatment => "treatment",
            Self::Vaccination => "vaccination",
            Self::Insemination => "insemination",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "treatment" => Some(Self::Treatment),
            "vaccination" => Some(Self::Vaccination),
            "insemination" => Some(Self::Insemination),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = health_records)]
pub struct HealthRecord {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub animal_id: Uuid,
    pub event_type: String,
    pub event_date: NaiveDate,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub vaccine_name: Option<String>,
    pub batch_no: Option<String>,
    pub dose: Option<String>,
    pub insemination_type: Option<String>,
    pub next_check_date: Option<NaiveDate>,
    pub administered_by: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveHealthRecordRequest {
    pub id: Option<Uuid>,
    pub animal_id: Option<Uuid>,
    pub event_type: String,
    pub event_date: NaiveDate,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub vaccine_name: Option<String>,
    pub batch_no: Option<String>,
    pub dose: Option<String>,
    pub insemination_type: Option<String>,
    pub next_check_date: Option<NaiveDate>,
    pub administered_by: Option<Uuid>,
    pub notes: Option<String>,
}

/// Nulls every optional field that does not belong to the record's event
/// type, so an edited record never retains stale values from a previous
/// event type.
pub(crate) fn strip_irrelevant_fields(
    event_type: HealthEventType,
    mut req: SaveHealthRecordRequest,
) -> SaveHealthRecordRequest {
    match event_type {
        HealthEventType::Treatment => {
            req.vaccine_name = None;
            req.batch_no = None;
            req.dose = None;
            req.insemination_type = None;
            req.next_check_date = None;
        }
        HealthEventType::Vaccination => {
            req.diagnosis = None;
            req.treatment = None;
            req.insemination_type = None;
            req.next_check_date = None;
        }
        HealthEventType::Insemination => {
            req.diagnosis = None;
            req.treatment = None;
            req.vaccine_name = None;
            req.batch_no = None;
            req.dose = None;
        }
    }
    req
}

pub(crate) fn pregnancy_check_message(animal_id: Uuid) -> String {
    format!("{PREGNANCY_CHECK_PREFIX} - animal {animal_id}")
}

/// Keeps exactly one pending pregnancy-check reminder per animal: an
/// existing one has its due date overwritten, otherwise a new one is
/// created. Best-effort next to the primary write.
pub fn upsert_pregnancy_reminder(
    conn: &mut PgConnection,
    scope: &ClinicScope,
    animal_id: Uuid,
    due_date: NaiveDate,
) -> Result<(), diesel::result::Error> {
    let now = Utc::now();
    let message = pregnancy_check_message(animal_id);

    let existing: Option<Uuid> = reminders::table
        .filter(reminders::animal_id.eq(animal_id))
        .filter(reminders::message.like(format!("{PREGNANCY_CHECK_PREFIX}%")))
        .select(reminders::id)
        .first(conn)
        .optional()?;

    match existing {
        Some(id) => {
            diesel::update(reminders::table.filter(reminders::id.eq(id)))
                .set((
                    reminders::due_date.eq(due_date),
                    reminders::message.eq(&message),
                    reminders::status.eq("pending"),
                    reminders::updated_at.eq(now),
                ))
                .execute(conn)?;
        }
        None => {
            let reminder = Reminder {
                id: Uuid::new_v4(),
                clinic_id: scope.clinic_id,
                animal_id,
                due_date,
                message,
                status: "pending".to_string(),
                created_at: now,
                updated_at: now,
            };
            diesel::insert_into(reminders::table)
                .values(&reminder)
                .execute(conn)?;
        }
    }

    Ok(())
}

pub async fn save_health_record(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SaveHealthRecordRequest>,
) -> Result<Json<HealthRecord>, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;

    let animal_id = req
        .animal_id
        .ok_or_else(|| ApiError::validation("animal required"))?;
    let event_type = HealthEventType::parse(&req.event_type)
        .ok_or_else(|| ApiError::validation(format!("unknown event type: {}", req.event_type)))?;

    let req = strip_irrelevant_fields(event_type, req);

    let saved: HealthRecord = match req.id {
        Some(id) => diesel::update(
            health_records::table
                .filter(health_records::id.eq(id))
                .filter(health_records::clinic_id.eq(scope.clinic_id)),
        )
        .set((
            health_records::animal_id.eq(animal_id),
            health_records::event_type.eq(event_type.as_str()),
            health_records::event_date.eq(req.event_date),
            health_records::diagnosis.eq(req.diagnosis.clone()),
            health_records::treatment.eq(req.treatment.clone()),
            health_records::vaccine_name.eq(req.vaccine_name.clone()),
            health_records::batch_no.eq(req.batch_no.clone()),
            health_records::dose.eq(req.dose.clone()),
            health_records::insemination_type.eq(req.insemination_type.clone()),
            health_records::next_check_date.eq(req.next_check_date),
            health_records::administered_by.eq(req.administered_by),
            health_records::notes.eq(req.notes.clone()),
        ))
        .get_result(&mut conn)?,
        None => {
            let record = HealthRecord {
                id: Uuid::new_v4(),
                clinic_id: scope.clinic_id,
                animal_id,
                event_type: event_type.as_str().to_string(),
                event_date: req.event_date,
                diagnosis: req.diagnosis.clone(),
                treatment: req.treatment.clone(),
                vaccine_name: req.vaccine_name.clone(),
                batch_no: req.batch_no.clone(),
                dose: req.dose.clone(),
                insemination_type: req.insemination_type.clone(),
                next_check_date: req.next_check_date,
                administered_by: req.administered_by,
                notes: req.notes.clone(),
                created_at: Utc::now(),
            };
            diesel::insert_into(health_records::table)
                .values(&record)
                .get_result(&mut conn)?
        }
    };

    if saved.event_type == HealthEventType::Insemination.as_str() {
        if let Some(due_date) = saved.next_check_date {
            if let Err(e) = upsert_pregnancy_reminder(&mut conn, &scope, saved.animal_id, due_date)
            {
                warn!("reminder upsert failed for animal {}: {e}", saved.animal_id);
            }
        }
    }

    Ok(Json(saved))
}

pub async fn get_health_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<HealthRecord>, ApiError> {
    let mut conn = state.conn.get()?;

    let record: HealthRecord = health_records::table
        .filter(health_records::id.eq(id))
        .first(&mut conn)
        .map_err(|_| ApiError::not_found(format!("health record {id} not found")))?;

    Ok(Json(record))
}

pub async fn delete_health_record(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;

    diesel::delete(
        health_records::table
            .filter(health_records::id.eq(id))
            .filter(health_records::clinic_id.eq(scope.clinic_id)),
    )
    .execute(&mut conn)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_animal_health_records(
    State(state): State<Arc<AppState>>,
    Path(animal_id): Path<Uuid>,
) -> Result<Json<Vec<HealthRecord>>, ApiError> {
    let mut conn = state.conn.get()?;

    let rows: Vec<HealthRecord> = health_records::table
        .filter(health_records::animal_id.eq(animal_id))
        .order(health_records::event_date.desc())
        .load(&mut conn)?;

    Ok(Json(rows))
}

pub fn configure_health_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health-records", post(save_health_record))
        .route(
            "/api/health-records/:id",
            get(get_health_record).delete(delete_health_record),
        )
        .route(
            "/api/animals/:id/health-records",
            get(list_animal_health_records),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_request() -> SaveHealthRecordRequest {
        SaveHealthRecordRequest {
            id: None,
            animal_id: Some(Uuid::new_v4()),
            event_type: "treatment".to_string(),
            event_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            diagnosis: Some("mastitis".to_string()),
            treatment: Some("antibiotics".to_string()),
            vaccine_name: Some("stale".to_string()),
            batch_no: Some("stale".to_string()),
            dose: Some("stale".to_string()),
            insemination_type: Some("stale".to_string()),
            next_check_date: NaiveDate::from_ymd_opt(2025, 10, 1),
            administered_by: None,
            notes: Some("kept".to_string()),
        }
    }

    #[test]
    fn treatment_records_drop_vaccination_and_insemination_fields() {
        let req = strip_irrelevant_fields(HealthEventType::Treatment, full_request());
        assert_eq!(req.diagnosis.as_deref(), Some("mastitis"));
        assert_eq!(req.treatment.as_deref(), Some("antibiotics"));
        assert_eq!(req.vaccine_name, None);
        assert_eq!(req.batch_no, None);
        assert_eq!(req.dose, None);
        assert_eq!(req.insemination_type, None);
        assert_eq!(req.next_check_date, None);
        assert_eq!(req.notes.as_deref(), Some("kept"));
    }

    #[test]
    fn vaccination_records_keep_only_vaccine_fields() {
        let mut input = full_request();
        input.event_type = "vaccination".to_string();
        let req = strip_irrelevant_fields(HealthEventType::Vaccination, input);
        assert_eq!(req.diagnosis, None);
        assert_eq!(req.treatment, None);
        assert_eq!(req.vaccine_name.as_deref(), Some("stale"));
        assert_eq!(req.insemination_type, None);
        assert_eq!(req.next_check_date, None);
    }

    #[test]
    fn insemination_records_keep_the_next_check_date() {
        let mut input = full_request();
        input.event_type = "insemination".to_string();
        let req = strip_irrelevant_fields(HealthEventType::Insemination, input);
        assert_eq!(req.diagnosis, None);
        assert_eq!(req.vaccine_name, None);
        assert_eq!(req.insemination_type.as_deref(), Some("stale"));
        assert_eq!(req.next_check_date, NaiveDate::from_ymd_opt(2025, 10, 1));
    }

    #[test]
    fn reminder_message_carries_the_prefix_and_animal() {
        let animal = Uuid::new_v4();
        let message = pregnancy_check_message(animal);
        assert!(message.starts_with(PREGNANCY_CHECK_PREFIX));
        assert!(message.contains(&animal.to_string()));
    }

    #[test]
    fn event_types_round_trip() {
        for t in [
            HealthEventType::Treatment,
            HealthEventType::Vaccination,
            HealthEventType::Insemination,
        ] {
            assert_eq!(HealthEventType::parse(t.as_str()), Some(t));
        }
        assert_eq!(HealthEventType::parse("surgery"), None);
    }
}
