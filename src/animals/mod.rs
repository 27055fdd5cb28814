use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::resolve_clinic_scope;
use crate::shared::error::ApiError;
use crate::shared::schema::{animals, customers};
use crate::shared::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimalStatus {
    Healthy,
    InTreatment,
    Critical,
}

impl AnimalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::InTreatment => "in_treatment",
            Self::Critical => "critical",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "healthy" => Some(Self::Healthy),
            "in_treatment" => Some(Self::InTreatment),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = animals)]
pub struct Animal {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub name: String,
    pub ear_tag_number: Option<String>,
    pub species: String,
    pub breed: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<NaiveDate>,
    pub status: String,
    pub location: Option<String>,
    pub microchip_id: Option<String>,
    pub current_weight: Option<BigDecimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveAnimalRequest {
    pub id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub name: String,
    pub ear_tag_number: Option<String>,
    pub species: String,
    pub breed: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<NaiveDate>,
    pub status: Option<String>,
    pub location: Option<String>,
    pub microchip_id: Option<String>,
    pub current_weight: Option<BigDecimal>,
}

#[derive(Debug, Serialize, Queryable)]
pub struct OwnerContact {
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnimalDetail {
    #[serde(flatten)]
    pub animal: Animal,
    pub owner: Option<OwnerContact>,
}

pub(crate) fn blank_to_null(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn validated_status(status: Option<&str>) -> Result<&'static str, ApiError> {
    match status {
        None => Ok(AnimalStatus::Healthy.as_str()),
        Some(raw) => AnimalStatus::parse(raw)
            .map(|s| s.as_str())
            .ok_or_else(|| ApiError::validation(format!("unknown animal status: {raw}"))),
    }
}

pub async fn list_animals(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Animal>>, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;

    let rows: Vec<Animal> = animals::table
        .filter(animals::clinic_id.eq(scope.clinic_id))
        .order(animals::created_at.desc())
        .load(&mut conn)?;

    Ok(Json(rows))
}

pub async fn get_animal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnimalDetail>, ApiError> {
    let mut conn = state.conn.get()?;

    let (animal, owner): (Animal, Option<OwnerContact>) = animals::table
        .left_join(customers::table)
        .filter(animals::id.eq(id))
        .select((
            Animal::as_select(),
            (customers::full_name, customers::phone, customers::email).nullable(),
        ))
        .first(&mut conn)
        .map_err(|_| ApiError::not_found(format!("animal {id} not found")))?;

    Ok(Json(AnimalDetail { animal, owner }))
}

/// Upsert contract: id present means an update restricted to that row within
/// the caller's clinic; id absent means an insert stamped with the resolved
/// clinic. Appends a best-effort audit entry either way.
pub async fn save_animal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SaveAnimalRequest>,
) -> Result<Json<Animal>, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;

    if req.name.trim().is_empty() {
        return Err(ApiError::validation("animal name required"));
    }
    let status = validated_status(req.status.as_deref())?;
    let now = Utc::now();

    let (saved, action): (Animal, &str) = match req.id {
        Some(id) => {
            let updated = diesel::update(
                animals::table
                    .filter(animals::id.eq(id))
                    .filter(animals::clinic_id.eq(scope.clinic_id)),
            )
            .set((
                animals::customer_id.eq(req.customer_id),
                animals::name.eq(req.name.trim()),
                animals::ear_tag_number.eq(blank_to_null(req.ear_tag_number.clone())),
                animals::species.eq(&req.species),
                animals::breed.eq(blank_to_null(req.breed.clone())),
                animals::gender.eq(blank_to_null(req.gender.clone())),
                animals::dob.eq(req.dob),
                animals::status.eq(status),
                animals::location.eq(blank_to_null(req.location.clone())),
                animals::microchip_id.eq(blank_to_null(req.microchip_id.clone())),
                animals::current_weight.eq(req.current_weight.clone()),
                animals::updated_at.eq(now),
            ))
            .get_result(&mut conn)?;
            (updated, "animal record updated")
        }
        None => {
            let animal = Animal {
                id: Uuid::new_v4(),
                clinic_id: scope.clinic_id,
                customer_id: req.customer_id,
                name: req.name.trim().to_string(),
                ear_tag_number: blank_to_null(req.ear_tag_number.clone()),
                species: req.species.clone(),
                breed: blank_to_null(req.breed.clone()),
                gender: blank_to_null(req.gender.clone()),
                dob: req.dob,
                status: status.to_string(),
                location: blank_to_null(req.location.clone()),
                microchip_id: blank_to_null(req.microchip_id.clone()),
                current_weight: req.current_weight.clone(),
                created_at: now,
                updated_at: now,
            };
            let inserted = diesel::insert_into(animals::table)
                .values(&animal)
                .get_result(&mut conn)?;
            (inserted, "animal record created")
        }
    };

    let snapshot = serde_json::json!({ "changes": serde_json::to_value(&req).unwrap_or_default() });
    crate::audit::record_entry(&mut conn, &scope, action, "animals", saved.id, snapshot);

    Ok(Json(saved))
}

pub async fn delete_animal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;

    diesel::delete(
        animals::table
            .filter(animals::id.eq(id))
            .filter(animals::clinic_id.eq(scope.clinic_id)),
    )
    .execute(&mut conn)?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn configure_animals_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/animals", get(list_animals).post(save_animal))
        .route("/api/animals/:id", get(get_animal).delete(delete_animal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_util;

    #[test]
    fn blank_strings_are_normalised_to_null() {
        test_util::setup();
        assert_eq!(blank_to_null(Some("".to_string())), None);
        assert_eq!(blank_to_null(Some("   ".to_string())), None);
        assert_eq!(blank_to_null(None), None);
        assert_eq!(
            blank_to_null(Some("TR-0042".to_string())),
            Some("TR-0042".to_string())
        );
    }

    #[test]
    fn status_defaults_to_healthy() {
        assert_eq!(validated_status(None).unwrap(), "healthy");
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = validated_status(Some("sleepy")).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn status_round_trips() {
        for s in [
            AnimalStatus::Healthy,
            AnimalStatus::InTreatment,
            AnimalStatus::Critical,
        ] {
            assert_eq!(AnimalStatus::parse(s.as_str()), Some(s));
        }
    }
}
