use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::error::ApiError;
use crate::shared::schema::{clinics, profiles};
use crate::shared::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Tenant context resolved per request. Every mutating gateway call takes
/// this explicitly; there is no ambient session state.
#[derive(Debug, Clone, Copy)]
pub struct ClinicScope {
    pub clinic_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = clinics)]
pub struct Clinic {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub full_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct BootstrapRequest {
    pub user_id: Uuid,
    pub full_name: String,
    pub clinic_name: String,
}

#[derive(Debug, Serialize)]
pub struct BootstrapResponse {
    pub clinic: Clinic,
    pub profile: Profile,
}

pub fn authenticated_user(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::ScopeResolution("no authenticated user".to_string()))?;
    Uuid::parse_str(raw)
        .map_err(|_| ApiError::ScopeResolution(format!("invalid user id: {raw}")))
}

/// Resolves the acting user's clinic from their profile row. All writes are
/// rejected when this fails.
pub fn resolve_clinic_scope(
    conn: &mut PgConnection,
    headers: &HeaderMap,
) -> Result<ClinicScope, ApiError> {
    let user_id = authenticated_user(headers)?;

    let clinic_id: Uuid = profiles::table
        .filter(profiles::id.eq(user_id))
        .select(profiles::clinic_id)
        .first(conn)
        .map_err(|_| {
            ApiError::ScopeResolution(format!("no clinic profile for user {user_id}"))
        })?;

    Ok(ClinicScope { clinic_id, user_id })
}

/// Account sign-up: creates the tenant and its first admin profile in one
/// transaction. A clinic is never transferred afterwards.
pub async fn bootstrap_account(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BootstrapRequest>,
) -> Result<Json<BootstrapResponse>, ApiError> {
    if req.clinic_name.trim().is_empty() {
        return Err(ApiError::validation("clinic name required"));
    }

    let mut conn = state.conn.get()?;
    let now = Utc::now();

    let clinic = Clinic {
        id: Uuid::new_v4(),
        name: req.clinic_name.trim().to_string(),
        created_at: now,
    };
    let profile = Profile {
        id: req.user_id,
        clinic_id: clinic.id,
        full_name: req.full_name,
        role: "admin".to_string(),
        created_at: now,
    };

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::insert_into(clinics::table)
            .values(&clinic)
            .execute(conn)?;
        diesel::insert_into(profiles::table)
            .values(&profile)
            .execute(conn)?;
        Ok(())
    })?;

    Ok(Json(BootstrapResponse { clinic, profile }))
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Profile>>, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;

    let users: Vec<Profile> = profiles::table
        .filter(profiles::clinic_id.eq(scope.clinic_id))
        .order(profiles::full_name.asc())
        .load(&mut conn)?;

    Ok(Json(users))
}

pub async fn list_veterinarians(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Profile>>, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;

    let vets: Vec<Profile> = profiles::table
        .filter(profiles::clinic_id.eq(scope.clinic_id))
        .filter(
            profiles::role
                .eq("veterinarian")
                .or(profiles::role.eq("admin")),
        )
        .order(profiles::full_name.asc())
        .load(&mut conn)?;

    Ok(Json(vets))
}

pub fn configure_auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/bootstrap", post(bootstrap_account))
        .route("/api/users", get(list_users))
        .route("/api/users/veterinarians", get(list_veterinarians))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_err;
    use axum::http::HeaderValue;

    #[test]
    fn missing_header_is_a_scope_error() {
        let headers = HeaderMap::new();
        let err = assert_err!(authenticated_user(&headers));
        assert!(matches!(err, ApiError::ScopeResolution(_)));
    }

    #[test]
    fn malformed_user_id_is_a_scope_error() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        let err = assert_err!(authenticated_user(&headers));
        assert!(matches!(err, ApiError::ScopeResolution(_)));
    }

    #[test]
    fn well_formed_user_id_parses() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(authenticated_user(&headers).unwrap(), id);
    }
}
