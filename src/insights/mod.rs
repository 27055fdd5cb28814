use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::animals::Animal;
use crate::auth::{resolve_clinic_scope, ClinicScope};
use crate::health::HealthRecord;
use crate::shared::error::ApiError;
use crate::shared::schema::{ai_chat_messages, ai_chat_sessions, animals, health_records};
use crate::shared::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = ai_chat_sessions)]
pub struct ChatSession {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub animal_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = ai_chat_messages)]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SessionWithMessages {
    pub session: ChatSession,
    pub messages: Vec<ChatMessage>,
}

/// One JSON snapshot of the animal and its clinical history. This is the
/// only record data the text-generation collaborator ever sees.
fn animal_snapshot(conn: &mut PgConnection, animal_id: Uuid) -> Result<(Animal, serde_json::Value), ApiError> {
    let animal: Animal = animals::table
        .filter(animals::id.eq(animal_id))
        .first(conn)
        .map_err(|_| ApiError::not_found(format!("animal {animal_id} not found")))?;

    let records: Vec<HealthRecord> = health_records::table
        .filter(health_records::animal_id.eq(animal_id))
        .order(health_records::event_date.desc())
        .load(conn)?;

    let snapshot = serde_json::json!({ "animal": animal, "health_records": records });
    Ok((animal, snapshot))
}

pub(crate) fn build_insight_prompt(animal_name: &str, snapshot: &serde_json::Value) -> String {
    format!(
        "You are a veterinary analyst reviewing one animal's record.\n\
        The JSON data for the animal named \"{animal_name}\" is below.\n\
        \n\
        Write a short professional summary (2-3 sentences) of the animal's\n\
        overall condition and the single most important point in the records,\n\
        positive or negative. Base it only on the data given; do not speculate\n\
        and do not add recommendations. Reply with the summary text alone.\n\
        \n\
        ANIMAL DATA (JSON):\n{snapshot}"
    )
}

pub(crate) fn build_chat_prompt(
    animal_name: &str,
    snapshot: &serde_json::Value,
    question: &str,
) -> String {
    format!(
        "You are a clinical assistant to a veterinarian. The user is a vet\n\
        asking about the animal named \"{animal_name}\"; the animal's JSON\n\
        record is below.\n\
        \n\
        Rules: if the question can be answered directly from the record,\n\
        answer only from the record, briefly and in a natural tone. If the\n\
        data is missing, say the record has no data for that topic. If asked\n\
        for an assessment or a plan, summarise the record from a clinical\n\
        point of view first.\n\
        \n\
        ANIMAL DATA (JSON):\n{snapshot}\n\
        \n\
        Question: \"{question}\""
    )
}

fn get_or_create_session(
    conn: &mut PgConnection,
    scope: &ClinicScope,
    animal_id: Uuid,
) -> Result<ChatSession, ApiError> {
    let existing: Option<ChatSession> = ai_chat_sessions::table
        .filter(ai_chat_sessions::animal_id.eq(animal_id))
        .filter(ai_chat_sessions::user_id.eq(scope.user_id))
        .first(conn)
        .optional()?;

    if let Some(session) = existing {
        return Ok(session);
    }

    let session = ChatSession {
        id: Uuid::new_v4(),
        clinic_id: scope.clinic_id,
        animal_id,
        user_id: scope.user_id,
        created_at: Utc::now(),
    };
    let created = diesel::insert_into(ai_chat_sessions::table)
        .values(&session)
        .get_result(conn)?;
    Ok(created)
}

fn append_message(
    conn: &mut PgConnection,
    session_id: Uuid,
    role: &str,
    content: &str,
) -> Result<ChatMessage, ApiError> {
    let message = ChatMessage {
        id: Uuid::new_v4(),
        session_id,
        role: role.to_string(),
        content: content.to_string(),
        created_at: Utc::now(),
    };
    let saved = diesel::insert_into(ai_chat_messages::table)
        .values(&message)
        .get_result(conn)?;
    Ok(saved)
}

/// Periodic per-animal summary: snapshot in, one generated paragraph out.
pub async fn animal_insight(
    State(state): State<Arc<AppState>>,
    Path(animal_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (animal, snapshot) = {
        let mut conn = state.conn.get()?;
        animal_snapshot(&mut conn, animal_id)?
    };

    let prompt = build_insight_prompt(&animal.name, &snapshot);
    let insight = state
        .llm_provider
        .generate(&prompt)
        .await
        .map_err(|e| ApiError::Persistence(format!("insight generation failed: {e}")))?;

    Ok(Json(serde_json::json!({ "insight": insight })))
}

pub async fn get_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(animal_id): Path<Uuid>,
) -> Result<Json<SessionWithMessages>, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;

    let session = get_or_create_session(&mut conn, &scope, animal_id)?;
    let messages: Vec<ChatMessage> = ai_chat_messages::table
        .filter(ai_chat_messages::session_id.eq(session.id))
        .order(ai_chat_messages::created_at.asc())
        .load(&mut conn)?;

    Ok(Json(SessionWithMessages { session, messages }))
}

/// Conversational assistant scoped to one animal: persists the question,
/// asks the collaborator with the snapshot in context, persists the answer.
pub async fn ask_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(animal_id): Path<Uuid>,
    Json(req): Json<AskRequest>,
) -> Result<Json<ChatMessage>, ApiError> {
    if req.message.trim().is_empty() {
        return Err(ApiError::validation("message required"));
    }

    let (prompt, session_id) = {
        let mut conn = state.conn.get()?;
        let scope = resolve_clinic_scope(&mut conn, &headers)?;
        let session = get_or_create_session(&mut conn, &scope, animal_id)?;
        let (animal, snapshot) = animal_snapshot(&mut conn, animal_id)?;
        append_message(&mut conn, session.id, "user", req.message.trim())?;
        (
            build_chat_prompt(&animal.name, &snapshot, req.message.trim()),
            session.id,
        )
    };

    let answer = state
        .llm_provider
        .generate(&prompt)
        .await
        .map_err(|e| ApiError::Persistence(format!("chat generation failed: {e}")))?;

    let mut conn = state.conn.get()?;
    let saved = append_message(&mut conn, session_id, "assistant", &answer)?;

    Ok(Json(saved))
}

pub fn configure_insights_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/animals/:id/insight", get(animal_insight))
        .route("/api/animals/:id/chat", get(get_chat).post(ask_chat))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insight_prompt_embeds_name_and_snapshot() {
        let snapshot = serde_json::json!({"animal": {"name": "Sarıkız"}});
        let prompt = build_insight_prompt("Sarıkız", &snapshot);
        assert!(prompt.contains("\"Sarıkız\""));
        assert!(prompt.contains("ANIMAL DATA (JSON):"));
        assert!(prompt.contains(&snapshot.to_string()));
    }

    #[test]
    fn chat_prompt_embeds_the_question() {
        let snapshot = serde_json::json!({"animal": {}});
        let prompt = build_chat_prompt("Karabaş", &snapshot, "When was the last vaccine?");
        assert!(prompt.contains("When was the last vaccine?"));
        assert!(prompt.contains("\"Karabaş\""));
    }
}
