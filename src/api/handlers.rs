//! HTTP request handlers - thin layer that delegates to the card engine
//!
//! Each handler resolves the caller, parses path and body, calls exactly one
//! engine operation and maps the outcome. Malformed paths and bodies are
//! reported as validation problems so every error response has the same shape.

use super::dto::{BalanceRequest, HealthResponse, ProcessRequest, ReclamationListQuery};
use super::error::Problem;
use super::identity::Caller;
use crate::core::{CardEngine, ProvisionedStudent};
use crate::types::{
    ActivityLogEntry, BalanceChange, Card, EntityType, LedgerError, NewReclamation, NewStudent,
    Page, Reclamation, ReclamationCounts, Student, StudentChanges,
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

type ApiResult<T> = Result<T, Problem>;

/// Unwrap a JSON body, turning a rejection into a validation problem
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| LedgerError::validation("body", rejection.body_text()).into())
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    params
        .map(|Query(value)| value)
        .map_err(|rejection| LedgerError::validation("query", rejection.body_text()).into())
}

/// Parse a numeric path identifier
fn numeric_id(field: &str, raw: &str) -> ApiResult<u64> {
    raw.trim()
        .parse()
        .map_err(|_| LedgerError::validation(field, format!("'{raw}' is not a valid identifier")).into())
}

// ===== Health =====

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

// ===== Cards =====

/// Add funds to or subtract funds from a card
pub async fn adjust_balance(
    State(engine): State<CardEngine>,
    caller: Caller,
    Path(card_id): Path<String>,
    payload: Result<Json<BalanceRequest>, JsonRejection>,
) -> ApiResult<Json<BalanceChange>> {
    let card_id = numeric_id("card_id", &card_id)?;
    let request = body(payload)?.into_adjustment(card_id);
    let change = engine.adjust(request, caller.actor())?;
    Ok(Json(change))
}

pub async fn get_card(
    State(engine): State<CardEngine>,
    caller: Caller,
    Path(card_id): Path<String>,
) -> ApiResult<Json<Card>> {
    let card_id = numeric_id("card_id", &card_id)?;
    Ok(Json(engine.get_card(card_id, caller.actor())?))
}

pub async fn mark_card_used(
    State(engine): State<CardEngine>,
    caller: Caller,
    Path(card_id): Path<String>,
) -> ApiResult<Json<Card>> {
    let card_id = numeric_id("card_id", &card_id)?;
    Ok(Json(engine.mark_used(card_id, caller.actor())?))
}

// ===== Students =====

/// Create a student together with its card
pub async fn create_student(
    State(engine): State<CardEngine>,
    caller: Caller,
    payload: Result<Json<NewStudent>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ProvisionedStudent>)> {
    let created = engine.provision(body(payload)?, caller.actor())?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_student(
    State(engine): State<CardEngine>,
    caller: Caller,
    Path(student_id): Path<String>,
) -> ApiResult<Json<Student>> {
    Ok(Json(engine.get_student(&student_id, caller.actor())?))
}

pub async fn update_student(
    State(engine): State<CardEngine>,
    caller: Caller,
    Path(student_id): Path<String>,
    payload: Result<Json<StudentChanges>, JsonRejection>,
) -> ApiResult<Json<Student>> {
    let student = engine.update_student(&student_id, body(payload)?, caller.actor())?;
    Ok(Json(student))
}

/// Remove a student and its card; answers with the removed student
pub async fn delete_student(
    State(engine): State<CardEngine>,
    caller: Caller,
    Path(student_id): Path<String>,
) -> ApiResult<Json<Student>> {
    Ok(Json(engine.delete_student(&student_id, caller.actor())?))
}

pub async fn student_card(
    State(engine): State<CardEngine>,
    caller: Caller,
    Path(student_id): Path<String>,
) -> ApiResult<Json<Card>> {
    Ok(Json(engine.card_for_student(&student_id, caller.actor())?))
}

// ===== Reclamations =====

pub async fn create_reclamation(
    State(engine): State<CardEngine>,
    caller: Caller,
    payload: Result<Json<NewReclamation>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Reclamation>)> {
    let reclamation = engine.create_reclamation(body(payload)?, caller.actor())?;
    Ok((StatusCode::CREATED, Json(reclamation)))
}

/// List reclamations, optionally filtered by `?status=`
pub async fn list_reclamations(
    State(engine): State<CardEngine>,
    caller: Caller,
    params: Result<Query<ReclamationListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Reclamation>>> {
    let filter = query(params)?;
    Ok(Json(engine.list_reclamations(filter.status, caller.actor())?))
}

pub async fn reclamation_counts(
    State(engine): State<CardEngine>,
    caller: Caller,
) -> ApiResult<Json<ReclamationCounts>> {
    Ok(Json(engine.reclamation_counts(caller.actor())?))
}

pub async fn get_reclamation(
    State(engine): State<CardEngine>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Reclamation>> {
    let id = numeric_id("reclamation_id", &id)?;
    Ok(Json(engine.get_reclamation(id, caller.actor())?))
}

/// Approve or reject a pending reclamation
///
/// A failed settlement answers with the settlement error; the reclamation
/// itself is left in `error` with the failure appended to its notes.
pub async fn process_reclamation(
    State(engine): State<CardEngine>,
    caller: Caller,
    Path(id): Path<String>,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> ApiResult<Json<Reclamation>> {
    let id = numeric_id("reclamation_id", &id)?;
    let request = body(payload)?;
    let reclamation =
        engine.process_reclamation(id, request.status, request.admin_notes, caller.actor())?;
    Ok(Json(reclamation))
}

// ===== Activity =====

/// Audit trail of one entity, newest first
pub async fn entity_activity(
    State(engine): State<CardEngine>,
    caller: Caller,
    Path((entity_type, entity_id)): Path<(String, String)>,
    params: Result<Query<Page>, QueryRejection>,
) -> ApiResult<Json<Vec<ActivityLogEntry>>> {
    let entity_type: EntityType = entity_type
        .parse()
        .map_err(|e: String| Problem::from(LedgerError::validation("entity_type", e)))?;
    let page = query(params)?;
    Ok(Json(engine.activity(entity_type, &entity_id, page, caller.actor())?))
}
