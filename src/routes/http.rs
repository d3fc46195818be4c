//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{Path, State}, http::StatusCode, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, remote_generation: state.orchestrator.remote_enabled() })
}

#[instrument(level = "info", skip(state, body), fields(name_len = body.name.len()))]
pub async fn http_create_profile(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CreateProfileIn>,
) -> Result<impl IntoResponse, ApiError> {
  if body.name.trim().is_empty() || !body.email.contains('@') {
    return Err(ApiError::Validation("A name and a valid email are required.".into()));
  }
  let profile = state.profiles.create(&body.name, &body.email).await?;
  Ok((StatusCode::CREATED, Json(ProfileOut { profile })))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_profile(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<ProfileOut>, ApiError> {
  let profile = state
    .profiles
    .get(&id)
    .await
    .ok_or_else(|| ApiError::NotFound(format!("Unknown profile: {id}")))?;
  Ok(Json(ProfileOut { profile }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_sign_out(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
  if state.profiles.clear(&id).await? {
    info!(target: "skilltree", %id, "Signed out");
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("Unknown profile: {id}")))
  }
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_quiz(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<QuizIn>,
) -> Result<Json<ProfileOut>, ApiError> {
  let profile = submit_quiz(&state, &id, body).await?;
  Ok(Json(ProfileOut { profile }))
}

#[instrument(level = "info", skip(state, body), fields(content_len = body.content.len()))]
pub async fn http_post_resume(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<ResumeIn>,
) -> Result<Json<ProfileOut>, ApiError> {
  let profile = upload_resume(&state, &id, body.content).await?;
  Ok(Json(ProfileOut { profile }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_lessons(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<LessonsOut>, ApiError> {
  Ok(Json(lessons_for(&state, &id).await?))
}

#[instrument(level = "info", skip(state, body), fields(lesson = %body.lesson_title))]
pub async fn http_post_challenge(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<ChallengeIn>,
) -> Result<Json<ChallengeOut>, ApiError> {
  Ok(Json(challenge_for(&state, &id, body).await?))
}

#[instrument(level = "info", skip(state, body), fields(lesson = %body.lesson_title, answer_len = body.answer.len()))]
pub async fn http_post_evaluate(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<EvaluateIn>,
) -> Result<Json<EvaluationOut>, ApiError> {
  Ok(Json(evaluate_for(&state, &id, body).await?))
}
