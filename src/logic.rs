//! Profile-level flows used by the HTTP handlers.
//!
//! Each flow reads a profile snapshot from the store, runs the orchestrator
//! against that snapshot, and writes the snapshot back. The orchestrator itself
//! never touches the store.

use tracing::{info, instrument};

use crate::domain::{ChallengeContext, EvaluationContext, LessonContext, UserProfile};
use crate::error::ApiError;
use crate::protocol::{ChallengeIn, ChallengeOut, EvaluateIn, EvaluationOut, LessonsOut, QuizIn};
use crate::state::AppState;

async fn load(state: &AppState, id: &str) -> Result<UserProfile, ApiError> {
  state
    .profiles
    .get(id)
    .await
    .ok_or_else(|| ApiError::NotFound(format!("Unknown profile: {id}")))
}

#[instrument(level = "info", skip(state, quiz), fields(%id, answers = quiz.answers.len()))]
pub async fn submit_quiz(state: &AppState, id: &str, quiz: QuizIn) -> Result<UserProfile, ApiError> {
  let mut profile = load(state, id).await?;
  profile.apply_quiz(quiz.answers, quiz.industry, &quiz.skills);
  state.profiles.replace(profile.clone()).await?;
  Ok(profile)
}

#[instrument(level = "info", skip(state, content), fields(%id, content_len = content.len()))]
pub async fn upload_resume(state: &AppState, id: &str, content: String) -> Result<UserProfile, ApiError> {
  if content.trim().is_empty() {
    return Err(ApiError::Validation("Resume content is empty.".into()));
  }
  let mut profile = load(state, id).await?;
  profile.attach_resume(content);
  state.profiles.replace(profile.clone()).await?;
  Ok(profile)
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn lessons_for(state: &AppState, id: &str) -> Result<LessonsOut, ApiError> {
  let mut profile = load(state, id).await?;
  let ctx = LessonContext::from(&profile);
  let out = state.orchestrator.generate_lessons(&ctx, &mut profile).await;
  if !out.is_fallback() {
    state.profiles.replace(profile).await?;
  }
  info!(target: "lessons", %id, count = out.value.len(), fallback = out.is_fallback(), "Skill tree served");
  Ok(out.into())
}

#[instrument(level = "info", skip(state, req), fields(%id, lesson = %req.lesson_title))]
pub async fn challenge_for(state: &AppState, id: &str, req: ChallengeIn) -> Result<ChallengeOut, ApiError> {
  if req.lesson_title.trim().is_empty() {
    return Err(ApiError::Validation("lessonTitle is required.".into()));
  }
  let mut profile = load(state, id).await?;
  let ctx = ChallengeContext {
    skill: req.skill,
    lesson_title: req.lesson_title,
    lesson_description: req.lesson_description,
    industry: profile.industry.clone(),
  };
  let out = state.orchestrator.generate_challenge(&ctx, &mut profile).await;
  if !out.is_fallback() {
    state.profiles.replace(profile).await?;
  }
  info!(target: "challenge", %id, fallback = out.is_fallback(), "Challenge served");
  Ok(out.into())
}

/// Grade an answer; a passing grade completes the lesson for the skill.
#[instrument(level = "info", skip(state, req), fields(%id, lesson = %req.lesson_title, answer_len = req.answer.len()))]
pub async fn evaluate_for(state: &AppState, id: &str, req: EvaluateIn) -> Result<EvaluationOut, ApiError> {
  if req.skill.trim().is_empty() {
    return Err(ApiError::Validation("skill is required.".into()));
  }
  if req.lesson_title.trim().is_empty() {
    return Err(ApiError::Validation("lessonTitle is required.".into()));
  }
  let mut profile = load(state, id).await?;
  let ctx = EvaluationContext {
    skill: req.skill,
    lesson_title: req.lesson_title,
    challenge: req.challenge,
    user_answer: req.answer,
    industry: profile.industry.clone(),
  };
  let out = state.orchestrator.evaluate_answer(&ctx).await?;

  let mastery_level = if out.value.can_proceed {
    let level = profile.complete_lesson(&ctx.skill, &ctx.lesson_title);
    state.profiles.replace(profile).await?;
    level
  } else {
    profile.skill_progress.get(&ctx.skill).map(|p| p.mastery_level).unwrap_or(0)
  };

  info!(target: "evaluation", %id, score = out.value.score, can_proceed = out.value.can_proceed, mastery_level, "Answer graded");
  Ok(EvaluationOut {
    fallback: out.is_fallback(),
    advisory: out.advisory().map(String::from),
    evaluation: out.value,
    mastery_level,
  })
}
