//! Turns a context snapshot into a normalized result or deterministic fallback.
//!
//! Every run walks the same phases:
//!
//!   idle -> prompting -> awaiting_completion -> extracting -> normalizing -> done
//!
//! A failure while awaiting the completion or extracting JSON moves to `error`
//! and then straight to `done` with fallback content. There is no retry.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::Prompts;
use crate::domain::{
  Challenge, ChallengeContext, EvaluationContext, EvaluationResult, LessonCache, LessonContext,
  LessonRecord,
};
use crate::error::{AnswerRejected, ContentError};
use crate::extract::{extract_array, extract_object};
use crate::fallback::{self, FailureStage, Generated};
use crate::normalize;
use crate::openai::Completion;
use crate::prompts::{self, Prompt};

/// Longest answer accepted for grading.
pub const MAX_ANSWER_CHARS: usize = 5000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
  Idle,
  Prompting,
  AwaitingCompletion,
  Extracting,
  Normalizing,
  Error,
  Done,
}

/// Phase bookkeeping for one run; every move is traced.
struct Run {
  kind: &'static str,
  phase: Phase,
}

impl Run {
  fn start(kind: &'static str) -> Self {
    Self { kind, phase: Phase::Idle }
  }

  fn enter(&mut self, next: Phase) {
    debug!(target: "skilltree", kind = self.kind, from = ?self.phase, to = ?next, "Phase transition");
    self.phase = next;
  }

  /// Record a failure in the current phase and return where it happened.
  fn fail(&mut self, err: &ContentError) -> FailureStage {
    let stage = match self.phase {
      Phase::AwaitingCompletion => FailureStage::AwaitingCompletion,
      _ => FailureStage::Extracting,
    };
    warn!(target: "skilltree", kind = self.kind, %stage, error = %err, "Generation failed; using fallback content");
    self.enter(Phase::Error);
    self.enter(Phase::Done);
    stage
  }
}

#[derive(Clone)]
pub struct Orchestrator {
  completion: Option<Arc<dyn Completion>>,
  prompts: Prompts,
}

impl Orchestrator {
  pub fn new(completion: Option<Arc<dyn Completion>>, prompts: Prompts) -> Self {
    Self { completion, prompts }
  }

  pub fn remote_enabled(&self) -> bool {
    self.completion.is_some()
  }

  /// prompting -> awaiting_completion -> extracting. Normalizing cannot fail,
  /// so callers do it after this returns.
  async fn fetch<T>(
    &self,
    run: &mut Run,
    build: impl FnOnce(&Prompts) -> Prompt,
    extract: impl FnOnce(&str) -> Result<T, ContentError>,
  ) -> Result<T, FailureStage> {
    run.enter(Phase::Prompting);
    let prompt = build(&self.prompts);

    run.enter(Phase::AwaitingCompletion);
    let raw = match &self.completion {
      Some(c) => c.complete(&prompt).await,
      None => Err(ContentError::Network("no completion endpoint configured".into())),
    };
    let raw = raw.map_err(|e| run.fail(&e))?;

    run.enter(Phase::Extracting);
    let parsed = extract(&raw).map_err(|e| run.fail(&e))?;

    run.enter(Phase::Normalizing);
    Ok(parsed)
  }

  /// Skill-tree lessons. Successful results are cached by title.
  #[instrument(level = "info", skip_all, fields(skills = ctx.skills.len()))]
  pub async fn generate_lessons(
    &self,
    ctx: &LessonContext,
    cache: &mut dyn LessonCache,
  ) -> Generated<Vec<LessonRecord>> {
    let mut run = Run::start("lessons");
    let items: Vec<Value> = match self
      .fetch(&mut run, |p| prompts::lessons_prompt(p, ctx), extract_array)
      .await
    {
      Ok(items) => items,
      Err(stage) => return fallback::lessons(ctx, stage),
    };

    let lessons = normalize::lessons(items, ctx);
    cache.store_lessons(&lessons);
    run.enter(Phase::Done);
    info!(target: "lessons", count = lessons.len(), "Lessons generated");
    Generated::remote(lessons)
  }

  /// One challenge for a lesson. A cached lesson that already has a challenge
  /// is served without calling the model.
  #[instrument(level = "info", skip_all, fields(lesson = %ctx.lesson_title))]
  pub async fn generate_challenge(
    &self,
    ctx: &ChallengeContext,
    cache: &mut dyn LessonCache,
  ) -> Generated<Challenge> {
    if let Some(ch) = cache.cached_lesson(&ctx.lesson_title).and_then(|l| l.challenges.first()) {
      debug!(target: "challenge", "Serving cached challenge");
      return Generated::remote(ch.clone());
    }

    let mut run = Run::start("challenge");
    let map = match self
      .fetch(&mut run, |p| prompts::challenge_prompt(p, ctx), extract_object)
      .await
    {
      Ok(map) => map,
      Err(stage) => return fallback::challenge(ctx, stage),
    };

    let challenge = normalize::challenge(map, ctx);
    cache.store_challenge(normalize::lesson_stub(ctx), challenge.clone());
    run.enter(Phase::Done);
    info!(target: "challenge", "Challenge generated");
    Generated::remote(challenge)
  }

  /// Grade an answer. Blank or oversized answers are refused before any
  /// network call; everything else yields a result.
  #[instrument(level = "info", skip_all, fields(lesson = %ctx.lesson_title, answer_len = ctx.user_answer.len()))]
  pub async fn evaluate_answer(
    &self,
    ctx: &EvaluationContext,
  ) -> Result<Generated<EvaluationResult>, AnswerRejected> {
    check_answer(&ctx.user_answer)?;

    let mut run = Run::start("evaluation");
    let map = match self
      .fetch(&mut run, |p| prompts::evaluation_prompt(p, ctx), extract_object)
      .await
    {
      Ok(map) => map,
      Err(stage) => return Ok(fallback::evaluation(ctx, stage)),
    };

    let result = normalize::evaluation(map, ctx);
    run.enter(Phase::Done);
    info!(target: "evaluation", score = result.score, can_proceed = result.can_proceed, "Answer evaluated");
    Ok(Generated::remote(result))
  }
}

pub fn check_answer(answer: &str) -> Result<(), AnswerRejected> {
  let trimmed = answer.trim();
  if trimmed.is_empty() {
    return Err(AnswerRejected::Empty);
  }
  if trimmed.chars().count() > MAX_ANSWER_CHARS {
    return Err(AnswerRejected::TooLong { max: MAX_ANSWER_CHARS });
  }
  Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
  use std::sync::Mutex;

  use async_trait::async_trait;

  use super::*;
  use crate::domain::UserProfile;
  use crate::fallback::Origin;

  /// Replays canned replies in order and counts calls.
  pub(crate) struct Scripted {
    replies: Mutex<Vec<Result<String, ContentError>>>,
    calls: Mutex<usize>,
  }

  impl Scripted {
    pub(crate) fn new(replies: Vec<Result<String, ContentError>>) -> Arc<Self> {
      Arc::new(Self { replies: Mutex::new(replies), calls: Mutex::new(0) })
    }

    pub(crate) fn failing() -> Arc<Self> {
      Self::new(vec![])
    }

    pub(crate) fn calls(&self) -> usize {
      *self.calls.lock().unwrap()
    }
  }

  #[async_trait]
  impl Completion for Scripted {
    async fn complete(&self, _prompt: &Prompt) -> Result<String, ContentError> {
      *self.calls.lock().unwrap() += 1;
      let mut replies = self.replies.lock().unwrap();
      if replies.is_empty() {
        Err(ContentError::Network("connection refused".into()))
      } else {
        replies.remove(0)
      }
    }
  }

  fn orchestrator(c: Arc<Scripted>) -> Orchestrator {
    Orchestrator::new(Some(c as Arc<dyn Completion>), Prompts::default())
  }

  fn profile() -> UserProfile {
    UserProfile::new("u1".into(), "Ada".into(), "ada@example.com".into())
  }

  fn eval_ctx(answer: &str) -> EvaluationContext {
    EvaluationContext {
      skill: "Excel".into(),
      lesson_title: "Lookups".into(),
      challenge: Challenge {
        scenario: "Two spreadsheets list different totals.".into(),
        task: "Explain how you reconcile them.".into(),
        hint: "Check the keys.".into(),
      },
      user_answer: answer.into(),
      industry: None,
    }
  }

  #[tokio::test]
  async fn network_failure_with_one_skill_yields_one_lesson() {
    let ctx = LessonContext { skills: vec!["Excel".into()], ..Default::default() };
    let mut cache = profile();
    let out = orchestrator(Scripted::failing()).generate_lessons(&ctx, &mut cache).await;

    assert_eq!(out.origin, Origin::Fallback { stage: FailureStage::AwaitingCompletion });
    assert_eq!(out.value.len(), 1);
    assert!(out.value[0].title.contains("Excel"));
    assert!(cache.lesson_cache.is_empty());
  }

  #[tokio::test]
  async fn network_failure_without_skills_yields_universal_set() {
    let mut cache = profile();
    let out = orchestrator(Scripted::failing())
      .generate_lessons(&LessonContext::default(), &mut cache)
      .await;
    let titles: Vec<&str> = out.value.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["Problem Solving Fundamentals", "Effective Communication", "Time Management Essentials"]);
    assert!(out.advisory().is_some());
  }

  #[tokio::test]
  async fn missing_endpoint_behaves_like_network_failure() {
    let o = Orchestrator::new(None, Prompts::default());
    let ctx = LessonContext { skills: vec!["Excel".into()], ..Default::default() };
    let out = o.generate_lessons(&ctx, &mut profile()).await;
    assert_eq!(out.origin, Origin::Fallback { stage: FailureStage::AwaitingCompletion });
    assert!(!o.remote_enabled());
  }

  #[tokio::test]
  async fn prose_without_json_falls_back_non_empty() {
    let c = Scripted::new(vec![Ok("I'm sorry, I can't help with that right now.".into())]);
    let out = orchestrator(c).generate_lessons(&LessonContext::default(), &mut profile()).await;
    assert_eq!(out.origin, Origin::Fallback { stage: FailureStage::Extracting });
    assert!(!out.value.is_empty());
  }

  #[tokio::test]
  async fn remote_lessons_are_normalized_and_cached() {
    let reply = r#"Here are your lessons:
[{"title": "Pivot Tables", "description": "Summarize data.", "relevance": "Reports."},
 {"title": "Lookups", "description": "Join sheets."},
 {"title": "Charts", "description": "Show trends.", "relevance": "Dashboards."}]"#;
    let c = Scripted::new(vec![Ok(reply.into())]);
    let ctx = LessonContext { skills: vec!["Excel".into()], ..Default::default() };
    let mut cache = profile();
    let out = orchestrator(c.clone()).generate_lessons(&ctx, &mut cache).await;

    assert_eq!(out.origin, Origin::Remote);
    assert_eq!(out.value.len(), 3);
    assert_eq!(out.value[0].relevance, "Reports.");
    assert!(!out.value[1].relevance.is_empty());
    assert_eq!(out.value[2].relevance, "Dashboards.");
    assert_eq!(cache.lesson_cache.len(), 3);
    assert_eq!(c.calls(), 1);
  }

  #[tokio::test]
  async fn regenerated_tree_replaces_unstarted_lessons() {
    let first = r#"[{"title": "Pivot Tables"}, {"title": "Lookups"}]"#;
    let second = r#"[{"title": "Charts"}]"#;
    let c = Scripted::new(vec![Ok(first.into()), Ok(second.into())]);
    let o = orchestrator(c);
    let ctx = LessonContext { skills: vec!["Excel".into()], ..Default::default() };
    let mut cache = profile();

    o.generate_lessons(&ctx, &mut cache).await;
    o.generate_lessons(&ctx, &mut cache).await;
    let titles: Vec<&str> = cache.lesson_cache.keys().map(String::as_str).collect();
    assert_eq!(titles, vec!["Charts"]);
  }

  #[tokio::test]
  async fn challenge_is_cached_and_reused() {
    let c = Scripted::new(vec![Ok(r#"{"scenario": "S", "task": "T", "hint": "H"}"#.into())]);
    let o = orchestrator(c.clone());
    let ctx = ChallengeContext { skill: "SQL".into(), lesson_title: "Joins".into(), ..Default::default() };
    let mut cache = profile();

    let first = o.generate_challenge(&ctx, &mut cache).await;
    let second = o.generate_challenge(&ctx, &mut cache).await;
    assert_eq!(first.value, Challenge { scenario: "S".into(), task: "T".into(), hint: "H".into() });
    assert_eq!(second.value, first.value);
    assert_eq!(c.calls(), 1);
    let cached = &cache.lesson_cache["Joins"];
    assert!(!cached.description.is_empty() && !cached.relevance.is_empty());
  }

  #[tokio::test]
  async fn failed_challenge_is_not_cached() {
    let o = orchestrator(Scripted::failing());
    let ctx = ChallengeContext { skill: "SQL".into(), lesson_title: "Joins".into(), ..Default::default() };
    let mut cache = profile();
    let out = o.generate_challenge(&ctx, &mut cache).await;
    assert!(out.is_fallback());
    assert!(!out.value.scenario.is_empty() && !out.value.task.is_empty() && !out.value.hint.is_empty());
    assert!(cache.lesson_cache.is_empty());
  }

  #[tokio::test]
  async fn empty_answer_is_rejected_before_network() {
    let c = Scripted::new(vec![Ok(r#"{"score": 90}"#.into())]);
    let o = orchestrator(c.clone());
    let err = o.evaluate_answer(&eval_ctx("   ")).await.unwrap_err();
    assert_eq!(err, AnswerRejected::Empty);
    assert!(err.to_string().contains("enter an answer"));
    assert_eq!(c.calls(), 0);

    let err = o.evaluate_answer(&eval_ctx(&"a".repeat(MAX_ANSWER_CHARS + 1))).await.unwrap_err();
    assert_eq!(err, AnswerRejected::TooLong { max: MAX_ANSWER_CHARS });
  }

  #[tokio::test]
  async fn failed_evaluation_uses_local_heuristic() {
    let mut answer = String::from("I would analyze the data first, then prioritize the biggest gaps.");
    while answer.chars().count() < 210 {
      answer.push_str(" Then more.");
    }
    let answer: String = answer.chars().take(210).collect();

    let out = orchestrator(Scripted::failing()).evaluate_answer(&eval_ctx(&answer)).await.unwrap();
    assert!(out.is_fallback());
    assert!(out.value.score >= 70.0);
    assert!(out.value.can_proceed);
  }

  #[tokio::test]
  async fn remote_evaluation_is_normalized() {
    let c = Scripted::new(vec![Ok("```json\n{\"score\": 72, \"feedback\": \"Nice.\"}\n```".into())]);
    let out = orchestrator(c).evaluate_answer(&eval_ctx("I would compare keys.")).await.unwrap();
    assert_eq!(out.origin, Origin::Remote);
    assert_eq!(out.value.score, 72.0);
    assert_eq!(out.value.feedback, "Nice.");
    assert!(out.value.is_correct && out.value.can_proceed);
    assert!(!out.value.suggestion.is_empty());
  }
}
