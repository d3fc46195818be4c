//! Untyped model JSON -> fully populated domain records.
//!
//! Nothing here fails: any field that is missing, of the wrong type, or blank
//! is replaced with a readable default built from the request context. Valid
//! values are passed through untouched.

use serde_json::{Map, Value};

use crate::domain::{
  industry_or_default, Challenge, ChallengeContext, EvaluationContext, EvaluationResult,
  LessonContext, LessonRecord,
};

/// Upper bound on lessons kept from one completion.
pub const MAX_LESSONS: usize = 8;

/// Score at or above which the model's grade counts as correct and passable
/// when it omitted the booleans.
pub const REMOTE_PASS_SCORE: f32 = 70.0;

fn text_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
  keys.iter()
    .filter_map(|k| map.get(*k))
    .find_map(|v| v.as_str())
    .filter(|s| !s.trim().is_empty())
    .map(str::to_string)
}

fn bool_field(map: &Map<String, Value>, keys: &[&str]) -> Option<bool> {
  keys.iter().filter_map(|k| map.get(*k)).find_map(|v| match v {
    Value::Bool(b) => Some(*b),
    Value::String(s) => s.trim().parse::<bool>().ok(),
    _ => None,
  })
}

fn number_field(map: &Map<String, Value>, keys: &[&str]) -> Option<f32> {
  keys.iter()
    .filter_map(|k| map.get(*k))
    .find_map(|v| match v {
      Value::Number(n) => n.as_f64().map(|f| f as f32),
      Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f32>().ok(),
      _ => None,
    })
    .filter(|f| f.is_finite())
}

fn skill_label(skill: &str) -> &str {
  let s = skill.trim();
  if s.is_empty() { "this skill" } else { s }
}

pub fn lessons(items: Vec<Value>, ctx: &LessonContext) -> Vec<LessonRecord> {
  let focus = ctx.skills.first().map(|s| s.trim()).filter(|s| !s.is_empty()).unwrap_or("core career");
  let industry = industry_or_default(ctx.industry.as_deref());
  let empty = Map::new();

  items
    .iter()
    .take(MAX_LESSONS)
    .enumerate()
    .map(|(i, item)| {
      let map = item.as_object().unwrap_or(&empty);
      LessonRecord {
        title: text_field(map, &["title", "name"])
          .unwrap_or_else(|| format!("Untitled Lesson {}", i + 1)),
        description: text_field(map, &["description", "summary"])
          .unwrap_or_else(|| format!("Practical steps to grow your {focus} skills.")),
        relevance: text_field(map, &["relevance", "why"])
          .unwrap_or_else(|| format!("Builds skills employers in {industry} look for.")),
        challenges: Vec::new(),
      }
    })
    .collect()
}

pub fn challenge(mut map: Map<String, Value>, ctx: &ChallengeContext) -> Challenge {
  if !map.contains_key("scenario") {
    if let Some(Value::Object(inner)) = map.remove("challenge") {
      map = inner;
    }
  }

  let skill = skill_label(&ctx.skill);
  let industry = industry_or_default(ctx.industry.as_deref());
  Challenge {
    scenario: text_field(&map, &["scenario", "situation"]).unwrap_or_else(|| {
      format!("You are working in {industry} and a situation comes up where {skill} makes the difference.")
    }),
    task: text_field(&map, &["task", "question"])
      .unwrap_or_else(|| format!("Explain, step by step, how you would apply {skill} in this situation.")),
    hint: text_field(&map, &["hint"])
      .unwrap_or_else(|| lesson_hint(&ctx.lesson_title)),
  }
}

pub(crate) fn lesson_hint(lesson_title: &str) -> String {
  let title = lesson_title.trim();
  if title.is_empty() {
    "Break the problem into small steps and say why each one matters.".into()
  } else {
    format!("Think about how the ideas from \"{title}\" apply here, then break the problem into small steps.")
  }
}

/// Minimal cached lesson for a challenge whose lesson was never listed.
pub fn lesson_stub(ctx: &ChallengeContext) -> LessonRecord {
  let skill = skill_label(&ctx.skill);
  let description = ctx.lesson_description.trim();
  LessonRecord {
    title: ctx.lesson_title.clone(),
    description: if description.is_empty() {
      format!("Practical steps to grow your {skill} skills.")
    } else {
      description.to_string()
    },
    relevance: format!(
      "Builds skills employers in {} look for.",
      industry_or_default(ctx.industry.as_deref())
    ),
    challenges: Vec::new(),
  }
}

pub fn evaluation(map: Map<String, Value>, ctx: &EvaluationContext) -> EvaluationResult {
  let score = number_field(&map, &["score"]).unwrap_or(0.0).clamp(0.0, 100.0);
  let passed = score >= REMOTE_PASS_SCORE;
  let skill = skill_label(&ctx.skill);

  EvaluationResult {
    is_correct: bool_field(&map, &["isCorrect", "is_correct", "correct"]).unwrap_or(passed),
    score,
    feedback: text_field(&map, &["feedback", "explanation"]).unwrap_or_else(|| {
      if passed {
        format!("Good work applying {skill} to this scenario.")
      } else {
        format!("Your answer needs more detail on how {skill} applies here.")
      }
    }),
    suggestion: text_field(&map, &["suggestion", "suggestions"])
      .unwrap_or_else(|| "Add concrete steps and explain the reasoning behind each one.".into()),
    can_proceed: bool_field(&map, &["canProceed", "can_proceed"]).unwrap_or(passed),
  }
}
