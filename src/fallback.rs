//! Locally computed content for when remote generation is unavailable.
//!
//! Everything here is a pure function of its arguments so the same context
//! always yields the same output.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::{
  industry_or_default, Challenge, ChallengeContext, EvaluationContext, EvaluationResult,
  LessonContext, LessonRecord,
};
use crate::normalize::lesson_hint;
use crate::util::words;

/// Fallback grading: correct at this score.
pub const LOCAL_CORRECT_SCORE: f32 = 70.0;
/// Fallback grading: may move on at this score. Sits below the remote pass score.
pub const LOCAL_PROCEED_SCORE: f32 = 60.0;

/// Words that signal structured problem solving in any field.
const GENERIC_TERMS: &[&str] = &[
  "analyze", "analysis", "plan", "prioritize", "priority", "communicate", "communication",
  "solution", "identify", "evaluate", "strategy", "stakeholder", "measure", "improve",
  "collaborate", "feedback", "risk", "goal", "data", "deadline",
];

/// Minimum length for a word of the challenge text to count as a keyword.
const CHALLENGE_KEYWORD_MIN: usize = 7;

/// Pipeline phase a generation run failed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
  AwaitingCompletion,
  Extracting,
}

impl std::fmt::Display for FailureStage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      FailureStage::AwaitingCompletion => "awaiting_completion",
      FailureStage::Extracting => "extracting",
    })
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
  Remote,
  Fallback { stage: FailureStage },
}

/// A result plus where it came from. `value` has the same shape either way.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Generated<T> {
  pub value: T,
  pub origin: Origin,
}

impl<T> Generated<T> {
  pub fn remote(value: T) -> Self {
    Self { value, origin: Origin::Remote }
  }

  pub fn fallback(value: T, stage: FailureStage) -> Self {
    Self { value, origin: Origin::Fallback { stage } }
  }

  pub fn is_fallback(&self) -> bool {
    matches!(self.origin, Origin::Fallback { .. })
  }

  /// Short note for the UI when fallback content is shown.
  pub fn advisory(&self) -> Option<&'static str> {
    self.is_fallback()
      .then_some("Showing fallback content while AI generation is unavailable.")
  }
}

pub fn lessons(ctx: &LessonContext, stage: FailureStage) -> Generated<Vec<LessonRecord>> {
  let industry = industry_or_default(ctx.industry.as_deref());
  let skills: Vec<&str> = ctx.skills
    .iter()
    .map(|s| s.trim())
    .filter(|s| !s.is_empty())
    .take(3)
    .collect();

  let value = if skills.is_empty() {
    universal_lessons(industry)
  } else {
    skills
      .into_iter()
      .map(|skill| LessonRecord {
        title: format!("Strengthen Your {skill} Skills"),
        description: format!(
          "Work through realistic tasks that push your {skill} from familiar to confident."
        ),
        relevance: format!("{skill} is already on your profile; deepening it pays off quickly in {industry}."),
        challenges: Vec::new(),
      })
      .collect()
  };
  Generated::fallback(value, stage)
}

fn universal_lessons(industry: &str) -> Vec<LessonRecord> {
  vec![
    LessonRecord {
      title: "Problem Solving Fundamentals".into(),
      description: "Break messy problems into clear steps, weigh options, and pick a course of action.".into(),
      relevance: format!("Every role in {industry} rewards people who can untangle problems."),
      challenges: Vec::new(),
    },
    LessonRecord {
      title: "Effective Communication".into(),
      description: "Explain ideas clearly in writing and in conversation, and adapt to your audience.".into(),
      relevance: "Clear communication is the most requested skill across industries.".into(),
      challenges: Vec::new(),
    },
    LessonRecord {
      title: "Time Management Essentials".into(),
      description: "Prioritize competing tasks, estimate effort, and protect time for deep work.".into(),
      relevance: "Managing your time well makes every other skill more effective.".into(),
      challenges: Vec::new(),
    },
  ]
}

pub fn challenge(ctx: &ChallengeContext, stage: FailureStage) -> Generated<Challenge> {
  let skill = match ctx.skill.trim() {
    "" => "problem solving",
    s => s,
  };
  let industry = industry_or_default(ctx.industry.as_deref());
  let lesson = match ctx.lesson_title.trim() {
    "" => "this lesson".to_string(),
    t => format!("\"{t}\""),
  };

  Generated::fallback(
    Challenge {
      scenario: format!(
        "Your team in {industry} has a deadline next week and a key task depends on {skill}. \
         Your manager asks you to take the lead on it."
      ),
      task: format!(
        "Describe, step by step, how you would use {skill} to deliver this task on time, \
         drawing on what you learned in {lesson}."
      ),
      hint: lesson_hint(&ctx.lesson_title),
    },
    stage,
  )
}

/// Keyword-and-length heuristic used when the model cannot grade.
pub fn evaluation(ctx: &EvaluationContext, stage: FailureStage) -> Generated<EvaluationResult> {
  let answer = ctx.user_answer.trim();
  let len = answer.chars().count();

  let mut score: f32 = 20.0;
  if len > 50 { score += 20.0; }
  if len > 100 { score += 15.0; }
  if len > 200 { score += 15.0; }

  let matches = keyword_matches(ctx, answer);
  match matches {
    0 => {}
    1 => score += 10.0,
    _ => score += 30.0,
  }
  let score = score.min(100.0);

  let is_correct = score >= LOCAL_CORRECT_SCORE;
  let can_proceed = score >= LOCAL_PROCEED_SCORE;
  let skill = match ctx.skill.trim() {
    "" => "this skill",
    s => s,
  };

  let feedback = if is_correct {
    format!("Solid answer: it is detailed and uses the key ideas of {skill}.")
  } else if can_proceed {
    format!("Good start. Your answer covers the basics of {skill} and could go deeper.")
  } else {
    format!("Your answer is too brief to show how you would apply {skill}.")
  };
  let suggestion = if matches < 2 {
    "Refer to specifics from the scenario and name the steps you would take.".to_string()
  } else if len <= 200 {
    "Expand on each step with the reasoning and the expected outcome.".to_string()
  } else {
    "Consider how you would measure whether your approach worked.".to_string()
  };

  Generated::fallback(
    EvaluationResult { is_correct, score, feedback, suggestion, can_proceed },
    stage,
  )
}

fn keyword_matches(ctx: &EvaluationContext, answer: &str) -> usize {
  let mut keywords: BTreeSet<String> = GENERIC_TERMS.iter().map(|s| s.to_string()).collect();
  keywords.extend(words(&ctx.skill));
  keywords.extend(
    words(&ctx.challenge.scenario)
      .chain(words(&ctx.challenge.task))
      .filter(|w| w.chars().count() >= CHALLENGE_KEYWORD_MIN),
  );

  let answer_words: BTreeSet<String> = words(answer).collect();
  let mut hits = keywords.iter().filter(|k| answer_words.contains(*k)).count();

  // A multi-word or symbolic skill name also counts as one phrase.
  let skill = ctx.skill.trim().to_lowercase();
  if !skill.is_empty() && !keywords.contains(&skill) && answer.to_lowercase().contains(&skill) {
    hits += 1;
  }
  hits
}

#[cfg(test)]
mod tests {
  use super::*;

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

  #[test]
  fn one_skill_gives_one_lesson_about_it() {
    let ctx = LessonContext { skills: vec!["Excel".into()], ..Default::default() };
    let out = lessons(&ctx, FailureStage::AwaitingCompletion);
    assert!(out.is_fallback());
    assert_eq!(out.value.len(), 1);
    assert!(out.value[0].title.contains("Excel"));
  }

  #[test]
  fn only_first_three_skills_are_used() {
    let ctx = LessonContext {
      skills: vec!["A".into(), "B".into(), "C".into(), "D".into()],
      ..Default::default()
    };
    let titles: Vec<String> = lessons(&ctx, FailureStage::Extracting).value.into_iter().map(|l| l.title).collect();
    assert_eq!(titles.len(), 3);
    assert!(titles.iter().all(|t| !t.contains(" D ")));
  }

  #[test]
  fn no_skills_gives_universal_set() {
    let out = lessons(&LessonContext::default(), FailureStage::AwaitingCompletion).value;
    assert_eq!(out.len(), 3);
    let titles: Vec<&str> = out.iter().map(|l| l.title.as_str()).collect();
    assert!(titles[0].contains("Problem Solving"));
    assert!(titles[1].contains("Communication"));
    assert!(titles[2].contains("Time Management"));
    for l in &out {
      assert!(!l.title.is_empty() && !l.description.is_empty() && !l.relevance.is_empty());
    }
  }

  #[test]
  fn fallback_is_byte_identical_across_calls() {
    let ctx = LessonContext { skills: vec!["Excel".into(), "SQL".into()], ..Default::default() };
    let a = serde_json::to_string(&lessons(&ctx, FailureStage::AwaitingCompletion)).unwrap();
    let b = serde_json::to_string(&lessons(&ctx, FailureStage::AwaitingCompletion)).unwrap();
    assert_eq!(a, b);

    let e = eval_ctx("I would analyze both sheets");
    let a = serde_json::to_string(&evaluation(&e, FailureStage::Extracting)).unwrap();
    let b = serde_json::to_string(&evaluation(&e, FailureStage::Extracting)).unwrap();
    assert_eq!(a, b);
  }

  #[test]
  fn long_answer_with_two_keywords_passes() {
    let mut answer = String::from("First I would analyze the data and then prioritize the fixes.");
    while answer.chars().count() < 210 {
      answer.push_str(" More detail.");
    }
    let answer: String = answer.chars().take(210).collect();
    assert_eq!(answer.chars().count(), 210);

    let out = evaluation(&eval_ctx(&answer), FailureStage::AwaitingCompletion).value;
    assert!(out.score >= 70.0, "score {}", out.score);
    assert!(out.is_correct);
    assert!(out.can_proceed);
  }

  #[test]
  fn proceed_threshold_is_lower_than_correct_threshold() {
    // Over 100 chars with one keyword: 20 + 20 + 15 + 10 = 65.
    let mut answer = String::from("I would analyze it.");
    while answer.chars().count() < 120 {
      answer.push_str(" words");
    }
    let out = evaluation(&eval_ctx(&answer), FailureStage::AwaitingCompletion).value;
    assert_eq!(out.score, 65.0);
    assert!(!out.is_correct);
    assert!(out.can_proceed);
  }

  #[test]
  fn challenge_text_and_skill_supply_keywords() {
    let out = evaluation(&eval_ctx("reconcile in excel"), FailureStage::Extracting).value;
    // 20 base, no length bonus, two keyword hits.
    assert_eq!(out.score, 50.0);
    assert!(!out.can_proceed);
  }

  #[test]
  fn short_skill_names_count_as_keywords() {
    let ctx = EvaluationContext {
      skill: "UX".into(),
      ..eval_ctx("I would run ux interviews and then analyze them")
    };
    // 20 base, no length bonus, "ux" and "analyze".
    assert_eq!(evaluation(&ctx, FailureStage::Extracting).value.score, 50.0);
  }

  #[test]
  fn symbolic_skill_name_matches_as_a_phrase() {
    let ctx = EvaluationContext { skill: "C++".into(), ..eval_ctx("templates in c++") };
    // "c" as a word plus the "c++" phrase.
    assert_eq!(evaluation(&ctx, FailureStage::Extracting).value.score, 50.0);
  }

  #[test]
  fn fallback_challenge_is_populated() {
    let ctx = ChallengeContext { skill: "SQL".into(), lesson_title: "Joins".into(), ..Default::default() };
    let ch = challenge(&ctx, FailureStage::AwaitingCompletion).value;
    assert!(ch.scenario.contains("SQL"));
    assert!(ch.task.contains("\"Joins\""));
    assert!(!ch.hint.is_empty());
  }
}
