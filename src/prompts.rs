//! Prompt assembly. Pure functions from a context snapshot to the two messages
//! sent to the model. Rendering is deterministic for a given snapshot.

use serde::Serialize;

use crate::config::Prompts;
use crate::domain::{industry_or_default, ChallengeContext, EvaluationContext, LessonContext};
use crate::util::{fill_template, truncate_chars};

/// Longest resume excerpt forwarded to the model.
pub const RESUME_EXCERPT_CHARS: usize = 2000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Prompt {
  pub system: String,
  pub user: String,
}

pub fn lessons_prompt(prompts: &Prompts, ctx: &LessonContext) -> Prompt {
  let skills = if ctx.skills.is_empty() { "none yet".to_string() } else { ctx.skills.join(", ") };

  let answers = if ctx.career_answers.is_empty() {
    "- (not answered)".to_string()
  } else {
    ctx.career_answers
      .iter()
      .map(|(q, a)| format!("- {}: {}", q.trim(), a.trim()))
      .collect::<Vec<_>>()
      .join("\n")
  };

  let resume = match (&ctx.resume_content, ctx.resume_uploaded) {
    (Some(text), true) if !text.trim().is_empty() => truncate_chars(text.trim(), RESUME_EXCERPT_CHARS),
    _ => "(no resume provided)".to_string(),
  };

  Prompt {
    system: prompts.lessons_system.clone(),
    user: fill_template(
      &prompts.lessons_user_template,
      &[
        ("skills", &skills),
        ("industry", industry_or_default(ctx.industry.as_deref())),
        ("career_answers", &answers),
        ("resume", &resume),
      ],
    ),
  }
}

pub fn challenge_prompt(prompts: &Prompts, ctx: &ChallengeContext) -> Prompt {
  let description = if ctx.lesson_description.trim().is_empty() {
    "(none)"
  } else {
    ctx.lesson_description.trim()
  };
  Prompt {
    system: prompts.challenge_system.clone(),
    user: fill_template(
      &prompts.challenge_user_template,
      &[
        ("skill", ctx.skill.trim()),
        ("industry", industry_or_default(ctx.industry.as_deref())),
        ("lesson_title", ctx.lesson_title.trim()),
        ("lesson_description", description),
      ],
    ),
  }
}

pub fn evaluation_prompt(prompts: &Prompts, ctx: &EvaluationContext) -> Prompt {
  Prompt {
    system: prompts.evaluation_system.clone(),
    user: fill_template(
      &prompts.evaluation_user_template,
      &[
        ("skill", ctx.skill.trim()),
        ("industry", industry_or_default(ctx.industry.as_deref())),
        ("lesson_title", ctx.lesson_title.trim()),
        ("scenario", ctx.challenge.scenario.trim()),
        ("task", ctx.challenge.task.trim()),
        ("answer", ctx.user_answer.trim()),
      ],
    ),
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use super::*;
  use crate::domain::Challenge;

  #[test]
  fn lessons_prompt_names_fields_and_context() {
    let ctx = LessonContext {
      skills: vec!["Excel".into(), "SQL".into()],
      career_answers: BTreeMap::from([
        ("b_goal".to_string(), "Analyst".to_string()),
        ("a_style".to_string(), "Hands-on".to_string()),
      ]),
      industry: Some("Finance".into()),
      ..Default::default()
    };
    let p = lessons_prompt(&Prompts::default(), &ctx);
    assert!(p.user.contains("Excel, SQL"));
    assert!(p.user.contains("Finance"));
    assert!(p.user.find("a_style").unwrap() < p.user.find("b_goal").unwrap());
    for field in ["\"title\"", "\"description\"", "\"relevance\""] {
      assert!(p.user.contains(field), "missing {field}");
    }
    assert!(p.user.contains("(no resume provided)"));
    assert!(p.system.contains("ONLY"));
    assert_eq!(p, lessons_prompt(&Prompts::default(), &ctx));
  }

  #[test]
  fn resume_only_included_when_uploaded() {
    let mut ctx = LessonContext {
      resume_content: Some("x".repeat(RESUME_EXCERPT_CHARS + 50)),
      ..Default::default()
    };
    assert!(!lessons_prompt(&Prompts::default(), &ctx).user.contains("xxxx"));

    ctx.resume_uploaded = true;
    let p = lessons_prompt(&Prompts::default(), &ctx);
    assert!(p.user.contains(&format!("{}…", "x".repeat(RESUME_EXCERPT_CHARS))));
    assert!(!p.user.contains(&"x".repeat(RESUME_EXCERPT_CHARS + 1)));
  }

  #[test]
  fn learner_text_with_braces_is_kept_literal() {
    let ctx = LessonContext {
      skills: vec!["{resume}".into()],
      resume_uploaded: true,
      resume_content: Some("SECRET".into()),
      ..Default::default()
    };
    let p = lessons_prompt(&Prompts::default(), &ctx);
    assert!(p.user.contains("{resume}"));
    assert_eq!(p.user.matches("SECRET").count(), 1);
  }

  #[test]
  fn evaluation_prompt_embeds_challenge_and_answer() {
    let ctx = EvaluationContext {
      skill: "Negotiation".into(),
      lesson_title: "Anchoring".into(),
      challenge: Challenge {
        scenario: "A vendor raises prices.".into(),
        task: "How do you respond?".into(),
        hint: "Think BATNA.".into(),
      },
      user_answer: "  I would prepare alternatives.  ".into(),
      industry: None,
    };
    let p = evaluation_prompt(&Prompts::default(), &ctx);
    assert!(p.user.contains("A vendor raises prices."));
    assert!(p.user.contains("Learner answer: I would prepare alternatives.\n"));
    assert!(p.user.contains("your chosen field"));
    assert!(p.user.contains("\"canProceed\""));
    assert!(!p.user.contains("Think BATNA."));
  }
}
