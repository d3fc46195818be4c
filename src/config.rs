//! Configuration: prompt templates from TOML, completion endpoint from env.
//!
//! See `AgentConfig` and `Prompts` for the TOML schema; every prompt key is
//! optional and falls back to the built-in default.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Prompt templates. Placeholders use `{name}` and are filled by `prompts.rs`.
///
/// Lessons:    {skills} {industry} {career_answers} {resume}
/// Challenge:  {skill} {industry} {lesson_title} {lesson_description}
/// Evaluation: {skill} {industry} {lesson_title} {scenario} {task} {answer}
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Prompts {
  pub lessons_system: String,
  pub lessons_user_template: String,
  pub challenge_system: String,
  pub challenge_user_template: String,
  pub evaluation_system: String,
  pub evaluation_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      lessons_system: "You are a career coach who designs short, practical lessons. Respond ONLY with a JSON array, no prose and no code fences.".into(),
      lessons_user_template: "Design 3 to 5 lessons for a learner.\nCurrent skills: {skills}\nIndustry: {industry}\nCareer quiz answers:\n{career_answers}\nResume excerpt:\n{resume}\n\nReturn a JSON array where every element is an object with string fields \"title\", \"description\" and \"relevance\" (why this lesson matters for the learner's career). Return ONLY the JSON array.".into(),
      challenge_system: "You create realistic workplace challenges for career learners. Respond ONLY with a JSON object, no prose and no code fences.".into(),
      challenge_user_template: "Skill: {skill}\nIndustry: {industry}\nLesson: {lesson_title}\nLesson summary: {lesson_description}\n\nCreate one challenge. Return a JSON object with string fields \"scenario\" (a short workplace situation), \"task\" (the question the learner must answer) and \"hint\" (one nudge that does not give the answer away). Return ONLY the JSON object.".into(),
      evaluation_system: "You are a fair, encouraging career coach grading a learner's answer. Respond ONLY with a JSON object, no prose and no code fences.".into(),
      evaluation_user_template: "Skill: {skill}\nIndustry: {industry}\nLesson: {lesson_title}\nScenario: {scenario}\nTask: {task}\nLearner answer: {answer}\n\nReturn a JSON object with fields \"isCorrect\" (boolean), \"score\" (number 0-100), \"feedback\" (string), \"suggestion\" (string) and \"canProceed\" (boolean). 'isCorrect' and 'canProceed' are true if score >= 70. Return ONLY the JSON object.".into(),
    }
  }
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AgentConfig>(&s) {
      Ok(cfg) => {
        info!(target: "skilltree", %path, "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "skilltree", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "skilltree", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

/// Remote completion endpoint settings.
#[derive(Clone, Debug)]
pub struct CompletionSettings {
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub timeout: Duration,
}

impl CompletionSettings {
  /// Present only when OPENAI_API_KEY is set.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let timeout = std::env::var("OPENAI_TIMEOUT_SECS")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .map(Duration::from_secs)
      .unwrap_or(Duration::from_secs(30));
    Some(Self { api_key, base_url: base_url.trim_end_matches('/').to_string(), model, timeout })
  }
}
