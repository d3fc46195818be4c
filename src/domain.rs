//! Domain models: the user profile, lessons, challenges, evaluations, and the
//! context snapshots handed to the orchestrator.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// One step inside a lesson: a situation, what to do about it, and a nudge.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Challenge {
  pub scenario: String,
  pub task: String,
  pub hint: String,
}

/// A skill-tree node. Cached by title in the owning profile.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LessonRecord {
  pub title: String,
  pub description: String,
  pub relevance: String,
  #[serde(default)]
  pub challenges: Vec<Challenge>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
  pub is_correct: bool,
  pub score: f32,
  pub feedback: String,
  pub suggestion: String,
  pub can_proceed: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SkillProgress {
  pub completed_lessons: BTreeSet<String>,
  /// Number of distinct lessons completed for this skill.
  pub mastery_level: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
  pub id: String,
  pub name: String,
  pub email: String,
  #[serde(default)] pub industry: Option<String>,
  #[serde(default)] pub skills: Vec<String>,
  #[serde(default)] pub career_answers: BTreeMap<String, String>,
  #[serde(default)] pub skill_progress: BTreeMap<String, SkillProgress>,
  #[serde(default)] pub lesson_cache: BTreeMap<String, LessonRecord>,
  #[serde(default)] pub resume_uploaded: bool,
  #[serde(default)] pub resume_content: Option<String>,
}

impl UserProfile {
  pub fn new(id: String, name: String, email: String) -> Self {
    Self { id, name, email, ..Default::default() }
  }

  /// Add a skill if it is not already present (case-insensitive). Returns true if added.
  pub fn add_skill(&mut self, skill: &str) -> bool {
    let skill = skill.trim();
    if skill.is_empty() || self.skills.iter().any(|s| s.eq_ignore_ascii_case(skill)) {
      return false;
    }
    self.skills.push(skill.to_string());
    true
  }

  /// Record a quiz submission: answers replace the previous ones, skills are merged.
  pub fn apply_quiz(
    &mut self,
    answers: BTreeMap<String, String>,
    industry: Option<String>,
    skills: &[String],
  ) {
    self.career_answers = answers;
    if let Some(ind) = industry.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
      self.industry = Some(ind);
    }
    for s in skills {
      self.add_skill(s);
    }
  }

  pub fn attach_resume(&mut self, content: String) {
    self.resume_uploaded = true;
    self.resume_content = Some(content);
  }

  /// Mark a lesson complete for a skill. The mastery level only moves for a
  /// title that was not completed before. Returns the resulting level.
  pub fn complete_lesson(&mut self, skill: &str, lesson_title: &str) -> u32 {
    self.add_skill(skill);
    let progress = self.skill_progress.entry(skill.to_string()).or_default();
    if progress.completed_lessons.insert(lesson_title.to_string()) {
      progress.mastery_level += 1;
    }
    progress.mastery_level
  }
}

/// Where generated results get remembered between visits.
pub trait LessonCache: Send {
  fn cached_lesson(&self, title: &str) -> Option<&LessonRecord>;
  /// Remember a freshly generated skill tree. Cached lessons without a
  /// challenge that are not part of `lessons` are dropped; a title that is
  /// already cached keeps its existing record.
  fn store_lessons(&mut self, lessons: &[LessonRecord]);
  /// Attach a challenge to the cached lesson with `stub`'s title, caching `stub`
  /// first if the lesson is unknown. A lesson that already holds challenges is
  /// left untouched.
  fn store_challenge(&mut self, stub: LessonRecord, challenge: Challenge);
}

impl LessonCache for UserProfile {
  fn cached_lesson(&self, title: &str) -> Option<&LessonRecord> {
    self.lesson_cache.get(title)
  }

  fn store_lessons(&mut self, lessons: &[LessonRecord]) {
    let fresh: BTreeSet<&str> = lessons.iter().map(|l| l.title.as_str()).collect();
    self
      .lesson_cache
      .retain(|title, cached| !cached.challenges.is_empty() || fresh.contains(title.as_str()));
    for lesson in lessons {
      self.lesson_cache.entry(lesson.title.clone()).or_insert_with(|| lesson.clone());
    }
  }

  fn store_challenge(&mut self, stub: LessonRecord, challenge: Challenge) {
    let lesson = self.lesson_cache.entry(stub.title.clone()).or_insert(stub);
    if lesson.challenges.is_empty() {
      lesson.challenges.push(challenge);
    }
  }
}

/// Snapshot used to build the skill tree.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonContext {
  #[serde(default)] pub skills: Vec<String>,
  #[serde(default)] pub career_answers: BTreeMap<String, String>,
  #[serde(default)] pub industry: Option<String>,
  #[serde(default)] pub resume_uploaded: bool,
  #[serde(default)] pub resume_content: Option<String>,
}

impl From<&UserProfile> for LessonContext {
  fn from(p: &UserProfile) -> Self {
    Self {
      skills: p.skills.clone(),
      career_answers: p.career_answers.clone(),
      industry: p.industry.clone(),
      resume_uploaded: p.resume_uploaded,
      resume_content: p.resume_content.clone(),
    }
  }
}

/// Snapshot used to build one challenge for one lesson.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeContext {
  pub skill: String,
  pub lesson_title: String,
  #[serde(default)] pub lesson_description: String,
  #[serde(default)] pub industry: Option<String>,
}

/// Snapshot used to grade one answer.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationContext {
  pub skill: String,
  pub lesson_title: String,
  pub challenge: Challenge,
  pub user_answer: String,
  #[serde(default)] pub industry: Option<String>,
}

/// Industry label for prompts and defaults.
pub fn industry_or_default(industry: Option<&str>) -> &str {
  industry.map(str::trim).filter(|s| !s.is_empty()).unwrap_or("your chosen field")
}
