//! Public HTTP request/response structs (serde ready, camelCase on the wire).
//! Keep this small and stable to evolve backend and frontend independently.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Challenge, EvaluationResult, LessonRecord, UserProfile};
use crate::fallback::Generated;

#[derive(Debug, Deserialize)]
pub struct CreateProfileIn {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct QuizIn {
    #[serde(default)]
    pub answers: BTreeMap<String, String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResumeIn {
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeIn {
    pub skill: String,
    pub lesson_title: String,
    #[serde(default)]
    pub lesson_description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateIn {
    pub skill: String,
    pub lesson_title: String,
    pub challenge: Challenge,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileOut {
    pub profile: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct LessonsOut {
    pub lessons: Vec<LessonRecord>,
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

impl From<Generated<Vec<LessonRecord>>> for LessonsOut {
    fn from(g: Generated<Vec<LessonRecord>>) -> Self {
        Self {
            fallback: g.is_fallback(),
            advisory: g.advisory().map(String::from),
            lessons: g.value,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChallengeOut {
    pub challenge: Challenge,
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

impl From<Generated<Challenge>> for ChallengeOut {
    fn from(g: Generated<Challenge>) -> Self {
        Self {
            fallback: g.is_fallback(),
            advisory: g.advisory().map(String::from),
            challenge: g.value,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationOut {
    pub evaluation: EvaluationResult,
    /// Mastery level for the skill after this submission.
    pub mastery_level: u32,
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthOut {
    pub ok: bool,
    pub remote_generation: bool,
}
