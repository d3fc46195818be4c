//! Error types. `ContentError` never leaves the orchestrator; `ApiError` is what
//! HTTP handlers return.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;

/// Why a remote generation attempt could not be used.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContentError {
  #[error("completion failed: {0}")]
  Network(String),

  #[error("no usable JSON in completion: {0}")]
  Parse(String),

  #[error("unexpected JSON shape: {0}")]
  Shape(String),
}

/// Input refused before anything is sent to the model.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnswerRejected {
  #[error("Please enter an answer before submitting.")]
  Empty,

  #[error("Answer is too long; please keep it under {max} characters.")]
  TooLong { max: usize },
}

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("profile store I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("profile store is not valid JSON: {0}")]
  Serde(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Validation error: {0}")]
  Validation(String),

  #[error(transparent)]
  Store(#[from] StoreError),
}

impl From<AnswerRejected> for ApiError {
  fn from(e: AnswerRejected) -> Self {
    ApiError::Validation(e.to_string())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, code, message) = match &self {
      ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
      ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
      ApiError::Store(e) => {
        tracing::error!(target: "store", error = %e, "Profile store failure");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          "STORE_ERROR",
          "Could not save your progress".to_string(),
        )
      }
    };

    let body = Json(json!({
      "error": {
        "code": code,
        "message": message
      }
    }));

    (status, body).into_response()
  }
}
