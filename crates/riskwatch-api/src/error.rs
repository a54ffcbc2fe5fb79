//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("internal error: {0}")]
  Internal(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<riskwatch_tracker::Error> for ApiError {
  fn from(e: riskwatch_tracker::Error) -> Self {
    use riskwatch_tracker::Error as E;
    match e {
      E::NotFound(id) => Self::NotFound(format!("risk {id} not found")),
      E::DuplicateRisk(_) | E::Conflict(_) => Self::Conflict(e.to_string()),
      E::Core(riskwatch_core::Error::InvalidInput(m)) => Self::BadRequest(m),
      E::Core(other) => Self::Internal(other.to_string()),
      E::Persistence(inner) => Self::Store(inner),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Internal(_) | ApiError::Store(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };
    let message = match self {
      ApiError::NotFound(m)
      | ApiError::BadRequest(m)
      | ApiError::Conflict(m)
      | ApiError::Internal(m) => m,
      ApiError::Store(e) => e.to_string(),
    };
    (status, Json(json!({ "success": false, "error": message }))).into_response()
  }
}
