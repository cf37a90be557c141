//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::{FromRequest, rejection::JsonRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use tenure_core::Error as RegistryError;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Registry(#[from] RegistryError),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),
}

/// Body extraction failures surface as [`RegistryError::InvalidInput`].
impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    Self::Registry(RegistryError::InvalidInput(rejection.body_text()))
  }
}

/// [`axum::Json`] with [`ApiError`] as its rejection.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Registry(e) => match e {
        RegistryError::NotFound { .. } => StatusCode::NOT_FOUND,
        RegistryError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        RegistryError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RegistryError::InvalidTransferState { .. }
        | RegistryError::ConcurrentModification { .. }
        | RegistryError::UnitRetired(_)
        | RegistryError::Constraint(_) => StatusCode::CONFLICT,
        RegistryError::Storage(_) | RegistryError::Serialization(_) => {
          StatusCode::INTERNAL_SERVER_ERROR
        }
      },
    }
  }

  fn kind(&self) -> &'static str {
    match self {
      Self::NotFound(_) => "not_found",
      Self::BadRequest(_) => "bad_request",
      Self::Registry(e) => match e {
        RegistryError::NotFound { .. } => "not_found",
        RegistryError::InvalidTransferState { .. } => "invalid_transfer_state",
        RegistryError::ValidationFailed(_) => "validation_failed",
        RegistryError::ConcurrentModification { .. } => "concurrent_modification",
        RegistryError::UnitRetired(_) => "unit_retired",
        RegistryError::InvalidInput(_) => "invalid_input",
        RegistryError::Constraint(_) => "constraint",
        RegistryError::Storage(_) => "storage",
        RegistryError::Serialization(_) => "serialization",
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }

    let mut body = json!({ "error": self.to_string(), "kind": self.kind() });
    if let Self::Registry(RegistryError::ValidationFailed(violation)) = &self {
      body["violation"] = json!(violation);
    }
    (status, Json(body)).into_response()
  }
}
