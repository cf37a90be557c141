//! Handlers for `/units` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/units` | All units |
//! | `POST` | `/units` | Body: [`NewUnit`] |
//! | `GET`  | `/units/{id}` | 404 if not found |
//! | `POST` | `/units/{id}/retire` | Idempotent |
//! | `GET`  | `/units/{id}/owners` | Current stakes |
//! | `GET`  | `/units/{id}/history` | Every record, by start date |
//! | `GET`  | `/units/{id}/transfers/pending` | Uncommitted transfers |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use tenure_core::{
  Registry,
  ownership::{CurrentStake, OwnershipRecord},
  store::RegistryStore,
  transfer::Transfer,
  unit::{NewUnit, Unit},
};
use uuid::Uuid;

use crate::{
  error::{ApiError, JsonBody},
  provenance::Caller,
};

/// `GET /units`
pub async fn list<S: RegistryStore>(
  State(registry): State<Arc<Registry<S>>>,
) -> Result<Json<Vec<Unit>>, ApiError> {
  Ok(Json(registry.list_units().await?))
}

/// `POST /units`
pub async fn create<S: RegistryStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(who): Caller,
  JsonBody(body): JsonBody<NewUnit>,
) -> Result<impl IntoResponse, ApiError> {
  let unit = registry.add_unit(body, &who).await?;
  Ok((StatusCode::CREATED, Json(unit)))
}

/// `GET /units/{id}`
pub async fn get_one<S: RegistryStore>(
  State(registry): State<Arc<Registry<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Unit>, ApiError> {
  Ok(Json(registry.get_unit(id).await?))
}

/// `POST /units/{id}/retire`
pub async fn retire<S: RegistryStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(who): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Unit>, ApiError> {
  Ok(Json(registry.retire_unit(id, &who).await?))
}

/// `GET /units/{id}/owners`
pub async fn owners<S: RegistryStore>(
  State(registry): State<Arc<Registry<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<CurrentStake>>, ApiError> {
  Ok(Json(registry.current_owners(id).await?))
}

/// `GET /units/{id}/history`
pub async fn history<S: RegistryStore>(
  State(registry): State<Arc<Registry<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<OwnershipRecord>>, ApiError> {
  Ok(Json(registry.history_of(id).await?))
}

/// `GET /units/{id}/transfers/pending`
pub async fn pending<S: RegistryStore>(
  State(registry): State<Arc<Registry<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Transfer>>, ApiError> {
  Ok(Json(registry.pending_transfers(id).await?))
}
