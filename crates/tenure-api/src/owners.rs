//! Handlers for `/owners` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/owners` | Body: [`NewOwner`], tagged by `owner_type` |
//! | `GET`  | `/owners?emirates_id=` | 404 if no owner holds the ID |
//! | `GET`  | `/owners/{id}` | 404 if not found |
//! | `GET`  | `/owners/{id}/portfolio` | `?status=current\|historical\|all&from=&to=` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tenure_core::{
  Registry,
  owner::{NewOwner, Owner},
  portfolio::{Portfolio, PortfolioQuery},
  store::RegistryStore,
};
use uuid::Uuid;

use crate::{
  error::{ApiError, JsonBody},
  provenance::Caller,
};

/// `POST /owners`
pub async fn create<S: RegistryStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(who): Caller,
  JsonBody(body): JsonBody<NewOwner>,
) -> Result<impl IntoResponse, ApiError> {
  let owner = registry.add_owner(body, &who).await?;
  Ok((StatusCode::CREATED, Json(owner)))
}

#[derive(Debug, Deserialize)]
pub struct LookupParams {
  pub emirates_id: Option<String>,
}

/// `GET /owners?emirates_id=784-XXXX-XXXXXXX-X`
pub async fn lookup<S: RegistryStore>(
  State(registry): State<Arc<Registry<S>>>,
  Query(params): Query<LookupParams>,
) -> Result<Json<Owner>, ApiError> {
  let raw = params
    .emirates_id
    .ok_or_else(|| ApiError::BadRequest("emirates_id is required".into()))?;
  let owner = registry
    .find_owner_by_emirates_id(&raw)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("no owner holds emirates id {raw}")))?;
  Ok(Json(owner))
}

/// `GET /owners/{id}`
pub async fn get_one<S: RegistryStore>(
  State(registry): State<Arc<Registry<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Owner>, ApiError> {
  Ok(Json(registry.get_owner(id).await?))
}

/// `GET /owners/{id}/portfolio`
pub async fn portfolio<S: RegistryStore>(
  State(registry): State<Arc<Registry<S>>>,
  Path(id): Path<Uuid>,
  Query(query): Query<PortfolioQuery>,
) -> Result<Json<Portfolio>, ApiError> {
  Ok(Json(registry.owner_portfolio(id, &query).await?))
}
