//! Handlers for `/audit` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/audit` | Optional `?table=<name>&record_id=<id>` |
//! | `GET`  | `/audit/verify` | Walks the full hash chain |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use tenure_core::{
  Registry,
  audit::{AuditEntry, AuditQuery, ChainReport},
  store::RegistryStore,
};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct TrailParams {
  pub table:     Option<String>,
  pub record_id: Option<String>,
}

/// `GET /audit[?table=<name>&record_id=<id>]`
pub async fn trail<S: RegistryStore>(
  State(registry): State<Arc<Registry<S>>>,
  Query(params): Query<TrailParams>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
  let entries = registry
    .audit_trail(AuditQuery {
      table_name: params.table,
      record_id:  params.record_id,
    })
    .await?;
  Ok(Json(entries))
}

/// `GET /audit/verify`
pub async fn verify<S: RegistryStore>(
  State(registry): State<Arc<Registry<S>>>,
) -> Result<Json<ChainReport>, ApiError> {
  Ok(Json(registry.verify_audit_chain().await?))
}
