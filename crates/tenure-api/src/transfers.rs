//! Handlers for `/transfers` and `/documents` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/transfers` | Body: [`InitiateBody`]; 201 in `initiated` |
//! | `GET`  | `/transfers/{id}` | Transfer with its documents |
//! | `POST` | `/transfers/{id}/documents` | Body: [`NewDocument`] |
//! | `POST` | `/transfers/{id}/finalize` | 422 with the violation on rejection |
//! | `POST` | `/transfers/{id}/cancel` | 409 unless pending |
//! | `POST` | `/transfers/{id}/rebase` | Re-pin to the unit's latest version |
//! | `POST` | `/documents/{id}/verification` | Body: `{"status":"verified"}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tenure_core::{
  Registry,
  ownership::OwnershipChange,
  store::RegistryStore,
  transfer::{
    Amount, NewDocument, Transfer, TransferDetails, TransferDocument,
    TransferRequest, TransferType, VerificationStatus,
  },
};
use uuid::Uuid;

use crate::{
  error::{ApiError, JsonBody},
  provenance::Caller,
};

// ─── Initiate ────────────────────────────────────────────────────────────────

/// Request body for `POST /transfers`. `currency` defaults to the
/// registry's configured currency when an `amount` is given without one.
#[derive(Debug, Deserialize)]
pub struct InitiateBody {
  pub unit_id:       Uuid,
  pub transfer_type: TransferType,
  pub transfer_date: NaiveDate,
  pub changes:       Vec<OwnershipChange>,
  pub amount:        Option<f64>,
  pub currency:      Option<String>,
  pub legal_reason:  Option<String>,
}

/// `POST /transfers`
pub async fn initiate<S: RegistryStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(who): Caller,
  JsonBody(body): JsonBody<InitiateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let amount = match (body.amount, body.currency) {
    (Some(value), currency) => Some(Amount {
      value,
      currency: currency
        .unwrap_or_else(|| registry.config().default_currency.clone()),
    }),
    (None, Some(_)) => {
      return Err(ApiError::BadRequest("currency given without an amount".into()));
    }
    (None, None) => None,
  };

  let transfer = registry
    .initiate_transfer(
      TransferRequest {
        unit_id: body.unit_id,
        transfer_type: body.transfer_type,
        transfer_date: body.transfer_date,
        changes: body.changes,
        amount,
        legal_reason: body.legal_reason,
      },
      &who,
    )
    .await?;
  Ok((StatusCode::CREATED, Json(transfer)))
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

/// `GET /transfers/{id}`
pub async fn get_one<S: RegistryStore>(
  State(registry): State<Arc<Registry<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<TransferDetails>, ApiError> {
  Ok(Json(registry.get_transfer(id).await?))
}

/// `POST /transfers/{id}/documents`
pub async fn attach_document<S: RegistryStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(who): Caller,
  Path(id): Path<Uuid>,
  JsonBody(body): JsonBody<NewDocument>,
) -> Result<impl IntoResponse, ApiError> {
  let document = registry.attach_document(id, body, &who).await?;
  Ok((StatusCode::CREATED, Json(document)))
}

/// `POST /transfers/{id}/finalize`
pub async fn finalize<S: RegistryStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(who): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Transfer>, ApiError> {
  Ok(Json(registry.finalize_transfer(id, &who).await?))
}

/// `POST /transfers/{id}/cancel`
pub async fn cancel<S: RegistryStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(who): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Transfer>, ApiError> {
  Ok(Json(registry.cancel_transfer(id, &who).await?))
}

/// `POST /transfers/{id}/rebase`
pub async fn rebase<S: RegistryStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(who): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Transfer>, ApiError> {
  Ok(Json(registry.rebase_transfer(id, &who).await?))
}

// ─── Documents ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct VerificationBody {
  pub status: VerificationStatus,
}

/// `POST /documents/{id}/verification`
pub async fn verify_document<S: RegistryStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(who): Caller,
  Path(id): Path<Uuid>,
  JsonBody(body): JsonBody<VerificationBody>,
) -> Result<Json<TransferDocument>, ApiError> {
  Ok(Json(registry.verify_document(id, body.status, &who).await?))
}
