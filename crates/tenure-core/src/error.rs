//! Error types for `tenure-core`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{transfer::TransferStatus, validator::Violation};

/// The kind of row a [`Error::NotFound`] refers to.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Entity {
  Unit,
  Owner,
  Transfer,
  Document,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{entity} not found: {id}")]
  NotFound { entity: Entity, id: Uuid },

  #[error("transfer {transfer_id} is {status}; operation not allowed")]
  InvalidTransferState {
    transfer_id: Uuid,
    status:      TransferStatus,
  },

  #[error("validation failed: {0}")]
  ValidationFailed(Violation),

  /// Lost the race for the unit's ownership set. Retryable.
  #[error("ownership of unit {unit_id} changed concurrently")]
  ConcurrentModification { unit_id: Uuid },

  #[error("unit {0} is retired")]
  UnitRetired(Uuid),

  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// A constraint at the storage boundary refused the write.
  #[error("constraint violation: {0}")]
  Constraint(String),

  #[error("storage failure: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn not_found(entity: Entity, id: Uuid) -> Self {
    Self::NotFound { entity, id }
  }

  /// Expected outcomes a caller can act on, as opposed to storage faults.
  pub fn is_recoverable(&self) -> bool {
    !matches!(self, Self::Storage(_) | Self::Serialization(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
