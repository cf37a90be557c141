//! [`Registry`]: the transfer orchestrator and read-side query facade.
//!
//! The registry owns no state of its own. Every operation loads what it needs
//! from the [`RegistryStore`], decides in memory, and hands the store a
//! write-set to apply atomically. Per-unit serialisation is optimistic: each
//! unit carries an ownership version and a commit only lands if the version
//! is still the one the transfer was proposed against.

use std::{
  collections::{BTreeMap, HashSet},
  sync::Arc,
};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  audit::{AuditEntry, AuditQuery, ChainReport, Provenance, verify_chain},
  error::Entity,
  owner::{EmiratesId, NewOwner, Owner},
  ownership::{CurrentStake, OwnershipRecord, UnitState},
  portfolio::{self, Portfolio, PortfolioQuery},
  proposal::propose,
  store::RegistryStore,
  transfer::{
    Finalization, NewDocument, NewTransfer, Transfer, TransferDetails,
    TransferDocument, TransferRequest, Transition,
    VerificationStatus,
  },
  unit::{NewUnit, Unit},
  validator::{self, Violation},
};

/// Tunables for the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
  /// Currency applied to amounts submitted without one.
  pub default_currency: String,
}

impl Default for RegistryConfig {
  fn default() -> Self { Self { default_currency: "AED".to_owned() } }
}

pub struct Registry<S> {
  store:  Arc<S>,
  config: RegistryConfig,
}

fn lift<T, E: Into<Error>>(result: std::result::Result<T, E>) -> Result<T> {
  result.map_err(Into::into)
}

fn today() -> NaiveDate { Utc::now().date_naive() }

fn require_text(field: &str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::InvalidInput(format!("{field} must not be empty")));
  }
  Ok(())
}

impl<S: RegistryStore> Registry<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self::with_config(store, RegistryConfig::default())
  }

  pub fn with_config(store: Arc<S>, config: RegistryConfig) -> Self {
    Self { store, config }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn config(&self) -> &RegistryConfig { &self.config }

  // ── Registration ────────────────────────────────────────────────────────

  pub async fn add_unit(&self, input: NewUnit, who: &Provenance) -> Result<Unit> {
    require_text("unique_key", &input.unique_key)?;
    require_text("building_name", &input.building_name)?;
    require_text("unit_number", &input.unit_number)?;
    let unit = lift(self.store.add_unit(input, who).await)?;
    info!(unit_id = %unit.unit_id, key = %unit.unique_key, "unit registered");
    Ok(unit)
  }

  pub async fn retire_unit(&self, unit_id: Uuid, who: &Provenance) -> Result<Unit> {
    self.get_unit(unit_id).await?;
    let unit = lift(self.store.retire_unit(unit_id, who).await)?;
    info!(%unit_id, "unit retired");
    Ok(unit)
  }

  pub async fn get_unit(&self, unit_id: Uuid) -> Result<Unit> {
    lift(self.store.get_unit(unit_id).await)?
      .ok_or(Error::not_found(Entity::Unit, unit_id))
  }

  pub async fn list_units(&self) -> Result<Vec<Unit>> {
    lift(self.store.list_units().await)
  }

  pub async fn add_owner(&self, input: NewOwner, who: &Provenance) -> Result<Owner> {
    require_text("full_name", &input.full_name)?;
    let owner = lift(self.store.add_owner(input, who).await)?;
    info!(owner_id = %owner.owner_id, owner_type = %owner.owner_type(), "owner registered");
    Ok(owner)
  }

  pub async fn get_owner(&self, owner_id: Uuid) -> Result<Owner> {
    lift(self.store.get_owner(owner_id).await)?
      .ok_or(Error::not_found(Entity::Owner, owner_id))
  }

  pub async fn find_owner_by_emirates_id(&self, raw: &str) -> Result<Option<Owner>> {
    let emirates_id = EmiratesId::parse(raw)?;
    lift(self.store.find_owner_by_emirates_id(&emirates_id).await)
  }

  // ── Transfer lifecycle ──────────────────────────────────────────────────

  /// Record a transfer in `Initiated` status. Ownership records are not
  /// touched until [`Self::finalize_transfer`].
  pub async fn initiate_transfer(
    &self,
    request: TransferRequest,
    who: &Provenance,
  ) -> Result<Transfer> {
    let unit = self.get_unit(request.unit_id).await?;
    if unit.is_retired() {
      return Err(Error::UnitRetired(unit.unit_id));
    }

    validator::check_transfer_date(request.transfer_date, today())
      .map_err(Error::ValidationFailed)?;

    if request.changes.is_empty() {
      return Err(Error::InvalidInput(
        "a transfer must change at least one stake".to_owned(),
      ));
    }
    let mut seen = HashSet::new();
    for change in &request.changes {
      if !change.percentage.is_finite() {
        return Err(Error::InvalidInput(format!(
          "percentage for owner {} is not a number",
          change.owner_id
        )));
      }
      if !seen.insert(change.owner_id) {
        return Err(Error::ValidationFailed(Violation::DuplicateCurrentOwner {
          owner_id: change.owner_id,
        }));
      }
      self.get_owner(change.owner_id).await?;
    }
    if let Some(amount) = &request.amount {
      amount.validate()?;
    }

    let state = self.unit_state(unit.unit_id).await?;
    let transfer = lift(
      self
        .store
        .insert_transfer(
          NewTransfer {
            unit_id:       request.unit_id,
            transfer_type: request.transfer_type,
            transfer_date: request.transfer_date,
            changes:       request.changes,
            amount:        request.amount,
            legal_reason:  request.legal_reason,
            base_version:  state.version,
          },
          who,
        )
        .await,
    )?;

    info!(
      transfer_id = %transfer.transfer_id,
      unit_id = %transfer.unit_id,
      transfer_type = %transfer.transfer_type,
      base_version = transfer.base_version,
      "transfer initiated"
    );
    Ok(transfer)
  }

  pub async fn attach_document(
    &self,
    transfer_id: Uuid,
    document: NewDocument,
    who: &Provenance,
  ) -> Result<TransferDocument> {
    let transfer = self.load_transfer(transfer_id).await?;
    if transfer.status.transition(Transition::AttachDocument).is_none() {
      return Err(Error::InvalidTransferState {
        transfer_id,
        status: transfer.status,
      });
    }
    require_text("file_path", &document.file_path)?;
    require_text("document_name", &document.document_name)?;

    let document = lift(
      self
        .store
        .attach_document(transfer_id, transfer.status, document, who)
        .await,
    )?;
    debug!(%transfer_id, document_id = %document.document_id, "document attached");
    Ok(document)
  }

  /// Validate the transfer's proposed end-state and, if it holds, apply it.
  ///
  /// On a validator failure the transfer is left `Rejected` with the
  /// violation recorded and the violation is returned. If another transfer
  /// committed against the unit since this one was proposed, nothing is
  /// written and [`Error::ConcurrentModification`] is returned. A transfer
  /// that would change no stake, or whose unit has been retired, is refused
  /// and stays pending.
  pub async fn finalize_transfer(
    &self,
    transfer_id: Uuid,
    who: &Provenance,
  ) -> Result<Transfer> {
    let transfer = self.load_transfer(transfer_id).await?;
    let Some(validated) = transfer.status.transition(Transition::Validate) else {
      return Err(Error::InvalidTransferState {
        transfer_id,
        status: transfer.status,
      });
    };

    let state = self.unit_state(transfer.unit_id).await?;
    if state.unit.is_retired() {
      return Err(Error::UnitRetired(transfer.unit_id));
    }
    if state.version != transfer.base_version {
      warn!(
        %transfer_id,
        unit_id = %transfer.unit_id,
        base_version = transfer.base_version,
        version = state.version,
        "transfer proposed against a stale ownership version"
      );
      return Err(Error::ConcurrentModification { unit_id: transfer.unit_id });
    }

    let proposal =
      propose(&state.records, &transfer.changes, transfer.transfer_date);
    let recorded: Vec<_> =
      state.records.iter().map(OwnershipRecord::slice).collect();
    debug!(%transfer_id, status = %validated, closures = proposal.closures.len(), openings = proposal.openings.len(), "validating transfer");

    if let Err(violation) = validator::validate(
      &recorded,
      &proposal.slices,
      transfer.transfer_date,
      today(),
    ) {
      warn!(%transfer_id, %violation, "transfer rejected");
      lift(
        self
          .store
          .reject_transfer(
            transfer_id,
            transfer.status,
            state.version,
            violation.clone(),
            who,
          )
          .await,
      )?;
      return Err(Error::ValidationFailed(violation));
    }
    if proposal.is_noop() {
      return Err(Error::InvalidInput(format!(
        "transfer {transfer_id} leaves every stake unchanged"
      )));
    }

    let plan = Finalization {
      transfer_id,
      unit_id: transfer.unit_id,
      from_status: transfer.status,
      expected_version: state.version,
      transfer_date: transfer.transfer_date,
      closures: proposal.closures,
      openings: proposal.openings,
    };
    let committed = lift(self.store.commit_transfer(plan, who).await)
      .inspect_err(|e| {
        if matches!(e, Error::ConcurrentModification { .. }) {
          warn!(%transfer_id, "lost commit race for unit");
        }
      })?;

    info!(
      %transfer_id,
      unit_id = %committed.unit_id,
      version = state.version + 1,
      "transfer committed"
    );
    Ok(committed)
  }

  /// Cancel a transfer that has not been committed. Cancelling twice is an
  /// [`Error::InvalidTransferState`].
  pub async fn cancel_transfer(
    &self,
    transfer_id: Uuid,
    who: &Provenance,
  ) -> Result<Transfer> {
    let transfer = self.load_transfer(transfer_id).await?;
    if transfer.status.transition(Transition::Cancel).is_none() {
      return Err(Error::InvalidTransferState {
        transfer_id,
        status: transfer.status,
      });
    }
    let cancelled = lift(
      self
        .store
        .cancel_transfer(transfer_id, transfer.status, who)
        .await,
    )?;
    info!(%transfer_id, "transfer cancelled");
    Ok(cancelled)
  }

  /// Re-pin a pending transfer to the unit's latest ownership version, after
  /// it lost a race with another commit.
  pub async fn rebase_transfer(
    &self,
    transfer_id: Uuid,
    who: &Provenance,
  ) -> Result<Transfer> {
    let transfer = self.load_transfer(transfer_id).await?;
    if transfer.status.transition(Transition::Validate).is_none() {
      return Err(Error::InvalidTransferState {
        transfer_id,
        status: transfer.status,
      });
    }
    let state = self.unit_state(transfer.unit_id).await?;
    if state.version == transfer.base_version {
      return Ok(transfer);
    }
    let rebased = lift(
      self
        .store
        .rebase_transfer(transfer_id, transfer.status, state.version, who)
        .await,
    )?;
    info!(
      %transfer_id,
      from = transfer.base_version,
      to = state.version,
      "transfer rebased"
    );
    Ok(rebased)
  }

  pub async fn verify_document(
    &self,
    document_id: Uuid,
    status: VerificationStatus,
    who: &Provenance,
  ) -> Result<TransferDocument> {
    let document = lift(self.store.get_document(document_id).await)?
      .ok_or(Error::not_found(Entity::Document, document_id))?;
    let transfer = self.load_transfer(document.transfer_id).await?;
    if !transfer.status.accepts_verification() {
      return Err(Error::InvalidTransferState {
        transfer_id: transfer.transfer_id,
        status:      transfer.status,
      });
    }
    lift(self.store.set_document_status(document_id, status, who).await)
  }

  // ── Queries ─────────────────────────────────────────────────────────────

  pub async fn get_transfer(&self, transfer_id: Uuid) -> Result<TransferDetails> {
    let transfer = self.load_transfer(transfer_id).await?;
    let documents = lift(self.store.list_documents(transfer_id).await)?;
    Ok(TransferDetails { transfer, documents })
  }

  /// The owners holding a current stake in the unit.
  pub async fn current_owners(&self, unit_id: Uuid) -> Result<Vec<CurrentStake>> {
    let state = self.unit_state(unit_id).await?;
    let mut stakes = Vec::new();
    for record in state.current_records() {
      stakes.push(CurrentStake {
        owner:      self.get_owner(record.owner_id).await?,
        percentage: record.percentage,
        since:      record.start_date,
        record_id:  record.record_id,
      });
    }
    Ok(stakes)
  }

  /// Closed and current records of the unit ordered by start date.
  pub async fn history_of(&self, unit_id: Uuid) -> Result<Vec<OwnershipRecord>> {
    let mut records = self.unit_state(unit_id).await?.records;
    records.sort_by_key(|r| (r.start_date, r.created_at));
    Ok(records)
  }

  /// Transfers of the unit that are not yet committed, rejected or cancelled.
  pub async fn pending_transfers(&self, unit_id: Uuid) -> Result<Vec<Transfer>> {
    self.get_unit(unit_id).await?;
    let mut transfers = lift(self.store.list_transfers(unit_id).await)?;
    transfers.retain(|t| t.status.is_pending());
    Ok(transfers)
  }

  pub async fn owner_portfolio(
    &self,
    owner_id: Uuid,
    query: &PortfolioQuery,
  ) -> Result<Portfolio> {
    let owner = self.get_owner(owner_id).await?;
    let records = lift(self.store.owner_records(owner_id).await)?;

    let mut units = BTreeMap::new();
    let mut co_owners = BTreeMap::new();
    let unit_ids: HashSet<Uuid> = records.iter().map(|r| r.unit_id).collect();
    for unit_id in unit_ids {
      let state = self.unit_state(unit_id).await?;
      let holders: Vec<Uuid> =
        state.current_records().map(|r| r.owner_id).collect();
      co_owners.insert(unit_id, holders);
      units.insert(unit_id, state.unit);
    }

    Ok(portfolio::assemble(owner, records, &units, &co_owners, query))
  }

  pub async fn audit_trail(&self, query: AuditQuery) -> Result<Vec<AuditEntry>> {
    lift(self.store.audit_entries(query).await)
  }

  pub async fn verify_audit_chain(&self) -> Result<ChainReport> {
    let entries = lift(self.store.audit_entries(AuditQuery::default()).await)?;
    let report = verify_chain(&entries);
    if !report.is_intact() {
      warn!(violations = report.violations.len(), "audit chain is broken");
    }
    Ok(report)
  }

  // ── Helpers ─────────────────────────────────────────────────────────────

  async fn load_transfer(&self, transfer_id: Uuid) -> Result<Transfer> {
    lift(self.store.get_transfer(transfer_id).await)?
      .ok_or(Error::not_found(Entity::Transfer, transfer_id))
  }

  async fn unit_state(&self, unit_id: Uuid) -> Result<UnitState> {
    lift(self.store.unit_state(unit_id).await)?
      .ok_or(Error::not_found(Entity::Unit, unit_id))
  }
}
