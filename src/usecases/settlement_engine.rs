//! Settlement Engine Use Case - Pari-mutuel Proposal Lifecycle
//!
//! Orchestrates admission, betting, resolution and claiming over the
//! ledger. Each public operation is one atomic unit:
//!
//! 1. Take the proposal's lock, queueing behind any operation in flight
//! 2. Validate against the ledger, registry and a fresh adapter query
//! 3. Perform external effects (custody transfers, conversion)
//! 4. Write the ledger as the last step, then emit the event
//!
//! Failures before step 4 leave the ledger untouched; a bet whose
//! conversion fails after its funds were pulled is refunded.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

use crate::domain::error::{Result, VenueError};
use crate::domain::events::{ProposalView, VenueEvent};
use crate::domain::ledger::{Bet, Ledger, LedgerSnapshot, Proposal};
use crate::domain::payout::{Commissions, commissions, winner_payout};
use crate::domain::registry::{Registry, RegistrySnapshot};
use crate::domain::types::{
  AccountId, AdapterId, Amount, AssetId, BetSide, Bps, CanonicalOutcome, NativeProposalId,
  ProposalId, Timestamp,
};
use crate::ports::authority::{Authority, Role};
use crate::ports::clock::Clock;
use crate::ports::custody::AssetCustody;
use crate::ports::events::EventSink;
use crate::ports::outcome_adapter::OutcomeAdapter;

use super::exchange_client::ExchangeClient;
use super::locks::ProposalLocks;

/// Default betting cutoff before the voting deadline (24 hours).
pub const DEFAULT_BETTING_CUTOFF_SECS: u64 = 24 * 60 * 60;

/// Static engine parameters.
#[derive(Debug, Clone)]
pub struct EngineSettings {
  /// Receiver of the house commission.
  pub house_receiver: AccountId,
  /// Bets close this long before the voting deadline.
  pub betting_cutoff_secs: u64,
}

/// Outcome of a successful bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetReceipt {
  pub proposal_id: ProposalId,
  pub side: BetSide,
  /// Amount pulled from the bettor in `payer_asset`.
  pub amount_paid: Amount,
  pub payer_asset: AssetId,
  /// Amount added to the pool in the payout asset.
  pub amount_staked: Amount,
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
  pub proposal_id: ProposalId,
  pub outcome: CanonicalOutcome,
  pub commissions: Commissions,
}

/// Outcome of a successful claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
  pub proposal_id: ProposalId,
  pub amount: Amount,
  /// Full refund of a cancelled proposal.
  pub refund: bool,
}

/// The venue's settlement engine.
pub struct SettlementEngine {
  ledger: RwLock<Ledger>,
  registry: RwLock<Registry>,
  adapters: RwLock<HashMap<AdapterId, Arc<dyn OutcomeAdapter>>>,
  custody: Arc<dyn AssetCustody>,
  exchange: ExchangeClient,
  authority: Arc<dyn Authority>,
  clock: Arc<dyn Clock>,
  events: Arc<dyn EventSink>,
  locks: ProposalLocks,
  /// Serializes id allocation.
  admission: Mutex<()>,
  settings: EngineSettings,
}

impl SettlementEngine {
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    ledger: Ledger,
    registry: Registry,
    custody: Arc<dyn AssetCustody>,
    exchange: ExchangeClient,
    authority: Arc<dyn Authority>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
    settings: EngineSettings,
  ) -> Self {
    Self {
      ledger: RwLock::new(ledger),
      registry: RwLock::new(registry),
      adapters: RwLock::new(HashMap::new()),
      custody,
      exchange,
      authority,
      clock,
      events,
      locks: ProposalLocks::new(),
      admission: Mutex::new(()),
      settings,
    }
  }

  // ────────────────────────────────────────────
  // Administration
  // ────────────────────────────────────────────

  /// Make an adapter reachable and rebind the proposals it already owns.
  ///
  /// Used at startup for adapters whose DAO is in a restored registry.
  /// Returns the number of proposals rebound.
  #[instrument(skip(self, adapter), fields(adapter = %adapter.adapter_id()))]
  pub async fn install_adapter(&self, adapter: Arc<dyn OutcomeAdapter>) -> Result<usize> {
    let adapter_id = adapter.adapter_id();
    let owned: Vec<(ProposalId, NativeProposalId)> = self
      .ledger
      .read()
      .await
      .proposals()
      .iter()
      .filter(|p| p.adapter == adapter_id)
      .map(|p| (p.id, p.native_id))
      .collect();

    for (id, native_id) in &owned {
      adapter.map_proposal(*native_id, *id).await?;
    }
    self.adapters.write().await.insert(adapter_id, adapter);
    debug!(rebound = owned.len(), "Adapter installed");
    Ok(owned.len())
  }

  /// Admit a DAO: registry entry plus adapter installation.
  #[instrument(skip(self, adapter), fields(adapter = %adapter.adapter_id()))]
  pub async fn add_dao(
    &self,
    caller: AccountId,
    adapter: Arc<dyn OutcomeAdapter>,
    payout_asset: AssetId,
  ) -> Result<()> {
    let result = async {
      self.require_role(caller, Role::Admin).await?;
      self.registry.write().await.add_dao(
        adapter.adapter_id(),
        adapter.capabilities(),
        &adapter.dao_name(),
        payout_asset,
      )?;
      let name = adapter.dao_name();
      self.install_adapter(adapter).await?;
      info!(dao = %name, %payout_asset, "DAO supported");
      Ok::<_, VenueError>(())
    }
    .await;
    self.observe("add_dao", result).await
  }

  /// Stop admitting proposals for a DAO. Admitted proposals still settle.
  pub async fn disable_dao(&self, caller: AccountId, adapter: AdapterId) -> Result<()> {
    let result = async {
      self.require_role(caller, Role::Admin).await?;
      self.registry.write().await.disable_dao(adapter)?;
      info!(%adapter, "DAO disabled");
      Ok::<_, VenueError>(())
    }
    .await;
    self.observe("disable_dao", result).await
  }

  pub async fn add_payment_asset(&self, caller: AccountId, asset: AssetId) -> Result<()> {
    let result = async {
      self.require_role(caller, Role::Admin).await?;
      self.registry.write().await.add_asset(asset)?;
      info!(%asset, "Payment asset supported");
      Ok::<_, VenueError>(())
    }
    .await;
    self.observe("add_payment_asset", result).await
  }

  pub async fn disable_payment_asset(&self, caller: AccountId, asset: AssetId) -> Result<()> {
    let result = async {
      self.require_role(caller, Role::Admin).await?;
      self.registry.write().await.disable_asset(asset)?;
      info!(%asset, "Payment asset disabled");
      Ok::<_, VenueError>(())
    }
    .await;
    self.observe("disable_payment_asset", result).await
  }

  /// Set the house rake (bps, at most 1000). Applies to later resolutions.
  pub async fn set_house_rake(&self, caller: AccountId, bps: Bps) -> Result<()> {
    let result = async {
      self.require_role(caller, Role::Admin).await?;
      self.ledger.write().await.set_house_rake_bps(bps)?;
      info!(bps, "House rake updated");
      Ok::<_, VenueError>(())
    }
    .await;
    self.observe("set_house_rake", result).await
  }

  /// Set the resolver rate (bps, at most 1000). Applies to later resolutions.
  pub async fn set_resolver_rake(&self, caller: AccountId, bps: Bps) -> Result<()> {
    let result = async {
      self.require_role(caller, Role::Admin).await?;
      self.ledger.write().await.set_resolver_bps(bps)?;
      info!(bps, "Resolver rate updated");
      Ok::<_, VenueError>(())
    }
    .await;
    self.observe("set_resolver_rake", result).await
  }

  // ────────────────────────────────────────────
  // Lifecycle
  // ────────────────────────────────────────────

  /// Admit a live external proposal and return its internal id.
  ///
  /// # Errors
  /// `NotFound` if the DAO is unsupported or the native proposal is not
  /// accepting votes; `Validation` if it was already admitted.
  #[instrument(skip(self))]
  pub async fn admit_proposal(
    &self,
    caller: AccountId,
    adapter_id: AdapterId,
    native_id: NativeProposalId,
  ) -> Result<ProposalId> {
    let result = self.admit_inner(caller, adapter_id, native_id).await;
    self.observe("admit_proposal", result).await
  }

  async fn admit_inner(
    &self,
    caller: AccountId,
    adapter_id: AdapterId,
    native_id: NativeProposalId,
  ) -> Result<ProposalId> {
    self.require_role(caller, Role::Curator).await?;
    let _admission = self.admission.lock().await;

    let payout_asset = self.registry.read().await.dao(adapter_id)?.payout_asset;
    let adapter = self.adapter(adapter_id).await?;

    let (id, existing) = {
      let ledger = self.ledger.read().await;
      let existing = ledger
        .proposals()
        .iter()
        .find(|p| p.adapter == adapter_id && p.native_id == native_id)
        .map(|p| p.id);
      (ledger.next_id(), existing)
    };
    if let Some(existing) = existing {
      return Err(VenueError::Validation(format!(
        "native proposal {native_id} already admitted as {existing}"
      )));
    }

    if !adapter.external_active_exists(native_id).await? {
      return Err(VenueError::NotFound(format!(
        "native proposal {native_id} is not active on {}",
        adapter.dao_name()
      )));
    }

    adapter.map_proposal(native_id, id).await?;

    let now = self.clock.now();
    self
      .ledger
      .write()
      .await
      .insert_proposal(Proposal::new(id, now, adapter_id, native_id, payout_asset))?;

    info!(proposal_id = id, dao = %adapter.dao_name(), "Proposal admitted");
    self.publish(VenueEvent::ProposalAdded { id, timestamp: now }).await;
    Ok(id)
  }

  /// Stake `amount` of `payer_asset` on one side of a proposal.
  ///
  /// A payment asset other than the proposal's payout asset is converted
  /// first; the converted amount is what enters the pool.
  ///
  /// # Errors
  /// `Validation` for a zero amount or unsupported asset; `State` if the
  /// proposal is decided or the betting window has closed; `Liquidity`
  /// if conversion fails (the payment is refunded).
  #[instrument(skip(self))]
  pub async fn place_bet(
    &self,
    user: AccountId,
    payer_asset: AssetId,
    proposal_id: ProposalId,
    side: BetSide,
    amount: Amount,
  ) -> Result<BetReceipt> {
    let result = self
      .locks
      .serialize(
        proposal_id,
        self.place_bet_inner(user, payer_asset, proposal_id, side, amount),
      )
      .await;
    self.observe("place_bet", result).await
  }

  async fn place_bet_inner(
    &self,
    user: AccountId,
    payer_asset: AssetId,
    proposal_id: ProposalId,
    side: BetSide,
    amount: Amount,
  ) -> Result<BetReceipt> {
    if amount == 0 {
      return Err(VenueError::Validation("bet amount must be positive".into()));
    }
    if !self.registry.read().await.is_asset_supported(payer_asset) {
      return Err(VenueError::Validation(format!(
        "payment asset {payer_asset} is not supported"
      )));
    }

    let proposal = self.ledger.read().await.proposal(proposal_id)?.clone();
    if proposal.is_resolved() {
      return Err(VenueError::State(format!(
        "proposal {proposal_id} is already resolved"
      )));
    }

    let adapter = self.registered_adapter(&proposal).await?;
    let live = adapter.outcome_of(proposal_id).await?;
    if live.is_final() {
      return Err(VenueError::State(format!(
        "proposal {proposal_id} already decided externally ({live})"
      )));
    }

    let deadline = adapter.deadline_of(proposal_id).await?;
    let cutoff = betting_cutoff(deadline, self.settings.betting_cutoff_secs);
    let now = self.clock.now();
    if now >= cutoff {
      return Err(VenueError::State(format!(
        "betting on proposal {proposal_id} closed at {cutoff} (now {now})"
      )));
    }

    let holder = self.custody.holder();
    self
      .custody
      .transfer_from(payer_asset, user, holder, amount)
      .await
      .map_err(|e| VenueError::Custody(format!("payment pull failed: {e:#}")))?;

    let staked = if payer_asset == proposal.payout_asset {
      amount
    } else {
      match self
        .exchange
        .convert(payer_asset, proposal.payout_asset, amount)
        .await
      {
        Ok(conversion) => conversion.amount_out,
        Err(e) => {
          self.refund_payment(payer_asset, user, amount).await?;
          return Err(e);
        }
      }
    };

    self
      .ledger
      .write()
      .await
      .record_bet(proposal_id, user, side, staked)?;

    info!(proposal_id, staked = %staked, "Bet placed");
    self
      .publish(VenueEvent::BetPlaced {
        proposal_id,
        user,
        side,
        amount: staked,
        timestamp: now,
      })
      .await;

    Ok(BetReceipt {
      proposal_id,
      side,
      amount_paid: amount,
      payer_asset,
      amount_staked: staked,
    })
  }

  /// Return a pulled payment after a failed conversion.
  async fn refund_payment(&self, asset: AssetId, user: AccountId, amount: Amount) -> Result<()> {
    self
      .custody
      .transfer(asset, user, amount)
      .await
      .map_err(|e| {
        error!(%asset, %user, amount = %amount, error = %e, "Refund after failed conversion failed");
        VenueError::Consistency(format!(
          "payment of {amount} {asset} held without a recorded bet: {e:#}"
        ))
      })
  }

  /// Freeze a proposal's outcome after its voting deadline.
  ///
  /// The caller is the resolver and receives the resolver commission.
  ///
  /// # Errors
  /// `State` if already resolved, before the deadline, or while the
  /// governor still reports the vote as open; `OracleMapping` if the
  /// governor's state has no canonical meaning.
  #[instrument(skip(self))]
  pub async fn resolve_proposal(&self, resolver: AccountId, proposal_id: ProposalId) -> Result<Resolution> {
    let result = self
      .locks
      .serialize(proposal_id, self.resolve_inner(resolver, proposal_id))
      .await;
    self.observe("resolve_proposal", result).await
  }

  async fn resolve_inner(&self, resolver: AccountId, proposal_id: ProposalId) -> Result<Resolution> {
    let proposal = self.ledger.read().await.proposal(proposal_id)?.clone();
    if proposal.is_resolved() {
      return Err(VenueError::State(format!(
        "proposal {proposal_id} is already resolved"
      )));
    }

    let adapter = self.registered_adapter(&proposal).await?;
    let deadline = adapter.deadline_of(proposal_id).await?;
    let now = self.clock.now();
    if now < deadline {
      return Err(VenueError::State(format!(
        "proposal {proposal_id} voting ends at {deadline} (now {now})"
      )));
    }

    let outcome = adapter.outcome_of(proposal_id).await?;
    let paid = match outcome {
      CanonicalOutcome::Unresolved => {
        return Err(VenueError::State(format!(
          "governor has not settled proposal {proposal_id} yet"
        )));
      }
      CanonicalOutcome::Cancelled => Commissions::default(),
      CanonicalOutcome::Succeeded | CanonicalOutcome::Defeated => {
        self.pay_commissions(&proposal, outcome, resolver).await?
      }
    };

    self
      .ledger
      .write()
      .await
      .resolve(proposal_id, outcome, paid, now)?;

    info!(
      proposal_id,
      outcome = %outcome,
      resolver_payout = %paid.resolver,
      house_payout = %paid.house,
      "Proposal resolved"
    );
    if outcome == CanonicalOutcome::Cancelled {
      self
        .publish(VenueEvent::NoPayout { id: proposal_id, resolver, timestamp: now })
        .await;
    } else {
      self
        .publish(VenueEvent::ProposalResolved { id: proposal_id, resolver, timestamp: now })
        .await;
      self.events.commissions_settled(proposal_id, &paid).await;
    }

    Ok(Resolution { proposal_id, outcome, commissions: paid })
  }

  /// Compute and pay both commissions in one atomic batch.
  async fn pay_commissions(
    &self,
    proposal: &Proposal,
    outcome: CanonicalOutcome,
    resolver: AccountId,
  ) -> Result<Commissions> {
    let side = outcome.winning_side().ok_or_else(|| {
      VenueError::Consistency(format!("{outcome} has no winning side"))
    })?;
    let (resolver_bps, house_bps) = {
      let ledger = self.ledger.read().await;
      (ledger.resolver_bps(), ledger.house_rake_bps())
    };
    let owed = commissions(
      proposal.pool(side),
      proposal.pool(side.opposite()),
      resolver_bps,
      house_bps,
    )?;

    let legs: Vec<(AccountId, Amount)> = [
      (resolver, owed.resolver),
      (self.settings.house_receiver, owed.house),
    ]
    .into_iter()
    .filter(|(_, amount)| *amount > 0)
    .collect();
    if legs.is_empty() {
      return Ok(owed);
    }

    self.ensure_custody_covers(proposal.payout_asset, owed.total()?).await?;
    self
      .custody
      .transfer_batch(proposal.payout_asset, &legs)
      .await
      .map_err(|e| VenueError::Custody(format!("commission transfer failed: {e:#}")))?;
    Ok(owed)
  }

  /// Pay out the caller's winnings, or refund a cancelled proposal.
  ///
  /// # Errors
  /// `State` if unresolved, if the caller has no stake, or if the caller
  /// only backed the losing side; `Consistency` if the ledger or custody
  /// cannot back the payout.
  #[instrument(skip(self))]
  pub async fn collect_winnings(&self, user: AccountId, proposal_id: ProposalId) -> Result<Claim> {
    let result = self
      .locks
      .serialize(proposal_id, self.collect_inner(user, proposal_id))
      .await;
    self.observe("collect_winnings", result).await
  }

  async fn collect_inner(&self, user: AccountId, proposal_id: ProposalId) -> Result<Claim> {
    let (proposal, bet) = {
      let ledger = self.ledger.read().await;
      (ledger.proposal(proposal_id)?.clone(), ledger.bet(proposal_id, user))
    };
    if !proposal.is_resolved() {
      return Err(VenueError::State(format!(
        "proposal {proposal_id} is not resolved"
      )));
    }
    if !bet.has_stake() {
      return Err(VenueError::State(format!(
        "no stake to claim on proposal {proposal_id}"
      )));
    }

    let (amount, refund) = match proposal.outcome.winning_side() {
      None => (bet.total()?, true),
      Some(side) => {
        let user_winning = bet.stake(side);
        if user_winning == 0 {
          return Err(VenueError::State(format!(
            "no winning bet on proposal {proposal_id}"
          )));
        }
        let paid = Commissions {
          resolver: proposal.resolver_payout,
          house: proposal.house_payout,
        };
        let amount = winner_payout(
          user_winning,
          proposal.pool(side),
          proposal.pool(side.opposite()),
          &paid,
        )?;
        (amount, false)
      }
    };

    self.ensure_custody_covers(proposal.payout_asset, amount).await?;
    self
      .custody
      .transfer(proposal.payout_asset, user, amount)
      .await
      .map_err(|e| VenueError::Custody(format!("payout transfer failed: {e:#}")))?;

    let now = self.clock.now();
    self.ledger.write().await.claim(proposal_id, user, now)?;

    info!(proposal_id, amount = %amount, refund, "Claim paid");
    let event = if refund {
      VenueEvent::BetReturned { proposal_id, user, amount }
    } else {
      VenueEvent::WinningsCollected { proposal_id, user, amount }
    };
    self.publish(event).await;

    Ok(Claim { proposal_id, amount, refund })
  }

  // ────────────────────────────────────────────
  // Reads
  // ────────────────────────────────────────────

  pub async fn get_proposal(&self, proposal_id: ProposalId) -> Result<ProposalView> {
    let proposal = self.ledger.read().await.proposal(proposal_id)?.clone();
    Ok(ProposalView::from(proposal))
  }

  pub async fn get_user_bet(&self, proposal_id: ProposalId, user: AccountId) -> Result<Bet> {
    let ledger = self.ledger.read().await;
    ledger.proposal(proposal_id)?;
    Ok(ledger.bet(proposal_id, user))
  }

  pub async fn list_proposals(&self) -> Vec<ProposalView> {
    self
      .ledger
      .read()
      .await
      .proposals()
      .iter()
      .cloned()
      .map(ProposalView::from)
      .collect()
  }

  /// Current `(house_rake_bps, resolver_bps)`.
  pub async fn rates(&self) -> (Bps, Bps) {
    let ledger = self.ledger.read().await;
    (ledger.house_rake_bps(), ledger.resolver_bps())
  }

  pub async fn is_dao_supported(&self, adapter: AdapterId) -> bool {
    self.registry.read().await.is_dao_supported(adapter)
  }

  pub async fn is_asset_supported(&self, asset: AssetId) -> bool {
    self.registry.read().await.is_asset_supported(asset)
  }

  /// Unresolved proposals whose voting deadline has passed.
  ///
  /// Proposals whose deadline cannot be read are skipped and logged.
  pub async fn pending_resolution(&self) -> Vec<ProposalId> {
    let candidates: Vec<(ProposalId, AdapterId)> = self
      .ledger
      .read()
      .await
      .proposals()
      .iter()
      .filter(|p| !p.is_resolved())
      .map(|p| (p.id, p.adapter))
      .collect();
    let now = self.clock.now();

    let mut due = Vec::new();
    for (id, adapter_id) in candidates {
      let deadline = match self.adapter(adapter_id).await {
        Ok(adapter) => adapter.deadline_of(id).await,
        Err(e) => Err(e),
      };
      match deadline {
        Ok(deadline) if now >= deadline => due.push(id),
        Ok(_) => {}
        Err(e) => warn!(proposal_id = id, error = %e, "Deadline unavailable"),
      }
    }
    due
  }

  /// Number of admitted proposals not yet resolved.
  pub async fn unresolved_count(&self) -> usize {
    self.ledger.read().await.unresolved_ids().len()
  }

  /// Consistent copies of ledger and registry for persistence.
  pub async fn snapshot(&self) -> (LedgerSnapshot, RegistrySnapshot) {
    let ledger = self.ledger.read().await;
    let registry = self.registry.read().await;
    (ledger.snapshot(), registry.snapshot())
  }

  // ────────────────────────────────────────────
  // Helpers
  // ────────────────────────────────────────────

  async fn require_role(&self, caller: AccountId, role: Role) -> Result<()> {
    if self.authority.has_role(caller, role).await {
      Ok(())
    } else {
      Err(VenueError::Unauthorized(format!("{caller} lacks the {role:?} role")))
    }
  }

  async fn adapter(&self, adapter_id: AdapterId) -> Result<Arc<dyn OutcomeAdapter>> {
    self
      .adapters
      .read()
      .await
      .get(&adapter_id)
      .cloned()
      .ok_or_else(|| VenueError::NotFound(format!("no adapter installed for {adapter_id}")))
  }

  async fn registered_adapter(&self, proposal: &Proposal) -> Result<Arc<dyn OutcomeAdapter>> {
    let adapter = self.adapter(proposal.adapter).await?;
    if !adapter.is_registered(proposal.id).await {
      return Err(VenueError::NotFound(format!(
        "proposal {} is not registered with {}",
        proposal.id,
        adapter.dao_name()
      )));
    }
    Ok(adapter)
  }

  async fn ensure_custody_covers(&self, asset: AssetId, amount: Amount) -> Result<()> {
    let balance = self
      .custody
      .balance_of(asset, self.custody.holder())
      .await
      .map_err(|e| VenueError::Custody(format!("balance query failed: {e:#}")))?;
    if balance < amount {
      return Err(VenueError::Consistency(format!(
        "custody holds {balance} of {asset}, owes {amount}"
      )));
    }
    Ok(())
  }

  async fn publish(&self, event: VenueEvent) {
    if let Err(e) = self.events.emit(&event).await {
      warn!(event = event.name(), error = %e, "Event emission failed");
    }
  }

  async fn observe<T>(&self, operation: &'static str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
      if e.is_fatal() {
        error!(operation, class = e.class(), error = %e, "Fatal venue error");
      } else {
        debug!(operation, class = e.class(), error = %e, "Operation rejected");
      }
      self.events.operation_failed(operation, e).await;
    }
    result
  }
}

/// Deadline after which bets on a proposal are refused.
pub fn betting_cutoff(deadline: Timestamp, cutoff_secs: u64) -> Timestamp {
  deadline.saturating_sub(cutoff_secs)
}
