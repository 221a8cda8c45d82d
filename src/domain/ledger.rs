//! Proposal and bet ledger.
//!
//! Proposals live in an arena indexed by id; bets live in a composite-key
//! index `(proposal, user) -> Bet`. The ledger only accepts mutations that
//! keep each pool equal to the sum of the stakes backing it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::error::{Result, VenueError};
use super::payout::{Commissions, MAX_RATE_BPS, validate_rate};
use super::types::{
    AccountId, AdapterId, Amount, AssetId, BetSide, Bps, CanonicalOutcome, NativeProposalId, ProposalId,
    Timestamp,
};

/// Durable state of one admitted proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub created_at: Timestamp,
    /// Adapter that reports this proposal's outcome.
    pub adapter: AdapterId,
    /// The governor's own id, bound in the adapter at admission.
    pub native_id: NativeProposalId,
    /// Asset stakes are held and paid out in.
    pub payout_asset: AssetId,
    pub succeed_total: Amount,
    pub defeat_total: Amount,
    /// Written once at resolution.
    pub resolver_payout: Amount,
    /// Written once at resolution.
    pub house_payout: Amount,
    pub resolved_at: Option<Timestamp>,
    pub outcome: CanonicalOutcome,
}

impl Proposal {
    /// A freshly admitted, unresolved proposal with empty pools.
    pub fn new(
        id: ProposalId,
        created_at: Timestamp,
        adapter: AdapterId,
        native_id: NativeProposalId,
        payout_asset: AssetId,
    ) -> Self {
        Self {
            id,
            created_at,
            adapter,
            native_id,
            payout_asset,
            succeed_total: 0,
            defeat_total: 0,
            resolver_payout: 0,
            house_payout: 0,
            resolved_at: None,
            outcome: CanonicalOutcome::Unresolved,
        }
    }

    /// Pool backing one side.
    pub fn pool(&self, side: BetSide) -> Amount {
        match side {
            BetSide::Succeed => self.succeed_total,
            BetSide::Defeat => self.defeat_total,
        }
    }

    fn pool_mut(&mut self, side: BetSide) -> &mut Amount {
        match side {
            BetSide::Succeed => &mut self.succeed_total,
            BetSide::Defeat => &mut self.defeat_total,
        }
    }

    /// Whether the single resolution transition has happened.
    pub fn is_resolved(&self) -> bool {
        self.outcome.is_final()
    }
}

/// One user's stakes on one proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bet {
    pub succeed_stake: Amount,
    pub defeat_stake: Amount,
    pub claimed_at: Option<Timestamp>,
}

impl Bet {
    /// Stake on one side.
    pub fn stake(&self, side: BetSide) -> Amount {
        match side {
            BetSide::Succeed => self.succeed_stake,
            BetSide::Defeat => self.defeat_stake,
        }
    }

    fn stake_mut(&mut self, side: BetSide) -> &mut Amount {
        match side {
            BetSide::Succeed => &mut self.succeed_stake,
            BetSide::Defeat => &mut self.defeat_stake,
        }
    }

    /// Combined stake across both sides.
    pub fn total(&self) -> Result<Amount> {
        self.succeed_stake
            .checked_add(self.defeat_stake)
            .ok_or_else(|| VenueError::Consistency("bet total overflow".into()))
    }

    /// Whether any stake remains.
    pub fn has_stake(&self) -> bool {
        self.succeed_stake > 0 || self.defeat_stake > 0
    }
}

/// Bet entry keyed for snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetRecord {
    pub proposal_id: ProposalId,
    pub user: AccountId,
    pub bet: Bet,
}

/// Arena of proposals plus the composite-key bet index.
#[derive(Debug, Clone)]
pub struct Ledger {
    proposals: Vec<Proposal>,
    bets: HashMap<(ProposalId, AccountId), Bet>,
    house_rake_bps: Bps,
    resolver_bps: Bps,
}

impl Ledger {
    /// An empty ledger with the given commission rates.
    pub fn new(house_rake_bps: Bps, resolver_bps: Bps) -> Result<Self> {
        validate_rate("house rake", house_rake_bps)?;
        validate_rate("resolver rate", resolver_bps)?;
        Ok(Self {
            proposals: Vec::new(),
            bets: HashMap::new(),
            house_rake_bps,
            resolver_bps,
        })
    }

    /// Id the next admitted proposal will receive.
    pub fn next_id(&self) -> ProposalId {
        self.proposals.len() as ProposalId + 1
    }

    pub fn house_rake_bps(&self) -> Bps {
        self.house_rake_bps
    }

    pub fn resolver_bps(&self) -> Bps {
        self.resolver_bps
    }

    pub fn set_house_rake_bps(&mut self, bps: Bps) -> Result<()> {
        validate_rate("house rake", bps)?;
        self.house_rake_bps = bps;
        Ok(())
    }

    pub fn set_resolver_bps(&mut self, bps: Bps) -> Result<()> {
        validate_rate("resolver rate", bps)?;
        self.resolver_bps = bps;
        Ok(())
    }

    /// Append a newly admitted proposal; its id must be [`Self::next_id`].
    pub fn insert_proposal(&mut self, proposal: Proposal) -> Result<ProposalId> {
        if proposal.id != self.next_id() {
            return Err(VenueError::Consistency(format!(
                "proposal id {} allocated out of order (expected {})",
                proposal.id,
                self.next_id()
            )));
        }
        let id = proposal.id;
        self.proposals.push(proposal);
        Ok(id)
    }

    /// Look up a proposal.
    pub fn proposal(&self, id: ProposalId) -> Result<&Proposal> {
        id.checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| self.proposals.get(i))
            .ok_or_else(|| VenueError::NotFound(format!("proposal {id}")))
    }

    fn proposal_mut(&mut self, id: ProposalId) -> Result<&mut Proposal> {
        id.checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| self.proposals.get_mut(i))
            .ok_or_else(|| VenueError::NotFound(format!("proposal {id}")))
    }

    /// All proposals in id order.
    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    /// A user's bet; an absent entry reads as empty.
    pub fn bet(&self, id: ProposalId, user: AccountId) -> Bet {
        self.bets.get(&(id, user)).copied().unwrap_or_default()
    }

    /// Add `amount` to one side's pool and to the user's stake on that side.
    pub fn record_bet(&mut self, id: ProposalId, user: AccountId, side: BetSide, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Err(VenueError::Validation("bet amount must be positive".into()));
        }
        let proposal = self.proposal(id)?;
        if proposal.is_resolved() {
            return Err(VenueError::State(format!("proposal {id} is already resolved")));
        }

        // Compute both sums before touching either.
        let new_pool = proposal
            .pool(side)
            .checked_add(amount)
            .ok_or_else(|| VenueError::Consistency("pool overflow".into()))?;
        let bet = self.bet(id, user);
        let new_stake = bet
            .stake(side)
            .checked_add(amount)
            .ok_or_else(|| VenueError::Consistency("stake overflow".into()))?;

        *self.proposal_mut(id)?.pool_mut(side) = new_pool;
        let entry = self.bets.entry((id, user)).or_default();
        *entry.stake_mut(side) = new_stake;
        Ok(())
    }

    /// The single resolution transition.
    pub fn resolve(
        &mut self,
        id: ProposalId,
        outcome: CanonicalOutcome,
        commissions: Commissions,
        now: Timestamp,
    ) -> Result<()> {
        if !outcome.is_final() {
            return Err(VenueError::State(format!(
                "proposal {id} cannot resolve to {outcome}"
            )));
        }
        let proposal = self.proposal_mut(id)?;
        if proposal.is_resolved() {
            return Err(VenueError::State(format!("proposal {id} is already resolved")));
        }
        proposal.outcome = outcome;
        proposal.resolver_payout = commissions.resolver;
        proposal.house_payout = commissions.house;
        proposal.resolved_at = Some(now);
        Ok(())
    }

    /// Zero a user's stakes and stamp the claim; returns the pre-claim bet.
    pub fn claim(&mut self, id: ProposalId, user: AccountId, now: Timestamp) -> Result<Bet> {
        if !self.proposal(id)?.is_resolved() {
            return Err(VenueError::State(format!("proposal {id} is not resolved")));
        }
        let entry = self
            .bets
            .get_mut(&(id, user))
            .filter(|b| b.has_stake())
            .ok_or_else(|| VenueError::State(format!("no stake to claim on proposal {id}")))?;
        let before = *entry;
        entry.succeed_stake = 0;
        entry.defeat_stake = 0;
        entry.claimed_at = Some(now);
        Ok(before)
    }

    /// Unresolved proposal ids in admission order.
    pub fn unresolved_ids(&self) -> Vec<ProposalId> {
        self.proposals
            .iter()
            .filter(|p| !p.is_resolved())
            .map(|p| p.id)
            .collect()
    }

    /// Check `pool == Σ stakes` for both sides of a proposal.
    ///
    /// Claimed bets are zeroed, so the check only holds strictly before the
    /// first claim; after that the pools exceed the live stakes.
    pub fn verify_pools(&self, id: ProposalId) -> Result<()> {
        let proposal = self.proposal(id)?;
        let mut succeed: Amount = 0;
        let mut defeat: Amount = 0;
        let mut any_claimed = false;
        for ((pid, _), bet) in &self.bets {
            if *pid != id {
                continue;
            }
            any_claimed |= bet.claimed_at.is_some();
            succeed = succeed
                .checked_add(bet.succeed_stake)
                .ok_or_else(|| VenueError::Consistency("stake sum overflow".into()))?;
            defeat = defeat
                .checked_add(bet.defeat_stake)
                .ok_or_else(|| VenueError::Consistency("stake sum overflow".into()))?;
        }
        let consistent = if any_claimed {
            succeed <= proposal.succeed_total && defeat <= proposal.defeat_total
        } else {
            succeed == proposal.succeed_total && defeat == proposal.defeat_total
        };
        if !consistent {
            return Err(VenueError::Consistency(format!(
                "proposal {id} pools ({}/{}) disagree with stakes ({succeed}/{defeat})",
                proposal.succeed_total, proposal.defeat_total
            )));
        }
        Ok(())
    }

    /// Export the ledger as a current-schema snapshot.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let mut bets: Vec<BetRecord> = self
            .bets
            .iter()
            .map(|((proposal_id, user), bet)| BetRecord {
                proposal_id: *proposal_id,
                user: *user,
                bet: *bet,
            })
            .collect();
        bets.sort_by(|a, b| (a.proposal_id, a.user).cmp(&(b.proposal_id, b.user)));

        LedgerSnapshot {
            schema_version: SCHEMA_VERSION,
            next_proposal_id: self.next_id(),
            house_rake_bps: self.house_rake_bps,
            resolver_bps: self.resolver_bps,
            proposals: self.proposals.clone(),
            bets,
        }
    }

    /// Rebuild a ledger from a snapshot, re-checking every invariant.
    pub fn restore(snapshot: LedgerSnapshot) -> Result<Self> {
        if snapshot.schema_version != SCHEMA_VERSION {
            return Err(VenueError::Validation(format!(
                "snapshot schema v{} must be migrated to v{SCHEMA_VERSION} first",
                snapshot.schema_version
            )));
        }
        let mut ledger = Self::new(snapshot.house_rake_bps, snapshot.resolver_bps)?;
        for proposal in snapshot.proposals {
            ledger.insert_proposal(proposal)?;
        }
        if ledger.next_id() != snapshot.next_proposal_id {
            return Err(VenueError::Consistency(format!(
                "snapshot next id {} disagrees with {} stored proposals",
                snapshot.next_proposal_id,
                ledger.proposals.len()
            )));
        }
        for record in snapshot.bets {
            ledger.proposal(record.proposal_id)?;
            if ledger.bets.insert((record.proposal_id, record.user), record.bet).is_some() {
                return Err(VenueError::Consistency(format!(
                    "duplicate bet for {} on proposal {}",
                    record.user, record.proposal_id
                )));
            }
        }
        for id in 1..ledger.next_id() {
            ledger.verify_pools(id)?;
        }
        Ok(ledger)
    }
}

// ────────────────────────────────────────────
// Versioned snapshot schema
// ────────────────────────────────────────────

/// Current snapshot schema version.
pub const SCHEMA_VERSION: u32 = 2;

/// Serializable ledger state (schema v2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub schema_version: u32,
    pub next_proposal_id: ProposalId,
    pub house_rake_bps: Bps,
    pub resolver_bps: Bps,
    pub proposals: Vec<Proposal>,
    pub bets: Vec<BetRecord>,
}

#[derive(Deserialize)]
struct SchemaProbe {
    schema_version: Option<u32>,
}

/// Schema v1: no claim stamps, rates held outside the ledger.
#[derive(Debug, Clone, Deserialize)]
struct LedgerSnapshotV1 {
    next_proposal_id: ProposalId,
    proposals: Vec<Proposal>,
    bets: Vec<BetRecordV1>,
}

#[derive(Debug, Clone, Deserialize)]
struct BetRecordV1 {
    proposal_id: ProposalId,
    user: AccountId,
    succeed_stake: Amount,
    defeat_stake: Amount,
}

impl LedgerSnapshot {
    /// Parse any known schema version and upgrade it to the current one.
    ///
    /// v1 snapshots carry no rates; `default_rates` supplies them.
    pub fn migrate(raw: &str, default_rates: (Bps, Bps)) -> Result<Self> {
        let probe: SchemaProbe = serde_json::from_str(raw)
            .map_err(|e| VenueError::Validation(format!("malformed snapshot: {e}")))?;

        match probe.schema_version.unwrap_or(1) {
            1 => {
                let v1: LedgerSnapshotV1 = serde_json::from_str(raw)
                    .map_err(|e| VenueError::Validation(format!("malformed v1 snapshot: {e}")))?;
                let (house_rake_bps, resolver_bps) = default_rates;
                if house_rake_bps > MAX_RATE_BPS || resolver_bps > MAX_RATE_BPS {
                    return Err(VenueError::Validation("default rates exceed cap".into()));
                }
                // A v1 bet that was claimed had its stakes zeroed but no
                // stamp; use the proposal's resolution time as the best bound.
                let resolved_at: HashMap<ProposalId, Option<Timestamp>> =
                    v1.proposals.iter().map(|p| (p.id, p.resolved_at)).collect();
                let bets = v1
                    .bets
                    .into_iter()
                    .map(|b| {
                        let claimed_at = if b.succeed_stake == 0 && b.defeat_stake == 0 {
                            resolved_at.get(&b.proposal_id).copied().flatten()
                        } else {
                            None
                        };
                        BetRecord {
                            proposal_id: b.proposal_id,
                            user: b.user,
                            bet: Bet {
                                succeed_stake: b.succeed_stake,
                                defeat_stake: b.defeat_stake,
                                claimed_at,
                            },
                        }
                    })
                    .collect();
                Ok(Self {
                    schema_version: SCHEMA_VERSION,
                    next_proposal_id: v1.next_proposal_id,
                    house_rake_bps,
                    resolver_bps,
                    proposals: v1.proposals,
                    bets,
                })
            }
            2 => serde_json::from_str(raw)
                .map_err(|e| VenueError::Validation(format!("malformed v2 snapshot: {e}"))),
            other => Err(VenueError::Validation(format!(
                "unsupported snapshot schema v{other}"
            ))),
        }
    }
}
