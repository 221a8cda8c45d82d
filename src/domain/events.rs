//! Venue events and read models.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};

use super::ledger::Proposal;
use super::types::{AccountId, Amount, BetSide, ProposalId, Timestamp};

/// Events emitted after each committed state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueEvent {
    ProposalAdded {
        id: ProposalId,
        timestamp: Timestamp,
    },
    ProposalResolved {
        id: ProposalId,
        resolver: AccountId,
        timestamp: Timestamp,
    },
    NoPayout {
        id: ProposalId,
        resolver: AccountId,
        timestamp: Timestamp,
    },
    BetPlaced {
        proposal_id: ProposalId,
        user: AccountId,
        side: BetSide,
        amount: Amount,
        timestamp: Timestamp,
    },
    WinningsCollected {
        proposal_id: ProposalId,
        user: AccountId,
        amount: Amount,
    },
    BetReturned {
        proposal_id: ProposalId,
        user: AccountId,
        amount: Amount,
    },
}

impl VenueEvent {
    /// Stable name used for metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProposalAdded { .. } => "proposal_added",
            Self::ProposalResolved { .. } => "proposal_resolved",
            Self::NoPayout { .. } => "no_payout",
            Self::BetPlaced { .. } => "bet_placed",
            Self::WinningsCollected { .. } => "winnings_collected",
            Self::BetReturned { .. } => "bet_returned",
        }
    }
}

/// Read model of a proposal with implied pari-mutuel odds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProposalView {
    #[serde(flatten)]
    pub proposal: Proposal,
    /// Gross payout multiplier for the succeed side, before commissions.
    pub succeed_odds: Option<Decimal>,
    /// Gross payout multiplier for the defeat side, before commissions.
    pub defeat_odds: Option<Decimal>,
}

impl From<Proposal> for ProposalView {
    fn from(proposal: Proposal) -> Self {
        let succeed_odds = implied_odds(&proposal, BetSide::Succeed);
        let defeat_odds = implied_odds(&proposal, BetSide::Defeat);
        Self { proposal, succeed_odds, defeat_odds }
    }
}

/// (own + other) / own, or `None` while the side's pool is empty.
///
/// Display only; settlement uses integer arithmetic.
pub fn implied_odds(proposal: &Proposal, side: BetSide) -> Option<Decimal> {
    let own = Decimal::from_u128(proposal.pool(side))?;
    if own.is_zero() {
        return None;
    }
    let other = Decimal::from_u128(proposal.pool(side.opposite()))?;
    own.checked_add(other)?.checked_div(own).map(|d| d.round_dp(4))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};
    use rust_decimal_macros::dec;

    #[test]
    fn test_implied_odds() {
        let mut p = Proposal::new(1, 0, Address::repeat_byte(1), U256::from(1), Address::repeat_byte(2));
        assert_eq!(implied_odds(&p, BetSide::Succeed), None);

        p.succeed_total = 300;
        p.defeat_total = 100;
        let view = ProposalView::from(p);
        assert_eq!(view.succeed_odds, Some(dec!(1.3333)));
        assert_eq!(view.defeat_odds, Some(dec!(4)));
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = VenueEvent::ProposalAdded { id: 3, timestamp: 10 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["proposal_added"]["id"], 3);
        assert_eq!(event.name(), "proposal_added");
    }

    #[test]
    fn test_large_amounts_survive_json() {
        let event = VenueEvent::WinningsCollected {
            proposal_id: 1,
            user: Address::repeat_byte(4),
            amount: u128::MAX,
        };
        let line = serde_json::to_string(&event).unwrap();
        let back: VenueEvent = serde_json::from_str(&line).unwrap();
        assert_eq!(back, event);
    }
}
