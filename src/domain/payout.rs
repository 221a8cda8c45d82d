//! Pari-mutuel commission and payout arithmetic.
//!
//! All amounts are integer atomic units; every division floors. Products
//! are widened to 256 bits so 18-decimal assets cannot overflow, and any
//! result that cannot fit back into an [`Amount`] is a ledger
//! inconsistency.
//!
//! Flow at resolution, with `L` the losing pool and `W` the winning pool:
//! - resolver = floor(L × resolver_bps / 10 000)
//! - house    = L − resolver                              if W == 0
//! - house    = floor((L − resolver) × house_bps / 10 000) otherwise
//!
//! Each winner then claims `stake + floor(stake × net_losing / W)` where
//! `net_losing = L − resolver − house`.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use super::error::{Result, VenueError};
use super::types::{Amount, Bps};

/// Basis-point denominator.
pub const BPS_DENOMINATOR: u16 = 10_000;

/// Upper bound on the house rake and the resolver rate (10%).
pub const MAX_RATE_BPS: Bps = 1_000;

/// Commissions taken from the losing pool at resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Commissions {
    /// Paid to whoever triggered resolution.
    pub resolver: Amount,
    /// Paid to the house receiver.
    pub house: Amount,
}

impl Commissions {
    /// Sum of both commissions.
    pub fn total(&self) -> Result<Amount> {
        self.resolver
            .checked_add(self.house)
            .ok_or_else(|| overflow("commission total"))
    }
}

/// Reject a rate above [`MAX_RATE_BPS`].
pub fn validate_rate(name: &str, bps: Bps) -> Result<()> {
    if bps > MAX_RATE_BPS {
        return Err(VenueError::Validation(format!(
            "{name} of {bps} bps exceeds the {MAX_RATE_BPS} bps cap"
        )));
    }
    Ok(())
}

/// floor(a × b / c) with a 256-bit intermediate.
pub fn mul_div_floor(a: Amount, b: Amount, c: Amount) -> Result<Amount> {
    if c == 0 {
        return Err(VenueError::Consistency("division by zero in payout math".into()));
    }
    let product = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or_else(|| overflow("product"))?;
    narrow(product / U256::from(c))
}

/// Apply a basis-point rate to an amount, flooring.
pub fn apply_bps(amount: Amount, bps: Bps) -> Result<Amount> {
    mul_div_floor(amount, Amount::from(bps), Amount::from(BPS_DENOMINATOR))
}

/// Commissions owed when a proposal resolves with a winner.
pub fn commissions(
    winning_pool: Amount,
    losing_pool: Amount,
    resolver_bps: Bps,
    house_bps: Bps,
) -> Result<Commissions> {
    validate_rate("resolver rate", resolver_bps)?;
    validate_rate("house rake", house_bps)?;

    let resolver = apply_bps(losing_pool, resolver_bps)?;
    let remaining = losing_pool
        .checked_sub(resolver)
        .ok_or_else(|| VenueError::Consistency("resolver payout exceeds losing pool".into()))?;

    // Nobody backed the winner: the house keeps what is left.
    let house = if winning_pool == 0 {
        remaining
    } else {
        apply_bps(remaining, house_bps)?
    };

    Ok(Commissions { resolver, house })
}

/// Losing pool left for winners after commissions.
pub fn net_losing_pool(losing_pool: Amount, commissions: &Commissions) -> Result<Amount> {
    losing_pool
        .checked_sub(commissions.total()?)
        .ok_or_else(|| VenueError::Consistency("commissions exceed losing pool".into()))
}

/// Principal plus proportional share of the net losing pool.
pub fn winner_payout(
    user_winning: Amount,
    total_winner: Amount,
    total_loser: Amount,
    commissions: &Commissions,
) -> Result<Amount> {
    if user_winning > 0 && total_winner == 0 {
        return Err(VenueError::Consistency(
            "winning pool is empty while a winning stake exists".into(),
        ));
    }
    if user_winning > total_winner {
        return Err(VenueError::Consistency(format!(
            "stake {user_winning} exceeds winning pool {total_winner}"
        )));
    }
    if user_winning == 0 {
        return Ok(0);
    }
    let net = net_losing_pool(total_loser, commissions)?;
    let share = mul_div_floor(user_winning, net, total_winner)?;
    user_winning
        .checked_add(share)
        .ok_or_else(|| overflow("winner payout"))
}

fn narrow(value: U256) -> Result<Amount> {
    if value > U256::from(Amount::MAX) {
        return Err(overflow("narrowing"));
    }
    Ok(value.to::<Amount>())
}

fn overflow(what: &str) -> VenueError {
    VenueError::Consistency(format!("arithmetic overflow in {what}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_scenario() {
        // succeed 300, defeat 100, resolver 2%, house 5%, outcome Succeeded.
        let c = commissions(300, 100, 200, 500).unwrap();
        assert_eq!(c.resolver, 2);
        assert_eq!(c.house, 4);
        assert_eq!(net_losing_pool(100, &c).unwrap(), 94);
        assert_eq!(winner_payout(30, 300, 100, &c).unwrap(), 39);
    }

    #[test]
    fn test_one_sided_losing_market_goes_to_house() {
        let c = commissions(0, 1_000, 200, 500).unwrap();
        assert_eq!(c.resolver, 20);
        assert_eq!(c.house, 980);
        assert_eq!(net_losing_pool(1_000, &c).unwrap(), 0);
    }

    #[test]
    fn test_one_sided_winning_market_pays_no_commission() {
        let c = commissions(500, 0, 200, 500).unwrap();
        assert_eq!(c, Commissions::default());
        assert_eq!(winner_payout(125, 500, 0, &c).unwrap(), 125);
    }

    #[test]
    fn test_rate_cap() {
        assert!(validate_rate("house rake", 1_000).is_ok());
        assert!(matches!(
            commissions(1, 1, 1_001, 0),
            Err(VenueError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_winner_pool_with_stake_is_fatal() {
        let err = winner_payout(10, 0, 100, &Commissions::default()).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_no_overflow_with_18_decimals() {
        let whale = 10u128.pow(27);
        let c = commissions(whale, whale, 1_000, 1_000).unwrap();
        let payout = winner_payout(whale, whale, whale, &c).unwrap();
        assert_eq!(payout, whale + net_losing_pool(whale, &c).unwrap());
    }
}
