//! Constant-product quoting.
//!
//! Uniswap-V2 style output with a 0.3% trading fee:
//!   out = in × 997 × reserve_out / (reserve_in × 1000 + in × 997)

use alloy::primitives::U256;

use super::error::{Result, VenueError};
use super::payout::{BPS_DENOMINATOR, apply_bps};
use super::types::{Amount, Bps};

/// Fee-adjusted numerator factor (0.3% fee).
const FEE_NUMERATOR: u64 = 997;
/// Fee denominator.
const FEE_DENOMINATOR: u64 = 1_000;

/// Reserves of a pair, ordered for the swap direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairReserves {
    /// Reserve of the asset being sold.
    pub reserve_in: Amount,
    /// Reserve of the asset being bought.
    pub reserve_out: Amount,
}

/// Expected output of swapping `amount_in` through the pair.
pub fn quote_out(amount_in: Amount, reserves: PairReserves) -> Result<Amount> {
    if reserves.reserve_in == 0 || reserves.reserve_out == 0 {
        return Err(VenueError::Liquidity("pool reserve is zero".into()));
    }
    if amount_in == 0 {
        return Err(VenueError::Validation("swap amount must be positive".into()));
    }

    let overflow = || VenueError::Liquidity("swap exceeds pool arithmetic range".into());
    let in_with_fee = U256::from(amount_in)
        .checked_mul(U256::from(FEE_NUMERATOR))
        .ok_or_else(overflow)?;
    let numerator = in_with_fee
        .checked_mul(U256::from(reserves.reserve_out))
        .ok_or_else(overflow)?;
    let denominator = U256::from(reserves.reserve_in)
        .checked_mul(U256::from(FEE_DENOMINATOR))
        .and_then(|scaled| scaled.checked_add(in_with_fee))
        .ok_or_else(overflow)?;

    let out = numerator / denominator;
    // out < reserve_out, which already fits.
    Ok(out.to::<Amount>())
}

/// Minimum acceptable output for a quote under a slippage tolerance.
pub fn min_out(quote: Amount, slippage_bps: Bps) -> Result<Amount> {
    if slippage_bps > BPS_DENOMINATOR {
        return Err(VenueError::Validation(format!(
            "slippage of {slippage_bps} bps exceeds 100%"
        )));
    }
    apply_bps(quote, BPS_DENOMINATOR - slippage_bps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_matches_formula() {
        let r = PairReserves { reserve_in: 1_000_000, reserve_out: 2_000_000 };
        // 1000 × 997 × 2e6 / (1e6 × 1000 + 1000 × 997) = 1992
        assert_eq!(quote_out(1_000, r).unwrap(), 1_992);
    }

    #[test]
    fn test_zero_reserve_is_liquidity_error() {
        let r = PairReserves { reserve_in: 0, reserve_out: 10 };
        assert!(matches!(quote_out(5, r), Err(VenueError::Liquidity(_))));
    }

    #[test]
    fn test_two_percent_slippage() {
        assert_eq!(min_out(1_000, 200).unwrap(), 980);
        assert_eq!(min_out(1_999, 200).unwrap(), 1_959);
    }

    #[test]
    fn test_oversized_swap_is_liquidity_error() {
        let r = PairReserves { reserve_in: u128::MAX, reserve_out: u128::MAX };
        assert!(matches!(quote_out(u128::MAX, r), Err(VenueError::Liquidity(_))));

        // Just inside the range still quotes
        let r = PairReserves { reserve_in: 1 << 100, reserve_out: 1 << 100 };
        assert!(quote_out(1 << 100, r).unwrap() < r.reserve_out);
    }

    #[test]
    fn test_output_never_drains_pool() {
        let r = PairReserves { reserve_in: 10, reserve_out: 10 };
        let out = quote_out(u128::MAX / 2, r).unwrap();
        assert!(out < r.reserve_out);
    }
}
