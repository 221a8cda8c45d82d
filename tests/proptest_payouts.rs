//! Property-Based Tests - Settlement Invariants
//!
//! Uses `proptest` to verify that the pari-mutuel arithmetic, the ledger
//! and the constant-product quote hold their invariants across random
//! inputs.

use alloy::primitives::{Address, U256};
use proptest::prelude::*;

use dao_vote_parimutuel::adapters::custody::InMemoryBooks;
use dao_vote_parimutuel::domain::amm::{PairReserves, min_out, quote_out};
use dao_vote_parimutuel::domain::payout::{MAX_RATE_BPS, commissions, winner_payout};
use dao_vote_parimutuel::domain::{BetSide, CanonicalOutcome, Commissions, Ledger, Proposal};

// ── Payout Conservation ─────────────────────────────────────

proptest! {
    /// Commissions plus every winner's payout never exceed the pool,
    /// and every winner gets at least their stake back.
    #[test]
    fn payouts_never_exceed_pool(
        winning_stakes in prop::collection::vec(1u128..1_000_000_000_000, 1..20),
        losing_pool in 0u128..1_000_000_000_000_000,
        resolver_bps in 0u16..=MAX_RATE_BPS,
        house_bps in 0u16..=MAX_RATE_BPS,
    ) {
        let winning_pool: u128 = winning_stakes.iter().sum();
        let owed = commissions(winning_pool, losing_pool, resolver_bps, house_bps).unwrap();

        let mut paid = owed.total().unwrap();
        for stake in &winning_stakes {
            let payout = winner_payout(*stake, winning_pool, losing_pool, &owed).unwrap();
            prop_assert!(payout >= *stake, "payout {payout} below stake {stake}");
            paid += payout;
        }
        prop_assert!(
            paid <= winning_pool + losing_pool,
            "paid {paid} from a pool of {}",
            winning_pool + losing_pool
        );
        // Floor rounding loses at most one unit per winner
        prop_assert!(winning_pool + losing_pool - paid <= winning_stakes.len() as u128 + 1);
    }

    /// With nobody on the winning side the whole losing pool is commission.
    #[test]
    fn empty_winning_side_pays_everything_to_commissions(
        losing_pool in 0u128..u128::MAX / 2,
        resolver_bps in 0u16..=MAX_RATE_BPS,
        house_bps in 0u16..=MAX_RATE_BPS,
    ) {
        let owed = commissions(0, losing_pool, resolver_bps, house_bps).unwrap();
        prop_assert_eq!(owed.total().unwrap(), losing_pool);
    }

    /// Rates above the cap are always refused.
    #[test]
    fn rates_above_cap_rejected(bps in (MAX_RATE_BPS + 1)..=u16::MAX) {
        prop_assert!(commissions(100, 100, bps, 0).is_err());
        prop_assert!(commissions(100, 100, 0, bps).is_err());
    }
}

// ── Ledger Pools ────────────────────────────────────────────

proptest! {
    /// Each pool equals the sum of the stakes recorded on its side.
    #[test]
    fn pools_match_recorded_stakes(
        bets in prop::collection::vec((0u8..5, any::<bool>(), 1u128..1_000_000), 1..50),
    ) {
        let mut ledger = Ledger::new(500, 200).unwrap();
        let id = ledger
            .insert_proposal(Proposal::new(
                1,
                0,
                Address::repeat_byte(1),
                U256::from(1),
                Address::repeat_byte(2),
            ))
            .unwrap();

        let mut succeed = 0u128;
        let mut defeat = 0u128;
        for (user, on_succeed, amount) in &bets {
            let side = if *on_succeed { BetSide::Succeed } else { BetSide::Defeat };
            ledger.record_bet(id, Address::repeat_byte(0x10 + user), side, *amount).unwrap();
            match side {
                BetSide::Succeed => succeed += amount,
                BetSide::Defeat => defeat += amount,
            }
        }

        let proposal = ledger.proposal(id).unwrap();
        prop_assert_eq!(proposal.succeed_total, succeed);
        prop_assert_eq!(proposal.defeat_total, defeat);
        prop_assert!(ledger.verify_pools(id).is_ok());
    }

    /// A cancelled proposal hands every user back exactly what they staked.
    #[test]
    fn cancellation_refunds_every_stake(
        bets in prop::collection::vec((0u8..5, any::<bool>(), 1u128..1_000_000), 1..50),
    ) {
        let mut ledger = Ledger::new(500, 200).unwrap();
        let id = ledger
            .insert_proposal(Proposal::new(
                1,
                0,
                Address::repeat_byte(1),
                U256::from(1),
                Address::repeat_byte(2),
            ))
            .unwrap();

        let mut staked = [0u128; 5];
        for (user, on_succeed, amount) in &bets {
            let side = if *on_succeed { BetSide::Succeed } else { BetSide::Defeat };
            ledger.record_bet(id, Address::repeat_byte(0x10 + user), side, *amount).unwrap();
            staked[usize::from(*user)] += amount;
        }
        let proposal = ledger.proposal(id).unwrap();
        let pool = proposal.succeed_total + proposal.defeat_total;

        ledger.resolve(id, CanonicalOutcome::Cancelled, Commissions::default(), 10).unwrap();

        let mut refunded = 0u128;
        for (user, expected) in staked.iter().enumerate() {
            let account = Address::repeat_byte(0x10 + user as u8);
            let claim = ledger.claim(id, account, 11);
            if *expected == 0 {
                prop_assert!(claim.is_err());
                continue;
            }
            let bet = claim.unwrap();
            prop_assert_eq!(bet.total().unwrap(), *expected);
            refunded += bet.total().unwrap();
        }
        prop_assert_eq!(refunded, pool);
    }
}

// ── Constant-Product Quote ──────────────────────────────────

proptest! {
    /// A swap can never drain the output reserve, and the slippage floor
    /// never exceeds the quote.
    #[test]
    fn quote_stays_below_reserve(
        amount_in in 1u128..1_000_000_000_000_000_000,
        reserve_in in 1u128..1_000_000_000_000_000_000,
        reserve_out in 1u128..1_000_000_000_000_000_000,
        slippage_bps in 0u16..=10_000,
    ) {
        let out = quote_out(amount_in, PairReserves { reserve_in, reserve_out }).unwrap();
        prop_assert!(out < reserve_out);
        prop_assert!(min_out(out, slippage_bps).unwrap() <= out);
    }
}

// ── Custody Batches ─────────────────────────────────────────

proptest! {
    /// A commission batch either moves every leg or nothing.
    #[test]
    fn transfer_batch_is_all_or_nothing(
        balance in 0u128..10_000,
        legs in prop::collection::vec((1u8..4, 0u128..5_000), 1..4),
    ) {
        let asset = Address::repeat_byte(0xd1);
        let venue = Address::repeat_byte(0x50);
        let legs: Vec<(Address, u128)> = legs
            .into_iter()
            .map(|(to, amount)| (Address::repeat_byte(to), amount))
            .collect();
        let requested: u128 = legs.iter().map(|(_, amount)| amount).sum();

        let (result, left) = tokio_test::block_on(async {
            let books = InMemoryBooks::new();
            books.mint(asset, venue, balance).await.unwrap();
            let result = books.transfer_batch(asset, venue, &legs).await;
            (result, books.balance(asset, venue).await)
        });

        if requested <= balance {
            prop_assert!(result.is_ok());
            prop_assert_eq!(left, balance - requested);
        } else {
            prop_assert!(result.is_err());
            prop_assert_eq!(left, balance);
        }
    }
}
