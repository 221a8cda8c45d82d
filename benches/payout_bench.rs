//! Settlement Benchmarks - Payout and Quote Hot Paths
//!
//! Benchmarks the integer arithmetic run on every resolution, claim and
//! converted bet.
//!
//! Run with: cargo bench --bench payout_bench

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use alloy::primitives::{Address, U256};

use dao_vote_parimutuel::domain::amm::{PairReserves, min_out, quote_out};
use dao_vote_parimutuel::domain::payout::{commissions, winner_payout};
use dao_vote_parimutuel::domain::{BetSide, GovernanceDialect, Ledger, Proposal};

/// Benchmark commission computation for a resolved proposal.
fn bench_commissions(c: &mut Criterion) {
    c.bench_function("commissions", |b| {
        b.iter(|| commissions(black_box(300_000_000), black_box(100_000_000), 200, 500));
    });
}

/// Benchmark a single winner's payout.
fn bench_winner_payout(c: &mut Criterion) {
    let owed = commissions(300_000_000, 100_000_000, 200, 500).unwrap();

    c.bench_function("winner_payout", |b| {
        b.iter(|| {
            winner_payout(
                black_box(30_000_000),
                black_box(300_000_000),
                black_box(100_000_000),
                &owed,
            )
        });
    });
}

/// Benchmark a constant-product quote with its slippage floor.
fn bench_quote(c: &mut Criterion) {
    let reserves = PairReserves {
        reserve_in: 1_000_000_000_000,
        reserve_out: 2_000_000_000_000,
    };

    c.bench_function("quote_with_min_out", |b| {
        b.iter(|| {
            let out = quote_out(black_box(1_000_000), reserves).unwrap();
            min_out(out, 200)
        });
    });
}

/// Benchmark native state decoding for every dialect.
fn bench_outcome_mapping(c: &mut Criterion) {
    c.bench_function("outcome_of_index", |b| {
        b.iter(|| {
            for dialect in [
                GovernanceDialect::Bravo,
                GovernanceDialect::OzGovernor,
                GovernanceDialect::Objection,
            ] {
                let _ = dialect.outcome_of_index(black_box(4));
            }
        });
    });
}

/// Benchmark bet recording on a ledger with many bettors.
fn bench_record_bet(c: &mut Criterion) {
    c.bench_function("record_bet_1000_users", |b| {
        b.iter(|| {
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
            for i in 0..1_000u32 {
                let user = Address::left_padding_from(&i.to_be_bytes());
                let side = if i % 3 == 0 { BetSide::Defeat } else { BetSide::Succeed };
                let _ = ledger.record_bet(id, user, side, black_box(1_000));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_commissions,
    bench_winner_payout,
    bench_quote,
    bench_outcome_mapping,
    bench_record_bet,
);
criterion_main!(benches);
