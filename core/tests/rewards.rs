use chrono::Utc;
use tiering_core::{
    config::{TierName, TierTable},
    ledger::MonthlyCommissionRecord,
    statistics::compute_tier_statistics,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn record(month: &str, base_commission: f64) -> MonthlyCommissionRecord {
    MonthlyCommissionRecord {
        partner_id: "P-3001".into(),
        month: month.parse().unwrap(),
        base_commission,
        reward_percentage_applied: 0.0,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// The worked programme example: $700 (Sep), $1,200 (Oct), $1,700 (Nov)
/// averages to $1,200 — Gold — and the 6% reward applies to November's
/// $1,700, giving $102.00.
#[test]
fn programme_example_yields_gold_and_102_dollars() {
    let history = vec![
        record("2025-09", 700.0),
        record("2025-10", 1200.0),
        record("2025-11", 1700.0),
    ];
    let stats = compute_tier_statistics(
        "P-3001",
        &history,
        None,
        &TierTable::default_test(),
        Utc::now(),
    )
    .unwrap();

    assert_eq!(stats.current_tier, TierName::Gold);
    assert_eq!(stats.three_month_avg_commission, 1200.0);
    assert_eq!(stats.reward_percentage, 6.0);
    assert_eq!(stats.current_month_commission, 1700.0);
    assert_eq!(stats.reward_amount, 102.0);
}

/// The reward applies to the current month's commission, not to the
/// trailing average that set the tier.
#[test]
fn reward_uses_current_month_not_average() {
    // Strong past months carry a weak current month into Gold.
    let history = vec![
        record("2025-09", 5000.0),
        record("2025-10", 5000.0),
        record("2025-11", 500.0),
    ];
    let stats = compute_tier_statistics(
        "P-3001",
        &history,
        None,
        &TierTable::default_test(),
        Utc::now(),
    )
    .unwrap();

    assert_eq!(stats.current_tier, TierName::Gold, "avg $3,500 is Gold");
    // 6% of the $500 current month, not of the $3,500 average.
    assert_eq!(stats.reward_amount, 30.0);
}

/// Bronze carries no reward; the amount must be exactly zero.
#[test]
fn bottom_band_reward_is_zero() {
    let stats = compute_tier_statistics(
        "P-3001",
        &[record("2025-11", 120.0)],
        None,
        &TierTable::default_test(),
        Utc::now(),
    )
    .unwrap();

    assert_eq!(stats.current_tier, TierName::Bronze);
    assert_eq!(stats.reward_amount, 0.0);
}

/// reward = current_month × pct / 100 across all bands, never negative.
#[test]
fn reward_formula_holds_per_band() {
    let table = TierTable::default_test();
    for current in [100.0, 600.0, 1500.0, 9000.0] {
        let stats = compute_tier_statistics(
            "P-3001",
            &[record("2025-11", current)],
            None,
            &table,
            Utc::now(),
        )
        .unwrap();
        let expected = current * stats.reward_percentage / 100.0;
        assert_eq!(stats.reward_amount, expected);
        assert!(stats.reward_amount >= 0.0);
    }
}
