use chrono::Utc;
use tiering_core::{
    config::{TierName, TierTable},
    ledger::MonthlyCommissionRecord,
    statistics::{compute_tier_statistics, TierStatistics},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn stats_for(amount: f64) -> TierStatistics {
    let history = vec![MonthlyCommissionRecord {
        partner_id: "P-4001".into(),
        month: "2025-11".parse().unwrap(),
        base_commission: amount,
        reward_percentage_applied: 0.0,
    }];
    compute_tier_statistics(
        "P-4001",
        &history,
        None,
        &TierTable::default_test(),
        Utc::now(),
    )
    .unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Progress is measured across the current band's range: 0% exactly at
/// the band floor.
#[test]
fn progress_is_zero_at_the_band_floor() {
    let stats = stats_for(500.0);
    assert_eq!(stats.current_tier, TierName::Silver);
    assert_eq!(stats.progress_to_next_tier_pct, 0.0);
    assert_eq!(stats.amount_to_next_tier, 500.0);
    assert_eq!(stats.next_tier, Some(TierName::Gold));
    assert_eq!(stats.next_tier_threshold, Some(1000.0));
}

/// Halfway through the Silver range ($500–$1,000) is 50%.
#[test]
fn progress_is_relative_to_the_band_range() {
    let stats = stats_for(750.0);
    assert_eq!(stats.current_tier, TierName::Silver);
    assert_eq!(stats.progress_to_next_tier_pct, 50.0);
    assert_eq!(stats.amount_to_next_tier, 250.0);
}

/// The naive avg/threshold formula would say 75% here; the relative
/// formula says 93.75% of the way from the Bronze floor to Silver.
#[test]
fn bronze_progress_uses_the_band_floor_not_zero_coincidentally() {
    let stats = stats_for(375.0);
    assert_eq!(stats.current_tier, TierName::Bronze);
    // Bronze floor is $0, so here both formulas agree: 375/500.
    assert_eq!(stats.progress_to_next_tier_pct, 75.0);

    let silver = stats_for(900.0);
    assert_eq!(silver.current_tier, TierName::Silver);
    // (900 - 500) / (1000 - 500) = 80%, not 900/1000 = 90%.
    assert_eq!(silver.progress_to_next_tier_pct, 80.0);
}

/// Approaching the next floor drives progress toward 100%.
#[test]
fn progress_nears_100_at_the_next_floor() {
    let stats = stats_for(999.99);
    assert_eq!(stats.current_tier, TierName::Silver);
    assert!(
        stats.progress_to_next_tier_pct > 99.99,
        "expected ~100%, got {}",
        stats.progress_to_next_tier_pct
    );
}

/// At the top band there is nothing to progress towards.
#[test]
fn top_band_is_pinned_at_100_percent() {
    let stats = stats_for(8000.0);
    assert_eq!(stats.current_tier, TierName::Platinum);
    assert_eq!(stats.progress_to_next_tier_pct, 100.0);
    assert_eq!(stats.amount_to_next_tier, 0.0);
    assert_eq!(stats.next_tier, None);
    assert_eq!(stats.next_tier_threshold, None);
}

/// A negative average clamps progress at 0 rather than going negative.
#[test]
fn negative_average_clamps_progress_to_zero() {
    let stats = stats_for(-100.0);
    assert_eq!(stats.current_tier, TierName::Bronze);
    assert_eq!(stats.progress_to_next_tier_pct, 0.0);
    // The full distance to Silver, measured from the actual average.
    assert_eq!(stats.amount_to_next_tier, 600.0);
}
