use chrono::Utc;
use tiering_core::{
    config::{TierName, TierTable},
    ledger::MonthlyCommissionRecord,
    statistics::{compute_tier_statistics, TierStatus},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Classify one month of `amount` against an optional previous tier.
fn status_for(amount: f64, previous: Option<TierName>) -> TierStatus {
    let history = vec![MonthlyCommissionRecord {
        partner_id: "P-5001".into(),
        month: "2025-11".parse().unwrap(),
        base_commission: amount,
        reward_percentage_applied: 0.0,
    }];
    compute_tier_statistics(
        "P-5001",
        &history,
        previous,
        &TierTable::default_test(),
        Utc::now(),
    )
    .unwrap()
    .status
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Silver last run, Gold now: moved up.
#[test]
fn higher_order_than_previous_is_up() {
    assert_eq!(status_for(1200.0, Some(TierName::Silver)), TierStatus::Up);
}

/// Platinum last run, Silver now: moved down.
#[test]
fn lower_order_than_previous_is_down() {
    assert_eq!(status_for(600.0, Some(TierName::Platinum)), TierStatus::Down);
}

#[test]
fn equal_order_is_stable() {
    assert_eq!(status_for(600.0, Some(TierName::Silver)), TierStatus::Stable);
}

/// No previous snapshot means the partner is new to the programme,
/// whatever band they enter at.
#[test]
fn no_previous_snapshot_is_new() {
    assert_eq!(status_for(600.0, None), TierStatus::New);
    assert_eq!(status_for(12_000.0, None), TierStatus::New);
}

/// A jump across several bands is still just "up".
#[test]
fn multi_band_jump_is_still_up() {
    assert_eq!(status_for(9000.0, Some(TierName::Bronze)), TierStatus::Up);
}

/// The previous tier is echoed back in the snapshot for display.
#[test]
fn previous_tier_is_recorded_in_the_snapshot() {
    let history = vec![MonthlyCommissionRecord {
        partner_id: "P-5001".into(),
        month: "2025-11".parse().unwrap(),
        base_commission: 1200.0,
        reward_percentage_applied: 0.0,
    }];
    let stats = compute_tier_statistics(
        "P-5001",
        &history,
        Some(TierName::Silver),
        &TierTable::default_test(),
        Utc::now(),
    )
    .unwrap();
    assert_eq!(stats.previous_tier, Some(TierName::Silver));
    assert_eq!(stats.current_tier, TierName::Gold);
}
