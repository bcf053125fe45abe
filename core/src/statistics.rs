//! The tier computation itself.
//!
//! `compute_tier_statistics` is a pure function over a partner's
//! commission history and the validated tier table. No store access,
//! no clock reads, no randomness — callers supply everything,
//! including the previous tier from the last persisted snapshot.
//! Safe to call concurrently for different partners.

use crate::{
    config::{TierName, TierTable},
    error::{TierError, TierResult},
    ledger::MonthlyCommissionRecord,
    types::PartnerId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Months in the trailing window. Partners with fewer closed months
/// are averaged over what they have.
pub const TRAILING_MONTHS: usize = 3;

/// Tier movement relative to the previous evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierStatus {
    Up,
    Down,
    Stable,
    New,
}

impl TierStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierStatus::Up     => "up",
            TierStatus::Down   => "down",
            TierStatus::Stable => "stable",
            TierStatus::New    => "new",
        }
    }
}

impl FromStr for TierStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up"     => Ok(TierStatus::Up),
            "down"   => Ok(TierStatus::Down),
            "stable" => Ok(TierStatus::Stable),
            "new"    => Ok(TierStatus::New),
            other    => Err(format!("unknown tier status '{other}'")),
        }
    }
}

/// One evaluation's derived snapshot for a partner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierStatistics {
    pub partner_id: PartnerId,
    pub current_tier: TierName,
    pub tier_order: usize,
    pub three_month_avg_commission: f64,
    /// How many closed months the average actually covers (1..=3).
    pub months_in_average: usize,
    pub reward_percentage: f64,
    /// Reward on the current (most recent) month's commission,
    /// not on the trailing average.
    pub reward_amount: f64,
    pub current_month_commission: f64,
    pub previous_tier: Option<TierName>,
    pub status: TierStatus,
    pub next_tier: Option<TierName>,
    pub next_tier_threshold: Option<f64>,
    pub amount_to_next_tier: f64,
    pub progress_to_next_tier_pct: f64,
    pub calculated_at: DateTime<Utc>,
}

/// Classify a partner from their commission history.
///
/// `history` is oldest-first, most-recent-last; only the trailing
/// three months enter the average. `previous_tier` is the tier of the
/// last persisted snapshot, or None for a first evaluation.
///
/// Worked example: commissions $700 (Sep), $1,200 (Oct), $1,700 (Nov)
/// average to $1,200, which sits in the Gold band ($1,000–$4,999.99);
/// the reward is 6% of November's $1,700 = $102.00.
pub fn compute_tier_statistics(
    partner_id: &str,
    history: &[MonthlyCommissionRecord],
    previous_tier: Option<TierName>,
    table: &TierTable,
    calculated_at: DateTime<Utc>,
) -> TierResult<TierStatistics> {
    if history.is_empty() {
        return Err(TierError::NoCommissionHistory {
            partner_id: partner_id.to_string(),
        });
    }

    let window = &history[history.len().saturating_sub(TRAILING_MONTHS)..];
    let average =
        window.iter().map(|r| r.base_commission).sum::<f64>() / window.len() as f64;

    let band = table.band_for(average);

    let current_month = history.last().expect("non-empty checked above");
    let reward_amount = current_month.base_commission * band.reward_percentage / 100.0;

    // A previous tier that no longer exists in the table means the
    // programme was reconfigured under us; the partner restarts as new.
    let status = match previous_tier.and_then(|t| table.order_of(t)) {
        None => TierStatus::New,
        Some(prev_order) if band.tier_order > prev_order => TierStatus::Up,
        Some(prev_order) if band.tier_order < prev_order => TierStatus::Down,
        Some(_) => TierStatus::Stable,
    };

    let (next_tier, next_tier_threshold, amount_to_next_tier, progress_pct) =
        match table.next_band(band.tier_order) {
            Some(next) => {
                let amount = (next.min_avg_commission - average).max(0.0);
                // Progress is measured across the current band's range:
                // 0% at its floor, 100% at the next band's floor.
                let range = next.min_avg_commission - band.min_avg_commission;
                let progress =
                    ((average - band.min_avg_commission) / range * 100.0).clamp(0.0, 100.0);
                (
                    Some(next.tier_name),
                    Some(next.min_avg_commission),
                    amount,
                    progress,
                )
            }
            None => (None, None, 0.0, 100.0),
        };

    log::debug!(
        "tier stats: partner={partner_id} avg=${average:.2} over {} month(s) -> {} ({})",
        window.len(),
        band.tier_name,
        status.as_str(),
    );

    Ok(TierStatistics {
        partner_id: partner_id.to_string(),
        current_tier: band.tier_name,
        tier_order: band.tier_order,
        three_month_avg_commission: average,
        months_in_average: window.len(),
        reward_percentage: band.reward_percentage,
        reward_amount,
        current_month_commission: current_month.base_commission,
        previous_tier,
        status,
        next_tier,
        next_tier_threshold,
        amount_to_next_tier,
        progress_to_next_tier_pct: progress_pct,
        calculated_at,
    })
}
