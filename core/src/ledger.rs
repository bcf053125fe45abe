//! Commission ledger records.
//!
//! The billing collector closes one commission figure per partner per
//! month. This crate consumes those records; it never produces them.
//! Closed months are immutable — the store enforces that.

use crate::types::{PartnerId, YearMonth};
use serde::{Deserialize, Serialize};

/// One month of a partner's base commission, as held in the store.
///
/// `reward_percentage_applied` is the tier reward that was in force
/// when the month closed; zero until the first evaluation ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyCommissionRecord {
    pub partner_id: PartnerId,
    pub month: YearMonth,
    pub base_commission: f64,
    #[serde(default)]
    pub reward_percentage_applied: f64,
}

/// One row of a ledger export file.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerRecord {
    pub partner_id: PartnerId,
    #[serde(default)]
    pub partner_name: String,
    pub month: YearMonth,
    pub base_commission: f64,
}

#[derive(Debug, Deserialize)]
struct LedgerFile {
    records: Vec<LedgerRecord>,
}

/// Load a JSON ledger export produced by the billing collector.
pub fn load_ledger(path: &str) -> anyhow::Result<Vec<LedgerRecord>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    let file: LedgerFile = serde_json::from_str(&content)?;
    Ok(file.records)
}
