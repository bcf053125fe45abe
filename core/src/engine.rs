//! The evaluation engine — ledger in, tier snapshots out.
//!
//! RULES:
//!   - The engine only ever holds a table that passed validation.
//!   - Partners are evaluated independently; batch order never
//!     affects results.
//!   - A partner's previous_tier always comes from their last
//!     persisted snapshot, never from recomputed history.

use crate::{
    config::TierTable,
    error::{TierError, TierResult},
    ledger::{LedgerRecord, MonthlyCommissionRecord},
    statistics::{compute_tier_statistics, TierStatistics, TierStatus, TRAILING_MONTHS},
    store::{StoredSnapshot, TierDistribution, TierStore},
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub struct TierEngine {
    table: TierTable,
    store: TierStore,
}

/// Outcome of one batch evaluation run.
#[derive(Debug, Clone)]
pub struct EvaluationSummary {
    pub evaluation_id: String,
    pub evaluated:     usize,
    pub unranked:      usize,
    pub promotions:    usize,
    pub demotions:     usize,
}

impl TierEngine {
    pub fn new(table: TierTable, store: TierStore) -> Self {
        Self { table, store }
    }

    /// Engine over an in-memory store and the built-in test table.
    /// Used in tests.
    pub fn build_test() -> TierResult<Self> {
        let store = TierStore::in_memory()?;
        store.migrate()?;
        Ok(Self::new(TierTable::default_test(), store))
    }

    pub fn store(&self) -> &TierStore {
        &self.store
    }

    pub fn table(&self) -> &TierTable {
        &self.table
    }

    /// Store ledger records, creating partners as needed. Re-inserting
    /// an already-closed month is a constraint violation and aborts
    /// the ingest.
    pub fn ingest(&self, records: &[LedgerRecord]) -> TierResult<usize> {
        for record in records {
            self.store
                .upsert_partner(&record.partner_id, &record.partner_name)?;
            self.store.insert_commission(&MonthlyCommissionRecord {
                partner_id: record.partner_id.clone(),
                month: record.month,
                base_commission: record.base_commission,
                reward_percentage_applied: 0.0,
            })?;
        }
        log::info!("ingested {} commission record(s)", records.len());
        Ok(records.len())
    }

    /// Evaluate one partner on demand: read their trailing history and
    /// previous snapshot, compute, persist the new snapshot, and stamp
    /// the reward onto the current month.
    pub fn evaluate_partner(&self, partner_id: &str) -> TierResult<TierStatistics> {
        let evaluation_id = Uuid::new_v4().to_string();
        self.evaluate_into(partner_id, &evaluation_id, Utc::now())
    }

    /// One monthly batch pass over every known partner. Partners
    /// without history are unranked, not errors.
    pub fn evaluate_all(&self) -> TierResult<EvaluationSummary> {
        let evaluation_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let partners = self.store.partner_ids()?;

        let mut summary = EvaluationSummary {
            evaluation_id: evaluation_id.clone(),
            evaluated:     0,
            unranked:      0,
            promotions:    0,
            demotions:     0,
        };

        for partner_id in &partners {
            match self.evaluate_into(partner_id, &evaluation_id, now) {
                Ok(stats) => {
                    summary.evaluated += 1;
                    match stats.status {
                        TierStatus::Up   => summary.promotions += 1,
                        TierStatus::Down => summary.demotions += 1,
                        _ => {}
                    }
                }
                Err(TierError::NoCommissionHistory { partner_id }) => {
                    log::warn!("evaluation {evaluation_id}: partner {partner_id} unranked (no history)");
                    summary.unranked += 1;
                }
                Err(e) => return Err(e),
            }
        }

        log::info!(
            "evaluation {evaluation_id}: {} evaluated, {} unranked, {} up, {} down",
            summary.evaluated, summary.unranked, summary.promotions, summary.demotions,
        );
        Ok(summary)
    }

    pub fn latest_snapshot(&self, partner_id: &str) -> TierResult<Option<StoredSnapshot>> {
        self.store.latest_snapshot(partner_id)
    }

    pub fn distribution(&self) -> TierResult<Vec<TierDistribution>> {
        self.store.tier_distribution()
    }

    pub fn movements(&self) -> TierResult<Vec<(TierStatus, i64)>> {
        self.store.movement_counts()
    }

    fn evaluate_into(
        &self,
        partner_id: &str,
        evaluation_id: &str,
        now: DateTime<Utc>,
    ) -> TierResult<TierStatistics> {
        let history = self.store.commission_history(partner_id, TRAILING_MONTHS)?;
        let previous_tier = self
            .store
            .latest_snapshot(partner_id)?
            .map(|s| s.stats.current_tier);

        let stats =
            compute_tier_statistics(partner_id, &history, previous_tier, &self.table, now)?;

        self.store.insert_snapshot(evaluation_id, &stats)?;
        if let Some(current) = history.last() {
            self.store.apply_reward(
                partner_id,
                current.month,
                stats.reward_percentage,
                stats.reward_amount,
            )?;
        }
        Ok(stats)
    }
}
