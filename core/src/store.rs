//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! The engine and tools call store methods — they never execute SQL
//! directly.

use crate::{
    config::TierName,
    error::{TierError, TierResult},
    ledger::MonthlyCommissionRecord,
    statistics::{TierStatistics, TierStatus},
    types::YearMonth,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

pub struct TierStore {
    conn: Connection,
}

/// A persisted snapshot row: the statistics plus the evaluation run
/// that produced them.
#[derive(Debug, Clone)]
pub struct StoredSnapshot {
    pub evaluation_id: String,
    pub stats: TierStatistics,
}

/// Per-tier aggregate over the latest snapshot of every partner.
#[derive(Debug, Clone)]
pub struct TierDistribution {
    pub tier:           TierName,
    pub partner_count:  i64,
    pub avg_commission: f64,
    pub min_commission: f64,
    pub max_commission: f64,
}

impl TierStore {
    /// Open (or create) the tier database at `path`.
    pub fn open(path: &str) -> TierResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> TierResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> TierResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Partners ───────────────────────────────────────────────

    pub fn upsert_partner(&self, partner_id: &str, name: &str) -> TierResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO partner (partner_id, name) VALUES (?1, ?2)",
            params![partner_id, name],
        )?;
        if !name.is_empty() {
            self.conn.execute(
                "UPDATE partner SET name = ?2 WHERE partner_id = ?1",
                params![partner_id, name],
            )?;
        }
        Ok(())
    }

    /// Every known partner, including those with no commissions yet —
    /// the batch evaluation reports the latter as unranked.
    pub fn partner_ids(&self) -> TierResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT partner_id FROM partner ORDER BY partner_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    // ── Monthly commissions ────────────────────────────────────

    /// Insert one closed month. A duplicate (partner, month) pair is a
    /// constraint violation — closed months are immutable.
    pub fn insert_commission(&self, record: &MonthlyCommissionRecord) -> TierResult<()> {
        self.conn.execute(
            "INSERT INTO monthly_commission
                 (partner_id, month, base_commission, reward_percentage_applied)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.partner_id,
                record.month.to_string(),
                record.base_commission,
                record.reward_percentage_applied,
            ],
        )?;
        Ok(())
    }

    /// Stamp the reward the evaluation granted onto the month it
    /// applies to. The base commission itself is never touched.
    pub fn apply_reward(
        &self,
        partner_id: &str,
        month: YearMonth,
        reward_percentage: f64,
        tier_reward: f64,
    ) -> TierResult<()> {
        self.conn.execute(
            "UPDATE monthly_commission
             SET reward_percentage_applied = ?3, tier_reward = ?4
             WHERE partner_id = ?1 AND month = ?2",
            params![partner_id, month.to_string(), reward_percentage, tier_reward],
        )?;
        Ok(())
    }

    /// The partner's most recent `limit` months, returned oldest-first
    /// (the shape compute_tier_statistics takes).
    pub fn commission_history(
        &self,
        partner_id: &str,
        limit: usize,
    ) -> TierResult<Vec<MonthlyCommissionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT partner_id, month, base_commission, reward_percentage_applied
             FROM monthly_commission
             WHERE partner_id = ?1
             ORDER BY month DESC
             LIMIT ?2",
        )?;
        let raw = stmt
            .query_map(params![partner_id, limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(raw.len());
        for (partner_id, month, base_commission, reward_percentage_applied) in raw {
            records.push(MonthlyCommissionRecord {
                partner_id,
                month: parse_month(&month)?,
                base_commission,
                reward_percentage_applied,
            });
        }
        // DESC query, oldest-first result.
        records.reverse();
        Ok(records)
    }

    // ── Tier snapshots ─────────────────────────────────────────

    pub fn insert_snapshot(
        &self,
        evaluation_id: &str,
        stats: &TierStatistics,
    ) -> TierResult<()> {
        self.conn.execute(
            "INSERT INTO tier_snapshot
                 (evaluation_id, partner_id, tier, tier_order,
                  three_month_avg, months_in_average,
                  reward_percentage, reward_amount, current_month_commission,
                  previous_tier, status, next_tier, next_tier_threshold,
                  amount_to_next, progress_pct, calculated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                evaluation_id,
                stats.partner_id,
                stats.current_tier.as_str(),
                stats.tier_order as i64,
                stats.three_month_avg_commission,
                stats.months_in_average as i64,
                stats.reward_percentage,
                stats.reward_amount,
                stats.current_month_commission,
                stats.previous_tier.map(|t| t.as_str()),
                stats.status.as_str(),
                stats.next_tier.map(|t| t.as_str()),
                stats.next_tier_threshold,
                stats.amount_to_next_tier,
                stats.progress_to_next_tier_pct,
                stats.calculated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// The partner's most recent snapshot, if any. Its `current_tier`
    /// is the `previous_tier` input of the next evaluation.
    pub fn latest_snapshot(&self, partner_id: &str) -> TierResult<Option<StoredSnapshot>> {
        let mut stmt = self.conn.prepare(
            "SELECT evaluation_id, partner_id, tier, tier_order,
                    three_month_avg, months_in_average,
                    reward_percentage, reward_amount, current_month_commission,
                    previous_tier, status, next_tier, next_tier_threshold,
                    amount_to_next, progress_pct, calculated_at
             FROM tier_snapshot
             WHERE partner_id = ?1
             ORDER BY id DESC
             LIMIT 1",
        )?;
        let raw = stmt
            .query_row(params![partner_id], |row| {
                Ok(RawSnapshot {
                    evaluation_id:            row.get(0)?,
                    partner_id:               row.get(1)?,
                    tier:                     row.get(2)?,
                    tier_order:               row.get::<_, i64>(3)? as usize,
                    three_month_avg:          row.get(4)?,
                    months_in_average:        row.get::<_, i64>(5)? as usize,
                    reward_percentage:        row.get(6)?,
                    reward_amount:            row.get(7)?,
                    current_month_commission: row.get(8)?,
                    previous_tier:            row.get(9)?,
                    status:                   row.get(10)?,
                    next_tier:                row.get(11)?,
                    next_tier_threshold:      row.get(12)?,
                    amount_to_next:           row.get(13)?,
                    progress_pct:             row.get(14)?,
                    calculated_at:            row.get(15)?,
                })
            })
            .optional()?;

        raw.map(StoredSnapshot::try_from).transpose()
    }

    /// Partner counts and 3-month-average spread per tier, over each
    /// partner's latest snapshot. Ascending tier order.
    pub fn tier_distribution(&self) -> TierResult<Vec<TierDistribution>> {
        let mut stmt = self.conn.prepare(
            "SELECT tier, COUNT(*), AVG(three_month_avg),
                    MIN(three_month_avg), MAX(three_month_avg)
             FROM tier_snapshot
             WHERE id IN (SELECT MAX(id) FROM tier_snapshot GROUP BY partner_id)
             GROUP BY tier
             ORDER BY MIN(tier_order)",
        )?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = Vec::with_capacity(raw.len());
        for (tier, partner_count, avg_commission, min_commission, max_commission) in raw {
            out.push(TierDistribution {
                tier: parse_tier(&tier)?,
                partner_count,
                avg_commission,
                min_commission,
                max_commission,
            });
        }
        Ok(out)
    }

    /// Status counts over each partner's latest snapshot.
    pub fn movement_counts(&self) -> TierResult<Vec<(TierStatus, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*)
             FROM tier_snapshot
             WHERE id IN (SELECT MAX(id) FROM tier_snapshot GROUP BY partner_id)
             GROUP BY status
             ORDER BY status",
        )?;
        let raw = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = Vec::with_capacity(raw.len());
        for (status, count) in raw {
            out.push((parse_status(&status)?, count));
        }
        Ok(out)
    }
}

// ── Row conversion ─────────────────────────────────────────────

struct RawSnapshot {
    evaluation_id:            String,
    partner_id:               String,
    tier:                     String,
    tier_order:               usize,
    three_month_avg:          f64,
    months_in_average:        usize,
    reward_percentage:        f64,
    reward_amount:            f64,
    current_month_commission: f64,
    previous_tier:            Option<String>,
    status:                   String,
    next_tier:                Option<String>,
    next_tier_threshold:      Option<f64>,
    amount_to_next:           f64,
    progress_pct:             f64,
    calculated_at:            String,
}

impl TryFrom<RawSnapshot> for StoredSnapshot {
    type Error = TierError;

    fn try_from(raw: RawSnapshot) -> TierResult<Self> {
        Ok(StoredSnapshot {
            evaluation_id: raw.evaluation_id,
            stats: TierStatistics {
                partner_id: raw.partner_id,
                current_tier: parse_tier(&raw.tier)?,
                tier_order: raw.tier_order,
                three_month_avg_commission: raw.three_month_avg,
                months_in_average: raw.months_in_average,
                reward_percentage: raw.reward_percentage,
                reward_amount: raw.reward_amount,
                current_month_commission: raw.current_month_commission,
                previous_tier: raw.previous_tier.as_deref().map(parse_tier).transpose()?,
                status: parse_status(&raw.status)?,
                next_tier: raw.next_tier.as_deref().map(parse_tier).transpose()?,
                next_tier_threshold: raw.next_tier_threshold,
                amount_to_next_tier: raw.amount_to_next,
                progress_to_next_tier_pct: raw.progress_pct,
                calculated_at: parse_timestamp(&raw.calculated_at)?,
            },
        })
    }
}

fn parse_tier(s: &str) -> TierResult<TierName> {
    s.parse()
        .map_err(|e: String| TierError::Other(anyhow::anyhow!(e)))
}

fn parse_status(s: &str) -> TierResult<TierStatus> {
    s.parse()
        .map_err(|e: String| TierError::Other(anyhow::anyhow!(e)))
}

fn parse_month(s: &str) -> TierResult<YearMonth> {
    s.parse()
        .map_err(|e: String| TierError::Other(anyhow::anyhow!(e)))
}

fn parse_timestamp(s: &str) -> TierResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TierError::Other(anyhow::anyhow!("bad calculated_at '{s}': {e}")))
}
