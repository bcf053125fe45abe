//! Tier table configuration.
//!
//! The tier table is external configuration: loaded once from the
//! data/ directory, validated, and treated as immutable input by the
//! engine. Bad tables are rejected here, at load time — evaluation
//! code never sees one.

use crate::error::{TierError, TierResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four performance bands of the partner programme.
///
/// Variant order matches programme order, so derived `Ord` agrees with
/// `tier_order` in any valid table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierName {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl TierName {
    /// Stable lowercase form, used for database columns. Matches the
    /// serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TierName::Bronze   => "bronze",
            TierName::Silver   => "silver",
            TierName::Gold     => "gold",
            TierName::Platinum => "platinum",
        }
    }
}

impl std::str::FromStr for TierName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bronze"   => Ok(TierName::Bronze),
            "silver"   => Ok(TierName::Silver),
            "gold"     => Ok(TierName::Gold),
            "platinum" => Ok(TierName::Platinum),
            other      => Err(format!("unknown tier name '{other}'")),
        }
    }
}

impl fmt::Display for TierName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TierName::Bronze   => "Bronze",
            TierName::Silver   => "Silver",
            TierName::Gold     => "Gold",
            TierName::Platinum => "Platinum",
        };
        f.write_str(s)
    }
}

/// One configured band.
///
/// `min_avg_commission` is inclusive, `max_avg_commission` exclusive.
/// Only the top band has `max_avg_commission = None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierDefinition {
    pub tier_name: TierName,
    pub min_avg_commission: f64,
    pub max_avg_commission: Option<f64>,
    pub reward_percentage: f64,
    pub tier_order: usize,
    /// Presentation metadata carried through from the programme
    /// configuration. Never interpreted by the engine.
    #[serde(default)]
    pub tier_color: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TierConfigFile {
    tiers: Vec<TierDefinition>,
}

/// A validated, ascending tier table.
///
/// Construction is the only place the invariants are checked:
/// orders are exactly 0..n, the bottom floor is zero, bands are
/// contiguous half-open intervals, and only the top band is unbounded.
#[derive(Debug, Clone)]
pub struct TierTable {
    bands: Vec<TierDefinition>,
}

impl TierTable {
    pub fn new(mut bands: Vec<TierDefinition>) -> TierResult<Self> {
        if bands.is_empty() {
            return Err(invalid("table has no bands"));
        }

        bands.sort_by_key(|b| b.tier_order);

        for (i, band) in bands.iter().enumerate() {
            if band.tier_order != i {
                return Err(invalid(&format!(
                    "tier orders must be contiguous from 0; found order {} at position {i}",
                    band.tier_order
                )));
            }
            if band.reward_percentage < 0.0 {
                return Err(invalid(&format!(
                    "{} has negative reward percentage", band.tier_name
                )));
            }
        }

        if bands[0].min_avg_commission != 0.0 {
            return Err(invalid(&format!(
                "bottom band {} must start at $0.00, starts at ${:.2}",
                bands[0].tier_name, bands[0].min_avg_commission
            )));
        }

        for pair in bands.windows(2) {
            let (lower, upper) = (&pair[0], &pair[1]);
            match lower.max_avg_commission {
                None => {
                    return Err(invalid(&format!(
                        "{} is unbounded but is not the top band", lower.tier_name
                    )));
                }
                Some(max) => {
                    if max <= lower.min_avg_commission {
                        return Err(invalid(&format!(
                            "{} has empty range [{:.2}, {:.2})",
                            lower.tier_name, lower.min_avg_commission, max
                        )));
                    }
                    if max != upper.min_avg_commission {
                        return Err(invalid(&format!(
                            "gap or overlap between {} (max ${:.2}) and {} (min ${:.2})",
                            lower.tier_name, max,
                            upper.tier_name, upper.min_avg_commission
                        )));
                    }
                }
            }
        }

        let top = bands.last().expect("non-empty checked above");
        if top.max_avg_commission.is_some() {
            return Err(invalid(&format!(
                "top band {} must be unbounded", top.tier_name
            )));
        }

        Ok(Self { bands })
    }

    /// Load from the data/ directory. In tests, use default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/tiers/tier_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: TierConfigFile = serde_json::from_str(&content)?;
        Ok(Self::new(file.tiers)?)
    }

    /// Select the band for a trailing-average commission.
    ///
    /// Ascending scan; an average equal to a band's floor classifies
    /// into that band, never the lower one. Averages below the bottom
    /// floor (clawback-heavy histories) land in the bottom band.
    pub fn band_for(&self, average: f64) -> &TierDefinition {
        self.bands
            .iter()
            .find(|b| {
                average >= b.min_avg_commission
                    && b.max_avg_commission.map_or(true, |max| average < max)
            })
            .unwrap_or(&self.bands[0])
    }

    pub fn order_of(&self, name: TierName) -> Option<usize> {
        self.bands.iter().position(|b| b.tier_name == name)
    }

    /// The band above `order`, or None at the top.
    pub fn next_band(&self, order: usize) -> Option<&TierDefinition> {
        self.bands.get(order + 1)
    }

    pub fn bands(&self) -> &[TierDefinition] {
        &self.bands
    }

    /// Table with the programme's default bands, hardcoded for use in
    /// unit tests.
    pub fn default_test() -> Self {
        Self::new(vec![
            TierDefinition {
                tier_name: TierName::Bronze,
                min_avg_commission: 0.0,
                max_avg_commission: Some(500.0),
                reward_percentage: 0.0,
                tier_order: 0,
                tier_color: "#CD7F32".into(),
                description: "Entry band for new partners".into(),
            },
            TierDefinition {
                tier_name: TierName::Silver,
                min_avg_commission: 500.0,
                max_avg_commission: Some(1000.0),
                reward_percentage: 3.0,
                tier_order: 1,
                tier_color: "#C0C0C0".into(),
                description: "Consistent mid-volume partners".into(),
            },
            TierDefinition {
                tier_name: TierName::Gold,
                min_avg_commission: 1000.0,
                max_avg_commission: Some(5000.0),
                reward_percentage: 6.0,
                tier_order: 2,
                tier_color: "#FFD700".into(),
                description: "High-volume partners".into(),
            },
            TierDefinition {
                tier_name: TierName::Platinum,
                min_avg_commission: 5000.0,
                max_avg_commission: None,
                reward_percentage: 10.0,
                tier_order: 3,
                tier_color: "#E5E4E2".into(),
                description: "Top of the programme".into(),
            },
        ])
        .expect("built-in test table is valid")
    }
}

fn invalid(reason: &str) -> TierError {
    TierError::InvalidTierTable {
        reason: reason.to_string(),
    }
}
