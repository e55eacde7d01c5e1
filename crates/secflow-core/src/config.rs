//! # Engine Configuration
//!
//! `EngineConfig` describes the sector layout (reserved symbol ranges and
//! optional share limits), the declared joint flow classes, and the bounds
//! of a validation run (hop limit, path cap, triple validation).
//!
//! Configuration is loaded from YAML and validated before use:
//!
//! ```yaml
//! sectors:
//!   - sector: AGRICULTURE
//!     start: "A"
//!     capacity: 3
//!   - sector: INDUSTRY
//!     start: "I"
//!     capacity: 3
//!     max_share: "0.8"
//! joint_classes:
//!   - from: AGRICULTURE
//!     to: INDUSTRY
//! max_hops: 3
//! ```
//!
//! The default layout reproduces the five-sector economy with capacities
//! 10, 15, 20, 8 and 12 (65 symbols). Each sector owns a 64-symbol window
//! starting at U+0100, so every capacity can later grow in place without
//! colliding with its neighbour.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SecflowError};
use crate::sector::{Sector, SymbolRange};

/// Default hop limit for path enumeration.
pub const DEFAULT_MAX_HOPS: usize = 3;

/// Default cap on enumerated paths per transaction.
pub const DEFAULT_MAX_PATHS: usize = 64;

/// Default sector layout: (sector, first symbol, capacity).
const DEFAULT_LAYOUT: [(Sector, char, u32); 5] = [
    (Sector::Agriculture, '\u{0100}', 10),
    (Sector::Industry, '\u{0140}', 15),
    (Sector::Services, '\u{0180}', 20),
    (Sector::Finance, '\u{01C0}', 8),
    (Sector::Energy, '\u{0200}', 12),
];

fn default_max_hops() -> usize {
    DEFAULT_MAX_HOPS
}

fn default_max_paths() -> usize {
    DEFAULT_MAX_PATHS
}

fn default_true() -> bool {
    true
}

/// Symbol range and limits of one sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorConfig {
    /// The sector being configured.
    pub sector: Sector,
    /// First symbol of the reserved range.
    pub start: char,
    /// Number of symbols reserved.
    pub capacity: u32,
    /// Largest share of a transaction amount that may be routed into this
    /// sector, in `(0, 1]`. `None` means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_share: Option<Decimal>,
}

impl SectorConfig {
    /// The validated symbol range of this sector.
    pub fn range(&self) -> Result<SymbolRange, ConfigError> {
        SymbolRange::new(self.start, self.capacity).map_err(|e| ConfigError::InvalidRange {
            sector: self.sector,
            reason: e.to_string(),
        })
    }
}

/// A declared joint flow class between two sectors.
///
/// A joint class marks flows from `from` to `to` as an intentional
/// cross-sector exchange. `bidirectional` also admits the reverse flow
/// under the same class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointClassConfig {
    /// Sector of the sending account.
    pub from: Sector,
    /// Sector of the receiving account.
    pub to: Sector,
    /// Whether the reverse direction belongs to the same class.
    #[serde(default)]
    pub bidirectional: bool,
}

/// Complete configuration of a validation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Sector layouts, one per sector.
    pub sectors: Vec<SectorConfig>,
    /// Declared joint flow classes.
    #[serde(default)]
    pub joint_classes: Vec<JointClassConfig>,
    /// Maximum number of edges in an enumerated path.
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
    /// Maximum number of paths enumerated per transaction.
    #[serde(default = "default_max_paths")]
    pub max_paths: usize,
    /// Cross-check feasibility and optimization verdicts on every solve.
    #[serde(default = "default_true")]
    pub triple_validation: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sectors: DEFAULT_LAYOUT
                .iter()
                .map(|&(sector, start, capacity)| SectorConfig {
                    sector,
                    start,
                    capacity,
                    max_share: None,
                })
                .collect(),
            joint_classes: vec![
                JointClassConfig {
                    from: Sector::Agriculture,
                    to: Sector::Industry,
                    bidirectional: false,
                },
                JointClassConfig {
                    from: Sector::Industry,
                    to: Sector::Services,
                    bidirectional: false,
                },
                JointClassConfig {
                    from: Sector::Energy,
                    to: Sector::Industry,
                    bidirectional: false,
                },
                JointClassConfig {
                    from: Sector::Finance,
                    to: Sector::Services,
                    bidirectional: true,
                },
            ],
            max_hops: DEFAULT_MAX_HOPS,
            max_paths: DEFAULT_MAX_PATHS,
            triple_validation: true,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SecflowError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::from_yaml_str(&content)?)
    }

    /// Render the configuration as YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Look up the layout of one sector.
    pub fn sector(&self, sector: Sector) -> Option<&SectorConfig> {
        self.sectors.iter().find(|s| s.sector == sector)
    }

    /// Validated symbol ranges keyed by sector.
    pub fn sector_ranges(&self) -> Result<BTreeMap<Sector, SymbolRange>, ConfigError> {
        let mut ranges = BTreeMap::new();
        for sc in &self.sectors {
            if ranges.insert(sc.sector, sc.range()?).is_some() {
                return Err(ConfigError::DuplicateSector(sc.sector));
            }
        }
        Ok(ranges)
    }

    /// Share limits keyed by sector, for sectors that declare one.
    pub fn share_limits(&self) -> BTreeMap<Sector, Decimal> {
        self.sectors
            .iter()
            .filter_map(|s| s.max_share.map(|share| (s.sector, share)))
            .collect()
    }

    /// Validate the whole configuration.
    ///
    /// # Errors
    ///
    /// Rejects: no sectors, duplicate sectors, malformed or overlapping
    /// ranges, shares outside `(0, 1]`, joint classes over undeclared or
    /// identical sectors, duplicate joint classes, and zero limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sectors.is_empty() {
            return Err(ConfigError::NoSectors);
        }

        let ranges = self.sector_ranges()?;
        let entries: Vec<(&Sector, &SymbolRange)> = ranges.iter().collect();
        for (i, (first, a)) in entries.iter().enumerate() {
            for (second, b) in entries.iter().skip(i + 1) {
                if a.overlaps(b) {
                    return Err(ConfigError::OverlappingRanges {
                        first: **first,
                        second: **second,
                    });
                }
            }
        }

        for sc in &self.sectors {
            if let Some(share) = sc.max_share {
                if share <= Decimal::ZERO || share > Decimal::ONE {
                    return Err(ConfigError::InvalidShare {
                        sector: sc.sector,
                        share: share.to_string(),
                    });
                }
            }
        }

        let mut seen = BTreeSet::new();
        for joint in &self.joint_classes {
            if joint.from == joint.to {
                return Err(ConfigError::SelfJoint(joint.from));
            }
            for member in [joint.from, joint.to] {
                if !ranges.contains_key(&member) {
                    return Err(ConfigError::UnknownJointSector {
                        from: joint.from,
                        to: joint.to,
                        missing: member,
                    });
                }
            }
            let duplicate = !seen.insert((joint.from, joint.to))
                || (joint.bidirectional && !seen.insert((joint.to, joint.from)));
            if duplicate {
                return Err(ConfigError::DuplicateJoint {
                    from: joint.from,
                    to: joint.to,
                });
            }
        }

        if self.max_hops == 0 {
            return Err(ConfigError::InvalidLimit {
                field: "max_hops",
                value: self.max_hops,
            });
        }
        if self.max_paths == 0 {
            return Err(ConfigError::InvalidLimit {
                field: "max_paths",
                value: self.max_paths,
            });
        }
        Ok(())
    }
}
