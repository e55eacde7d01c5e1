//! # Sectors and Symbol Ranges
//!
//! Defines the `Sector` enum, the single definition of the economy's
//! sectors, and `SymbolRange`, the contiguous run of characters a sector
//! reserves for naming its accounts.
//!
//! ## Invariant
//!
//! A `SymbolRange` is a contiguous run of Unicode scalar values. Ranges that
//! would cross the surrogate block or run past `char::MAX` are rejected at
//! construction, so iterating a range never has to skip or fail.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SecflowError;
use crate::identity::Symbol;

/// Number of sectors in the economy.
pub const SECTOR_COUNT: usize = 5;

/// An economic sector.
///
/// Each sector reserves its own symbol range and yields its own pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sector {
    /// Primary production: farming, forestry, fishing.
    Agriculture,
    /// Manufacturing and transformation of goods.
    Industry,
    /// Trade, transport and personal services.
    Services,
    /// Banking, credit and insurance.
    Finance,
    /// Production and distribution of energy.
    Energy,
}

impl Sector {
    /// All sectors, in declaration order.
    pub const ALL: [Sector; SECTOR_COUNT] = [
        Sector::Agriculture,
        Sector::Industry,
        Sector::Services,
        Sector::Finance,
        Sector::Energy,
    ];

    /// Canonical upper-case name (e.g., "AGRICULTURE").
    pub fn name(&self) -> &'static str {
        match self {
            Self::Agriculture => "AGRICULTURE",
            Self::Industry => "INDUSTRY",
            Self::Services => "SERVICES",
            Self::Finance => "FINANCE",
            Self::Energy => "ENERGY",
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Sector {
    type Err = SecflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sector::ALL
            .into_iter()
            .find(|sector| sector.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SecflowError::InvalidIdentifier(format!("unknown sector: {s:?}")))
    }
}

/// A contiguous run of `capacity` symbols starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SymbolRange {
    start: char,
    capacity: u32,
}

impl SymbolRange {
    /// Create a validated symbol range.
    ///
    /// # Errors
    ///
    /// Returns [`SecflowError::InvalidSymbolRange`] if the capacity is zero,
    /// the range runs past `char::MAX`, or it crosses the surrogate block.
    pub fn new(start: char, capacity: u32) -> Result<Self, SecflowError> {
        let reject = |reason: &str| SecflowError::InvalidSymbolRange {
            start,
            capacity,
            reason: reason.to_string(),
        };
        if capacity == 0 {
            return Err(reject("capacity must be at least 1"));
        }
        let first = start as u32;
        let last = first
            .checked_add(capacity - 1)
            .ok_or_else(|| reject("range overflows the code space"))?;
        if last > char::MAX as u32 {
            return Err(reject("range runs past the last Unicode scalar value"));
        }
        if first <= 0xDFFF && last >= 0xD800 {
            return Err(reject("range crosses the surrogate block"));
        }
        Ok(Self { start, capacity })
    }

    /// First symbol of the range.
    pub fn start(&self) -> char {
        self.start
    }

    /// Number of symbols in the range.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Last symbol of the range (inclusive).
    pub fn end(&self) -> char {
        // Validated at construction: every offset maps to a scalar value.
        char::from_u32(self.start as u32 + self.capacity - 1).unwrap_or(self.start)
    }

    /// The `index`-th symbol of the range, if within capacity.
    pub fn nth(&self, index: u32) -> Option<Symbol> {
        if index >= self.capacity {
            return None;
        }
        char::from_u32(self.start as u32 + index).map(Symbol)
    }

    /// Whether `c` falls inside the range.
    pub fn contains(&self, c: char) -> bool {
        (self.start..=self.end()).contains(&c)
    }

    /// Whether two ranges share at least one symbol.
    pub fn overlaps(&self, other: &SymbolRange) -> bool {
        self.start <= other.end() && other.start <= self.end()
    }

    /// All symbols of the range, in issuance order.
    pub fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        (0..self.capacity).filter_map(move |i| self.nth(i))
    }

    /// A copy of this range grown (or kept) to `capacity`, same start.
    pub fn with_capacity(&self, capacity: u32) -> Result<Self, SecflowError> {
        Self::new(self.start, capacity)
    }
}

impl fmt::Display for SymbolRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}..={:?}", self.start, self.end())
    }
}
