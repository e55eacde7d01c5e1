//! # Sector Allocator
//!
//! Issues taxonomy symbols from each sector's reserved range. Allocation is
//! sequential and deterministic: the k-th allocation for a sector returns the
//! k-th symbol of its range. When the range is exhausted, allocation fails
//! with [`TaxonomyError::CapacityExceeded`] and the cursor stays put.
//!
//! Symbols assigned outside allocation (administrative remaps) are recorded
//! with [`SectorAllocator::reserve`] and skipped by later allocations. A
//! taken symbol is never issued again, even after its account moved to
//! another one, since earlier snapshots still map it.
//!
//! ## Range Invariants
//!
//! - Ranges of different sectors never overlap, so a symbol identifies its
//!   sector and sector patterns stay disjoint.
//! - Ranges only grow. Shrinking would orphan symbols already issued to
//!   accounts, so [`SectorAllocator::upgrade_capacity`] rejects it.

use std::collections::{BTreeMap, BTreeSet};

use secflow_core::{EngineConfig, Sector, Symbol, SymbolRange};

use crate::error::TaxonomyError;
use crate::pattern::SectorPattern;

#[derive(Debug, Clone)]
struct SectorSlot {
    range: SymbolRange,
    taken: BTreeSet<Symbol>,
}

impl SectorSlot {
    fn taken_count(&self) -> u32 {
        u32::try_from(self.taken.len()).unwrap_or(u32::MAX)
    }
}

/// Per-sector symbol issuance with bounded alphabets.
#[derive(Debug, Clone, Default)]
pub struct SectorAllocator {
    slots: BTreeMap<Sector, SectorSlot>,
}

impl SectorAllocator {
    /// Create an allocator over pairwise-disjoint ranges.
    ///
    /// # Errors
    ///
    /// Returns [`TaxonomyError::RangeOverlap`] if two ranges share a symbol.
    pub fn new(ranges: BTreeMap<Sector, SymbolRange>) -> Result<Self, TaxonomyError> {
        let mut allocator = Self::default();
        for (sector, range) in ranges {
            allocator.check_disjoint(sector, &range)?;
            allocator.slots.insert(
                sector,
                SectorSlot {
                    range,
                    taken: BTreeSet::new(),
                },
            );
        }
        Ok(allocator)
    }

    /// Create an allocator from a validated engine configuration.
    pub fn from_config(config: &EngineConfig) -> Result<Self, TaxonomyError> {
        Self::new(config.sector_ranges()?)
    }

    /// Issue the first symbol of `sector`'s range that is not yet taken.
    ///
    /// # Errors
    ///
    /// - [`TaxonomyError::UnknownSector`] if the sector has no range.
    /// - [`TaxonomyError::CapacityExceeded`] once the range is exhausted.
    pub fn allocate_character_for_sector(&mut self, sector: Sector) -> Result<Symbol, TaxonomyError> {
        let slot = self
            .slots
            .get_mut(&sector)
            .ok_or(TaxonomyError::UnknownSector(sector))?;
        let symbol = slot
            .range
            .symbols()
            .find(|symbol| !slot.taken.contains(symbol))
            .ok_or(TaxonomyError::CapacityExceeded {
                sector,
                capacity: slot.range.capacity(),
            })?;
        slot.taken.insert(symbol);
        tracing::debug!(%sector, %symbol, issued = slot.taken.len(), "allocated symbol");
        Ok(symbol)
    }

    /// Mark `symbol` as taken so allocation never issues it.
    ///
    /// Returns `false` if it was already taken.
    ///
    /// # Errors
    ///
    /// Returns [`TaxonomyError::UnrangedSymbol`] if no sector's range
    /// contains the symbol.
    pub fn reserve(&mut self, symbol: Symbol) -> Result<bool, TaxonomyError> {
        let (sector, slot) = self
            .slots
            .iter_mut()
            .find(|(_, slot)| slot.range.contains(symbol.as_char()))
            .ok_or(TaxonomyError::UnrangedSymbol(symbol))?;
        let fresh = slot.taken.insert(symbol);
        if fresh {
            tracing::debug!(%sector, %symbol, "symbol reserved");
        }
        Ok(fresh)
    }

    /// Whether `symbol` was issued or reserved.
    pub fn is_taken(&self, symbol: Symbol) -> bool {
        self.slots
            .values()
            .any(|slot| slot.taken.contains(&symbol))
    }

    /// The pattern of `sector`, generated from its current range.
    pub fn get_pattern_for_sector(&self, sector: Sector) -> Result<SectorPattern, TaxonomyError> {
        self.slots
            .get(&sector)
            .map(|slot| SectorPattern::new(sector, slot.range))
            .ok_or(TaxonomyError::UnknownSector(sector))
    }

    /// Patterns of every configured sector, in sector order.
    pub fn patterns(&self) -> Vec<SectorPattern> {
        self.slots
            .iter()
            .map(|(sector, slot)| SectorPattern::new(*sector, slot.range))
            .collect()
    }

    /// Grow `sector`'s range to `new_capacity` symbols, keeping its start.
    ///
    /// Returns the regenerated pattern. Growing to the current capacity is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// - [`TaxonomyError::RangeShrink`] if `new_capacity` is below the current one.
    /// - [`TaxonomyError::RangeOverlap`] if the grown range hits another sector.
    /// - [`TaxonomyError::InvalidRange`] if it leaves the valid code space.
    pub fn upgrade_capacity(
        &mut self,
        sector: Sector,
        new_capacity: u32,
    ) -> Result<SectorPattern, TaxonomyError> {
        let current = self
            .slots
            .get(&sector)
            .map(|slot| slot.range)
            .ok_or(TaxonomyError::UnknownSector(sector))?;
        if new_capacity < current.capacity() {
            return Err(TaxonomyError::RangeShrink {
                sector,
                current: current.capacity(),
                requested: new_capacity,
            });
        }
        let grown = current
            .with_capacity(new_capacity)
            .map_err(|source| TaxonomyError::InvalidRange { sector, source })?;
        self.check_disjoint(sector, &grown)?;
        if let Some(slot) = self.slots.get_mut(&sector) {
            slot.range = grown;
        }
        tracing::info!(%sector, from = current.capacity(), to = new_capacity, "sector capacity upgraded");
        Ok(SectorPattern::new(sector, grown))
    }

    /// The reserved range of `sector`.
    pub fn range(&self, sector: Sector) -> Option<SymbolRange> {
        self.slots.get(&sector).map(|slot| slot.range)
    }

    /// All reserved ranges, keyed by sector.
    pub fn ranges(&self) -> BTreeMap<Sector, SymbolRange> {
        self.slots
            .iter()
            .map(|(sector, slot)| (*sector, slot.range))
            .collect()
    }

    /// Number of symbols of `sector` issued or reserved.
    pub fn allocated(&self, sector: Sector) -> u32 {
        self.slots.get(&sector).map_or(0, SectorSlot::taken_count)
    }

    /// Number of symbols still available for `sector`.
    pub fn remaining(&self, sector: Sector) -> u32 {
        self.slots
            .get(&sector)
            .map_or(0, |slot| slot.range.capacity().saturating_sub(slot.taken_count()))
    }

    /// Total reserved capacity across sectors.
    pub fn total_capacity(&self) -> u64 {
        self.slots
            .values()
            .map(|slot| u64::from(slot.range.capacity()))
            .sum()
    }

    /// The sector whose range contains `symbol`.
    pub fn sector_of(&self, symbol: Symbol) -> Option<Sector> {
        self.slots
            .iter()
            .find(|(_, slot)| slot.range.contains(symbol.as_char()))
            .map(|(sector, _)| *sector)
    }

    fn check_disjoint(&self, sector: Sector, range: &SymbolRange) -> Result<(), TaxonomyError> {
        match self
            .slots
            .iter()
            .find(|(other, slot)| **other != sector && slot.range.overlaps(range))
        {
            Some((other, _)) => Err(TaxonomyError::RangeOverlap {
                sector,
                other: *other,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn single(sector: Sector, start: char, capacity: u32) -> SectorAllocator {
        SectorAllocator::new(BTreeMap::from([(
            sector,
            SymbolRange::new(start, capacity).unwrap(),
        )]))
        .unwrap()
    }

    #[test]
    fn allocation_follows_range_order() {
        let mut alloc = single(Sector::Agriculture, 'A', 3);
        assert_eq!(alloc.allocate_character_for_sector(Sector::Agriculture).unwrap(), Symbol('A'));
        assert_eq!(alloc.allocate_character_for_sector(Sector::Agriculture).unwrap(), Symbol('B'));
        assert_eq!(alloc.allocated(Sector::Agriculture), 2);
        assert_eq!(alloc.remaining(Sector::Agriculture), 1);
    }

    #[test]
    fn pattern_covers_whole_range_not_just_issued() {
        let mut alloc = single(Sector::Agriculture, 'A', 3);
        alloc.allocate_character_for_sector(Sector::Agriculture).unwrap();
        alloc.allocate_character_for_sector(Sector::Agriculture).unwrap();
        let pattern = alloc.get_pattern_for_sector(Sector::Agriculture).unwrap();
        assert!(pattern.matches("A"));
        assert!(pattern.matches("B"));
        assert!(pattern.matches("C"));
        assert!(!pattern.matches("D"));
    }

    #[test]
    fn exhaustion_raises_capacity_exceeded() {
        let mut alloc = single(Sector::Finance, 'F', 2);
        alloc.allocate_character_for_sector(Sector::Finance).unwrap();
        alloc.allocate_character_for_sector(Sector::Finance).unwrap();
        let err = alloc.allocate_character_for_sector(Sector::Finance).unwrap_err();
        assert!(matches!(
            err,
            TaxonomyError::CapacityExceeded {
                sector: Sector::Finance,
                capacity: 2
            }
        ));
        // The failed call does not advance the cursor.
        assert_eq!(alloc.allocated(Sector::Finance), 2);
    }

    #[test]
    fn unknown_sector_rejected() {
        let mut alloc = single(Sector::Finance, 'F', 2);
        assert!(matches!(
            alloc.allocate_character_for_sector(Sector::Energy),
            Err(TaxonomyError::UnknownSector(Sector::Energy))
        ));
        assert!(alloc.get_pattern_for_sector(Sector::Energy).is_err());
    }

    #[test]
    fn default_layout_issues_sixty_five_distinct_symbols() {
        let mut alloc = SectorAllocator::from_config(&EngineConfig::default()).unwrap();
        let capacities = [
            (Sector::Agriculture, 10),
            (Sector::Industry, 15),
            (Sector::Services, 20),
            (Sector::Finance, 8),
            (Sector::Energy, 12),
        ];
        let mut issued = BTreeSet::new();
        for (sector, capacity) in capacities {
            for _ in 0..capacity {
                let symbol = alloc.allocate_character_for_sector(sector).unwrap();
                assert_eq!(alloc.sector_of(symbol), Some(sector));
                issued.insert(symbol);
            }
        }
        assert_eq!(issued.len(), 65);
        assert_eq!(alloc.total_capacity(), 65);
        assert!(matches!(
            alloc.allocate_character_for_sector(Sector::Agriculture),
            Err(TaxonomyError::CapacityExceeded { capacity: 10, .. })
        ));
    }

    #[test]
    fn upgrade_extends_range_and_pattern() {
        let mut alloc = single(Sector::Agriculture, 'A', 2);
        alloc.allocate_character_for_sector(Sector::Agriculture).unwrap();
        alloc.allocate_character_for_sector(Sector::Agriculture).unwrap();
        assert!(alloc.allocate_character_for_sector(Sector::Agriculture).is_err());

        let pattern = alloc.upgrade_capacity(Sector::Agriculture, 4).unwrap();
        assert_eq!(pattern.regex(), ".*[A-D].*");
        assert_eq!(alloc.allocate_character_for_sector(Sector::Agriculture).unwrap(), Symbol('C'));
    }

    #[test]
    fn upgrade_rejects_shrink() {
        let mut alloc = single(Sector::Agriculture, 'A', 3);
        assert!(matches!(
            alloc.upgrade_capacity(Sector::Agriculture, 2),
            Err(TaxonomyError::RangeShrink {
                current: 3,
                requested: 2,
                ..
            })
        ));
        assert_eq!(alloc.range(Sector::Agriculture).unwrap().capacity(), 3);
    }

    #[test]
    fn upgrade_rejects_overlap() {
        let mut alloc = SectorAllocator::new(BTreeMap::from([
            (Sector::Agriculture, SymbolRange::new('A', 3).unwrap()),
            (Sector::Industry, SymbolRange::new('I', 3).unwrap()),
        ]))
        .unwrap();
        assert!(matches!(
            alloc.upgrade_capacity(Sector::Agriculture, 9),
            Err(TaxonomyError::RangeOverlap {
                other: Sector::Industry,
                ..
            })
        ));
        alloc.upgrade_capacity(Sector::Agriculture, 8).unwrap();
    }

    #[test]
    fn overlapping_construction_rejected() {
        let result = SectorAllocator::new(BTreeMap::from([
            (Sector::Agriculture, SymbolRange::new('A', 5).unwrap()),
            (Sector::Industry, SymbolRange::new('C', 3).unwrap()),
        ]));
        assert!(matches!(result, Err(TaxonomyError::RangeOverlap { .. })));
    }

    #[test]
    fn reserved_symbols_are_skipped() {
        let mut alloc = single(Sector::Industry, 'I', 3);
        assert!(alloc.reserve(Symbol('J')).unwrap());
        assert!(!alloc.reserve(Symbol('J')).unwrap());
        assert!(alloc.is_taken(Symbol('J')));

        assert_eq!(alloc.allocate_character_for_sector(Sector::Industry).unwrap(), Symbol('I'));
        assert_eq!(alloc.allocate_character_for_sector(Sector::Industry).unwrap(), Symbol('K'));
        assert_eq!(alloc.allocated(Sector::Industry), 3);
        assert_eq!(alloc.remaining(Sector::Industry), 0);
        assert!(matches!(
            alloc.allocate_character_for_sector(Sector::Industry),
            Err(TaxonomyError::CapacityExceeded { capacity: 3, .. })
        ));
    }

    #[test]
    fn reserving_outside_every_range_fails() {
        let mut alloc = single(Sector::Industry, 'I', 3);
        assert!(matches!(
            alloc.reserve(Symbol('Z')),
            Err(TaxonomyError::UnrangedSymbol(Symbol('Z')))
        ));
        assert_eq!(alloc.allocated(Sector::Industry), 0);
    }

    proptest::proptest! {
        /// The k-th allocation is the k-th symbol of the range, until exhaustion.
        #[test]
        fn issuance_follows_range_order(start in 0x100u32..0x1000, capacity in 1u32..32, calls in 0u32..40) {
            let start = char::from_u32(start).unwrap();
            let mut alloc = single(Sector::Services, start, capacity);
            let range = alloc.range(Sector::Services).unwrap();
            for k in 0..calls {
                let result = alloc.allocate_character_for_sector(Sector::Services);
                if k < capacity {
                    proptest::prop_assert_eq!(result.unwrap(), range.nth(k).unwrap());
                } else {
                    let exhausted = matches!(result, Err(TaxonomyError::CapacityExceeded { .. }));
                    proptest::prop_assert!(exhausted);
                }
            }
            proptest::prop_assert_eq!(alloc.allocated(Sector::Services), calls.min(capacity));
        }
    }
}
