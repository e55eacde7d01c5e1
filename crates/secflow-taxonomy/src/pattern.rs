//! # Sector Patterns
//!
//! A `SectorPattern` is the regular expression naming a sector's symbols.
//! Its canonical form is the containment pattern `.*[<range>].*`: any word
//! containing at least one of the sector's reserved symbols.
//!
//! Patterns are derived from the sector's whole reserved range, not just the
//! symbols issued so far, so a pattern stays valid as accounts are added and
//! only changes when the range grows.
//!
//! ## Escaping
//!
//! Symbols that are regex metacharacters are escaped with a backslash. Inside
//! a bracket set only `]`, `\`, `^` and `-` are special.

use std::fmt;

use serde::Serialize;

use secflow_core::{Sector, SymbolRange};

/// The pattern of one sector, regenerated whenever its range grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectorPattern {
    sector: Sector,
    range: SymbolRange,
}

impl SectorPattern {
    /// Build the pattern of `sector` over `range`.
    pub fn new(sector: Sector, range: SymbolRange) -> Self {
        Self { sector, range }
    }

    /// The sector this pattern names.
    pub fn sector(&self) -> Sector {
        self.sector
    }

    /// The symbol range the pattern was generated from.
    pub fn range(&self) -> SymbolRange {
        self.range
    }

    /// The bracket set matching one symbol of the sector, e.g. `[A-C]`.
    pub fn set_expr(&self) -> String {
        let start = escape_in_set(self.range.start());
        if self.range.capacity() == 1 {
            format!("[{start}]")
        } else {
            format!("[{start}-{}]", escape_in_set(self.range.end()))
        }
    }

    /// Containment pattern: words with at least one sector symbol.
    pub fn regex(&self) -> String {
        format!(".*{}.*", self.set_expr())
    }

    /// First-hop pattern: words whose second symbol belongs to the sector,
    /// i.e. paths whose first counterparty sits in the sector.
    pub fn first_hop_regex(&self) -> String {
        format!(".{}.*", self.set_expr())
    }

    /// Direct containment test, without compiling an automaton.
    pub fn matches(&self, word: &str) -> bool {
        word.chars().any(|c| self.range.contains(c))
    }
}

impl fmt::Display for SectorPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.regex())
    }
}

/// Escape a symbol for use inside a bracket set.
pub fn escape_in_set(c: char) -> String {
    match c {
        ']' | '\\' | '^' | '-' | '[' => format!("\\{c}"),
        _ => c.to_string(),
    }
}

/// Escape a symbol for use as a literal outside a bracket set.
pub fn escape_literal(c: char) -> String {
    match c {
        '.' | '*' | '+' | '?' | '|' | '(' | ')' | '[' | ']' | '\\' => format!("\\{c}"),
        _ => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> SectorPattern {
        SectorPattern::new(Sector::Agriculture, SymbolRange::new('A', 3).unwrap())
    }

    #[test]
    fn containment_regex_covers_range() {
        assert_eq!(abc().regex(), ".*[A-C].*");
        assert_eq!(abc().first_hop_regex(), ".[A-C].*");
    }

    #[test]
    fn single_symbol_set() {
        let p = SectorPattern::new(Sector::Finance, SymbolRange::new('F', 1).unwrap());
        assert_eq!(p.set_expr(), "[F]");
    }

    #[test]
    fn matches_any_word_with_a_sector_symbol() {
        let p = abc();
        assert!(p.matches("A"));
        assert!(p.matches("xxBxx"));
        assert!(p.matches("IC"));
        assert!(!p.matches("IJK"));
        assert!(!p.matches(""));
    }

    #[test]
    fn metacharacters_are_escaped_in_sets() {
        let p = SectorPattern::new(Sector::Energy, SymbolRange::new('[', 3).unwrap());
        assert_eq!(p.set_expr(), "[\\[-\\]]");
        assert_eq!(escape_literal('*'), "\\*");
        assert_eq!(escape_literal('a'), "a");
    }

    #[test]
    fn display_is_containment_regex() {
        assert_eq!(abc().to_string(), ".*[A-C].*");
    }
}
