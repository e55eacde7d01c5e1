//! # Pattern Parser
//!
//! Recursive-descent parser for the symbol pattern language:
//!
//! | Syntax      | Meaning                                    |
//! |-------------|--------------------------------------------|
//! | `c`         | the literal symbol `c`                     |
//! | `\c`        | `c` taken literally, even if special       |
//! | `.`         | any single symbol                          |
//! | `[A-CX]`    | one symbol from the set (ranges allowed)   |
//! | `[^A-C]`    | one symbol outside the set                 |
//! | `e*` `e+` `e?` | zero-or-more, one-or-more, optional     |
//! | `e1e2`      | concatenation                              |
//! | `e1\|e2`    | alternation                                |
//! | `(e)`       | grouping                                   |
//!
//! Patterns match whole words; there are no anchors.

use crate::error::AutomatonError;

/// A set of symbols matched by one step of the automaton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolSet {
    /// Any symbol.
    Any,
    /// Symbols inside (or, when negated, outside) inclusive ranges.
    Ranges {
        /// Whether the set is complemented.
        negated: bool,
        /// Inclusive `(low, high)` ranges.
        ranges: Vec<(char, char)>,
    },
}

impl SymbolSet {
    /// The set containing exactly `c`.
    pub fn literal(c: char) -> Self {
        SymbolSet::Ranges {
            negated: false,
            ranges: vec![(c, c)],
        }
    }

    /// Whether `c` belongs to the set.
    pub fn contains(&self, c: char) -> bool {
        match self {
            SymbolSet::Any => true,
            SymbolSet::Ranges { negated, ranges } => {
                ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi) != *negated
            }
        }
    }

    /// Range endpoints, for partitioning the alphabet.
    pub(crate) fn ranges(&self) -> &[(char, char)] {
        match self {
            SymbolSet::Any => &[],
            SymbolSet::Ranges { ranges, .. } => ranges,
        }
    }
}

/// Parsed pattern syntax tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ast {
    /// Matches the empty word.
    Empty,
    /// Matches one symbol from the set.
    Set(SymbolSet),
    /// Sequence of sub-patterns.
    Concat(Vec<Ast>),
    /// Any one of the alternatives.
    Alternate(Vec<Ast>),
    /// Zero or more repetitions.
    Star(Box<Ast>),
    /// One or more repetitions.
    Plus(Box<Ast>),
    /// Zero or one occurrence.
    Optional(Box<Ast>),
}

/// Parse `pattern` into a syntax tree.
///
/// # Errors
///
/// Returns [`AutomatonError::Parse`] with the offending character offset.
pub fn parse(pattern: &str) -> Result<Ast, AutomatonError> {
    let mut parser = Parser {
        pattern,
        chars: pattern.chars().collect(),
        pos: 0,
    };
    let ast = parser.alternation()?;
    match parser.peek() {
        None => Ok(ast),
        Some(')') => Err(parser.error("unbalanced ')'")),
        Some(c) => Err(parser.error(format!("unexpected {c:?}"))),
    }
}

struct Parser<'a> {
    pattern: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn error(&self, reason: impl Into<String>) -> AutomatonError {
        AutomatonError::Parse {
            pattern: self.pattern.to_string(),
            position: self.pos,
            reason: reason.into(),
        }
    }

    fn alternation(&mut self) -> Result<Ast, AutomatonError> {
        let mut branches = vec![self.concatenation()?];
        while self.peek() == Some('|') {
            self.pos += 1;
            branches.push(self.concatenation()?);
        }
        Ok(if branches.len() == 1 {
            branches.remove(0)
        } else {
            Ast::Alternate(branches)
        })
    }

    fn concatenation(&mut self) -> Result<Ast, AutomatonError> {
        let mut items = Vec::new();
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            items.push(self.repetition()?);
        }
        Ok(match items.len() {
            0 => Ast::Empty,
            1 => items.remove(0),
            _ => Ast::Concat(items),
        })
    }

    fn repetition(&mut self) -> Result<Ast, AutomatonError> {
        let mut ast = self.atom()?;
        loop {
            ast = match self.peek() {
                Some('*') => Ast::Star(Box::new(ast)),
                Some('+') => Ast::Plus(Box::new(ast)),
                Some('?') => Ast::Optional(Box::new(ast)),
                _ => return Ok(ast),
            };
            self.pos += 1;
        }
    }

    fn atom(&mut self) -> Result<Ast, AutomatonError> {
        match self.bump() {
            Some('(') => {
                let inner = self.alternation()?;
                if self.bump() != Some(')') {
                    return Err(self.error("missing ')'"));
                }
                Ok(inner)
            }
            Some('[') => self.bracket().map(Ast::Set),
            Some('.') => Ok(Ast::Set(SymbolSet::Any)),
            Some('\\') => self.escaped().map(|c| Ast::Set(SymbolSet::literal(c))),
            Some(c @ ('*' | '+' | '?')) => {
                self.pos -= 1;
                Err(self.error(format!("{c:?} has nothing to repeat")))
            }
            Some(']') => {
                self.pos -= 1;
                Err(self.error("unbalanced ']'"))
            }
            Some(c) => Ok(Ast::Set(SymbolSet::literal(c))),
            None => Err(self.error("unexpected end of pattern")),
        }
    }

    fn escaped(&mut self) -> Result<char, AutomatonError> {
        self.bump().ok_or_else(|| self.error("dangling escape"))
    }

    fn bracket(&mut self) -> Result<SymbolSet, AutomatonError> {
        let negated = self.peek() == Some('^');
        if negated {
            self.pos += 1;
        }
        let mut ranges = Vec::new();
        loop {
            let low = match self.bump() {
                None => return Err(self.error("missing ']'")),
                Some(']') if !ranges.is_empty() => break,
                Some(']') => return Err(self.error("empty symbol set")),
                Some('\\') => self.escaped()?,
                Some(c) => c,
            };
            let is_range = self.peek() == Some('-')
                && self.chars.get(self.pos + 1).is_some_and(|&next| next != ']');
            if !is_range {
                ranges.push((low, low));
                continue;
            }
            self.pos += 1;
            let high = match self.bump() {
                Some('\\') => self.escaped()?,
                Some(c) => c,
                None => return Err(self.error("missing ']'")),
            };
            if high < low {
                return Err(self.error(format!("reversed range {low:?}-{high:?}")));
            }
            ranges.push((low, high));
        }
        Ok(SymbolSet::Ranges { negated, ranges })
    }
}
