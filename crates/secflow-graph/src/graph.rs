//! # Transaction Graph — Accounts and Trade Links
//!
//! A directed graph whose nodes are accounts and whose edges are trade
//! links along which value may flow. Validation enumerates the simple paths
//! from a transaction's source to its target.
//!
//! ## Determinism
//!
//! Adjacency is stored in `BTreeSet`s and the enumeration is a depth-first
//! search visiting neighbours in ascending account order, so paths come out
//! in lexicographic order and a truncated enumeration always keeps the same
//! prefix.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use secflow_core::AccountId;

use crate::error::GraphError;

/// An ordered sequence of accounts, from source to target.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Path(Vec<AccountId>);

impl Path {
    /// A path over `accounts`, in order.
    pub fn new(accounts: Vec<AccountId>) -> Self {
        Self(accounts)
    }

    /// Accounts along the path.
    pub fn accounts(&self) -> &[AccountId] {
        &self.0
    }

    /// Number of edges.
    pub fn hops(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    /// First account, if any.
    pub fn source(&self) -> Option<&AccountId> {
        self.0.first()
    }

    /// Last account, if any.
    pub fn target(&self) -> Option<&AccountId> {
        self.0.last()
    }

    /// The first counterparty of the source.
    pub fn first_hop(&self) -> Option<&AccountId> {
        self.0.get(1)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, account) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{account}")?;
        }
        Ok(())
    }
}

/// Directed graph of accounts and trade links.
#[derive(Debug, Clone)]
pub struct TransactionGraph {
    adjacency: BTreeMap<AccountId, BTreeSet<AccountId>>,
    max_paths: usize,
}

impl TransactionGraph {
    /// An empty graph that enumerates at most `max_paths` paths per query.
    pub fn new(max_paths: usize) -> Self {
        Self {
            adjacency: BTreeMap::new(),
            max_paths,
        }
    }

    /// Add an account with no links.
    pub fn add_account(&mut self, account: AccountId) -> Result<(), GraphError> {
        if self.adjacency.contains_key(&account) {
            return Err(GraphError::DuplicateAccount(account));
        }
        self.adjacency.insert(account, BTreeSet::new());
        Ok(())
    }

    /// Add a trade link `from → to`. Returns `false` if it already existed.
    ///
    /// # Errors
    ///
    /// - [`GraphError::SelfLink`] if `from == to`.
    /// - [`GraphError::UnknownAccount`] if either endpoint is missing.
    pub fn connect(&mut self, from: &AccountId, to: &AccountId) -> Result<bool, GraphError> {
        if from == to {
            return Err(GraphError::SelfLink(from.clone()));
        }
        if !self.adjacency.contains_key(to) {
            return Err(GraphError::UnknownAccount(to.clone()));
        }
        let links = self
            .adjacency
            .get_mut(from)
            .ok_or_else(|| GraphError::UnknownAccount(from.clone()))?;
        Ok(links.insert(to.clone()))
    }

    /// Whether `account` is a node.
    pub fn contains(&self, account: &AccountId) -> bool {
        self.adjacency.contains_key(account)
    }

    /// Outgoing links of `account`, ascending.
    pub fn neighbours(&self, account: &AccountId) -> impl Iterator<Item = &AccountId> {
        self.adjacency.get(account).into_iter().flatten()
    }

    /// Number of accounts.
    pub fn account_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of trade links.
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum()
    }

    /// Cap on paths returned by [`Self::enumerate_paths`].
    pub fn max_paths(&self) -> usize {
        self.max_paths
    }

    /// All simple paths from `source` to `target` with at most `max_hops`
    /// edges, in lexicographic order, truncated to the path cap.
    ///
    /// Returns an empty vector when no such path exists.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownAccount`] if either endpoint is missing.
    pub fn enumerate_paths(
        &self,
        source: &AccountId,
        target: &AccountId,
        max_hops: usize,
    ) -> Result<Vec<Path>, GraphError> {
        Ok(self.enumerate(source, target, max_hops)?.paths)
    }

    /// Like [`Self::enumerate_paths`], also reporting whether the path cap
    /// cut off at least one further path.
    pub fn enumerate(
        &self,
        source: &AccountId,
        target: &AccountId,
        max_hops: usize,
    ) -> Result<Enumeration, GraphError> {
        for endpoint in [source, target] {
            if !self.contains(endpoint) {
                return Err(GraphError::UnknownAccount(endpoint.clone()));
            }
        }

        let mut search = Search {
            graph: self,
            target,
            max_hops,
            stack: vec![source.clone()],
            on_stack: BTreeSet::from([source.clone()]),
            found: Vec::new(),
            truncated: false,
        };
        if source != target && max_hops > 0 {
            search.descend(source);
        }

        if search.truncated {
            tracing::warn!(%source, %target, cap = self.max_paths, "path enumeration truncated");
        }
        tracing::debug!(%source, %target, max_hops, paths = search.found.len(), "paths enumerated");
        Ok(Enumeration {
            paths: search.found,
            truncated: search.truncated,
        })
    }
}

/// Result of one path enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumeration {
    /// Paths found, in lexicographic order.
    pub paths: Vec<Path>,
    /// Whether a path beyond the cap exists and was dropped.
    pub truncated: bool,
}

struct Search<'g> {
    graph: &'g TransactionGraph,
    target: &'g AccountId,
    max_hops: usize,
    stack: Vec<AccountId>,
    on_stack: BTreeSet<AccountId>,
    found: Vec<Path>,
    truncated: bool,
}

impl Search<'_> {
    fn descend(&mut self, node: &AccountId) {
        let graph = self.graph;
        for next in graph.neighbours(node) {
            if self.truncated {
                return;
            }
            if self.on_stack.contains(next) {
                continue;
            }
            if next == self.target {
                if self.found.len() >= graph.max_paths {
                    self.truncated = true;
                    return;
                }
                let mut path = self.stack.clone();
                path.push(next.clone());
                self.found.push(Path(path));
            } else if self.stack.len() < self.max_hops {
                self.stack.push(next.clone());
                self.on_stack.insert(next.clone());
                self.descend(next);
                self.on_stack.remove(next);
                self.stack.pop();
            }
        }
    }
}
