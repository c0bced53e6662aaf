//! Reaction graph.
//!
//! A reaction says "when `source` completes, fire `target`". Edges may form
//! cycles; registration never rejects them. Cycle safety is enforced at run
//! time by the visited stack carried through a cascade.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One or more reaction target names.
///
/// # Examples
///
/// ```
/// use stimulus::ReactionTargets;
///
/// let single: ReactionTargets = "reload".into();
/// let many: ReactionTargets = vec!["a", "b"].into();
/// assert_eq!(single.len(), 1);
/// assert_eq!(many.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReactionTargets(Vec<String>);

impl ReactionTargets {
    /// Number of targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no targets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Target names in registration order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for ReactionTargets {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for ReactionTargets {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<Vec<String>> for ReactionTargets {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl From<Vec<&str>> for ReactionTargets {
    fn from(names: Vec<&str>) -> Self {
        Self(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for ReactionTargets {
    fn from(names: &[&str]) -> Self {
        Self(names.iter().map(|s| (*s).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ReactionTargets {
    fn from(names: [&str; N]) -> Self {
        Self(names.iter().map(|s| (*s).to_string()).collect())
    }
}

impl FromIterator<String> for ReactionTargets {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Adjacency list: source name to ordered target names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReactionGraph {
    edges: HashMap<String, Vec<String>>,
}

impl ReactionGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append targets to `source`'s reaction list. Duplicates are kept.
    pub fn add(&mut self, source: &str, targets: ReactionTargets) {
        self.edges
            .entry(source.to_string())
            .or_default()
            .extend(targets.0);
    }

    /// Reactions registered for `source`, in registration order.
    #[must_use]
    pub fn reactions(&self, source: &str) -> Option<&[String]> {
        self.edges.get(source).map(Vec::as_slice)
    }

    /// Number of sources with at least one reaction.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns true if no reactions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
