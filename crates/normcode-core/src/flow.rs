//! Flow indices: hierarchical inference addresses like `1.2.3`.
//!
//! The derived `Ord` on the component vector is lexicographic, which is
//! exactly the deterministic execution order the orchestrator needs
//! (`1.2` < `1.2.1` < `1.3`).

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Hierarchical address of one inference within a plan.
///
/// The functional child of an inference is always `.1`; value and context
/// children are siblings `.2`, `.3`, ...
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowIndex(Vec<u32>);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid flow index `{0}`")]
pub struct FlowIndexParseError(pub String);

impl FlowIndex {
    /// The root inference: `1`.
    pub fn root() -> Self {
        Self(vec![1])
    }

    pub fn from_components(components: Vec<u32>) -> Option<Self> {
        if components.is_empty() || components.contains(&0) {
            return None;
        }
        Some(Self(components))
    }

    pub fn components(&self) -> &[u32] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// The n-th child (1-based).
    pub fn child(&self, n: u32) -> Self {
        let mut components = self.0.clone();
        components.push(n);
        Self(components)
    }

    /// The `.1` child holding the functional concept.
    pub fn functional_child(&self) -> Self {
        self.child(1)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.0.len() <= 1 {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Last component (1-based sibling position).
    pub fn position(&self) -> u32 {
        *self.0.last().expect("flow index is never empty")
    }

    pub fn is_functional(&self) -> bool {
        self.depth() > 1 && self.position() == 1
    }

    /// Strict ancestry: `1.2` is an ancestor of `1.2.3` but not of itself.
    pub fn is_ancestor_of(&self, other: &FlowIndex) -> bool {
        other.0.len() > self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    pub fn is_prefix_of(&self, other: &FlowIndex) -> bool {
        self == other || self.is_ancestor_of(other)
    }
}

impl std::fmt::Display for FlowIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for FlowIndex {
    type Err = FlowIndexParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let components: Result<Vec<u32>, _> = s.split('.').map(str::parse).collect();
        components
            .ok()
            .and_then(Self::from_components)
            .ok_or_else(|| FlowIndexParseError(s.to_string()))
    }
}

impl Serialize for FlowIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FlowIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

