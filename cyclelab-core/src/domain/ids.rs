use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange-assigned order identifier, whitespace-trimmed before use.
///
/// Exported identifiers frequently carry trailing whitespace; a mismatch
/// here silently splits one order into duplicates, so trimming happens at
/// construction and nowhere else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trade-pair (cycle) identifier, unique across the lifetime of a pair set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairId(pub String);

impl PairId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_trims_surrounding_whitespace() {
        assert_eq!(OrderId::new("A1 "), OrderId::new("A1"));
        assert_eq!(OrderId::new("  A1"), OrderId::new("A1"));
        assert_eq!(OrderId::new("A1").as_str(), "A1");
    }

    #[test]
    fn order_id_interior_whitespace_kept() {
        assert_eq!(OrderId::new(" A 1 ").as_str(), "A 1");
    }
}
