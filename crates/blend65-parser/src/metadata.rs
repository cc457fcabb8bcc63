//! Optimization metadata attached to AST nodes and IL instructions.
//!
//! Analyses communicate through an enumerated key space with a small value
//! union. Missing metadata is always a valid, conservative answer; no
//! consumer may require a key to be present.

use crate::ast::NodeId;
use rustc_hash::FxHashMap;

/// Enumerated metadata keys. Each analysis owns its own key prefix and is
/// the only writer for those keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaKey {
    // Definite assignment
    DefiniteAssignmentAlwaysInitialized,
    DefiniteAssignmentInitValue,

    // Variable usage
    UsageReadCount,
    UsageWriteCount,
    UsageHotPathCount,
    UsageDeadStore,

    // Purity
    PurityLevel,
    PurityHasSideEffects,
    PurityWrittenLocations,
    PurityCalledFunctions,

    // Call graph
    CallGraphCallCount,
    CallGraphInlineCandidate,
    CallGraphRecursive,
    CallGraphFunctionSize,

    // Loop analysis
    LoopInvariant,
    LoopDepth,

    // Global value numbering
    GVNNumber,
    GVNRedundant,
    GVNReplacement,

    // Common subexpression elimination
    CSEAvailable,
    CSECandidate,

    // Expression complexity
    ExprComplexityScore,
    ExprRegisterPressure,
    ExprTreeDepth,
    ExprContainsMemoryAccess,

    // Dead code
    DeadCodeUnreachable,
    DeadCodeKind,
    DeadCodeReason,
    DeadCodeRemovable,
}

/// Metadata values. Deliberately small: analyses that need structure
/// encode it as a name list.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Str(String),
    Names(Vec<String>),
}

impl MetaValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetaValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetaValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_names(&self) -> Option<&[String]> {
        match self {
            MetaValue::Names(names) => Some(names),
            _ => None,
        }
    }
}

/// Metadata attached to a single node or instruction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataMap {
    entries: FxHashMap<MetaKey, MetaValue>,
}

impl MetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: MetaKey, value: MetaValue) {
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: MetaKey) -> Option<&MetaValue> {
        self.entries.get(&key)
    }

    pub fn get_bool(&self, key: MetaKey) -> Option<bool> {
        self.get(key).and_then(MetaValue::as_bool)
    }

    pub fn get_int(&self, key: MetaKey) -> Option<i64> {
        self.get(key).and_then(MetaValue::as_int)
    }

    pub fn get_str(&self, key: MetaKey) -> Option<&str> {
        self.get(key).and_then(MetaValue::as_str)
    }

    pub fn contains(&self, key: MetaKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MetaKey, &MetaValue)> {
        self.entries.iter()
    }
}

/// Side table holding metadata for AST nodes, keyed by [`NodeId`].
///
/// The AST stays immutable after parsing; analyses append here instead.
#[derive(Debug, Default)]
pub struct MetadataStore {
    nodes: FxHashMap<NodeId, MetadataMap>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one key on one node.
    pub fn set(&mut self, node: NodeId, key: MetaKey, value: MetaValue) {
        self.nodes.entry(node).or_default().set(key, value);
    }

    /// All metadata for a node, if any analysis touched it.
    pub fn node(&self, node: NodeId) -> Option<&MetadataMap> {
        self.nodes.get(&node)
    }

    pub fn get(&self, node: NodeId, key: MetaKey) -> Option<&MetaValue> {
        self.nodes.get(&node).and_then(|m| m.get(key))
    }

    pub fn get_bool(&self, node: NodeId, key: MetaKey) -> Option<bool> {
        self.get(node, key).and_then(MetaValue::as_bool)
    }

    pub fn get_int(&self, node: NodeId, key: MetaKey) -> Option<i64> {
        self.get(node, key).and_then(MetaValue::as_int)
    }

    pub fn get_str(&self, node: NodeId, key: MetaKey) -> Option<&str> {
        self.get(node, key).and_then(MetaValue::as_str)
    }

    /// Number of nodes with at least one metadata entry.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Snapshot of all (node, key, value) triples, sorted by node id then
    /// key debug name. Used by tests checking orchestrator idempotence.
    pub fn snapshot(&self) -> Vec<(NodeId, String, MetaValue)> {
        let mut out: Vec<(NodeId, String, MetaValue)> = self
            .nodes
            .iter()
            .flat_map(|(node, map)| {
                map.iter()
                    .map(|(k, v)| (*node, format!("{:?}", k), v.clone()))
            })
            .collect();
        out.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_metadata_is_none() {
        let store = MetadataStore::new();
        assert!(store.get(NodeId::new(1), MetaKey::GVNNumber).is_none());
    }

    #[test]
    fn test_set_and_get() {
        let mut store = MetadataStore::new();
        let node = NodeId::new(7);
        store.set(node, MetaKey::GVNNumber, MetaValue::Int(3));
        store.set(node, MetaKey::GVNRedundant, MetaValue::Bool(true));
        assert_eq!(store.get_int(node, MetaKey::GVNNumber), Some(3));
        assert_eq!(store.get_bool(node, MetaKey::GVNRedundant), Some(true));
    }

    #[test]
    fn test_snapshot_is_stable() {
        let mut store = MetadataStore::new();
        store.set(NodeId::new(2), MetaKey::ExprTreeDepth, MetaValue::Int(1));
        store.set(NodeId::new(1), MetaKey::ExprTreeDepth, MetaValue::Int(4));
        let a = store.snapshot();
        let b = store.snapshot();
        assert_eq!(a, b);
        assert_eq!(a[0].0, NodeId::new(1));
    }
}
