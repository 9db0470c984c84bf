//! Reactive Node Storage
//!
//! A [`Node`] is one cell in a window's dependency graph: a signal holding a
//! value, or a computation (memo or effect) holding its function alongside
//! its last value. Nodes reference each other exclusively through [`NodeId`]
//! handles into the graph's arena; no `Rc` cycles, no locks.
//!
//! # Edge Bookkeeping
//!
//! Dependencies are stored as two mirrored pairs of lists:
//!
//! - `sources[i]` is a node this node read during its last run, and
//!   `source_slots[i]` is the position this node occupies in that source's
//!   `observers` list.
//! - `observers[j]` is a node that read this node, and `observer_slots[j]` is
//!   the position this node occupies in that observer's `sources` list.
//!
//! Keeping the back-pointers means an edge can be removed in O(1) with a
//! swap-remove from both sides; the graph module maintains the mirror
//! invariant whenever it moves an entry.
//!
//! # Ownership
//!
//! `children` lists every node created while this node's function ran,
//! signals included. When the node re-runs or is destroyed, that subtree is
//! destroyed with it, which is what keeps conditional UI branches from
//! leaking their state.

use smallvec::SmallVec;

use super::scope::Scope;
use super::value::Value;
use crate::error::NodeError;

/// Handle to a node in a window's reactive graph.
///
/// Generational: the slot index is reused after destruction, the generation
/// is not, so a handle kept across its node's destruction resolves to nothing
/// instead of to an unrelated node.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl std::fmt::Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeId({}v{})", self.index, self.generation)
    }
}

/// What a node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A plain value cell. Never executes; written from outside.
    Signal,

    /// A derived value. Re-runs when a source changes; fans out to its own
    /// observers only when the produced value differs.
    Memo,

    /// A side-effecting computation. Re-runs when a source changes; observes,
    /// is never observed.
    Effect,
}

/// Where a node stands relative to the work queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    /// Idle. The only state from which a node may be enqueued.
    Fresh,

    /// Sitting in the work queue; further invalidations are no-ops.
    Queued,

    /// Torn down. Never executes again; writes to it are dropped.
    Destroyed,
}

/// A computation body. Receives the execution scope and, for effects, the
/// value produced by the previous run.
pub(crate) type NodeFn =
    Box<dyn FnMut(&mut Scope<'_>, Option<Value>) -> Result<Value, NodeError> + Send>;

/// A teardown callback registered with `on_cleanup`.
pub(crate) type CleanupFn = Box<dyn FnOnce() + Send>;

/// An error-boundary handler registered with `on_error`.
pub(crate) type ErrorHandler = std::sync::Arc<dyn Fn(&mut Scope<'_>, &NodeError) + Send + Sync>;

/// A value stored in a node's context slot.
pub(crate) enum ContextEntry {
    /// A value provided with `provide_context`, shared down the subtree.
    Shared(std::sync::Arc<dyn std::any::Any + Send + Sync>),

    /// The error-boundary handler list, stored under the reserved key.
    ErrorHandlers(Vec<ErrorHandler>),
}

/// Context key reserved for error-boundary handlers.
pub(crate) const ERROR_CONTEXT_KEY: u32 = 0;

pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) state: UpdateState,

    /// Current value: the signal's cell, the memo's cache, or the effect's
    /// accumulator. `None` for computations that have not completed a run.
    pub(crate) value: Option<Value>,

    /// The computation body; `None` for signals, and taken out of the node
    /// for the duration of a run.
    pub(crate) func: Option<NodeFn>,

    /// Owning node, `None` only for the root.
    pub(crate) parent: Option<NodeId>,

    /// Distance from the root, for diagnostics.
    pub(crate) depth: u32,

    pub(crate) sources: SmallVec<[NodeId; 4]>,
    pub(crate) source_slots: SmallVec<[u32; 4]>,
    pub(crate) observers: SmallVec<[NodeId; 4]>,
    pub(crate) observer_slots: SmallVec<[u32; 4]>,

    /// Nodes created during this node's run, destroyed with it.
    pub(crate) children: SmallVec<[NodeId; 4]>,

    /// Callbacks run before the next run and on destruction.
    pub(crate) cleanups: Vec<CleanupFn>,

    /// Context entries provided on this node, keyed by interned context id.
    pub(crate) context: SmallVec<[(u32, ContextEntry); 2]>,
}

impl Node {
    /// A signal cell holding `value`.
    pub(crate) fn signal(value: Value, parent: Option<NodeId>, depth: u32) -> Self {
        Self {
            kind: NodeKind::Signal,
            state: UpdateState::Fresh,
            value: Some(value),
            func: None,
            parent,
            depth,
            sources: SmallVec::new(),
            source_slots: SmallVec::new(),
            observers: SmallVec::new(),
            observer_slots: SmallVec::new(),
            children: SmallVec::new(),
            cleanups: Vec::new(),
            context: SmallVec::new(),
        }
    }

    /// A memo or effect with body `func` and an optional seed value.
    pub(crate) fn computation(
        kind: NodeKind,
        func: NodeFn,
        value: Option<Value>,
        parent: Option<NodeId>,
        depth: u32,
    ) -> Self {
        Self {
            kind,
            state: UpdateState::Fresh,
            value,
            func: Some(func),
            parent,
            depth,
            sources: SmallVec::new(),
            source_slots: SmallVec::new(),
            observers: SmallVec::new(),
            observer_slots: SmallVec::new(),
            children: SmallVec::new(),
            cleanups: Vec::new(),
            context: SmallVec::new(),
        }
    }

    /// Find a context entry on this node.
    pub(crate) fn context_entry(&self, key: u32) -> Option<&ContextEntry> {
        self.context
            .iter()
            .find(|(entry_key, _)| *entry_key == key)
            .map(|(_, entry)| entry)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_nodes_start_fresh_with_empty_edges() {
        let node = Node::signal(Value::new(0_i32), None, 0);

        assert_eq!(node.kind, NodeKind::Signal);
        assert_eq!(node.state, UpdateState::Fresh);
        assert!(node.sources.is_empty());
        assert!(node.observers.is_empty());
        assert!(node.children.is_empty());
        assert!(node.func.is_none());
    }

    #[test]
    fn computations_carry_their_function() {
        let node = Node::computation(
            NodeKind::Memo,
            Box::new(|_, _| Ok(Value::new(1_i32))),
            None,
            None,
            3,
        );

        assert_eq!(node.kind, NodeKind::Memo);
        assert_eq!(node.depth, 3);
        assert!(node.func.is_some());
        assert!(node.value.is_none());
    }

    #[test]
    fn node_id_debug_shows_slot_and_generation() {
        let id = NodeId {
            index: 7,
            generation: 2,
        };
        assert_eq!(format!("{:?}", id), "NodeId(7v2)");
    }
}
