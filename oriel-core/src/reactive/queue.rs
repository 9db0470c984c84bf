//! Work Queue
//!
//! FIFO of nodes awaiting re-execution. Enqueue order is execution order;
//! the dedup that keeps a node from being queued twice lives in the node
//! state machine (`Fresh` -> `Queued`), not here.

use std::collections::VecDeque;

use super::node::NodeId;

#[derive(Default)]
pub(crate) struct WorkQueue {
    items: VecDeque<NodeId>,
}

impl WorkQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, id: NodeId) {
        self.items.push_back(id);
    }

    pub(crate) fn pop(&mut self) -> Option<NodeId> {
        self.items.pop_front()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
