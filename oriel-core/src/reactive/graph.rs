//! Dependency Graph Arena
//!
//! All nodes of one window live in a [`ReactiveGraph`]: a generational arena
//! plus the edge operations that keep the dependency bookkeeping consistent.
//!
//! # How Edges Are Removed
//!
//! Every edge is stored twice (see the lists on
//! [`Node`](super::node::Node)), and each side remembers its position on the
//! other side. Removing a node from a source's observer list is a
//! swap-remove: pop the last observer, and if the removed entry was not the
//! last one, drop the popped entry into the freed position and rewrite its
//! back-pointer. One O(1) step per edge, no scanning.
//!
//! The dance has one subtle case: the popped observer can be the unlinking
//! node itself when it observed the same source more than once. The lists
//! are therefore edited strictly in place, never moved out of the node.
//!
//! # Destruction
//!
//! Destroying a node marks its slot and records it as a tombstone; the slot
//! keeps its contents until [`ReactiveGraph::reclaim`] runs at the end of a
//! scheduler turn. Handles popped from the work queue mid-turn can therefore
//! still observe that the node is destroyed and skip it, and only afterwards
//! is the storage freed and the generation bumped so stale handles resolve
//! to nothing.

use super::node::{Node, NodeId, UpdateState};

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Generational arena holding one window's reactive nodes.
pub(crate) struct ReactiveGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    tombstones: Vec<u32>,
}

impl ReactiveGraph {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            tombstones: Vec::new(),
        }
    }

    /// Store a node, reusing a freed slot when one exists.
    pub(crate) fn insert(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                debug_assert!(slot.node.is_none(), "free list pointed at an occupied slot");
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    /// Resolve a handle. Stale generations and reclaimed slots yield `None`;
    /// tombstoned nodes still resolve until the next `reclaim`.
    pub(crate) fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    /// Number of nodes currently stored, tombstones included.
    pub(crate) fn node_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    /// Record that `observer` read `source`, mirroring the edge on both
    /// sides. Reading the same source again records a second edge; the
    /// removal dance copes with duplicates.
    pub(crate) fn link(&mut self, source: NodeId, observer: NodeId) {
        let observer_position = match self.get(source) {
            Some(node) => node.observers.len() as u32,
            None => return,
        };

        let source_position = match self.get_mut(observer) {
            Some(node) => {
                node.sources.push(source);
                node.source_slots.push(observer_position);
                (node.sources.len() - 1) as u32
            }
            None => return,
        };

        if let Some(node) = self.get_mut(source) {
            node.observers.push(observer);
            node.observer_slots.push(source_position);
        }
    }

    /// Sever every source edge of `id`, restoring the mirror invariant on
    /// each source it leaves. Sources that were already reclaimed are
    /// skipped.
    pub(crate) fn unlink_sources(&mut self, id: NodeId) {
        loop {
            // Pop one (source, our position there) pair off the node.
            let (source, position) = {
                let Some(node) = self.get_mut(id) else { return };
                match (node.sources.pop(), node.source_slots.pop()) {
                    (Some(source), Some(position)) => (source, position),
                    _ => return,
                }
            };

            // Swap-remove our entry from the source's observer list. If the
            // popped entry was not ours, it moves into our position and we
            // must retarget its back-pointer afterwards.
            let moved = match self.get_mut(source) {
                Some(node) => match (node.observers.pop(), node.observer_slots.pop()) {
                    (Some(last_observer), Some(last_slot)) => {
                        let position = position as usize;
                        if position < node.observers.len() {
                            node.observers[position] = last_observer;
                            node.observer_slots[position] = last_slot;
                            Some((last_observer, last_slot, position as u32))
                        } else {
                            None
                        }
                    }
                    _ => None,
                },
                None => None,
            };

            if let Some((observer, slot, position)) = moved {
                if let Some(node) = self.get_mut(observer) {
                    if let Some(entry) = node.source_slots.get_mut(slot as usize) {
                        *entry = position;
                    }
                }
            }
        }
    }

    /// Mark a node destroyed and tombstone its slot. Returns whether the
    /// node was live; repeated destruction is a no-op.
    pub(crate) fn mark_destroyed(&mut self, id: NodeId) -> bool {
        let Some(slot) = self.slots.get_mut(id.index as usize) else {
            return false;
        };
        if slot.generation != id.generation {
            return false;
        }
        match slot.node.as_mut() {
            Some(node) if node.state != UpdateState::Destroyed => {
                node.state = UpdateState::Destroyed;
                self.tombstones.push(id.index);
                true
            }
            _ => false,
        }
    }

    /// Free all tombstoned slots and bump their generations. Called at turn
    /// boundaries only, so in-flight handles keep resolving mid-turn.
    /// Returns how many slots were reclaimed.
    pub(crate) fn reclaim(&mut self) -> usize {
        let reclaimed = self.tombstones.len();
        while let Some(index) = self.tombstones.pop() {
            let slot = &mut self.slots[index as usize];
            if slot.node.is_some() {
                slot.node = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index);
            }
        }
        reclaimed
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
