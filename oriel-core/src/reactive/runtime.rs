//! Reactive Runtime
//!
//! One [`Runtime`] holds the complete reactive state of a single window:
//! the node arena, the work queue and the small amount of execution state
//! (tracking flag, input handler, outbound frame sink) that node closures
//! touch while they run.
//!
//! # How a Turn Works
//!
//! 1. Something invalidates a node: a signal write, an input event or the
//!    node's own creation. The node moves `Fresh -> Queued` and lands on
//!    the FIFO work queue; nodes already queued or destroyed are skipped.
//!
//! 2. [`Runtime::process_work_queue`] pops until the queue is empty. Each
//!    popped node is cleaned (sources unlinked, cleanups run, owned
//!    children destroyed) and its closure re-executed with tracking on, so
//!    the dependency set rebuilds from exactly the reads that happened.
//!
//! 3. A memo whose fresh value differs from the stored one queues its
//!    observers before the drain continues. Effects never fan out.
//!
//! 4. When the queue is empty the turn ends and tombstoned slots are
//!    reclaimed.
//!
//! # Errors
//!
//! A closure returning `Err` routes the error to the nearest node up the
//! ownership chain (starting at the failing node itself) that registered
//! error handlers. Unhandled errors are logged; configuration decides
//! whether they additionally poison the runtime so the scheduler tears the
//! window down.
//!
//! # Thread Safety
//!
//! A runtime is owned by exactly one scheduler task and is never shared.
//! It is `Send` so the owning task can migrate across worker threads.

use std::sync::Arc;
use std::time::Instant;

use smallvec::{smallvec, SmallVec};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, trace};

use crate::config::RuntimeConfig;
use crate::error::NodeError;
use crate::reactive::graph::ReactiveGraph;
use crate::reactive::node::{
    ContextEntry, ErrorHandler, Node, NodeFn, NodeId, NodeKind, UpdateState, ERROR_CONTEXT_KEY,
};
use crate::reactive::queue::WorkQueue;
use crate::reactive::scope::Scope;
use crate::reactive::value::Value;
use crate::session::{Frame, SessionParams, WindowId};

/// Application entrypoint: runs under the root node when a window is
/// created, and again whenever the root is re-executed.
pub type BodyFn = Arc<dyn Fn(&mut Scope<'_>) + Send + Sync>;

pub(crate) type InputHandler = Box<dyn FnMut(&mut Scope<'_>, Vec<u8>) + Send>;

/// Reactive engine instance for one window.
pub struct Runtime {
    pub(crate) window_id: WindowId,
    pub(crate) session: SessionParams,
    pub(crate) config: Arc<RuntimeConfig>,
    pub(crate) graph: ReactiveGraph,
    pub(crate) queue: WorkQueue,
    pub(crate) root: NodeId,
    pub(crate) tracking: bool,
    pub(crate) poisoned: bool,
    pub(crate) frames: Option<UnboundedSender<Frame>>,
    pub(crate) input_handler: Option<InputHandler>,
    pub(crate) delete_queue: Vec<u32>,
}

impl Runtime {
    /// Build a runtime whose root node wraps `body`. The root is queued but
    /// not yet executed; the first [`Self::process_work_queue`] call renders
    /// the initial state.
    pub fn new(
        window_id: WindowId,
        session: SessionParams,
        config: Arc<RuntimeConfig>,
        body: BodyFn,
    ) -> Self {
        let mut rt = Self {
            window_id,
            session,
            config,
            graph: ReactiveGraph::new(),
            queue: WorkQueue::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            tracking: false,
            poisoned: false,
            frames: None,
            input_handler: None,
            delete_queue: Vec::new(),
        };

        let func: NodeFn = Box::new(move |cx, _prev| {
            body(cx);
            Ok(Value::new(()))
        });
        let root = rt
            .graph
            .insert(Node::computation(NodeKind::Effect, func, None, None, 0));
        rt.root = root;
        rt.submit_work(root);
        rt
    }

    /// Queue a node for execution. `Fresh` nodes transition to `Queued`;
    /// a `Queued` node is already pending and is left alone, so a node
    /// appears on the queue at most once. Submitting a `Destroyed` node is
    /// a bug in the caller.
    pub(crate) fn submit_work(&mut self, id: NodeId) {
        if let Some(node) = self.graph.get_mut(id) {
            debug_assert!(
                node.state != UpdateState::Destroyed,
                "destroyed node submitted for work"
            );
            if node.state == UpdateState::Fresh {
                node.state = UpdateState::Queued;
                self.queue.push(id);
            }
        }
    }

    /// Drain the work queue to quiescence, then reclaim tombstoned slots.
    /// Returns the number of nodes executed.
    pub fn process_work_queue(&mut self) -> usize {
        let started = Instant::now();
        let mut executed = 0_usize;
        while let Some(id) = self.queue.pop() {
            self.execute_node(id);
            executed += 1;
        }
        let reclaimed = self.graph.reclaim();
        if executed > 0 {
            trace!(
                window = %self.window_id,
                executed,
                reclaimed,
                elapsed_us = started.elapsed().as_micros() as u64,
                "drained work queue"
            );
        }
        executed
    }

    /// Whether any node is waiting to run.
    pub fn pending_work(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Nodes currently stored, tombstones included.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Set when an unhandled error occurred and configuration demands the
    /// window be destroyed for it.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Run `f` in a scope owned by the root node, with tracking off. This
    /// is how code outside any node closure (connection handlers, tests)
    /// reaches the reactive API.
    pub fn enter<R>(&mut self, f: impl FnOnce(&mut Scope<'_>) -> R) -> R {
        let root = self.root;
        let mut guard = TrackingGuard::untracked(self);
        let mut scope = Scope {
            rt: &mut *guard.rt,
            owner: root,
        };
        f(&mut scope)
    }

    // ------------------------------------------------------------------------
    // Node execution
    // ------------------------------------------------------------------------

    fn execute_node(&mut self, id: NodeId) {
        // Destroyed earlier in this drain: skip the corpse.
        let kind = match self.graph.get(id) {
            Some(node) if node.state != UpdateState::Destroyed => node.kind,
            _ => return,
        };

        self.clean_node(id);

        let (func, prev) = match self.graph.get_mut(id) {
            Some(node) => {
                let func = node.func.take();
                // Effects thread their previous value back in as the
                // accumulator; memos always recompute from scratch.
                let prev = match kind {
                    NodeKind::Effect => node.value.take(),
                    _ => None,
                };
                (func, prev)
            }
            None => return,
        };
        let Some(mut func) = func else { return };

        let result = {
            let mut guard = TrackingGuard::tracked(self);
            let mut scope = Scope {
                rt: &mut *guard.rt,
                owner: id,
            };
            func(&mut scope, prev)
        };

        match result {
            Ok(value) => {
                let changed = match self.graph.get_mut(id) {
                    Some(node) if node.state != UpdateState::Destroyed => {
                        node.func = Some(func);
                        let changed = match kind {
                            NodeKind::Memo => node
                                .value
                                .as_ref()
                                .map(|old| !old.equals(&value))
                                .unwrap_or(true),
                            _ => false,
                        };
                        node.value = Some(value);
                        changed
                    }
                    _ => false,
                };
                if changed {
                    self.invalidate_observers(id);
                }
            }
            Err(err) => {
                if let Some(node) = self.graph.get_mut(id) {
                    if node.state != UpdateState::Destroyed {
                        node.func = Some(func);
                    }
                }
                self.handle_error(id, err);
            }
        }
    }

    /// Queue every current observer of `id`, in subscription order.
    fn invalidate_observers(&mut self, id: NodeId) {
        let observers: SmallVec<[NodeId; 8]> = match self.graph.get(id) {
            Some(node) => node.observers.iter().copied().collect(),
            None => return,
        };
        for observer in observers {
            self.submit_work(observer);
        }
    }

    /// Store a new signal value, fanning out to observers when it differs
    /// from the current one. Writes to destroyed or reclaimed nodes are
    /// dropped.
    pub(crate) fn write_value(&mut self, id: NodeId, value: Value) {
        let changed = match self.graph.get_mut(id) {
            Some(node) if node.state != UpdateState::Destroyed => match node.value.as_ref() {
                Some(current) if current.equals(&value) => false,
                _ => {
                    node.value = Some(value);
                    true
                }
            },
            _ => {
                trace!(window = %self.window_id, node = ?id, "write to destroyed node dropped");
                false
            }
        };
        if changed {
            self.invalidate_observers(id);
        }
    }

    /// Record a read edge while tracking is on.
    pub(crate) fn register_dependency(&mut self, source: NodeId, observer: NodeId) {
        if self.tracking {
            self.graph.link(source, observer);
        }
    }

    // ------------------------------------------------------------------------
    // Cleaning and destruction
    // ------------------------------------------------------------------------

    /// Return a node to its pre-execution state: unlink its sources, run
    /// its cleanups and destroy everything it owns. The node itself stays
    /// alive and becomes `Fresh` unless it was already destroyed.
    pub(crate) fn clean_node(&mut self, id: NodeId) {
        self.graph.unlink_sources(id);

        let cleanups = match self.graph.get_mut(id) {
            Some(node) => std::mem::take(&mut node.cleanups),
            None => return,
        };
        for cleanup in cleanups {
            cleanup();
        }

        let children = match self.graph.get_mut(id) {
            Some(node) => std::mem::take(&mut node.children),
            None => return,
        };
        for child in children {
            self.destroy_node(child);
        }

        if let Some(node) = self.graph.get_mut(id) {
            if node.state != UpdateState::Destroyed {
                node.state = UpdateState::Fresh;
            }
        }
    }

    /// Destroy a node and its entire ownership subtree, depth first. Each
    /// node is marked destroyed, unhooked from its sources and has its
    /// cleanups run; the slots are freed at the end of the turn.
    pub(crate) fn destroy_node(&mut self, id: NodeId) {
        let mut stack: SmallVec<[NodeId; 16]> = smallvec![id];
        while let Some(current) = stack.pop() {
            let children = self.destroy_one(current);
            // Reversed so the first child is processed first.
            stack.extend(children.into_iter().rev());
        }
    }

    fn destroy_one(&mut self, id: NodeId) -> SmallVec<[NodeId; 4]> {
        if !self.graph.mark_destroyed(id) {
            return SmallVec::new();
        }
        self.graph.unlink_sources(id);

        let cleanups = match self.graph.get_mut(id) {
            Some(node) => std::mem::take(&mut node.cleanups),
            None => return SmallVec::new(),
        };
        for cleanup in cleanups {
            cleanup();
        }

        match self.graph.get_mut(id) {
            Some(node) => std::mem::take(&mut node.children),
            None => SmallVec::new(),
        }
    }

    /// Destroy the whole graph from the root down. Called once when the
    /// window is destroyed.
    pub(crate) fn teardown(&mut self) {
        let root = self.root;
        self.destroy_node(root);
        self.queue.clear();
        let reclaimed = self.graph.reclaim();
        trace!(window = %self.window_id, reclaimed, "runtime torn down");
    }

    // ------------------------------------------------------------------------
    // Node creation
    // ------------------------------------------------------------------------

    /// Insert a computation node owned by `owner` and queue its first run.
    /// When the owner is already gone the node is born destroyed and never
    /// executes.
    pub(crate) fn spawn_node(
        &mut self,
        kind: NodeKind,
        func: NodeFn,
        value: Option<Value>,
        owner: NodeId,
    ) -> NodeId {
        let depth = match self.graph.get(owner) {
            Some(node) if node.state != UpdateState::Destroyed => node.depth + 1,
            _ => {
                debug!(window = %self.window_id, "computation created under a destroyed owner");
                let id = self
                    .graph
                    .insert(Node::computation(kind, func, value, None, 0));
                self.graph.mark_destroyed(id);
                return id;
            }
        };

        let id = self
            .graph
            .insert(Node::computation(kind, func, value, Some(owner), depth));
        if let Some(node) = self.graph.get_mut(owner) {
            node.children.push(id);
        }
        self.submit_work(id);
        id
    }

    /// Insert a signal node owned by `owner`. Signals hold state only and
    /// are never queued.
    pub(crate) fn spawn_signal(&mut self, value: Value, owner: NodeId) -> NodeId {
        let depth = match self.graph.get(owner) {
            Some(node) if node.state != UpdateState::Destroyed => node.depth + 1,
            _ => {
                debug!(window = %self.window_id, "signal created under a destroyed owner");
                let id = self.graph.insert(Node::signal(value, None, 0));
                self.graph.mark_destroyed(id);
                return id;
            }
        };

        let id = self.graph.insert(Node::signal(value, Some(owner), depth));
        if let Some(node) = self.graph.get_mut(owner) {
            node.children.push(id);
        }
        id
    }

    // ------------------------------------------------------------------------
    // Error routing
    // ------------------------------------------------------------------------

    /// Route an error from `origin` to the nearest registered handlers up
    /// the ownership chain. Handlers run untracked, owned by the failing
    /// node, in registration order. With no handler anywhere the error is
    /// logged and, if configured, the runtime is poisoned.
    pub(crate) fn handle_error(&mut self, origin: NodeId, err: NodeError) {
        match self.find_error_handlers(origin) {
            Some(handlers) => {
                let mut guard = TrackingGuard::untracked(self);
                for handler in handlers.iter() {
                    let mut scope = Scope {
                        rt: &mut *guard.rt,
                        owner: origin,
                    };
                    handler(&mut scope, &err);
                }
            }
            None => {
                error!(window = %self.window_id, error = %err, "unhandled error in reactive node");
                if self.config.destroy_window_on_unhandled_error {
                    self.poisoned = true;
                }
            }
        }
    }

    fn find_error_handlers(&self, origin: NodeId) -> Option<Vec<ErrorHandler>> {
        let mut cursor = Some(origin);
        while let Some(id) = cursor {
            let node = self.graph.get(id)?;
            if let Some(ContextEntry::ErrorHandlers(handlers)) =
                node.context_entry(ERROR_CONTEXT_KEY)
            {
                if !handlers.is_empty() {
                    return Some(handlers.clone());
                }
            }
            cursor = node.parent;
        }
        None
    }

    // ------------------------------------------------------------------------
    // Input and outbound frames
    // ------------------------------------------------------------------------

    /// Run the installed input handler for one event. Events arriving with
    /// no handler installed are dropped with a debug log.
    pub(crate) fn dispatch_input(&mut self, payload: Vec<u8>) {
        let Some(mut handler) = self.input_handler.take() else {
            debug!(
                window = %self.window_id,
                bytes = payload.len(),
                "input event dropped, no handler installed"
            );
            return;
        };

        let root = self.root;
        {
            let mut guard = TrackingGuard::untracked(self);
            let mut scope = Scope {
                rt: &mut *guard.rt,
                owner: root,
            };
            handler(&mut scope, payload);
        }

        // Put the handler back unless the closure installed a replacement.
        if self.input_handler.is_none() {
            self.input_handler = Some(handler);
        }
    }

    pub(crate) fn set_frame_sink(&mut self, sink: Option<UnboundedSender<Frame>>) {
        self.frames = sink;
    }

    pub(crate) fn set_session(&mut self, session: SessionParams) {
        self.session = session;
    }

    pub(crate) fn send_frame(&mut self, frame: Frame) {
        match &self.frames {
            Some(tx) => {
                if tx.send(frame).is_err() {
                    trace!(window = %self.window_id, "frame receiver gone, dropping");
                    self.frames = None;
                }
            }
            None => {
                trace!(window = %self.window_id, "no connection attached, frame dropped");
            }
        }
    }

    pub(crate) fn send_buffer(&mut self, payload: Vec<u8>) {
        self.send_frame(Frame::Buffer(payload));
    }

    /// Flush batched block-delete acknowledgements as a single frame.
    pub(crate) fn flush_deletes(&mut self) {
        if self.delete_queue.is_empty() {
            return;
        }
        let acks = std::mem::take(&mut self.delete_queue);
        self.send_frame(Frame::DeleteAcks(acks));
    }
}

/// Scoped switch for the runtime's dependency-tracking flag. The previous
/// state comes back when the guard drops, during unwinding included, so a
/// panicking closure cannot leave tracking stuck.
pub(crate) struct TrackingGuard<'a> {
    pub(crate) rt: &'a mut Runtime,
    prev: bool,
}

impl<'a> TrackingGuard<'a> {
    /// Enable dependency registration for the guard's lifetime.
    pub(crate) fn tracked(rt: &'a mut Runtime) -> Self {
        let prev = std::mem::replace(&mut rt.tracking, true);
        TrackingGuard { rt, prev }
    }

    /// Suspend dependency registration for the guard's lifetime.
    pub(crate) fn untracked(rt: &'a mut Runtime) -> Self {
        let prev = std::mem::replace(&mut rt.tracking, false);
        TrackingGuard { rt, prev }
    }
}

impl Drop for TrackingGuard<'_> {
    fn drop(&mut self) {
        self.rt.tracking = self.prev;
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
