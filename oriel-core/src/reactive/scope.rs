//! Execution Scope
//!
//! A [`Scope`] is the handle passed into every reactive closure. It names
//! the node that owns whatever the closure creates and borrows the runtime
//! that closure is running inside, so all graph operations flow through an
//! explicit parameter rather than ambient state.
//!
//! Scopes are created by the runtime when it executes a node, dispatches an
//! input event or runs an error handler. User code never constructs one.

use crate::reactive::node::{NodeFn, NodeId, NodeKind, UpdateState};
use crate::reactive::runtime::{Runtime, TrackingGuard};
use crate::reactive::value::Value;
use crate::session::{SessionParams, WindowId};

/// Execution context for one reactive closure run.
pub struct Scope<'a> {
    pub(crate) rt: &'a mut Runtime,
    pub(crate) owner: NodeId,
}

impl<'a> Scope<'a> {
    /// Run `f` with dependency tracking suspended: reads inside it do not
    /// subscribe the owning node. The previous tracking state is restored
    /// on every exit path, nested calls and panicking closures included.
    pub fn untrack<R>(&mut self, f: impl FnOnce(&mut Scope<'_>) -> R) -> R {
        let owner = self.owner;
        let mut guard = TrackingGuard::untracked(self.rt);
        let mut inner = Scope {
            rt: &mut *guard.rt,
            owner,
        };
        f(&mut inner)
    }

    /// Register a cleanup on the owning node. It runs exactly once, before
    /// the owner's next re-execution or on its destruction, whichever comes
    /// first. If the owner is already gone the cleanup runs immediately.
    pub fn on_cleanup(&mut self, f: impl FnOnce() + Send + 'static) {
        match self.rt.graph.get_mut(self.owner) {
            Some(node) if node.state != UpdateState::Destroyed => {
                node.cleanups.push(Box::new(f));
            }
            _ => f(),
        }
    }

    /// The window this scope belongs to.
    pub fn window_id(&self) -> WindowId {
        self.rt.window_id
    }

    /// Session parameters of the current connection.
    pub fn session(&self) -> &SessionParams {
        &self.rt.session
    }

    /// Queue a binary update frame for delivery to the client. Dropped with
    /// a trace log when no connection is attached.
    pub fn push_buffer(&mut self, payload: Vec<u8>) {
        self.rt.send_buffer(payload);
    }

    /// Record a client-side block deletion to acknowledge. Acks are batched
    /// and flushed by the lifecycle sweeper.
    pub fn enqueue_block_delete(&mut self, block_id: u32) {
        self.rt.delete_queue.push(block_id);
    }

    /// Install the handler invoked for every client input event delivered
    /// to this window. Replaces any previous handler.
    pub fn set_input_handler(
        &mut self,
        handler: impl FnMut(&mut Scope<'_>, Vec<u8>) + Send + 'static,
    ) {
        self.rt.input_handler = Some(Box::new(handler));
    }

    /// Create a computation node owned by this scope and queue its first
    /// run. Shared by the memo and effect constructors.
    pub(crate) fn spawn_node(&mut self, kind: NodeKind, func: NodeFn, value: Option<Value>) -> NodeId {
        self.rt.spawn_node(kind, func, value, self.owner)
    }
}
