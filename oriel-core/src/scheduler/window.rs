//! Window - Per-Client Scheduling Unit
//!
//! A [`Window`] wraps one client session's [`Runtime`] with the state the
//! scheduler needs around it: the inbound input queue, the pending flags
//! the manager's two-tier loop reads, the liveness clock the sweeper
//! checks, and the destroy hooks observers register.
//!
//! The constructor drains the initial turn synchronously, so by the time a
//! window is visible to the manager its first render has been emitted and
//! its input handler (if the body installs one) is in place. Input arriving
//! immediately after connect therefore never races the initial render.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tracing::debug;

use crate::config::RuntimeConfig;
use crate::reactive::{BodyFn, Runtime, Scope};
use crate::session::{Frame, SessionParams, WindowId};

/// One client session scheduled by the window manager.
pub struct Window {
    id: WindowId,
    runtime: Runtime,
    input_queue: VecDeque<Vec<u8>>,
    pub(crate) has_pending_input: bool,
    pub(crate) has_pending_work: bool,
    connected: bool,
    last_pong: Instant,
    destroy_hooks: Vec<Box<dyn FnOnce(WindowId) + Send>>,
}

impl Window {
    /// Build the window and render its initial state. The runtime's first
    /// turn runs inside the constructor.
    pub fn new(
        id: WindowId,
        session: SessionParams,
        config: Arc<RuntimeConfig>,
        body: BodyFn,
        frames: UnboundedSender<Frame>,
    ) -> Self {
        let mut runtime = Runtime::new(id, session, config, body);
        runtime.set_frame_sink(Some(frames));
        runtime.process_work_queue();

        Self {
            id,
            runtime,
            input_queue: VecDeque::new(),
            has_pending_input: false,
            has_pending_work: false,
            connected: true,
            last_pong: Instant::now(),
            destroy_hooks: Vec::new(),
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    /// Whether a client connection is currently attached (or presumed
    /// attached; the sweeper flips this on pong silence).
    pub fn connected(&self) -> bool {
        self.connected
    }

    /// When the last pong arrived.
    pub fn last_pong(&self) -> Instant {
        self.last_pong
    }

    /// Whether the runtime hit an unhandled error that demands teardown.
    pub fn poisoned(&self) -> bool {
        self.runtime.is_poisoned()
    }

    /// Whether the runtime has queued work.
    pub fn pending_work(&self) -> bool {
        self.runtime.pending_work()
    }

    /// Run `f` against this window's reactive scope, outside any node.
    pub fn enter<R>(&mut self, f: impl FnOnce(&mut Scope<'_>) -> R) -> R {
        self.runtime.enter(f)
    }

    /// Register a hook to run when this window is destroyed.
    pub fn on_destroy(&mut self, hook: impl FnOnce(WindowId) + Send + 'static) {
        self.destroy_hooks.push(Box::new(hook));
    }

    // ------------------------------------------------------------------------
    // Scheduler interface
    // ------------------------------------------------------------------------

    pub(crate) fn enqueue_input_message(&mut self, payload: Vec<u8>) {
        self.input_queue.push_back(payload);
    }

    /// A pong proves the client is alive; it also revives a window the
    /// sweeper had given up on, as long as it still exists.
    pub(crate) fn register_pong(&mut self) {
        self.last_pong = Instant::now();
        self.connected = true;
    }

    /// Drain and dispatch every queued input event, in arrival order.
    pub(crate) fn schedule_input(&mut self) {
        while let Some(payload) = self.input_queue.pop_front() {
            self.runtime.dispatch_input(payload);
        }
        self.has_pending_input = false;
    }

    /// Drain the runtime's work queue to quiescence.
    pub(crate) fn schedule_work(&mut self) {
        self.has_pending_work = false;
        self.runtime.process_work_queue();
    }

    pub(crate) fn invoke(&mut self, f: Box<dyn FnOnce(&mut Scope<'_>) + Send>) {
        self.runtime.enter(|cx| f(cx));
    }

    pub(crate) fn send_ping(&mut self) {
        self.runtime.send_frame(Frame::Ping);
    }

    pub(crate) fn flush_block_delete_queue(&mut self) {
        self.runtime.flush_deletes();
    }

    /// The transport went away: detach the sink and stop assuming a client.
    pub(crate) fn disconnect(&mut self) {
        self.connected = false;
        self.runtime.set_frame_sink(None);
    }

    /// Sweeper verdict: pong silence crossed the disconnect threshold.
    pub(crate) fn mark_disconnected(&mut self) {
        self.connected = false;
    }

    /// A known client reattached: rebind the frame sink, adopt the new
    /// session parameters and restart the liveness clock.
    pub(crate) fn reconnect(&mut self, session: SessionParams, frames: UnboundedSender<Frame>) {
        debug!(window = %self.id, "client reconnected");
        self.runtime.set_session(session);
        self.runtime.set_frame_sink(Some(frames));
        self.connected = true;
        self.last_pong = Instant::now();
    }

    /// Tear the runtime down and fire the destroy hooks. The manager
    /// removes the window from its map before calling this, so it runs at
    /// most once.
    pub(crate) fn destroy(&mut self) {
        self.runtime.teardown();
        self.runtime.set_frame_sink(None);
        self.input_queue.clear();
        for hook in self.destroy_hooks.drain(..) {
            hook(self.id);
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
