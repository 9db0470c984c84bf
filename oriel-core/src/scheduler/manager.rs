//! Window Manager - Global Cooperative Scheduler
//!
//! One manager task owns every window in the process and serializes all
//! access to them through an event channel: connections, inbound messages,
//! closures to run inside a window, sweep ticks. Nothing else ever touches
//! a `Window`, which is what lets the runtimes stay lock-free.
//!
//! # How the Loop Works
//!
//! 1. Drain the event channel without blocking and apply each event.
//!    Events mutate state and mark windows input-pending or work-pending;
//!    they never execute user code beyond the connect render.
//!
//! 2. Service one input-pending window: dispatch its queued input events,
//!    then drain the work they produced. Input always goes first so a
//!    busy process stays responsive to clicks.
//!
//! 3. Otherwise service one work-pending window: drain its work queue.
//!
//! 4. Otherwise park on the channel until the next event arrives.
//!
//! Between windows the task yields, so other tasks on the runtime are
//! never starved by a burst of updates. A window appears at most once per
//! pending list; the flags on the window dedupe repeated marks.
//!
//! # Admission
//!
//! Inbound messages pass a per-window rate limiter and a size cap before
//! they are looked at; connects and reconnects pass a per-origin creation
//! limiter. Rejected connects answer with the protocol close codes, and
//! rejected messages are dropped with a log line.

use std::collections::VecDeque;
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::RuntimeConfig;
use crate::error::ConnectError;
use crate::reactive::{BodyFn, Scope};
use crate::scheduler::limiter::RateLimiter;
use crate::scheduler::sweeper::{assess, current_rss_bytes};
use crate::scheduler::window::Window;
use crate::session::{CloseCode, Frame, SessionParams, WindowId, PONG_COMMAND};

/// Events accepted by the manager task.
pub enum ManagerEvent {
    /// A client connected. `window` carries the id it presented, if any;
    /// the reply channel answers with the bound id or a close code.
    Connect {
        window: Option<WindowId>,
        params: SessionParams,
        origin: String,
        frames: UnboundedSender<Frame>,
        reply: oneshot::Sender<Result<WindowId, CloseCode>>,
    },

    /// An inbound message for a window, pong or input event.
    Message { window: WindowId, payload: Vec<u8> },

    /// The transport for a window went away.
    Disconnect { window: WindowId },

    /// Run a closure inside a window's reactive scope.
    Invoke {
        window: WindowId,
        f: Box<dyn FnOnce(&mut Scope<'_>) + Send>,
    },

    /// Tear one window down now.
    DestroyWindow { window: WindowId },

    /// Periodic lifecycle sweep.
    SweepTick,

    /// Destroy every window and stop the loop.
    Shutdown,
}

/// Owns all windows and runs the scheduling loop.
pub struct WindowManager {
    windows: IndexMap<WindowId, Window>,
    pending_input: VecDeque<WindowId>,
    pending_work: VecDeque<WindowId>,
    events_rx: UnboundedReceiver<ManagerEvent>,
    events_tx: UnboundedSender<ManagerEvent>,
    message_limiter: RateLimiter<WindowId>,
    creation_limiter: RateLimiter<String>,
    config: Arc<RuntimeConfig>,
    body: BodyFn,
    destroy_hook: Option<Box<dyn FnMut(WindowId) + Send>>,
    memory_probe: Box<dyn Fn() -> u64 + Send>,
    shutting_down: bool,
}

impl WindowManager {
    /// Build a manager running `body` as the entrypoint of every window.
    /// The manager does nothing until [`Self::run`] is awaited.
    pub fn new(config: RuntimeConfig, body: BodyFn) -> (Self, ManagerHandle) {
        let config = Arc::new(config);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let manager = Self {
            windows: IndexMap::new(),
            pending_input: VecDeque::new(),
            pending_work: VecDeque::new(),
            events_rx,
            events_tx: events_tx.clone(),
            message_limiter: RateLimiter::new(
                config.input_rate_threshold,
                config.input_rate_ttl(),
            ),
            creation_limiter: RateLimiter::new(
                config.creation_rate_threshold,
                config.creation_rate_ttl(),
            ),
            config,
            body,
            destroy_hook: None,
            memory_probe: Box::new(current_rss_bytes),
            shutting_down: false,
        };
        let handle = ManagerHandle { tx: events_tx };
        (manager, handle)
    }

    /// Register a hook called after each window is destroyed, with its id.
    pub fn on_window_destroy(&mut self, hook: impl FnMut(WindowId) + Send + 'static) {
        self.destroy_hook = Some(Box::new(hook));
    }

    /// Replace the process memory gauge used by the sweep. Intended for
    /// tests and embeddings with their own accounting.
    pub fn set_memory_probe(&mut self, probe: impl Fn() -> u64 + Send + 'static) {
        self.memory_probe = Box::new(probe);
    }

    /// Windows currently alive.
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Run the scheduling loop until shutdown. Consumes the manager; all
    /// further interaction goes through the [`ManagerHandle`].
    pub async fn run(mut self) {
        let sweep_interval = self.config.sweep_interval();
        let sweep_tx = self.events_tx.clone();
        let ticker = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + sweep_interval, sweep_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if sweep_tx.send(ManagerEvent::SweepTick).is_err() {
                    break;
                }
            }
        });

        info!(
            sweep_interval_ms = sweep_interval.as_millis() as u64,
            "window manager started"
        );

        loop {
            // Absorb everything already queued without blocking.
            while let Ok(event) = self.events_rx.try_recv() {
                self.apply_event(event);
            }
            if self.shutting_down {
                break;
            }

            // Input tier first, then work, then park.
            if let Some(id) = self.pending_input.pop_front() {
                self.service_input(id);
                tokio::task::yield_now().await;
                continue;
            }
            if let Some(id) = self.pending_work.pop_front() {
                self.service_work(id);
                tokio::task::yield_now().await;
                continue;
            }

            match self.events_rx.recv().await {
                Some(event) => self.apply_event(event),
                None => break,
            }
            if self.shutting_down {
                break;
            }
        }

        ticker.abort();
        info!("window manager stopped");
    }

    // ------------------------------------------------------------------------
    // Event application
    // ------------------------------------------------------------------------

    fn apply_event(&mut self, event: ManagerEvent) {
        match event {
            ManagerEvent::Connect {
                window,
                params,
                origin,
                frames,
                reply,
            } => {
                let result = self.apply_connection(window, params, origin, frames);
                let _ = reply.send(result);
            }
            ManagerEvent::Message { window, payload } => self.apply_message(window, payload),
            ManagerEvent::Disconnect { window } => {
                if let Some(win) = self.windows.get_mut(&window) {
                    debug!(window = %window, "client disconnected");
                    win.disconnect();
                }
            }
            ManagerEvent::Invoke { window, f } => match self.windows.get_mut(&window) {
                Some(win) => {
                    win.invoke(f);
                    self.note_pending_work(window);
                }
                None => debug!(window = %window, "invoke dropped, window gone"),
            },
            ManagerEvent::DestroyWindow { window } => self.destroy_window(window),
            ManagerEvent::SweepTick => self.sweep(),
            ManagerEvent::Shutdown => self.shutdown(),
        }
    }

    /// Admit a connection. The creation limiter applies to reconnects too:
    /// a client churning through reconnects is as expensive as one creating
    /// windows.
    fn apply_connection(
        &mut self,
        window: Option<WindowId>,
        params: SessionParams,
        origin: String,
        frames: UnboundedSender<Frame>,
    ) -> Result<WindowId, CloseCode> {
        if !self.creation_limiter.consume(origin.clone()) {
            warn!(%origin, "connection rejected, window creation rate exceeded");
            return Err(CloseCode::ExcessiveWindowCreation);
        }

        if let Some(id) = window {
            return match self.windows.get_mut(&id) {
                Some(win) => {
                    win.reconnect(params, frames);
                    Ok(id)
                }
                None => {
                    debug!(window = %id, "reconnect rejected, unknown window");
                    Err(CloseCode::UnknownWindow)
                }
            };
        }

        let id = self.fresh_window_id();
        let win = Window::new(
            id,
            params,
            Arc::clone(&self.config),
            Arc::clone(&self.body),
            frames,
        );
        self.windows.insert(id, win);
        info!(
            window = %id,
            windows = self.windows.len(),
            rss_mb = (self.memory_probe)() / (1024 * 1024),
            "window created"
        );
        Ok(id)
    }

    fn fresh_window_id(&self) -> WindowId {
        loop {
            let id = WindowId::random();
            if !self.windows.contains_key(&id) {
                return id;
            }
        }
    }

    /// Admit one inbound message: rate limit, size cap, pong bypass, then
    /// queue as input and mark the window input-pending.
    fn apply_message(&mut self, id: WindowId, payload: Vec<u8>) {
        if !self.message_limiter.consume(id) {
            warn!(window = %id, "input dropped, message rate exceeded");
            return;
        }
        if payload.len() > self.config.max_input_buffer_bytes {
            warn!(
                window = %id,
                bytes = payload.len(),
                limit = self.config.max_input_buffer_bytes,
                "input dropped, payload too large"
            );
            return;
        }
        let Some(window) = self.windows.get_mut(&id) else {
            debug!(window = %id, "input dropped, window gone");
            return;
        };

        if payload.first() == Some(&PONG_COMMAND) {
            window.register_pong();
            return;
        }

        window.enqueue_input_message(payload);
        if !window.has_pending_input {
            window.has_pending_input = true;
            self.pending_input.push_back(id);
        }
    }

    /// Mark a window work-pending if its runtime has queued work and it is
    /// not already listed.
    fn note_pending_work(&mut self, id: WindowId) {
        let Some(window) = self.windows.get_mut(&id) else {
            return;
        };
        if window.pending_work() && !window.has_pending_work {
            window.has_pending_work = true;
            self.pending_work.push_back(id);
        }
    }

    // ------------------------------------------------------------------------
    // Servicing
    // ------------------------------------------------------------------------

    fn service_input(&mut self, id: WindowId) {
        let poisoned = match self.windows.get_mut(&id) {
            Some(window) => {
                window.schedule_input();
                window.schedule_work();
                window.poisoned()
            }
            None => return,
        };
        if poisoned {
            warn!(window = %id, "window poisoned by unhandled error, destroying");
            self.destroy_window(id);
        }
    }

    fn service_work(&mut self, id: WindowId) {
        let poisoned = match self.windows.get_mut(&id) {
            Some(window) => {
                window.schedule_work();
                window.poisoned()
            }
            None => return,
        };
        if poisoned {
            warn!(window = %id, "window poisoned by unhandled error, destroying");
            self.destroy_window(id);
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    fn sweep(&mut self) {
        let rss = (self.memory_probe)();
        let threshold = self.config.rss_low_memory_threshold_bytes();
        let low_memory = threshold > 0 && rss >= threshold;
        if low_memory {
            warn!(
                rss_mb = rss / (1024 * 1024),
                "memory pressure, evicting disconnected windows"
            );
        }

        let now = Instant::now();
        let ids: Vec<WindowId> = self.windows.keys().copied().collect();
        let mut doomed = Vec::new();
        for id in ids {
            let Some(window) = self.windows.get_mut(&id) else {
                continue;
            };
            let pong_diff = now.duration_since(window.last_pong());
            let decision = assess(window.connected(), pong_diff, low_memory, &self.config);

            if decision.mark_disconnected && window.connected() {
                debug!(
                    window = %id,
                    silent_ms = pong_diff.as_millis() as u64,
                    "window marked disconnected"
                );
                window.mark_disconnected();
            }
            if decision.destroy {
                doomed.push(id);
                continue;
            }

            window.send_ping();
            window.flush_block_delete_queue();
        }
        for id in doomed {
            self.destroy_window(id);
        }

        self.message_limiter.prune();
        self.creation_limiter.prune();
    }

    fn destroy_window(&mut self, id: WindowId) {
        let Some(mut window) = self.windows.shift_remove(&id) else {
            return;
        };
        window.destroy();
        if let Some(hook) = self.destroy_hook.as_mut() {
            hook(id);
        }
        info!(
            window = %id,
            windows = self.windows.len(),
            rss_mb = (self.memory_probe)() / (1024 * 1024),
            "window destroyed"
        );
    }

    fn shutdown(&mut self) {
        info!(windows = self.windows.len(), "window manager shutting down");
        let ids: Vec<WindowId> = self.windows.keys().copied().collect();
        for id in ids {
            self.destroy_window(id);
        }
        self.shutting_down = true;
    }
}

/// Cloneable handle for talking to a running manager.
#[derive(Clone)]
pub struct ManagerHandle {
    tx: UnboundedSender<ManagerEvent>,
}

impl ManagerHandle {
    /// Open a fresh window. Resolves once the initial render has run.
    pub async fn connect(
        &self,
        params: SessionParams,
        origin: impl Into<String>,
        frames: UnboundedSender<Frame>,
    ) -> Result<WindowId, ConnectError> {
        self.attach(None, params, origin.into(), frames).await
    }

    /// Resume an existing window under a new connection.
    pub async fn reconnect(
        &self,
        window: WindowId,
        params: SessionParams,
        origin: impl Into<String>,
        frames: UnboundedSender<Frame>,
    ) -> Result<WindowId, ConnectError> {
        self.attach(Some(window), params, origin.into(), frames).await
    }

    async fn attach(
        &self,
        window: Option<WindowId>,
        params: SessionParams,
        origin: String,
        frames: UnboundedSender<Frame>,
    ) -> Result<WindowId, ConnectError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ManagerEvent::Connect {
                window,
                params,
                origin,
                frames,
                reply: reply_tx,
            })
            .map_err(|_| ConnectError::ManagerGone)?;
        match reply_rx.await {
            Ok(Ok(id)) => Ok(id),
            Ok(Err(code)) => Err(ConnectError::Rejected(code)),
            Err(_) => Err(ConnectError::ManagerGone),
        }
    }

    /// Deliver an inbound client message. Fire and forget; inadmissible
    /// messages are dropped by the manager.
    pub fn message(&self, window: WindowId, payload: Vec<u8>) {
        let _ = self.tx.send(ManagerEvent::Message { window, payload });
    }

    /// Note that a window's transport went away.
    pub fn disconnect(&self, window: WindowId) {
        let _ = self.tx.send(ManagerEvent::Disconnect { window });
    }

    /// Run a closure inside a window's reactive scope on the manager task.
    pub fn invoke(&self, window: WindowId, f: impl FnOnce(&mut Scope<'_>) + Send + 'static) {
        let _ = self.tx.send(ManagerEvent::Invoke {
            window,
            f: Box::new(f),
        });
    }

    /// Tear one window down.
    pub fn destroy_window(&self, window: WindowId) {
        let _ = self.tx.send(ManagerEvent::DestroyWindow { window });
    }

    /// Destroy every window and stop the manager loop.
    pub fn shutdown(&self) {
        let _ = self.tx.send(ManagerEvent::Shutdown);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Mutex;
    use tokio::time::{advance, Duration};

    fn noop_body() -> BodyFn {
        Arc::new(|_cx: &mut Scope<'_>| {})
    }

    fn frames() -> (
        UnboundedSender<Frame>,
        tokio::sync::mpsc::UnboundedReceiver<Frame>,
    ) {
        mpsc::unbounded_channel()
    }

    fn connect(
        manager: &mut WindowManager,
        origin: &str,
    ) -> (WindowId, tokio::sync::mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = frames();
        let id = manager
            .apply_connection(None, SessionParams::default(), origin.into(), tx)
            .expect("connection admitted");
        (id, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn connect_renders_and_registers_the_window() {
        let body: BodyFn = Arc::new(|cx: &mut Scope<'_>| {
            cx.push_buffer(vec![0x01]);
        });
        let (mut manager, _handle) = WindowManager::new(RuntimeConfig::default(), body);

        let (_id, mut rx) = connect(&mut manager, "10.0.0.1");

        assert_eq!(manager.window_count(), 1);
        assert_eq!(rx.try_recv().unwrap(), Frame::Buffer(vec![0x01]));
    }

    #[tokio::test(start_paused = true)]
    async fn creation_limit_rejects_with_the_protocol_close_code() {
        let (mut manager, _handle) = WindowManager::new(RuntimeConfig::default(), noop_body());

        for _ in 0..3 {
            connect(&mut manager, "10.0.0.1");
        }

        let (tx, _rx) = frames();
        let result =
            manager.apply_connection(None, SessionParams::default(), "10.0.0.1".into(), tx);
        assert_eq!(result, Err(CloseCode::ExcessiveWindowCreation));

        // Another origin is unaffected.
        let (tx, _rx) = frames();
        assert!(manager
            .apply_connection(None, SessionParams::default(), "10.0.0.2".into(), tx)
            .is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_count_against_the_creation_limit() {
        let (mut manager, _handle) = WindowManager::new(RuntimeConfig::default(), noop_body());
        let (id, _rx) = connect(&mut manager, "10.0.0.1");

        let (tx, _rx2) = frames();
        assert!(manager
            .apply_connection(Some(id), SessionParams::default(), "10.0.0.1".into(), tx)
            .is_ok());
        let (tx, _rx3) = frames();
        assert!(manager
            .apply_connection(Some(id), SessionParams::default(), "10.0.0.1".into(), tx)
            .is_ok());

        // Fourth admission attempt from the same origin inside the window.
        let (tx, _rx4) = frames();
        let result =
            manager.apply_connection(Some(id), SessionParams::default(), "10.0.0.1".into(), tx);
        assert_eq!(result, Err(CloseCode::ExcessiveWindowCreation));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_window_reconnect_is_rejected() {
        let (mut manager, _handle) = WindowManager::new(RuntimeConfig::default(), noop_body());

        let (tx, _rx) = frames();
        let result = manager.apply_connection(
            Some(WindowId::from(0xDEAD)),
            SessionParams::default(),
            "10.0.0.1".into(),
            tx,
        );
        assert_eq!(result, Err(CloseCode::UnknownWindow));
        assert_eq!(manager.window_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pong_messages_bypass_the_input_queue() {
        let (mut manager, _handle) = WindowManager::new(RuntimeConfig::default(), noop_body());
        let (id, _rx) = connect(&mut manager, "10.0.0.1");

        advance(Duration::from_secs(3)).await;
        let before = manager.windows.get(&id).unwrap().last_pong();

        manager.apply_message(id, vec![PONG_COMMAND]);

        let window = manager.windows.get(&id).unwrap();
        assert!(window.last_pong() > before);
        assert!(!window.has_pending_input);
        assert!(manager.pending_input.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn input_messages_mark_the_window_pending_exactly_once() {
        let (mut manager, _handle) = WindowManager::new(RuntimeConfig::default(), noop_body());
        let (id, _rx) = connect(&mut manager, "10.0.0.1");

        manager.apply_message(id, vec![9, 1]);
        manager.apply_message(id, vec![9, 2]);
        manager.apply_message(id, vec![9, 3]);

        assert_eq!(manager.pending_input.len(), 1);
        assert_eq!(manager.pending_input[0], id);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_and_rate_limited_messages_are_dropped() {
        let config = RuntimeConfig {
            input_rate_threshold: 2,
            max_input_buffer_bytes: 8,
            ..RuntimeConfig::default()
        };
        let (mut manager, _handle) = WindowManager::new(config, noop_body());
        let (id, _rx) = connect(&mut manager, "10.0.0.1");

        // Too large: admitted by the limiter but dropped by the size cap.
        manager.apply_message(id, vec![9; 16]);
        assert!(manager.pending_input.is_empty());

        manager.apply_message(id, vec![9, 1]);
        // Third message in the window: over the rate threshold.
        manager.apply_message(id, vec![9, 2]);

        let window = manager.windows.get(&id).unwrap();
        assert_eq!(manager.pending_input.len(), 1);
        assert!(window.has_pending_input);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_marks_silent_windows_then_destroys_them() {
        let (mut manager, _handle) = WindowManager::new(RuntimeConfig::default(), noop_body());
        let destroyed = Arc::new(Mutex::new(Vec::new()));
        let destroyed_clone = destroyed.clone();
        manager.on_window_destroy(move |id| {
            destroyed_clone.lock().unwrap().push(id);
        });

        let (id, _rx) = connect(&mut manager, "10.0.0.1");

        // Past the disconnect threshold but not the destroy threshold.
        advance(Duration::from_secs(7)).await;
        manager.sweep();
        assert!(!manager.windows.get(&id).unwrap().connected());
        assert_eq!(manager.window_count(), 1);

        // A pong revives the window before the destroy threshold.
        manager.apply_message(id, vec![PONG_COMMAND]);
        assert!(manager.windows.get(&id).unwrap().connected());

        advance(Duration::from_secs(59)).await;
        manager.sweep();
        assert_eq!(manager.window_count(), 1);

        advance(Duration::from_secs(1)).await;
        manager.sweep();
        assert_eq!(manager.window_count(), 0);
        assert_eq!(*destroyed.lock().unwrap(), vec![id]);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_pings_live_windows() {
        let (mut manager, _handle) = WindowManager::new(RuntimeConfig::default(), noop_body());
        let (_id, mut rx) = connect(&mut manager, "10.0.0.1");

        manager.sweep();

        assert_eq!(rx.try_recv().unwrap(), Frame::Ping);
    }

    #[tokio::test(start_paused = true)]
    async fn memory_pressure_evicts_only_disconnected_windows() {
        let config = RuntimeConfig {
            rss_low_memory_threshold_mb: 1,
            ..RuntimeConfig::default()
        };
        let (mut manager, _handle) = WindowManager::new(config, noop_body());
        manager.set_memory_probe(|| 2 * 1024 * 1024);

        let (live, _rx_live) = connect(&mut manager, "10.0.0.1");
        let (dead, _rx_dead) = connect(&mut manager, "10.0.0.2");
        manager
            .windows
            .get_mut(&dead)
            .expect("window exists")
            .disconnect();

        manager.sweep();

        assert!(manager.windows.contains_key(&live));
        assert!(!manager.windows.contains_key(&dead));
    }

    #[tokio::test(start_paused = true)]
    async fn poisoned_window_is_destroyed_after_servicing() {
        let config = RuntimeConfig {
            destroy_window_on_unhandled_error: true,
            ..RuntimeConfig::default()
        };
        let body: BodyFn = Arc::new(|cx: &mut Scope<'_>| {
            cx.set_input_handler(|cx, _payload| {
                cx.create_fallible_effect(|_cx| Err(crate::error::NodeError::from("input blew up")));
            });
        });
        let (mut manager, _handle) = WindowManager::new(config, body);
        let (id, _rx) = connect(&mut manager, "10.0.0.1");

        manager.apply_message(id, vec![9, 9]);
        let pending = manager.pending_input.pop_front().expect("input pending");
        manager.service_input(pending);

        assert_eq!(manager.window_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_destroys_every_window() {
        let (mut manager, _handle) = WindowManager::new(RuntimeConfig::default(), noop_body());
        let destroyed = Arc::new(AtomicI32::new(0));
        let destroyed_clone = destroyed.clone();
        manager.on_window_destroy(move |_id| {
            destroyed_clone.fetch_add(1, Ordering::SeqCst);
        });

        connect(&mut manager, "10.0.0.1");
        connect(&mut manager, "10.0.0.2");
        connect(&mut manager, "10.0.0.3");

        manager.shutdown();

        assert_eq!(manager.window_count(), 0);
        assert_eq!(destroyed.load(Ordering::SeqCst), 3);
        assert!(manager.shutting_down);
    }
}
