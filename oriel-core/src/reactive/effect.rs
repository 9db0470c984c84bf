//! Effects - Side-Effecting Computations
//!
//! An effect is a computation node that exists for what it does, not for
//! what it returns: pushing output frames, bridging to non-reactive code,
//! creating owned child state. It re-runs whenever a dependency changes and
//! never fans out to observers of its own.
//!
//! # How Effects Work
//!
//! 1. Creation queues the first run; it executes on the next work-queue
//!    drain, reading its dependencies for the first time.
//!
//! 2. Before every re-run the effect is cleaned: sources unlinked, cleanups
//!    run, owned children destroyed. The run then rebuilds all three.
//!
//! 3. The accumulator variant threads a value from run to run, which is how
//!    state survives re-execution without a signal.
//!
//! # Use Cases
//!
//! - Rendering: serialize state into update frames for the client.
//! - Ownership: a conditional branch that creates child signals and effects
//!   and tears them down when the branch flips.
//! - Bridging: timers, channels and other non-reactive inputs.
//!
//! # Disposal
//!
//! [`Scope::create_disposable_effect`] additionally hands back a
//! [`Disposer`]. Disposing cleans the effect and leaves it parked: with no
//! sources it can never be queued again, and its storage is released when
//! its owner goes away.

use std::fmt;

use crate::error::NodeError;
use crate::reactive::node::{NodeFn, NodeId, NodeKind};
use crate::reactive::scope::Scope;
use crate::reactive::value::Value;

impl<'a> Scope<'a> {
    /// Create an effect owned by the current scope. Queued immediately,
    /// first run on the next drain.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let count = cx.create_signal(0);
    ///
    /// cx.create_effect(move |cx| {
    ///     let frame = encode_count(count.get(cx));
    ///     cx.push_buffer(frame);
    /// });
    /// ```
    pub fn create_effect(&mut self, mut f: impl FnMut(&mut Scope<'_>) + Send + 'static) {
        let func: NodeFn = Box::new(move |cx, _prev| {
            f(cx);
            Ok(Value::new(()))
        });
        self.spawn_node(NodeKind::Effect, func, None);
    }

    /// Create an effect that threads an accumulator through its runs: each
    /// run receives the value the previous run returned, starting from
    /// `initial`.
    pub fn create_effect_with<T>(
        &mut self,
        mut f: impl FnMut(&mut Scope<'_>, T) -> T + Send + 'static,
        initial: T,
    ) where
        T: Send + 'static,
    {
        let func: NodeFn = Box::new(move |cx, prev| {
            // Always present: seeded at creation, replaced after every run.
            let acc = prev
                .and_then(|value| value.into_inner::<T>())
                .expect("effect accumulator missing between runs");
            Ok(Value::opaque(f(cx, acc)))
        });
        self.spawn_node(NodeKind::Effect, func, Some(Value::opaque(initial)));
    }

    /// Create an effect whose body can fail. Errors route to the nearest
    /// error handlers up the ownership chain.
    pub fn create_fallible_effect(
        &mut self,
        mut f: impl FnMut(&mut Scope<'_>) -> Result<(), NodeError> + Send + 'static,
    ) {
        let func: NodeFn = Box::new(move |cx, _prev| f(cx).map(Value::new));
        self.spawn_node(NodeKind::Effect, func, None);
    }

    /// Create an effect that can be detached early, before its owner goes
    /// away.
    pub fn create_disposable_effect(
        &mut self,
        mut f: impl FnMut(&mut Scope<'_>) + Send + 'static,
    ) -> Disposer {
        let func: NodeFn = Box::new(move |cx, _prev| {
            f(cx);
            Ok(Value::new(()))
        });
        let node = self.spawn_node(NodeKind::Effect, func, None);
        Disposer { node }
    }
}

/// Detaches a disposable effect: unlinks its sources, runs its cleanups and
/// destroys everything it owns. The effect never runs again afterwards.
pub struct Disposer {
    node: NodeId,
}

impl Disposer {
    pub fn dispose(self, cx: &mut Scope<'_>) {
        cx.rt.clean_node(self.node);
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer").field("node", &self.node).finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
