//! Signals - Reactive State Cells
//!
//! A [`Signal`] is the fundamental reactive primitive: a typed value cell
//! whose reads subscribe the running computation and whose writes queue the
//! subscribers for re-execution.
//!
//! # How Signals Work
//!
//! 1. Reading a signal inside a memo or effect records an edge from the
//!    signal to that computation.
//!
//! 2. Writing a value that differs from the current one (by `PartialEq`)
//!    queues every subscriber. Writing an equal value does nothing.
//!
//! 3. The queued computations run on the next work-queue drain, re-reading
//!    whatever signals they still depend on.
//!
//! # Handles
//!
//! `Signal<T>` is a `Copy` handle (an id plus the owning window's id), not
//! the storage itself. The storage lives in the window's node arena and is
//! owned by the scope the signal was created in; when that owner is cleaned
//! or destroyed the signal dies with it, and surviving handles go inert:
//! `try_get` returns `None`, writes are dropped.

use std::fmt;
use std::marker::PhantomData;

use crate::reactive::node::{NodeId, UpdateState};
use crate::reactive::scope::Scope;
use crate::reactive::value::Value;
use crate::session::WindowId;

/// Typed handle to a reactive state cell.
pub struct Signal<T>
where
    T: Send + PartialEq + 'static,
{
    id: NodeId,
    window: WindowId,
    _marker: PhantomData<fn() -> T>,
}

impl<'a> Scope<'a> {
    /// Create a signal owned by the current scope.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let count = cx.create_signal(0);
    ///
    /// cx.create_effect(move |cx| {
    ///     println!("count is {}", count.get(cx));
    /// });
    /// ```
    pub fn create_signal<T>(&mut self, value: T) -> Signal<T>
    where
        T: Send + PartialEq + 'static,
    {
        let id = self.rt.spawn_signal(Value::new(value), self.owner);
        Signal {
            id,
            window: self.rt.window_id,
            _marker: PhantomData,
        }
    }
}

impl<T> Signal<T>
where
    T: Send + PartialEq + 'static,
{
    /// Read the current value, subscribing the running computation.
    ///
    /// # Panics
    ///
    /// Panics if the signal's owner has been destroyed. Use [`Self::try_get`]
    /// when the handle may outlive the scope that created it.
    pub fn get(&self, cx: &mut Scope<'_>) -> T
    where
        T: Clone,
    {
        self.try_get(cx)
            .expect("signal read after its owner was destroyed")
    }

    /// Read the current value, subscribing the running computation. Returns
    /// `None` once the signal is destroyed.
    pub fn try_get(&self, cx: &mut Scope<'_>) -> Option<T>
    where
        T: Clone,
    {
        debug_assert_eq!(
            self.window, cx.rt.window_id,
            "signal handle used outside its window"
        );
        let observer = cx.owner;
        cx.rt.register_dependency(self.id, observer);

        let node = cx.rt.graph.get(self.id)?;
        if node.state == UpdateState::Destroyed {
            return None;
        }
        node.value.as_ref().and_then(|v| v.downcast_ref::<T>()).cloned()
    }

    /// Read the current value without subscribing.
    pub fn get_untracked(&self, cx: &Scope<'_>) -> T
    where
        T: Clone,
    {
        cx.rt
            .graph
            .get(self.id)
            .filter(|node| node.state != UpdateState::Destroyed)
            .and_then(|node| node.value.as_ref())
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
            .expect("signal read after its owner was destroyed")
    }

    /// Write a new value. Subscribers are queued only when the value
    /// actually changed; writes to a destroyed signal are dropped.
    pub fn set(&self, cx: &mut Scope<'_>, value: T) {
        debug_assert_eq!(
            self.window, cx.rt.window_id,
            "signal handle used outside its window"
        );
        cx.rt.write_value(self.id, Value::new(value));
    }

    /// Compute a new value from the current one and write it. The read is
    /// untracked; only the write has reactive consequences.
    pub fn update(&self, cx: &mut Scope<'_>, f: impl FnOnce(&T) -> T) {
        let next = {
            let Some(node) = cx.rt.graph.get(self.id) else {
                return;
            };
            if node.state == UpdateState::Destroyed {
                return;
            }
            let Some(current) = node.value.as_ref().and_then(|v| v.downcast_ref::<T>()) else {
                return;
            };
            f(current)
        };
        self.set(cx, next);
    }

    /// How many computations currently subscribe to this signal. Intended
    /// for diagnostics and tests.
    pub fn observer_count(&self, cx: &Scope<'_>) -> usize {
        cx.rt
            .graph
            .get(self.id)
            .map(|node| node.observers.len())
            .unwrap_or(0)
    }
}

impl<T> Clone for Signal<T>
where
    T: Send + PartialEq + 'static,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Signal<T> where T: Send + PartialEq + 'static {}

impl<T> fmt::Debug for Signal<T>
where
    T: Send + PartialEq + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal").field("node", &self.id).finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
