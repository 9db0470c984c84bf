//! Memos - Cached Derived Values
//!
//! A [`Memo`] is a computation node with a cached result. It re-executes
//! when a dependency changes and fans out to its own observers only when
//! the fresh result differs from the cached one, which is what stops
//! redundant propagation through derived state.
//!
//! # How Memos Work
//!
//! 1. Creation queues the first run; the value exists only after the next
//!    work-queue drain.
//!
//! 2. A drain re-executes the memo after any dependency changed. The new
//!    result is compared against the cached one with `PartialEq`.
//!
//! 3. Unchanged results are swallowed: observers stay untouched. Changed
//!    results queue every observer in the same drain.
//!
//! 4. A failed re-evaluation keeps the cached value and routes the error
//!    instead; observers see the old value until a later run succeeds.
//!
//! # Child Lists
//!
//! [`Scope::children`] builds the two-tier memo used for dynamic UI
//! children: an outer memo caches the produced [`ChildSpec`] structure
//! (thunks compare by identity), and an inner memo resolves thunks into a
//! flat list. Item-level reactivity stays inside the resolver, so a leaf
//! change re-resolves without re-running the structure producer.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::NodeError;
use crate::reactive::node::{NodeFn, NodeId, NodeKind, UpdateState};
use crate::reactive::scope::Scope;
use crate::reactive::value::Value;
use crate::session::WindowId;

/// Typed handle to a cached derived value.
pub struct Memo<T>
where
    T: Send + PartialEq + 'static,
{
    id: NodeId,
    window: WindowId,
    _marker: PhantomData<fn() -> T>,
}

impl<'a> Scope<'a> {
    /// Create a memo owned by the current scope. The computation is queued
    /// and runs on the next drain.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let count = cx.create_signal(2);
    /// let doubled = cx.create_memo(move |cx| count.get(cx) * 2);
    /// ```
    pub fn create_memo<T>(
        &mut self,
        mut f: impl FnMut(&mut Scope<'_>) -> T + Send + 'static,
    ) -> Memo<T>
    where
        T: Send + PartialEq + 'static,
    {
        self.create_fallible_memo(move |cx| Ok(f(cx)))
    }

    /// Create a memo whose computation can fail. Errors route to the
    /// nearest error handlers; the cached value, if any, is kept.
    pub fn create_fallible_memo<T>(
        &mut self,
        mut f: impl FnMut(&mut Scope<'_>) -> Result<T, NodeError> + Send + 'static,
    ) -> Memo<T>
    where
        T: Send + PartialEq + 'static,
    {
        let func: NodeFn = Box::new(move |cx, _prev| f(cx).map(Value::new));
        let id = self.spawn_node(NodeKind::Memo, func, None);
        Memo {
            id,
            window: self.rt.window_id,
            _marker: PhantomData,
        }
    }

    /// Build the two-tier child-list memo: `f` produces the structure, the
    /// returned memo yields the flat resolved list.
    pub fn children<L>(
        &mut self,
        f: impl FnMut(&mut Scope<'_>) -> ChildSpec<L> + Send + 'static,
    ) -> Memo<Vec<L>>
    where
        L: Clone + PartialEq + Send + 'static,
    {
        // Tier one caches the structure; an identical spec (thunks compare
        // by identity) stops propagation before any thunk re-runs.
        let spec = self.create_memo(f);
        self.create_memo(move |cx| {
            let spec = spec.get(cx);
            let mut out = Vec::new();
            resolve_children(cx, &spec, &mut out);
            out
        })
    }
}

impl<T> Memo<T>
where
    T: Send + PartialEq + 'static,
{
    /// Read the cached value, subscribing the running computation.
    ///
    /// # Panics
    ///
    /// Panics if the memo has not completed its first run (the creating
    /// turn has not drained yet) or was destroyed. Use [`Self::try_get`]
    /// to observe those states.
    pub fn get(&self, cx: &mut Scope<'_>) -> T
    where
        T: Clone,
    {
        self.try_get(cx)
            .expect("memo read before its first evaluation or after destruction")
    }

    /// Read the cached value, subscribing the running computation. Returns
    /// `None` before the first run and after destruction.
    pub fn try_get(&self, cx: &mut Scope<'_>) -> Option<T>
    where
        T: Clone,
    {
        debug_assert_eq!(
            self.window, cx.rt.window_id,
            "memo handle used outside its window"
        );
        let observer = cx.owner;
        cx.rt.register_dependency(self.id, observer);

        let node = cx.rt.graph.get(self.id)?;
        if node.state == UpdateState::Destroyed {
            return None;
        }
        node.value.as_ref().and_then(|v| v.downcast_ref::<T>()).cloned()
    }

    /// Read the cached value without subscribing.
    pub fn get_untracked(&self, cx: &Scope<'_>) -> Option<T>
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
    }
}

impl<T> Clone for Memo<T>
where
    T: Send + PartialEq + 'static,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Memo<T> where T: Send + PartialEq + 'static {}

impl<T> fmt::Debug for Memo<T>
where
    T: Send + PartialEq + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo").field("node", &self.id).finish()
    }
}

// ----------------------------------------------------------------------------
// Child lists
// ----------------------------------------------------------------------------

/// Deferred child producer. Compared by identity: a rebuilt thunk counts as
/// a structural change even if it would produce the same output.
pub type ChildThunk<L> = Arc<dyn Fn(&mut Scope<'_>) -> ChildSpec<L> + Send + Sync>;

/// Structure produced by a child-list closure: a tree of leaves, nested
/// lists and deferred thunks, resolved depth first into a flat list.
pub enum ChildSpec<L> {
    Leaf(L),
    Many(Vec<ChildSpec<L>>),
    Thunk(ChildThunk<L>),
}

impl<L> ChildSpec<L> {
    /// Wrap a closure as a deferred child.
    pub fn thunk(f: impl Fn(&mut Scope<'_>) -> ChildSpec<L> + Send + Sync + 'static) -> Self {
        ChildSpec::Thunk(Arc::new(f))
    }
}

impl<L: Clone> Clone for ChildSpec<L> {
    fn clone(&self) -> Self {
        match self {
            ChildSpec::Leaf(leaf) => ChildSpec::Leaf(leaf.clone()),
            ChildSpec::Many(items) => ChildSpec::Many(items.clone()),
            ChildSpec::Thunk(thunk) => ChildSpec::Thunk(Arc::clone(thunk)),
        }
    }
}

impl<L: PartialEq> PartialEq for ChildSpec<L> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ChildSpec::Leaf(a), ChildSpec::Leaf(b)) => a == b,
            (ChildSpec::Many(a), ChildSpec::Many(b)) => a == b,
            (ChildSpec::Thunk(a), ChildSpec::Thunk(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<L: fmt::Debug> fmt::Debug for ChildSpec<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildSpec::Leaf(leaf) => f.debug_tuple("Leaf").field(leaf).finish(),
            ChildSpec::Many(items) => f.debug_tuple("Many").field(items).finish(),
            ChildSpec::Thunk(_) => f.write_str("Thunk(..)"),
        }
    }
}

fn resolve_children<L>(cx: &mut Scope<'_>, spec: &ChildSpec<L>, out: &mut Vec<L>)
where
    L: Clone + PartialEq + Send + 'static,
{
    match spec {
        ChildSpec::Leaf(leaf) => out.push(leaf.clone()),
        ChildSpec::Many(items) => {
            for item in items {
                resolve_children(cx, item, out);
            }
        }
        ChildSpec::Thunk(thunk) => {
            let resolved = thunk(cx);
            resolve_children(cx, &resolved, out);
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::reactive::runtime::Runtime;
    use crate::session::SessionParams;
    use std::sync::atomic::{AtomicI32, Ordering};

    fn test_runtime() -> Runtime {
        let mut rt = Runtime::new(
            WindowId::from(1),
            SessionParams::default(),
            Arc::new(RuntimeConfig::default()),
            Arc::new(|_cx: &mut Scope<'_>| {}),
        );
        rt.process_work_queue();
        rt
    }

    #[test]
    fn recomputes_only_when_a_dependency_changes() {
        let mut rt = test_runtime();
        let computations = Arc::new(AtomicI32::new(0));
        let computations_clone = computations.clone();

        let base = rt.enter(|cx| cx.create_signal(3_i32));
        let squared = rt.enter(|cx| {
            cx.create_memo(move |cx| {
                computations_clone.fetch_add(1, Ordering::SeqCst);
                let n = base.get(cx);
                n * n
            })
        });
        rt.process_work_queue();

        assert_eq!(rt.enter(|cx| squared.get(cx)), 9);
        assert_eq!(computations.load(Ordering::SeqCst), 1);

        // Repeated reads hit the cache.
        rt.enter(|cx| squared.get(cx));
        rt.enter(|cx| squared.get(cx));
        assert_eq!(computations.load(Ordering::SeqCst), 1);

        rt.enter(|cx| base.set(cx, 4));
        rt.process_work_queue();
        assert_eq!(rt.enter(|cx| squared.get(cx)), 16);
        assert_eq!(computations.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unchanged_result_stops_propagation() {
        let mut rt = test_runtime();
        let downstream_runs = Arc::new(AtomicI32::new(0));
        let downstream_runs_clone = downstream_runs.clone();

        let n = rt.enter(|cx| cx.create_signal(0_i32));
        rt.enter(|cx| {
            let parity = cx.create_memo(move |cx| n.get(cx) % 2);
            cx.create_effect(move |cx| {
                parity.get(cx);
                downstream_runs_clone.fetch_add(1, Ordering::SeqCst);
            });
        });
        rt.process_work_queue();
        assert_eq!(downstream_runs.load(Ordering::SeqCst), 1);

        // 0 -> 2 recomputes the memo but parity is still 0.
        rt.enter(|cx| n.set(cx, 2));
        assert_eq!(rt.process_work_queue(), 1);
        assert_eq!(downstream_runs.load(Ordering::SeqCst), 1);

        // 2 -> 3 flips parity and reaches the effect.
        rt.enter(|cx| n.set(cx, 3));
        assert_eq!(rt.process_work_queue(), 2);
        assert_eq!(downstream_runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn chain_propagates_within_a_single_drain() {
        let mut rt = test_runtime();

        let source = rt.enter(|cx| cx.create_signal(1_i32));
        let last = rt.enter(|cx| {
            let a = cx.create_memo(move |cx| source.get(cx) + 1);
            let b = cx.create_memo(move |cx| a.get(cx) + 1);
            cx.create_memo(move |cx| b.get(cx) + 1)
        });
        rt.process_work_queue();
        assert_eq!(rt.enter(|cx| last.get(cx)), 4);

        rt.enter(|cx| source.set(cx, 10));
        rt.process_work_queue();
        assert_eq!(rt.enter(|cx| last.get(cx)), 13);
    }

    #[test]
    fn failed_recomputation_keeps_the_cached_value() {
        let mut rt = test_runtime();
        let errors = Arc::new(AtomicI32::new(0));
        let errors_clone = errors.clone();

        let n = rt.enter(|cx| cx.create_signal(1_i32));
        let checked = rt.enter(|cx| {
            cx.on_error(move |_cx, _err| {
                errors_clone.fetch_add(1, Ordering::SeqCst);
            });
            cx.create_fallible_memo(move |cx| {
                let v = n.get(cx);
                if v < 0 {
                    Err(NodeError::from("negative input"))
                } else {
                    Ok(v * 10)
                }
            })
        });
        rt.process_work_queue();
        assert_eq!(rt.enter(|cx| checked.try_get(cx)), Some(10));

        rt.enter(|cx| n.set(cx, -1));
        rt.process_work_queue();
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        // Old value survives the failed run.
        assert_eq!(rt.enter(|cx| checked.try_get(cx)), Some(10));

        rt.enter(|cx| n.set(cx, 5));
        rt.process_work_queue();
        assert_eq!(rt.enter(|cx| checked.try_get(cx)), Some(50));
    }

    #[test]
    fn try_get_is_none_before_the_first_drain() {
        let mut rt = test_runtime();
        let memo = rt.enter(|cx| cx.create_memo(|_cx| 1_i32));
        assert_eq!(rt.enter(|cx| memo.try_get(cx)), None);

        rt.process_work_queue();
        assert_eq!(rt.enter(|cx| memo.try_get(cx)), Some(1));
    }

    #[test]
    #[should_panic(expected = "memo read before its first evaluation")]
    fn get_panics_before_the_first_drain() {
        let mut rt = test_runtime();
        rt.enter(|cx| {
            let memo = cx.create_memo(|_cx| 1_i32);
            memo.get(cx);
        });
    }

    #[test]
    fn children_resolve_depth_first() {
        let mut rt = test_runtime();

        let resolved = rt.enter(|cx| {
            cx.children(|_cx| {
                ChildSpec::Many(vec![
                    ChildSpec::Leaf("header"),
                    ChildSpec::Many(vec![ChildSpec::Leaf("row 1"), ChildSpec::Leaf("row 2")]),
                    ChildSpec::thunk(|_cx| ChildSpec::Leaf("footer")),
                ])
            })
        });
        rt.process_work_queue();

        assert_eq!(
            rt.enter(|cx| resolved.get(cx)),
            vec!["header", "row 1", "row 2", "footer"]
        );
    }

    #[test]
    fn leaf_change_re_resolves_without_rebuilding_the_structure() {
        let mut rt = test_runtime();
        let structure_runs = Arc::new(AtomicI32::new(0));
        let structure_runs_clone = structure_runs.clone();

        let label = rt.enter(|cx| cx.create_signal(String::from("one")));
        let resolved = rt.enter(|cx| {
            cx.children(move |_cx| {
                structure_runs_clone.fetch_add(1, Ordering::SeqCst);
                ChildSpec::Many(vec![
                    ChildSpec::Leaf(String::from("fixed")),
                    ChildSpec::thunk(move |cx| ChildSpec::Leaf(label.get(cx))),
                ])
            })
        });
        rt.process_work_queue();
        assert_eq!(
            rt.enter(|cx| resolved.get(cx)),
            vec![String::from("fixed"), String::from("one")]
        );
        assert_eq!(structure_runs.load(Ordering::SeqCst), 1);

        // The thunk's read subscribed the resolver tier, not the producer.
        rt.enter(|cx| label.set(cx, String::from("two")));
        rt.process_work_queue();
        assert_eq!(
            rt.enter(|cx| resolved.get(cx)),
            vec![String::from("fixed"), String::from("two")]
        );
        assert_eq!(structure_runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn child_specs_compare_structurally_and_thunks_by_identity() {
        let leaf_a: ChildSpec<i32> = ChildSpec::Leaf(1);
        let leaf_b: ChildSpec<i32> = ChildSpec::Leaf(1);
        let leaf_c: ChildSpec<i32> = ChildSpec::Leaf(2);
        assert_eq!(leaf_a, leaf_b);
        assert_ne!(leaf_a, leaf_c);

        let thunk: ChildThunk<i32> = Arc::new(|_cx: &mut Scope<'_>| ChildSpec::Leaf(3));
        let same = ChildSpec::Thunk(Arc::clone(&thunk));
        let cloned = same.clone();
        assert_eq!(same, cloned);

        let other = ChildSpec::thunk(|_cx| ChildSpec::Leaf(3));
        assert_ne!(same, other);
    }
}
