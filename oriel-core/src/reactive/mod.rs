//! Reactive Primitives
//!
//! This module implements the incremental computation engine: signals,
//! memos and effects wired into a per-window dependency graph, plus the
//! runtime that re-executes invalidated nodes to quiescence.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. Reading one inside a memo or
//! effect subscribes that computation; writing a different value queues
//! every subscriber for re-execution on the next drain.
//!
//! ## Memos
//!
//! A Memo is a derived value with a cache. It re-evaluates when a
//! dependency changes and propagates further only when its result actually
//! differs from the cached one.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation: it re-runs on dependency
//! changes and never propagates. Effects also carry ownership, so state
//! created inside one is torn down before each re-run and when the effect
//! goes away.
//!
//! # Implementation Notes
//!
//! There is no ambient tracking context: every closure receives a
//! [`Scope`] naming its node, and all reads and writes go through it. The
//! dependency graph, the work queue and all node storage live in the
//! window's [`Runtime`], which is owned by exactly one scheduler task.

mod context;
mod effect;
mod graph;
mod memo;
mod node;
mod queue;
mod runtime;
mod scope;
mod signal;
mod value;

pub use context::Context;
pub use effect::Disposer;
pub use memo::{ChildSpec, ChildThunk, Memo};
pub use runtime::{BodyFn, Runtime};
pub use scope::Scope;
pub use signal::Signal;
