//! Oriel Core
//!
//! This crate provides the execution engine for the Oriel server-driven UI
//! runtime. It implements:
//!
//! - Reactive primitives (signals, memos, effects) with explicit scopes
//! - Incremental dependency-graph recomputation
//! - Per-window cooperative scheduling under a single manager task
//! - Window lifecycle: ping/pong liveness, reconnection, eviction
//! - Rate limiting for inbound messages and window creation
//!
//! Transports are out of scope: the engine speaks [`session::Frame`]s over
//! channels and leaves sockets to the embedding server.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: signals, memos, effects, context, and the per-window runtime
//! - `scheduler`: the window manager loop, sweeper, and rate limiters
//! - `session`: window identity, session parameters, frames, close codes
//! - `config`: runtime tuning knobs with environment overrides
//! - `error`: node and connection error types
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use oriel_core::{RuntimeConfig, Scope, WindowManager};
//!
//! let body = Arc::new(|cx: &mut Scope<'_>| {
//!     let count = cx.create_signal(0i64);
//!     let doubled = cx.create_memo(move |cx| count.get(cx) * 2);
//!
//!     cx.create_effect(move |cx| {
//!         let rendered = format!("doubled: {}", doubled.get(cx));
//!         cx.push_buffer(rendered.into_bytes());
//!     });
//!
//!     cx.set_input_handler(move |cx, _payload| {
//!         count.update(cx, |n| n + 1);
//!     });
//! });
//!
//! let (manager, handle) = WindowManager::new(RuntimeConfig::default(), body);
//! tokio::spawn(manager.run());
//! // handle.connect(...) binds client connections to windows.
//! ```

pub mod config;
pub mod error;
pub mod reactive;
pub mod scheduler;
pub mod session;

pub use config::RuntimeConfig;
pub use error::{ConnectError, NodeError};
pub use reactive::{BodyFn, ChildSpec, ChildThunk, Context, Disposer, Memo, Runtime, Scope, Signal};
pub use scheduler::{ManagerEvent, ManagerHandle, RateLimiter, Window, WindowManager};
pub use session::{CloseCode, Frame, SessionParams, WindowId};
