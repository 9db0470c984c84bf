//! Context - Scoped Shared Values and Error Boundaries
//!
//! Context lets an ancestor node share a value with everything it owns
//! without threading it through every closure. A [`Context<T>`] handle is a
//! typed key; providing stores a value on the current node, and lookups
//! walk the ownership chain from the reading node upwards, so the nearest
//! provider wins and siblings never see each other's values.
//!
//! Error boundaries ride the same mechanism under a reserved key:
//! [`Scope::on_error`] appends a handler to the current node, and a failing
//! descendant routes its error to the nearest node carrying handlers.
//!
//! Keys are allocated from a process-wide counter, so two `Context<T>`
//! instances of the same `T` are distinct keys. Create the handle once and
//! share it (it is cheap to clone).

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::error::NodeError;
use crate::reactive::node::{ContextEntry, ErrorHandler, ERROR_CONTEXT_KEY};
use crate::reactive::scope::Scope;

// Key 0 is reserved for error handlers.
static NEXT_CONTEXT_ID: AtomicU32 = AtomicU32::new(1);

/// Typed key identifying one context slot.
pub struct Context<T>
where
    T: Send + Sync + 'static,
{
    id: u32,
    default: Option<Arc<T>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Context<T>
where
    T: Send + Sync + 'static,
{
    /// A fresh key with no default: lookups with no provider in scope
    /// return `None`.
    pub fn new() -> Self {
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            default: None,
            _marker: PhantomData,
        }
    }

    /// A fresh key that falls back to `value` when no provider is in scope.
    pub fn with_default(value: T) -> Self {
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            default: Some(Arc::new(value)),
            _marker: PhantomData,
        }
    }
}

impl<T> Default for Context<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Context<T>
where
    T: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            default: self.default.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Context<T>
where
    T: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").field("id", &self.id).finish()
    }
}

impl<'a> Scope<'a> {
    /// Provide `value` under `context` for the current node and everything
    /// it owns. Replaces an earlier value provided on the same node.
    pub fn provide_context<T>(&mut self, context: &Context<T>, value: T)
    where
        T: Send + Sync + 'static,
    {
        let Some(node) = self.rt.graph.get_mut(self.owner) else {
            return;
        };
        let entry = ContextEntry::Shared(Arc::new(value));
        match node.context.iter_mut().find(|(key, _)| *key == context.id) {
            Some((_, existing)) => *existing = entry,
            None => node.context.push((context.id, entry)),
        }
    }

    /// Look up the nearest provided value for `context`, walking from the
    /// current node up the ownership chain. Falls back to the context's
    /// default.
    pub fn use_context<T>(&self, context: &Context<T>) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let mut cursor = Some(self.owner);
        while let Some(id) = cursor {
            let Some(node) = self.rt.graph.get(id) else {
                break;
            };
            if let Some(ContextEntry::Shared(value)) = node.context_entry(context.id) {
                if let Ok(typed) = Arc::clone(value).downcast::<T>() {
                    return Some(typed);
                }
            }
            cursor = node.parent;
        }
        context.default.clone()
    }

    /// Register an error handler on the current node. A failing descendant
    /// routes its error to the nearest node carrying handlers; all handlers
    /// on that node run, in registration order.
    pub fn on_error(&mut self, handler: impl Fn(&mut Scope<'_>, &NodeError) + Send + Sync + 'static) {
        let Some(node) = self.rt.graph.get_mut(self.owner) else {
            return;
        };
        let handler: ErrorHandler = Arc::new(handler);
        match node
            .context
            .iter_mut()
            .find(|(key, _)| *key == ERROR_CONTEXT_KEY)
        {
            Some((_, ContextEntry::ErrorHandlers(handlers))) => handlers.push(handler),
            Some((_, entry)) => *entry = ContextEntry::ErrorHandlers(vec![handler]),
            None => node
                .context
                .push((ERROR_CONTEXT_KEY, ContextEntry::ErrorHandlers(vec![handler]))),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
