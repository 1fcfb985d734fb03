//! Resolve-once link cells
//!
//! A host-side model of the Site cell protocol the emitted stubs rely on.
//! A cell starts out holding its lookup key and switches to the resolved
//! value the first time a resolver succeeds. Readers never observe a
//! half-written cell; concurrent first accesses may each run the resolver,
//! but exactly one result is published and every caller sees that one.

use once_cell::sync::OnceCell;
use std::fmt;

/// What a cell currently holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState<'a, K, V> {
    Unresolved(&'a K),
    Resolved(&'a V),
}

pub struct LinkCell<K, V> {
    key: K,
    value: OnceCell<V>,
}

impl<K, V> LinkCell<K, V> {
    pub fn new(key: K) -> Self {
        Self {
            key,
            value: OnceCell::new(),
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn state(&self) -> LinkState<'_, K, V> {
        match self.value.get() {
            Some(value) => LinkState::Resolved(value),
            None => LinkState::Unresolved(&self.key),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.value.get().is_some()
    }

    /// The cached value, resolving it first if needed. A failed resolution
    /// leaves the cell unresolved so the next access tries (and fails) again.
    pub fn get_or_resolve<E, F>(&self, resolve: F) -> Result<&V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
    {
        self.value.get_or_try_init(|| resolve(&self.key))
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for LinkCell<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state() {
            LinkState::Unresolved(key) => f.debug_tuple("Unresolved").field(key).finish(),
            LinkState::Resolved(value) => f.debug_tuple("Resolved").field(value).finish(),
        }
    }
}
