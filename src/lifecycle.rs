//! Host lifecycle state and the context passed to lifecycle hooks.
//!
//! A [`NavigationHost`](crate::NavigationHost) moves through these states:
//!
//! ```text
//! Uninitialized ──run──▶ Started ──start hooks──▶ Loaded ──destroy──▶ Destroyed
//!                                                  │  ▲
//!                                          nav ────┘  └── settle   (Idle ⇄ Navigating)
//! ```
//!
//! `Started` and `Loaded` are entered exactly once. `Destroyed` is terminal:
//! `run`, `nav` and `submit` are rejected afterwards.
//!
//! # Lifecycle pipeline
//!
//! 1. **`start`**: middleware set up shared state; `run`'s data is on the context.
//! 2. **`loaded`**: everything is registered; last chance before the first page.
//! 3. **first navigation**: `navigate` hooks see `Source::First`.
//! 4. **`stop`**: `destroy` tears middleware down.

use crate::context::Data;
use crate::host::{HostInner, NavigationHost};
use serde_json::Value;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

/// Coarse lifecycle of a navigation host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Created, `run` not yet called.
    Uninitialized,
    /// `run` called; `start` hooks in progress.
    Started,
    /// `start` finished; navigations are accepted.
    Loaded,
    /// `destroy` called. Terminal.
    Destroyed,
}

impl Lifecycle {
    /// `true` while `nav`/`submit` are accepted.
    pub fn accepts_navigation(self) -> bool {
        matches!(self, Self::Loaded)
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Started => "started",
            Self::Loaded => "loaded",
            Self::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

struct LifecycleInner {
    data: RefCell<Data>,
    host: Weak<HostInner>,
}

/// Context for `start`, `loaded` and `stop` hooks.
///
/// Cheap to clone; clones share the same data bag.
#[derive(Clone)]
pub struct LifecycleContext {
    inner: Rc<LifecycleInner>,
}

/// Context returned by [`NavigationHost::destroy`](crate::NavigationHost::destroy).
pub type StopContext = LifecycleContext;

impl LifecycleContext {
    /// Context not attached to any host.
    pub fn new(data: Data) -> Self {
        Self::attached(data, Weak::new())
    }

    pub(crate) fn attached(data: Data, host: Weak<HostInner>) -> Self {
        Self {
            inner: Rc::new(LifecycleInner {
                data: RefCell::new(data),
                host,
            }),
        }
    }

    /// Borrow the data bag. Do not hold the borrow across an `await`.
    pub fn data(&self) -> Ref<'_, Data> {
        self.inner.data.borrow()
    }

    /// Mutably borrow the data bag. Do not hold the borrow across an `await`.
    pub fn data_mut(&self) -> RefMut<'_, Data> {
        self.inner.data.borrow_mut()
    }

    /// Clone one value out of the data bag.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.data.borrow().get(key).cloned()
    }

    /// Insert a value into the data bag, returning the previous one.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner.data.borrow_mut().insert(key.into(), value.into())
    }

    /// Snapshot of the data bag.
    pub fn snapshot(&self) -> Data {
        self.inner.data.borrow().clone()
    }

    /// The host running this lifecycle, if it is still alive.
    pub fn host(&self) -> Option<NavigationHost> {
        self.inner.host.upgrade().map(NavigationHost::from_inner)
    }
}

impl Default for LifecycleContext {
    fn default() -> Self {
        Self::new(Data::new())
    }
}

impl fmt::Debug for LifecycleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleContext")
            .field("data", &*self.inner.data.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lifecycle_accepts_navigation_only_when_loaded() {
        assert!(!Lifecycle::Uninitialized.accepts_navigation());
        assert!(!Lifecycle::Started.accepts_navigation());
        assert!(Lifecycle::Loaded.accepts_navigation());
        assert!(!Lifecycle::Destroyed.accepts_navigation());
    }

    #[test]
    fn test_clones_share_data() {
        let cx = LifecycleContext::default();
        let other = cx.clone();
        other.insert("user", json!({"id": 7}));

        assert_eq!(cx.get("user"), Some(json!({"id": 7})));
        assert_eq!(cx.snapshot().len(), 1);
    }

    #[test]
    fn test_detached_context_has_no_host() {
        assert!(LifecycleContext::default().host().is_none());
    }
}
