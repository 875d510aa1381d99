//! Listener registry with explicit subscription tokens.
//!
//! [`Emitter::on`] hands back a [`Subscription`]; passing that token to
//! [`Emitter::off`] removes exactly that listener. No identity comparison of
//! closures is ever needed.
//!
//! ```
//! use spa_navigator::Emitter;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let emitter = Emitter::<u32>::new();
//! let seen = Rc::new(Cell::new(0));
//! let sink = seen.clone();
//! let token = emitter.on(move |v| sink.set(sink.get() + v));
//!
//! emitter.emit(&2);
//! assert!(emitter.off(token));
//! emitter.emit(&5);
//! assert_eq!(seen.get(), 2);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Token identifying one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

impl Subscription {
    /// Token that matches no listener.
    pub(crate) const fn inert() -> Self {
        Self(0)
    }
}

type Listener<T> = Rc<dyn Fn(&T)>;

/// Ordered set of listeners for values of type `T`.
pub struct Emitter<T> {
    listeners: RefCell<Vec<(Subscription, Listener<T>)>>,
    next_id: Cell<u64>,
}

impl<T> Emitter<T> {
    /// Create an emitter with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }
    }

    /// Register a listener. Listeners run in registration order.
    pub fn on(&self, listener: impl Fn(&T) + 'static) -> Subscription {
        let token = Subscription(self.next_id.get());
        self.next_id.set(token.0 + 1);
        self.listeners
            .borrow_mut()
            .push((token, Rc::new(listener)));
        token
    }

    /// Remove the listener registered under `token`.
    ///
    /// Returns `false` when the token is unknown or was already removed.
    pub fn off(&self, token: Subscription) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(id, _)| *id != token);
        listeners.len() != before
    }

    /// Call every listener with `value`.
    ///
    /// The listener list is snapshotted first, so listeners may subscribe or
    /// unsubscribe while the emission is running.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Listener<T>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in snapshot {
            listener(value);
        }
    }

    /// Remove every listener, then call each of them once with `value`.
    ///
    /// Listeners registered while this runs are kept for the next emission.
    pub fn drain(&self, value: &T) {
        let drained = std::mem::take(&mut *self.listeners.borrow_mut());
        for (_, listener) in drained {
            listener(value);
        }
    }

    /// Drop every listener.
    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// `true` if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }
}

impl<T> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.len())
            .finish()
    }
}
