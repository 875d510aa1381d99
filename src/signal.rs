//! Cooperative cancellation.
//!
//! Every [`NavigationContext`](crate::NavigationContext) carries an
//! [`AbortSignal`]. The engine only ever *fires* the signal; hooks observe it
//! at their own suspension points and return early. Nothing is forcibly
//! unwound.
//!
//! ```
//! use spa_navigator::AbortSignal;
//!
//! let signal = AbortSignal::new();
//! assert!(!signal.is_aborted());
//! signal.abort();
//! signal.abort(); // idempotent
//! assert!(signal.is_aborted());
//! ```

use crate::emitter::{Emitter, Subscription};
use futures::channel::oneshot;
use futures::FutureExt;
use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

struct SignalInner {
    aborted: Cell<bool>,
    listeners: Emitter<()>,
}

/// Shared, single-fire cancellation flag.
///
/// Clones observe the same flag.
#[derive(Clone)]
pub struct AbortSignal {
    inner: Rc<SignalInner>,
}

impl AbortSignal {
    /// Create a signal that has not fired.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SignalInner {
                aborted: Cell::new(false),
                listeners: Emitter::new(),
            }),
        }
    }

    /// `true` once [`abort`](Self::abort) has been called.
    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.get()
    }

    /// Fire the signal. Listeners run once; later calls are no-ops.
    ///
    /// Returns `true` if this call fired the signal.
    pub fn abort(&self) -> bool {
        if self.inner.aborted.replace(true) {
            return false;
        }
        self.inner.listeners.drain(&());
        true
    }

    /// Run `listener` when the signal fires.
    ///
    /// If the signal already fired, the listener runs immediately, is not
    /// kept, and the returned token is inert.
    pub fn on_abort(&self, listener: impl Fn() + 'static) -> Subscription {
        if self.is_aborted() {
            listener();
            return Subscription::inert();
        }
        self.inner.listeners.on(move |_: &()| listener())
    }

    /// Remove a listener registered with [`on_abort`](Self::on_abort).
    pub fn off(&self, token: Subscription) -> bool {
        self.inner.listeners.off(token)
    }

    /// Future that resolves once the signal has fired.
    ///
    /// Dropping the future before then unregisters its listener.
    pub fn aborted(&self) -> Aborted {
        let (tx, rx) = oneshot::channel::<()>();
        let tx = Cell::new(Some(tx));
        let token = self.on_abort(move || {
            if let Some(tx) = tx.take() {
                let _ = tx.send(());
            }
        });
        Aborted {
            signal: self.clone(),
            token: Some(token),
            rx,
        }
    }

    /// Number of listeners still waiting for the signal.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }
}

/// Future returned by [`AbortSignal::aborted`].
#[must_use = "futures do nothing unless polled"]
pub struct Aborted {
    signal: AbortSignal,
    token: Option<Subscription>,
    rx: oneshot::Receiver<()>,
}

impl Future for Aborted {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        match self.rx.poll_unpin(cx) {
            // The sender only goes away once the signal has fired.
            Poll::Ready(_) => {
                self.token = None;
                Poll::Ready(())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for Aborted {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            self.signal.off(token);
        }
    }
}

impl fmt::Debug for Aborted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aborted")
            .field("aborted", &self.signal.is_aborted())
            .finish()
    }
}

impl Default for AbortSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortSignal")
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listeners_fire_once() {
        let signal = AbortSignal::new();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        signal.on_abort(move || counter.set(counter.get() + 1));

        assert!(signal.abort());
        assert!(!signal.abort());
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_off_prevents_call() {
        let signal = AbortSignal::new();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let token = signal.on_abort(move || counter.set(counter.get() + 1));

        assert!(signal.off(token));
        signal.abort();
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_late_listener_runs_immediately() {
        let signal = AbortSignal::new();
        signal.abort();

        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        signal.on_abort(move || counter.set(counter.get() + 1));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_aborted_future() {
        let signal = AbortSignal::new();
        let mut waiting = Box::pin(signal.aborted());
        assert!(waiting.as_mut().now_or_never().is_none());

        signal.clone().abort();
        assert!(waiting.now_or_never().is_some());
    }

    #[test]
    fn test_listener_subscribing_during_abort_runs_once() {
        let signal = AbortSignal::new();
        let hits = Rc::new(Cell::new(0));
        let late = Rc::new(Cell::new(0));

        let counter = hits.clone();
        signal.on_abort(move || counter.set(counter.get() + 1));
        let inner = signal.clone();
        let late_counter = late.clone();
        signal.on_abort(move || {
            let late_counter = late_counter.clone();
            inner.on_abort(move || late_counter.set(late_counter.get() + 1));
        });

        assert!(signal.abort());
        assert_eq!(hits.get(), 1);
        assert_eq!(late.get(), 1);
        assert_eq!(signal.listener_count(), 0);
    }

    #[test]
    fn test_awaiting_inside_listener_after_abort() {
        let signal = AbortSignal::new();
        let inner = signal.clone();
        let resolved = Rc::new(Cell::new(false));
        let flag = resolved.clone();
        signal.on_abort(move || {
            flag.set(inner.aborted().now_or_never().is_some());
        });

        signal.abort();
        assert!(resolved.get());
    }

    #[test]
    fn test_dropped_aborted_future_unregisters() {
        let signal = AbortSignal::new();
        let waiting = signal.aborted();
        assert_eq!(signal.listener_count(), 1);

        drop(waiting);
        assert_eq!(signal.listener_count(), 0);
    }
}
