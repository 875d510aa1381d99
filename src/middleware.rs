//! Onion middleware for lifecycle and navigation events.
//!
//! A [`NavigationHost`](crate::NavigationHost) owns an ordered list of
//! middleware. For each event (`start`, `loaded`, `navigate`, `submit`,
//! `stop`) the [`MiddlewareChain`] walks that list in registration order.
//! Every middleware that declares the hook receives the context and a
//! [`Next`] handle:
//!
//! - code before `next.run().await` runs on the way **down**,
//! - code after it runs on the way back **up**, in reverse registration order.
//!
//! A middleware that does not declare the hook is a pass-through.
//!
//! # Declaring hooks
//!
//! Hooks are an explicit capability set: [`Middleware::hooks`] returns a
//! [`HookSet`] and the chain dispatches only to the hooks it contains. A
//! declared hook whose method returns `None` (no future to await) rejects the
//! chain with [`ConfigurationError::NotAwaitable`].
//!
//! # Creating middleware
//!
//! | Approach | When to use |
//! |----------|-------------|
//! | Implement [`Middleware`] | Full control, shared state, borrowing hooks |
//! | [`middleware_fn`] | Quick one-off from closures |
//!
//! # Example
//!
//! ```no_run
//! use spa_navigator::{HookFuture, HookSet, Middleware, NavigationContext, Next};
//!
//! struct Timing;
//!
//! impl Middleware for Timing {
//!     fn name(&self) -> &str {
//!         "timing"
//!     }
//!
//!     fn hooks(&self) -> HookSet {
//!         HookSet::NAVIGATE
//!     }
//!
//!     fn navigate<'a>(&'a self, cx: &'a NavigationContext, next: Next) -> Option<HookFuture<'a>> {
//!         Some(Box::pin(async move {
//!             let started = std::time::Instant::now();
//!             next.run().await?;
//!             println!("#{} took {:?}", cx.index(), started.elapsed());
//!             Ok(())
//!         }))
//!     }
//! }
//! ```

use crate::context::{NavigationContext, SubmitContext};
use crate::error::{ConfigurationError, NavigationError};
use crate::lifecycle::LifecycleContext;
use crate::{debug_log, trace_log};
use futures::future::LocalBoxFuture;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

/// Outcome of a single hook or of a whole chain.
pub type HookResult = Result<(), NavigationError>;

/// Future returned by a hook.
pub type HookFuture<'a> = LocalBoxFuture<'a, HookResult>;

// ============================================================================
// Hooks
// ============================================================================

/// Named lifecycle event a middleware may handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// Host is starting (`run`).
    Start,
    /// Host finished starting; runs before the first navigation.
    Loaded,
    /// A navigation attempt (including GET submissions).
    Navigate,
    /// A non-GET form submission.
    Submit,
    /// Host is being destroyed.
    Stop,
}

impl Hook {
    /// Lower-case event name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Loaded => "loaded",
            Self::Navigate => "navigate",
            Self::Submit => "submit",
            Self::Stop => "stop",
        }
    }

    /// The capability bit for this hook.
    pub const fn flag(self) -> HookSet {
        match self {
            Self::Start => HookSet::START,
            Self::Loaded => HookSet::LOADED,
            Self::Navigate => HookSet::NAVIGATE,
            Self::Submit => HookSet::SUBMIT,
            Self::Stop => HookSet::STOP,
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags::bitflags! {
    /// Set of hooks a middleware implements.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HookSet: u8 {
        const START = 0b0000_0001;
        const LOADED = 0b0000_0010;
        const NAVIGATE = 0b0000_0100;
        const SUBMIT = 0b0000_1000;
        const STOP = 0b0001_0000;
    }
}

// ============================================================================
// Middleware trait
// ============================================================================

/// A participant in the host's onion pipeline.
///
/// Only the hooks named by [`hooks`](Middleware::hooks) are ever called.
/// The futures may borrow `self` and the context for their whole lifetime.
pub trait Middleware: 'static {
    /// Unique name within a host. Used by
    /// [`NavigationHost::middleware`](crate::NavigationHost::middleware) and in
    /// error messages.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Hooks this middleware handles.
    fn hooks(&self) -> HookSet;

    /// Host start.
    fn start<'a>(&'a self, _cx: &'a LifecycleContext, _next: Next) -> Option<HookFuture<'a>> {
        None
    }

    /// Host loaded.
    fn loaded<'a>(&'a self, _cx: &'a LifecycleContext, _next: Next) -> Option<HookFuture<'a>> {
        None
    }

    /// Navigation attempt.
    fn navigate<'a>(
        &'a self,
        _cx: &'a NavigationContext,
        _next: Next,
    ) -> Option<HookFuture<'a>> {
        None
    }

    /// Non-GET submission.
    fn submit<'a>(&'a self, _cx: &'a SubmitContext, _next: Next) -> Option<HookFuture<'a>> {
        None
    }

    /// Host stop.
    fn stop<'a>(&'a self, _cx: &'a LifecycleContext, _next: Next) -> Option<HookFuture<'a>> {
        None
    }
}

// ============================================================================
// Chain
// ============================================================================

/// One event travelling through the chain, with its context.
#[derive(Clone)]
pub enum ChainEvent {
    Start(LifecycleContext),
    Loaded(LifecycleContext),
    Navigate(NavigationContext),
    Submit(SubmitContext),
    Stop(LifecycleContext),
}

impl ChainEvent {
    /// Hook this event dispatches to.
    pub fn hook(&self) -> Hook {
        match self {
            Self::Start(_) => Hook::Start,
            Self::Loaded(_) => Hook::Loaded,
            Self::Navigate(_) => Hook::Navigate,
            Self::Submit(_) => Hook::Submit,
            Self::Stop(_) => Hook::Stop,
        }
    }

    fn dispatch<'a>(&'a self, node: &'a dyn Middleware, next: Next) -> Option<HookFuture<'a>> {
        match self {
            Self::Start(cx) => node.start(cx, next),
            Self::Loaded(cx) => node.loaded(cx, next),
            Self::Navigate(cx) => node.navigate(cx, next),
            Self::Submit(cx) => node.submit(cx, next),
            Self::Stop(cx) => node.stop(cx, next),
        }
    }
}

/// Innermost step, run when every middleware has called `next`.
pub(crate) type Terminal = Rc<dyn Fn() -> HookFuture<'static>>;

/// Snapshot of the middleware list, in registration order.
#[derive(Clone)]
pub struct MiddlewareChain {
    nodes: Rc<[Rc<dyn Middleware>]>,
}

impl MiddlewareChain {
    /// Build a chain from middleware in registration order.
    pub fn new(nodes: Vec<Rc<dyn Middleware>>) -> Self {
        Self {
            nodes: nodes.into(),
        }
    }

    /// Number of middleware in the chain.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` if the chain has no middleware.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Run `event` through every middleware.
    ///
    /// Errors from any hook propagate to the caller after the outer hooks
    /// have unwound; none are swallowed.
    pub fn invoke(&self, event: ChainEvent) -> HookFuture<'static> {
        self.invoke_with(event, None)
    }

    pub(crate) fn invoke_with(
        &self,
        event: ChainEvent,
        terminal: Option<Terminal>,
    ) -> HookFuture<'static> {
        debug_log!(
            "Invoking '{}' chain across {} middleware",
            event.hook(),
            self.nodes.len()
        );
        Next {
            nodes: self.nodes.clone(),
            position: 0,
            event,
            terminal,
        }
        .run()
    }
}

impl Default for MiddlewareChain {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.nodes.iter().map(|node| node.name()))
            .finish()
    }
}

/// Continuation handed to each hook.
///
/// [`run`](Next::run) resumes the chain at the following middleware, or
/// resolves immediately when none remain. `Next` is `Clone`; calling it more
/// than once re-runs the rest of the chain and is the hook's responsibility.
#[derive(Clone)]
pub struct Next {
    nodes: Rc<[Rc<dyn Middleware>]>,
    position: usize,
    event: ChainEvent,
    terminal: Option<Terminal>,
}

impl Next {
    /// Continue down the chain.
    pub fn run(self) -> HookFuture<'static> {
        Box::pin(self.resume())
    }

    /// Hook currently being dispatched.
    pub fn hook(&self) -> Hook {
        self.event.hook()
    }

    /// Middleware still ahead of this continuation.
    pub fn remaining(&self) -> usize {
        self.nodes.len().saturating_sub(self.position)
    }

    async fn resume(self) -> HookResult {
        let Some(node) = self.nodes.get(self.position).cloned() else {
            return match &self.terminal {
                Some(terminal) => terminal().await,
                None => Ok(()),
            };
        };

        let hook = self.event.hook();
        let next = Next {
            nodes: self.nodes.clone(),
            position: self.position + 1,
            event: self.event.clone(),
            terminal: self.terminal.clone(),
        };

        if !node.hooks().contains(hook.flag()) {
            trace_log!("Middleware '{}' skips '{}'", node.name(), hook);
            return next.run().await;
        }

        trace_log!("Middleware '{}' handles '{}'", node.name(), hook);
        // Bound so the hook future drops before `node` and `self`.
        let result = match self.event.dispatch(node.as_ref(), next) {
            Some(future) => future.await,
            None => Err(ConfigurationError::NotAwaitable {
                middleware: node.name().to_string(),
                hook,
            }
            .into()),
        };
        result
    }
}

// ============================================================================
// middleware_fn helper
// ============================================================================

type LifecycleFn = Box<dyn Fn(LifecycleContext, Next) -> HookFuture<'static>>;
type NavigateFn = Box<dyn Fn(NavigationContext, Next) -> HookFuture<'static>>;
type SubmitFn = Box<dyn Fn(SubmitContext, Next) -> HookFuture<'static>>;

/// Create middleware from closures.
///
/// Each `on_*` call installs one hook and adds it to the declared
/// [`HookSet`]. Closures receive owned (cheaply cloned) contexts.
///
/// # Example
///
/// ```no_run
/// use spa_navigator::middleware_fn;
///
/// let logger = middleware_fn("logger").on_navigate(|cx, next| async move {
///     println!("-> {}", cx.path());
///     next.run().await?;
///     println!("<- {}", cx.path());
///     Ok(())
/// });
/// ```
pub fn middleware_fn(name: impl Into<String>) -> FnMiddleware {
    FnMiddleware {
        name: name.into(),
        declared: HookSet::empty(),
        start: None,
        loaded: None,
        navigate: None,
        submit: None,
        stop: None,
    }
}

/// Middleware created from closures via [`middleware_fn`].
pub struct FnMiddleware {
    name: String,
    declared: HookSet,
    start: Option<LifecycleFn>,
    loaded: Option<LifecycleFn>,
    navigate: Option<NavigateFn>,
    submit: Option<SubmitFn>,
    stop: Option<LifecycleFn>,
}

fn boxed_lifecycle<F, Fut>(f: F) -> LifecycleFn
where
    F: Fn(LifecycleContext, Next) -> Fut + 'static,
    Fut: Future<Output = HookResult> + 'static,
{
    Box::new(move |cx, next| Box::pin(f(cx, next)))
}

impl FnMiddleware {
    /// Handle `start`.
    pub fn on_start<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(LifecycleContext, Next) -> Fut + 'static,
        Fut: Future<Output = HookResult> + 'static,
    {
        self.start = Some(boxed_lifecycle(f));
        self.declared |= HookSet::START;
        self
    }

    /// Handle `loaded`.
    pub fn on_loaded<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(LifecycleContext, Next) -> Fut + 'static,
        Fut: Future<Output = HookResult> + 'static,
    {
        self.loaded = Some(boxed_lifecycle(f));
        self.declared |= HookSet::LOADED;
        self
    }

    /// Handle `navigate`.
    pub fn on_navigate<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(NavigationContext, Next) -> Fut + 'static,
        Fut: Future<Output = HookResult> + 'static,
    {
        self.navigate = Some(Box::new(move |cx, next| Box::pin(f(cx, next))));
        self.declared |= HookSet::NAVIGATE;
        self
    }

    /// Handle `submit`.
    pub fn on_submit<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(SubmitContext, Next) -> Fut + 'static,
        Fut: Future<Output = HookResult> + 'static,
    {
        self.submit = Some(Box::new(move |cx, next| Box::pin(f(cx, next))));
        self.declared |= HookSet::SUBMIT;
        self
    }

    /// Handle `stop`.
    pub fn on_stop<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(LifecycleContext, Next) -> Fut + 'static,
        Fut: Future<Output = HookResult> + 'static,
    {
        self.stop = Some(boxed_lifecycle(f));
        self.declared |= HookSet::STOP;
        self
    }

    /// Declare hooks without installing handlers for them.
    ///
    /// A declared hook with no handler fails the chain with
    /// [`ConfigurationError::NotAwaitable`].
    pub fn declare(mut self, hooks: HookSet) -> Self {
        self.declared |= hooks;
        self
    }
}

impl Middleware for FnMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    fn hooks(&self) -> HookSet {
        self.declared
    }

    fn start<'a>(&'a self, cx: &'a LifecycleContext, next: Next) -> Option<HookFuture<'a>> {
        self.start.as_ref().map(|f| f(cx.clone(), next))
    }

    fn loaded<'a>(&'a self, cx: &'a LifecycleContext, next: Next) -> Option<HookFuture<'a>> {
        self.loaded.as_ref().map(|f| f(cx.clone(), next))
    }

    fn navigate<'a>(&'a self, cx: &'a NavigationContext, next: Next) -> Option<HookFuture<'a>> {
        self.navigate.as_ref().map(|f| f(cx.clone(), next))
    }

    fn submit<'a>(&'a self, cx: &'a SubmitContext, next: Next) -> Option<HookFuture<'a>> {
        self.submit.as_ref().map(|f| f(cx.clone(), next))
    }

    fn stop<'a>(&'a self, cx: &'a LifecycleContext, next: Next) -> Option<HookFuture<'a>> {
        self.stop.as_ref().map(|f| f(cx.clone(), next))
    }
}

// ============================================================================
// Tests
// ============================================================================
