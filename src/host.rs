//! The navigation host.
//!
//! [`NavigationHost`] owns the middleware list and the lifecycle state, creates
//! a [`NavigationContext`] for every `nav`/`submit` call and drives it through
//! the [`MiddlewareChain`].
//!
//! # Navigation pipeline
//!
//! ```text
//! nav(options)
//!   ├─ resolve target against the environment's location
//!   ├─ allocate context (next index), supersede the in-flight one
//!   ├─ navigate chain (loading counter held)
//!   └─ settle
//!        ├─ redirected?  → outcome of the redirect target
//!        ├─ failed?      → error, current context untouched
//!        ├─ superseded?  → Aborted
//!        └─ otherwise    → becomes current, history updated, Navigated emitted
//! ```
//!
//! # Overrides
//!
//! Only one navigation is *active* at a time. Starting a new one while another
//! is still running its chain marks the old one overrided and fires its abort
//! signal immediately. A redirect issued through
//! [`NavigationContext::redirect`] marks the invoker overrided too, but fires
//! its abort signal only once the redirect target has settled.
//!
//! # Example
//!
//! ```no_run
//! use spa_navigator::{middleware_fn, MemoryEnvironment, NavigationHost};
//! use std::rc::Rc;
//!
//! # async fn demo() -> spa_navigator::Result<()> {
//! let env = Rc::new(MemoryEnvironment::from_url("https://app.test/")?);
//! let host = NavigationHost::new(env.clone());
//!
//! host.register(middleware_fn("guard").on_navigate(|cx, next| async move {
//!     if cx.path() == "/admin" {
//!         cx.redirect("/login").await?;
//!         return Ok(());
//!     }
//!     next.run().await
//! }))?;
//!
//! host.run(Default::default(), ()).await?;
//! let settled = host.nav("/admin").await?;
//! assert_eq!(settled.path(), "/login");
//! # Ok(())
//! # }
//! ```

use crate::config::HostConfig;
use crate::context::{
    ContextSeed, Data, NavOptions, NavigationContext, SharedNavigation, Source, SubmitContext,
    SubmitOptions, Submission,
};
use crate::emitter::{Emitter, Subscription};
use crate::environment::Environment;
use crate::error::{ConfigurationError, NavigationError, Result, TransportError};
use crate::lifecycle::{Lifecycle, LifecycleContext, StopContext};
use crate::middleware::{
    ChainEvent, HookFuture, HookResult, Middleware, MiddlewareChain, Terminal,
};
use crate::queue::{Body, Request, RequestQueue, RequestSpec, Response};
use crate::resolve::parse_url;
use crate::{debug_log, error_log, info_log, warn_log};
use futures::channel::oneshot;
use futures::future::{self, LocalBoxFuture, WeakShared};
use futures::FutureExt;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

/// Notification emitted by a host.
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// `start` hooks finished.
    Started,
    /// `loaded` hooks finished.
    Loaded,
    /// A navigation settled and became current.
    Navigated(NavigationContext),
    /// A non-GET submission finished its chain.
    Submitted(SubmitContext),
    /// `stop` hooks finished.
    Destroyed,
}

type SharedSubmission = WeakShared<LocalBoxFuture<'static, Result<SubmitContext>>>;

struct Registered {
    middleware: Rc<dyn Middleware>,
    any: Rc<dyn Any>,
}

pub(crate) struct HostInner {
    environment: Rc<dyn Environment>,
    config: HostConfig,
    queue: Option<RequestQueue>,
    registry: RefCell<Vec<Registered>>,
    lifecycle: Cell<Lifecycle>,
    next_index: Cell<u64>,
    current: RefCell<Option<NavigationContext>>,
    active: RefCell<Option<NavigationContext>>,
    loading: Cell<usize>,
    root: RefCell<Option<Rc<dyn Any>>>,
    submissions: RefCell<HashMap<String, (u64, SharedSubmission)>>,
    submission_seq: Cell<u64>,
    events: Emitter<HostEvent>,
}

/// Holds the loading counter up for the duration of a chain.
struct LoadingGuard<'a> {
    loading: &'a Cell<usize>,
}

impl<'a> LoadingGuard<'a> {
    fn new(loading: &'a Cell<usize>) -> Self {
        loading.set(loading.get() + 1);
        Self { loading }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.loading.set(self.loading.get().saturating_sub(1));
    }
}

/// Clears a form's in-flight marker once its attempt settles or is dropped.
struct SubmissionGuard {
    host: Weak<HostInner>,
    form: String,
    attempt: u64,
}

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        if let Some(host) = self.host.upgrade() {
            let mut submissions = host.submissions.borrow_mut();
            if submissions
                .get(&self.form)
                .is_some_and(|(attempt, _)| *attempt == self.attempt)
            {
                submissions.remove(&self.form);
            }
        }
    }
}

/// Builder for a [`NavigationHost`] with non-default configuration.
pub struct HostBuilder {
    environment: Rc<dyn Environment>,
    config: HostConfig,
    queue: Option<RequestQueue>,
}

impl HostBuilder {
    /// Host tunables.
    pub fn config(mut self, config: HostConfig) -> Self {
        self.config = config;
        self
    }

    /// Queue used to send non-GET submissions.
    pub fn queue(mut self, queue: RequestQueue) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn build(self) -> NavigationHost {
        NavigationHost {
            inner: Rc::new(HostInner {
                environment: self.environment,
                config: self.config,
                queue: self.queue,
                registry: RefCell::new(Vec::new()),
                lifecycle: Cell::new(Lifecycle::Uninitialized),
                next_index: Cell::new(0),
                current: RefCell::new(None),
                active: RefCell::new(None),
                loading: Cell::new(0),
                root: RefCell::new(None),
                submissions: RefCell::new(HashMap::new()),
                submission_seq: Cell::new(0),
                events: Emitter::new(),
            }),
        }
    }
}

/// Owner of the middleware list and the navigation state machine.
///
/// Cheap to clone; clones drive the same host.
#[derive(Clone)]
pub struct NavigationHost {
    inner: Rc<HostInner>,
}

impl NavigationHost {
    /// Host with the default configuration and no request queue.
    pub fn new(environment: impl Environment + 'static) -> Self {
        Self::builder(environment).build()
    }

    pub fn builder(environment: impl Environment + 'static) -> HostBuilder {
        HostBuilder {
            environment: Rc::new(environment),
            config: HostConfig::default(),
            queue: None,
        }
    }

    pub(crate) fn from_inner(inner: Rc<HostInner>) -> Self {
        Self { inner }
    }

    // ========================================================================
    // Registration and introspection
    // ========================================================================

    /// Append a middleware. Names must be unique within the host.
    pub fn register<M: Middleware>(&self, middleware: M) -> Result<(), ConfigurationError> {
        if self.inner.lifecycle.get() == Lifecycle::Destroyed {
            return Err(ConfigurationError::AlreadyDestroyed);
        }
        let mut registry = self.inner.registry.borrow_mut();
        let name = middleware.name().to_string();
        if registry.iter().any(|r| r.middleware.name() == name) {
            error_log!("Middleware '{}' registered twice", name);
            return Err(ConfigurationError::DuplicateMiddleware { name });
        }
        let middleware = Rc::new(middleware);
        debug_log!("Registered middleware '{}' at #{}", name, registry.len());
        registry.push(Registered {
            middleware: middleware.clone(),
            any: middleware,
        });
        Ok(())
    }

    /// Look up a registered middleware by name and concrete type.
    pub fn middleware<T: Middleware>(&self, name: &str) -> Option<Rc<T>> {
        self.inner
            .registry
            .borrow()
            .iter()
            .find(|r| r.middleware.name() == name)
            .and_then(|r| r.any.clone().downcast::<T>().ok())
    }

    /// Registered middleware names, in registration order.
    pub fn middleware_names(&self) -> Vec<String> {
        self.inner
            .registry
            .borrow()
            .iter()
            .map(|r| r.middleware.name().to_string())
            .collect()
    }

    /// Snapshot of the current middleware list.
    pub fn chain(&self) -> MiddlewareChain {
        MiddlewareChain::new(
            self.inner
                .registry
                .borrow()
                .iter()
                .map(|r| r.middleware.clone())
                .collect(),
        )
    }

    /// Subscribe to host events.
    pub fn on(&self, listener: impl Fn(&HostEvent) + 'static) -> Subscription {
        self.inner.events.on(listener)
    }

    /// Remove a listener added with [`on`](Self::on).
    pub fn off(&self, token: Subscription) -> bool {
        self.inner.events.off(token)
    }

    /// The last successfully settled navigation.
    pub fn current(&self) -> Option<NavigationContext> {
        self.inner.current.borrow().clone()
    }

    /// Index of the most recently started attempt (`0` before the first).
    pub fn last_index(&self) -> u64 {
        self.inner.next_index.get()
    }

    /// Number of chains currently running.
    pub fn loading(&self) -> usize {
        self.inner.loading.get()
    }

    pub fn is_loading(&self) -> bool {
        self.loading() > 0
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.lifecycle.get()
    }

    pub fn config(&self) -> &HostConfig {
        &self.inner.config
    }

    /// The queue non-GET submissions are sent through, if any.
    pub fn queue(&self) -> Option<&RequestQueue> {
        self.inner.queue.as_ref()
    }

    /// The root attached by [`run`](Self::run), if it has type `T`.
    pub fn root<T: Any>(&self) -> Option<Rc<T>> {
        self.inner.root.borrow().clone()?.downcast::<T>().ok()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start the host: attach `root`, run `start` then `loaded` hooks, then
    /// navigate to the environment's current location.
    ///
    /// Resolves to the data bag as left by the hooks. Callable once.
    pub fn run<R: Any>(&self, data: Data, root: R) -> impl Future<Output = Result<Data>> + 'static {
        let started = self.begin_run(Rc::new(root));
        let host = self.clone();
        async move {
            started?;
            host.drive_run(data).await
        }
    }

    fn begin_run(&self, root: Rc<dyn Any>) -> Result<(), ConfigurationError> {
        match self.inner.lifecycle.get() {
            Lifecycle::Uninitialized => {}
            Lifecycle::Destroyed => return Err(ConfigurationError::AlreadyDestroyed),
            Lifecycle::Started | Lifecycle::Loaded => {
                error_log!("run() called on a host that is already started");
                return Err(ConfigurationError::AlreadyStarted);
            }
        }
        self.inner.lifecycle.set(Lifecycle::Started);
        *self.inner.root.borrow_mut() = Some(root);
        Ok(())
    }

    async fn drive_run(&self, data: Data) -> Result<Data> {
        let cx = LifecycleContext::attached(data, Rc::downgrade(&self.inner));
        {
            let _loading = LoadingGuard::new(&self.inner.loading);
            info_log!("Starting navigation host");

            self.invoke_lifecycle(ChainEvent::Start(cx.clone())).await?;
            if self.inner.lifecycle.get() == Lifecycle::Destroyed {
                return Err(ConfigurationError::AlreadyDestroyed.into());
            }
            self.inner.lifecycle.set(Lifecycle::Loaded);
            self.inner.events.emit(&HostEvent::Started);

            self.invoke_lifecycle(ChainEvent::Loaded(cx.clone())).await?;
            self.inner.events.emit(&HostEvent::Loaded);
        }

        let options = NavOptions {
            data: cx.snapshot(),
            ..NavOptions::default()
        };
        let first = self.allocate(Source::First, options, None, None)?;
        let settled = self.drive(first).await?;
        let data = settled.data().clone();
        Ok(data)
    }

    async fn invoke_lifecycle(&self, event: ChainEvent) -> HookResult {
        let hook = event.hook();
        self.chain().invoke(event).await.map_err(|error| {
            error_log!("'{}' hooks failed: {}", hook, error);
            error
        })
    }

    /// Tear the host down: abort the in-flight navigation, destroy the queue
    /// and run `stop` hooks. Callable once.
    pub fn destroy(&self, data: Data) -> impl Future<Output = Result<StopContext>> + 'static {
        let begun = self.begin_destroy();
        let host = self.clone();
        async move {
            begun?;
            let cx = LifecycleContext::attached(data, Rc::downgrade(&host.inner));
            host.invoke_lifecycle(ChainEvent::Stop(cx.clone())).await?;
            info_log!("Navigation host destroyed");
            host.inner.events.emit(&HostEvent::Destroyed);
            host.inner.events.clear();
            Ok(cx)
        }
    }

    fn begin_destroy(&self) -> Result<(), ConfigurationError> {
        if self.inner.lifecycle.replace(Lifecycle::Destroyed) == Lifecycle::Destroyed {
            error_log!("destroy() called on a host that is already destroyed");
            return Err(ConfigurationError::AlreadyDestroyed);
        }
        let active = self.inner.active.borrow_mut().take();
        if let Some(active) = active {
            active.mark_overrided();
            active.abort_signal().abort();
        }
        if let Some(queue) = &self.inner.queue {
            queue.destroy();
        }
        Ok(())
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Navigate to `options` (or a URL string).
    ///
    /// Resolves to the context that settled: this attempt's own context, or
    /// the target of a redirect one of its hooks issued.
    pub fn nav(
        &self,
        options: impl Into<NavOptions>,
    ) -> impl Future<Output = Result<NavigationContext>> + 'static {
        let allocated = self.allocate(Source::Nav, options.into(), None, None);
        let host = self.clone();
        async move { host.drive(allocated?).await }
    }

    pub(crate) fn redirect_from(
        &self,
        invoker: &NavigationContext,
        options: NavOptions,
    ) -> LocalBoxFuture<'static, Result<NavigationContext>> {
        if invoker.is_aborted() {
            warn_log!("Ignoring redirect from aborted navigation #{}", invoker.index());
            let index = invoker.index();
            return future::ready(Err(NavigationError::Aborted { index })).boxed_local();
        }
        let target = match self.allocate(Source::Nav, options, Some(invoker), None) {
            Ok(target) => target,
            Err(error) => return future::ready(Err(error)).boxed_local(),
        };
        info_log!(
            "Navigation #{} redirects to #{} ({})",
            invoker.index(),
            target.index(),
            target.url()
        );

        let host = self.clone();
        let invoker_signal = invoker.abort_signal().clone();
        let shared: SharedNavigation = async move {
            let outcome = host.drive(target).await;
            invoker_signal.abort();
            outcome
        }
        .boxed_local()
        .shared();

        if !invoker.is_settled() {
            invoker.set_redirect_target(shared.clone());
        }
        shared.boxed_local()
    }

    /// Resolve the target and create its context.
    fn allocate(
        &self,
        source: Source,
        options: NavOptions,
        parent: Option<&NavigationContext>,
        submission: Option<Rc<Submission>>,
    ) -> Result<NavigationContext> {
        let lifecycle = self.inner.lifecycle.get();
        if !lifecycle.accepts_navigation() {
            let error = if lifecycle == Lifecycle::Destroyed {
                ConfigurationError::AlreadyDestroyed
            } else {
                ConfigurationError::NotStarted
            };
            return Err(error.into());
        }

        let mut location = parse_url(options.url.as_deref(), &self.inner.environment.location())
            .map_err(|error| {
                error_log!("Cannot resolve navigation target: {}", error);
                NavigationError::from(error)
            })?;
        if let Some(query) = &options.query {
            location.extend_query(query);
        }

        let depth = parent.map_or(0, |p| p.redirect_depth() + 1);
        if depth > self.inner.config.max_redirect_depth {
            error_log!(
                "Redirect loop detected at depth {} while redirecting to {}",
                depth,
                location
            );
            return Err(NavigationError::RedirectLoop {
                depth,
                target: location.full().to_string(),
            });
        }

        let supersedes = submission
            .as_ref()
            .map_or(true, |s| s.method.is_navigation());
        let index = self.inner.next_index.get() + 1;
        self.inner.next_index.set(index);

        let cx = NavigationContext::new(ContextSeed {
            index,
            source,
            location,
            replace: options.replace,
            data: options.data,
            current: self.current(),
            parent: parent.cloned(),
            submission,
            host: Rc::downgrade(&self.inner),
        });

        if let Some(parent) = parent {
            parent.mark_overrided();
        }
        if supersedes {
            let previous = self.inner.active.borrow_mut().replace(cx.clone());
            if let Some(previous) = previous.filter(|p| !p.is_settled()) {
                let is_invoker = parent.is_some_and(|p| p.ptr_eq(&previous));
                if !is_invoker {
                    if previous.mark_overrided() {
                        warn_log!(
                            "Navigation #{} superseded by #{}",
                            previous.index(),
                            cx.index()
                        );
                    }
                    previous.abort_signal().abort();
                }
            }
        }

        debug_log!("Allocated {:?}", cx);
        Ok(cx)
    }

    async fn drive(&self, cx: NavigationContext) -> Result<NavigationContext> {
        let result = {
            let _loading = LoadingGuard::new(&self.inner.loading);
            info_log!("Navigation #{} ({}) to {}", cx.index(), cx.source(), cx.url());
            self.chain().invoke(ChainEvent::Navigate(cx.clone())).await
        };
        self.settle(cx, result).await
    }

    async fn settle(&self, cx: NavigationContext, result: HookResult) -> Result<NavigationContext> {
        cx.mark_settled();
        self.release_active(&cx);

        if let Some(target) = cx.take_redirect_target() {
            if let Err(error) = &result {
                warn_log!("Navigation #{} failed after redirecting: {}", cx.index(), error);
            }
            return target.await;
        }

        if let Err(error) = result {
            if !error.is_aborted() {
                error_log!("Navigation #{} failed: {}", cx.index(), error);
            }
            return Err(error);
        }

        if cx.is_overrided() || self.inner.lifecycle.get() == Lifecycle::Destroyed {
            debug_log!("Discarding superseded navigation #{}", cx.index());
            return Err(NavigationError::Aborted { index: cx.index() });
        }

        self.commit(&cx);
        Ok(cx)
    }

    fn release_active(&self, cx: &NavigationContext) {
        let mut active = self.inner.active.borrow_mut();
        if active.as_ref().is_some_and(|a| a.ptr_eq(cx)) {
            *active = None;
        }
    }

    fn commit(&self, cx: &NavigationContext) {
        let newer_settled = self
            .inner
            .current
            .borrow()
            .as_ref()
            .is_some_and(|current| current.index() > cx.index());
        if newer_settled {
            debug_log!("Navigation #{} settled behind a newer one", cx.index());
            return;
        }
        *self.inner.current.borrow_mut() = Some(cx.clone());

        if self.inner.config.update_history && cx.source() != Source::First && !cx.external() {
            let shown = self.inner.environment.location();
            if cx.replace() || shown.full() == cx.url() {
                self.inner.environment.replace_state(cx.location());
            } else {
                self.inner.environment.push_state(cx.location());
            }
        }

        info_log!("Navigation #{} settled at {}", cx.index(), cx.url());
        self.inner.events.emit(&HostEvent::Navigated(cx.clone()));
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Submit a form.
    ///
    /// GET submissions navigate to the action with the fields merged into its
    /// query. Other methods run the `submit` chain and, when the host has a
    /// [`RequestQueue`], send the form through it. Submitting a form whose
    /// previous submission is still in flight returns that submission.
    pub fn submit(
        &self,
        options: impl Into<SubmitOptions>,
    ) -> LocalBoxFuture<'static, Result<SubmitContext>> {
        let options = options.into();
        let form = options.form.id.clone();

        let existing = self
            .inner
            .submissions
            .borrow()
            .get(&form)
            .and_then(|(_, weak)| weak.upgrade());
        if let Some(existing) = existing {
            debug_log!("Form '{}' is already submitting; sharing the attempt", form);
            return existing.boxed_local();
        }

        let submission = Rc::new(Submission::new(options.form, options.button));
        let mut query = if submission.method.is_navigation() {
            submission.query()
        } else {
            Default::default()
        };
        if let Some(extra) = &options.query {
            query.extend_replacing(extra);
        }
        let nav_options = NavOptions {
            url: submission.action().map(str::to_string),
            query: Some(query),
            replace: false,
            data: options.data,
        };
        let cx = match self.allocate(Source::Submit, nav_options, None, Some(submission.clone())) {
            Ok(cx) => SubmitContext::new(cx, submission),
            Err(error) => return future::ready(Err(error)).boxed_local(),
        };

        let attempt = self.inner.submission_seq.get() + 1;
        self.inner.submission_seq.set(attempt);
        let guard = SubmissionGuard {
            host: Rc::downgrade(&self.inner),
            form: form.clone(),
            attempt,
        };
        let host = self.clone();
        let shared = async move {
            let _marker = guard;
            host.drive_submit(cx).await
        }
        .boxed_local()
        .shared();

        if let Some(weak) = shared.downgrade() {
            self.inner
                .submissions
                .borrow_mut()
                .insert(form, (attempt, weak));
        }
        shared.boxed_local()
    }

    async fn drive_submit(&self, cx: SubmitContext) -> Result<SubmitContext> {
        if cx.method().is_navigation() {
            let settled = self.drive(cx.context().clone()).await?;
            return Ok(SubmitContext::new(settled, Rc::new(cx.submission().clone())));
        }

        let result = {
            let _loading = LoadingGuard::new(&self.inner.loading);
            info_log!(
                "Submission #{} of form '{}': {} {}",
                cx.index(),
                cx.form().id,
                cx.method(),
                cx.url()
            );
            let terminal = self.submit_terminal(&cx);
            self.chain()
                .invoke_with(ChainEvent::Submit(cx.clone()), terminal)
                .await
        };
        cx.mark_settled();

        if let Some(target) = cx.take_redirect_target() {
            target.await?;
            return Ok(cx);
        }

        match result {
            Ok(()) => {
                self.inner.events.emit(&HostEvent::Submitted(cx.clone()));
                Ok(cx)
            }
            Err(error) => {
                if !error.is_aborted() {
                    error_log!("Submission #{} failed: {}", cx.index(), error);
                }
                Err(error)
            }
        }
    }

    /// Innermost step of a non-GET `submit` chain.
    fn submit_terminal(&self, cx: &SubmitContext) -> Option<Terminal> {
        let queue = self.inner.queue.clone()?;
        let cx = cx.clone();
        Some(Rc::new(move || -> HookFuture<'static> {
            Box::pin(send_submission(queue.clone(), cx.clone()))
        }))
    }
}

/// Send the form through the queue and wait for its terminal callback.
async fn send_submission(queue: RequestQueue, cx: SubmitContext) -> HookResult {
    let (tx, rx) = oneshot::channel::<Result<Response, TransportError>>();
    let tx = Rc::new(Cell::new(Some(tx)));
    let on_error = tx.clone();

    let request = Request::new(cx.method(), cx.url())
        .header("Content-Type", cx.enctype())
        .body(Body::Form(cx.fields().to_vec()));
    queue.push(
        RequestSpec::new(request)
            .on_success(move |response| {
                if let Some(tx) = tx.take() {
                    let _ = tx.send(Ok(response));
                }
            })
            .on_error(move |error| {
                if let Some(tx) = on_error.take() {
                    let _ = tx.send(Err(error));
                }
            }),
    )?;

    match rx.await {
        Ok(Ok(response)) => {
            cx.set_response(response);
            Ok(())
        }
        Ok(Err(TransportError::Aborted)) => {
            debug_log!("Submission #{} was aborted by the queue", cx.index());
            Err(NavigationError::Aborted { index: cx.index() })
        }
        Ok(Err(error)) => Err(error.into()),
        // Both callbacks dropped unfired: a pre/post request veto.
        Err(oneshot::Canceled) => {
            warn_log!("Submission #{} was vetoed by the queue", cx.index());
            Ok(())
        }
    }
}

impl fmt::Debug for NavigationHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationHost")
            .field("lifecycle", &self.lifecycle())
            .field("middleware", &self.middleware_names())
            .field("current", &self.current().map(|c| c.index()))
            .field("last_index", &self.last_index())
            .field("loading", &self.loading())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::MemoryEnvironment;
    use crate::middleware::middleware_fn;

    fn host() -> NavigationHost {
        NavigationHost::new(MemoryEnvironment::from_url("http://localhost/").unwrap())
    }

    #[test]
    fn test_duplicate_middleware_is_rejected() {
        let host = host();
        host.register(middleware_fn("auth")).unwrap();
        assert_eq!(
            host.register(middleware_fn("auth")),
            Err(ConfigurationError::DuplicateMiddleware {
                name: "auth".to_string()
            })
        );
        assert_eq!(host.middleware_names(), ["auth"]);
    }

    #[test]
    fn test_typed_lookup() {
        struct Counter;
        impl Middleware for Counter {
            fn name(&self) -> &str {
                "counter"
            }
            fn hooks(&self) -> crate::HookSet {
                crate::HookSet::empty()
            }
        }

        let host = host();
        host.register(Counter).unwrap();
        assert!(host.middleware::<Counter>("counter").is_some());
        assert!(host
            .middleware::<crate::middleware::FnMiddleware>("counter")
            .is_none());
        assert!(host.middleware::<Counter>("missing").is_none());
    }

    #[test]
    fn test_nav_before_run_is_not_started() {
        let err = pollster::block_on(host().nav("/x")).unwrap_err();
        assert!(matches!(
            err,
            NavigationError::Configuration(ConfigurationError::NotStarted)
        ));
    }

    #[test]
    fn test_nav_after_destroy_is_rejected() {
        let host = host();
        pollster::block_on(host.run(Data::new(), ())).unwrap();
        pollster::block_on(host.destroy(Data::new())).unwrap();

        let err = pollster::block_on(host.nav("/x")).unwrap_err();
        assert!(matches!(
            err,
            NavigationError::Configuration(ConfigurationError::AlreadyDestroyed)
        ));
    }

    #[test]
    fn test_run_attaches_root() {
        let host = host();
        pollster::block_on(host.run(Data::new(), String::from("app"))).unwrap();
        assert_eq!(host.root::<String>().as_deref().map(String::as_str), Some("app"));
        assert!(host.root::<u32>().is_none());
        assert_eq!(host.lifecycle(), Lifecycle::Loaded);
        assert_eq!(host.current().map(|c| c.source()), Some(Source::First));
    }

    #[test]
    fn test_loading_guard_saturates() {
        let loading = Cell::new(0);
        {
            let _a = LoadingGuard::new(&loading);
            assert_eq!(loading.get(), 1);
        }
        loading.set(0);
        drop(LoadingGuard { loading: &loading });
        assert_eq!(loading.get(), 0);
    }
}
