//! Navigation and submission contexts.
//!
//! Every call to [`NavigationHost::nav`](crate::NavigationHost::nav) or
//! [`NavigationHost::submit`](crate::NavigationHost::submit) allocates one
//! [`NavigationContext`]: the value object that hooks inspect and decorate
//! while the attempt travels through the middleware chain.
//!
//! - [`NavigationContext`]: identity (`index`), [`Source`], resolved
//!   [`Location`], `replace` flag, data bag, [`AbortSignal`], and links to the
//!   `parent` (the context whose hook redirected here) and the `current`
//!   context it was derived from.
//! - [`SubmitContext`]: a navigation context that also carries the form
//!   [`Submission`] (method, enctype, fields) and, for non-GET submissions
//!   sent through the request queue, the [`Response`].
//! - [`NavOptions`] / [`SubmitOptions`]: what callers pass in.
//!
//! Contexts are cheap handles: clones observe the same state.
//!
//! # Superseded contexts
//!
//! A context becomes *overrided* exactly once, when a later navigation takes
//! precedence. Its hooks keep running to completion, but the host discards the
//! result. Hooks can check [`NavigationContext::is_overrided`] or
//! [`NavigationContext::checkpoint`] before producing visible side effects.

use crate::error::NavigationError;
use crate::host::{HostInner, NavigationHost};
use crate::queue::{Method, Response};
use crate::resolve::Location;
use crate::signal::AbortSignal;
use crate::QueryParams;
use futures::future::{LocalBoxFuture, Shared};
use serde_json::Value;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

/// Open key-value bag owned by the caller and the hooks.
pub type Data = serde_json::Map<String, Value>;

/// Eventual outcome of a navigation, shareable between several awaiters.
pub(crate) type SharedNavigation =
    Shared<LocalBoxFuture<'static, Result<NavigationContext, NavigationError>>>;

/// What started a navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// The navigation issued by `run` for the initial location.
    First,
    /// `nav()` or an in-hook redirect.
    Nav,
    /// A form submission.
    Submit,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::First => "first",
            Self::Nav => "nav",
            Self::Submit => "submit",
        })
    }
}

// ============================================================================
// NavigationContext
// ============================================================================

pub(crate) struct ContextInner {
    index: u64,
    source: Source,
    location: Location,
    replace: bool,
    data: RefCell<Data>,
    abort: AbortSignal,
    current: Option<Weak<ContextInner>>,
    parent: Option<NavigationContext>,
    overrided: Cell<bool>,
    settled: Cell<bool>,
    submission: Option<Rc<Submission>>,
    response: RefCell<Option<Response>>,
    redirect_target: RefCell<Option<SharedNavigation>>,
    host: Weak<HostInner>,
}

/// Fields needed to allocate a context.
pub(crate) struct ContextSeed {
    pub index: u64,
    pub source: Source,
    pub location: Location,
    pub replace: bool,
    pub data: Data,
    pub current: Option<NavigationContext>,
    pub parent: Option<NavigationContext>,
    pub submission: Option<Rc<Submission>>,
    pub host: Weak<HostInner>,
}

/// One navigation or submission attempt.
#[derive(Clone)]
pub struct NavigationContext {
    inner: Rc<ContextInner>,
}

impl NavigationContext {
    pub(crate) fn new(seed: ContextSeed) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                index: seed.index,
                source: seed.source,
                location: seed.location,
                replace: seed.replace,
                data: RefCell::new(seed.data),
                abort: AbortSignal::new(),
                current: seed.current.as_ref().map(|c| Rc::downgrade(&c.inner)),
                parent: seed.parent,
                overrided: Cell::new(false),
                settled: Cell::new(false),
                submission: seed.submission,
                response: RefCell::new(None),
                redirect_target: RefCell::new(None),
                host: seed.host,
            }),
        }
    }

    /// Host-scoped, strictly increasing identity. The first attempt is `1`.
    pub fn index(&self) -> u64 {
        self.inner.index
    }

    /// What started this attempt.
    pub fn source(&self) -> Source {
        self.inner.source
    }

    /// Resolved target.
    pub fn location(&self) -> &Location {
        &self.inner.location
    }

    /// Full target URL.
    pub fn url(&self) -> &str {
        self.inner.location.full()
    }

    /// Target origin.
    pub fn origin(&self) -> &str {
        self.inner.location.origin()
    }

    /// Target path.
    pub fn path(&self) -> &str {
        self.inner.location.path()
    }

    /// Target query.
    pub fn query(&self) -> &QueryParams {
        self.inner.location.query()
    }

    /// Target hash.
    pub fn hash(&self) -> Option<&str> {
        self.inner.location.hash()
    }

    /// `true` when the target lives on another origin.
    pub fn external(&self) -> bool {
        self.inner.location.external()
    }

    /// `true` when the history entry should be replaced instead of pushed.
    pub fn replace(&self) -> bool {
        self.inner.replace
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

    /// Cancellation signal for this attempt.
    pub fn abort_signal(&self) -> &AbortSignal {
        &self.inner.abort
    }

    /// `true` once the abort signal has fired.
    pub fn is_aborted(&self) -> bool {
        self.inner.abort.is_aborted()
    }

    /// Return early from a hook once this context was aborted.
    ///
    /// ```ignore
    /// cx.checkpoint()?;
    /// ```
    pub fn checkpoint(&self) -> Result<(), NavigationError> {
        if self.is_aborted() {
            Err(NavigationError::Aborted { index: self.index() })
        } else {
            Ok(())
        }
    }

    /// `true` once a later navigation took precedence. Never reverts.
    pub fn is_overrided(&self) -> bool {
        self.inner.overrided.get()
    }

    /// `true` once this attempt's own chain finished.
    pub fn is_settled(&self) -> bool {
        self.inner.settled.get()
    }

    /// The context this one redirected from.
    pub fn parent(&self) -> Option<&NavigationContext> {
        self.inner.parent.as_ref()
    }

    /// The settled context this attempt was derived from (the page being left,
    /// or the page a form was submitted from), while it is still alive.
    pub fn current(&self) -> Option<NavigationContext> {
        self.inner
            .current
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Self { inner })
    }

    /// Number of redirects between the originating attempt and this one.
    pub fn redirect_depth(&self) -> usize {
        let mut depth = 0;
        let mut cursor = self.parent();
        while let Some(parent) = cursor {
            depth += 1;
            cursor = parent.parent();
        }
        depth
    }

    /// Form data, for contexts created by `submit`.
    pub fn submission(&self) -> Option<&Submission> {
        self.inner.submission.as_deref()
    }

    /// Response of a non-GET submission sent through the request queue.
    pub fn response(&self) -> Option<Response> {
        self.inner.response.borrow().clone()
    }

    /// The host that created this context, if it is still alive.
    pub fn host(&self) -> Option<NavigationHost> {
        self.inner.host.upgrade().map(NavigationHost::from_inner)
    }

    /// Navigate elsewhere on behalf of this context.
    ///
    /// Equivalent to `nav(options)` with this context as the invoker: the new
    /// context's `parent` is `self`, `self` becomes overrided, and its abort
    /// signal fires once the target settles. The target's outcome is what the
    /// original `nav()` call eventually resolves to.
    pub fn redirect(
        &self,
        options: impl Into<NavOptions>,
    ) -> LocalBoxFuture<'static, Result<NavigationContext, NavigationError>> {
        match self.host() {
            Some(host) => host.redirect_from(self, options.into()),
            None => {
                let index = self.index();
                Box::pin(async move { Err(NavigationError::Aborted { index }) })
            }
        }
    }

    /// `true` when both handles refer to the same attempt.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn mark_overrided(&self) -> bool {
        !self.inner.overrided.replace(true)
    }

    pub(crate) fn mark_settled(&self) {
        self.inner.settled.set(true);
    }

    pub(crate) fn set_response(&self, response: Response) {
        *self.inner.response.borrow_mut() = Some(response);
    }

    pub(crate) fn set_redirect_target(&self, target: SharedNavigation) {
        *self.inner.redirect_target.borrow_mut() = Some(target);
    }

    pub(crate) fn take_redirect_target(&self) -> Option<SharedNavigation> {
        self.inner.redirect_target.borrow_mut().take()
    }
}

impl fmt::Debug for NavigationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationContext")
            .field("index", &self.index())
            .field("source", &self.source())
            .field("url", &self.url())
            .field("replace", &self.replace())
            .field("parent", &self.parent().map(NavigationContext::index))
            .field("overrided", &self.is_overrided())
            .field("aborted", &self.is_aborted())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Submissions
// ============================================================================

/// Default form encoding.
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// The form being submitted.
///
/// `id` identifies the form instance: a second submission of the same `id`
/// while the first is still in flight returns the first attempt's result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormDescriptor {
    pub id: String,
    pub action: Option<String>,
    pub method: Option<String>,
    pub enctype: Option<String>,
    pub fields: Vec<(String, String)>,
}

impl FormDescriptor {
    /// A form with no action (submits to the current location) and no fields.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Set the `action` URL.
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Set the `method` attribute.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Set the `enctype` attribute.
    pub fn enctype(mut self, enctype: impl Into<String>) -> Self {
        self.enctype = Some(enctype.into());
        self
    }

    /// Append a field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }
}

/// The button that triggered a submission. Its `form*` attributes override
/// the form's.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonDescriptor {
    pub name: Option<String>,
    pub value: Option<String>,
    pub formaction: Option<String>,
    pub formmethod: Option<String>,
    pub formenctype: Option<String>,
}

impl ButtonDescriptor {
    /// A button contributing `name=value` to the submitted fields.
    pub fn named(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// Override the form's action.
    pub fn formaction(mut self, action: impl Into<String>) -> Self {
        self.formaction = Some(action.into());
        self
    }

    /// Override the form's method.
    pub fn formmethod(mut self, method: impl Into<String>) -> Self {
        self.formmethod = Some(method.into());
        self
    }

    /// Override the form's enctype.
    pub fn formenctype(mut self, enctype: impl Into<String>) -> Self {
        self.formenctype = Some(enctype.into());
        self
    }
}

/// Effective submission parameters after applying button overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub form: FormDescriptor,
    pub button: Option<ButtonDescriptor>,
    pub method: Method,
    pub enctype: String,
    pub fields: Vec<(String, String)>,
}

impl Submission {
    /// Combine a form and its submitting button.
    pub fn new(form: FormDescriptor, button: Option<ButtonDescriptor>) -> Self {
        let pick = |from_button: Option<&String>, from_form: Option<&String>| {
            from_button.or(from_form).cloned()
        };
        let button_ref = button.as_ref();

        let method = Method::parse_lenient(
            pick(
                button_ref.and_then(|b| b.formmethod.as_ref()),
                form.method.as_ref(),
            )
            .as_deref(),
        );
        let enctype = pick(
            button_ref.and_then(|b| b.formenctype.as_ref()),
            form.enctype.as_ref(),
        )
        .unwrap_or_else(|| FORM_URLENCODED.to_string());

        let mut fields = form.fields.clone();
        if let Some(name) = button_ref.and_then(|b| b.name.clone()) {
            let value = button_ref
                .and_then(|b| b.value.clone())
                .unwrap_or_default();
            fields.push((name, value));
        }

        Self {
            form,
            button,
            method,
            enctype,
            fields,
        }
    }

    /// The action URL candidate, before resolution.
    pub fn action(&self) -> Option<&str> {
        self.button
            .as_ref()
            .and_then(|b| b.formaction.as_deref())
            .or(self.form.action.as_deref())
    }

    /// Fields as query parameters (repeated names keep every value).
    pub fn query(&self) -> QueryParams {
        self.fields.iter().cloned().collect()
    }
}

/// A [`NavigationContext`] created by `submit`, with its [`Submission`].
#[derive(Clone)]
pub struct SubmitContext {
    context: NavigationContext,
    submission: Rc<Submission>,
}

impl SubmitContext {
    pub(crate) fn new(context: NavigationContext, submission: Rc<Submission>) -> Self {
        Self {
            context,
            submission,
        }
    }

    /// The underlying navigation context.
    pub fn context(&self) -> &NavigationContext {
        &self.context
    }

    /// Effective submission parameters.
    pub fn submission(&self) -> &Submission {
        &self.submission
    }

    /// The submitted form.
    pub fn form(&self) -> &FormDescriptor {
        &self.submission.form
    }

    /// The submitting button, if any.
    pub fn button(&self) -> Option<&ButtonDescriptor> {
        self.submission.button.as_ref()
    }

    /// Effective method.
    pub fn method(&self) -> Method {
        self.submission.method
    }

    /// Effective enctype.
    pub fn enctype(&self) -> &str {
        &self.submission.enctype
    }

    /// Submitted fields, button pair included.
    pub fn fields(&self) -> &[(String, String)] {
        &self.submission.fields
    }
}

impl Deref for SubmitContext {
    type Target = NavigationContext;

    fn deref(&self) -> &NavigationContext {
        &self.context
    }
}

impl fmt::Debug for SubmitContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmitContext")
            .field("context", &self.context)
            .field("method", &self.method())
            .field("form", &self.form().id)
            .finish()
    }
}

// ============================================================================
// Options
// ============================================================================

/// Options recognised by `nav()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavOptions {
    /// Target; `None` re-navigates to the current location.
    pub url: Option<String>,
    /// Extra query parameters merged over the target's query.
    pub query: Option<QueryParams>,
    /// Replace the history entry instead of pushing one.
    pub replace: bool,
    /// Initial data bag for the new context.
    pub data: Data,
}

impl NavOptions {
    /// Navigate to `url`.
    pub fn to(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Merge extra query parameters.
    pub fn query(mut self, query: QueryParams) -> Self {
        self.query = Some(query);
        self
    }

    /// Replace instead of push.
    pub fn replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    /// Seed one data entry.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

impl From<&str> for NavOptions {
    fn from(url: &str) -> Self {
        Self::to(url)
    }
}

impl From<String> for NavOptions {
    fn from(url: String) -> Self {
        Self::to(url)
    }
}

/// Options recognised by `submit()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmitOptions {
    pub form: FormDescriptor,
    pub button: Option<ButtonDescriptor>,
    /// Extra query parameters merged over the action's query.
    pub query: Option<QueryParams>,
    pub data: Data,
}

impl SubmitOptions {
    /// Submit `form` without a button.
    pub fn new(form: FormDescriptor) -> Self {
        Self {
            form,
            ..Self::default()
        }
    }

    /// Submitting button.
    pub fn button(mut self, button: ButtonDescriptor) -> Self {
        self.button = Some(button);
        self
    }

    /// Merge extra query parameters.
    pub fn query(mut self, query: QueryParams) -> Self {
        self.query = Some(query);
        self
    }

    /// Seed one data entry.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

impl From<FormDescriptor> for SubmitOptions {
    fn from(form: FormDescriptor) -> Self {
        Self::new(form)
    }
}

// ============================================================================
// Tests
// ============================================================================
