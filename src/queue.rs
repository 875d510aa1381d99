//! Serialized request queue.
//!
//! [`RequestQueue`] runs outbound requests strictly one at a time, in push
//! order. Latency never reorders them: request `n + 1` is not opened before
//! request `n` delivered its terminal callback.
//!
//! The queue owns no transport logic. It drives a [`Transport`] through the
//! `open → set_header → send` contract and waits for exactly one
//! [`TransportOutcome`] per request.
//!
//! # Interception
//!
//! Two veto points exist, per request ([`RequestSpec::pre_request`],
//! [`RequestSpec::post_request`]) and queue-wide ([`RequestInterceptor`]):
//!
//! - `pre_request` runs when the request is dequeued. A veto skips the request
//!   without calling its callbacks.
//! - `post_request` runs when a successful response arrives. A veto suppresses
//!   the success callback; the queue still advances.
//!
//! Vetoes are control flow, not errors.

use crate::error::TransportError;
use crate::{debug_log, error_log, warn_log};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

// ============================================================================
// Request / response
// ============================================================================

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    /// Upper-case method name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Parse a form `method` attribute. Missing or unknown values mean `GET`.
    pub fn parse_lenient(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }

    /// `true` for methods whose form submission is a plain navigation.
    pub fn is_navigation(self) -> bool {
        matches!(self, Self::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised method name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown http method '{0}'")]
pub struct UnknownMethod(pub String);

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

/// Structured request body. Byte-level encoding is the transport's job.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Ordered form fields.
    Form(Vec<(String, String)>),
    Text(String),
    Json(Value),
}

/// An outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    pub fn body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }
}

/// A completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    /// Set the content type.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// `true` for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ============================================================================
// Transport contract
// ============================================================================

/// Terminal result of one transport exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOutcome {
    Completed(Response),
    Failed(TransportError),
    Aborted,
}

/// Callback receiving the terminal outcome. Called exactly once.
pub type Completion = Box<dyn FnOnce(TransportOutcome)>;

/// Network request executor.
pub trait Transport {
    /// Prepare a request.
    fn open(&self, method: Method, url: &str) -> Box<dyn TransportHandle>;
}

/// One opened request.
pub trait TransportHandle {
    fn set_header(&mut self, name: &str, value: &str);

    /// Start the exchange. `on_complete` may be called synchronously.
    fn send(&mut self, body: Option<Body>, on_complete: Completion);

    /// Abort the exchange. The transport still delivers
    /// [`TransportOutcome::Aborted`] through the completion.
    fn abort(&mut self);
}

/// Queue-wide veto points.
pub trait RequestInterceptor {
    /// Return `false` to skip `request` before it is opened.
    fn pre_request(&self, _request: &Request) -> bool {
        true
    }

    /// Return `false` to suppress the success callback for `response`.
    fn post_request(&self, _request: &Request, _response: &Response) -> bool {
        true
    }
}

// ============================================================================
// RequestSpec
// ============================================================================

type PreRequestFn = Box<dyn FnOnce(&Request) -> bool>;
type PostRequestFn = Box<dyn FnOnce(&Response) -> bool>;
type SuccessFn = Box<dyn FnOnce(Response)>;
type ErrorFn = Box<dyn FnOnce(TransportError)>;

/// A request plus its callbacks.
pub struct RequestSpec {
    request: Request,
    pre_request: Option<PreRequestFn>,
    post_request: Option<PostRequestFn>,
    on_success: Option<SuccessFn>,
    on_error: Option<ErrorFn>,
}

impl RequestSpec {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            pre_request: None,
            post_request: None,
            on_success: None,
            on_error: None,
        }
    }

    /// The request.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Veto point before the request is opened.
    pub fn pre_request(mut self, f: impl FnOnce(&Request) -> bool + 'static) -> Self {
        self.pre_request = Some(Box::new(f));
        self
    }

    /// Veto point before the success callback.
    pub fn post_request(mut self, f: impl FnOnce(&Response) -> bool + 'static) -> Self {
        self.post_request = Some(Box::new(f));
        self
    }

    /// Called with a 2xx response.
    pub fn on_success(mut self, f: impl FnOnce(Response) + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    /// Called with a non-2xx status, a transport failure or an abort.
    pub fn on_error(mut self, f: impl FnOnce(TransportError) + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSpec")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

impl From<Request> for RequestSpec {
    fn from(request: Request) -> Self {
        Self::new(request)
    }
}

/// Identity of a pushed request, in push order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// RequestQueue
// ============================================================================

struct Pending {
    id: RequestId,
    spec: RequestSpec,
}

struct InFlight {
    id: RequestId,
    request: Request,
    handle: Rc<RefCell<Box<dyn TransportHandle>>>,
    post_request: Option<PostRequestFn>,
    on_success: Option<SuccessFn>,
    on_error: Option<ErrorFn>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Pending>,
    in_flight: Option<InFlight>,
    next_id: u64,
    destroyed: bool,
}

struct QueueInner {
    transport: Box<dyn Transport>,
    interceptor: RefCell<Option<Rc<dyn RequestInterceptor>>>,
    state: RefCell<QueueState>,
    pumping: Cell<bool>,
}

/// Resets the pump flag when the pump loop exits.
struct PumpGuard<'a>(&'a Cell<bool>);

impl Drop for PumpGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// FIFO queue executing one request at a time.
///
/// Cheap to clone; clones drive the same queue.
#[derive(Clone)]
pub struct RequestQueue {
    inner: Rc<QueueInner>,
}

impl RequestQueue {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            inner: Rc::new(QueueInner {
                transport: Box::new(transport),
                interceptor: RefCell::new(None),
                state: RefCell::new(QueueState::default()),
                pumping: Cell::new(false),
            }),
        }
    }

    /// Install a queue-wide interceptor, replacing any previous one.
    pub fn set_interceptor(&self, interceptor: impl RequestInterceptor + 'static) {
        *self.inner.interceptor.borrow_mut() = Some(Rc::new(interceptor));
    }

    /// Enqueue a request. Starts it immediately when the queue is idle.
    pub fn push(&self, spec: impl Into<RequestSpec>) -> Result<RequestId, TransportError> {
        let spec = spec.into();
        let id = {
            let mut state = self.inner.state.borrow_mut();
            if state.destroyed {
                error_log!(
                    "Rejecting {} {}: queue destroyed",
                    spec.request.method,
                    spec.request.url
                );
                return Err(TransportError::QueueDestroyed);
            }
            state.next_id += 1;
            let id = RequestId(state.next_id);
            debug_log!(
                "Queued request {} {} {}",
                id,
                spec.request.method,
                spec.request.url
            );
            state.pending.push_back(Pending { id, spec });
            id
        };
        QueueInner::pump(&self.inner);
        Ok(id)
    }

    /// Drop every pending request. With `abort_current`, also abort the one in
    /// flight. Returns the number of dropped pending requests.
    ///
    /// Dropped requests receive [`TransportError::Aborted`] on their error
    /// callback, after the in-flight one.
    pub fn reset(&self, abort_current: bool) -> usize {
        let dropped = std::mem::take(&mut self.inner.state.borrow_mut().pending);
        let count = dropped.len();
        debug_log!(
            "Queue reset: dropped {} pending request(s), abort_current={}",
            count,
            abort_current
        );
        if abort_current {
            self.abort_in_flight();
        }
        fail_dropped(dropped);
        count
    }

    /// Drop pending requests, abort the one in flight and reject later pushes.
    pub fn destroy(&self) {
        let dropped = {
            let mut state = self.inner.state.borrow_mut();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            std::mem::take(&mut state.pending)
        };
        debug_log!("Queue destroyed with {} pending request(s)", dropped.len());
        self.abort_in_flight();
        fail_dropped(dropped);
    }

    fn abort_in_flight(&self) {
        let handle = self
            .inner
            .state
            .borrow()
            .in_flight
            .as_ref()
            .map(|flight| (flight.id, flight.handle.clone()));
        if let Some((id, handle)) = handle {
            debug_log!("Aborting in-flight request {}", id);
            if let Ok(mut handle) = handle.try_borrow_mut() {
                handle.abort();
            }
        }
    }

    /// Pending plus in-flight requests.
    pub fn len(&self) -> usize {
        let state = self.inner.state.borrow();
        state.pending.len() + usize::from(state.in_flight.is_some())
    }

    /// `true` when nothing is pending or in flight.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` when no request is in flight.
    pub fn is_idle(&self) -> bool {
        self.inner.state.borrow().in_flight.is_none()
    }

    /// The request currently in flight.
    pub fn in_flight(&self) -> Option<RequestId> {
        self.inner.state.borrow().in_flight.as_ref().map(|f| f.id)
    }

    /// `true` after [`destroy`](Self::destroy).
    pub fn is_destroyed(&self) -> bool {
        self.inner.state.borrow().destroyed
    }
}

/// Deliver [`TransportError::Aborted`] to requests that never started.
fn fail_dropped(dropped: VecDeque<Pending>) {
    for Pending { id, spec } in dropped {
        warn_log!("Dropped request {} {} before start", id, spec.request.url);
        if let Some(on_error) = spec.on_error {
            on_error(TransportError::Aborted);
        }
    }
}

impl QueueInner {
    fn interceptor(&self) -> Option<Rc<dyn RequestInterceptor>> {
        self.interceptor.borrow().clone()
    }

    /// Start pending requests while the slot is free. Never holds a borrow
    /// across user code; re-entrant calls fold into the running loop.
    fn pump(this: &Rc<Self>) {
        if this.pumping.replace(true) {
            return;
        }
        let _guard = PumpGuard(&this.pumping);

        loop {
            let next = {
                let mut state = this.state.borrow_mut();
                if state.destroyed || state.in_flight.is_some() {
                    break;
                }
                state.pending.pop_front()
            };
            let Some(Pending { id, spec }) = next else {
                break;
            };
            let RequestSpec {
                request,
                pre_request,
                post_request,
                on_success,
                on_error,
            } = spec;

            let allowed = pre_request.map_or(true, |f| f(&request))
                && this
                    .interceptor()
                    .map_or(true, |interceptor| interceptor.pre_request(&request));
            if !allowed {
                warn_log!("Request {} {} vetoed before start", id, request.url);
                continue;
            }

            let mut handle = this.transport.open(request.method, &request.url);
            for (name, value) in &request.headers {
                handle.set_header(name, value);
            }
            let handle = Rc::new(RefCell::new(handle));
            let body = request.body.clone();

            this.state.borrow_mut().in_flight = Some(InFlight {
                id,
                request,
                handle: handle.clone(),
                post_request,
                on_success,
                on_error,
            });
            debug_log!("Sending request {}", id);

            let weak: Weak<Self> = Rc::downgrade(this);
            let completion: Completion = Box::new(move |outcome| {
                if let Some(inner) = weak.upgrade() {
                    Self::complete(&inner, id, outcome);
                }
            });
            handle.borrow_mut().send(body, completion);
        }
    }

    fn complete(this: &Rc<Self>, id: RequestId, outcome: TransportOutcome) {
        let flight = {
            let mut state = this.state.borrow_mut();
            match state.in_flight.as_ref() {
                Some(flight) if flight.id == id => state.in_flight.take(),
                _ => None,
            }
        };
        let Some(flight) = flight else {
            warn_log!("Ignoring stale completion for request {}", id);
            return;
        };
        let InFlight {
            request,
            post_request,
            on_success,
            on_error,
            ..
        } = flight;

        let failure = match outcome {
            TransportOutcome::Completed(response) if response.is_success() => {
                let delivered = post_request.map_or(true, |f| f(&response))
                    && this.interceptor().map_or(true, |interceptor| {
                        interceptor.post_request(&request, &response)
                    });
                if delivered {
                    debug_log!("Request {} succeeded with {}", id, response.status);
                    if let Some(on_success) = on_success {
                        on_success(response);
                    }
                } else {
                    warn_log!("Request {} response vetoed", id);
                }
                None
            }
            TransportOutcome::Completed(response) => Some(TransportError::Status {
                status: response.status,
                body: response.body,
            }),
            TransportOutcome::Failed(error) => Some(error),
            TransportOutcome::Aborted => Some(TransportError::Aborted),
        };

        if let Some(error) = failure {
            error_log!("Request {} {} failed: {}", id, request.url, error);
            if let Some(on_error) = on_error {
                on_error(error);
            }
        }

        Self::pump(this);
    }
}

impl fmt::Debug for RequestQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("RequestQueue")
            .field("pending", &state.pending.len())
            .field("in_flight", &state.in_flight.as_ref().map(|f| f.id))
            .field("destroyed", &state.destroyed)
            .finish()
    }
}
