//! Test utilities for navigation host and request queue tests
//!
//! Provides environments, recording middleware and scripted transports.

#![allow(dead_code)]

use spa_navigator::*;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

/// Route engine logs to the test output when `RUST_LOG` is set.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub type Log = Rc<RefCell<Vec<String>>>;

pub fn new_log() -> Log {
    Rc::default()
}

/// Snapshot of a log.
pub fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

/// In-memory environment starting at `http://localhost{path}`.
pub fn memory_env(path: &str) -> Rc<MemoryEnvironment> {
    Rc::new(MemoryEnvironment::from_url(&format!("http://localhost{path}")).unwrap())
}

/// Host on a fresh in-memory environment at `/`.
pub fn new_host() -> (NavigationHost, Rc<MemoryEnvironment>) {
    init_logging();
    let env = memory_env("/");
    (NavigationHost::new(env.clone()), env)
}

/// Run a host to `Loaded` with empty data.
pub fn start(host: &NavigationHost) {
    pollster::block_on(host.run(Data::new(), ())).unwrap();
}

/// Navigate middleware pushing `name:down:path` / `name:up:path`.
pub fn recorder(name: &'static str, log: &Log) -> FnMiddleware {
    let log = log.clone();
    middleware_fn(name).on_navigate(move |cx, next| {
        let log = log.clone();
        async move {
            log.borrow_mut().push(format!("{name}:down:{}", cx.path()));
            next.run().await?;
            log.borrow_mut().push(format!("{name}:up:{}", cx.path()));
            Ok(())
        }
    })
}

// ============================================================================
// Transports
// ============================================================================

/// What a transport saw for one request.
#[derive(Debug, Clone)]
pub struct Sent {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
}

pub type SentLog = Rc<RefCell<Vec<Sent>>>;

/// Completes every request synchronously inside `send`.
pub struct InstantTransport {
    respond: Rc<dyn Fn(&Sent) -> TransportOutcome>,
    sent: SentLog,
}

impl InstantTransport {
    pub fn new(respond: impl Fn(&Sent) -> TransportOutcome + 'static) -> Self {
        Self {
            respond: Rc::new(respond),
            sent: Rc::default(),
        }
    }

    /// Always answer with `status`.
    pub fn status(status: u16) -> Self {
        Self::new(move |sent| TransportOutcome::Completed(Response::new(status, sent.url.clone())))
    }

    pub fn sent(&self) -> SentLog {
        self.sent.clone()
    }
}

struct InstantHandle {
    request: Sent,
    respond: Rc<dyn Fn(&Sent) -> TransportOutcome>,
    sent: SentLog,
}

impl Transport for InstantTransport {
    fn open(&self, method: Method, url: &str) -> Box<dyn TransportHandle> {
        Box::new(InstantHandle {
            request: Sent {
                method,
                url: url.to_string(),
                headers: Vec::new(),
                body: None,
            },
            respond: self.respond.clone(),
            sent: self.sent.clone(),
        })
    }
}

impl TransportHandle for InstantHandle {
    fn set_header(&mut self, name: &str, value: &str) {
        self.request
            .headers
            .push((name.to_string(), value.to_string()));
    }

    fn send(&mut self, body: Option<Body>, on_complete: Completion) {
        self.request.body = body;
        self.sent.borrow_mut().push(self.request.clone());
        on_complete((self.respond)(&self.request));
    }

    fn abort(&mut self) {}
}

/// Completes each request after a per-URL latency, on the current `LocalSet`.
///
/// Unknown URLs answer `200` after 10ms.
#[derive(Default)]
pub struct DelayedTransport {
    routes: HashMap<String, (u64, u16)>,
    opened: Log,
}

impl DelayedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `status` after `latency_ms`.
    pub fn route(mut self, url: &str, latency_ms: u64, status: u16) -> Self {
        self.routes.insert(url.to_string(), (latency_ms, status));
        self
    }

    /// URLs in the order the queue opened them.
    pub fn opened(&self) -> Log {
        self.opened.clone()
    }
}

type Slot = Rc<RefCell<Option<Completion>>>;

struct DelayedHandle {
    url: String,
    latency: u64,
    status: u16,
    completion: Slot,
}

impl Transport for DelayedTransport {
    fn open(&self, _method: Method, url: &str) -> Box<dyn TransportHandle> {
        self.opened.borrow_mut().push(url.to_string());
        let (latency, status) = self.routes.get(url).copied().unwrap_or((10, 200));
        Box::new(DelayedHandle {
            url: url.to_string(),
            latency,
            status,
            completion: Rc::default(),
        })
    }
}

impl TransportHandle for DelayedHandle {
    fn set_header(&mut self, _name: &str, _value: &str) {}

    fn send(&mut self, _body: Option<Body>, on_complete: Completion) {
        *self.completion.borrow_mut() = Some(on_complete);
        let slot = self.completion.clone();
        let response = Response::new(self.status, self.url.clone());
        let latency = self.latency;
        tokio::task::spawn_local(async move {
            tokio::time::sleep(Duration::from_millis(latency)).await;
            let completion = slot.borrow_mut().take();
            if let Some(completion) = completion {
                completion(TransportOutcome::Completed(response));
            }
        });
    }

    fn abort(&mut self) {
        let completion = self.completion.borrow_mut().take();
        if let Some(completion) = completion {
            completion(TransportOutcome::Aborted);
        }
    }
}

/// Request spec recording `ok:{tag}` / `err:{tag}` into `log`.
pub fn tracked(url: &str, tag: &str, log: &Log) -> RequestSpec {
    let ok_log = log.clone();
    let err_log = log.clone();
    let ok_tag = tag.to_string();
    let err_tag = tag.to_string();
    RequestSpec::new(Request::new(Method::Post, url))
        .on_success(move |_| ok_log.borrow_mut().push(format!("ok:{ok_tag}")))
        .on_error(move |error| {
            err_log
                .borrow_mut()
                .push(format!("err:{err_tag}:{error}"))
        })
}
