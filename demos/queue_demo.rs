//! Queue Demo
//!
//! Pushes requests with different latencies through a [`RequestQueue`] and
//! shows that they complete in push order. One request is vetoed, one fails,
//! and a final batch is dropped by `reset`.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use spa_navigator::{
    Body, Completion, Method, Request, RequestQueue, RequestSpec, Response, Transport,
    TransportHandle, TransportOutcome,
};
use tokio::task::LocalSet;

// ============================================================================
// Simulated Transport
// ============================================================================

/// Answers after a latency and with a status encoded in the URL:
/// `/slow/200` waits 300ms, anything else 50ms; the last segment is the status.
struct SimulatedTransport;

struct SimulatedHandle {
    url: String,
    pending: Rc<RefCell<Option<Completion>>>,
}

impl Transport for SimulatedTransport {
    fn open(&self, method: Method, url: &str) -> Box<dyn TransportHandle> {
        println!("  open  {method} {url}");
        Box::new(SimulatedHandle {
            url: url.to_string(),
            pending: Rc::default(),
        })
    }
}

impl TransportHandle for SimulatedHandle {
    fn set_header(&mut self, _name: &str, _value: &str) {}

    fn send(&mut self, _body: Option<Body>, on_complete: Completion) {
        *self.pending.borrow_mut() = Some(on_complete);
        let latency = if self.url.starts_with("/slow") { 300 } else { 50 };
        let status = self
            .url
            .rsplit('/')
            .next()
            .and_then(|s| s.parse().ok())
            .unwrap_or(200);
        let url = self.url.clone();
        let pending = self.pending.clone();
        tokio::task::spawn_local(async move {
            tokio::time::sleep(Duration::from_millis(latency)).await;
            let completion = pending.borrow_mut().take();
            if let Some(completion) = completion {
                completion(TransportOutcome::Completed(Response::new(status, url)));
            }
        });
    }

    fn abort(&mut self) {
        let completion = self.pending.borrow_mut().take();
        if let Some(completion) = completion {
            completion(TransportOutcome::Aborted);
        }
    }
}

// ============================================================================
// Main
// ============================================================================

fn spec(url: &str) -> RequestSpec {
    let ok = url.to_string();
    let err = url.to_string();
    RequestSpec::new(Request::new(Method::Post, url))
        .on_success(move |response| println!("  done  {ok} ({})", response.status))
        .on_error(move |error| println!("  error {err}: {error}"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let _ = env_logger::try_init();

    LocalSet::new()
        .run_until(async {
            let queue = RequestQueue::new(SimulatedTransport);

            println!("FIFO with a veto and a failure:");
            queue.push(spec("/slow/200")).ok();
            queue
                .push(spec("/vetoed/200").pre_request(|_| false))
                .ok();
            queue.push(spec("/fast/200")).ok();
            queue.push(spec("/broken/502")).ok();
            while !queue.is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }

            println!("reset(true) with three requests queued:");
            for url in ["/slow/200", "/fast/201", "/fast/202"] {
                queue.push(spec(url)).ok();
            }
            let dropped = queue.reset(true);
            println!("  dropped {dropped} pending request(s)");

            queue.destroy();
            if let Err(error) = queue.push(spec("/late/200")) {
                println!("after destroy: {error}");
            }
        })
        .await;
}
