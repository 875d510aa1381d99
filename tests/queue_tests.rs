//! Integration tests for the serialized request queue
//!
//! Transports complete after simulated latency on a paused tokio clock.

mod common;

use common::*;
use spa_navigator::*;
use std::time::Duration;
use tokio::task::LocalSet;

async fn settle() {
    tokio::time::sleep(Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_fifo_order_ignores_latency() {
    init_logging();
    LocalSet::new()
        .run_until(async {
            let transport = DelayedTransport::new()
                .route("/1", 30, 200)
                .route("/2", 5, 200)
                .route("/3", 15, 200);
            let opened = transport.opened();
            let queue = RequestQueue::new(transport);
            let log = new_log();

            for n in 1..=3 {
                queue.push(tracked(&format!("/{n}"), &n.to_string(), &log)).unwrap();
            }
            assert_eq!(queue.len(), 3);
            assert_eq!(entries(&opened), ["/1"], "only one request in flight");

            settle().await;
            assert_eq!(entries(&log), ["ok:1", "ok:2", "ok:3"]);
            assert_eq!(entries(&opened), ["/1", "/2", "/3"]);
            assert!(queue.is_idle());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_pre_request_veto_skips_silently() {
    init_logging();
    LocalSet::new()
        .run_until(async {
            let transport = DelayedTransport::new()
                .route("/1", 20, 200)
                .route("/2", 5, 200)
                .route("/3", 10, 200);
            let opened = transport.opened();
            let queue = RequestQueue::new(transport);
            let log = new_log();

            queue.push(tracked("/1", "1", &log)).unwrap();
            queue
                .push(tracked("/2", "2", &log).pre_request(|_| false))
                .unwrap();
            queue.push(tracked("/3", "3", &log)).unwrap();

            settle().await;
            assert_eq!(entries(&log), ["ok:1", "ok:3"]);
            assert_eq!(entries(&opened), ["/1", "/3"]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_post_request_veto_suppresses_success_only() {
    init_logging();
    LocalSet::new()
        .run_until(async {
            let queue = RequestQueue::new(DelayedTransport::new());
            let log = new_log();

            queue
                .push(tracked("/a", "a", &log).post_request(|response| response.status != 200))
                .unwrap();
            queue.push(tracked("/b", "b", &log)).unwrap();

            settle().await;
            assert_eq!(entries(&log), ["ok:b"]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_interceptor_post_request_sees_request() {
    struct OnlyJson;
    impl RequestInterceptor for OnlyJson {
        fn post_request(&self, request: &Request, _response: &Response) -> bool {
            request.url.ends_with(".json")
        }
    }

    init_logging();
    LocalSet::new()
        .run_until(async {
            let queue = RequestQueue::new(DelayedTransport::new());
            queue.set_interceptor(OnlyJson);
            let log = new_log();

            queue.push(tracked("/page", "page", &log)).unwrap();
            queue.push(tracked("/data.json", "data", &log)).unwrap();

            settle().await;
            assert_eq!(entries(&log), ["ok:data"]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_does_not_stop_queue() {
    init_logging();
    LocalSet::new()
        .run_until(async {
            let transport = DelayedTransport::new().route("/broken", 5, 502);
            let queue = RequestQueue::new(transport);
            let log = new_log();

            queue.push(tracked("/broken", "broken", &log)).unwrap();
            queue.push(tracked("/fine", "fine", &log)).unwrap();

            settle().await;
            assert_eq!(
                entries(&log),
                ["err:broken:request failed with status 502", "ok:fine"]
            );
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_reset_fails_pending_and_aborts_current() {
    init_logging();
    LocalSet::new()
        .run_until(async {
            let queue = RequestQueue::new(DelayedTransport::new().route("/slow", 100, 200));
            let log = new_log();

            queue.push(tracked("/slow", "slow", &log)).unwrap();
            queue.push(tracked("/next", "next", &log)).unwrap();
            queue.push(tracked("/last", "last", &log)).unwrap();

            assert_eq!(queue.reset(true), 2);
            assert!(queue.is_empty());
            assert_eq!(
                entries(&log),
                [
                    "err:slow:request aborted",
                    "err:next:request aborted",
                    "err:last:request aborted"
                ]
            );

            queue.push(tracked("/after", "after", &log)).unwrap();
            settle().await;
            assert_eq!(entries(&log).last().map(String::as_str), Some("ok:after"));
            assert_eq!(entries(&log).len(), 4);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_reset_without_abort_lets_current_finish() {
    init_logging();
    LocalSet::new()
        .run_until(async {
            let queue = RequestQueue::new(DelayedTransport::new());
            let log = new_log();

            queue.push(tracked("/current", "current", &log)).unwrap();
            queue.push(tracked("/pending", "pending", &log)).unwrap();
            assert_eq!(queue.reset(false), 1);
            assert!(!queue.is_idle());
            assert_eq!(entries(&log), ["err:pending:request aborted"]);

            settle().await;
            assert_eq!(
                entries(&log),
                ["err:pending:request aborted", "ok:current"]
            );
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_destroy_aborts_and_rejects() {
    init_logging();
    LocalSet::new()
        .run_until(async {
            let queue = RequestQueue::new(DelayedTransport::new());
            let log = new_log();

            let first = queue.push(tracked("/a", "a", &log)).unwrap();
            queue.push(tracked("/b", "b", &log)).unwrap();
            assert_eq!(queue.in_flight(), Some(first));

            queue.destroy();
            assert_eq!(
                queue.push(tracked("/c", "c", &log)).unwrap_err(),
                TransportError::QueueDestroyed
            );

            settle().await;
            assert_eq!(
                entries(&log),
                ["err:a:request aborted", "err:b:request aborted"]
            );
            assert!(queue.is_empty());
        })
        .await;
}
