//! # SPA Navigator
//!
//! A headless navigation engine for single-page clients:
//!
//! - **Lifecycle** - `run` / `destroy` with `start`, `loaded` and `stop` hooks
//! - **Onion middleware** - `navigate` and `submit` hooks that run code before
//!   and after the rest of the chain
//! - **Override-safe navigation** - racing `nav()` calls supersede each other
//!   deterministically; superseded contexts are aborted, never applied
//! - **In-hook redirects** - linked `parent` contexts with loop detection
//! - **Form submission** - GET forms navigate, other methods go through a
//!   serialized [`RequestQueue`]
//! - **URL resolution** - relative, hash-only and query-only targets
//!
//! The engine is single-threaded and cooperative: futures are `!Send` and can
//! be driven by any local executor.
//!
//! # Quick Start
//!
//! ```
//! use spa_navigator::{middleware_fn, Environment, MemoryEnvironment, NavigationHost};
//! use std::rc::Rc;
//!
//! let env = Rc::new(MemoryEnvironment::from_url("https://app.test/").unwrap());
//! let host = NavigationHost::new(env.clone());
//!
//! host.register(middleware_fn("title").on_navigate(|cx, next| async move {
//!     next.run().await?;
//!     cx.insert("title", format!("Page {}", cx.path()));
//!     Ok(())
//! }))
//! .unwrap();
//!
//! pollster::block_on(async {
//!     host.run(Default::default(), ()).await.unwrap();
//!     let settled = host.nav("/docs?page=2").await.unwrap();
//!     assert_eq!(settled.get("title").unwrap(), "Page /docs");
//! });
//!
//! assert_eq!(env.location().relative(), "/docs?page=2");
//! ```
//!
//! # Redirects
//!
//! ```no_run
//! use spa_navigator::middleware_fn;
//!
//! let auth = middleware_fn("auth").on_navigate(|cx, next| async move {
//!     if cx.path().starts_with("/admin") && cx.get("user").is_none() {
//!         cx.redirect("/login").await?;
//!         return Ok(());
//!     }
//!     next.run().await
//! });
//! ```
//!
//! # Feature Flags
//!
//! - `log` (default) - Uses the standard `log` crate for logging
//! - `tracing` - Uses the `tracing` crate for structured logging (mutually exclusive with `log`)

#![cfg_attr(docsrs, feature(doc_cfg))]
// Lints are configured in Cargo.toml [lints] section

// Logging abstraction
pub mod logging;

// Error handling and configuration
pub mod config;
pub mod error;

// URLs
pub mod params;
pub mod resolve;

// Primitives
pub mod emitter;
pub mod signal;

// Navigation core
pub mod context;
pub mod host;
pub mod lifecycle;
pub mod middleware;

// Collaborators
pub mod environment;
pub mod queue;

// Re-export main types for convenient access
pub use config::HostConfig;
pub use context::{
    ButtonDescriptor, Data, FormDescriptor, NavOptions, NavigationContext, Source, SubmitContext,
    SubmitOptions, Submission, FORM_URLENCODED,
};
pub use emitter::{Emitter, Subscription};
pub use environment::{Environment, HistoryChange, MemoryEnvironment, NavigationDirection};
pub use error::{ConfigurationError, NavigationError, Result, TransportError, UrlError};
pub use host::{HostBuilder, HostEvent, NavigationHost};
pub use lifecycle::{Lifecycle, LifecycleContext, StopContext};
pub use middleware::{
    middleware_fn, ChainEvent, FnMiddleware, Hook, HookFuture, HookResult, HookSet, Middleware,
    MiddlewareChain, Next,
};
pub use params::QueryParams;
pub use queue::{
    Body, Completion, Method, Request, RequestId, RequestInterceptor, RequestQueue, RequestSpec,
    Response, Transport, TransportHandle, TransportOutcome,
};
pub use resolve::{build_url, extend_query, parse_url, Location};
pub use signal::{AbortSignal, Aborted};
