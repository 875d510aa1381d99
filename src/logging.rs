//! Logging abstraction layer.
//!
//! Provides macros that dispatch to either the [`log`](https://docs.rs/log)
//! or [`tracing`](https://docs.rs/tracing) crate depending on which feature
//! is enabled. The two features are **mutually exclusive**: enable at most one.
//!
//! | Feature    | Backend         | Default |
//! |------------|-----------------|---------|
//! | `log`      | `log` crate     | yes     |
//! | `tracing`  | `tracing` crate | no      |
//!
//! # Levels used by the engine
//!
//! - `trace_log!`: per-middleware hook dispatch, pass-through nodes.
//! - `debug_log!`: chain invocation, queue progression, subscriptions.
//! - `info_log!`: navigation start/settle, lifecycle transitions.
//! - `warn_log!`: overridden navigations, interceptor vetoes.
//! - `error_log!`: every error, logged once before it leaves the host or queue.
//!
//! All macros accept `format!`-style arguments:
//!
//! ```ignore
//! use spa_navigator::{debug_log, error_log, info_log, trace_log, warn_log};
//!
//! trace_log!("Middleware '{}' handles '{}'", name, hook);
//! debug_log!("Invoking '{}' chain for context #{}", hook, index);
//! info_log!("Navigation #{} settled at '{}'", index, path);
//! warn_log!("Navigation #{} overridden by #{}", old, new);
//! error_log!("Navigation #{} failed: {}", index, err);
//! ```

#[doc(hidden)]
#[macro_export]
macro_rules! __dispatch_log {
    ($level:ident, $($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::$level!($($arg)*);
        #[cfg(feature = "log")]
        ::log::$level!($($arg)*);
    };
}

/// Emit a **trace**-level log message.
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        $crate::__dispatch_log!(trace, $($arg)*)
    };
}

/// Emit a **debug**-level log message.
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        $crate::__dispatch_log!(debug, $($arg)*)
    };
}

/// Emit an **info**-level log message.
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        $crate::__dispatch_log!(info, $($arg)*)
    };
}

/// Emit a **warn**-level log message.
///
/// Used for recoverable surprises: overridden navigations and vetoed requests.
#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        $crate::__dispatch_log!(warn, $($arg)*)
    };
}

/// Emit an **error**-level log message.
///
/// Errors are logged exactly once, at the point where they leave the host or
/// the request queue.
#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => {
        $crate::__dispatch_log!(error, $($arg)*)
    };
}
