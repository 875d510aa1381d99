//! Error types for the navigation engine.
//!
//! Every failure the engine can surface falls into one of four families:
//!
//! - [`ConfigurationError`]: misuse of the host: double `run`/`destroy`,
//!   duplicate middleware names, a hook that declared itself but produced no
//!   future. Fatal and never retried.
//! - [`NavigationError`]: the top-level error returned by
//!   [`NavigationHost::nav`](crate::NavigationHost::nav) and friends. Hook
//!   failures travel through it unchanged.
//! - [`UrlError`]: a candidate URL that cannot be resolved.
//! - [`TransportError`]: delivered to a queued request's error callback; never
//!   stops the queue.
//!
//! All errors are `Clone`: a single in-flight navigation or submission may be
//! awaited by several callers, each of which receives its own copy.
//!
//! # Examples
//!
//! ```
//! use spa_navigator::error::{ConfigurationError, NavigationError};
//!
//! let err = NavigationError::from(ConfigurationError::AlreadyStarted);
//! assert!(err.is_configuration());
//! assert_eq!(err.to_string(), "navigation host already started");
//!
//! let aborted = NavigationError::Aborted { index: 3 };
//! assert!(aborted.is_aborted());
//! ```

use crate::middleware::Hook;

/// Host misuse detected at call time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// `run` was called more than once.
    #[error("navigation host already started")]
    AlreadyStarted,

    /// `destroy` was called more than once, or the host is used after `destroy`.
    #[error("navigation host already destroyed")]
    AlreadyDestroyed,

    /// A navigation or submission was requested before `run` reached `Loaded`.
    #[error("navigation host not started")]
    NotStarted,

    /// Two middleware were registered under the same name.
    #[error("middleware '{name}' is already registered")]
    DuplicateMiddleware { name: String },

    /// A middleware declared a hook but returned no future for it.
    #[error("middleware '{middleware}' declares '{hook}' but returned no awaitable future")]
    NotAwaitable { middleware: String, hook: Hook },
}

/// Top-level error for navigation, submission and lifecycle operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NavigationError {
    /// Host misuse.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A hook reported that navigation failed.
    #[error("Navigation failed: {message}")]
    NavigationFailed { message: String },

    /// Custom error raised by a hook.
    #[error("{message}")]
    Custom { message: String },

    /// The context was superseded or cancelled; discard its effects.
    #[error("navigation #{index} was aborted")]
    Aborted { index: u64 },

    /// A chain of in-hook redirects exceeded the configured depth.
    #[error("Redirect loop detected (depth {depth}): target '{target}'")]
    RedirectLoop { depth: usize, target: String },

    /// The target URL could not be resolved.
    #[error(transparent)]
    InvalidUrl(#[from] UrlError),

    /// The request issued by a submission failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl NavigationError {
    /// Convenience constructor for hook authors.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::NavigationFailed {
            message: message.into(),
        }
    }

    /// Wrap an arbitrary message.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom {
            message: message.into(),
        }
    }

    /// `true` when the caller should discard the result instead of applying it.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }

    /// `true` for host misuse.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// A candidate URL that could not be resolved against the current location.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid url '{input}': {source}")]
pub struct UrlError {
    /// The string that failed to parse.
    pub input: String,
    #[source]
    pub source: url::ParseError,
}

/// Failure of a single queued request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The transport completed with a non-success status.
    #[error("request failed with status {status}")]
    Status { status: u16, body: String },

    /// The transport could not complete the exchange.
    #[error("network error: {message}")]
    Network { message: String },

    /// The request was aborted by `reset`/`destroy` or by the transport itself.
    #[error("request aborted")]
    Aborted,

    /// `push` was called on a destroyed queue.
    #[error("request queue destroyed")]
    QueueDestroyed,
}

/// Result alias used throughout the crate.
pub type Result<T, E = NavigationError> = std::result::Result<T, E>;
