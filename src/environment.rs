//! Environment capability injected into the host.
//!
//! The host never reads ambient globals: the current location and the history
//! stack come from an [`Environment`] handed to
//! [`NavigationHost::new`](crate::NavigationHost::new). [`MemoryEnvironment`]
//! keeps the history in memory, which is all a headless client or a test
//! needs.

use crate::error::UrlError;
use crate::resolve::Location;
use crate::trace_log;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Direction of a history change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationDirection {
    /// A new entry was pushed.
    Forward,
    /// Moved to the previous entry.
    Back,
    /// The current entry was overwritten.
    Replace,
}

/// Record of a single history change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryChange {
    pub from: String,
    pub to: String,
    pub direction: NavigationDirection,
}

/// Location source and history sink for a host.
pub trait Environment {
    /// The location currently shown.
    fn location(&self) -> Location;

    /// Add a history entry for `location` and make it current.
    fn push_state(&self, location: &Location);

    /// Overwrite the current history entry with `location`.
    fn replace_state(&self, location: &Location);
}

impl<T: Environment + ?Sized> Environment for Rc<T> {
    fn location(&self) -> Location {
        (**self).location()
    }

    fn push_state(&self, location: &Location) {
        (**self).push_state(location);
    }

    fn replace_state(&self, location: &Location) {
        (**self).replace_state(location);
    }
}

/// In-memory history stack.
///
/// Pushing truncates any forward entries, as a browser does.
pub struct MemoryEnvironment {
    history: RefCell<Vec<Location>>,
    current: Cell<usize>,
}

impl MemoryEnvironment {
    /// Start with a single entry.
    pub fn new(initial: Location) -> Self {
        Self {
            history: RefCell::new(vec![initial]),
            current: Cell::new(0),
        }
    }

    /// Start at an absolute URL.
    pub fn from_url(url: &str) -> Result<Self, UrlError> {
        Location::parse_absolute(url).map(Self::new)
    }

    fn current_url(&self) -> String {
        self.history.borrow()[self.current.get()].full().to_string()
    }

    fn record(&self, location: &Location, direction: NavigationDirection) -> HistoryChange {
        let from = self.current_url();
        let mut history = self.history.borrow_mut();
        let current = self.current.get();
        match direction {
            NavigationDirection::Replace => history[current] = location.clone(),
            _ => {
                history.truncate(current + 1);
                history.push(location.clone());
                self.current.set(current + 1);
            }
        }
        let change = HistoryChange {
            from,
            to: location.full().to_string(),
            direction,
        };
        trace_log!("History {:?}: {} -> {}", direction, change.from, change.to);
        change
    }

    /// Move one entry back.
    pub fn back(&self) -> Option<HistoryChange> {
        self.step(false)
    }

    /// Move one entry forward.
    pub fn forward(&self) -> Option<HistoryChange> {
        self.step(true)
    }

    fn step(&self, forward: bool) -> Option<HistoryChange> {
        let current = self.current.get();
        let target = if forward {
            (current + 1 < self.len()).then_some(current + 1)?
        } else {
            current.checked_sub(1)?
        };
        let from = self.current_url();
        self.current.set(target);
        Some(HistoryChange {
            from,
            to: self.current_url(),
            direction: if forward {
                NavigationDirection::Forward
            } else {
                NavigationDirection::Back
            },
        })
    }

    /// `true` if there is an entry before the current one.
    pub fn can_go_back(&self) -> bool {
        self.current.get() > 0
    }

    /// `true` if there is an entry after the current one.
    pub fn can_go_forward(&self) -> bool {
        self.current.get() + 1 < self.len()
    }

    /// Every entry as a full URL, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history
            .borrow()
            .iter()
            .map(|location| location.full().to_string())
            .collect()
    }

    /// Number of history entries.
    pub fn len(&self) -> usize {
        self.history.borrow().len()
    }

    /// Always `false`: the stack holds at least the initial entry.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Environment for MemoryEnvironment {
    fn location(&self) -> Location {
        self.history.borrow()[self.current.get()].clone()
    }

    fn push_state(&self, location: &Location) {
        self.record(location, NavigationDirection::Forward);
    }

    fn replace_state(&self, location: &Location) {
        self.record(location, NavigationDirection::Replace);
    }
}

impl fmt::Debug for MemoryEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryEnvironment")
            .field("history", &self.history())
            .field("current", &self.current.get())
            .finish()
    }
}
