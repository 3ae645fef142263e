//! Request sequencing for last-write-wins asynchronous operations.
//!
//! Every asynchronous operation takes a token when it is issued. When it completes it asks the
//! sequencer whether its token is still the latest; if not, its result is discarded.
//! [`RequestSequencer::invalidate`] retires every outstanding token without issuing a new
//! operation (used by reset and by transitions that make in-flight results meaningless).

use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new token, superseding every earlier one.
    pub fn issue(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Retire all outstanding tokens.
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::AcqRel);
    }

    /// The latest token, without superseding it. Lets follow-up requests check that the context
    /// they were issued in is still current.
    pub fn current(&self) -> RequestToken {
        RequestToken(self.latest.load(Ordering::Acquire))
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::Acquire) == token.0
    }
}
