//! URL state definitions for tracking crawl progress
//!
//! Every URL the crawl has claimed is in exactly one of these states.
//! Unclaimed URLs have no state at all.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlState {
    // ===== Active States =====
    /// Claimed and waiting in the frontier queue
    InFrontier,

    /// A worker is fetching or parsing it
    Fetching,

    // ===== Terminal States =====
    /// Fetched with a 2xx response and parsed
    Processed,

    /// Server answered with a non-success status (404, or 5xx/429 after retries)
    Rejected,

    /// Network failure after all retries
    Failed,

    /// Fetched but the parser refused the content
    ParseFailed,
}

impl UrlState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::InFrontier | Self::Fetching)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InFrontier => "in_frontier",
            Self::Fetching => "fetching",
            Self::Processed => "processed",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
            Self::ParseFailed => "parse_failed",
        }
    }

    /// Returns true if the transition from `self` to `next` is allowed
    pub fn can_transition_to(&self, next: UrlState) -> bool {
        match self {
            Self::InFrontier => next == Self::Fetching,
            Self::Fetching => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for UrlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
