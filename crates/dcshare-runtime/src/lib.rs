//! dcshare Runtime Services
//!
//! This crate contains the long-running pieces of the dcshare client:
//! - `TimerService`: a background thread firing Second and Minute events
//! - `PendingSearches`: outstanding-search bookkeeping, expired from the timer
//!
//! `dcshare-core` provides the value types and codecs these services work on.

pub mod searches;
pub mod timer;

pub use searches::PendingSearches;
pub use timer::{ListenerId, TimerChannel, TimerService};

// Re-export core types for convenience
pub use dcshare_core::{
    DcError, DcResult, ManualTicks, MonotonicTicks, SearchResult, TickSource, TimerConfig,
};
