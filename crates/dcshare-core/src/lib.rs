//! dcshare Core Protocol Implementation
//!
//! This crate provides the value types, error handling and wire codecs shared by
//! the dcshare client: the search-result representation and its two encodings
//! (the legacy `$SR` text line and the structured `RES` command), plus the tick
//! source used by the runtime's periodic scheduler.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod encoding;
pub mod errors;
pub mod protocol;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::{DcConfig, LegacyConfig, SearchConfig, TimerConfig};
pub use encoding::Charset;
pub use errors::{DcError, DcResult, EncodingError, ProtocolError, Result};
pub use protocol::{
    AdcCommand, LocalShare, NmdcContext, ResultKind, SearchResult, SearchResultBuilder,
    SearchStyle,
};
pub use types::{
    Cid, HintedUser, ManualTicks, MonotonicTicks, Sid, TickSource, TigerHash, User,
};
