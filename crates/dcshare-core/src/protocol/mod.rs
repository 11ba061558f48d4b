//! Wire protocol modules
//!
//! - `adc`: the structured command writer/parser and its escaping rules
//! - `nmdc`: the legacy `$SR` line encoder/decoder
//! - `search_result`: the search-result value shared by both

pub mod adc;
pub mod nmdc;
pub mod search_result;

pub use adc::AdcCommand;
pub use nmdc::NmdcContext;
pub use search_result::{LocalShare, ResultKind, SearchResult, SearchResultBuilder, SearchStyle};
