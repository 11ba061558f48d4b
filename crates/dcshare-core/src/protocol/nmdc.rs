//! Legacy text protocol search results
//!
//! Line format:
//!
//! ```text
//! $SR <nick> <path>[\x05<size>] <free>/<slots>\x05TTH:<base32> (<hub ip:port>)|
//! ```
//!
//! Files carry a `\x05<size>` after the path. Directories carry no size and
//! are sent without their trailing `\`. Nick and path are in the hub's
//! character set, not UTF-8.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::encoding::Charset;
use crate::errors::{DcError, ProtocolError, Result};
use crate::protocol::search_result::{ResultKind, SearchResult};
use crate::types::{HintedUser, TigerHash, User};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Command prefix of a search result line
pub const SR_PREFIX: &[u8] = b"$SR ";

/// Control byte separating fields inside a `$SR` line
pub const FIELD_SEPARATOR: u8 = 0x05;

/// Protocol line terminator
pub const TERMINATOR: u8 = b'|';

/// Prefix of the hash field
const TTH_PREFIX: &str = "TTH:";

// ----------------------------------------------------------------------------
// Context
// ----------------------------------------------------------------------------

/// The hub connection a result is announced on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NmdcContext {
    /// Our nick on that hub (UTF-8)
    pub nick: String,
    /// The hub's character set
    pub charset: Charset,
    /// Hub address, `ip:port`
    pub hub_address: String,
}

impl NmdcContext {
    pub fn new(nick: impl Into<String>, charset: Charset, hub_address: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            charset,
            hub_address: hub_address.into(),
        }
    }
}

// ----------------------------------------------------------------------------
// Encoding
// ----------------------------------------------------------------------------

/// Render a result as a `$SR` line, terminator included
pub fn encode_sr(result: &SearchResult, context: &NmdcContext) -> Vec<u8> {
    let charset = &context.charset;
    let mut out = Vec::with_capacity(96 + result.file().len() + context.nick.len());

    out.extend_from_slice(SR_PREFIX);
    out.extend_from_slice(&charset.encode_lossy(&context.nick));
    out.push(b' ');

    let file = charset.encode_lossy(result.file());
    match result.kind() {
        ResultKind::File => {
            out.extend_from_slice(&file);
            out.push(FIELD_SEPARATOR);
            out.extend_from_slice(result.size().to_string().as_bytes());
        }
        ResultKind::Directory => {
            out.extend_from_slice(file.strip_suffix(b"\\").unwrap_or(&file[..]));
        }
    }

    out.push(b' ');
    out.extend_from_slice(result.free_slots().to_string().as_bytes());
    out.push(b'/');
    out.extend_from_slice(result.slots().to_string().as_bytes());
    out.push(FIELD_SEPARATOR);
    out.extend_from_slice(TTH_PREFIX.as_bytes());
    out.extend_from_slice(result.tth().to_base32().as_bytes());
    out.extend_from_slice(b" (");
    out.extend_from_slice(context.hub_address.as_bytes());
    out.extend_from_slice(b")");
    out.push(TERMINATOR);
    out
}

// ----------------------------------------------------------------------------
// Decoding
// ----------------------------------------------------------------------------

/// Parse a received `$SR` line
///
/// The terminator is optional. `remote_ip` is the address the line arrived
/// from (empty when it was relayed by the hub). Lines without a `TTH:` field
/// are rejected.
pub fn parse_sr(line: &[u8], charset: &Charset, remote_ip: &str) -> Result<SearchResult> {
    let line = line.strip_suffix(&[TERMINATOR]).unwrap_or(line);
    let rest = line
        .strip_prefix(SR_PREFIX)
        .ok_or(ProtocolError::BadPrefix { expected: "$SR " })?;

    let nick_end = find(rest, b' ').ok_or(DcError::missing_field("path"))?;
    let nick = charset.decode_lossy(&rest[..nick_end]).into_owned();
    let rest = &rest[nick_end + 1..];

    let first_sep = find(rest, FIELD_SEPARATOR).ok_or(DcError::missing_field("slots"))?;
    let separators = rest.iter().filter(|b| **b == FIELD_SEPARATOR).count();

    let (kind, path, size, rest) = match separators {
        1 => {
            let path_end = rest[..first_sep]
                .iter()
                .rposition(|b| *b == b' ')
                .ok_or(DcError::missing_field("slots"))?;
            (ResultKind::Directory, &rest[..path_end], 0, &rest[path_end + 1..])
        }
        2 => {
            let after = &rest[first_sep + 1..];
            let size_end = find(after, b' ').ok_or(DcError::missing_field("slots"))?;
            let size = parse_number::<u64>("size", &after[..size_end])?;
            (ResultKind::File, &rest[..first_sep], size, &after[size_end + 1..])
        }
        n => {
            return Err(DcError::malformed(format!(
                "expected 1 or 2 field separators, found {n}"
            )))
        }
    };

    let slash = find(rest, b'/').ok_or(DcError::missing_field("slots"))?;
    let free_slots = parse_number::<u32>("free slots", &rest[..slash])?;
    let rest = &rest[slash + 1..];

    let sep = find(rest, FIELD_SEPARATOR).ok_or(DcError::missing_field("TTH"))?;
    let slots = parse_number::<u32>("slots", &rest[..sep])?;
    let rest = &rest[sep + 1..];

    let open = rfind_pair(rest, b" (").ok_or(DcError::missing_field("hub address"))?;
    let close = rest
        .iter()
        .rposition(|b| *b == b')')
        .filter(|i| *i > open)
        .ok_or(DcError::missing_field("hub address"))?;
    let hub_address = String::from_utf8_lossy(&rest[open + 2..close]).into_owned();

    let hub_field = charset.decode_lossy(&rest[..open]);
    let tth: TigerHash = hub_field
        .strip_prefix(TTH_PREFIX)
        .ok_or(DcError::missing_field("TTH"))?
        .parse()?;

    let mut file = charset.decode_lossy(path).into_owned();
    if kind == ResultKind::Directory && !file.ends_with('\\') {
        file.push('\\');
    }

    let user = HintedUser::new(User::legacy(nick), hub_address.clone());
    Ok(SearchResult::builder(user, kind, file, tth)
        .size(size)
        .slots(free_slots, slots)
        .hub_name(hub_address)
        .ip(remote_ip)
        .build())
}

fn find(haystack: &[u8], needle: u8) -> Option<usize> {
    haystack.iter().position(|b| *b == needle)
}

fn rfind_pair(haystack: &[u8], pair: &[u8; 2]) -> Option<usize> {
    haystack.windows(2).rposition(|w| w == pair)
}

fn parse_number<T: FromStr>(field: &'static str, bytes: &[u8]) -> Result<T> {
    core::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| DcError::invalid_number(field, String::from_utf8_lossy(bytes)))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
