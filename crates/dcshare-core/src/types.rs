//! Core types for the dcshare protocol
//!
//! This module defines the small value types shared by the codecs and the
//! runtime, using newtype patterns for validation and type safety.

use core::fmt;
use core::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::encoding::{from_base32, is_base32_char, to_base32};
use crate::errors::{DcError, EncodingError, ProtocolError};

// ----------------------------------------------------------------------------
// Tiger Tree Hash
// ----------------------------------------------------------------------------

/// Root of a Tiger tree hash (TTH), identifying content
///
/// The value is opaque here: it is rendered and parsed, never computed.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TigerHash([u8; TigerHash::BYTES]);

impl TigerHash {
    /// Size of the digest in bytes
    pub const BYTES: usize = 24;

    /// Length of the base-32 rendering
    pub const BASE32_LEN: usize = 39;

    pub fn new(bytes: [u8; Self::BYTES]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::BYTES] {
        &self.0
    }

    pub fn to_base32(&self) -> String {
        to_base32(&self.0)
    }

    pub fn from_base32(text: &str) -> Result<Self, EncodingError> {
        from_base32(text).map(Self)
    }
}

impl fmt::Display for TigerHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base32())
    }
}

impl fmt::Debug for TigerHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TigerHash({})", self.to_base32())
    }
}

impl FromStr for TigerHash {
    type Err = DcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base32(s).map_err(|e| {
            DcError::Protocol(ProtocolError::InvalidHash {
                reason: e.to_string(),
            })
        })
    }
}

impl Serialize for TigerHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base32())
    }
}

impl<'de> Deserialize<'de> for TigerHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ----------------------------------------------------------------------------
// Client Identifier
// ----------------------------------------------------------------------------

/// Client identifier: a stable 192-bit id a peer presents to every hub
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Cid([u8; Cid::BYTES]);

impl Cid {
    pub const BYTES: usize = 24;

    pub fn new(bytes: [u8; Self::BYTES]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::BYTES] {
        &self.0
    }

    /// Whether this is the all-zero id given to legacy peers
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn to_base32(&self) -> String {
        to_base32(&self.0)
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base32())
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({})", self.to_base32())
    }
}

impl FromStr for Cid {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        from_base32(s).map(Self)
    }
}

impl Serialize for Cid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base32())
    }
}

impl<'de> Deserialize<'de> for Cid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ----------------------------------------------------------------------------
// Session Identifier
// ----------------------------------------------------------------------------

/// Four-character base-32 session id assigned by a hub
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sid([u8; 4]);

impl Sid {
    pub fn as_str(&self) -> &str {
        // Only base-32 ASCII is ever stored
        core::str::from_utf8(&self.0).unwrap_or("AAAA")
    }
}

impl FromStr for Sid {
    type Err = DcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 || !bytes.iter().all(|b| is_base32_char(*b)) {
            return Err(DcError::malformed(format!("invalid SID {s:?}")));
        }
        let mut sid = [0u8; 4];
        sid.copy_from_slice(bytes);
        Ok(Self(sid))
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sid({})", self.as_str())
    }
}

// ----------------------------------------------------------------------------
// Users
// ----------------------------------------------------------------------------

/// A remote or local peer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct User {
    pub cid: Cid,
    pub nick: String,
}

impl User {
    pub fn new(cid: Cid, nick: impl Into<String>) -> Self {
        Self {
            cid,
            nick: nick.into(),
        }
    }

    /// A peer seen on a legacy hub, which has no client id
    pub fn legacy(nick: impl Into<String>) -> Self {
        Self::new(Cid::default(), nick)
    }
}

/// A user bundled with the hub it was last seen through
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct HintedUser {
    pub user: User,
    pub hub_url: String,
}

impl HintedUser {
    pub fn new(user: User, hub_url: impl Into<String>) -> Self {
        Self {
            user,
            hub_url: hub_url.into(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tick Source
// ----------------------------------------------------------------------------

/// Monotonic millisecond counter used for relative timing
///
/// Implementations must never go backwards. Wall-clock adjustments must not
/// affect the value.
pub trait TickSource: Send + Sync {
    /// Milliseconds elapsed since the source was first queried
    fn tick(&self) -> u64;
}

/// Tick source backed by `Instant`, started lazily on the first query
#[derive(Debug, Default)]
pub struct MonotonicTicks {
    start: OnceLock<Instant>,
}

impl MonotonicTicks {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TickSource for MonotonicTicks {
    fn tick(&self) -> u64 {
        let start = *self.start.get_or_init(Instant::now);
        u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Hand-driven tick source for tests
#[derive(Debug, Default)]
pub struct ManualTicks {
    now: AtomicU64,
}

impl ManualTicks {
    pub fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Move the clock forward by `millis`
    pub fn advance(&self, millis: u64) -> u64 {
        self.now.fetch_add(millis, Ordering::SeqCst) + millis
    }
}

impl TickSource for ManualTicks {
    fn tick(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiger_hash_base32() {
        let hash = TigerHash::new([0u8; 24]);
        let text = hash.to_base32();
        assert_eq!(text.len(), TigerHash::BASE32_LEN);
        assert!(text.chars().all(|c| c == 'A'));

        let hash = TigerHash::new([0xFF; 24]);
        let parsed: TigerHash = hash.to_base32().parse().unwrap();
        assert_eq!(parsed, hash);
    }

    #[test]
    fn test_tiger_hash_rejects_wrong_length() {
        let short = "MZXW6YTBOI".parse::<TigerHash>();
        assert!(matches!(
            short,
            Err(DcError::Protocol(ProtocolError::InvalidHash { .. }))
        ));
    }

    #[test]
    fn test_cid_zero() {
        assert!(Cid::default().is_zero());
        assert!(!Cid::new([1; 24]).is_zero());
        assert_eq!(User::legacy("bob").cid, Cid::default());
    }

    #[test]
    fn test_sid_parse() {
        let sid: Sid = "ABCD".parse().unwrap();
        assert_eq!(sid.to_string(), "ABCD");
        assert!("ABC".parse::<Sid>().is_err());
        assert!("AB1D".parse::<Sid>().is_err());
        assert!("abcd".parse::<Sid>().is_err());
    }

    #[test]
    fn test_monotonic_ticks_never_decrease() {
        let ticks = MonotonicTicks::new();
        let first = ticks.tick();
        assert!(first < 1_000);
        let mut last = first;
        for _ in 0..1000 {
            let now = ticks.tick();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn test_manual_ticks() {
        let ticks = ManualTicks::new(500);
        assert_eq!(ticks.tick(), 500);
        assert_eq!(ticks.advance(250), 750);
        assert_eq!(ticks.tick(), 750);
    }
}
