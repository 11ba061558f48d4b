//! Text encodings used on the wire
//!
//! Hashes and client identifiers travel as unpadded RFC 4648 base-32. Legacy
//! hubs exchange text in a per-hub 8-bit character set, so nicknames and paths
//! are re-encoded from UTF-8 before they are written into a `$SR` line.

use std::borrow::Cow;
use core::fmt;
use core::str::FromStr;

use data_encoding::BASE32_NOPAD;
use encoding_rs::{EncoderResult, Encoding};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::EncodingError;

// ----------------------------------------------------------------------------
// Base-32
// ----------------------------------------------------------------------------

/// Render bytes as unpadded upper-case base-32
pub fn to_base32(bytes: &[u8]) -> String {
    BASE32_NOPAD.encode(bytes)
}

/// Decode unpadded base-32 into a fixed-size buffer
///
/// Lower-case input is accepted. The decoded length must match `N` exactly.
pub fn from_base32<const N: usize>(text: &str) -> Result<[u8; N], EncodingError> {
    let upper = text.trim().to_ascii_uppercase();
    let bytes = BASE32_NOPAD
        .decode(upper.as_bytes())
        .map_err(|e| EncodingError::InvalidBase32 {
            reason: e.to_string(),
        })?;

    bytes
        .as_slice()
        .try_into()
        .map_err(|_| EncodingError::InvalidLength {
            expected: N,
            actual: bytes.len(),
        })
}

/// Whether `c` belongs to the base-32 alphabet
pub fn is_base32_char(c: u8) -> bool {
    c.is_ascii_uppercase() || (b'2'..=b'7').contains(&c)
}

// ----------------------------------------------------------------------------
// Character Sets
// ----------------------------------------------------------------------------

/// Character set of a legacy hub connection
///
/// Conversion is lossy in both directions and never fails: characters the
/// target set cannot represent are written as `?`, undecodable bytes become
/// U+FFFD.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Charset(&'static Encoding);

impl Charset {
    /// UTF-8, used by hubs that advertise it
    pub fn utf8() -> Self {
        Self(encoding_rs::UTF_8)
    }

    /// Windows-1252, the usual default for legacy hubs
    pub fn windows_1252() -> Self {
        Self(encoding_rs::WINDOWS_1252)
    }

    /// Look up a character set by its WHATWG label (`"cp1251"`, `"latin1"`, ...)
    pub fn from_label(label: &str) -> Result<Self, EncodingError> {
        Encoding::for_label(label.trim().as_bytes())
            .map(Self)
            .ok_or_else(|| EncodingError::UnknownCharset {
                label: label.to_string(),
            })
    }

    /// Canonical name of the character set
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Re-encode UTF-8 text into this character set
    pub fn encode_lossy<'a>(&self, text: &'a str) -> Cow<'a, [u8]> {
        let output = self.0.output_encoding();
        if output == encoding_rs::UTF_8 || (text.is_ascii() && output.is_ascii_compatible()) {
            return Cow::Borrowed(text.as_bytes());
        }

        let mut encoder = output.new_encoder();
        let mut out = Vec::with_capacity(text.len() + 16);
        let mut remaining = text;

        loop {
            let needed = encoder
                .max_buffer_length_from_utf8_without_replacement(remaining.len())
                .unwrap_or(remaining.len() * 4 + 16);
            out.reserve(needed.max(1));

            let (result, read) =
                encoder.encode_from_utf8_to_vec_without_replacement(remaining, &mut out, true);
            remaining = &remaining[read..];

            match result {
                EncoderResult::InputEmpty => break,
                EncoderResult::OutputFull => continue,
                EncoderResult::Unmappable(_) => out.push(b'?'),
            }
        }

        Cow::Owned(out)
    }

    /// Decode bytes in this character set into UTF-8 text
    pub fn decode_lossy<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        self.0.decode_without_bom_handling(bytes).0
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self::windows_1252()
    }
}

impl fmt::Debug for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Charset").field(&self.name()).finish()
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s)
    }
}

impl Serialize for Charset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Charset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Self::from_label(&label).map_err(serde::de::Error::custom)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
