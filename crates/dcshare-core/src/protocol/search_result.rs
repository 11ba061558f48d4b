//! Search results
//!
//! A `SearchResult` is one hit for a search request: a file or directory in a
//! peer's share, the peer it came from, and enough slot information to decide
//! whether a download can start right away. Results are built by the query
//! layer (from a received reply or from a search of the local share) and
//! rendered into either wire form without being mutated.

use serde::{Deserialize, Serialize};

use crate::errors::{DcError, Result};
use crate::protocol::adc::{self, AdcCommand, CMD_RES};
use crate::protocol::nmdc::{self, NmdcContext};
use crate::types::{HintedUser, TigerHash};

// ----------------------------------------------------------------------------
// Kinds and Styles
// ----------------------------------------------------------------------------

/// Whether a result names a file or a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultKind {
    File,
    Directory,
}

/// Flavor of the search request a result answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SearchStyle {
    /// Ordinary name search
    #[default]
    Plain,
    /// Search by content hash
    Tth,
    /// Partial-file source lookup
    Partial,
}

impl SearchStyle {
    /// Map a wire code to a style; unknown codes are plain searches
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => SearchStyle::Tth,
            2 => SearchStyle::Partial,
            _ => SearchStyle::Plain,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            SearchStyle::Plain => 0,
            SearchStyle::Tth => 1,
            SearchStyle::Partial => 2,
        }
    }
}

// ----------------------------------------------------------------------------
// Local Share
// ----------------------------------------------------------------------------

/// The local client's identity and upload slot state
///
/// Passed to `SearchResult::for_self` instead of being looked up globally,
/// so tests can supply fixed values.
pub trait LocalShare {
    /// The local user, hinted with the hub the search came through
    fn me(&self) -> HintedUser;
    /// Configured upload slots
    fn slots(&self) -> u32;
    /// Upload slots currently free
    fn free_slots(&self) -> u32;
}

// ----------------------------------------------------------------------------
// Search Result
// ----------------------------------------------------------------------------

/// One search hit
///
/// Equality compares the identity fields only (user, path, hash).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    user: HintedUser,
    kind: ResultKind,
    size: u64,
    file: String,
    hub_name: String,
    ip: String,
    tth: TigerHash,
    slots: u32,
    free_slots: u32,
    token: String,
    style: SearchStyle,
}

impl SearchResult {
    /// Create a result with every field given
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user: HintedUser,
        kind: ResultKind,
        slots: u32,
        free_slots: u32,
        size: u64,
        file: impl Into<String>,
        hub_name: impl Into<String>,
        ip: impl Into<String>,
        tth: TigerHash,
        token: impl Into<String>,
    ) -> Self {
        Self {
            user,
            kind,
            size,
            file: file.into(),
            hub_name: hub_name.into(),
            ip: ip.into(),
            tth,
            slots,
            free_slots,
            token: token.into(),
            style: SearchStyle::Plain,
        }
    }

    /// Start building a result; optional fields default to empty or zero
    pub fn builder(
        user: HintedUser,
        kind: ResultKind,
        file: impl Into<String>,
        tth: TigerHash,
    ) -> SearchResultBuilder {
        SearchResultBuilder {
            result: Self::new(user, kind, 0, 0, 0, file, "", "", tth, ""),
        }
    }

    /// A result describing an item in the local share
    pub fn for_self(
        share: &dyn LocalShare,
        kind: ResultKind,
        size: u64,
        file: impl Into<String>,
        tth: TigerHash,
    ) -> Self {
        Self::new(
            share.me(),
            kind,
            share.slots(),
            share.free_slots(),
            size,
            file,
            "",
            "",
            tth,
            "",
        )
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn user(&self) -> &HintedUser {
        &self.user
    }

    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn hub_name(&self) -> &str {
        &self.hub_name
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn tth(&self) -> &TigerHash {
        &self.tth
    }

    pub fn slots(&self) -> u32 {
        self.slots
    }

    pub fn free_slots(&self) -> u32 {
        self.free_slots
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn style(&self) -> SearchStyle {
        self.style
    }

    /// Update the hub name shown next to the result
    pub fn set_hub_name(&mut self, hub_name: impl Into<String>) {
        self.hub_name = hub_name.into();
    }

    /// Update the source address shown next to the result
    pub fn set_ip(&mut self, ip: impl Into<String>) {
        self.ip = ip.into();
    }

    // ------------------------------------------------------------------------
    // Display Helpers
    // ------------------------------------------------------------------------

    /// Last path segment, for display
    ///
    /// Directories keep their trailing separator: `share\music\` gives `music\`.
    pub fn file_name(&self) -> &str {
        let file = self.file.as_str();
        match self.kind {
            ResultKind::File => match file.rfind('\\') {
                Some(i) => &file[i + 1..],
                None => file,
            },
            ResultKind::Directory => {
                let bytes = file.as_bytes();
                if bytes.len() < 2 {
                    return file;
                }
                // Skip the trailing separator when searching
                match bytes[..bytes.len() - 1].iter().rposition(|b| *b == b'\\') {
                    Some(i) => &file[i + 1..],
                    None => file,
                }
            }
        }
    }

    /// `"<free>/<total>"` slot summary
    pub fn slot_string(&self) -> String {
        format!("{}/{}", self.free_slots, self.slots)
    }

    // ------------------------------------------------------------------------
    // Wire Encodings
    // ------------------------------------------------------------------------

    /// Render as a legacy `$SR` line
    pub fn to_sr(&self, context: &NmdcContext) -> Vec<u8> {
        nmdc::encode_sr(self, context)
    }

    /// Render as a structured `RES` command of the given type
    pub fn to_res(&self, kind: char) -> AdcCommand {
        let mut cmd = AdcCommand::new(CMD_RES, kind);
        cmd.add_param("SI", self.size.to_string())
            .add_param("SL", self.free_slots.to_string())
            .add_param("FN", adc::to_adc_file(&self.file))
            .add_param("TR", self.tth.to_base32());
        cmd
    }

    /// Build a result from a received `RES` command
    ///
    /// `slots` is the sender's total slot count, which `RES` does not carry.
    pub fn from_res(cmd: &AdcCommand, user: HintedUser, slots: u32) -> Result<Self> {
        if cmd.command() != CMD_RES {
            return Err(DcError::malformed(format!(
                "expected RES, got {}",
                cmd.command_str()
            )));
        }

        let size = parse_param::<u64>(cmd, "SI")?;
        let free_slots = parse_param::<u32>(cmd, "SL")?;
        let name = cmd.require("FN")?;
        let tth: TigerHash = cmd.require("TR")?.parse()?;

        let kind = if name.ends_with('/') {
            ResultKind::Directory
        } else {
            ResultKind::File
        };

        Ok(Self::new(
            user,
            kind,
            slots,
            free_slots,
            size,
            adc::from_adc_file(name),
            "",
            "",
            tth,
            cmd.param("TO").unwrap_or_default(),
        ))
    }
}

fn parse_param<T: core::str::FromStr>(cmd: &AdcCommand, name: &'static str) -> Result<T> {
    let value = cmd.require(name)?;
    value
        .parse()
        .map_err(|_| DcError::invalid_number(name, value))
}

impl PartialEq for SearchResult {
    fn eq(&self, other: &Self) -> bool {
        self.user.user == other.user.user && self.file == other.file && self.tth == other.tth
    }
}

impl Eq for SearchResult {}

// ----------------------------------------------------------------------------
// Builder
// ----------------------------------------------------------------------------

/// Builder for `SearchResult`
#[derive(Debug, Clone)]
pub struct SearchResultBuilder {
    result: SearchResult,
}

impl SearchResultBuilder {
    pub fn size(mut self, size: u64) -> Self {
        self.result.size = size;
        self
    }

    pub fn slots(mut self, free_slots: u32, slots: u32) -> Self {
        self.result.free_slots = free_slots;
        self.result.slots = slots;
        self
    }

    pub fn hub_name(mut self, hub_name: impl Into<String>) -> Self {
        self.result.hub_name = hub_name.into();
        self
    }

    pub fn ip(mut self, ip: impl Into<String>) -> Self {
        self.result.ip = ip.into();
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.result.token = token.into();
        self
    }

    pub fn style(mut self, style: SearchStyle) -> Self {
        self.result.style = style;
        self
    }

    pub fn build(self) -> SearchResult {
        self.result
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
