//! Structured command protocol
//!
//! A command line is a one-character type, a three-letter command name, a
//! type-dependent header (session ids, client id or feature list) and a list
//! of space-separated parameters, terminated by `\n`. Named parameters start
//! with a two-letter tag (`SI1024`). Free text inside a parameter is escaped:
//! space as `\s`, newline as `\n`, backslash as `\\`.
//!
//! `AdcCommand::to_line` and `AdcCommand::parse` are the only places that
//! apply or remove that escaping.

use core::fmt;

use smallvec::SmallVec;

use crate::errors::{DcError, ProtocolError, Result};
use crate::types::{Cid, Sid};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Search result command
pub const CMD_RES: [u8; 3] = *b"RES";
/// Search request command
pub const CMD_SCH: [u8; 3] = *b"SCH";

/// Broadcast to every client on the hub
pub const TYPE_BROADCAST: char = 'B';
/// Client-to-client over a direct connection
pub const TYPE_CLIENT: char = 'C';
/// Direct message routed by the hub
pub const TYPE_DIRECT: char = 'D';
/// Direct message, echoed back to the sender
pub const TYPE_ECHO: char = 'E';
/// Broadcast restricted by feature list
pub const TYPE_FEATURE: char = 'F';
/// Client-to-hub only
pub const TYPE_HUB: char = 'H';
/// Hub-to-client only
pub const TYPE_INFO: char = 'I';
/// Sent over UDP, identified by client id
pub const TYPE_UDP: char = 'U';

/// File list names that are sent without a leading `/`
const FILE_LISTS: &[&str] = &["files.xml.bz2", "files.xml"];

// ----------------------------------------------------------------------------
// Command
// ----------------------------------------------------------------------------

/// A structured protocol command with named parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdcCommand {
    kind: char,
    command: [u8; 3],
    from: Option<Sid>,
    to: Option<Sid>,
    cid: Option<Cid>,
    features: Option<String>,
    params: SmallVec<[String; 8]>,
}

impl AdcCommand {
    /// Create an empty command of the given name and type
    pub fn new(command: [u8; 3], kind: char) -> Self {
        Self {
            kind,
            command,
            from: None,
            to: None,
            cid: None,
            features: None,
            params: SmallVec::new(),
        }
    }

    pub fn kind(&self) -> char {
        self.kind
    }

    pub fn command(&self) -> [u8; 3] {
        self.command
    }

    pub fn command_str(&self) -> &str {
        core::str::from_utf8(&self.command).unwrap_or("???")
    }

    pub fn from(&self) -> Option<Sid> {
        self.from
    }

    pub fn to(&self) -> Option<Sid> {
        self.to
    }

    pub fn cid(&self) -> Option<Cid> {
        self.cid
    }

    pub fn features(&self) -> Option<&str> {
        self.features.as_deref()
    }

    pub fn with_from(mut self, sid: Sid) -> Self {
        self.from = Some(sid);
        self
    }

    pub fn with_to(mut self, sid: Sid) -> Self {
        self.to = Some(sid);
        self
    }

    pub fn with_cid(mut self, cid: Cid) -> Self {
        self.cid = Some(cid);
        self
    }

    pub fn with_features(mut self, features: impl Into<String>) -> Self {
        self.features = Some(features.into());
        self
    }

    /// Append a named parameter (`name` is the two-letter tag)
    pub fn add_param(&mut self, name: &str, value: impl AsRef<str>) -> &mut Self {
        let value = value.as_ref();
        let mut param = String::with_capacity(name.len() + value.len());
        param.push_str(name);
        param.push_str(value);
        self.params.push(param);
        self
    }

    /// Append a positional parameter
    pub fn add_positional(&mut self, value: impl Into<String>) -> &mut Self {
        self.params.push(value.into());
        self
    }

    /// Unescaped parameters in order
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Value of the first parameter tagged `name`
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.len() >= name.len() && p.starts_with(name))
            .map(|p| &p[name.len()..])
    }

    /// Value of a required parameter
    pub fn require(&self, name: &'static str) -> Result<&str> {
        self.param(name).ok_or(DcError::missing_field(name))
    }

    /// Whether the boolean parameter `name` is set (`<name>1`)
    pub fn has_flag(&self, name: &str) -> bool {
        self.param(name) == Some("1")
    }

    // ------------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------------

    /// Render the command as a wire line, escaping every parameter
    pub fn to_line(&self) -> Result<String> {
        let mut line = String::with_capacity(64);
        line.push(self.kind);
        line.push_str(self.command_str());

        match self.kind {
            TYPE_BROADCAST => {
                push_header(&mut line, self.from.as_ref(), "source SID")?;
            }
            TYPE_FEATURE => {
                push_header(&mut line, self.from.as_ref(), "source SID")?;
                push_header(&mut line, self.features.as_ref(), "feature list")?;
            }
            TYPE_DIRECT | TYPE_ECHO => {
                push_header(&mut line, self.from.as_ref(), "source SID")?;
                push_header(&mut line, self.to.as_ref(), "target SID")?;
            }
            TYPE_UDP => {
                push_header(&mut line, self.cid.as_ref(), "client id")?;
            }
            TYPE_CLIENT | TYPE_HUB | TYPE_INFO => {}
            other => return Err(ProtocolError::UnknownCommandType { kind: other }.into()),
        }

        for param in &self.params {
            line.push(' ');
            line.push_str(&escape(param));
        }
        line.push('\n');
        Ok(line)
    }

    /// Parse a wire line, unescaping every parameter
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let mut tokens = line.split(' ');

        let head = tokens.next().unwrap_or_default();
        let head_bytes = head.as_bytes();
        if head_bytes.len() != 4 || !head.is_ascii() {
            return Err(DcError::malformed(format!("bad command header {head:?}")));
        }

        let kind = head_bytes[0] as char;
        let mut command = [0u8; 3];
        command.copy_from_slice(&head_bytes[1..]);
        if !command.iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
            return Err(DcError::malformed(format!("bad command name {head:?}")));
        }

        let mut cmd = AdcCommand::new(command, kind);
        let mut next_header = |what: &'static str| {
            tokens
                .next()
                .filter(|t| !t.is_empty())
                .ok_or_else(|| DcError::malformed(format!("missing {what}")))
        };

        match kind {
            TYPE_BROADCAST => {
                cmd.from = Some(next_header("source SID")?.parse()?);
            }
            TYPE_FEATURE => {
                cmd.from = Some(next_header("source SID")?.parse()?);
                cmd.features = Some(next_header("feature list")?.to_string());
            }
            TYPE_DIRECT | TYPE_ECHO => {
                cmd.from = Some(next_header("source SID")?.parse()?);
                cmd.to = Some(next_header("target SID")?.parse()?);
            }
            TYPE_UDP => {
                cmd.cid = Some(next_header("client id")?.parse()?);
            }
            TYPE_CLIENT | TYPE_HUB | TYPE_INFO => {}
            other => return Err(ProtocolError::UnknownCommandType { kind: other }.into()),
        }

        for token in tokens {
            if token.is_empty() {
                return Err(DcError::malformed("empty parameter"));
            }
            cmd.params.push(unescape(token)?);
        }

        Ok(cmd)
    }
}

impl fmt::Display for AdcCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_line() {
            Ok(line) => f.write_str(line.trim_end_matches('\n')),
            Err(_) => write!(f, "{}{} <incomplete>", self.kind, self.command_str()),
        }
    }
}

fn push_header<T: fmt::Display>(line: &mut String, value: Option<&T>, what: &str) -> Result<()> {
    let value = value.ok_or_else(|| DcError::malformed(format!("missing {what}")))?;
    line.push(' ');
    line.push_str(&value.to_string());
    Ok(())
}

// ----------------------------------------------------------------------------
// Escaping
// ----------------------------------------------------------------------------

/// Escape free text for use inside a parameter
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    for c in text.chars() {
        match c {
            ' ' => out.push_str("\\s"),
            '\n' => out.push_str("\\n"),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out
}

/// Reverse `escape`
pub fn unescape(text: &str) -> core::result::Result<String, ProtocolError> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => out.push(' '),
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => return Err(ProtocolError::InvalidEscape { sequence: other }),
            None => return Err(ProtocolError::InvalidEscape { sequence: ' ' }),
        }
    }
    Ok(out)
}

// ----------------------------------------------------------------------------
// Paths
// ----------------------------------------------------------------------------

/// Convert a share path (`dir\file`) to its structured form (`/dir/file`)
pub fn to_adc_file(path: &str) -> String {
    if FILE_LISTS.contains(&path) {
        return path.to_string();
    }
    let mut out = String::with_capacity(path.len() + 1);
    out.push('/');
    out.extend(path.chars().map(|c| if c == '\\' { '/' } else { c }));
    out
}

/// Convert a structured path back to a share path
pub fn from_adc_file(path: &str) -> String {
    if FILE_LISTS.contains(&path) {
        return path.to_string();
    }
    let path = path.strip_prefix('/').unwrap_or(path);
    path.chars().map(|c| if c == '/' { '\\' } else { c }).collect()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(s: &str) -> Sid {
        s.parse().unwrap()
    }

    #[test]
    fn test_escape_unescape() {
        let raw = "a b\\c\nd";
        let escaped = escape(raw);
        assert_eq!(escaped, "a\\sb\\\\c\\nd");
        assert_eq!(unescape(&escaped).unwrap(), raw);
        assert_eq!(
            unescape("bad\\x"),
            Err(ProtocolError::InvalidEscape { sequence: 'x' })
        );
        assert!(unescape("trailing\\").is_err());
    }

    #[test]
    fn test_adc_file_paths() {
        assert_eq!(to_adc_file("Music\\Album\\01 Track.mp3"), "/Music/Album/01 Track.mp3");
        assert_eq!(from_adc_file("/Music/Album/"), "Music\\Album\\");
        assert_eq!(to_adc_file("files.xml.bz2"), "files.xml.bz2");
        assert_eq!(from_adc_file("files.xml.bz2"), "files.xml.bz2");
    }

    #[test]
    fn test_direct_command_line() {
        let mut cmd = AdcCommand::new(CMD_RES, TYPE_DIRECT)
            .with_from(sid("AAAB"))
            .with_to(sid("AAAC"));
        cmd.add_param("FN", "/My Files/a.txt").add_param("SI", "10");

        let line = cmd.to_line().unwrap();
        assert_eq!(line, "DRES AAAB AAAC FN/My\\sFiles/a.txt SI10\n");

        let parsed = AdcCommand::parse(&line).unwrap();
        assert_eq!(parsed, cmd);
        assert_eq!(parsed.param("FN"), Some("/My Files/a.txt"));
        assert_eq!(parsed.param("SI"), Some("10"));
        assert_eq!(parsed.param("TR"), None);
    }

    #[test]
    fn test_header_variants() {
        let cid = Cid::new([7; 24]);
        let mut udp = AdcCommand::new(CMD_RES, TYPE_UDP).with_cid(cid);
        udp.add_param("SL", "3");
        let line = udp.to_line().unwrap();
        assert_eq!(line, format!("URES {} SL3\n", cid));
        assert_eq!(AdcCommand::parse(&line).unwrap().cid(), Some(cid));

        let feature = AdcCommand::new(CMD_SCH, TYPE_FEATURE)
            .with_from(sid("ABCD"))
            .with_features("+TCP4-NAT0");
        let parsed = AdcCommand::parse(&feature.to_line().unwrap()).unwrap();
        assert_eq!(parsed.features(), Some("+TCP4-NAT0"));

        let client = AdcCommand::new(CMD_RES, TYPE_CLIENT);
        assert_eq!(client.to_line().unwrap(), "CRES\n");
    }

    #[test]
    fn test_missing_header_is_an_error() {
        let cmd = AdcCommand::new(CMD_RES, TYPE_BROADCAST);
        assert!(cmd.to_line().is_err());
        assert!(AdcCommand::parse("BRES").is_err());
        assert!(AdcCommand::parse("DRES AAAB").is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(AdcCommand::parse("").is_err());
        assert!(AdcCommand::parse("XRES AAAA").is_err());
        assert!(AdcCommand::parse("Bres AAAA").is_err());
        assert!(AdcCommand::parse("CRES  SI1").is_err());
        assert!(AdcCommand::parse("CRES FNa\\qb").is_err());
    }

    #[test]
    fn test_require() {
        let cmd = AdcCommand::parse("CRES SI5\n").unwrap();
        assert_eq!(cmd.require("SI").unwrap(), "5");
        assert!(matches!(
            cmd.require("TR"),
            Err(DcError::Protocol(ProtocolError::MissingField { field: "TR" }))
        ));
    }

    #[test]
    fn test_has_flag() {
        let cmd = AdcCommand::parse("CSCH ANjazz TY1 OP0\n").unwrap();
        assert!(cmd.has_flag("TY"));
        assert!(!cmd.has_flag("OP"));
        assert!(!cmd.has_flag("GR"));
        assert_eq!(cmd.param("AN"), Some("jazz"));
    }
}
