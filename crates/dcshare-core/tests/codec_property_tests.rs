//! Property-based tests for the search-result wire codecs
//!
//! These tests verify the framing invariants of the legacy `$SR` line, the
//! totality of the display helpers, and that paths survive the structured
//! protocol's escaping.

use dcshare_core::{
    protocol::{adc, nmdc},
    AdcCommand, Charset, Cid, HintedUser, NmdcContext, ResultKind, SearchResult, TigerHash, User,
};
use proptest::prelude::*;

const SEP: u8 = nmdc::FIELD_SEPARATOR;

/// Generate arbitrary hashes
fn arb_tth() -> impl Strategy<Value = TigerHash> {
    any::<[u8; 24]>().prop_map(TigerHash::new)
}

/// Generate nicks as legacy hubs allow them (no spaces or control bytes)
fn arb_nick() -> impl Strategy<Value = String> {
    prop::string::string_regex(r"[a-zA-Z0-9_.\[\]é-]{1,16}").unwrap()
}

/// Generate share paths made of backslash-separated segments
fn arb_share_path() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::string::string_regex(r"[a-zA-Z0-9 _.()é-]{1,12}").unwrap(),
        1..5,
    )
    .prop_map(|segments| segments.join("\\"))
}

fn arb_user() -> impl Strategy<Value = HintedUser> {
    (any::<[u8; 24]>(), arb_nick())
        .prop_map(|(cid, nick)| HintedUser::new(User::new(Cid::new(cid), nick), "adc://hub"))
}

fn arb_file_result() -> impl Strategy<Value = SearchResult> {
    (arb_user(), arb_share_path(), arb_tth(), any::<u64>(), any::<u32>(), any::<u32>()).prop_map(
        |(user, path, tth, size, free, slots)| {
            SearchResult::builder(user, ResultKind::File, path, tth)
                .size(size)
                .slots(free, slots)
                .build()
        },
    )
}

fn arb_directory_result() -> impl Strategy<Value = SearchResult> {
    (arb_user(), arb_share_path(), arb_tth(), any::<u32>(), any::<u32>()).prop_map(
        |(user, path, tth, free, slots)| {
            SearchResult::builder(user, ResultKind::Directory, format!("{path}\\"), tth)
                .slots(free, slots)
                .build()
        },
    )
}

fn context(nick: &str) -> NmdcContext {
    NmdcContext::new(nick, Charset::utf8(), "192.168.1.10:411")
}

fn separator_positions(line: &[u8]) -> Vec<usize> {
    line.iter()
        .enumerate()
        .filter(|(_, b)| **b == SEP)
        .map(|(i, _)| i)
        .collect()
}

proptest! {
    /// Property: a file line has one separator before the size and one before the hash
    #[test]
    fn file_line_has_two_separators(result in arb_file_result(), nick in arb_nick()) {
        let line = result.to_sr(&context(&nick));
        let seps = separator_positions(&line);
        prop_assert_eq!(seps.len(), 2);

        let size_field = &line[seps[0] + 1..];
        let size_text = result.size().to_string();
        prop_assert!(size_field.starts_with(size_text.as_bytes()));
        prop_assert!(line[seps[1] + 1..].starts_with(b"TTH:"));

        let prefix = format!("$SR {} {}", nick, result.file());
        prop_assert_eq!(&line[..seps[0]], prefix.as_bytes());
        prop_assert_eq!(line.last(), Some(&b'|'));
    }

    /// Property: a directory line has no size field and no trailing separator on the path
    #[test]
    fn directory_line_strips_separator(result in arb_directory_result(), nick in arb_nick()) {
        let line = result.to_sr(&context(&nick));
        let seps = separator_positions(&line);
        prop_assert_eq!(seps.len(), 1);

        let stripped = result.file().strip_suffix('\\').unwrap();
        let expected = format!("$SR {} {} {}", nick, stripped, result.slot_string());
        prop_assert_eq!(&line[..seps[0]], expected.as_bytes());
        prop_assert!(line[seps[0] + 1..].starts_with(b"TTH:"));
    }

    /// Property: encoding is deterministic
    #[test]
    fn legacy_encoding_is_reproducible(result in arb_file_result()) {
        prop_assert_eq!(result.to_sr(&context("n")), result.to_sr(&context("n")));
    }

    /// Property: a legacy line parses back to the same identity fields
    #[test]
    fn legacy_line_round_trips(
        result in prop_oneof![arb_file_result(), arb_directory_result()],
        nick in arb_nick(),
    ) {
        let line = result.to_sr(&context(&nick));
        let back = nmdc::parse_sr(&line, &Charset::utf8(), "").unwrap();
        prop_assert_eq!(back.kind(), result.kind());
        prop_assert_eq!(back.file(), result.file());
        prop_assert_eq!(back.tth(), result.tth());
        prop_assert_eq!(back.free_slots(), result.free_slots());
        prop_assert_eq!(back.slots(), result.slots());
        prop_assert_eq!(&back.user().user.nick, &nick);
        if result.kind() == ResultKind::File {
            prop_assert_eq!(back.size(), result.size());
        }
    }

    /// Property: file_name is total and returns a suffix of the path
    #[test]
    fn file_name_is_total(
        file in ".{0,40}",
        directory in any::<bool>(),
        tth in arb_tth(),
    ) {
        let kind = if directory { ResultKind::Directory } else { ResultKind::File };
        let result = SearchResult::builder(HintedUser::default(), kind, file.clone(), tth).build();
        let name = result.file_name();
        prop_assert!(file.ends_with(name));
        if kind == ResultKind::File {
            prop_assert!(!name.contains('\\'));
        }
    }

    /// Property: the FN field survives escaping and unescaping
    #[test]
    fn structured_path_round_trips(
        segments in prop::collection::vec("[^/\\\\]{0,10}", 1..5),
        directory in any::<bool>(),
        tth in arb_tth(),
        size in any::<u64>(),
    ) {
        let mut path = segments.join("\\");
        let kind = if directory {
            path.push('\\');
            ResultKind::Directory
        } else {
            ResultKind::File
        };
        let result = SearchResult::builder(HintedUser::default(), kind, path.clone(), tth)
            .size(size)
            .slots(2, 4)
            .build();

        let line = result.to_res(adc::TYPE_CLIENT).to_line().unwrap();
        prop_assert_eq!(line.matches('\n').count(), 1);

        let parsed = AdcCommand::parse(&line).unwrap();
        prop_assert_eq!(adc::from_adc_file(parsed.param("FN").unwrap()), path);
        prop_assert_eq!(parsed.param("SI").unwrap(), size.to_string());
        prop_assert_eq!(parsed.param("SL"), Some("2"));
        let tr = tth.to_base32();
        prop_assert_eq!(parsed.param("TR"), Some(tr.as_str()));
    }

    /// Property: slot summary is always "<free>/<total>"
    #[test]
    fn slot_string_format(free in any::<u32>(), slots in any::<u32>()) {
        let result = SearchResult::builder(HintedUser::default(), ResultKind::File, "f", TigerHash::default())
            .slots(free, slots)
            .build();
        prop_assert_eq!(result.slot_string(), format!("{free}/{slots}"));
    }
}
