//! Command handlers for the dcshare CLI

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use dcshare_core::protocol::{adc, nmdc};
use dcshare_core::{
    AdcCommand, Charset, HintedUser, NmdcContext, ResultKind, SearchResult, Sid, TigerHash,
    TimerConfig, User,
};
use dcshare_runtime::{PendingSearches, TimerService};

use crate::cli::{Cli, Commands, ResultArgs};
use crate::config::AppConfig;
use crate::error::{CliError, Result};

/// Text standing in for the `$SR` field separator on the command line
const SEPARATOR_PLACEHOLDER: &str = "\\x05";

/// Search token tracked by the `ticks` command
const PROBE_TOKEN: &str = "probe";

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command
    pub async fn execute(cli: Cli, config: AppConfig) -> Result<()> {
        match cli.command {
            Commands::Sr {
                result,
                nick,
                ip_port,
                charset,
            } => {
                let line = render_sr(&config, &result, nick, ip_port, charset.as_deref())?;
                println!("{}", show_separators(&line));
                Ok(())
            }
            Commands::Res {
                result,
                kind,
                from,
                to,
                token,
            } => {
                let line = render_res(&config, &result, kind, from, to, token)?;
                print!("{line}");
                Ok(())
            }
            Commands::Parse { line, charset } => {
                let result = parse_line(&config, &line, charset.as_deref())?;
                println!("{}", serde_json::to_string_pretty(&result)?);
                Ok(())
            }
            Commands::Ticks { seconds, fast } => {
                let timer = if fast {
                    TimerConfig::testing()
                } else {
                    config.core.timer.clone()
                };
                Self::handle_ticks_command(timer, config.core.search.expiry(), seconds).await
            }
        }
    }

    /// Run the timer for `seconds` and log every event
    ///
    /// A probe search is registered at start so the run also shows when it
    /// would have expired.
    async fn handle_ticks_command(
        timer_config: TimerConfig,
        search_expiry: Duration,
        seconds: u64,
    ) -> Result<()> {
        info!("Running timer for {} seconds", seconds);

        let timer = TimerService::start(timer_config)?;
        let searches = PendingSearches::new(search_expiry);
        searches.start(PROBE_TOKEN, timer.tick());
        let expiry_id = searches.attach(&timer);
        let seconds_seen = Arc::new(AtomicU64::new(0));
        let minutes_seen = Arc::new(AtomicU64::new(0));

        let counter = Arc::clone(&seconds_seen);
        let second_id = timer.subscribe_second(move |tick| {
            let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
            debug!("second #{} at tick {}", n, tick);
        });
        let counter = Arc::clone(&minutes_seen);
        let minute_id = timer.subscribe_minute(move |tick| {
            let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
            info!("minute #{} at tick {}", n, tick);
        });

        tokio::time::sleep(Duration::from_secs(seconds)).await;

        timer.unsubscribe_second(second_id);
        timer.unsubscribe_minute(minute_id);
        searches.detach(&timer, expiry_id);
        timer.shutdown();

        println!(
            "{} second events, {} minute events, final tick {}, probe search {}",
            seconds_seen.load(Ordering::Relaxed),
            minutes_seen.load(Ordering::Relaxed),
            timer.tick(),
            if searches.contains(PROBE_TOKEN) { "pending" } else { "expired" }
        );
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Rendering
// ----------------------------------------------------------------------------

/// Build a result for an item of the local share
pub fn local_result(config: &AppConfig, args: &ResultArgs) -> Result<SearchResult> {
    let tth = match &args.tth {
        Some(text) => text.parse::<TigerHash>()?,
        None => TigerHash::default(),
    };
    let (kind, file) = if args.directory {
        let mut file = args.file.clone();
        if !file.ends_with('\\') {
            file.push('\\');
        }
        (ResultKind::Directory, file)
    } else {
        (ResultKind::File, args.file.clone())
    };
    Ok(SearchResult::for_self(&config.identity, kind, args.size, file, tth))
}

/// Render a local result as a `$SR` line
pub fn render_sr(
    config: &AppConfig,
    args: &ResultArgs,
    nick: Option<String>,
    ip_port: Option<String>,
    charset: Option<&str>,
) -> Result<Vec<u8>> {
    let result = local_result(config, args)?;
    let context = NmdcContext::new(
        nick.unwrap_or_else(|| config.identity.nick.clone()),
        resolve_charset(config, charset)?,
        ip_port.unwrap_or_else(|| config.core.legacy.hub_address.clone()),
    );
    Ok(result.to_sr(&context))
}

/// Render a local result as a `RES` command line
pub fn render_res(
    config: &AppConfig,
    args: &ResultArgs,
    kind: char,
    from: Option<String>,
    to: Option<String>,
    token: Option<String>,
) -> Result<String> {
    let result = local_result(config, args)?;
    let mut cmd = result.to_res(kind);

    if let Some(from) = from {
        cmd = cmd.with_from(from.parse::<Sid>()?);
    }
    if let Some(to) = to {
        cmd = cmd.with_to(to.parse::<Sid>()?);
    }
    if kind == adc::TYPE_UDP {
        cmd = cmd.with_cid(config.identity.cid.unwrap_or_default());
    }
    if let Some(token) = token {
        cmd.add_param("TO", token);
    }

    Ok(cmd.to_line()?)
}

/// Parse a received `$SR` line or `RES` command
pub fn parse_line(config: &AppConfig, line: &str, charset: Option<&str>) -> Result<SearchResult> {
    if line.starts_with('$') {
        let bytes = line
            .replace(SEPARATOR_PLACEHOLDER, "\u{5}")
            .into_bytes();
        let charset = resolve_charset(config, charset)?;
        return Ok(nmdc::parse_sr(&bytes, &charset, "")?);
    }

    let cmd = AdcCommand::parse(line)?;
    if cmd.command() != adc::CMD_RES {
        return Err(CliError::InvalidArgument(format!(
            "expected a RES command, got {}",
            cmd.command_str()
        )));
    }
    Ok(SearchResult::from_res(&cmd, remote_sender(config), 0)?)
}

fn resolve_charset(config: &AppConfig, label: Option<&str>) -> Result<Charset> {
    match label {
        Some(label) => Ok(label.parse()?),
        None => Ok(config.core.legacy.charset),
    }
}

/// Make the separator byte visible when printing a `$SR` line
fn show_separators(line: &[u8]) -> String {
    String::from_utf8_lossy(line).replace('\u{5}', SEPARATOR_PLACEHOLDER)
}

/// The user a parsed `RES` command is attributed to
fn remote_sender(config: &AppConfig) -> HintedUser {
    HintedUser::new(User::legacy("remote"), config.identity.hub_url.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(file: &str, directory: bool) -> ResultArgs {
        ResultArgs {
            file: file.to_string(),
            directory,
            size: 1024,
            tth: None,
        }
    }

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.identity.nick = "sharer".to_string();
        config.identity.slots = 5;
        config.identity.free_slots = 3;
        config
    }

    #[test]
    fn test_render_sr_uses_identity() {
        let line = render_sr(&config(), &args("a\\b.txt", false), None, None, None).unwrap();
        let text = show_separators(&line);
        assert!(text.starts_with("$SR sharer a\\b.txt\\x051024 3/5\\x05TTH:"));
        assert!(text.ends_with(" (127.0.0.1:411)|"));
    }

    #[test]
    fn test_render_sr_directory() {
        let line = render_sr(
            &config(),
            &args("share\\music", true),
            Some("other".to_string()),
            Some("1.2.3.4:411".to_string()),
            Some("utf-8"),
        )
        .unwrap();
        assert!(line.starts_with(b"$SR other share\\music 3/5\x05"));
    }

    #[test]
    fn test_render_res_direct() {
        let line = render_res(
            &config(),
            &args("dir\\a b.txt", false),
            'D',
            Some("AAAB".to_string()),
            Some("AAAC".to_string()),
            Some("t1".to_string()),
        )
        .unwrap();
        assert!(line.starts_with("DRES AAAB AAAC SI1024 SL3 FN/dir/a\\sb.txt TR"));
        assert!(line.ends_with(" TOt1\n"));
    }

    #[test]
    fn test_render_res_missing_header() {
        let result = render_res(&config(), &args("x", false), 'D', None, None, None);
        assert!(matches!(result, Err(CliError::Core(_))));
    }

    #[test]
    fn test_parse_line_both_protocols() {
        let config = config();
        let sr = render_sr(&config, &args("a.txt", false), None, None, None).unwrap();
        let parsed = parse_line(&config, &show_separators(&sr), None).unwrap();
        assert_eq!(parsed.file(), "a.txt");
        assert_eq!(parsed.size(), 1024);

        let res = render_res(&config, &args("dir", true), 'C', None, None, Some("x".into())).unwrap();
        let parsed = parse_line(&config, &res, None).unwrap();
        assert_eq!(parsed.kind(), ResultKind::Directory);
        assert_eq!(parsed.file(), "dir\\");
        assert_eq!(parsed.token(), "x");
    }

    #[test]
    fn test_parse_line_rejects_other_commands() {
        let result = parse_line(&config(), "CINF IDABC\n", None);
        assert!(matches!(result, Err(CliError::InvalidArgument(_))));
    }

    #[test]
    fn test_bad_hash_argument() {
        let mut bad = args("x", false);
        bad.tth = Some("NOTAHASH".to_string());
        assert!(local_result(&config(), &bad).is_err());
    }
}
