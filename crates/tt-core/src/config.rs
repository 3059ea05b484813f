use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, security::normalize_identity, Result};

pub const DEFAULT_RPC_URL: &str = "http://localhost:9091/transmission/rpc";

/// Telegram's hard ceiling per message, counted in UTF-16 code units.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

pub const USAGE: &str = "\
Usage: transmission-telegram

Required environment (or .env) variables:
  TT_BOTT                   Telegram bot token
  TT_MASTERS                Comma-separated Telegram handles allowed to use the bot (e.g. @you,@friend)

Optional:
  TT_RPC_URL                Transmission RPC URL (default: http://localhost:9091/transmission/rpc)
  TR_AUTH                   Transmission credentials as username:password
  TT_LOGFILE                Send logs to this file instead of stdout
  TT_TRANSMISSION_LOGFILE   Follow Transmission's log file to announce completed torrents
  TT_NO_LIVE                Don't keep editing messages after sending them (1/true/yes/on)
  TT_LIVE_INTERVAL_SECS     Seconds between live updates (default: 5)
  TT_LIVE_TICKS             Number of live updates per message (default: 10)
  TT_MESSAGE_LIMIT          Max characters per outbound message (default: 4096)
  TT_AUDIT_LOG              Append an audit trail of senders/commands to this file
  TT_AUDIT_LOG_JSON         Write the audit trail as JSON lines
";

/// Live-refresh settings shared by every live-capable command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiveConfig {
    pub enabled: bool,
    pub interval: Duration,
    pub ticks: u32,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(5),
            ticks: 10,
        }
    }
}

/// Typed configuration.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    /// Normalized handles (lower-case, no leading `@`).
    pub masters: Vec<String>,
    pub message_limit: usize,

    // Transmission
    pub rpc_url: String,
    pub rpc_username: Option<String>,
    pub rpc_password: Option<String>,
    pub transmission_log_file: Option<PathBuf>,

    // Behavior
    pub live: LiveConfig,

    // Logging / audit
    pub log_file: Option<PathBuf>,
    pub audit_log_path: Option<PathBuf>,
    pub audit_log_json: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let telegram_bot_token = lookup("TT_BOTT").unwrap_or_default().trim().to_string();
        let masters = parse_masters(lookup("TT_MASTERS"));

        if telegram_bot_token.is_empty() {
            return Err(Error::Config(
                "TT_BOTT environment variable is required".to_string(),
            ));
        }
        if masters.is_empty() {
            return Err(Error::Config(
                "TT_MASTERS environment variable is required".to_string(),
            ));
        }

        let rpc_url = lookup("TT_RPC_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_RPC_URL.to_string());
        let (rpc_username, rpc_password) = match lookup("TR_AUTH").and_then(non_empty) {
            Some(auth) => match auth.split_once(':') {
                Some((user, pass)) => (Some(user.to_string()), Some(pass.to_string())),
                None => (Some(auth), None),
            },
            None => (None, None),
        };
        let transmission_log_file = lookup("TT_TRANSMISSION_LOGFILE")
            .and_then(non_empty)
            .map(PathBuf::from);

        let defaults = LiveConfig::default();
        let live = LiveConfig {
            enabled: !lookup("TT_NO_LIVE").map(|s| parse_bool(&s)).unwrap_or(false),
            interval: lookup("TT_LIVE_INTERVAL_SECS")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.interval),
            ticks: lookup("TT_LIVE_TICKS")
                .and_then(|s| s.trim().parse::<u32>().ok())
                .unwrap_or(defaults.ticks),
        };

        let message_limit = lookup("TT_MESSAGE_LIMIT")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(TELEGRAM_MESSAGE_LIMIT)
            .clamp(64, TELEGRAM_MESSAGE_LIMIT);

        let log_file = lookup("TT_LOGFILE").and_then(non_empty).map(PathBuf::from);
        let audit_log_path = lookup("TT_AUDIT_LOG").and_then(non_empty).map(PathBuf::from);
        let audit_log_json = lookup("TT_AUDIT_LOG_JSON")
            .map(|s| parse_bool(&s))
            .unwrap_or(false);

        Ok(Self {
            telegram_bot_token,
            masters,
            message_limit,
            rpc_url,
            rpc_username,
            rpc_password,
            transmission_log_file,
            live,
            log_file,
            audit_log_path,
            audit_log_json,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_masters(v: Option<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for handle in v.unwrap_or_default().split(',').map(normalize_identity) {
        if !handle.is_empty() && !out.contains(&handle) {
            out.push(handle);
        }
    }
    out
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.trim().to_string())
    }
}
