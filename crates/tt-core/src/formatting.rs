//! Snapshot rendering: filters, per-command templates, byte/ratio/ETA helpers.
//!
//! Decorated templates emit Telegram HTML; plain templates emit raw text.

use std::{fmt::Write as _, sync::OnceLock};

use chrono::{Local, TimeZone};
use regex::{Regex, RegexBuilder};

use crate::{
    manager::types::{Torrent, TorrentStatus},
    sorting::SortOrder,
};

/// Shown instead of a transfer rate once a live message stops updating.
pub const FROZEN_RATE: &str = "- B";
const FROZEN_ETA: &str = "-";

/// Whether transfer rates are still being tracked for a rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rates {
    Live,
    Frozen,
}

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ============== Filters ==============

pub const DOWNLOADING: &[TorrentStatus] =
    &[TorrentStatus::Downloading, TorrentStatus::DownloadPending];
pub const SEEDING: &[TorrentStatus] = &[TorrentStatus::Seeding, TorrentStatus::SeedPending];
pub const PAUSED: &[TorrentStatus] = &[TorrentStatus::Stopped];
pub const CHECKING: &[TorrentStatus] = &[TorrentStatus::Checking, TorrentStatus::CheckPending];

/// Which items of a snapshot a command shows.
#[derive(Clone, Debug)]
pub enum Filter {
    All,
    Status(&'static [TorrentStatus]),
    /// Nonzero download or upload rate.
    Active,
    /// Nonzero error code.
    Errored,
    /// Case-insensitive match against the tracker announce URLs.
    Tracker(Regex),
    /// Case-insensitive match against the name.
    Name(Regex),
}

impl Filter {
    pub fn tracker(pattern: &str) -> Result<Self, regex::Error> {
        case_insensitive(pattern).map(Self::Tracker)
    }

    pub fn name(pattern: &str) -> Result<Self, regex::Error> {
        case_insensitive(pattern).map(Self::Name)
    }

    pub fn matches(&self, t: &Torrent) -> bool {
        match self {
            Self::All => true,
            Self::Status(set) => set.contains(&t.status),
            Self::Active => t.is_active(),
            Self::Errored => t.error != 0,
            Self::Tracker(re) => re.is_match(&t.tracker_text()),
            Self::Name(re) => re.is_match(&t.name),
        }
    }
}

fn case_insensitive(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// Filter a fresh snapshot and order it.
pub fn select(items: Vec<Torrent>, filter: &Filter, order: SortOrder) -> Vec<Torrent> {
    let mut out: Vec<Torrent> = items.into_iter().filter(|t| filter.matches(t)).collect();
    order.sort(&mut out);
    out
}

/// Resolve a user-supplied count: `n <= 0` or past the end means "all".
pub fn clamp_count(n: i64, len: usize) -> usize {
    match usize::try_from(n) {
        Ok(n) if n > 0 && n <= len => n,
        _ => len,
    }
}

// ============== Templates ==============

/// Per-command layout for one item block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Template {
    /// `<id> name`
    Brief,
    /// Status, progress, transferred totals and ratio.
    Paused,
    /// Status and progress.
    Checking,
    /// Error text.
    Errors,
    /// Decorated: status, have/size, progress, rates, ratio.
    Rich(Rates),
}

/// Render every item with `template`, one block each.
///
/// Returns an empty string for an empty slice; callers substitute their own
/// "nothing to show" text.
pub fn render(items: &[Torrent], template: Template) -> String {
    let mut out = String::new();
    for t in items {
        match template {
            Template::Brief => {
                let _ = writeln!(out, "<{}> {}", t.id, t.name);
            }
            Template::Paused => {
                let _ = write!(
                    out,
                    "<{}> {}\n{} ({:.1}%) DL: {} UL: {}  R: {}\n\n",
                    t.id,
                    t.name,
                    t.status.label(),
                    t.percent_done * 100.0,
                    humanize_bytes(t.downloaded_ever),
                    humanize_bytes(t.uploaded_ever),
                    format_ratio(t.upload_ratio),
                );
            }
            Template::Checking => {
                let _ = write!(
                    out,
                    "<{}> {}\n{} ({:.1}%)\n\n",
                    t.id,
                    t.name,
                    t.status.label(),
                    t.percent_done * 100.0,
                );
            }
            Template::Errors => {
                let _ = write!(out, "<{}> {}\n{}\n", t.id, t.name, t.error_string);
            }
            Template::Rich(rates) => {
                out.push_str(&rich_block(t, rates));
                out.push_str("\n\n");
            }
        }
    }
    out
}

fn rich_block(t: &Torrent, rates: Rates) -> String {
    let (down, up) = match rates {
        Rates::Live => (humanize_bytes(t.rate_download), humanize_bytes(t.rate_upload)),
        Rates::Frozen => (FROZEN_RATE.to_string(), FROZEN_RATE.to_string()),
    };
    format!(
        "<code>&lt;{}&gt;</code> <b>{}</b>\n{} <b>{}</b> of <b>{}</b> (<b>{:.1}%</b>) ↓ <b>{}</b>  ↑ <b>{}</b> R: <b>{}</b>",
        t.id,
        escape_html(&t.name),
        t.status.label(),
        humanize_bytes(t.have()),
        humanize_bytes(t.size_when_done),
        t.percent_done * 100.0,
        down,
        up,
        format_ratio(t.upload_ratio),
    )
}

/// Decorated detail view of a single torrent.
pub fn render_info(t: &Torrent, rates: Rates) -> String {
    let eta = match rates {
        Rates::Live => format_eta(t.eta),
        Rates::Frozen => FROZEN_ETA.to_string(),
    };
    let hosts: Vec<String> = t.trackers.iter().filter_map(|u| tracker_host(u)).collect();
    format!(
        "{}\nDL: <b>{}</b> UP: <b>{}</b>\nAdded: <b>{}</b>, ETA: <b>{}</b>\nTrackers: <code>{}</code>",
        rich_block(t, rates),
        humanize_bytes(t.downloaded_ever),
        humanize_bytes(t.uploaded_ever),
        format_added(t.added_date),
        eta,
        escape_html(&hosts.join(" ")),
    )
}

// ============== Values ==============

const BYTE_UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];

/// Decimal (base-1000) magnitude, e.g. `999 B`, `1.5 kB`, `15 MB`.
pub fn humanize_bytes(n: u64) -> String {
    if n < 10 {
        return format!("{n} B");
    }

    let mut exp = 0usize;
    let mut scale = 1u64;
    while exp + 1 < BYTE_UNITS.len() && n / scale >= 1000 {
        scale *= 1000;
        exp += 1;
    }

    let value = ((n as f64 / scale as f64) * 10.0 + 0.5).floor() / 10.0;
    if value < 10.0 {
        format!("{value:.1} {}", BYTE_UNITS[exp])
    } else {
        format!("{value:.0} {}", BYTE_UNITS[exp])
    }
}

/// `∞` when Transmission reports no ratio.
pub fn format_ratio(ratio: f64) -> String {
    if ratio < 0.0 {
        "∞".to_string()
    } else {
        format!("{ratio:.2}")
    }
}

/// `∞` when unknown, otherwise e.g. `1h2m3s`.
pub fn format_eta(secs: i64) -> String {
    match u64::try_from(secs) {
        Ok(secs) => format_duration(secs),
        Err(_) => "∞".to_string(),
    }
}

/// Compact duration: `45s`, `2m5s`, `26h0m1s`.
pub fn format_duration(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{m}m{s}s")
    } else {
        format!("{s}s")
    }
}

fn format_added(unix_secs: i64) -> String {
    match Local.timestamp_opt(unix_secs, 0).single() {
        Some(ts) => ts.format("%b %e %H:%M:%S").to_string(),
        None => unix_secs.to_string(),
    }
}

/// Host part of a tracker announce URL.
pub fn tracker_host(announce: &str) -> Option<String> {
    static TRACKER_RE: OnceLock<Regex> = OnceLock::new();
    let re = TRACKER_RE
        .get_or_init(|| Regex::new(r"(?:https?|udp)://([^:/]*)").expect("valid regex"));
    re.captures(announce)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|h| !h.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        sorting::SortField,
        test_support::{torrent, torrent_with},
    };

    #[test]
    fn escapes_html() {
        assert_eq!(escape_html("<a&b>\""), "&lt;a&amp;b&gt;&quot;");
    }

    #[test]
    fn humanizes_bytes_in_decimal_units() {
        assert_eq!(humanize_bytes(0), "0 B");
        assert_eq!(humanize_bytes(9), "9 B");
        assert_eq!(humanize_bytes(10), "10 B");
        assert_eq!(humanize_bytes(999), "999 B");
        assert_eq!(humanize_bytes(1000), "1.0 kB");
        assert_eq!(humanize_bytes(1500), "1.5 kB");
        assert_eq!(humanize_bytes(15_000), "15 kB");
        assert_eq!(humanize_bytes(999_999), "1000 kB");
        assert_eq!(humanize_bytes(3_200_000_000), "3.2 GB");
        assert_eq!(humanize_bytes(u64::MAX), "18 EB");
    }

    #[test]
    fn formats_ratio_eta_and_duration() {
        assert_eq!(format_ratio(-1.0), "∞");
        assert_eq!(format_ratio(1.234), "1.23");
        assert_eq!(format_eta(-1), "∞");
        assert_eq!(format_eta(0), "0s");
        assert_eq!(format_eta(125), "2m5s");
        assert_eq!(format_eta(3723), "1h2m3s");
        assert_eq!(format_duration(3600), "1h0m0s");
    }

    #[test]
    fn extracts_tracker_hosts() {
        assert_eq!(
            tracker_host("udp://tracker.example.org:1337/announce").as_deref(),
            Some("tracker.example.org")
        );
        assert_eq!(
            tracker_host("https://t.example.com/a?x=1").as_deref(),
            Some("t.example.com")
        );
        assert_eq!(tracker_host("not a url"), None);
    }

    #[test]
    fn brief_and_plain_templates_skip_escaping() {
        let items = vec![torrent(1, "a<b>", 10), torrent(2, "c&d", 20)];
        assert_eq!(render(&items, Template::Brief), "<1> a<b>\n<2> c&d\n");
    }

    #[test]
    fn only_the_rich_template_shows_rates() {
        let t = torrent_with(3, "busy", |t| {
            t.rate_download = 1500;
            t.rate_upload = 2500;
        });
        let items = std::slice::from_ref(&t);

        for template in [Template::Brief, Template::Paused, Template::Checking, Template::Errors] {
            let out = render(items, template);
            assert!(!out.contains("1.5 kB") && !out.contains("2.5 kB"), "{template:?}");
        }
        assert!(render(items, Template::Rich(Rates::Live)).contains("↓ <b>1.5 kB</b>  ↑ <b>2.5 kB</b>"));
    }

    #[test]
    fn rich_template_escapes_names_and_freezes_rates() {
        let t = torrent_with(7, "<evil>", |t| {
            t.size_when_done = 2000;
            t.left_until_done = 500;
            t.percent_done = 0.75;
            t.rate_download = 1500;
            t.rate_upload = 20;
            t.upload_ratio = 0.5;
        });

        let live = render(std::slice::from_ref(&t), Template::Rich(Rates::Live));
        assert_eq!(
            live,
            "<code>&lt;7&gt;</code> <b>&lt;evil&gt;</b>\nDownloading <b>1.5 kB</b> of <b>2.0 kB</b> (<b>75.0%</b>) ↓ <b>1.5 kB</b>  ↑ <b>20 B</b> R: <b>0.50</b>\n\n"
        );

        let frozen = render(std::slice::from_ref(&t), Template::Rich(Rates::Frozen));
        assert!(frozen.contains("↓ <b>- B</b>  ↑ <b>- B</b>"));
        assert!(frozen.contains("<b>1.5 kB</b> of <b>2.0 kB</b>"));
    }

    #[test]
    fn info_lists_tracker_hosts_and_freezes_eta() {
        let t = torrent_with(3, "x", |t| {
            t.eta = 65;
            t.trackers = vec![
                "udp://one.example:80/announce".to_string(),
                "http://two.example/announce".to_string(),
            ];
        });

        let live = render_info(&t, Rates::Live);
        assert!(live.contains("ETA: <b>1m5s</b>"));
        assert!(live.contains("Trackers: <code>one.example two.example</code>"));

        let frozen = render_info(&t, Rates::Frozen);
        assert!(frozen.contains("ETA: <b>-</b>"));
        assert!(frozen.contains("↓ <b>- B</b>"));
    }

    #[test]
    fn filters_by_status_activity_errors_and_regex() {
        let items = vec![
            torrent_with(1, "Ubuntu ISO", |t| t.status = TorrentStatus::Seeding),
            torrent_with(2, "debian", |t| {
                t.status = TorrentStatus::DownloadPending;
                t.rate_download = 5;
            }),
            torrent_with(3, "arch", |t| {
                t.status = TorrentStatus::Stopped;
                t.error = 2;
                t.trackers = vec!["udp://Tracker.Arch.org:80".to_string()];
            }),
        ];
        let ids = |f: &Filter| -> Vec<i64> {
            select(items.clone(), f, SortOrder::default())
                .iter()
                .map(|t| t.id)
                .collect()
        };

        assert_eq!(ids(&Filter::Status(SEEDING)), vec![1]);
        assert_eq!(ids(&Filter::Status(DOWNLOADING)), vec![2]);
        assert_eq!(ids(&Filter::Active), vec![2]);
        assert_eq!(ids(&Filter::Errored), vec![3]);
        assert_eq!(ids(&Filter::name("ubuntu").unwrap()), vec![1]);
        assert_eq!(ids(&Filter::tracker("arch\\.ORG").unwrap()), vec![3]);
        assert!(Filter::name("(").is_err());
    }

    #[test]
    fn select_applies_current_order_and_rendering_is_idempotent() {
        let items = vec![torrent(1, "a", 10), torrent(2, "b", 50)];
        let order = SortOrder::new(SortField::Size, true);

        let rich = Template::Rich(Rates::Live);
        let first = render(&select(items.clone(), &Filter::All, order), rich);
        let second = render(&select(items, &Filter::All, order), rich);
        assert_eq!(first, second);
        assert!(first.find("&lt;2&gt;") < first.find("&lt;1&gt;"));
    }

    #[test]
    fn clamps_counts() {
        assert_eq!(clamp_count(2, 3), 2);
        assert_eq!(clamp_count(0, 3), 3);
        assert_eq!(clamp_count(-4, 3), 3);
        assert_eq!(clamp_count(10, 3), 3);
        assert_eq!(clamp_count(1, 0), 0);
    }
}
