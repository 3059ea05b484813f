/// Lifecycle status as reported by Transmission (`status` field, 0..=6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TorrentStatus {
    Stopped,
    CheckPending,
    Checking,
    DownloadPending,
    Downloading,
    SeedPending,
    Seeding,
}

impl TorrentStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            0 => Self::Stopped,
            1 => Self::CheckPending,
            2 => Self::Checking,
            3 => Self::DownloadPending,
            4 => Self::Downloading,
            5 => Self::SeedPending,
            6 => Self::Seeding,
            _ => return None,
        })
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::CheckPending => "Check waiting",
            Self::Checking => "Checking",
            Self::DownloadPending => "Download waiting",
            Self::Downloading => "Downloading",
            Self::SeedPending => "Seed waiting",
            Self::Seeding => "Seeding",
        }
    }
}

/// Read-only snapshot of one torrent.
#[derive(Clone, Debug, PartialEq)]
pub struct Torrent {
    pub id: i64,
    pub name: String,
    pub status: TorrentStatus,
    /// Unix seconds.
    pub added_date: i64,
    pub size_when_done: u64,
    pub left_until_done: u64,
    /// 0.0 ..= 1.0
    pub percent_done: f64,
    pub downloaded_ever: u64,
    pub uploaded_ever: u64,
    /// Bytes per second.
    pub rate_download: u64,
    pub rate_upload: u64,
    /// Negative when Transmission has no meaningful ratio.
    pub upload_ratio: f64,
    /// Seconds; negative when unknown.
    pub eta: i64,
    pub error: i64,
    pub error_string: String,
    /// Tracker announce URLs.
    pub trackers: Vec<String>,
}

impl Torrent {
    /// Bytes of the wanted data already verified on disk.
    pub fn have(&self) -> u64 {
        self.size_when_done.saturating_sub(self.left_until_done)
    }

    pub fn is_active(&self) -> bool {
        self.rate_download > 0 || self.rate_upload > 0
    }

    /// All announce URLs joined by a space; the text tracker filters match against.
    pub fn tracker_text(&self) -> String {
        self.trackers.join(" ")
    }
}

/// Byte counters for one accounting period.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub uploaded_bytes: u64,
    pub downloaded_bytes: u64,
    pub files_added: u64,
    pub session_count: u64,
    pub seconds_active: u64,
}

/// `session-stats` snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub torrent_count: u64,
    pub active_torrent_count: u64,
    pub paused_torrent_count: u64,
    pub download_speed: u64,
    pub upload_speed: u64,
    pub current: TransferStats,
    pub cumulative: TransferStats,
}

/// Result of adding a torrent by URL or magnet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddedTorrent {
    pub id: i64,
    pub name: String,
    pub duplicate: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TorrentAction {
    Start,
    Stop,
    Verify,
}

/// Which torrents a mutation applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    All,
    One(i64),
}
