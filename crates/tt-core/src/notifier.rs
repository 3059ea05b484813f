//! Completion notices from Transmission's log file.
//!
//! The log is followed by polling from its current end. Every line reporting
//! an `Incomplete` -> `Complete` transition becomes a `Completed: <name>`
//! message to the most recent authorized chat.

use std::{
    io::{ErrorKind, SeekFrom},
    path::PathBuf,
    sync::{Arc, OnceLock},
    time::Duration,
};

use regex::Regex;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt},
};
use tokio_util::sync::CancellationToken;

use crate::{router::AppContext, Result};

pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Torrent name from a completion line, e.g.
/// `[2017-02-22 21:00:00.898] Name State changed from "Incomplete" to "Complete" (torrent.c:2218)`.
pub fn completed_torrent(line: &str) -> Option<&str> {
    static COMPLETE_RE: OnceLock<Regex> = OnceLock::new();
    let re = COMPLETE_RE.get_or_init(|| {
        Regex::new(r#"^\[[^\]]*\] (.+?) State changed from "Incomplete" to "Complete""#)
            .expect("valid regex")
    });
    re.captures(line).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// Incremental reader over a growing text file.
///
/// A file that shrinks is assumed rotated or truncated and is re-read from
/// the start. A trailing partial line is held back until its newline arrives.
#[derive(Debug)]
pub struct LogFollower {
    path: PathBuf,
    offset: u64,
    pending: Vec<u8>,
}

impl LogFollower {
    /// Start at the current end of `path`; a missing file starts at 0.
    pub async fn at_end(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let offset = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            offset,
            pending: Vec::new(),
        })
    }

    /// Complete lines appended since the previous call.
    pub async fn poll(&mut self) -> Result<Vec<String>> {
        let len = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if len < self.offset {
            tracing::info!(path = %self.path.display(), "log file shrank; reading from start");
            self.offset = 0;
            self.pending.clear();
        }
        if len == self.offset {
            return Ok(Vec::new());
        }

        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(self.offset)).await?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;
        self.offset += buf.len() as u64;
        self.pending.extend_from_slice(&buf);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            lines.push(line.trim_end_matches(['\r', '\n']).to_string());
        }
        Ok(lines)
    }
}

/// Follow `path` until `cancel` fires.
pub async fn watch_completions(ctx: Arc<AppContext>, path: PathBuf, cancel: CancellationToken) {
    let follower = match LogFollower::at_end(&path).await {
        Ok(f) => f,
        Err(e) => {
            tracing::error!(path = %path.display(), "can't follow transmission log: {e}");
            return;
        }
    };
    tracing::info!(path = %path.display(), "following transmission log");
    follow(&ctx, follower, POLL_INTERVAL, &cancel).await;
}

async fn follow(
    ctx: &AppContext,
    mut follower: LogFollower,
    interval: Duration,
    cancel: &CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }

        let lines = match follower.poll().await {
            Ok(lines) => lines,
            Err(e) => {
                tracing::error!("tailing transmission log: {e}");
                continue;
            }
        };

        for name in lines.iter().filter_map(|l| completed_torrent(l)) {
            let Some(chat) = ctx.last_chat() else {
                tracing::debug!(name, "completion with no chat to notify");
                continue;
            };
            ctx.reply(chat, &format!("Completed: {name}")).await;
        }
    }
}
