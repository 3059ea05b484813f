//! Aggregates and static text: trackers, stats, count, help, version.

use std::collections::HashMap;

use crate::{
    commands::{fetch_torrents, Command},
    domain::ChatId,
    formatting::{escape_html, format_duration, humanize_bytes, tracker_host},
    manager::types::{SessionStats, TorrentStatus},
    router::AppContext,
};

const HELP: &str = "\
<b>list</b> or <b>li</b>
Lists all the torrents, takes an optional argument which is a query to list only torrents that has a tracker matches the query, or some of it.

<b>head</b> or <b>he</b>
Lists the first n number of torrents, n defaults to 5 if no argument is provided.

<b>tail</b> or <b>ta</b>
Lists the last n number of torrents, n defaults to 5 if no argument is provided.

<b>downs</b> or <b>dl</b>
Lists torrents with the status of <i>Downloading</i> or in the queue to download.

<b>seeding</b> or <b>sd</b>
Lists torrents with the status of <i>Seeding</i> or in the queue to seed.

<b>paused</b> or <b>pa</b>
Lists <i>Paused</i> torrents.

<b>checking</b> or <b>ch</b>
Lists torrents with the status of <i>Verifying</i> or in the queue to verify.

<b>active</b> or <b>ac</b>
Lists torrents that are actively uploading or downloading.

<b>errors</b> or <b>er</b>
Lists torrents with errors along with the error message.

<b>sort</b> or <b>so</b>
Manipulate the sorting of the aforementioned commands. Call it without arguments for more.

<b>trackers</b> or <b>tr</b>
Lists all the trackers along with the number of torrents.

<b>add</b> or <b>ad</b>
Takes one or many URLs or magnets to add them. You can send a \".torrent\" file via Telegram to add it.

<b>search</b> or <b>se</b>
Takes a query and lists torrents with matching names.

<b>latest</b> or <b>la</b>
Lists the newest n torrents, n defaults to 5 if no argument is provided.

<b>info</b> or <b>in</b>
Takes one or more torrent's IDs to list more info about them.

<b>stop</b> or <b>sp</b>
Takes one or more torrent's IDs to stop them, or <i>all</i> to stop all torrents.

<b>start</b> or <b>st</b>
Takes one or more torrent's IDs to start them, or <i>all</i> to start all torrents.

<b>check</b> or <b>ck</b>
Takes one or more torrent's IDs to verify them, or <i>all</i> to verify all torrents.

<b>del</b>
Takes one or more torrent's IDs to delete them.

<b>deldata</b>
Takes one or more torrent's IDs to delete them and their data.

<b>stats</b> or <b>sa</b>
Shows Transmission's stats.

<b>speed</b> or <b>ss</b>
Shows the upload and download speeds.

<b>count</b> or <b>co</b>
Shows the torrents counts per status.

<b>help</b>
Shows this help message.

<b>version</b>
Shows version numbers.

- Prefix commands with '/' if you want to talk to your bot in a group.";

/// Torrents per tracker host, busiest first.
pub(super) async fn trackers(ctx: &AppContext, chat: ChatId) {
    let Some(torrents) = fetch_torrents(ctx, chat, Command::Trackers).await else {
        return;
    };

    let mut counts: HashMap<String, usize> = HashMap::new();
    for t in &torrents {
        for host in t.trackers.iter().filter_map(|url| tracker_host(url)) {
            *counts.entry(host).or_default() += 1;
        }
    }
    if counts.is_empty() {
        ctx.reply(chat, "No trackers!").await;
        return;
    }

    let mut rows: Vec<(String, usize)> = counts.into_iter().collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let text: String = rows
        .iter()
        .map(|(host, n)| format!("{n} - {host}\n"))
        .collect();
    ctx.reply(chat, &text).await;
}

fn render_stats(stats: &SessionStats) -> String {
    format!(
        "Total: <b>{}</b>\nActive: <b>{}</b>\nPaused: <b>{}</b>\n\n\
         <i>Current Stats</i>\nDownloaded: <b>{}</b>\nUploaded: <b>{}</b>\nRunning time: <b>{}</b>\n\n\
         <i>Accumulative Stats</i>\nSessions: <b>{}</b>\nDownloaded: <b>{}</b>\nUploaded: <b>{}</b>\nTotal Running time: <b>{}</b>",
        stats.torrent_count,
        stats.active_torrent_count,
        stats.paused_torrent_count,
        humanize_bytes(stats.current.downloaded_bytes),
        humanize_bytes(stats.current.uploaded_bytes),
        format_duration(stats.current.seconds_active),
        stats.cumulative.session_count,
        humanize_bytes(stats.cumulative.downloaded_bytes),
        humanize_bytes(stats.cumulative.uploaded_bytes),
        format_duration(stats.cumulative.seconds_active),
    )
}

pub(super) async fn stats(ctx: &AppContext, chat: ChatId) {
    match ctx.manager.session_stats().await {
        Ok(stats) => {
            ctx.reply_html(chat, &render_stats(&stats)).await;
        }
        Err(e) => {
            ctx.reply(chat, &format!("stats: {e}")).await;
        }
    }
}

pub(super) async fn count(ctx: &AppContext, chat: ChatId) {
    let Some(torrents) = fetch_torrents(ctx, chat, Command::Count).await else {
        return;
    };

    let mut by_status: HashMap<TorrentStatus, usize> = HashMap::new();
    for t in &torrents {
        *by_status.entry(t.status).or_default() += 1;
    }
    let n = |s: TorrentStatus| by_status.get(&s).copied().unwrap_or(0);

    let text = format!(
        "Downloading: {}\nSeeding: {}\nPaused: {}\nVerifying: {}\n\n- Waiting to -\nDownload: {}\nSeed: {}\nVerify: {}\n\nTotal: {}",
        n(TorrentStatus::Downloading),
        n(TorrentStatus::Seeding),
        n(TorrentStatus::Stopped),
        n(TorrentStatus::Checking),
        n(TorrentStatus::DownloadPending),
        n(TorrentStatus::SeedPending),
        n(TorrentStatus::CheckPending),
        torrents.len(),
    );
    ctx.reply(chat, &text).await;
}

pub(super) async fn help(ctx: &AppContext, chat: ChatId) {
    ctx.reply_html(chat, HELP).await;
}

pub(super) async fn version(ctx: &AppContext, chat: ChatId) {
    match ctx.manager.version().await {
        Ok(v) => {
            let html = format!(
                "Transmission <b>{}</b>\nTransmission-telegram <b>v{}</b>",
                escape_html(&v),
                env!("CARGO_PKG_VERSION")
            );
            ctx.reply_html(chat, &html).await;
        }
        Err(e) => {
            ctx.reply(chat, &format!("version: {e}")).await;
        }
    }
}
