//! Live-capable commands: head, tail, active, info, speed.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    commands::{count_arg, fetch_torrents, Command},
    domain::ChatId,
    errors::Error,
    formatting::{
        clamp_count, humanize_bytes, render, render_info, select, Filter, Rates, Template,
        FROZEN_RATE,
    },
    live::{LiveHandle, LiveView},
    manager::{
        port::TorrentManager,
        types::{SessionStats, Torrent},
    },
    messaging::types::TextFormat,
    router::AppContext,
    sorting::SortOrder,
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Window {
    Head(i64),
    Tail(i64),
    Active,
}

/// Rich listing of a window of the collection, re-queried every tick.
struct TorrentListView {
    manager: Arc<dyn TorrentManager>,
    order: SortOrder,
    window: Window,
}

impl TorrentListView {
    fn pick(&self, torrents: Vec<Torrent>) -> Vec<Torrent> {
        match self.window {
            Window::Active => select(torrents, &Filter::Active, self.order),
            Window::Head(n) => {
                let mut items = select(torrents, &Filter::All, self.order);
                items.truncate(clamp_count(n, items.len()));
                items
            }
            Window::Tail(n) => {
                let mut items = select(torrents, &Filter::All, self.order);
                let keep = clamp_count(n, items.len());
                items.split_off(items.len() - keep)
            }
        }
    }
}

#[async_trait]
impl LiveView for TorrentListView {
    type Snapshot = Vec<Torrent>;

    async fn fetch(&self) -> Result<Vec<Torrent>> {
        let items = self.pick(self.manager.torrents().await?);
        if items.is_empty() && self.window != Window::Active {
            // Keep the last non-empty rendering on screen.
            return Err(Error::External("no torrents".to_string()));
        }
        Ok(items)
    }

    fn render(&self, items: &Vec<Torrent>, rates: Rates) -> String {
        if items.is_empty() {
            return "No active torrents".to_string();
        }
        render(items, Template::Rich(rates))
    }
}

/// One torrent's detail view.
struct InfoView {
    manager: Arc<dyn TorrentManager>,
    id: i64,
}

#[async_trait]
impl LiveView for InfoView {
    type Snapshot = Torrent;

    async fn fetch(&self) -> Result<Torrent> {
        self.manager.torrent(self.id).await
    }

    fn render(&self, torrent: &Torrent, rates: Rates) -> String {
        render_info(torrent, rates)
    }
}

/// Aggregate transfer rates.
struct SpeedView {
    manager: Arc<dyn TorrentManager>,
}

#[async_trait]
impl LiveView for SpeedView {
    type Snapshot = SessionStats;

    async fn fetch(&self) -> Result<SessionStats> {
        self.manager.session_stats().await
    }

    fn render(&self, stats: &SessionStats, rates: Rates) -> String {
        match rates {
            Rates::Live => format!(
                "↓ {}  ↑ {}",
                humanize_bytes(stats.download_speed),
                humanize_bytes(stats.upload_speed)
            ),
            Rates::Frozen => format!("↓ {FROZEN_RATE}  ↑ {FROZEN_RATE}"),
        }
    }

    fn format(&self) -> TextFormat {
        TextFormat::Plain
    }
}

/// Send the first rendering and keep it live when it fit in one message.
async fn send_live<V: LiveView>(
    ctx: &AppContext,
    chat: ChatId,
    view: V,
    snapshot: V::Snapshot,
) -> Option<LiveHandle> {
    let text = view.render(&snapshot, Rates::Live);
    let delivery = ctx.dispatcher.send(chat, &text, view.format()).await;
    let anchor = delivery.editable_anchor()?;
    ctx.live.start(anchor, view, snapshot)
}

pub(super) async fn head_tail(ctx: &AppContext, chat: ChatId, cmd: Command, args: &[String]) {
    let name = cmd.name();
    let Some(n) = count_arg(args) else {
        ctx.reply(chat, &format!("{name}: argument must be a number"))
            .await;
        return;
    };

    let view = TorrentListView {
        manager: ctx.manager.clone(),
        order: ctx.sort.current(),
        window: if cmd == Command::Tail {
            Window::Tail(n)
        } else {
            Window::Head(n)
        },
    };
    let Some(torrents) = fetch_torrents(ctx, chat, cmd).await else {
        return;
    };
    let items = view.pick(torrents);
    if items.is_empty() {
        ctx.reply(chat, &format!("{name}: no torrents")).await;
        return;
    }

    if let Some(session) = send_live(ctx, chat, view, items).await {
        session.finished().await;
    }
}

pub(super) async fn active(ctx: &AppContext, chat: ChatId) {
    let view = TorrentListView {
        manager: ctx.manager.clone(),
        order: ctx.sort.current(),
        window: Window::Active,
    };
    let Some(torrents) = fetch_torrents(ctx, chat, Command::Active).await else {
        return;
    };
    let items = view.pick(torrents);
    if items.is_empty() {
        ctx.reply(chat, "No active torrents").await;
        return;
    }

    if let Some(session) = send_live(ctx, chat, view, items).await {
        session.finished().await;
    }
}

/// One live message per id; bad ids are reported and skipped.
pub(super) async fn info(ctx: &AppContext, chat: ChatId, args: &[String]) {
    if args.is_empty() {
        ctx.reply(chat, "info: needs a torrent ID number").await;
        return;
    }

    let mut sessions = Vec::new();
    for raw in args {
        let Ok(id) = raw.parse::<i64>() else {
            ctx.reply(chat, &format!("info: {raw} is not a number"))
                .await;
            continue;
        };

        let torrent = match ctx.manager.torrent(id).await {
            Ok(t) => t,
            Err(Error::TorrentNotFound(_)) => {
                ctx.reply(chat, &format!("info: can't find a torrent with id {id}"))
                    .await;
                continue;
            }
            Err(e) => {
                ctx.reply(chat, &format!("info: {e}")).await;
                continue;
            }
        };

        let view = InfoView {
            manager: ctx.manager.clone(),
            id,
        };
        sessions.extend(send_live(ctx, chat, view, torrent).await);
    }

    for session in sessions {
        session.finished().await;
    }
}

pub(super) async fn speed(ctx: &AppContext, chat: ChatId) {
    let stats = match ctx.manager.session_stats().await {
        Ok(stats) => stats,
        Err(e) => {
            ctx.reply(chat, &format!("speed: {e}")).await;
            return;
        }
    };

    let view = SpeedView {
        manager: ctx.manager.clone(),
    };
    if let Some(session) = send_live(ctx, chat, view, stats).await {
        session.finished().await;
    }
}
