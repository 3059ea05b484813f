//! Commands that change state: sort, add, stop/start/check, del/deldata.

use crate::{
    commands::Command,
    domain::{Attachment, ChatId},
    manager::types::{Selection, TorrentAction},
    router::AppContext,
    sorting::{SortField, SortOrder},
};

fn sort_usage() -> String {
    let fields: Vec<&str> = SortField::ALL.iter().map(|f| f.keyword()).collect();
    format!(
        "<b>sort</b> takes one of:\n(<b>{}</b>)\noptionally start with (<b>rev</b>) for reversed order\ne.g. \"<b>sort rev size</b>\" to get biggest torrents first.",
        fields.join(", ")
    )
}

pub(super) async fn sort(ctx: &AppContext, chat: ChatId, args: &[String]) {
    let (reversed, rest) = match args.split_first() {
        Some((first, rest)) if first.eq_ignore_ascii_case("rev") => (true, rest),
        _ => (false, args),
    };
    let Some(raw) = rest.first() else {
        ctx.reply_html(chat, &sort_usage()).await;
        return;
    };
    let Some(field) = SortField::parse(raw) else {
        ctx.reply(chat, "unknown sorting method").await;
        return;
    };

    ctx.sort.set(SortOrder::new(field, reversed));
    tracing::info!(field = field.keyword(), reversed, "sort order changed");

    let reply = if reversed {
        format!("sort: reversed {}", field.keyword())
    } else {
        format!("sort: {}", field.keyword())
    };
    ctx.reply(chat, &reply).await;
}

/// One reply per URL; a failing URL does not stop the rest.
pub(super) async fn add(ctx: &AppContext, chat: ChatId, urls: &[String]) {
    if urls.is_empty() {
        ctx.reply(chat, "add: needs at least one URL").await;
        return;
    }

    for url in urls {
        let reply = match ctx.manager.add_url(url).await {
            Err(e) => format!("add: {e}"),
            Ok(added) if added.name.is_empty() => format!("add: error adding {url}"),
            Ok(added) if added.duplicate => {
                format!("Already added: <{}> {}", added.id, added.name)
            }
            Ok(added) => format!("Added: <{}> {}", added.id, added.name),
        };
        ctx.reply(chat, &reply).await;
    }
}

/// Add an uploaded `.torrent` through the messenger's download URL.
pub async fn receive_file(ctx: &AppContext, chat: ChatId, attachment: &Attachment) {
    match ctx.dispatcher.messenger().file_url(&attachment.file_id).await {
        Ok(url) => add(ctx, chat, &[url]).await,
        Err(e) => {
            ctx.reply(chat, &format!("receiver: {e}")).await;
        }
    }
}

/// stop, start, check: `all` or a list of ids.
pub(super) async fn mutate(ctx: &AppContext, chat: ChatId, cmd: Command, args: &[String]) {
    let name = cmd.name();
    let (action, done_all, verb) = match cmd {
        Command::Stop => (TorrentAction::Stop, "Stopped all torrents", "stopping"),
        Command::Start => (TorrentAction::Start, "Started all torrents", "starting"),
        _ => (TorrentAction::Verify, "Verifying all torrents", "verifying"),
    };

    let Some(first) = args.first() else {
        ctx.reply(chat, &format!("{name}: needs an argument")).await;
        return;
    };

    if first == "all" {
        let reply = match ctx.manager.apply(action, Selection::All).await {
            Ok(_) => done_all.to_string(),
            Err(e) => {
                tracing::warn!("{name} all failed: {e}");
                format!("{name}: error occurred while {verb} some torrents")
            }
        };
        ctx.reply(chat, &reply).await;
        return;
    }

    for raw in args {
        let Ok(id) = raw.parse::<i64>() else {
            ctx.reply(chat, &format!("{name}: {raw} is not a number"))
                .await;
            continue;
        };

        let status = match ctx.manager.apply(action, Selection::One(id)).await {
            Ok(status) => status,
            Err(e) => {
                ctx.reply(chat, &format!("{name}: {e}")).await;
                continue;
            }
        };

        let reply = match ctx.manager.torrent(id).await {
            Ok(t) => format!("[{status}] {name}: {}", t.name),
            Err(_) => format!("[fail] {name}: No torrent with an ID of {id}"),
        };
        ctx.reply(chat, &reply).await;
    }
}

/// del, deldata.
pub(super) async fn delete(ctx: &AppContext, chat: ChatId, cmd: Command, args: &[String]) {
    let name = cmd.name();
    let with_data = cmd == Command::DelData;

    if args.is_empty() {
        ctx.reply(chat, &format!("{name}: needs an ID")).await;
        return;
    }

    for raw in args {
        let Ok(id) = raw.parse::<i64>() else {
            ctx.reply(chat, &format!("{name}: {raw} is not an ID")).await;
            continue;
        };

        let reply = match ctx.manager.remove(id, with_data).await {
            Ok(removed) if with_data => format!("Deleted with data: {removed}"),
            Ok(removed) => format!("Deleted: {removed}"),
            Err(e) => format!("{name}: {e}"),
        };
        ctx.reply(chat, &reply).await;
    }
}
