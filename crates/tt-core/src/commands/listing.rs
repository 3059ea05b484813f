//! Plain one-shot listings.

use crate::{
    commands::{count_arg, fetch_torrents, Command},
    domain::ChatId,
    formatting::{
        clamp_count, escape_html, render, select, Filter, Template, CHECKING, DOWNLOADING,
        PAUSED, SEEDING,
    },
    router::AppContext,
    sorting::{SortField, SortOrder},
};

pub(super) async fn list(ctx: &AppContext, chat: ChatId, args: &[String]) {
    let query = args.first();
    let filter = match query.map(|q| Filter::tracker(q)) {
        None => Filter::All,
        Some(Ok(filter)) => filter,
        Some(Err(e)) => {
            ctx.reply(chat, &format!("list: {e}")).await;
            return;
        }
    };

    let Some(torrents) = fetch_torrents(ctx, chat, Command::List).await else {
        return;
    };
    let items = select(torrents, &filter, ctx.sort.current());

    if items.is_empty() {
        match query {
            Some(q) => {
                let html = format!("<b>list:</b> No tracker matches: <b>{}</b>", escape_html(q));
                ctx.reply_html(chat, &html).await;
            }
            None => {
                ctx.reply(chat, "list: no torrents").await;
            }
        }
        return;
    }

    ctx.reply(chat, &render(&items, Template::Brief))
        .await;
}

/// downs, seeding, paused, checking, errors.
pub(super) async fn by_status(ctx: &AppContext, chat: ChatId, cmd: Command) {
    let (filter, template, empty) = match cmd {
        Command::Downs => (Filter::Status(DOWNLOADING), Template::Brief, "No downloads"),
        Command::Seeding => (Filter::Status(SEEDING), Template::Brief, "No torrents seeding"),
        Command::Paused => (Filter::Status(PAUSED), Template::Paused, "No paused torrents"),
        Command::Checking => (
            Filter::Status(CHECKING),
            Template::Checking,
            "No torrents verifying",
        ),
        _ => (Filter::Errored, Template::Errors, "No errors"),
    };

    let Some(torrents) = fetch_torrents(ctx, chat, cmd).await else {
        return;
    };
    let items = select(torrents, &filter, ctx.sort.current());
    if items.is_empty() {
        ctx.reply(chat, empty).await;
        return;
    }
    ctx.reply(chat, &render(&items, template)).await;
}

pub(super) async fn search(ctx: &AppContext, chat: ChatId, args: &[String]) {
    if args.is_empty() {
        ctx.reply(chat, "search: needs an argument").await;
        return;
    }

    let filter = match Filter::name(&args.join(" ")) {
        Ok(filter) => filter,
        Err(e) => {
            ctx.reply(chat, &format!("search: {e}")).await;
            return;
        }
    };

    let Some(torrents) = fetch_torrents(ctx, chat, Command::Search).await else {
        return;
    };
    let items = select(torrents, &filter, ctx.sort.current());
    if items.is_empty() {
        ctx.reply(chat, "No matches!").await;
        return;
    }
    ctx.reply(chat, &render(&items, Template::Brief))
        .await;
}

/// Newest first, regardless of the shared sort order.
pub(super) async fn latest(ctx: &AppContext, chat: ChatId, args: &[String]) {
    let Some(n) = count_arg(args) else {
        ctx.reply(chat, "latest: argument must be a number").await;
        return;
    };

    let Some(torrents) = fetch_torrents(ctx, chat, Command::Latest).await else {
        return;
    };
    let mut items = select(torrents, &Filter::All, SortOrder::new(SortField::Age, true));
    items.truncate(clamp_count(n, items.len()));

    if items.is_empty() {
        ctx.reply(chat, "latest: No torrents").await;
        return;
    }
    ctx.reply(chat, &render(&items, Template::Brief))
        .await;
}
