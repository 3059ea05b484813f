//! Command table and handlers.

use std::{collections::HashMap, sync::OnceLock};

use crate::{domain::ChatId, manager::types::Torrent, router::AppContext};

mod control;
mod listing;
mod realtime;
mod summary;

pub use control::receive_file;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    List,
    Head,
    Tail,
    Downs,
    Seeding,
    Paused,
    Checking,
    Active,
    Errors,
    Sort,
    Trackers,
    Add,
    Search,
    Latest,
    Info,
    Stop,
    Start,
    Check,
    Del,
    DelData,
    Stats,
    Speed,
    Count,
    Help,
    Version,
}

impl Command {
    pub const ALL: [Command; 25] = [
        Command::List,
        Command::Head,
        Command::Tail,
        Command::Downs,
        Command::Seeding,
        Command::Paused,
        Command::Checking,
        Command::Active,
        Command::Errors,
        Command::Sort,
        Command::Trackers,
        Command::Add,
        Command::Search,
        Command::Latest,
        Command::Info,
        Command::Stop,
        Command::Start,
        Command::Check,
        Command::Del,
        Command::DelData,
        Command::Stats,
        Command::Speed,
        Command::Count,
        Command::Help,
        Command::Version,
    ];

    /// Long spelling; also the prefix of the command's error replies.
    pub fn name(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Head => "head",
            Self::Tail => "tail",
            Self::Downs => "downs",
            Self::Seeding => "seeding",
            Self::Paused => "paused",
            Self::Checking => "checking",
            Self::Active => "active",
            Self::Errors => "errors",
            Self::Sort => "sort",
            Self::Trackers => "trackers",
            Self::Add => "add",
            Self::Search => "search",
            Self::Latest => "latest",
            Self::Info => "info",
            Self::Stop => "stop",
            Self::Start => "start",
            Self::Check => "check",
            Self::Del => "del",
            Self::DelData => "deldata",
            Self::Stats => "stats",
            Self::Speed => "speed",
            Self::Count => "count",
            Self::Help => "help",
            Self::Version => "version",
        }
    }

    pub fn alias(self) -> Option<&'static str> {
        Some(match self {
            Self::List => "li",
            Self::Head => "he",
            Self::Tail => "ta",
            Self::Downs => "dl",
            Self::Seeding => "sd",
            Self::Paused => "pa",
            Self::Checking => "ch",
            Self::Active => "ac",
            Self::Errors => "er",
            Self::Sort => "so",
            Self::Trackers => "tr",
            Self::Add => "ad",
            Self::Search => "se",
            Self::Latest => "la",
            Self::Info => "in",
            Self::Stop => "sp",
            Self::Start => "st",
            Self::Check => "ck",
            Self::Stats => "sa",
            Self::Speed => "ss",
            Self::Count => "co",
            Self::Del | Self::DelData | Self::Help | Self::Version => return None,
        })
    }

    /// Look up a command token (`list`, `/li`, `/list@my_bot`, `LI`).
    pub fn resolve(token: &str) -> Option<Self> {
        let token = token.trim().to_lowercase();
        let token = match token.split_once('@') {
            Some((cmd, _bot)) => cmd,
            None => token.as_str(),
        };
        table().get(token).copied()
    }

    pub async fn execute(self, ctx: &AppContext, chat: ChatId, args: &[String]) {
        match self {
            Self::List => listing::list(ctx, chat, args).await,
            Self::Downs | Self::Seeding | Self::Paused | Self::Checking | Self::Errors => {
                listing::by_status(ctx, chat, self).await
            }
            Self::Search => listing::search(ctx, chat, args).await,
            Self::Latest => listing::latest(ctx, chat, args).await,
            Self::Head | Self::Tail => realtime::head_tail(ctx, chat, self, args).await,
            Self::Active => realtime::active(ctx, chat).await,
            Self::Info => realtime::info(ctx, chat, args).await,
            Self::Speed => realtime::speed(ctx, chat).await,
            Self::Sort => control::sort(ctx, chat, args).await,
            Self::Add => control::add(ctx, chat, args).await,
            Self::Stop | Self::Start | Self::Check => control::mutate(ctx, chat, self, args).await,
            Self::Del | Self::DelData => control::delete(ctx, chat, self, args).await,
            Self::Trackers => summary::trackers(ctx, chat).await,
            Self::Stats => summary::stats(ctx, chat).await,
            Self::Count => summary::count(ctx, chat).await,
            Self::Help => summary::help(ctx, chat).await,
            Self::Version => summary::version(ctx, chat).await,
        }
    }
}

/// Every accepted spelling: long and short, each with and without `/`.
fn table() -> &'static HashMap<String, Command> {
    static TABLE: OnceLock<HashMap<String, Command>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut map = HashMap::new();
        for cmd in Command::ALL {
            for spelling in std::iter::once(cmd.name()).chain(cmd.alias()) {
                map.insert(spelling.to_string(), cmd);
                map.insert(format!("/{spelling}"), cmd);
            }
        }
        map
    })
}

/// Items shown by `head`, `tail` and `latest` without an argument.
const DEFAULT_COUNT: i64 = 5;

/// Optional leading count argument; `None` when it is not a number.
fn count_arg(args: &[String]) -> Option<i64> {
    match args.first() {
        Some(raw) => raw.parse().ok(),
        None => Some(DEFAULT_COUNT),
    }
}

/// Fresh snapshot, or a `<command>: <error>` reply.
async fn fetch_torrents(ctx: &AppContext, chat: ChatId, cmd: Command) -> Option<Vec<Torrent>> {
    match ctx.manager.torrents().await {
        Ok(torrents) => Some(torrents),
        Err(e) => {
            ctx.reply(chat, &format!("{}: {e}", cmd.name())).await;
            None
        }
    }
}

/// Split message text into a command token and positional arguments.
pub fn tokenize(text: &str) -> Option<(String, Vec<String>)> {
    let mut parts = text.split_whitespace();
    let first = parts.next()?;
    Some((first.to_lowercase(), parts.map(str::to_string).collect()))
}
