//! Telegram update handlers.
//!
//! Converts a teloxide `Message` into the messenger-agnostic `InboundMessage`
//! and hands it to the core router. Handlers never block the dispatcher: the
//! router spawns one task per command.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use tt_core::{
    domain::{Attachment, ChatId, InboundMessage, UserId},
    router::{dispatch, AppContext},
};

pub fn inbound(msg: &Message) -> InboundMessage {
    let user = msg.from();
    InboundMessage {
        chat_id: ChatId(msg.chat.id.0),
        user_id: user.map(|u| UserId(u.id.0 as i64)),
        username: user.and_then(|u| u.username.clone()),
        text: msg.text().unwrap_or_default().to_string(),
        attachment: msg.document().map(|doc| Attachment {
            file_id: doc.file.id.clone(),
            file_name: doc.file_name.clone(),
        }),
    }
}

pub async fn handle_message(msg: Message, ctx: Arc<AppContext>) -> ResponseResult<()> {
    // The spawned task is not awaited; its replies are its own business.
    let _ = dispatch(&ctx, inbound(&msg));
    Ok(())
}
