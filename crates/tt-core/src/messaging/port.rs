use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::{ChatAction, MessagingCapabilities, TextFormat},
    Result,
};

/// Cross-messenger port.
///
/// Implementations send exactly what they are given; splitting over-long text
/// is the dispatcher's job. Every call is one delivery attempt.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_message(&self, chat_id: ChatId, text: &str, format: TextFormat)
        -> Result<MessageRef>;

    async fn edit_message(&self, msg: MessageRef, text: &str, format: TextFormat) -> Result<()>;

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()>;

    /// Download URL for an attachment previously received from this messenger.
    async fn file_url(&self, file_id: &str) -> Result<String>;
}
