use std::sync::Arc;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::{
        port::MessagingPort,
        types::{ChatAction, TextFormat},
    },
};

/// Outcome of one `send`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delivery {
    /// First chunk's message, if that send succeeded.
    pub anchor: Option<MessageRef>,
    pub chunks: usize,
}

impl Delivery {
    /// Anchor usable for in-place edits: only single-chunk deliveries qualify.
    pub fn editable_anchor(&self) -> Option<MessageRef> {
        if self.chunks == 1 {
            self.anchor
        } else {
            None
        }
    }
}

/// Split `text` into chunks of at most `limit` UTF-16 code units.
///
/// Each chunk ends right after the last newline that fits; a line longer than
/// `limit` is cut at the last character that fits. Concatenating the chunks
/// gives back `text`.
pub fn split_chunks(text: &str, limit: usize) -> Vec<&str> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let Some(cut) = utf16_cut(rest, limit) else {
            chunks.push(rest);
            break;
        };

        let end = match rest[..cut].rfind('\n') {
            Some(nl) => nl + 1,
            None => cut,
        };
        let (head, tail) = rest.split_at(end);
        chunks.push(head);
        rest = tail;
    }

    chunks
}

/// Byte offset just past the longest prefix of `s` within `limit` UTF-16
/// units, or `None` when all of `s` fits. Never returns 0 for non-empty `s`.
fn utf16_cut(s: &str, limit: usize) -> Option<usize> {
    let mut units = 0;
    for (idx, ch) in s.char_indices() {
        units += ch.len_utf16();
        if units > limit {
            return Some(if idx == 0 { ch.len_utf8() } else { idx });
        }
    }
    None
}

/// Sends and edits outbound text, enforcing the per-message ceiling.
///
/// Failures are logged and never retried.
#[derive(Clone)]
pub struct MessageDispatcher {
    messenger: Arc<dyn MessagingPort>,
    limit: usize,
    typing: bool,
}

impl MessageDispatcher {
    pub fn new(messenger: Arc<dyn MessagingPort>, limit: usize) -> Self {
        let caps = messenger.capabilities();
        Self {
            messenger,
            limit: limit.min(caps.max_message_len).max(1),
            typing: caps.supports_chat_actions,
        }
    }

    pub fn messenger(&self) -> &Arc<dyn MessagingPort> {
        &self.messenger
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn supports_edit(&self) -> bool {
        self.messenger.capabilities().supports_edit
    }

    pub async fn send(&self, chat_id: ChatId, text: &str, format: TextFormat) -> Delivery {
        let format = self.effective_format(format);

        if self.typing {
            if let Err(e) = self
                .messenger
                .send_chat_action(chat_id, ChatAction::Typing)
                .await
            {
                tracing::debug!(chat_id = chat_id.0, "typing indicator failed: {e}");
            }
        }

        let chunks = split_chunks(text, self.limit);
        let mut anchor = None;
        for (idx, chunk) in chunks.iter().enumerate() {
            match self.messenger.send_message(chat_id, chunk, format).await {
                Ok(msg) => {
                    if idx == 0 {
                        anchor = Some(msg);
                    }
                }
                Err(e) => {
                    tracing::error!(chat_id = chat_id.0, chunk = idx, "send failed: {e}");
                }
            }
        }

        Delivery {
            anchor,
            chunks: chunks.len(),
        }
    }

    /// Replace the text of an already-sent single-chunk message.
    pub async fn edit(&self, msg: MessageRef, text: &str, format: TextFormat) -> bool {
        let format = self.effective_format(format);
        match self.messenger.edit_message(msg, text, format).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    chat_id = msg.chat_id.0,
                    message_id = msg.message_id.0,
                    "edit failed: {e}"
                );
                false
            }
        }
    }

    fn effective_format(&self, format: TextFormat) -> TextFormat {
        if format == TextFormat::Html && !self.messenger.capabilities().supports_html {
            TextFormat::Plain
        } else {
            format
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeMessenger;

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_chunks("hello\nworld", 4096), vec!["hello\nworld"]);
        assert!(split_chunks("", 10).is_empty());
    }

    #[test]
    fn splits_on_last_newline_within_limit() {
        let text = "aaa\nbbb\nccc\n";
        assert_eq!(split_chunks(text, 8), vec!["aaa\nbbb\n", "ccc\n"]);
        assert_eq!(split_chunks(text, 7), vec!["aaa\n", "bbb\n", "ccc\n"]);
    }

    #[test]
    fn hard_splits_overlong_lines() {
        assert_eq!(split_chunks("abcdefg\nh", 3), vec!["abc", "def", "g\nh"]);
        assert_eq!(split_chunks("abcdefg\nhij", 3), vec!["abc", "def", "g\n", "hij"]);
    }

    #[test]
    fn counts_utf16_units_not_bytes() {
        let text = "↓↓↓\n↑↑↑";
        assert_eq!(split_chunks(text, 4), vec!["↓↓↓\n", "↑↑↑"]);
    }

    #[test]
    fn astral_characters_count_as_two_units() {
        // Four chars but five UTF-16 units.
        assert_eq!(split_chunks("😀\n😀😀", 4), vec!["😀\n", "😀😀"]);
        assert_eq!(split_chunks("😀😀😀", 3), vec!["😀", "😀", "😀"]);
        assert_eq!(split_chunks("😀a", 1), vec!["😀", "a"]);
    }

    #[test]
    fn chunking_properties_hold_over_many_inputs() {
        let lines: Vec<String> = (0..300)
            .map(|i| format!("<{i}> item ✓ {}", "x".repeat(i % 37)))
            .collect();
        let text = lines.join("\n");

        for limit in [50, 64, 97, 128, 500, 4096] {
            let chunks = split_chunks(&text, limit);
            assert_eq!(chunks.concat(), text, "limit {limit}");
            for (i, chunk) in chunks.iter().enumerate() {
                assert!(chunk.encode_utf16().count() <= limit, "limit {limit}");
                if i + 1 < chunks.len() {
                    assert!(chunk.ends_with('\n'), "limit {limit} chunk {i}");
                }
            }
        }
    }

    #[tokio::test]
    async fn sends_typing_then_chunks_and_anchors_first() {
        let api = Arc::new(FakeMessenger::new());
        let dispatcher = MessageDispatcher::new(api.clone(), 8);

        let delivery = dispatcher
            .send(ChatId(5), "aaa\nbbb\nccc\n", TextFormat::Plain)
            .await;

        assert_eq!(delivery.chunks, 2);
        assert_eq!(delivery.anchor, Some(api.message_ref(5, 1)));
        assert_eq!(delivery.editable_anchor(), None);
        assert_eq!(*api.actions.lock().unwrap(), vec![ChatId(5)]);
        assert_eq!(api.sent_texts(), vec!["aaa\nbbb\n", "ccc\n"]);
    }

    #[tokio::test]
    async fn no_typing_when_messenger_lacks_chat_actions() {
        let api = Arc::new(FakeMessenger::new());
        api.disable_chat_actions();
        let dispatcher = MessageDispatcher::new(api.clone(), 4096);

        let delivery = dispatcher.send(ChatId(5), "hi", TextFormat::Plain).await;

        assert_eq!(delivery.chunks, 1);
        assert!(api.actions.lock().unwrap().is_empty());
        assert_eq!(api.sent_texts(), vec!["hi"]);
    }

    #[tokio::test]
    async fn failures_are_swallowed_and_remaining_chunks_still_go_out() {
        let api = Arc::new(FakeMessenger::new());
        api.fail_actions(true);
        api.fail_send_number(1);
        let dispatcher = MessageDispatcher::new(api.clone(), 4);

        let delivery = dispatcher.send(ChatId(1), "aaa\nbbb\n", TextFormat::Plain).await;

        assert_eq!(delivery.chunks, 2);
        assert_eq!(delivery.anchor, None);
        assert_eq!(api.sent_texts(), vec!["bbb\n"]);
    }

    #[tokio::test]
    async fn edit_reports_success() {
        let api = Arc::new(FakeMessenger::new());
        let dispatcher = MessageDispatcher::new(api.clone(), 4096);
        let msg = api.message_ref(1, 9);

        assert!(dispatcher.edit(msg, "x", TextFormat::Html).await);
        api.fail_edits(true);
        assert!(!dispatcher.edit(msg, "y", TextFormat::Html).await);
        assert_eq!(api.edit_texts(), vec!["x"]);
    }

    #[test]
    fn limit_never_exceeds_messenger_capability() {
        let api = Arc::new(FakeMessenger::new());
        assert_eq!(MessageDispatcher::new(api.clone(), 100_000).limit(), 4096);
        assert_eq!(MessageDispatcher::new(api, 100).limit(), 100);
    }
}
