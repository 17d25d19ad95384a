//! Inbound chat message type shared by the router and handlers.

use serde::{Deserialize, Serialize};

/// Inbound message from a chat channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Unique message ID
    pub id: String,
    /// Channel the message was posted in
    pub channel_id: String,
    /// Sender identifier (user ID on the chat platform)
    pub sender_id: String,
    /// Message content, as received
    pub content: String,
    /// Timestamp (milliseconds since epoch)
    pub timestamp: i64,
}

impl InboundMessage {
    /// Create a new inbound message
    pub fn new(
        id: impl Into<String>,
        channel_id: impl Into<String>,
        sender_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            channel_id: channel_id.into(),
            sender_id: sender_id.into(),
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Content lowercased for trigger matching.
    pub fn normalized_content(&self) -> String {
        self.content.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_content_keeps_original() {
        let message = InboundMessage::new("msg-1", "chan-1", "user-1", "Big SALE");

        assert_eq!(message.channel_id, "chan-1");
        assert_eq!(message.normalized_content(), "big sale");
        assert_eq!(message.content, "Big SALE");
        assert!(message.timestamp > 0);
    }
}
