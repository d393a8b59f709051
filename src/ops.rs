//! Operational side-channel: failures and skips go to the log and, when a
//! debug channel is configured, to that channel as plain text.

use tracing::{info, warn};

use crate::chat::Chat;
use crate::model::ChannelId;

#[derive(Debug, Clone, Default)]
pub struct OpsLog {
    channel: Option<ChannelId>,
}

impl OpsLog {
    pub fn new(channel: Option<ChannelId>) -> Self {
        Self {
            channel: channel.filter(|c| !c.trim().is_empty()),
        }
    }

    /// Log only.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    /// Note a skip or an informational event. Best effort: the outcome of
    /// mirroring is never returned.
    pub async fn report(&self, chat: &dyn Chat, text: &str) {
        info!(report = text, "ops");
        self.mirror(chat, text).await;
    }

    /// Like [`OpsLog::report`], for failures.
    pub async fn alert(&self, chat: &dyn Chat, text: &str) {
        warn!(alert = text, "ops");
        self.mirror(chat, text).await;
    }

    async fn mirror(&self, chat: &dyn Chat, text: &str) {
        let Some(channel) = self.channel.as_deref() else {
            return;
        };
        if let Err(err) = chat.send_text(channel, text).await {
            warn!(?err, channel, "failed to mirror report to debug channel");
        }
    }
}
