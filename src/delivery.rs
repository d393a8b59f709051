//! Per-channel delivery: new messages, edit-in-place for known notices, and
//! best-effort republishing on announcement channels.

use std::collections::HashMap;
use tracing::{info, instrument};

use crate::chat::{Chat, ChatError};
use crate::format::OutboundMessage;
use crate::matcher::InterestRule;
use crate::model::{ChannelId, ChannelKind, MessageId};
use crate::ops::OpsLog;

pub const EDIT_POINTER_TEXT: &str = "Zmieniono ogłoszenie ^";

/// Notice id → message that carries it. Entries are only added after a
/// successful send and are never removed.
#[derive(Debug, Clone, Default)]
pub struct DeliveryLedger {
    entries: HashMap<String, MessageId>,
}

impl DeliveryLedger {
    pub fn get(&self, notice_id: &str) -> Option<&MessageId> {
        self.entries.get(notice_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn record(&mut self, notice_id: &str, message_id: MessageId) {
        self.entries.insert(notice_id.to_string(), message_id);
    }
}

#[derive(Debug, Clone)]
pub struct RecipientChannel {
    pub channel_id: ChannelId,
    pub kind: ChannelKind,
    pub rules: Vec<InterestRule>,
    pub ledger: DeliveryLedger,
}

impl RecipientChannel {
    pub fn new(channel_id: impl Into<ChannelId>, kind: ChannelKind, rules: Vec<InterestRule>) -> Self {
        Self {
            channel_id: channel_id.into(),
            kind,
            rules,
            ledger: DeliveryLedger::default(),
        }
    }
}

/// How a notice reached a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivered {
    Sent(MessageId),
    Edited(MessageId),
}

impl Delivered {
    pub fn message_id(&self) -> &str {
        match self {
            Delivered::Sent(id) | Delivered::Edited(id) => id,
        }
    }
}

/// Deliver a school notice, editing the earlier message when this channel
/// already carries it.
#[instrument(skip_all, fields(channel = %channel.channel_id, notice_id = %notice_id))]
pub async fn deliver_notice(
    chat: &dyn Chat,
    ops: &OpsLog,
    channel: &mut RecipientChannel,
    notice_id: &str,
    created_at: &str,
    edited_at: &str,
    message: OutboundMessage,
) -> Result<Delivered, ChatError> {
    if let Some(existing) = channel.ledger.get(notice_id).cloned() {
        let message = message.with_edit_footer(created_at, edited_at);
        chat.edit_message(&channel.channel_id, &existing, &message)
            .await?;
        chat.send_reply(&channel.channel_id, &existing, EDIT_POINTER_TEXT)
            .await?;
        info!(message_id = %existing, "edited notice message");
        return Ok(Delivered::Edited(existing));
    }

    let message_id = send_and_publish(chat, ops, channel, &message).await?;
    channel.ledger.record(notice_id, message_id.clone());
    Ok(Delivered::Sent(message_id))
}

/// Always post a new message; used for teacher absences.
#[instrument(skip_all, fields(channel = %channel.channel_id))]
pub async fn deliver_new(
    chat: &dyn Chat,
    ops: &OpsLog,
    channel: &RecipientChannel,
    message: &OutboundMessage,
) -> Result<MessageId, ChatError> {
    send_and_publish(chat, ops, channel, message).await
}

async fn send_and_publish(
    chat: &dyn Chat,
    ops: &OpsLog,
    channel: &RecipientChannel,
    message: &OutboundMessage,
) -> Result<MessageId, ChatError> {
    let message_id = chat.send_message(&channel.channel_id, message).await?;
    info!(%message_id, "sent message");
    if channel.kind == ChannelKind::Announcement {
        if let Err(err) = chat.republish(&channel.channel_id, &message_id).await {
            ops.alert(chat, &format!("Error while crossposting: {err}"))
                .await;
        }
    }
    Ok(message_id)
}
