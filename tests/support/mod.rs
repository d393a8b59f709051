#![allow(dead_code)]

use async_trait::async_trait;
use librus_relay::chat::{Chat, ChatError};
use librus_relay::format::OutboundMessage;
use librus_relay::model::{
    Absence, ChangeRecord, ChannelKind, MessageId, Notice, Operation, ResourceType, Role, User,
};
use librus_relay::portal::{Portal, PortalError};
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Shared, ordered record of what both fakes were asked to do.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn change(id: &str, resource_type: ResourceType, resource_id: &str, op: Operation) -> ChangeRecord {
    ChangeRecord {
        id: id.into(),
        resource_type,
        operation: op,
        resource_id: resource_id.into(),
        resource_url: None,
        added_at: Some("2024-03-01 09:00:00".into()),
        extra_text: None,
    }
}

pub fn notice(id: &str, subject: &str, body: &str) -> Notice {
    Notice {
        id: id.into(),
        subject: subject.into(),
        body: body.into(),
        author_id: "u1".into(),
        created_at: "2024-03-01 07:30:00".into(),
    }
}

pub fn absence(teacher_id: &str) -> Absence {
    Absence {
        teacher_id: teacher_id.into(),
        reason: None,
        note: Some("szkolenie".into()),
        date_from: "2024-03-04".into(),
        date_to: "2024-03-04".into(),
        time_from: None,
        time_to: None,
        created_at: "2024-03-01 10:00:00".into(),
    }
}

#[derive(Clone, Default)]
pub struct RecordingPortal {
    pub journal: Journal,
    batches: Arc<Mutex<VecDeque<Result<Vec<ChangeRecord>, PortalError>>>>,
    notices: Arc<Mutex<HashMap<String, Notice>>>,
    users: Arc<Mutex<HashMap<String, User>>>,
    absences: Arc<Mutex<HashMap<String, Absence>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    fail_delete: Arc<Mutex<bool>>,
    deleted: Arc<Mutex<Vec<Vec<String>>>>,
    fetched_at: Arc<Mutex<Vec<Instant>>>,
}

impl RecordingPortal {
    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal,
            ..Default::default()
        }
    }

    pub async fn push_batch(&self, batch: Vec<ChangeRecord>) {
        self.batches.lock().await.push_back(Ok(batch));
    }

    pub async fn push_fetch_error(&self) {
        self.batches.lock().await.push_back(Err(PortalError::Status {
            status: StatusCode::UNAUTHORIZED,
            body: "expired".into(),
        }));
    }

    pub async fn add_notice(&self, notice: Notice) {
        self.notices.lock().await.insert(notice.id.clone(), notice);
    }

    pub async fn add_user(&self, id: &str, first: &str, last: &str) {
        self.users.lock().await.insert(
            id.into(),
            User {
                first_name: first.into(),
                last_name: last.into(),
            },
        );
    }

    pub async fn add_absence(&self, id: &str, absence: Absence) {
        self.absences.lock().await.insert(id.into(), absence);
    }

    /// Fetches of this notice or absence id fail with a server error.
    pub async fn fail_resource(&self, id: &str) {
        self.failing.lock().await.insert(id.into());
    }

    pub async fn heal_resource(&self, id: &str) {
        self.failing.lock().await.remove(id);
    }

    pub async fn fail_delete(&self) {
        *self.fail_delete.lock().await = true;
    }

    pub async fn deleted(&self) -> Vec<Vec<String>> {
        self.deleted.lock().await.clone()
    }

    /// When each `fetch_changes` call happened, on tokio's clock.
    pub async fn fetched_at(&self) -> Vec<Instant> {
        self.fetched_at.lock().await.clone()
    }

    async fn check_failing(&self, id: &str) -> Result<(), PortalError> {
        if self.failing.lock().await.contains(id) {
            return Err(PortalError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "boom".into(),
            });
        }
        Ok(())
    }
}

fn not_found(resource: &'static str, id: &str) -> PortalError {
    PortalError::NotFound {
        resource,
        id: id.into(),
    }
}

#[async_trait]
impl Portal for RecordingPortal {
    async fn fetch_changes(&self) -> Result<Vec<ChangeRecord>, PortalError> {
        self.journal.lock().await.push("fetch".into());
        self.fetched_at.lock().await.push(Instant::now());
        self.batches
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn delete_changes(&self, ids: &[String]) -> Result<(), PortalError> {
        self.journal
            .lock()
            .await
            .push(format!("delete {}", ids.join(",")));
        if *self.fail_delete.lock().await {
            return Err(PortalError::Status {
                status: StatusCode::BAD_GATEWAY,
                body: "".into(),
            });
        }
        self.deleted.lock().await.push(ids.to_vec());
        Ok(())
    }

    async fn fetch_notice(&self, id: &str) -> Result<Notice, PortalError> {
        self.check_failing(id).await?;
        self.notices
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("SchoolNotice", id))
    }

    async fn fetch_user(&self, id: &str) -> Result<User, PortalError> {
        self.users
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("User", id))
    }

    async fn fetch_absence(&self, id: &str) -> Result<Absence, PortalError> {
        self.check_failing(id).await?;
        self.absences
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("TeacherFreeDay", id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCall {
    Send {
        channel: String,
        message_id: String,
        header: String,
        description: String,
        footer: String,
    },
    Edit {
        channel: String,
        message_id: String,
        header: String,
        footer: String,
    },
    Reply {
        channel: String,
        reply_to: String,
        text: String,
    },
    Text {
        channel: String,
        text: String,
    },
    Republish {
        channel: String,
        message_id: String,
    },
}

#[derive(Clone, Default)]
pub struct RecordingChat {
    pub journal: Journal,
    calls: Arc<Mutex<Vec<ChatCall>>>,
    next_id: Arc<Mutex<u64>>,
    kinds: Arc<Mutex<HashMap<String, Option<ChannelKind>>>>,
    roles: Arc<Mutex<HashMap<String, Vec<Role>>>>,
    fail_republish: Arc<Mutex<bool>>,
    failing_channels: Arc<Mutex<HashSet<String>>>,
}

impl RecordingChat {
    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal,
            ..Default::default()
        }
    }

    pub async fn set_kind(&self, channel: &str, kind: Option<ChannelKind>) {
        self.kinds.lock().await.insert(channel.into(), kind);
    }

    pub async fn set_roles(&self, guild: &str, roles: &[(&str, &str)]) {
        let roles = roles
            .iter()
            .map(|(id, name)| Role {
                id: (*id).into(),
                name: (*name).into(),
            })
            .collect();
        self.roles.lock().await.insert(guild.into(), roles);
    }

    pub async fn fail_republish(&self) {
        *self.fail_republish.lock().await = true;
    }

    /// Sends and edits to this channel fail.
    pub async fn fail_channel(&self, channel: &str) {
        self.failing_channels.lock().await.insert(channel.into());
    }

    pub async fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().await.clone()
    }

    pub async fn sends(&self) -> Vec<ChatCall> {
        self.calls()
            .await
            .into_iter()
            .filter(|c| matches!(c, ChatCall::Send { .. }))
            .collect()
    }

    pub async fn texts_to(&self, channel: &str) -> Vec<String> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                ChatCall::Text { channel: ch, text } if ch == channel => Some(text),
                _ => None,
            })
            .collect()
    }

    pub async fn republish_count(&self) -> usize {
        self.calls()
            .await
            .iter()
            .filter(|c| matches!(c, ChatCall::Republish { .. }))
            .count()
    }

    async fn new_id(&self) -> MessageId {
        let mut guard = self.next_id.lock().await;
        *guard += 1;
        format!("m{}", *guard)
    }

    async fn check_channel(&self, channel: &str) -> Result<(), ChatError> {
        if self.failing_channels.lock().await.contains(channel) {
            return Err(ChatError::Status {
                status: StatusCode::FORBIDDEN,
                body: "Missing Access".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Chat for RecordingChat {
    async fn channel_kind(&self, channel_id: &str) -> Result<Option<ChannelKind>, ChatError> {
        match self.kinds.lock().await.get(channel_id) {
            Some(kind) => Ok(*kind),
            None => Err(ChatError::Status {
                status: StatusCode::NOT_FOUND,
                body: "Unknown Channel".into(),
            }),
        }
    }

    async fn guild_roles(&self, guild_id: &str) -> Result<Vec<Role>, ChatError> {
        Ok(self
            .roles
            .lock()
            .await
            .get(guild_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_message(
        &self,
        channel_id: &str,
        message: &OutboundMessage,
    ) -> Result<MessageId, ChatError> {
        self.check_channel(channel_id).await?;
        let message_id = self.new_id().await;
        self.journal
            .lock()
            .await
            .push(format!("send {channel_id} {message_id}"));
        self.calls.lock().await.push(ChatCall::Send {
            channel: channel_id.into(),
            message_id: message_id.clone(),
            header: message.header.clone(),
            description: message.embed.description.clone(),
            footer: message.embed.footer.clone(),
        });
        Ok(message_id)
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        message: &OutboundMessage,
    ) -> Result<(), ChatError> {
        self.check_channel(channel_id).await?;
        self.journal
            .lock()
            .await
            .push(format!("edit {channel_id} {message_id}"));
        self.calls.lock().await.push(ChatCall::Edit {
            channel: channel_id.into(),
            message_id: message_id.into(),
            header: message.header.clone(),
            footer: message.embed.footer.clone(),
        });
        Ok(())
    }

    async fn send_reply(
        &self,
        channel_id: &str,
        reply_to: &str,
        text: &str,
    ) -> Result<MessageId, ChatError> {
        self.check_channel(channel_id).await?;
        self.calls.lock().await.push(ChatCall::Reply {
            channel: channel_id.into(),
            reply_to: reply_to.into(),
            text: text.into(),
        });
        Ok(self.new_id().await)
    }

    async fn send_text(&self, channel_id: &str, text: &str) -> Result<MessageId, ChatError> {
        self.calls.lock().await.push(ChatCall::Text {
            channel: channel_id.into(),
            text: text.into(),
        });
        Ok(self.new_id().await)
    }

    async fn republish(&self, channel_id: &str, message_id: &str) -> Result<(), ChatError> {
        self.calls.lock().await.push(ChatCall::Republish {
            channel: channel_id.into(),
            message_id: message_id.into(),
        });
        if *self.fail_republish.lock().await {
            return Err(ChatError::Status {
                status: StatusCode::BAD_REQUEST,
                body: "already crossposted".into(),
            });
        }
        Ok(())
    }
}
