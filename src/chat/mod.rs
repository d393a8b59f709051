use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::chat::model::{
    ChannelResp, CreateMessage, EditMessage, MessageResp, RoleResp, CHANNEL_TYPE_GUILD_ANNOUNCEMENT,
    CHANNEL_TYPE_GUILD_TEXT,
};
use crate::config::Config;
use crate::format::OutboundMessage;
use crate::model::{ChannelKind, MessageId, Role};

pub mod model;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid chat API URL: {0}")]
    InvalidUrl(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("chat API returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid chat API response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Chat operations used by the relay.
#[async_trait]
pub trait Chat: Send + Sync {
    /// `None` when the channel exists but cannot carry notices.
    async fn channel_kind(&self, channel_id: &str) -> Result<Option<ChannelKind>, ChatError>;

    async fn guild_roles(&self, guild_id: &str) -> Result<Vec<Role>, ChatError>;

    async fn send_message(
        &self,
        channel_id: &str,
        message: &OutboundMessage,
    ) -> Result<MessageId, ChatError>;

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        message: &OutboundMessage,
    ) -> Result<(), ChatError>;

    /// Short text replying to an earlier message; succeeds even if it is gone.
    async fn send_reply(
        &self,
        channel_id: &str,
        reply_to: &str,
        text: &str,
    ) -> Result<MessageId, ChatError>;

    async fn send_text(&self, channel_id: &str, text: &str) -> Result<MessageId, ChatError>;

    /// Publish a message from an announcement channel to its followers.
    async fn republish(&self, channel_id: &str, message_id: &str) -> Result<(), ChatError>;
}

#[derive(Clone)]
pub struct DiscordClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl fmt::Debug for DiscordClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl DiscordClient {
    pub fn new(api_base: &str, token: String, timeout: Duration) -> Result<Self, ChatError> {
        let mut raw = api_base.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url = Url::parse(&raw).map_err(|e| ChatError::InvalidUrl(format!("{raw}: {e}")))?;
        let http = Client::builder()
            .user_agent(concat!("DiscordBot (librus-relay, ", env!("CARGO_PKG_VERSION"), ")"))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, ChatError> {
        Self::new(
            &cfg.discord.api_base,
            cfg.discord.bot_token.clone(),
            cfg.app.http_timeout(),
        )
    }

    pub fn build_request<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Request, ChatError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ChatError::InvalidUrl(format!("{path}: {e}")))?;
        let mut builder = self
            .http
            .request(method, url)
            .header("Authorization", format!("Bot {}", self.token));
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Ok(builder.build()?)
    }

    async fn execute(&self, request: reqwest::Request) -> Result<String, ChatError> {
        debug!(method = %request.method(), url = %request.url(), "discord request");
        let res = self.http.execute(request).await?;
        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = res
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<f64>().ok())
                .map(|secs| secs.ceil() as u64)
                .unwrap_or(5);
            warn!(retry_after_secs, "rate limited by Discord");
            return Err(ChatError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(%status, %body, "Discord request failed");
            return Err(ChatError::Status { status, body });
        }
        Ok(res.text().await?)
    }

    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ChatError> {
        let request = self.build_request(method, path, body)?;
        let text = self.execute(request).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn post_message(&self, channel_id: &str, body: &CreateMessage) -> Result<MessageId, ChatError> {
        let resp: MessageResp = self
            .call(Method::POST, &format!("channels/{channel_id}/messages"), Some(body))
            .await?;
        Ok(resp.id)
    }
}

pub fn channel_kind_from_type(typ: u8) -> Option<ChannelKind> {
    match typ {
        CHANNEL_TYPE_GUILD_TEXT => Some(ChannelKind::Text),
        CHANNEL_TYPE_GUILD_ANNOUNCEMENT => Some(ChannelKind::Announcement),
        _ => None,
    }
}

#[async_trait]
impl Chat for DiscordClient {
    #[instrument(skip(self))]
    async fn channel_kind(&self, channel_id: &str) -> Result<Option<ChannelKind>, ChatError> {
        let resp: ChannelResp = self
            .call::<(), _>(Method::GET, &format!("channels/{channel_id}"), None)
            .await?;
        Ok(channel_kind_from_type(resp.typ))
    }

    #[instrument(skip(self))]
    async fn guild_roles(&self, guild_id: &str) -> Result<Vec<Role>, ChatError> {
        let roles: Vec<RoleResp> = self
            .call::<(), _>(Method::GET, &format!("guilds/{guild_id}/roles"), None)
            .await?;
        Ok(roles
            .into_iter()
            .map(|r| Role {
                id: r.id,
                name: r.name,
            })
            .collect())
    }

    #[instrument(skip(self, message))]
    async fn send_message(
        &self,
        channel_id: &str,
        message: &OutboundMessage,
    ) -> Result<MessageId, ChatError> {
        self.post_message(channel_id, &CreateMessage::rich(message))
            .await
    }

    #[instrument(skip(self, message))]
    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        message: &OutboundMessage,
    ) -> Result<(), ChatError> {
        let _: MessageResp = self
            .call(
                Method::PATCH,
                &format!("channels/{channel_id}/messages/{message_id}"),
                Some(&EditMessage::from(message)),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn send_reply(
        &self,
        channel_id: &str,
        reply_to: &str,
        text: &str,
    ) -> Result<MessageId, ChatError> {
        self.post_message(channel_id, &CreateMessage::reply(reply_to, text))
            .await
    }

    #[instrument(skip(self, text))]
    async fn send_text(&self, channel_id: &str, text: &str) -> Result<MessageId, ChatError> {
        self.post_message(channel_id, &CreateMessage::text(text)).await
    }

    #[instrument(skip(self))]
    async fn republish(&self, channel_id: &str, message_id: &str) -> Result<(), ChatError> {
        let request = self.build_request::<()>(
            Method::POST,
            &format!("channels/{channel_id}/messages/{message_id}/crosspost"),
            None,
        )?;
        self.execute(request).await?;
        Ok(())
    }
}
