use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::model::{Absence, ChangeRecord, Notice, User};
use crate::portal::model::{PushChangesResp, SchoolNoticeResp, TeacherFreeDayResp, UserResp};

pub mod model;

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("invalid portal URL: {0}")]
    InvalidUrl(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },
    #[error("portal returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid portal response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl PortalError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PortalError::NotFound { .. })
    }
}

/// Read and acknowledge operations the relay needs from the school portal.
#[async_trait]
pub trait Portal: Send + Sync {
    /// Pending changes for the registered push device, oldest first.
    async fn fetch_changes(&self) -> Result<Vec<ChangeRecord>, PortalError>;

    /// Acknowledge consumed changes so they are not returned again.
    async fn delete_changes(&self, ids: &[String]) -> Result<(), PortalError>;

    async fn fetch_notice(&self, id: &str) -> Result<Notice, PortalError>;

    async fn fetch_user(&self, id: &str) -> Result<User, PortalError>;

    async fn fetch_absence(&self, id: &str) -> Result<Absence, PortalError>;
}

#[derive(Clone)]
pub struct LibrusClient {
    http: Client,
    base_url: Url,
    token: String,
    push_device: String,
}

impl fmt::Debug for LibrusClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibrusClient")
            .field("base_url", &self.base_url)
            .field("push_device", &self.push_device)
            .finish_non_exhaustive()
    }
}

impl LibrusClient {
    pub fn new(
        base_url: &str,
        token: String,
        push_device: String,
        timeout: Duration,
    ) -> Result<Self, PortalError> {
        let base_url = parse_base_url(base_url)?;
        let http = Client::builder()
            .user_agent(concat!("librus-relay/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url,
            token,
            push_device,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, PortalError> {
        Self::new(
            &cfg.portal.base_url,
            cfg.portal.access_token.clone(),
            cfg.portal.push_device.clone(),
            cfg.app.http_timeout(),
        )
    }

    fn endpoint(&self, path: &str) -> Result<Url, PortalError> {
        self.base_url
            .join(path)
            .map_err(|e| PortalError::InvalidUrl(format!("{path}: {e}")))
    }

    pub fn build_request(&self, method: Method, path: &str) -> Result<reqwest::Request, PortalError> {
        let mut url = self.endpoint(path)?;
        if path.starts_with("PushChanges") {
            url.query_pairs_mut()
                .append_pair("pushDevice", &self.push_device);
        }
        Ok(self
            .http
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .build()?)
    }

    async fn execute(
        &self,
        request: reqwest::Request,
        resource: &'static str,
        id: &str,
    ) -> Result<String, PortalError> {
        debug!(method = %request.method(), url = %request.url(), "portal request");
        let res = self.http.execute(request).await?;
        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PortalError::NotFound {
                resource,
                id: id.to_string(),
            });
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(%status, resource, id, "portal error response");
            return Err(PortalError::Status { status, body });
        }
        Ok(res.text().await?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        resource: &'static str,
        id: &str,
    ) -> Result<T, PortalError> {
        let request = self.build_request(Method::GET, path)?;
        let body = self.execute(request, resource, id).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl Portal for LibrusClient {
    #[instrument(skip_all)]
    async fn fetch_changes(&self) -> Result<Vec<ChangeRecord>, PortalError> {
        let resp: PushChangesResp = self.get_json("PushChanges", "PushChanges", "").await?;
        Ok(resp.changes.into_iter().map(ChangeRecord::from).collect())
    }

    #[instrument(skip_all, fields(count = ids.len()))]
    async fn delete_changes(&self, ids: &[String]) -> Result<(), PortalError> {
        let path = format!("PushChanges/{}", ids.join(","));
        let request = self.build_request(Method::DELETE, &path)?;
        self.execute(request, "PushChanges", &ids.join(",")).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_notice(&self, id: &str) -> Result<Notice, PortalError> {
        let resp: SchoolNoticeResp = self
            .get_json(&format!("SchoolNotices/{id}"), "SchoolNotice", id)
            .await?;
        Ok(resp.notice.into())
    }

    #[instrument(skip(self))]
    async fn fetch_user(&self, id: &str) -> Result<User, PortalError> {
        let resp: UserResp = self.get_json(&format!("Users/{id}"), "User", id).await?;
        Ok(resp.user.into())
    }

    #[instrument(skip(self))]
    async fn fetch_absence(&self, id: &str) -> Result<Absence, PortalError> {
        let resp: TeacherFreeDayResp = self
            .get_json(
                &format!("Calendars/TeacherFreeDays/{id}"),
                "TeacherFreeDay",
                id,
            )
            .await?;
        Ok(resp.free_day.into())
    }
}

/// `Url::join` drops the last path segment unless the base ends with a slash.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, PortalError> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).map_err(|e| PortalError::InvalidUrl(format!("{raw}: {e}")))
}
