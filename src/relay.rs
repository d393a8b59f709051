//! Polling loop: fetch a change batch, relay every change to every channel,
//! then acknowledge the whole batch upstream. Any failure leaves the batch
//! unacknowledged and schedules a retry after the backoff delay.

use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::chat::{Chat, ChatError};
use crate::classify::{classify, ChangeKind, Handling};
use crate::config::ChannelConfig;
use crate::delivery::{deliver_new, deliver_notice, RecipientChannel};
use crate::format::{render_absence, render_notice};
use crate::matcher::compile_rule;
use crate::model::ChangeRecord;
use crate::ops::OpsLog;
use crate::portal::{Portal, PortalError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub startup_delay: Duration,
    pub poll_interval: Duration,
    pub retry_delay: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            startup_delay: Duration::from_secs(2),
            poll_interval: Duration::from_secs(7 * 60),
            retry_delay: Duration::from_secs(2 * 60),
        }
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to fetch changes: {0}")]
    Fetch(#[source] PortalError),
    #[error("failed to resolve change {change_id}: {source}")]
    Resolve {
        change_id: String,
        #[source]
        source: PortalError,
    },
    #[error("failed to deliver change {change_id} to channel {channel_id}: {source}")]
    Deliver {
        change_id: String,
        channel_id: String,
        #[source]
        source: ChatError,
    },
    #[error("failed to delete {count} consumed changes: {source}")]
    Commit {
        count: usize,
        #[source]
        source: PortalError,
    },
}

/// Every recipient channel with its rules and ledger. One per process.
#[derive(Debug, Clone, Default)]
pub struct RelayState {
    pub channels: Vec<RecipientChannel>,
}

impl RelayState {
    pub fn new(channels: Vec<RecipientChannel>) -> Self {
        Self { channels }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Delivered,
    Skipped,
    Ignored,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub delivered: usize,
    pub skipped: usize,
    pub ignored: usize,
}

/// Delay before the next cycle: the poll interval after success, the retry
/// delay after any failure.
pub fn next_delay<T, E>(result: &Result<T, E>, timing: &Timing) -> Duration {
    match result {
        Ok(_) => timing.poll_interval,
        Err(_) => timing.retry_delay,
    }
}

/// Resolve configured channels and compile their interest rules.
///
/// Channels that cannot be looked up, or that cannot carry notices, are
/// reported and left out. Failing to list a guild's roles aborts startup.
#[instrument(skip_all, fields(configured = configs.len()))]
pub async fn register_channels(
    chat: &dyn Chat,
    ops: &OpsLog,
    configs: &[ChannelConfig],
) -> Result<RelayState, ChatError> {
    let mut channels = Vec::with_capacity(configs.len());
    for cfg in configs {
        let kind = match chat.channel_kind(&cfg.channel_id).await {
            Ok(Some(kind)) => kind,
            Ok(None) => {
                ops.alert(
                    chat,
                    &format!("{} is not a valid guild text/news channel!", cfg.channel_id),
                )
                .await;
                continue;
            }
            Err(err) => {
                ops.alert(
                    chat,
                    &format!("{} - channel lookup failed: {err}", cfg.channel_id),
                )
                .await;
                continue;
            }
        };

        let mut rules = Vec::new();
        if cfg.tag_roles {
            if let Some(guild_id) = cfg.guild_id.as_deref() {
                let mut roles = chat.guild_roles(guild_id).await?;
                roles.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
                rules.extend(roles.iter().filter_map(|r| compile_rule(&r.id, &r.name)));
            }
        }
        info!(
            channel = %cfg.channel_id,
            ?kind,
            rules = rules.len(),
            "registered channel"
        );
        channels.push(RecipientChannel::new(cfg.channel_id.clone(), kind, rules));
    }
    if channels.is_empty() {
        warn!("no usable channels registered; changes will be consumed without delivery");
    }
    Ok(RelayState::new(channels))
}

/// One Fetching → Dispatching → Committing pass.
#[instrument(skip_all)]
pub async fn run_cycle(
    portal: &dyn Portal,
    chat: &dyn Chat,
    ops: &OpsLog,
    state: &mut RelayState,
) -> Result<CycleReport, RelayError> {
    let batch = portal.fetch_changes().await.map_err(RelayError::Fetch)?;
    let mut report = CycleReport {
        fetched: batch.len(),
        ..Default::default()
    };

    let mut consumed = Vec::with_capacity(batch.len());
    for record in &batch {
        info!(
            id = %record.id,
            resource = record.resource_type.as_str(),
            resource_id = %record.resource_id,
            operation = ?record.operation,
            "dispatching change"
        );
        match dispatch_change(portal, chat, ops, state, record).await? {
            Dispatched::Delivered => report.delivered += 1,
            Dispatched::Skipped => report.skipped += 1,
            Dispatched::Ignored => report.ignored += 1,
        }
        consumed.push(record.id.clone());
    }

    if !consumed.is_empty() {
        portal
            .delete_changes(&consumed)
            .await
            .map_err(|source| RelayError::Commit {
                count: consumed.len(),
                source,
            })?;
    }
    Ok(report)
}

pub async fn dispatch_change(
    portal: &dyn Portal,
    chat: &dyn Chat,
    ops: &OpsLog,
    state: &mut RelayState,
    record: &ChangeRecord,
) -> Result<Dispatched, RelayError> {
    match classify(record) {
        Handling::EditSchoolNotice(kind) => {
            relay_notice(portal, chat, ops, state, record, kind).await?;
            Ok(Dispatched::Delivered)
        }
        Handling::DeleteSchoolNotice => {
            warn!(resource_id = %record.resource_id, "school notice deleted upstream; skipping");
            ops.report(chat, &format!("{} - Is deleted. Skipping.", record.resource_id))
                .await;
            Ok(Dispatched::Skipped)
        }
        Handling::EditTeacherAbsence(kind) => {
            if kind == ChangeKind::Edited {
                ops.report(
                    chat,
                    &format!("Zmieniono nieobecność nauczyciela {}", record.resource_id),
                )
                .await;
            }
            relay_absence(portal, chat, ops, state, record, Some(kind)).await
        }
        Handling::DeleteTeacherAbsence => {
            ops.report(
                chat,
                &format!("Usunięto nieobecność nauczyciela {}", record.resource_id),
            )
            .await;
            relay_absence(portal, chat, ops, state, record, None).await
        }
        Handling::Ignore(reason) => {
            info!(
                ?reason,
                url = record.resource_url.as_deref().unwrap_or(""),
                "skipping unhandled change"
            );
            Ok(Dispatched::Ignored)
        }
    }
}

fn resolve_err(record: &ChangeRecord) -> impl FnOnce(PortalError) -> RelayError + '_ {
    move |source| RelayError::Resolve {
        change_id: record.id.clone(),
        source,
    }
}

async fn relay_notice(
    portal: &dyn Portal,
    chat: &dyn Chat,
    ops: &OpsLog,
    state: &mut RelayState,
    record: &ChangeRecord,
    kind: ChangeKind,
) -> Result<(), RelayError> {
    let notice = portal
        .fetch_notice(&record.resource_id)
        .await
        .map_err(resolve_err(record))?;
    let author = portal
        .fetch_user(&notice.author_id)
        .await
        .map_err(resolve_err(record))?;
    let edited_at = record.added_at.clone().unwrap_or_else(now_stamp);

    for channel in state.channels.iter_mut() {
        let channel_id = channel.channel_id.clone();
        let message = render_notice(kind, &notice, &author, &channel.rules);
        deliver_notice(
            chat,
            ops,
            channel,
            &notice.id,
            &notice.created_at,
            &edited_at,
            message,
        )
        .await
        .map_err(|source| RelayError::Deliver {
            change_id: record.id.clone(),
            channel_id,
            source,
        })?;
    }
    info!(notice_id = %notice.id, "notice relayed");
    Ok(())
}

async fn relay_absence(
    portal: &dyn Portal,
    chat: &dyn Chat,
    ops: &OpsLog,
    state: &RelayState,
    record: &ChangeRecord,
    kind: Option<ChangeKind>,
) -> Result<Dispatched, RelayError> {
    let absence = match portal.fetch_absence(&record.resource_id).await {
        Ok(absence) => absence,
        Err(err) if kind.is_none() && err.is_not_found() => {
            ops.report(
                chat,
                &format!(
                    "{} - absence no longer available upstream. Skipping.",
                    record.resource_id
                ),
            )
            .await;
            return Ok(Dispatched::Skipped);
        }
        Err(err) => return Err(resolve_err(record)(err)),
    };
    let teacher = portal
        .fetch_user(&absence.teacher_id)
        .await
        .map_err(resolve_err(record))?;
    let message = render_absence(kind, &absence, &teacher, record.extra_text.as_deref());

    for channel in &state.channels {
        deliver_new(chat, ops, channel, &message)
            .await
            .map_err(|source| RelayError::Deliver {
                change_id: record.id.clone(),
                channel_id: channel.channel_id.clone(),
                source,
            })?;
    }
    info!(
        url = record.resource_url.as_deref().unwrap_or(""),
        "absence relayed"
    );
    Ok(Dispatched::Delivered)
}

fn now_stamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Run cycles forever: startup delay, then poll interval after each success
/// and retry delay after each failure.
pub async fn run(
    portal: &dyn Portal,
    chat: &dyn Chat,
    ops: &OpsLog,
    state: &mut RelayState,
    timing: &Timing,
) {
    tokio::time::sleep(timing.startup_delay).await;
    loop {
        let result = run_cycle(portal, chat, ops, state).await;
        let delay = next_delay(&result, timing);
        match &result {
            Ok(report) => info!(?report, next_in_secs = delay.as_secs(), "cycle done"),
            Err(err) => {
                error!(?err, "cycle failed");
                ops.alert(chat, &format!("Something in checking pushChanges failed: {err}"))
                    .await;
                error!(
                    retry_in_mins = delay.as_secs() / 60,
                    "retrying after backoff"
                );
            }
        }
        tokio::time::sleep(delay).await;
    }
}
