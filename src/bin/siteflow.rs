//! Operator entry point for the review core.
//!
//! Usage:
//!
//! ```text
//! siteflow <operation> [config-path]
//! ```
//!
//! The `operation` must be `check-config` or `walkthrough`. `check-config`
//! loads and validates the layered configuration and logs the effective
//! settings as JSON. `walkthrough` runs one complete review cycle, including
//! a PM rejection, against in-memory adapters under the configured policy
//! and logs every recorded decision.
//!
//! When `config-path` is given the file must exist; otherwise `siteflow.toml`
//! and `config/siteflow.toml` are tried and defaults apply when neither is
//! present.

use chrono::{Duration, Utc};
use mockable::DefaultClock;
use siteflow::config::{ConfigError, LoadOptions, SiteflowConfig};
use siteflow::task::adapters::memory::{InMemoryPhotoStore, InMemoryTaskRepository};
use siteflow::task::domain::{
    Actor, ChecklistItem, Priority, ReviewAction, Role, Task, TaskId, TaskStatus, UserId,
};
use siteflow::task::ports::PhotoUpload;
use siteflow::task::services::{
    CreateTaskRequest, NewChecklistItem, ReviewError, ReviewService, TransitionRequest,
};
use siteflow::telemetry::{TelemetryError, init_tracing};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Builder;
use tracing::info;

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

type WalkthroughService = ReviewService<InMemoryTaskRepository, InMemoryPhotoStore, DefaultClock>;

/// Errors that can occur while running an operation.
#[derive(Debug, Error)]
enum CliError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("failed to render configuration: {0}")]
    Render(#[source] serde_json::Error),
    #[error("runtime init failed: {0}")]
    RuntimeInit(#[source] std::io::Error),
    #[error("walkthrough failed: {0}")]
    Review(#[from] ReviewError),
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    CheckConfig,
    Walkthrough,
}

impl Operation {
    fn parse(arg: &str) -> Result<Self, CliError> {
        match arg {
            "check-config" => Ok(Self::CheckConfig),
            "walkthrough" => Ok(Self::Walkthrough),
            other => Err(CliError::InvalidArgs(format!(
                "unknown operation '{other}'; expected check-config or walkthrough"
            ))),
        }
    }
}

fn main() -> Result<(), BoxError> {
    run(std::env::args().skip(1)).map_err(Into::into)
}

fn run(mut args: impl Iterator<Item = String>) -> Result<(), CliError> {
    let operation = args
        .next()
        .ok_or_else(|| CliError::InvalidArgs("missing operation".into()))
        .and_then(|arg| Operation::parse(&arg))?;
    let config_path = args.next().map(PathBuf::from);
    if let Some(extra) = args.next() {
        return Err(CliError::InvalidArgs(format!(
            "unexpected argument '{extra}'"
        )));
    }

    let config = SiteflowConfig::load(LoadOptions {
        require_file: config_path.is_some(),
        config_path,
        ..LoadOptions::default()
    })?;
    init_tracing(&config.logging)?;

    match operation {
        Operation::CheckConfig => check_config(&config),
        Operation::Walkthrough => {
            let runtime = Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(CliError::RuntimeInit)?;
            runtime.block_on(walkthrough(&config))
        }
    }
}

fn check_config(config: &SiteflowConfig) -> Result<(), CliError> {
    let rendered = serde_json::to_string(config).map_err(CliError::Render)?;
    info!(
        event_name = "system.config.checked",
        config = %rendered,
        "configuration is valid"
    );
    Ok(())
}

fn placeholder_photo(task_id: TaskId) -> PhotoUpload {
    PhotoUpload::new(task_id, "walkthrough.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xD9])
}

async fn act(
    service: &WalkthroughService,
    actor: &Actor,
    task_id: TaskId,
    action: ReviewAction,
    comment: Option<&str>,
) -> Result<Task, ReviewError> {
    let request = TransitionRequest::new(task_id, action);
    let with_comment = match comment {
        Some(text) => request.with_comment(text),
        None => request,
    };
    service.request_transition(actor, with_comment).await
}

async fn walkthrough(config: &SiteflowConfig) -> Result<(), CliError> {
    let service: WalkthroughService = ReviewService::new(
        Arc::new(InMemoryTaskRepository::new()),
        Arc::new(InMemoryPhotoStore::new()),
        Arc::new(DefaultClock),
    )
    .with_policy(config.review);
    info!(
        event_name = "walkthrough.started",
        pm_rejection_target = ?service.table().policy().pm_rejection_target,
        "running review walkthrough"
    );
    let worker = Actor::new(UserId::new(), "Walkthrough Worker", Role::Worker);
    let foreman = Actor::new(UserId::new(), "Walkthrough Foreman", Role::Foreman);
    let pm = Actor::new(UserId::new(), "Walkthrough PM", Role::Pm);

    let task = service
        .create_task(
            &pm,
            CreateTaskRequest::new(
                "Tile show-home bathroom",
                Priority::Medium,
                Utc::now() + Duration::days(2),
            )
            .with_checklist_item(NewChecklistItem::new("Lay floor tiles").photo_required())
            .with_checklist_item(NewChecklistItem::new("Seal bath edge").photo_required()),
        )
        .await?;
    let task_id = task.id();
    for item_id in task.checklist().iter().map(ChecklistItem::id) {
        service
            .attach_checklist_photo(&worker, task_id, item_id, placeholder_photo(task_id))
            .await?;
    }
    service
        .set_final_photo(&foreman, task_id, placeholder_photo(task_id))
        .await?;

    let first_pass = [
        (&worker, ReviewAction::Submit, None),
        (&foreman, ReviewAction::Approve, Some("Checked on site")),
        (&pm, ReviewAction::Reject, Some("Fix grout lines")),
        (&foreman, ReviewAction::Submit, Some("Grout redone")),
    ];
    let mut current = task;
    for (actor, action, comment) in first_pass {
        current = act(&service, actor, task_id, action, comment).await?;
    }
    if current.status() == TaskStatus::UnderReviewForeman {
        act(&service, &foreman, task_id, ReviewAction::Approve, None).await?;
    }
    act(&service, &pm, task_id, ReviewAction::Approve, None).await?;

    for record in service.list_approval_history(&pm, task_id).await? {
        info!(
            event_name = "walkthrough.decision",
            decision = %record.decision(),
            by = record.user_full_name(),
            role = %record.role_at_time_of_approval(),
            from = %record.from_status(),
            to = %record.to_status(),
            comment = record.comment().unwrap_or_default(),
            "decision recorded"
        );
    }
    Ok(())
}
