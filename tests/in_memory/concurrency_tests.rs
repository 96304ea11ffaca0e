//! Competing reviewers racing on the same task.

use std::sync::Arc;

use super::helpers::{Site, TestService, member, site};
use rstest::rstest;
use siteflow::task::{
    domain::{ReviewAction, Role, Task, TaskId, TaskStatus},
    services::{ReviewError, ReviewErrorKind, TransitionRequest},
};
use tokio::task::JoinSet;

async fn race(
    service: &Arc<TestService>,
    task_id: TaskId,
    contenders: Vec<(Role, ReviewAction, Option<&'static str>)>,
) -> Result<Vec<Result<Task, ReviewError>>, eyre::Report> {
    let mut set = JoinSet::new();
    for (role, action, comment) in contenders {
        let shared = Arc::clone(service);
        set.spawn(async move {
            let request = TransitionRequest::new(task_id, action);
            let with_comment = match comment {
                Some(text) => request.with_comment(text),
                None => request,
            };
            let actor = member(role);
            shared.request_transition(&actor, with_comment).await
        });
    }
    let mut outcomes = Vec::new();
    while let Some(joined) = set.join_next().await {
        outcomes.push(joined?);
    }
    Ok(outcomes)
}

async fn under_foreman_review(site: &Site) -> Result<TaskId, eyre::Report> {
    let planned = site.plan_task("Tile kitchen splashback", &[]).await?;
    site.gather_evidence(planned.id()).await?;
    site.act(Role::Worker, planned.id(), ReviewAction::Submit, None)
        .await?;
    Ok(planned.id())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn approve_and_reject_race_has_one_winner(site: Site) -> Result<(), eyre::Report> {
    let task_id = under_foreman_review(&site).await?;

    let outcomes = race(
        &site.service,
        task_id,
        vec![
            (Role::Foreman, ReviewAction::Approve, None),
            (Role::Foreman, ReviewAction::Reject, Some("Wrong colour")),
        ],
    )
    .await?;

    let winners: Vec<&Task> = outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().ok())
        .collect();
    eyre::ensure!(winners.len() == 1, "expected one winner, got {}", winners.len());
    for outcome in &outcomes {
        if let Err(err) = outcome {
            eyre::ensure!(
                matches!(
                    err.kind(),
                    ReviewErrorKind::ConcurrentModification | ReviewErrorKind::UnauthorizedTransition
                ),
                "unexpected loser error: {err}"
            );
        }
    }

    let stored = site.service.get_task(&member(Role::Pm), task_id).await?;
    let winner = winners
        .first()
        .ok_or_else(|| eyre::eyre!("missing winner"))?;
    eyre::ensure!(stored.status() == winner.status());
    eyre::ensure!(stored.approvals().len() == 2);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_pm_approvals_complete_once(site: Site) -> Result<(), eyre::Report> {
    let task_id = under_foreman_review(&site).await?;
    site.act(Role::Foreman, task_id, ReviewAction::Approve, None)
        .await?;

    let outcomes = race(
        &site.service,
        task_id,
        vec![(Role::Pm, ReviewAction::Approve, None); 6],
    )
    .await?;

    let successes = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    eyre::ensure!(successes == 1, "expected one approval, got {successes}");
    let stored = site.service.get_task(&member(Role::Pm), task_id).await?;
    eyre::ensure!(stored.status() == TaskStatus::Completed);
    let completions = stored
        .approvals()
        .records()
        .iter()
        .filter(|record| record.to_status() == TaskStatus::Completed)
        .count();
    eyre::ensure!(completions == 1);
    Ok(())
}
