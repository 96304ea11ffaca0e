//! Then steps for task review BDD scenarios.

use super::world::{TaskReviewWorld, actor_named, run_async};
use rstest_bdd_macros::then;
use siteflow::task::domain::{Role, TaskStatus, TransitionTable};

fn parse_status(status: &str) -> Result<TaskStatus, eyre::Report> {
    TaskStatus::try_from(status).map_err(|err| eyre::eyre!("invalid status in scenario: {err}"))
}

#[then(r#"the task status is "{status}""#)]
fn task_status_is(world: &TaskReviewWorld, status: String) -> Result<(), eyre::Report> {
    let expected = parse_status(&status)?;
    let stored = run_async(
        world
            .service
            .get_task(&actor_named("pm")?, world.task_id()?),
    )?;

    eyre::ensure!(
        stored.status() == expected,
        "expected status {expected}, found {}",
        stored.status()
    );
    Ok(())
}

#[then(r#"the waiting task status is "{status}""#)]
fn waiting_task_status_is(world: &TaskReviewWorld, status: String) -> Result<(), eyre::Report> {
    let expected = parse_status(&status)?;
    let waiting = world
        .waiting_task
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing waiting task"))?;

    eyre::ensure!(
        waiting.status() == expected,
        "expected waiting task to be {expected}, found {}",
        waiting.status()
    );
    Ok(())
}

#[then(r#"the request fails with "{kind}""#)]
fn request_fails_with(world: &TaskReviewWorld, kind: String) -> Result<(), eyre::Report> {
    let result = world
        .last_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing request result"))?;

    match result {
        Err(err) if err.kind().as_str() == kind => Ok(()),
        Err(err) => Err(eyre::eyre!("expected {kind}, got {} ({err})", err.kind())),
        Ok(task) => Err(eyre::eyre!(
            "expected {kind}, but the task moved to {}",
            task.status()
        )),
    }
}

#[then(r#"the rejection reason is "{reason}""#)]
fn rejection_reason_is(world: &TaskReviewWorld, reason: String) -> Result<(), eyre::Report> {
    let task = world
        .task
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing planned task"))?;

    eyre::ensure!(
        task.rejection_reason() == Some(reason.as_str()),
        "unexpected rejection reason {:?}",
        task.rejection_reason()
    );
    eyre::ensure!(task.rejected_by_full_name().is_some());
    Ok(())
}

#[then("the approval history holds {count:u64} decisions")]
fn history_holds(world: &TaskReviewWorld, count: u64) -> Result<(), eyre::Report> {
    let history = run_async(
        world
            .service
            .list_approval_history(&actor_named("worker")?, world.task_id()?),
    )?;
    let expected = usize::try_from(count)?;

    eyre::ensure!(
        history.len() == expected,
        "expected {expected} decisions, found {}",
        history.len()
    );
    Ok(())
}

#[then(r#"the latest decision was made as "{role}""#)]
fn latest_decision_role(world: &TaskReviewWorld, role: String) -> Result<(), eyre::Report> {
    let expected = Role::try_from(role.as_str())
        .map_err(|err| eyre::eyre!("invalid role in scenario: {err}"))?;
    let history = run_async(
        world
            .service
            .list_approval_history(&actor_named("worker")?, world.task_id()?),
    )?;
    let latest = history
        .last()
        .ok_or_else(|| eyre::eyre!("approval history is empty"))?;

    eyre::ensure!(latest.role_at_time_of_approval() == expected);
    Ok(())
}

#[then("no role has any review action available")]
fn no_actions_available(world: &TaskReviewWorld) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    for role in ["worker", "foreman", "pm", "estimator", "super_admin"] {
        let actions = run_async(world.service.available_actions(&actor_named(role)?, task_id))?;
        eyre::ensure!(actions.is_empty(), "{role} still has {actions:?}");
    }
    eyre::ensure!(
        world
            .task
            .as_ref()
            .is_some_and(|task| TransitionTable::editors(task.status()).is_empty())
    );
    Ok(())
}
