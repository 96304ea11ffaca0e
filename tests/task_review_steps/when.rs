//! When steps for task review BDD scenarios.

use super::world::{TaskReviewWorld, actor_named, run_async};
use rstest_bdd_macros::when;
use siteflow::task::{domain::ReviewAction, services::TransitionRequest};

fn request(
    world: &mut TaskReviewWorld,
    role: &str,
    action: ReviewAction,
    comment: Option<String>,
) -> Result<(), eyre::Report> {
    let actor = actor_named(role)?;
    let base = TransitionRequest::new(world.task_id()?, action);
    let transition = match comment {
        Some(text) => base.with_comment(text),
        None => base,
    };
    let result = run_async(world.service.request_transition(&actor, transition));
    world.record(result);
    Ok(())
}

#[when("the {role} submits")]
fn submits(world: &mut TaskReviewWorld, role: String) -> Result<(), eyre::Report> {
    request(world, &role, ReviewAction::Submit, None)
}

#[when("the {role} approves")]
fn approves(world: &mut TaskReviewWorld, role: String) -> Result<(), eyre::Report> {
    request(world, &role, ReviewAction::Approve, None)
}

#[when(r#"the {role} rejects with "{comment}""#)]
fn rejects_with(
    world: &mut TaskReviewWorld,
    role: String,
    comment: String,
) -> Result<(), eyre::Report> {
    request(world, &role, ReviewAction::Reject, Some(comment))
}

#[when("the {role} rejects without a comment")]
fn rejects_without_comment(world: &mut TaskReviewWorld, role: String) -> Result<(), eyre::Report> {
    request(world, &role, ReviewAction::Reject, None)
}

#[when("the scheduler releases tasks waiting on the planned task")]
fn scheduler_releases(world: &mut TaskReviewWorld) -> Result<(), eyre::Report> {
    let released = run_async(world.service.release_dependents(world.task_id()?))?;
    if let Some(waiting) = world.waiting_task.as_ref() {
        let waiting_id = waiting.id();
        world.waiting_task = released
            .into_iter()
            .find(|task| task.id() == waiting_id)
            .or_else(|| world.waiting_task.clone());
    }
    Ok(())
}
