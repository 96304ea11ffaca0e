//! Given steps for task review BDD scenarios.

use super::world::{TaskReviewWorld, actor_named, run_async, upload};
use chrono::{Duration, Utc};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use siteflow::task::{
    domain::{PmRejectionTarget, Priority, ReviewAction, ReviewPolicy},
    services::{
        CreateTaskRequest, NewChecklistItem, ReviewService, ToggleChecklistItemRequest,
        TransitionRequest,
    },
};
use mockable::DefaultClock;
use std::sync::Arc;

#[given(r#"the PM rejection target is "{target}""#)]
fn rejection_target(world: &mut TaskReviewWorld, target: String) -> Result<(), eyre::Report> {
    let pm_rejection_target: PmRejectionTarget = target
        .parse()
        .map_err(|err| eyre::eyre!("invalid rejection target in scenario: {err}"))?;
    world.service = ReviewService::new(
        Arc::clone(&world.repository),
        Arc::clone(&world.photos),
        Arc::new(DefaultClock),
    )
    .with_policy(ReviewPolicy {
        pm_rejection_target,
    });
    Ok(())
}

#[given("a planned task with a photo-required checklist item")]
fn planned_task(world: &mut TaskReviewWorld) -> Result<(), eyre::Report> {
    let request = CreateTaskRequest::new(
        "Tile first floor shower",
        Priority::High,
        Utc::now() + Duration::days(3),
    )
    .with_checklist_item(NewChecklistItem::new("Set tiles to level").photo_required())
    .with_checklist_item(NewChecklistItem::new("Seal the shower tray"));
    let created = run_async(world.service.create_task(&actor_named("pm")?, request))
        .wrap_err("plan task for review scenario")?;
    world.task = Some(created);
    Ok(())
}

#[given("a second task waiting on the planned task")]
fn waiting_task(world: &mut TaskReviewWorld) -> Result<(), eyre::Report> {
    let request = CreateTaskRequest::new(
        "Fit shower screen",
        Priority::Medium,
        Utc::now() + Duration::days(5),
    )
    .with_predecessors([world.task_id()?]);
    let created = run_async(world.service.create_task(&actor_named("estimator")?, request))
        .wrap_err("plan waiting task")?;
    world.waiting_task = Some(created);
    Ok(())
}

#[given("the checklist item is completed without its photo")]
fn completed_without_photo(world: &mut TaskReviewWorld) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let worker = actor_named("worker")?;
    for position in 0..2 {
        let toggled = run_async(world.service.toggle_checklist_item(
            &worker,
            ToggleChecklistItemRequest::new(task_id, world.item_at(position)?, true),
        ))
        .wrap_err("complete checklist line")?;
        world.task = Some(toggled.task);
    }
    Ok(())
}

#[given("the checklist is complete with photos")]
fn complete_with_photos(world: &mut TaskReviewWorld) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let worker = actor_named("worker")?;
    run_async(world.service.attach_checklist_photo(
        &worker,
        task_id,
        world.item_at(0)?,
        upload(task_id),
    ))
    .wrap_err("attach checklist photo")?;
    run_async(world.service.toggle_checklist_item(
        &worker,
        ToggleChecklistItemRequest::new(task_id, world.item_at(1)?, true),
    ))
    .wrap_err("complete checklist line")?;
    let saved = run_async(world.service.set_final_photo(
        &actor_named("foreman")?,
        task_id,
        upload(task_id),
    ))
    .wrap_err("set final photo")?;
    world.task = Some(saved);
    Ok(())
}

fn review_step(
    world: &mut TaskReviewWorld,
    role: &str,
    action: ReviewAction,
) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let saved = run_async(
        world
            .service
            .request_transition(&actor_named(role)?, TransitionRequest::new(task_id, action)),
    )
    .wrap_err_with(|| format!("{role} {action} in scenario setup"))?;
    world.task = Some(saved);
    Ok(())
}

#[given("the {role} has submitted the task")]
fn has_submitted(world: &mut TaskReviewWorld, role: String) -> Result<(), eyre::Report> {
    review_step(world, &role, ReviewAction::Submit)
}

#[given("the {role} has approved the task")]
fn has_approved(world: &mut TaskReviewWorld, role: String) -> Result<(), eyre::Report> {
    review_step(world, &role, ReviewAction::Approve)
}
