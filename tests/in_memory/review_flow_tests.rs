//! End-to-end review cycles against the in-memory adapters.

use super::helpers::{GROUTING, Site, TILING, item_id, jpeg, member, site};
use rstest::rstest;
use siteflow::task::{
    domain::{ApprovalDecision, ReviewAction, Role, TaskStatus},
    services::{ReviewErrorKind, ToggleChecklistItemRequest},
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rework_loops_end_in_completion(site: Site) -> Result<(), eyre::Report> {
    let planned = site.plan_task("Tile ground floor bathroom", &[]).await?;
    let task_id = planned.id();
    site.gather_evidence(task_id).await?;

    site.act(Role::Worker, task_id, ReviewAction::Submit, Some("Tiling done"))
        .await?;
    let foreman = member(Role::Foreman);
    site.service
        .set_checklist_remark(
            &foreman,
            task_id,
            item_id(&planned, GROUTING)?,
            Some("Haze left on tiles".to_owned()),
        )
        .await?;
    let rejected = site
        .act(Role::Foreman, task_id, ReviewAction::Reject, Some("Clean the haze"))
        .await?;
    eyre::ensure!(rejected.status() == TaskStatus::ReworkForeman);
    eyre::ensure!(rejected.rejection_reason() == Some("Clean the haze"));

    let resubmit_early = site
        .act(Role::Worker, task_id, ReviewAction::Submit, None)
        .await
        .map(|_| ())
        .map_err(|err| err.kind());
    eyre::ensure!(resubmit_early == Err(ReviewErrorKind::PreconditionNotMet));

    site.service
        .toggle_checklist_item(
            &member(Role::Worker),
            ToggleChecklistItemRequest::new(task_id, item_id(&planned, GROUTING)?, true),
        )
        .await?;
    site.act(Role::Worker, task_id, ReviewAction::Submit, None).await?;
    site.act(Role::Foreman, task_id, ReviewAction::Approve, Some("Clean now"))
        .await?;
    let pm_rejected = site
        .act(Role::Pm, task_id, ReviewAction::Reject, Some("Fix grout lines"))
        .await?;
    eyre::ensure!(pm_rejected.status() == TaskStatus::ReworkForeman);
    eyre::ensure!(pm_rejected.foreman_note().is_none());

    site.act(Role::Foreman, task_id, ReviewAction::Submit, None).await?;
    site.act(Role::Foreman, task_id, ReviewAction::Approve, None).await?;
    let completed = site.act(Role::Pm, task_id, ReviewAction::Approve, None).await?;

    eyre::ensure!(completed.status() == TaskStatus::Completed);
    eyre::ensure!(completed.rejection_reason().is_none());
    let decisions: Vec<ApprovalDecision> = site
        .service
        .list_approval_history(&member(Role::Pm), task_id)
        .await?
        .iter()
        .map(|record| record.decision())
        .collect();
    eyre::ensure!(
        decisions
            == [
                ApprovalDecision::Submitted,
                ApprovalDecision::Rejected,
                ApprovalDecision::Submitted,
                ApprovalDecision::Approved,
                ApprovalDecision::Rejected,
                ApprovalDecision::Submitted,
                ApprovalDecision::Approved,
                ApprovalDecision::Approved,
            ],
        "unexpected history {decisions:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn submission_snapshots_the_evidence(site: Site) -> Result<(), eyre::Report> {
    let planned = site.plan_task("Tile en-suite", &[]).await?;
    let task_id = planned.id();
    let evidenced = site.gather_evidence(task_id).await?;

    let submitted = site
        .act(Role::Foreman, task_id, ReviewAction::Submit, Some("Ready for the PM"))
        .await?;

    let submission = submitted
        .submission()
        .ok_or_else(|| eyre::eyre!("submission should be recorded"))?;
    let expected: Vec<_> = evidenced
        .checklist()
        .photos()
        .chain(evidenced.final_photo())
        .cloned()
        .collect();
    eyre::ensure!(submission.photos() == expected.as_slice());
    eyre::ensure!(submitted.foreman_note() == Some("Ready for the PM"));
    eyre::ensure!(site.photos.blob_count()? == 2);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn worker_follow_up_photo_unblocks_foreman_approval(
    site: Site,
) -> Result<(), eyre::Report> {
    let planned = site.plan_task("Tile utility room", &[]).await?;
    let task_id = planned.id();
    let worker = member(Role::Worker);
    for description in [TILING, GROUTING] {
        let toggled = site
            .service
            .toggle_checklist_item(
                &worker,
                ToggleChecklistItemRequest::new(task_id, item_id(&planned, description)?, true),
            )
            .await?;
        eyre::ensure!(toggled.needs_photo_follow_up == (description == TILING));
    }
    site.service
        .set_final_photo(&worker, task_id, jpeg(task_id))
        .await?;
    site.act(Role::Worker, task_id, ReviewAction::Submit, None).await?;

    let blocked = site
        .act(Role::Foreman, task_id, ReviewAction::Approve, None)
        .await
        .map(|_| ())
        .map_err(|err| err.status_code());
    eyre::ensure!(blocked == Err(422));

    site.service
        .attach_checklist_photo(
            &member(Role::Foreman),
            task_id,
            item_id(&planned, TILING)?,
            jpeg(task_id),
        )
        .await?;
    let approved = site
        .act(Role::Foreman, task_id, ReviewAction::Approve, None)
        .await?;
    eyre::ensure!(approved.status() == TaskStatus::UnderReviewPm);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completion_releases_locked_successors(site: Site) -> Result<(), eyre::Report> {
    let first = site.plan_task("Strip out old bathroom", &[]).await?;
    let second = site.plan_task("Tile new bathroom", &[first.id()]).await?;
    eyre::ensure!(second.status() == TaskStatus::Locked);

    let locked_edit = site
        .service
        .set_final_photo(&member(Role::Worker), second.id(), jpeg(second.id()))
        .await
        .map(|_| ())
        .map_err(|err| err.kind());
    eyre::ensure!(locked_edit == Err(ReviewErrorKind::UnauthorizedTransition));
    eyre::ensure!(site.photos.blob_count()? == 0);

    site.gather_evidence(first.id()).await?;
    site.act(Role::Worker, first.id(), ReviewAction::Submit, None)
        .await?;
    site.act(Role::Foreman, first.id(), ReviewAction::Approve, None)
        .await?;
    site.act(Role::Pm, first.id(), ReviewAction::Approve, None)
        .await?;
    let released = site.service.release_dependents(first.id()).await?;

    eyre::ensure!(released.len() == 1);
    let unlocked = site
        .service
        .get_task(&member(Role::Worker), second.id())
        .await?;
    eyre::ensure!(unlocked.status() == TaskStatus::Active);
    let actions = site
        .service
        .available_actions(&member(Role::Worker), second.id())
        .await?;
    eyre::ensure!(actions == [ReviewAction::Submit]);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn task_planned_after_completed_predecessor_is_active(
    site: Site,
) -> Result<(), eyre::Report> {
    let first = site.plan_task("Screed bathroom floor", &[]).await?;
    site.gather_evidence(first.id()).await?;
    site.act(Role::Foreman, first.id(), ReviewAction::Submit, None)
        .await?;
    site.act(Role::Foreman, first.id(), ReviewAction::Approve, None)
        .await?;
    let completed = site
        .act(Role::Pm, first.id(), ReviewAction::Approve, None)
        .await?;
    eyre::ensure!(completed.status() == TaskStatus::Completed);

    let second = site.plan_task("Tile bathroom floor", &[first.id()]).await?;

    eyre::ensure!(second.status() == TaskStatus::Active);
    let actions = site
        .service
        .available_actions(&member(Role::Worker), second.id())
        .await?;
    eyre::ensure!(actions == [ReviewAction::Submit]);
    Ok(())
}
