use super::common::*;
use crate::contests::leaderboard::domain::EntrantId;
use crate::contests::leaderboard::{
    PageRequest, ProfileId, RankChange, RefreshEvent, ServiceError, SortDirection, SortKey,
    SortSpec, SubmissionStore, SubmissionStoreError,
};
use crate::contests::ContestId;

#[tokio::test]
async fn submission_returns_the_submission_profile_score() {
    let (service, _, _, _) = build_service();
    let submission = payload("alpha", "clip-1", sample(100_000, 6_000, 900, 300));

    let scored = service
        .submit_for_scoring(&contest_id(), submission)
        .await
        .expect("submission accepted");

    assert_eq!(scored.scores.profile, ProfileId::Submission);
    assert!((scored.scores.engagement_score - 87.0).abs() < 1e-9);
    assert!((scored.scores.virality_score - 100.0).abs() < 1e-9);
    assert_eq!(scored.scores.final_score, 91);
    assert_eq!(scored.item.metrics.views, 100_000);
}

#[tokio::test]
async fn duplicate_item_ids_conflict() {
    let (service, _, _, _) = build_service();
    let submission = payload("alpha", "clip-1", sample(1_000, 100, 10, 5));

    service
        .submit_for_scoring(&contest_id(), submission.clone())
        .await
        .expect("first submission accepted");

    match service.submit_for_scoring(&contest_id(), submission).await {
        Err(ServiceError::Store(SubmissionStoreError::Conflict)) => {}
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn negative_metrics_are_rejected_at_the_door() {
    let (service, store, _, _) = build_service();
    let submission = payload("alpha", "clip-1", sample(1_000, -5, 0, 0));

    match service.submit_for_scoring(&contest_id(), submission).await {
        Err(ServiceError::InvalidMetric(error)) => {
            assert_eq!(error.field, "likes");
            assert_eq!(error.value, -5);
        }
        other => panic!("expected invalid metric, got {other:?}"),
    }
    assert!(store.items(&contest_id()).expect("store readable").is_empty());
}

#[tokio::test]
async fn submissions_close_when_the_contest_ends() {
    let (service, _, _, directory) = build_service();
    directory.set_status(&contest_id(), crate::contests::ContestStatus::Ended);

    let submission = payload("alpha", "clip-1", sample(1_000, 100, 10, 5));
    match service.submit_for_scoring(&contest_id(), submission).await {
        Err(ServiceError::ContestClosed) => {}
        other => panic!("expected closed contest, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_contests_are_reported() {
    let (service, _, _, _) = build_service();

    let result = service
        .standings(
            &ContestId("nope".to_string()),
            PageRequest::default(),
            SortSpec::default(),
        )
        .await;

    match result {
        Err(ServiceError::UnknownContest) => {}
        other => panic!("expected unknown contest, got {other:?}"),
    }
}

#[tokio::test]
async fn first_standings_read_computes_a_snapshot() {
    let (service, _, _, _) = build_service();
    let high = payload("alpha", "clip-1", sample(100_000, 6_000, 900, 300));
    let low = payload("bravo", "clip-2", sample(1_000, 10, 2, 1));
    service
        .submit_for_scoring(&contest_id(), high)
        .await
        .expect("submission accepted");
    service
        .submit_for_scoring(&contest_id(), low)
        .await
        .expect("submission accepted");

    let page = service
        .standings(&contest_id(), PageRequest::default(), SortSpec::default())
        .await
        .expect("standings computed on demand");

    assert_eq!(page.total_entrants, 2);
    assert_eq!(page.entries[0].entrant.id.0, "alpha");
    assert_eq!(page.entries[0].rank, 1);
    assert_eq!(page.entries[1].rank, 2);
    assert_eq!(page.winners.len(), 2);
    assert!(page.refresh.last_success_at.is_some());
}

#[tokio::test]
async fn standings_support_derived_sort_views() {
    let (service, _, _, _) = build_service();
    let engaging = payload("alpha", "clip-1", sample(10_000, 5_000, 1_000, 500));
    let reaching = payload("bravo", "clip-2", sample(50_000, 100, 10, 5));
    service
        .submit_for_scoring(&contest_id(), engaging)
        .await
        .expect("submission accepted");
    service
        .submit_for_scoring(&contest_id(), reaching)
        .await
        .expect("submission accepted");

    let by_score = service
        .standings(&contest_id(), PageRequest::default(), SortSpec::default())
        .await
        .expect("default standings");
    assert_eq!(by_score.entries[0].entrant.id.0, "alpha");

    let by_views = service
        .standings(
            &contest_id(),
            PageRequest::default(),
            SortSpec::new(SortKey::RawViews, SortDirection::Descending),
        )
        .await
        .expect("derived standings");

    assert_eq!(by_views.sort.key, SortKey::RawViews);
    assert_eq!(by_views.entries[0].entrant.id.0, "bravo");
    assert_eq!(by_views.entries[0].rank, 1);
    assert_eq!(by_views.computed_at, by_score.computed_at);
}

#[tokio::test]
async fn empty_contests_read_as_valid_empty_pages() {
    let (service, _, _, _) = build_service();

    let page = service
        .standings(&contest_id(), PageRequest::default(), SortSpec::default())
        .await
        .expect("empty standings");

    assert_eq!(page.total_entrants, 0);
    assert!(page.entries.is_empty());
    assert!(page.winners.is_empty());
    assert!(page.refresh.last_success_at.is_some());
}

#[tokio::test]
async fn entrant_detail_reports_items_aggregate_and_standing() {
    let (service, _, _, _) = build_service();
    service
        .submit_for_scoring(&contest_id(), payload("alpha", "clip-1", sample(10_000, 500, 50, 10)))
        .await
        .expect("submission accepted");
    service
        .submit_for_scoring(&contest_id(), payload("alpha", "clip-2", sample(5_000, 250, 25, 5)))
        .await
        .expect("submission accepted");
    service
        .submit_for_scoring(&contest_id(), payload("bravo", "clip-3", sample(1_000, 10, 1, 0)))
        .await
        .expect("submission accepted");
    service
        .recompute_now(&contest_id())
        .await
        .expect("snapshot published");

    let detail = service
        .entrant_detail(&contest_id(), &EntrantId("alpha".to_string()))
        .await
        .expect("entrant detail");

    assert_eq!(detail.entrant.display_name, "Creator alpha");
    assert_eq!(detail.submissions.len(), 2);
    assert_eq!(detail.totals.views, 15_000);
    assert_eq!(detail.totals.likes, 750);
    assert_eq!(detail.scores.profile, ProfileId::Leaderboard);

    let standing = detail.standing.expect("ranked entrant");
    assert_eq!(standing.rank, 1);
    assert_eq!(standing.prize_tier, Some(1));
    assert_eq!(standing.change, RankChange::New);
}

#[tokio::test]
async fn unknown_entrants_are_reported() {
    let (service, _, _, _) = build_service();

    let result = service
        .entrant_detail(&contest_id(), &EntrantId("ghost".to_string()))
        .await;

    match result {
        Err(ServiceError::UnknownEntrant) => {}
        other => panic!("expected unknown entrant, got {other:?}"),
    }
}

#[tokio::test]
async fn recompute_now_publishes_without_scheduling() {
    let (service, _, _, _) = build_service();
    service
        .submit_for_scoring(&contest_id(), payload("alpha", "clip-1", sample(1_000, 100, 10, 5)))
        .await
        .expect("submission accepted");

    let first = service.recompute_now(&contest_id()).await.expect("cycle runs");
    assert_eq!(first.total_entrants(), 1);
    assert_eq!(first.entries[0].change, RankChange::New);

    let second = service.recompute_now(&contest_id()).await.expect("cycle runs");
    assert_eq!(second.entries[0].change, RankChange::Same);
    assert!(!service.is_refreshing(&contest_id()));
}

#[tokio::test]
async fn subscribe_streams_published_snapshots() {
    let (service, _, _, _) = build_service();
    let mut events = service.subscribe(&contest_id()).await.expect("subscribed");
    service
        .submit_for_scoring(&contest_id(), payload("alpha", "clip-1", sample(1_000, 100, 10, 5)))
        .await
        .expect("submission accepted");

    service.recompute_now(&contest_id()).await.expect("cycle runs");

    match events.recv().await {
        Some(RefreshEvent::Standings(snapshot)) => {
            assert_eq!(snapshot.contest_id, contest_id());
            assert_eq!(snapshot.total_entrants(), 1);
        }
        other => panic!("expected standings event, got {other:?}"),
    }
}

#[tokio::test]
async fn score_preview_records_nothing() {
    let (service, store, _, _) = build_service();

    let preview = service
        .score_preview(payload("alpha", "clip-1", sample(1_000, 100, 10, 5)))
        .expect("preview scores");

    assert_eq!(preview.scores.profile, ProfileId::Submission);
    assert!(store.items(&contest_id()).expect("store readable").is_empty());
}
