//! Integration tests for the assessment wizard against a mock service.

mod common;

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use common::Harness;
use wwc_core::persistence::FileStore;
use wwc_core::remote::{Endpoint, MockTransport};
use wwc_core::{
    AssessmentWizard, AttritionBoundary, GuardOutcome, Judgments, PaperId, ProgressStore,
    RatingBadge, RemoteError, Step, WwcRating,
};

async fn open(h: &Harness, paper_id: i64) -> AssessmentWizard {
    AssessmentWizard::open(
        PaperId(paper_id),
        None,
        h.client(),
        h.store.clone(),
        h.notifier.clone(),
    )
    .await
}

#[tokio::test]
async fn test_paper_without_progress_starts_fresh() {
    let h = Harness::new();
    let wizard = open(&h, 7).await;
    let view = wizard.view();

    assert_eq!(view.step, Step::Randomization);
    assert_eq!(view.judgments, Judgments::default());
    assert_eq!(view.judgments.attrition_boundary, AttritionBoundary::Cautious);
    assert_eq!(view.progress_percent, 20);
    assert!(view.assessment.is_none());
    assert!(view.badge.is_none());
    assert_eq!(h.mock.total_calls(), 0);
}

#[tokio::test]
async fn test_documented_randomization_rated_without_reservations() {
    let h = Harness::new();
    h.mock.respond(
        Endpoint::Assessment,
        MockTransport::success(json!({
            "paper_id": 7,
            "is_rct": true,
            "randomization_documented": true,
            "overall_attrition": 0.05,
            "differential_attrition": 0.02,
            "is_high_attrition": false,
            "final_rating": "Meets WWC Standards Without Reservations",
            "rating_justification": [
                "Low attrition (overall: 5.0%, differential: 2.0%) meets WWC standards."
            ]
        })),
    );

    let wizard = open(&h, 7).await;
    wizard.set_randomization_documented(Some(true));
    for _ in 0..4 {
        wizard.next().await;
    }

    assert_eq!(wizard.step(), Step::Review);
    assert_eq!(h.mock.calls(Endpoint::Assessment), 1);
    let view = wizard.view();
    let assessment = view.assessment.expect("assessment cached");
    assert_eq!(assessment.final_rating, WwcRating::MeetsWithoutReservations);
    assert_eq!(view.badge, Some(RatingBadge::Success));
    assert_eq!(view.justifications.len(), 1);
    assert!(h.notifier.alerts().is_empty());
}

#[tokio::test]
async fn test_progress_survives_reopen_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new();
    let store = ProgressStore::new(Arc::new(FileStore::new(dir.path())));

    let first = AssessmentWizard::open(
        PaperId(11),
        Some("Math tutoring RCT".into()),
        h.client(),
        store.clone(),
        h.notifier.clone(),
    )
    .await;
    first.set_attrition_boundary(AttritionBoundary::Optimistic);
    first.set_adjustment_valid(Some(true));
    first.go_to(Step::Baseline).await;
    drop(first);

    let reopened = AssessmentWizard::open(
        PaperId(11),
        None,
        h.client(),
        ProgressStore::new(Arc::new(FileStore::new(dir.path()))),
        h.notifier.clone(),
    )
    .await;
    assert_eq!(reopened.step(), Step::Baseline);
    assert_eq!(
        reopened.judgments().attrition_boundary,
        AttritionBoundary::Optimistic
    );
    assert_eq!(reopened.judgments().adjustment_strategy_valid, Some(true));
    assert_eq!(h.mock.total_calls(), 0);
}

#[tokio::test]
async fn test_concurrent_reruns_issue_one_call() {
    let h = Harness::slow(Duration::from_millis(40));
    h.mock.respond_always(
        Endpoint::Assessment,
        MockTransport::success(json!({
            "final_rating": "Meets WWC Standards With Reservations",
            "rating_justification": []
        })),
    );
    let wizard = open(&h, 3).await;

    let (a, b) = tokio::join!(wizard.run_assessment(), wizard.run_assessment());
    assert!(a.is_completed());
    assert!(b.is_rejected());
    assert_eq!(h.mock.calls(Endpoint::Assessment), 1);
    assert!(!wizard.is_busy());
    assert_eq!(wizard.view().badge, Some(RatingBadge::Warning));
}

#[tokio::test]
async fn test_busy_flag_visible_while_in_flight() {
    let h = Harness::slow(Duration::from_millis(40));
    h.mock.respond(
        Endpoint::Assessment,
        MockTransport::success(json!({"final_rating": "Does Not Meet WWC Standards"})),
    );
    let wizard = open(&h, 4).await;

    let observe = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        wizard.view().busy
    };
    let (outcome, busy_midway) = tokio::join!(wizard.run_assessment(), observe);
    assert!(outcome.is_completed());
    assert!(busy_midway);
    assert!(!wizard.view().busy);
    assert_eq!(wizard.view().badge, Some(RatingBadge::Danger));
}

#[tokio::test]
async fn test_service_error_alerts_once_and_wizard_continues() {
    let h = Harness::new();
    h.mock.respond(Endpoint::Assessment, MockTransport::error("Paper 5 not found"));
    h.mock.respond(
        Endpoint::Assessment,
        MockTransport::success(json!({"final_rating": "Does Not Meet WWC Standards"})),
    );
    let wizard = open(&h, 5).await;

    wizard.go_to(Step::Review).await;
    assert!(wizard.assessment().is_none());
    assert!(!wizard.surface_errors());
    let alerts = h.notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(
        alerts[0].1,
        RemoteError::Rejected {
            message: "Paper 5 not found".into()
        }
    );

    wizard.go_to(Step::Randomization).await;
    assert_eq!(wizard.step(), Step::Randomization);
    assert!(matches!(
        wizard.run_assessment().await,
        GuardOutcome::Completed(_)
    ));
    assert!(wizard.view().last_error.is_none());
    assert_eq!(h.notifier.alerts().len(), 1);
}

#[tokio::test]
async fn test_empty_success_is_reported_with_default_message() {
    let h = Harness::new();
    h.mock.respond(Endpoint::Assessment, json!({"status": "success"}));
    let wizard = open(&h, 8).await;

    let outcome = wizard.run_assessment().await;
    assert_eq!(
        outcome,
        GuardOutcome::Failed(RemoteError::EmptyResponse {
            message: "WWC assessment failed".into()
        })
    );
}
