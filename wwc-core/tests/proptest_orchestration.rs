//! Property-based tests for wizard persistence and the analysis cache.

mod common;

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use common::{Harness, payload_for};
use wwc_core::persistence::MemoryStore;
use wwc_core::remote::{Endpoint, MockTransport};
use wwc_core::{
    AnalysisKind, AnalysisStatus, AssessmentWizard, AttritionBoundary, PaperId, ProgressStore,
    Step,
};

// --- Wizard progress round-trip ---

#[derive(Debug, Clone)]
enum WizardAction {
    Next,
    Previous,
    GoTo(Step),
    Randomization(Option<bool>),
    Boundary(AttritionBoundary),
    Adjustment(Option<bool>),
}

fn wizard_action() -> impl Strategy<Value = WizardAction> {
    let step = prop::sample::select(Step::ALL.to_vec());
    let tri = prop_oneof![Just(None), Just(Some(true)), Just(Some(false))];
    let boundary = prop_oneof![
        Just(AttritionBoundary::Cautious),
        Just(AttritionBoundary::Optimistic)
    ];
    prop_oneof![
        Just(WizardAction::Next),
        Just(WizardAction::Previous),
        step.prop_map(WizardAction::GoTo),
        tri.clone().prop_map(WizardAction::Randomization),
        boundary.prop_map(WizardAction::Boundary),
        tri.prop_map(WizardAction::Adjustment),
    ]
}

proptest! {
    #[test]
    fn progress_roundtrips_after_any_sequence(
        paper in 1i64..10_000,
        actions in prop::collection::vec(wizard_action(), 0..30),
    ) {
        let h = Harness::new();
        h.mock.respond_always(Endpoint::Assessment, MockTransport::success(payload_for(Endpoint::Assessment)));
        let backend = Arc::new(MemoryStore::new());

        let expected = tokio_test::block_on(async {
            let wizard = AssessmentWizard::open(
                PaperId(paper),
                None,
                h.client(),
                ProgressStore::new(backend.clone()),
                h.notifier.clone(),
            )
            .await;
            for action in &actions {
                match action {
                    WizardAction::Next => { wizard.next().await; }
                    WizardAction::Previous => { wizard.previous().await; }
                    WizardAction::GoTo(step) => { wizard.go_to(*step).await; }
                    WizardAction::Randomization(v) => wizard.set_randomization_documented(*v),
                    WizardAction::Boundary(b) => wizard.set_attrition_boundary(*b),
                    WizardAction::Adjustment(v) => wizard.set_adjustment_valid(*v),
                }
            }
            wizard.progress()
        });

        let reloaded = ProgressStore::new(backend).load(PaperId(paper));
        prop_assert_eq!(reloaded, Some(expected));
        prop_assert!(h.mock.calls(Endpoint::Assessment) <= 1);
    }
}

// --- Analysis cache invariant ---

#[derive(Debug, Clone)]
enum AnalysisAction {
    Run { kind: AnalysisKind, succeed: bool },
    Subgroup { variable: String, succeed: bool },
}

fn analysis_action() -> impl Strategy<Value = AnalysisAction> {
    prop_oneof![
        (
            prop::sample::select(vec![
                AnalysisKind::MetaAnalysis,
                AnalysisKind::Conflicts,
                AnalysisKind::Bias,
                AnalysisKind::Sensitivity,
            ]),
            any::<bool>()
        )
            .prop_map(|(kind, succeed)| AnalysisAction::Run { kind, succeed }),
        (
            prop_oneof![Just(String::new()), Just("  ".to_string()), Just("age_group".to_string())],
            any::<bool>()
        )
            .prop_map(|(variable, succeed)| AnalysisAction::Subgroup { variable, succeed }),
    ]
}

fn endpoint(kind: AnalysisKind) -> Endpoint {
    match kind {
        AnalysisKind::MetaAnalysis => Endpoint::MetaAnalysis,
        AnalysisKind::Conflicts => Endpoint::Conflicts,
        AnalysisKind::Subgroups => Endpoint::Subgroups,
        AnalysisKind::Bias => Endpoint::Bias,
        AnalysisKind::Sensitivity => Endpoint::Sensitivity,
    }
}

proptest! {
    #[test]
    fn cache_matches_model_over_random_actions(
        actions in prop::collection::vec(analysis_action(), 0..25),
    ) {
        let h = Harness::new();
        let orch = h.orchestrator(&[1, 2, 3]);
        let mut model: HashMap<AnalysisKind, AnalysisStatus> = AnalysisKind::ALL
            .iter()
            .map(|&k| (k, AnalysisStatus::NotRun))
            .collect();

        for action in &actions {
            let (kind, succeed, locally_valid) = match action {
                AnalysisAction::Run { kind, succeed } => (*kind, *succeed, true),
                AnalysisAction::Subgroup { variable, succeed } => {
                    (AnalysisKind::Subgroups, *succeed, !variable.trim().is_empty())
                }
            };
            let gate_open = kind
                .prerequisite()
                .is_none_or(|req| model[&req] == AnalysisStatus::Ready);
            let should_call = locally_valid && gate_open;

            if should_call {
                let body = if succeed {
                    MockTransport::success(payload_for(endpoint(kind)))
                } else {
                    MockTransport::error("analysis failed")
                };
                h.mock.respond(endpoint(kind), body);
            }

            let before = h.mock.calls(endpoint(kind));
            let result = tokio_test::block_on(async {
                match action {
                    AnalysisAction::Run { kind: AnalysisKind::MetaAnalysis, .. } => {
                        orch.run_meta_analysis().await.map(|o| o.is_completed())
                    }
                    AnalysisAction::Run { kind: AnalysisKind::Conflicts, .. } => {
                        orch.detect_conflicts(0.8).await.map(|o| o.is_completed())
                    }
                    AnalysisAction::Run { kind: AnalysisKind::Bias, .. } => {
                        orch.assess_bias().await.map(|o| o.is_completed())
                    }
                    AnalysisAction::Run { kind: AnalysisKind::Sensitivity, .. } => {
                        orch.run_sensitivity().await.map(|o| o.is_completed())
                    }
                    AnalysisAction::Run { kind: AnalysisKind::Subgroups, .. } => unreachable!(),
                    AnalysisAction::Subgroup { variable, .. } => {
                        orch.run_subgroup_analysis(variable).await.map(|o| o.is_completed())
                    }
                }
            });
            let issued = h.mock.calls(endpoint(kind)) - before;

            prop_assert_eq!(issued, usize::from(should_call));
            prop_assert_eq!(result.is_ok(), should_call);
            if should_call {
                prop_assert_eq!(result.unwrap(), succeed);
                model.insert(
                    kind,
                    if succeed { AnalysisStatus::Ready } else { AnalysisStatus::Unavailable },
                );
            }

            for k in AnalysisKind::ALL {
                prop_assert_eq!(orch.status(k), model[&k]);
                prop_assert_eq!(orch.attempted(k), model[&k] != AnalysisStatus::NotRun);
            }
            prop_assert!(!orch.any_busy());
        }
    }
}
