//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

use wwc_core::alerts::RecordingNotifier;
use wwc_core::persistence::MemoryStore;
use wwc_core::remote::{Endpoint, MockTransport, ResearchClient};
use wwc_core::{PaperSelection, ProgressStore, SynthesisOptions, SynthesisOrchestrator};

pub fn meta_payload() -> Value {
    json!({
        "pooled_effect": 0.35,
        "ci_lower": 0.12,
        "ci_upper": 0.58,
        "p_value": 0.003,
        "tau_squared": 0.02,
        "i_squared": 41.2,
        "q_statistic": 6.8,
        "q_p_value": 0.08,
        "n_studies": 3,
        "studies": [
            {"paper_id": 1, "study_label": "Smith 2021", "effect_size": 0.4, "std_error": 0.1, "weight": 0.4, "ci_lower": 0.2, "ci_upper": 0.6},
            {"paper_id": 2, "study_label": "Lee 2020", "effect_size": 0.3, "std_error": 0.15, "weight": 0.3, "ci_lower": 0.0, "ci_upper": 0.6},
            {"paper_id": 3, "study_label": "Ortiz 2019", "effect_size": 0.35, "std_error": 0.12, "weight": 0.3, "ci_lower": 0.11, "ci_upper": 0.59}
        ],
        "heterogeneity_interpretation": "Moderate heterogeneity"
    })
}

pub fn conflicts_payload() -> Value {
    json!({
        "contradictions": [{
            "paper1_id": 1,
            "paper2_id": 2,
            "paper1_title": "Tutoring works",
            "paper2_title": "Tutoring null result",
            "finding1": "Tutoring improved reading scores.",
            "finding2": "Tutoring had no effect on reading scores.",
            "confidence": 0.91,
            "label": "contradiction"
        }],
        "n_papers": 3,
        "n_contradictions": 1
    })
}

pub fn subgroup_payload() -> Value {
    json!({
        "subgroups": {"elementary": meta_payload(), "secondary": meta_payload()},
        "overall": meta_payload(),
        "subgroup_variable": "age_group",
        "n_subgroups": 2,
        "subgroup_comparison": {"q_between": 1.2, "df": 1, "p_value": 0.27, "interpretation": "No significant difference"}
    })
}

pub fn bias_payload() -> Value {
    json!({
        "eggers_test": {
            "intercept": 0.8,
            "intercept_se": 0.6,
            "intercept_pvalue": 0.31,
            "interpretation": "No significant evidence of publication bias"
        },
        "n_studies": 3
    })
}

pub fn sensitivity_payload() -> Value {
    json!({
        "overall_effect": 0.35,
        "leave_one_out": [
            {"removed_study": "Smith 2021", "removed_paper_id": 1, "pooled_effect": 0.32, "ci_lower": 0.05, "ci_upper": 0.59, "difference_from_overall": -0.03}
        ],
        "influence_diagnostics": [
            {"study_label": "Smith 2021", "paper_id": 1, "influence_score": 0.03, "weight": 0.4, "effect_size": 0.4}
        ],
        "n_studies": 3
    })
}

pub fn payload_for(endpoint: Endpoint) -> Value {
    match endpoint {
        Endpoint::MetaAnalysis => meta_payload(),
        Endpoint::Conflicts => conflicts_payload(),
        Endpoint::Subgroups => subgroup_payload(),
        Endpoint::Bias => bias_payload(),
        Endpoint::Sensitivity => sensitivity_payload(),
        Endpoint::Assessment => json!({
            "final_rating": "Meets WWC Standards Without Reservations",
            "rating_justification": ["Randomization documented."]
        }),
    }
}

pub struct Harness {
    pub mock: Arc<MockTransport>,
    pub notifier: Arc<RecordingNotifier>,
    pub store: ProgressStore,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_mock(MockTransport::new())
    }

    pub fn slow(latency: Duration) -> Self {
        Self::with_mock(MockTransport::with_latency(latency))
    }

    fn with_mock(mock: MockTransport) -> Self {
        Self {
            mock: Arc::new(mock),
            notifier: Arc::new(RecordingNotifier::new()),
            store: ProgressStore::new(Arc::new(MemoryStore::new())),
        }
    }

    pub fn client(&self) -> ResearchClient {
        ResearchClient::new(self.mock.clone())
    }

    pub fn orchestrator(&self, ids: &[i64]) -> SynthesisOrchestrator {
        SynthesisOrchestrator::new(
            PaperSelection::new(ids.iter().copied()).unwrap(),
            SynthesisOptions::default(),
            self.client(),
            self.notifier.clone(),
        )
    }
}
