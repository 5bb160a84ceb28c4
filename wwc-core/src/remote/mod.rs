//! Client for the remote synthesis service.
//!
//! Every call goes through [`unwrap_envelope`], which turns the service's
//! `{status, data?, message?}` envelope into either the decoded payload or a
//! [`RemoteError`]. Transports only move JSON; they never interpret it.

pub mod http;
pub mod mock;
pub mod models;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::RemoteError;
use crate::types::{Judgments, PaperId};
use models::{
    AnalysisRequest, Assessment, AssessmentRequest, BiasResult, ConflictRequest, ConflictResult,
    MetaAnalysisResult, SensitivityResult, SubgroupRequest, SubgroupResult,
};

pub use http::HttpTransport;
pub use mock::MockTransport;

/// Remote operations exposed by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Assessment,
    MetaAnalysis,
    Conflicts,
    Subgroups,
    Bias,
    Sensitivity,
}

impl Endpoint {
    /// Path segment relative to the service base URL.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Assessment => "wwc-assessment",
            Endpoint::MetaAnalysis => "meta-analysis",
            Endpoint::Conflicts => "conflict-detection",
            Endpoint::Subgroups => "subgroup-analysis",
            Endpoint::Bias => "bias-assessment",
            Endpoint::Sensitivity => "sensitivity-analysis",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Moves a JSON request body to an endpoint and returns the JSON response body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(
        &self,
        endpoint: Endpoint,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, RemoteError>;
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum EnvelopeStatus {
    Success,
    Error,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    status: EnvelopeStatus,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

/// Validate a response envelope and decode its payload.
///
/// A `success` envelope without `data` is an error carrying `default_message`.
pub fn unwrap_envelope<T: DeserializeOwned>(
    body: serde_json::Value,
    default_message: &str,
) -> Result<T, RemoteError> {
    let envelope: Envelope = serde_json::from_value(body).map_err(|e| RemoteError::Decode {
        message: format!("invalid response envelope: {e}"),
    })?;

    match envelope.status {
        EnvelopeStatus::Error => Err(RemoteError::Rejected {
            message: envelope
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| default_message.to_string()),
        }),
        EnvelopeStatus::Success => match envelope.data {
            None | Some(serde_json::Value::Null) => Err(RemoteError::EmptyResponse {
                message: default_message.to_string(),
            }),
            Some(data) => serde_json::from_value(data).map_err(|e| RemoteError::Decode {
                message: e.to_string(),
            }),
        },
    }
}

/// Typed access to the six remote contracts.
#[derive(Clone)]
pub struct ResearchClient {
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for ResearchClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResearchClient").finish_non_exhaustive()
    }
}

impl ResearchClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    async fn call<B, T>(
        &self,
        endpoint: Endpoint,
        body: &B,
        default_message: &str,
    ) -> Result<T, RemoteError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body).map_err(|e| RemoteError::Decode {
            message: format!("could not encode request: {e}"),
        })?;
        debug!(endpoint = %endpoint, "Sending request to synthesis service");
        let response = self.transport.post(endpoint, body).await?;
        unwrap_envelope(response, default_message)
    }

    pub async fn assess(
        &self,
        paper_id: PaperId,
        judgments: &Judgments,
    ) -> Result<Assessment, RemoteError> {
        let request = AssessmentRequest {
            paper_id,
            judgments,
        };
        self.call(Endpoint::Assessment, &request, "WWC assessment failed")
            .await
    }

    pub async fn meta_analysis(
        &self,
        paper_ids: &[PaperId],
        outcome_name: Option<&str>,
    ) -> Result<MetaAnalysisResult, RemoteError> {
        let request = AnalysisRequest {
            paper_ids,
            outcome_name,
        };
        self.call(Endpoint::MetaAnalysis, &request, "Meta-analysis failed")
            .await
    }

    pub async fn conflicts(
        &self,
        paper_ids: &[PaperId],
        confidence_threshold: f64,
        extract_findings: Option<bool>,
    ) -> Result<ConflictResult, RemoteError> {
        let request = ConflictRequest {
            paper_ids,
            confidence_threshold,
            extract_findings,
        };
        self.call(Endpoint::Conflicts, &request, "Conflict detection failed")
            .await
    }

    pub async fn subgroup_analysis(
        &self,
        paper_ids: &[PaperId],
        subgroup_variable: &str,
        outcome_name: Option<&str>,
    ) -> Result<SubgroupResult, RemoteError> {
        let request = SubgroupRequest {
            paper_ids,
            subgroup_variable,
            outcome_name,
        };
        self.call(Endpoint::Subgroups, &request, "Subgroup analysis failed")
            .await
    }

    pub async fn bias_assessment(
        &self,
        paper_ids: &[PaperId],
        outcome_name: Option<&str>,
    ) -> Result<BiasResult, RemoteError> {
        let request = AnalysisRequest {
            paper_ids,
            outcome_name,
        };
        self.call(Endpoint::Bias, &request, "Bias assessment failed")
            .await
    }

    pub async fn sensitivity_analysis(
        &self,
        paper_ids: &[PaperId],
        outcome_name: Option<&str>,
    ) -> Result<SensitivityResult, RemoteError> {
        let request = AnalysisRequest {
            paper_ids,
            outcome_name,
        };
        self.call(Endpoint::Sensitivity, &request, "Sensitivity analysis failed")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        value: u32,
    }

    #[test]
    fn test_unwrap_success() {
        let p: Payload =
            unwrap_envelope(json!({"status": "success", "data": {"value": 3}}), "x").unwrap();
        assert_eq!(p, Payload { value: 3 });
    }

    #[test]
    fn test_unwrap_error_uses_service_message() {
        let err = unwrap_envelope::<Payload>(
            json!({"status": "error", "message": "model unavailable"}),
            "Conflict detection failed",
        )
        .unwrap_err();
        assert_eq!(
            err,
            RemoteError::Rejected {
                message: "model unavailable".into()
            }
        );
    }

    #[test]
    fn test_unwrap_error_without_message_uses_default() {
        let err = unwrap_envelope::<Payload>(json!({"status": "error"}), "Meta-analysis failed")
            .unwrap_err();
        assert_eq!(
            err,
            RemoteError::Rejected {
                message: "Meta-analysis failed".into()
            }
        );
    }

    #[test]
    fn test_unwrap_success_without_data_is_error() {
        for body in [json!({"status": "success"}), json!({"status": "success", "data": null})] {
            let err = unwrap_envelope::<Payload>(body, "Bias assessment failed").unwrap_err();
            assert_eq!(
                err,
                RemoteError::EmptyResponse {
                    message: "Bias assessment failed".into()
                }
            );
        }
    }

    #[test]
    fn test_unwrap_malformed_envelope() {
        let err = unwrap_envelope::<Payload>(json!({"ok": true}), "x").unwrap_err();
        assert!(matches!(err, RemoteError::Decode { .. }));

        let err = unwrap_envelope::<Payload>(
            json!({"status": "success", "data": {"value": "three"}}),
            "x",
        )
        .unwrap_err();
        assert!(matches!(err, RemoteError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_client_sends_wire_bodies() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(
            Endpoint::Conflicts,
            MockTransport::success(json!({"contradictions": [], "n_papers": 2, "n_contradictions": 0})),
        );
        let client = ResearchClient::new(mock.clone());

        let result = client
            .conflicts(&[PaperId(1), PaperId(2)], 0.8, None)
            .await
            .unwrap();
        assert_eq!(result.n_papers, 2);

        let sent = mock.requests(Endpoint::Conflicts);
        assert_eq!(
            sent,
            vec![json!({"paper_ids": [1, 2], "confidence_threshold": 0.8})]
        );
    }

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(Endpoint::Assessment.path(), "wwc-assessment");
        assert_eq!(Endpoint::Conflicts.to_string(), "conflict-detection");
    }
}
