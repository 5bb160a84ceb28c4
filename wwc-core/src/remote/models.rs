//! Request and response bodies exchanged with the synthesis service.
//!
//! Responses are decoded leniently: the service omits fields it could not
//! compute, so everything except the headline numbers carries a serde default.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{AttritionBoundary, Judgments, PaperId};

// ── WWC assessment ────────────────────────────────────────────

/// Final WWC rating, carried on the wire as the service's full rating text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WwcRating {
    #[serde(rename = "Meets WWC Standards Without Reservations")]
    MeetsWithoutReservations,
    #[serde(rename = "Meets WWC Standards With Reservations")]
    MeetsWithReservations,
    #[serde(rename = "Does Not Meet WWC Standards")]
    DoesNotMeet,
}

/// Presentation bucket for a rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RatingBadge {
    Success,
    Warning,
    Danger,
}

impl WwcRating {
    pub fn label(self) -> &'static str {
        match self {
            WwcRating::MeetsWithoutReservations => "Meets WWC Standards Without Reservations",
            WwcRating::MeetsWithReservations => "Meets WWC Standards With Reservations",
            WwcRating::DoesNotMeet => "Does Not Meet WWC Standards",
        }
    }

    pub fn badge(self) -> RatingBadge {
        match self {
            WwcRating::MeetsWithoutReservations => RatingBadge::Success,
            WwcRating::MeetsWithReservations => RatingBadge::Warning,
            WwcRating::DoesNotMeet => RatingBadge::Danger,
        }
    }
}

impl std::fmt::Display for WwcRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssessmentRequest<'a> {
    pub paper_id: PaperId,
    pub judgments: &'a Judgments,
}

/// A remotely computed WWC assessment. Read-only to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    #[serde(default)]
    pub paper_id: Option<PaperId>,
    #[serde(default)]
    pub paper_title: Option<String>,
    #[serde(default)]
    pub chosen_attrition_boundary: AttritionBoundary,
    #[serde(default)]
    pub adjustment_strategy_is_valid: Option<bool>,
    #[serde(default)]
    pub randomization_documented: Option<bool>,
    #[serde(default = "default_true")]
    pub is_rct: bool,
    #[serde(default)]
    pub overall_attrition: Option<f64>,
    #[serde(default)]
    pub differential_attrition: Option<f64>,
    #[serde(default)]
    pub is_high_attrition: Option<bool>,
    #[serde(default)]
    pub baseline_effect_size: Option<f64>,
    #[serde(default)]
    pub baseline_equivalence_satisfied: Option<bool>,
    pub final_rating: WwcRating,
    #[serde(default)]
    pub rating_justification: Vec<String>,
}

fn default_true() -> bool {
    true
}

// ── Synthesis requests ────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest<'a> {
    pub paper_ids: &'a [PaperId],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome_name: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictRequest<'a> {
    pub paper_ids: &'a [PaperId],
    pub confidence_threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extract_findings: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubgroupRequest<'a> {
    pub paper_ids: &'a [PaperId],
    pub subgroup_variable: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome_name: Option<&'a str>,
}

// ── Meta-analysis ─────────────────────────────────────────────

/// One study row of a pooled analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyResult {
    #[serde(default)]
    pub paper_id: Option<PaperId>,
    #[serde(default)]
    pub study_label: String,
    pub effect_size: f64,
    pub std_error: f64,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub ci_lower: f64,
    #[serde(default)]
    pub ci_upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaAnalysisResult {
    pub pooled_effect: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    #[serde(default)]
    pub p_value: Option<f64>,
    #[serde(default)]
    pub tau_squared: Option<f64>,
    #[serde(default)]
    pub i_squared: Option<f64>,
    #[serde(default)]
    pub q_statistic: Option<f64>,
    #[serde(default)]
    pub q_p_value: Option<f64>,
    #[serde(default)]
    pub n_studies: usize,
    #[serde(default)]
    pub studies: Vec<StudyResult>,
    #[serde(default)]
    pub heterogeneity_interpretation: Option<String>,
    /// Base64-encoded PNG rendered by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forest_plot: Option<String>,
}

impl MetaAnalysisResult {
    pub fn forest_plot_png(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
        self.forest_plot.as_deref().map(decode_plot)
    }
}

// ── Conflict detection ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contradiction {
    #[serde(default)]
    pub paper1_id: Option<PaperId>,
    #[serde(default)]
    pub paper2_id: Option<PaperId>,
    #[serde(default)]
    pub paper1_title: Option<String>,
    #[serde(default)]
    pub paper2_title: Option<String>,
    pub finding1: String,
    pub finding2: String,
    pub confidence: f64,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictResult {
    #[serde(default)]
    pub contradictions: Vec<Contradiction>,
    #[serde(default)]
    pub n_papers: usize,
    #[serde(default)]
    pub n_contradictions: usize,
}

// ── Subgroups ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubgroupComparison {
    #[serde(default)]
    pub q_between: Option<f64>,
    #[serde(default)]
    pub df: Option<u32>,
    #[serde(default)]
    pub p_value: Option<f64>,
    #[serde(default)]
    pub interpretation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubgroupResult {
    #[serde(default)]
    pub subgroups: BTreeMap<String, MetaAnalysisResult>,
    pub overall: MetaAnalysisResult,
    pub subgroup_variable: String,
    #[serde(default)]
    pub n_subgroups: usize,
    #[serde(default)]
    pub subgroup_comparison: Option<SubgroupComparison>,
}

// ── Publication bias ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EggersTest {
    #[serde(default)]
    pub intercept: Option<f64>,
    #[serde(default)]
    pub intercept_se: Option<f64>,
    #[serde(default)]
    pub intercept_pvalue: Option<f64>,
    #[serde(default)]
    pub interpretation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasResult {
    pub eggers_test: EggersTest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funnel_plot: Option<String>,
    #[serde(default)]
    pub n_studies: usize,
}

impl BiasResult {
    pub fn funnel_plot_png(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
        self.funnel_plot.as_deref().map(decode_plot)
    }
}

// ── Sensitivity ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveOneOut {
    pub removed_study: String,
    #[serde(default)]
    pub removed_paper_id: Option<PaperId>,
    pub pooled_effect: f64,
    #[serde(default)]
    pub ci_lower: f64,
    #[serde(default)]
    pub ci_upper: f64,
    #[serde(default)]
    pub difference_from_overall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluenceScore {
    pub study_label: String,
    #[serde(default)]
    pub paper_id: Option<PaperId>,
    pub influence_score: f64,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub effect_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityResult {
    pub overall_effect: f64,
    #[serde(default)]
    pub leave_one_out: Vec<LeaveOneOut>,
    #[serde(default)]
    pub influence_diagnostics: Vec<InfluenceScore>,
    #[serde(default)]
    pub n_studies: usize,
}

/// Plots may arrive as bare base64 or as a `data:image/png;base64,` URI.
fn decode_plot(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = encoded
        .split_once("base64,")
        .map(|(_, rest)| rest)
        .unwrap_or(encoded);
    STANDARD.decode(payload.trim())
}
