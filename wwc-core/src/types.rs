//! Fundamental types shared across the orchestration layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Identifier of a paper in the researcher's library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaperId(pub i64);

impl fmt::Display for PaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for PaperId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Ordered, duplicate-free set of papers selected for synthesis.
///
/// Immutable once built; synthesis needs at least two distinct papers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperSelection {
    ids: Vec<PaperId>,
}

impl PaperSelection {
    /// Minimum number of distinct papers a selection must hold.
    pub const MIN_PAPERS: usize = 2;

    pub fn new<I>(ids: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator,
        I::Item: Into<PaperId>,
    {
        let mut unique: Vec<PaperId> = Vec::new();
        for id in ids.into_iter().map(Into::into) {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        if unique.len() < Self::MIN_PAPERS {
            return Err(ValidationError::InsufficientPapers {
                required: Self::MIN_PAPERS,
                actual: unique.len(),
            });
        }
        Ok(Self { ids: unique })
    }

    pub fn ids(&self) -> &[PaperId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Attrition boundary chosen by the reviewer (WWC Handbook appendix C).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttritionBoundary {
    #[default]
    Cautious,
    Optimistic,
}

impl fmt::Display for AttritionBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttritionBoundary::Cautious => write!(f, "cautious"),
            AttritionBoundary::Optimistic => write!(f, "optimistic"),
        }
    }
}

/// Judgments that only a human reviewer can make. Never inferred.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgments {
    #[serde(rename = "chosen_attrition_boundary", default)]
    pub attrition_boundary: AttritionBoundary,
    /// `None` means "not specified".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub randomization_documented: Option<bool>,
    /// `None` means "not applicable".
    #[serde(
        rename = "adjustment_strategy_is_valid",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub adjustment_strategy_valid: Option<bool>,
}

/// Steps of the assessment wizard, in order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    #[default]
    Randomization,
    Attrition,
    Baseline,
    Adjustment,
    Review,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::Randomization,
        Step::Attrition,
        Step::Baseline,
        Step::Adjustment,
        Step::Review,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Step> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<Step> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    pub fn is_terminal(self) -> bool {
        self == Step::Review
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Randomization => "Randomization",
            Step::Attrition => "Attrition",
            Step::Baseline => "Baseline equivalence",
            Step::Adjustment => "Statistical adjustment",
            Step::Review => "Review",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for Step {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "randomization" => Ok(Step::Randomization),
            "attrition" => Ok(Step::Attrition),
            "baseline" => Ok(Step::Baseline),
            "adjustment" => Ok(Step::Adjustment),
            "review" => Ok(Step::Review),
            other => Err(ValidationError::UnknownStep {
                name: other.to_string(),
            }),
        }
    }
}

/// The five analyses a synthesis orchestrator can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    MetaAnalysis,
    Conflicts,
    Subgroups,
    Bias,
    Sensitivity,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 5] = [
        AnalysisKind::MetaAnalysis,
        AnalysisKind::Conflicts,
        AnalysisKind::Subgroups,
        AnalysisKind::Bias,
        AnalysisKind::Sensitivity,
    ];

    /// The analysis that must have produced a result before this one may run.
    pub fn prerequisite(self) -> Option<AnalysisKind> {
        match self {
            AnalysisKind::Bias | AnalysisKind::Sensitivity => Some(AnalysisKind::MetaAnalysis),
            _ => None,
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisKind::MetaAnalysis => write!(f, "Meta-analysis"),
            AnalysisKind::Conflicts => write!(f, "Conflict detection"),
            AnalysisKind::Subgroups => write!(f, "Subgroup analysis"),
            AnalysisKind::Bias => write!(f, "Publication bias"),
            AnalysisKind::Sensitivity => write!(f, "Sensitivity analysis"),
        }
    }
}

impl FromStr for AnalysisKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "meta" | "meta-analysis" => Ok(AnalysisKind::MetaAnalysis),
            "conflicts" | "conflict-detection" => Ok(AnalysisKind::Conflicts),
            "subgroups" | "subgroup" | "subgroup-analysis" => Ok(AnalysisKind::Subgroups),
            "bias" | "bias-assessment" => Ok(AnalysisKind::Bias),
            "sensitivity" | "sensitivity-analysis" => Ok(AnalysisKind::Sensitivity),
            other => Err(format!("unknown analysis kind: {other}")),
        }
    }
}
