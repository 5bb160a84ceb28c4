//! Synthesis orchestrator: five cached analyses over a fixed paper selection.
//!
//! Each [`AnalysisKind`] has its own [`AsyncGuard`], so independent analyses
//! run concurrently while repeated triggers of the same kind are single-flight.
//! Publication bias and sensitivity analysis are gated on a completed
//! meta-analysis.
//!
//! Every cache entry distinguishes three states: never attempted, attempted
//! without a usable result, and holding a result. An entry can only hold a
//! result once it has been attempted.

use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::alerts::{AlertLatch, Notifier};
use crate::error::{RemoteError, ValidationError};
use crate::guard::{AsyncGuard, GuardOutcome};
use crate::remote::ResearchClient;
use crate::remote::models::{
    BiasResult, ConflictResult, MetaAnalysisResult, SensitivityResult, SubgroupResult,
};
use crate::sync::lock;
use crate::types::{AnalysisKind, PaperSelection};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Three-way state of one cached analysis.
#[derive(Debug, PartialEq)]
pub enum AnalysisView<T> {
    /// Never attempted in this orchestrator.
    NotRun,
    /// Attempted, but no usable result came back.
    Unavailable,
    Ready(Arc<T>),
}

impl<T> Clone for AnalysisView<T> {
    fn clone(&self) -> Self {
        match self {
            AnalysisView::NotRun => AnalysisView::NotRun,
            AnalysisView::Unavailable => AnalysisView::Unavailable,
            AnalysisView::Ready(result) => AnalysisView::Ready(result.clone()),
        }
    }
}

impl<T> AnalysisView<T> {
    pub fn status(&self) -> AnalysisStatus {
        match self {
            AnalysisView::NotRun => AnalysisStatus::NotRun,
            AnalysisView::Unavailable => AnalysisStatus::Unavailable,
            AnalysisView::Ready(_) => AnalysisStatus::Ready,
        }
    }

    pub fn result(&self) -> Option<&Arc<T>> {
        match self {
            AnalysisView::Ready(result) => Some(result),
            _ => None,
        }
    }
}

/// [`AnalysisView`] without the payload, usable across kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisStatus {
    NotRun,
    Unavailable,
    Ready,
}

/// One cache slot. Fields are private so `result.is_some()` implies `attempted`.
#[derive(Debug)]
pub struct AnalysisEntry<T> {
    attempted: bool,
    result: Option<Arc<T>>,
}

impl<T> Default for AnalysisEntry<T> {
    fn default() -> Self {
        Self {
            attempted: false,
            result: None,
        }
    }
}

impl<T> AnalysisEntry<T> {
    pub fn attempted(&self) -> bool {
        self.attempted
    }

    pub fn result(&self) -> Option<&Arc<T>> {
        self.result.as_ref()
    }

    pub fn record_success(&mut self, result: Arc<T>) {
        self.attempted = true;
        self.result = Some(result);
    }

    pub fn record_failure(&mut self) {
        self.attempted = true;
        self.result = None;
    }

    fn record(&mut self, result: Option<Arc<T>>) {
        match result {
            Some(result) => self.record_success(result),
            None => self.record_failure(),
        }
    }

    pub fn view(&self) -> AnalysisView<T> {
        match (&self.result, self.attempted) {
            (Some(result), _) => AnalysisView::Ready(result.clone()),
            (None, true) => AnalysisView::Unavailable,
            (None, false) => AnalysisView::NotRun,
        }
    }
}

#[derive(Debug, Default)]
struct AnalysisCache {
    meta: AnalysisEntry<MetaAnalysisResult>,
    conflicts: AnalysisEntry<ConflictResult>,
    subgroups: AnalysisEntry<SubgroupResult>,
    bias: AnalysisEntry<BiasResult>,
    sensitivity: AnalysisEntry<SensitivityResult>,
}

impl AnalysisCache {
    fn status(&self, kind: AnalysisKind) -> AnalysisStatus {
        match kind {
            AnalysisKind::MetaAnalysis => self.meta.view().status(),
            AnalysisKind::Conflicts => self.conflicts.view().status(),
            AnalysisKind::Subgroups => self.subgroups.view().status(),
            AnalysisKind::Bias => self.bias.view().status(),
            AnalysisKind::Sensitivity => self.sensitivity.view().status(),
        }
    }
}

/// Request parameters shared by every analysis of one orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOptions {
    pub outcome_name: Option<String>,
    pub confidence_threshold: f64,
    pub extract_findings: Option<bool>,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            outcome_name: None,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            extract_findings: None,
        }
    }
}

impl From<&crate::config::AnalysisConfig> for SynthesisOptions {
    fn from(config: &crate::config::AnalysisConfig) -> Self {
        Self {
            outcome_name: config.outcome_name.clone(),
            confidence_threshold: config.confidence_threshold,
            extract_findings: config.extract_findings,
        }
    }
}

#[derive(Debug)]
struct Guards {
    meta: AsyncGuard,
    conflicts: AsyncGuard,
    subgroups: AsyncGuard,
    bias: AsyncGuard,
    sensitivity: AsyncGuard,
}

impl Guards {
    fn new() -> Self {
        Self {
            meta: AsyncGuard::new("meta-analysis"),
            conflicts: AsyncGuard::new("conflict-detection"),
            subgroups: AsyncGuard::new("subgroup-analysis"),
            bias: AsyncGuard::new("bias-assessment"),
            sensitivity: AsyncGuard::new("sensitivity-analysis"),
        }
    }

    fn get(&self, kind: AnalysisKind) -> &AsyncGuard {
        match kind {
            AnalysisKind::MetaAnalysis => &self.meta,
            AnalysisKind::Conflicts => &self.conflicts,
            AnalysisKind::Subgroups => &self.subgroups,
            AnalysisKind::Bias => &self.bias,
            AnalysisKind::Sensitivity => &self.sensitivity,
        }
    }
}

/// Text shown on a tab that has no result to display.
pub fn explanation(kind: AnalysisKind, status: AnalysisStatus) -> Option<&'static str> {
    let text = match (status, kind) {
        (AnalysisStatus::Ready, _) => return None,
        (AnalysisStatus::NotRun, AnalysisKind::MetaAnalysis) => {
            "Meta-analysis has not been run yet. Run it to pool effect sizes across the selected papers."
        }
        (AnalysisStatus::NotRun, AnalysisKind::Conflicts) => {
            "Conflict detection has not been run yet. Run it to compare key findings across papers and flag contradictions."
        }
        (AnalysisStatus::NotRun, AnalysisKind::Subgroups) => {
            "Subgroup analysis has not been run yet. Choose a subgroup variable such as age_group or intervention_type, then run it."
        }
        (AnalysisStatus::NotRun, AnalysisKind::Bias) => {
            "Publication bias has not been assessed yet. Complete a meta-analysis first, then run the bias assessment."
        }
        (AnalysisStatus::NotRun, AnalysisKind::Sensitivity) => {
            "Sensitivity analysis has not been run yet. Complete a meta-analysis first, then run leave-one-out diagnostics."
        }
        (AnalysisStatus::Unavailable, AnalysisKind::MetaAnalysis) => {
            "Meta-analysis could not be completed. At least two papers need extracted effect sizes with standard errors."
        }
        (AnalysisStatus::Unavailable, AnalysisKind::Conflicts) => {
            "Conflict detection could not be completed. Papers need extracted key findings and the comparison model must be available."
        }
        (AnalysisStatus::Unavailable, AnalysisKind::Subgroups) => {
            "Subgroup analysis could not be completed. Papers need effect sizes and a value for the chosen variable, spanning at least two subgroups."
        }
        (AnalysisStatus::Unavailable, AnalysisKind::Bias) => {
            "Publication bias could not be assessed. Egger's test needs at least three studies with effect sizes."
        }
        (AnalysisStatus::Unavailable, AnalysisKind::Sensitivity) => {
            "Sensitivity analysis could not be completed. Leave-one-out diagnostics need at least three studies with effect sizes."
        }
    };
    Some(text)
}

pub struct SynthesisOrchestrator {
    selection: PaperSelection,
    options: SynthesisOptions,
    client: ResearchClient,
    notifier: Arc<dyn Notifier>,
    guards: Guards,
    alerts: AlertLatch,
    cache: Mutex<AnalysisCache>,
    active_tab: Mutex<AnalysisKind>,
}

impl std::fmt::Debug for SynthesisOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisOrchestrator")
            .field("selection", &self.selection)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SynthesisOrchestrator {
    pub fn new(
        selection: PaperSelection,
        options: SynthesisOptions,
        client: ResearchClient,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        info!(papers = selection.len(), "Opening synthesis");
        Self {
            selection,
            options,
            client,
            notifier,
            guards: Guards::new(),
            alerts: AlertLatch::new(),
            cache: Mutex::new(AnalysisCache::default()),
            active_tab: Mutex::new(AnalysisKind::MetaAnalysis),
        }
    }

    pub fn selection(&self) -> &PaperSelection {
        &self.selection
    }

    pub fn options(&self) -> &SynthesisOptions {
        &self.options
    }

    fn outcome(&self) -> Option<&str> {
        self.options.outcome_name.as_deref()
    }

    pub async fn run_meta_analysis(
        &self,
    ) -> Result<GuardOutcome<Arc<MetaAnalysisResult>>, ValidationError> {
        let ids = self.selection.ids();
        let outcome = self
            .run(
                AnalysisKind::MetaAnalysis,
                || self.client.meta_analysis(ids, self.outcome()),
                |cache, result| cache.meta.record(result),
            )
            .await;
        Ok(outcome)
    }

    /// Run conflict detection at the configured confidence threshold.
    pub async fn detect_conflicts_default(
        &self,
    ) -> Result<GuardOutcome<Arc<ConflictResult>>, ValidationError> {
        self.detect_conflicts(self.options.confidence_threshold).await
    }

    /// Run conflict detection at `threshold`, which must lie in `[0, 1]`.
    pub async fn detect_conflicts(
        &self,
        threshold: f64,
    ) -> Result<GuardOutcome<Arc<ConflictResult>>, ValidationError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ValidationError::InvalidThreshold { value: threshold });
        }
        let ids = self.selection.ids();
        let outcome = self
            .run(
                AnalysisKind::Conflicts,
                || {
                    self.client
                        .conflicts(ids, threshold, self.options.extract_findings)
                },
                |cache, result| cache.conflicts.record(result),
            )
            .await;
        Ok(outcome)
    }

    pub async fn run_subgroup_analysis(
        &self,
        variable: &str,
    ) -> Result<GuardOutcome<Arc<SubgroupResult>>, ValidationError> {
        let variable = variable.trim();
        if variable.is_empty() {
            return Err(ValidationError::MissingSubgroupVariable);
        }
        let ids = self.selection.ids();
        let outcome = self
            .run(
                AnalysisKind::Subgroups,
                || self.client.subgroup_analysis(ids, variable, self.outcome()),
                |cache, result| cache.subgroups.record(result),
            )
            .await;
        Ok(outcome)
    }

    pub async fn assess_bias(&self) -> Result<GuardOutcome<Arc<BiasResult>>, ValidationError> {
        self.check_prerequisite(AnalysisKind::Bias)?;
        let ids = self.selection.ids();
        let outcome = self
            .run(
                AnalysisKind::Bias,
                || self.client.bias_assessment(ids, self.outcome()),
                |cache, result| cache.bias.record(result),
            )
            .await;
        Ok(outcome)
    }

    pub async fn run_sensitivity(
        &self,
    ) -> Result<GuardOutcome<Arc<SensitivityResult>>, ValidationError> {
        self.check_prerequisite(AnalysisKind::Sensitivity)?;
        let ids = self.selection.ids();
        let outcome = self
            .run(
                AnalysisKind::Sensitivity,
                || self.client.sensitivity_analysis(ids, self.outcome()),
                |cache, result| cache.sensitivity.record(result),
            )
            .await;
        Ok(outcome)
    }

    fn check_prerequisite(&self, kind: AnalysisKind) -> Result<(), ValidationError> {
        match kind.prerequisite() {
            Some(requires) if self.status(requires) != AnalysisStatus::Ready => {
                debug!(kind = %kind, requires = %requires, "Analysis gated");
                Err(ValidationError::DependencyNotMet { kind, requires })
            }
            _ => Ok(()),
        }
    }

    /// Run one guarded analysis and record its outcome in the cache.
    ///
    /// A call rejected because the same kind is in flight changes nothing.
    async fn run<T, F, Fut>(
        &self,
        kind: AnalysisKind,
        operation: F,
        record: impl FnOnce(&mut AnalysisCache, Option<Arc<T>>),
    ) -> GuardOutcome<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let outcome = match self.guards.get(kind).invoke(operation).await {
            GuardOutcome::Completed(result) => {
                let result = Arc::new(result);
                record(&mut *lock(&self.cache), Some(result.clone()));
                info!(kind = %kind, "Analysis completed");
                GuardOutcome::Completed(result)
            }
            GuardOutcome::Failed(error) => {
                record(&mut *lock(&self.cache), None);
                GuardOutcome::Failed(error)
            }
            GuardOutcome::Rejected => return GuardOutcome::Rejected,
        };
        self.surface_errors();
        outcome
    }

    /// Whether the action for `kind` may be triggered now.
    pub fn is_enabled(&self, kind: AnalysisKind) -> bool {
        self.check_prerequisite(kind).is_ok() && !self.is_busy(kind)
    }

    pub fn is_busy(&self, kind: AnalysisKind) -> bool {
        self.guards.get(kind).is_busy()
    }

    pub fn any_busy(&self) -> bool {
        AnalysisKind::ALL.iter().any(|&kind| self.is_busy(kind))
    }

    pub fn last_error(&self, kind: AnalysisKind) -> Option<RemoteError> {
        self.guards.get(kind).last_error()
    }

    pub fn status(&self, kind: AnalysisKind) -> AnalysisStatus {
        lock(&self.cache).status(kind)
    }

    pub fn attempted(&self, kind: AnalysisKind) -> bool {
        self.status(kind) != AnalysisStatus::NotRun
    }

    pub fn explanation(&self, kind: AnalysisKind) -> Option<&'static str> {
        explanation(kind, self.status(kind))
    }

    pub fn meta_analysis(&self) -> AnalysisView<MetaAnalysisResult> {
        lock(&self.cache).meta.view()
    }

    pub fn conflicts(&self) -> AnalysisView<ConflictResult> {
        lock(&self.cache).conflicts.view()
    }

    pub fn subgroups(&self) -> AnalysisView<SubgroupResult> {
        lock(&self.cache).subgroups.view()
    }

    pub fn bias(&self) -> AnalysisView<BiasResult> {
        lock(&self.cache).bias.view()
    }

    pub fn sensitivity(&self) -> AnalysisView<SensitivityResult> {
        lock(&self.cache).sensitivity.view()
    }

    pub fn select_tab(&self, kind: AnalysisKind) {
        *lock(&self.active_tab) = kind;
    }

    pub fn active_tab(&self) -> AnalysisKind {
        *lock(&self.active_tab)
    }

    /// Alert on new failures of any analysis. Returns how many alerts were raised.
    pub fn surface_errors(&self) -> usize {
        AnalysisKind::ALL
            .iter()
            .filter(|&&kind| {
                let title = format!("{kind} failed");
                self.alerts
                    .surface(self.guards.get(kind), &title, self.notifier.as_ref())
            })
            .count()
    }
}
