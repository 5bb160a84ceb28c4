//! WWC quality-assessment wizard.
//!
//! A linear stepper over [`Step`]: Randomization → Attrition → Baseline →
//! Adjustment → Review. Reviewer judgments are captured along the way and
//! persisted on every change; the rating itself is computed remotely.
//!
//! Remote assessment policy: a request is issued when the Review step is
//! entered for the first time in this wizard while no assessment is cached,
//! and afterwards only through [`AssessmentWizard::run_assessment`]. Judgment
//! edits never call the service.

use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::alerts::{AlertLatch, Notifier};
use crate::error::RemoteError;
use crate::guard::{AsyncGuard, GuardOutcome};
use crate::progress::{ProgressStore, WizardProgress};
use crate::remote::ResearchClient;
use crate::remote::models::{Assessment, RatingBadge};
use crate::sync::lock;
use crate::types::{AttritionBoundary, Judgments, PaperId, Step};

const ALERT_TITLE: &str = "WWC assessment failed";

/// Percentage of the wizard completed when `step` is current.
pub fn progress_percent(step: Step) -> u8 {
    ((step.index() + 1) * 100 / Step::ALL.len()) as u8
}

/// Everything a renderer needs to draw the wizard.
#[derive(Debug, Clone, PartialEq)]
pub struct WizardView {
    pub paper_id: PaperId,
    pub paper_title: Option<String>,
    pub step: Step,
    pub progress_percent: u8,
    pub judgments: Judgments,
    pub assessment: Option<Arc<Assessment>>,
    pub busy: bool,
    pub justifications: Vec<String>,
    pub badge: Option<RatingBadge>,
    pub last_error: Option<RemoteError>,
}

#[derive(Debug)]
struct WizardState {
    progress: WizardProgress,
    assessment: Option<Arc<Assessment>>,
    review_entered: bool,
}

pub struct AssessmentWizard {
    paper_id: PaperId,
    paper_title: Option<String>,
    client: ResearchClient,
    store: ProgressStore,
    notifier: Arc<dyn Notifier>,
    guard: AsyncGuard,
    alerts: AlertLatch,
    state: Mutex<WizardState>,
}

impl std::fmt::Debug for AssessmentWizard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssessmentWizard")
            .field("paper_id", &self.paper_id)
            .field("step", &self.step())
            .field("busy", &self.guard.is_busy())
            .finish_non_exhaustive()
    }
}

impl AssessmentWizard {
    /// Open the wizard for a paper, resuming stored progress when present.
    ///
    /// A paper without a stored record starts at the first step with default
    /// judgments, and that record is written immediately. Resuming directly
    /// on the Review step counts as entering it.
    pub async fn open(
        paper_id: PaperId,
        paper_title: Option<String>,
        client: ResearchClient,
        store: ProgressStore,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let progress = match store.load(paper_id) {
            Some(progress) => {
                info!(paper_id = %paper_id, step = %progress.current_step, "Resuming assessment");
                progress
            }
            None => {
                let progress = WizardProgress::new(paper_id);
                store.save(&progress);
                info!(paper_id = %paper_id, "Starting new assessment");
                progress
            }
        };
        let resume_on_review = progress.current_step.is_terminal();

        let wizard = Self {
            paper_id,
            paper_title,
            client,
            store,
            notifier,
            guard: AsyncGuard::new("wwc-assessment"),
            alerts: AlertLatch::new(),
            state: Mutex::new(WizardState {
                progress,
                assessment: None,
                review_entered: resume_on_review,
            }),
        };
        if resume_on_review {
            wizard.run_assessment().await;
        }
        wizard
    }

    pub fn paper_id(&self) -> PaperId {
        self.paper_id
    }

    pub fn step(&self) -> Step {
        lock(&self.state).progress.current_step
    }

    pub fn judgments(&self) -> Judgments {
        lock(&self.state).progress.judgments.clone()
    }

    pub fn progress(&self) -> WizardProgress {
        lock(&self.state).progress.clone()
    }

    pub fn assessment(&self) -> Option<Arc<Assessment>> {
        lock(&self.state).assessment.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.guard.is_busy()
    }

    /// Move forward one step. Stays put on the last step.
    pub async fn next(&self) -> Step {
        match self.step().next() {
            Some(step) => self.go_to(step).await,
            None => self.step(),
        }
    }

    /// Move back one step. Stays put on the first step.
    pub async fn previous(&self) -> Step {
        match self.step().previous() {
            Some(step) => self.go_to(step).await,
            None => self.step(),
        }
    }

    /// Jump straight to `step` and persist the new position.
    pub async fn go_to(&self, step: Step) -> Step {
        let first_review_without_result = {
            let mut state = lock(&self.state);
            let from = state.progress.current_step;
            state.progress.current_step = step;
            self.store.save(&state.progress);
            debug!(paper_id = %self.paper_id, from = %from, to = %step, "Wizard transition");

            let trigger =
                step.is_terminal() && !state.review_entered && state.assessment.is_none();
            if step.is_terminal() {
                state.review_entered = true;
            }
            trigger
        };

        if first_review_without_result {
            self.run_assessment().await;
        }
        step
    }

    pub fn set_randomization_documented(&self, value: Option<bool>) {
        self.edit(|j| j.randomization_documented = value);
    }

    pub fn set_attrition_boundary(&self, boundary: AttritionBoundary) {
        self.edit(|j| j.attrition_boundary = boundary);
    }

    pub fn set_adjustment_valid(&self, value: Option<bool>) {
        self.edit(|j| j.adjustment_strategy_valid = value);
    }

    fn edit(&self, apply: impl FnOnce(&mut Judgments)) {
        let mut state = lock(&self.state);
        apply(&mut state.progress.judgments);
        self.store.save(&state.progress);
    }

    /// Request a fresh assessment using the current judgments.
    ///
    /// Rejected without a remote call while another request is in flight.
    /// A success replaces the cached assessment; a failure keeps it.
    pub async fn run_assessment(&self) -> GuardOutcome<Arc<Assessment>> {
        let judgments = self.judgments();
        let outcome = self
            .guard
            .invoke(|| self.client.assess(self.paper_id, &judgments))
            .await;

        let outcome = match outcome {
            GuardOutcome::Completed(assessment) => {
                let assessment = Arc::new(assessment);
                info!(
                    paper_id = %self.paper_id,
                    rating = %assessment.final_rating,
                    "Assessment completed"
                );
                lock(&self.state).assessment = Some(assessment.clone());
                GuardOutcome::Completed(assessment)
            }
            GuardOutcome::Failed(error) => GuardOutcome::Failed(error),
            GuardOutcome::Rejected => GuardOutcome::Rejected,
        };
        self.surface_errors();
        outcome
    }

    /// Show the latest failure to the user unless it was already shown.
    pub fn surface_errors(&self) -> bool {
        self.alerts
            .surface(&self.guard, ALERT_TITLE, self.notifier.as_ref())
    }

    pub fn view(&self) -> WizardView {
        let state = lock(&self.state);
        let step = state.progress.current_step;
        let assessment = state.assessment.clone();
        WizardView {
            paper_id: self.paper_id,
            paper_title: self.paper_title.clone(),
            step,
            progress_percent: progress_percent(step),
            judgments: state.progress.judgments.clone(),
            justifications: assessment
                .as_ref()
                .map(|a| a.rating_justification.clone())
                .unwrap_or_default(),
            badge: assessment.as_ref().map(|a| a.final_rating.badge()),
            assessment,
            busy: self.guard.is_busy(),
            last_error: self.guard.last_error(),
        }
    }
}
