//! Text and JSON rendering of panel state.

use serde::Serialize;
use std::path::{Path, PathBuf};

use wwc_core::remote::models::{
    BiasResult, ConflictResult, MetaAnalysisResult, SensitivityResult, SubgroupResult,
};
use wwc_core::synthesis::explanation;
use wwc_core::{
    AnalysisKind, AnalysisStatus, AnalysisView, PaperId, RatingBadge, Step, SynthesisOrchestrator,
    WizardProgress, WizardView,
};

fn progress_bar(percent: u8) -> String {
    let filled = usize::from(percent) / 10;
    format!("[{}{}] {percent:>3}%", "#".repeat(filled), "-".repeat(10 - filled))
}

fn tri_state(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "yes",
        Some(false) => "no",
        None => "not answered",
    }
}

fn badge_marker(badge: RatingBadge) -> &'static str {
    match badge {
        RatingBadge::Success => "\u{2713}",
        RatingBadge::Warning => "!",
        RatingBadge::Danger => "\u{2717}",
    }
}

pub fn print_wizard(view: &WizardView) {
    let heading = view
        .paper_title
        .clone()
        .unwrap_or_else(|| format!("Paper {}", view.paper_id));
    println!();
    println!("  {heading}");
    println!(
        "  Step {}/{}: {}  {}",
        view.step.index() + 1,
        Step::ALL.len(),
        view.step,
        progress_bar(view.progress_percent)
    );

    let j = &view.judgments;
    match view.step {
        Step::Randomization => {
            println!("  Randomization documented: {}", tri_state(j.randomization_documented));
        }
        Step::Attrition => {
            println!("  Attrition boundary: {}", j.attrition_boundary);
            if let Some(a) = &view.assessment {
                if let (Some(overall), Some(diff)) = (a.overall_attrition, a.differential_attrition) {
                    println!(
                        "  Overall attrition {:.1}%, differential {:.1}%",
                        overall * 100.0,
                        diff * 100.0
                    );
                }
            }
        }
        Step::Baseline => {
            println!("  Baseline equivalence is computed by the service from extracted baseline data.");
            if let Some(es) = view.assessment.as_ref().and_then(|a| a.baseline_effect_size) {
                println!("  Baseline effect size: {es:.3}");
            }
        }
        Step::Adjustment => {
            println!("  Adjustment strategy valid: {}", tri_state(j.adjustment_strategy_valid));
        }
        Step::Review => match (&view.assessment, view.badge) {
            (Some(assessment), Some(badge)) => {
                println!("  {} {}", badge_marker(badge), assessment.final_rating);
                for line in &view.justifications {
                    println!("    - {line}");
                }
            }
            _ if view.busy => println!("  Assessment in progress..."),
            _ => println!("  No assessment yet. Choose \"Run assessment\" to request one."),
        },
    }
}

pub fn print_progress(progress: &WizardProgress) {
    println!("  Paper:                     {}", progress.paper_id);
    println!("  Current step:              {}", progress.current_step);
    println!(
        "  Randomization documented:  {}",
        tri_state(progress.judgments.randomization_documented)
    );
    println!("  Attrition boundary:        {}", progress.judgments.attrition_boundary);
    println!(
        "  Adjustment strategy valid: {}",
        tri_state(progress.judgments.adjustment_strategy_valid)
    );
}

pub fn print_analysis(orch: &SynthesisOrchestrator, kind: AnalysisKind) {
    println!();
    println!("  == {kind} ==");
    if let Some(text) = orch.explanation(kind) {
        println!("  {text}");
        if let Some(error) = orch.last_error(kind) {
            println!("  Last error: {}", error.user_message());
        }
        return;
    }
    match kind {
        AnalysisKind::MetaAnalysis => {
            if let Some(result) = orch.meta_analysis().result() {
                print_meta(result, "  ");
            }
        }
        AnalysisKind::Conflicts => {
            if let Some(result) = orch.conflicts().result() {
                print_conflicts(result);
            }
        }
        AnalysisKind::Subgroups => {
            if let Some(result) = orch.subgroups().result() {
                print_subgroups(result);
            }
        }
        AnalysisKind::Bias => {
            if let Some(result) = orch.bias().result() {
                print_bias(result);
            }
        }
        AnalysisKind::Sensitivity => {
            if let Some(result) = orch.sensitivity().result() {
                print_sensitivity(result);
            }
        }
    }
}

fn print_meta(result: &MetaAnalysisResult, indent: &str) {
    println!(
        "{indent}Pooled effect {:.3} (95% CI {:.3} to {:.3}), {} studies",
        result.pooled_effect, result.ci_lower, result.ci_upper, result.n_studies
    );
    if let Some(p) = result.p_value {
        println!("{indent}p = {p:.4}");
    }
    if let Some(i2) = result.i_squared {
        let note = result.heterogeneity_interpretation.as_deref().unwrap_or("");
        println!("{indent}I\u{b2} = {i2:.1}%  {note}");
    }
    for study in &result.studies {
        println!(
            "{indent}  {:<30} d = {:>6.3}  [{:.3}, {:.3}]  w = {:.1}%",
            study.study_label,
            study.effect_size,
            study.ci_lower,
            study.ci_upper,
            study.weight * 100.0
        );
    }
}

fn print_conflicts(result: &ConflictResult) {
    println!(
        "  {} contradictions across {} papers",
        result.n_contradictions, result.n_papers
    );
    for c in &result.contradictions {
        let left = c.paper1_title.as_deref().unwrap_or("Paper A");
        let right = c.paper2_title.as_deref().unwrap_or("Paper B");
        println!("  - {left} vs {right} (confidence {:.2})", c.confidence);
        println!("      \"{}\"", c.finding1);
        println!("      \"{}\"", c.finding2);
    }
}

fn print_subgroups(result: &SubgroupResult) {
    println!(
        "  By {}: {} subgroups",
        result.subgroup_variable, result.n_subgroups
    );
    for (name, group) in &result.subgroups {
        println!("  [{name}]");
        print_meta(group, "    ");
    }
    println!("  [overall]");
    print_meta(&result.overall, "    ");
    if let Some(cmp) = &result.subgroup_comparison {
        println!("  {}", cmp.interpretation);
    }
}

fn print_bias(result: &BiasResult) {
    let egger = &result.eggers_test;
    if let (Some(intercept), Some(p)) = (egger.intercept, egger.intercept_pvalue) {
        println!("  Egger's intercept {intercept:.3} (p = {p:.4})");
    }
    println!("  {}", egger.interpretation);
}

fn print_sensitivity(result: &SensitivityResult) {
    println!(
        "  Overall effect {:.3} over {} studies",
        result.overall_effect, result.n_studies
    );
    for row in &result.leave_one_out {
        println!(
            "  without {:<28} {:.3}  (change {:+.3})",
            row.removed_study, row.pooled_effect, row.difference_from_overall
        );
    }
}

#[derive(Serialize)]
struct SynthesisReport {
    generated_at: String,
    paper_ids: Vec<PaperId>,
    analyses: Vec<AnalysisReport>,
}

#[derive(Serialize)]
struct AnalysisReport {
    kind: AnalysisKind,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    result: Option<serde_json::Value>,
}

fn status_name(status: AnalysisStatus) -> &'static str {
    match status {
        AnalysisStatus::NotRun => "not_run",
        AnalysisStatus::Unavailable => "unavailable",
        AnalysisStatus::Ready => "ready",
    }
}

fn result_json<T: Serialize>(view: AnalysisView<T>) -> anyhow::Result<Option<serde_json::Value>> {
    Ok(match view.result() {
        Some(result) => Some(serde_json::to_value(result.as_ref())?),
        None => None,
    })
}

pub fn print_synthesis_json(
    orch: &SynthesisOrchestrator,
    kinds: &[AnalysisKind],
) -> anyhow::Result<()> {
    let mut analyses = Vec::with_capacity(kinds.len());
    for &kind in kinds {
        let status = orch.status(kind);
        let result = match kind {
            AnalysisKind::MetaAnalysis => result_json(orch.meta_analysis())?,
            AnalysisKind::Conflicts => result_json(orch.conflicts())?,
            AnalysisKind::Subgroups => result_json(orch.subgroups())?,
            AnalysisKind::Bias => result_json(orch.bias())?,
            AnalysisKind::Sensitivity => result_json(orch.sensitivity())?,
        };
        analyses.push(AnalysisReport {
            kind,
            status: status_name(status),
            explanation: explanation(kind, status),
            error: orch.last_error(kind).map(|e| e.user_message()),
            result,
        });
    }
    let report = SynthesisReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        paper_ids: orch.selection().ids().to_vec(),
        analyses,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Write the forest and funnel plots the service rendered, when present.
pub fn write_plots(orch: &SynthesisOrchestrator, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let forest = orch
        .meta_analysis()
        .result()
        .and_then(|r| r.forest_plot_png());
    let funnel = orch.bias().result().and_then(|r| r.funnel_plot_png());

    for (name, plot) in [("forest_plot.png", forest), ("funnel_plot.png", funnel)] {
        match plot {
            Some(Ok(bytes)) => {
                let path = dir.join(name);
                std::fs::write(&path, bytes)?;
                written.push(path);
            }
            Some(Err(e)) => tracing::warn!(plot = name, error = %e, "Plot is not valid base64"),
            None => {}
        }
    }
    Ok(written)
}
