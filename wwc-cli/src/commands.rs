//! CLI subcommand handlers.

use futures::future::OptionFuture;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use wwc_core::config::{load_config, load_config_file, user_config_path, workspace_config_path};
use wwc_core::{
    AnalysisKind, CopilotConfig, CopilotEvent, CopilotHost, EventBus, GuardOutcome, HostContext,
    LogNotifier, Notifier, PaperId, Panel, ProgressStore, ValidationError,
};

use crate::notifier::ConsoleNotifier;
use crate::{Commands, ConfigAction};

/// Where configuration comes from for this invocation.
pub struct ConfigSource<'a> {
    pub workspace: &'a Path,
    /// Explicit file that replaces the layered lookup.
    pub file: Option<&'a Path>,
    /// `--server` override, applied last.
    pub server: Option<&'a str>,
}

impl ConfigSource<'_> {
    fn load(&self) -> anyhow::Result<CopilotConfig> {
        let mut config = match self.file {
            Some(path) => load_config_file(path),
            None => load_config(Some(self.workspace), None),
        }
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        if let Some(server) = self.server {
            config.server.base_url = server.to_string();
            config.validate()?;
        }
        Ok(config)
    }
}

/// Handle a CLI subcommand.
pub async fn handle_command(command: Commands, source: &ConfigSource<'_>) -> anyhow::Result<()> {
    match command {
        Commands::Config { action } => handle_config(action, source),
        Commands::Progress { paper_id } => handle_progress(PaperId(paper_id), source),
        Commands::Assess { paper_id, title } => {
            let config = source.load()?;
            let context = HostContext::from_config(&config, Arc::new(ConsoleNotifier::new(true)))?;
            crate::assess::run(PaperId(paper_id), title, context).await
        }
        Commands::Synthesize {
            paper_ids,
            analyses,
            subgroup,
            threshold,
            outcome,
            plots,
            json,
        } => {
            let mut config = source.load()?;
            if let Some(threshold) = threshold {
                config.analysis.confidence_threshold = threshold;
            }
            if outcome.is_some() {
                config.analysis.outcome_name = outcome;
            }
            let request = SynthesisRequest {
                paper_ids: paper_ids.into_iter().map(PaperId).collect(),
                kinds: requested_kinds(analyses, subgroup.is_some()),
                subgroup,
                plots,
                json,
            };
            handle_synthesize(request, &config).await
        }
    }
}

fn handle_config(action: ConfigAction, source: &ConfigSource<'_>) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let mut config = source.load()?;
            if config.server.api_token.is_some() {
                config.server.api_token = Some("<redacted>".into());
            }
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigAction::Path => {
            if let Some(file) = source.file {
                println!("file:      {}{}", file.display(), exists_marker(file));
            }
            match user_config_path() {
                Some(path) => println!("user:      {}{}", path.display(), exists_marker(&path)),
                None => println!("user:      (no config directory on this platform)"),
            }
            let ws = workspace_config_path(source.workspace);
            println!("workspace: {}{}", ws.display(), exists_marker(&ws));
            if let Some(dirs) = directories::ProjectDirs::from("dev", "wwc-copilot", "wwc-copilot")
            {
                println!("logs:      {}", dirs.data_dir().join("logs").display());
            }
            Ok(())
        }
    }
}

fn exists_marker(path: &Path) -> &'static str {
    if path.exists() { "" } else { " (not found)" }
}

fn handle_progress(paper_id: PaperId, source: &ConfigSource<'_>) -> anyhow::Result<()> {
    let config = source.load()?;
    let store = ProgressStore::from_config(&config.storage)?;
    match store.load(paper_id) {
        Some(progress) => crate::render::print_progress(&progress),
        None => println!("No saved assessment progress for paper {paper_id}."),
    }
    Ok(())
}

struct SynthesisRequest {
    paper_ids: Vec<PaperId>,
    kinds: Vec<AnalysisKind>,
    subgroup: Option<String>,
    plots: Option<PathBuf>,
    json: bool,
}

/// Every analysis when none is named; subgroups only with a variable.
fn requested_kinds(mut kinds: Vec<AnalysisKind>, has_subgroup: bool) -> Vec<AnalysisKind> {
    if kinds.is_empty() {
        kinds = AnalysisKind::ALL
            .into_iter()
            .filter(|&k| k != AnalysisKind::Subgroups || has_subgroup)
            .collect();
    }
    kinds.sort();
    kinds.dedup();
    kinds
}

async fn handle_synthesize(request: SynthesisRequest, config: &CopilotConfig) -> anyhow::Result<()> {
    // JSON output already carries each failure, so alerts only go to the log.
    let notifier: Arc<dyn Notifier> = if request.json {
        Arc::new(LogNotifier)
    } else {
        Arc::new(ConsoleNotifier::new(false))
    };
    let bus = EventBus::new();
    let mut host = CopilotHost::attach(&bus, HostContext::from_config(config, notifier)?);
    bus.publish(&CopilotEvent::OpenSynthesis {
        paper_ids: request.paper_ids.clone(),
    });
    host.detach();

    let Some(Panel::Synthesis(orch)) = host.next_panel().await else {
        anyhow::bail!("Synthesis needs at least two distinct papers");
    };

    let wants = |kind: AnalysisKind| request.kinds.contains(&kind);
    let variable = request.subgroup.as_deref().unwrap_or_default();

    // Independent analyses first, all at once.
    let meta: OptionFuture<_> = wants(AnalysisKind::MetaAnalysis)
        .then(|| orch.run_meta_analysis())
        .into();
    let conflicts: OptionFuture<_> = wants(AnalysisKind::Conflicts)
        .then(|| orch.detect_conflicts_default())
        .into();
    let subgroups: OptionFuture<_> = wants(AnalysisKind::Subgroups)
        .then(|| orch.run_subgroup_analysis(variable))
        .into();
    let (meta, conflicts, subgroups) = tokio::join!(meta, conflicts, subgroups);
    report(AnalysisKind::MetaAnalysis, meta);
    report(AnalysisKind::Conflicts, conflicts);
    report(AnalysisKind::Subgroups, subgroups);

    // Then the analyses gated on the meta-analysis.
    let bias: OptionFuture<_> = wants(AnalysisKind::Bias)
        .then(|| orch.assess_bias())
        .into();
    let sensitivity: OptionFuture<_> = wants(AnalysisKind::Sensitivity)
        .then(|| orch.run_sensitivity())
        .into();
    let (bias, sensitivity) = tokio::join!(bias, sensitivity);
    report(AnalysisKind::Bias, bias);
    report(AnalysisKind::Sensitivity, sensitivity);

    if request.json {
        crate::render::print_synthesis_json(&orch, &request.kinds)?;
    } else {
        for &kind in &request.kinds {
            orch.select_tab(kind);
            crate::render::print_analysis(&orch, orch.active_tab());
        }
    }

    if let Some(dir) = &request.plots {
        let written = crate::render::write_plots(&orch, dir)?;
        for path in written {
            eprintln!("  wrote {}", path.display());
        }
    }
    Ok(())
}

fn report<T>(kind: AnalysisKind, result: Option<Result<GuardOutcome<T>, ValidationError>>) {
    match result {
        Some(Err(e)) => eprintln!("  {kind} skipped: {e}"),
        Some(Ok(GuardOutcome::Rejected)) => eprintln!("  {kind} is already running"),
        _ => {}
    }
}
