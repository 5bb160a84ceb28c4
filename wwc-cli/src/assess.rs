//! Interactive assessment wizard driven by `dialoguer` prompts.

use dialoguer::Select;

use wwc_core::{
    AssessmentWizard, AttritionBoundary, CopilotEvent, CopilotHost, EventBus, GuardOutcome,
    HostContext, PaperId, Panel, Step,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Randomization,
    Boundary,
    Adjustment,
    RunAssessment,
    Next,
    Previous,
    Jump,
    Quit,
}

impl Action {
    fn label(self) -> &'static str {
        match self {
            Action::Randomization => "Answer: was randomization documented?",
            Action::Boundary => "Choose attrition boundary",
            Action::Adjustment => "Answer: is the adjustment strategy valid?",
            Action::RunAssessment => "Run assessment",
            Action::Next => "Next step",
            Action::Previous => "Previous step",
            Action::Jump => "Jump to step...",
            Action::Quit => "Save and quit",
        }
    }
}

/// Actions offered on `step`, most relevant first.
fn actions_for(step: Step) -> Vec<Action> {
    let mut actions = Vec::new();
    match step {
        Step::Randomization => actions.push(Action::Randomization),
        Step::Attrition => actions.push(Action::Boundary),
        Step::Baseline => {}
        Step::Adjustment => actions.push(Action::Adjustment),
        Step::Review => actions.push(Action::RunAssessment),
    }
    if step.next().is_some() {
        actions.push(Action::Next);
    }
    if step.previous().is_some() {
        actions.push(Action::Previous);
    }
    actions.push(Action::Jump);
    actions.push(Action::Quit);
    actions
}

fn ask_tri_state(prompt: &str, current: Option<bool>) -> anyhow::Result<Option<bool>> {
    let default = match current {
        Some(true) => 0,
        Some(false) => 1,
        None => 2,
    };
    let choice = Select::new()
        .with_prompt(prompt)
        .items(&["Yes", "No", "Not reported"])
        .default(default)
        .interact()?;
    Ok(match choice {
        0 => Some(true),
        1 => Some(false),
        _ => None,
    })
}

pub async fn run(
    paper_id: PaperId,
    title: Option<String>,
    context: HostContext,
) -> anyhow::Result<()> {
    let bus = EventBus::new();
    let mut host = CopilotHost::attach(&bus, context);
    bus.publish(&CopilotEvent::OpenAssessment {
        paper_id,
        paper_title: title,
    });
    host.detach();

    let Some(Panel::Wizard(wizard)) = host.next_panel().await else {
        anyhow::bail!("Could not open the assessment wizard for paper {paper_id}");
    };
    drive(&wizard).await
}

async fn drive(wizard: &AssessmentWizard) -> anyhow::Result<()> {
    loop {
        crate::render::print_wizard(&wizard.view());

        let actions = actions_for(wizard.step());
        let labels: Vec<&str> = actions.iter().map(|a| a.label()).collect();
        let choice = Select::new()
            .with_prompt("What next?")
            .items(&labels)
            .default(0)
            .interact()?;

        let judgments = wizard.judgments();
        match actions[choice] {
            Action::Randomization => {
                let value = ask_tri_state(
                    "Was the randomization procedure documented?",
                    judgments.randomization_documented,
                )?;
                wizard.set_randomization_documented(value);
            }
            Action::Boundary => {
                let default = match judgments.attrition_boundary {
                    AttritionBoundary::Cautious => 0,
                    AttritionBoundary::Optimistic => 1,
                };
                let choice = Select::new()
                    .with_prompt("Attrition boundary")
                    .items(&["Cautious", "Optimistic"])
                    .default(default)
                    .interact()?;
                wizard.set_attrition_boundary(if choice == 0 {
                    AttritionBoundary::Cautious
                } else {
                    AttritionBoundary::Optimistic
                });
            }
            Action::Adjustment => {
                let value = ask_tri_state(
                    "Is the statistical adjustment strategy valid?",
                    judgments.adjustment_strategy_valid,
                )?;
                wizard.set_adjustment_valid(value);
            }
            Action::RunAssessment => {
                if let GuardOutcome::Rejected = wizard.run_assessment().await {
                    println!("  An assessment is already running.");
                }
            }
            Action::Next => {
                wizard.next().await;
            }
            Action::Previous => {
                wizard.previous().await;
            }
            Action::Jump => {
                let titles: Vec<&str> = Step::ALL.iter().map(|s| s.title()).collect();
                let index = Select::new()
                    .with_prompt("Go to step")
                    .items(&titles)
                    .default(wizard.step().index())
                    .interact()?;
                wizard.go_to(Step::ALL[index]).await;
            }
            Action::Quit => {
                println!("  Progress saved for paper {}.", wizard.paper_id());
                return Ok(());
            }
        }
    }
}
