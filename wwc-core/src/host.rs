//! Host that turns bus requests into mounted panels.
//!
//! Handlers on the [`EventBus`] are synchronous, so the host's handler only
//! forwards each request into a channel. The owner of the host drains that
//! channel with [`CopilotHost::next_panel`] and gets back a ready panel.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::alerts::Notifier;
use crate::config::CopilotConfig;
use crate::error::Result;
use crate::events::{CopilotEvent, EventBus, Subscription};
use crate::progress::ProgressStore;
use crate::remote::{HttpTransport, ResearchClient};
use crate::synthesis::{SynthesisOptions, SynthesisOrchestrator};
use crate::types::PaperSelection;
use crate::wizard::AssessmentWizard;

/// A panel created in response to a bus request.
#[derive(Debug)]
pub enum Panel {
    Wizard(AssessmentWizard),
    Synthesis(SynthesisOrchestrator),
}

/// Everything a panel needs that outlives any single panel.
#[derive(Clone)]
pub struct HostContext {
    pub client: ResearchClient,
    pub store: ProgressStore,
    pub notifier: Arc<dyn Notifier>,
    pub options: SynthesisOptions,
}

impl std::fmt::Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl HostContext {
    /// Production context: HTTP transport to the configured server and a
    /// file-backed progress store.
    pub fn from_config(config: &CopilotConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let transport = HttpTransport::new(&config.server)?;
        Ok(Self {
            client: ResearchClient::new(Arc::new(transport)),
            store: ProgressStore::from_config(&config.storage)?,
            notifier,
            options: SynthesisOptions::from(&config.analysis),
        })
    }
}

pub struct CopilotHost {
    context: HostContext,
    requests: mpsc::UnboundedReceiver<CopilotEvent>,
    subscription: Option<Subscription>,
}

impl std::fmt::Debug for CopilotHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopilotHost")
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

impl CopilotHost {
    /// Subscribe to `bus` and start collecting panel requests.
    pub fn attach(bus: &EventBus<CopilotEvent>, context: HostContext) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = bus.subscribe(move |event: &CopilotEvent| {
            if tx.send(event.clone()).is_err() {
                warn!("Copilot host is gone, dropping request");
            }
        });
        Self {
            context,
            requests: rx,
            subscription: Some(subscription),
        }
    }

    /// Wait for the next valid request and mount its panel.
    ///
    /// Requests that cannot produce a panel (such as a synthesis over fewer
    /// than two papers) are logged and skipped. Returns `None` once the host
    /// is detached and every queued request has been handled.
    pub async fn next_panel(&mut self) -> Option<Panel> {
        while let Some(event) = self.requests.recv().await {
            if let Some(panel) = self.mount(event).await {
                return Some(panel);
            }
        }
        None
    }

    async fn mount(&self, event: CopilotEvent) -> Option<Panel> {
        match event {
            CopilotEvent::OpenAssessment {
                paper_id,
                paper_title,
            } => {
                info!(paper_id = %paper_id, "Mounting assessment wizard");
                let wizard = AssessmentWizard::open(
                    paper_id,
                    paper_title,
                    self.context.client.clone(),
                    self.context.store.clone(),
                    self.context.notifier.clone(),
                )
                .await;
                Some(Panel::Wizard(wizard))
            }
            CopilotEvent::OpenSynthesis { paper_ids } => match PaperSelection::new(paper_ids) {
                Ok(selection) => {
                    info!(papers = selection.len(), "Mounting synthesis");
                    Some(Panel::Synthesis(SynthesisOrchestrator::new(
                        selection,
                        self.context.options.clone(),
                        self.context.client.clone(),
                        self.context.notifier.clone(),
                    )))
                }
                Err(e) => {
                    warn!(error = %e, "Ignoring synthesis request");
                    None
                }
            },
        }
    }

    /// Stop receiving new requests. Already queued requests can still be drained.
    pub fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}
