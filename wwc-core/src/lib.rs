//! # WWC Copilot Core
//!
//! Orchestration layer for the WWC research-synthesis client.
//! Provides the resumable quality-assessment wizard, the synthesis
//! orchestrator with its cached analyses, single-flight guards around every
//! remote call, local progress persistence, the panel event bus, and
//! configuration.

pub mod alerts;
pub mod config;
pub mod error;
pub mod events;
pub mod guard;
pub mod host;
pub mod persistence;
pub mod progress;
pub mod remote;
pub mod synthesis;
pub mod types;
pub mod wizard;

mod sync;

// Re-export commonly used types at the crate root.
pub use alerts::{AlertLatch, LogNotifier, Notifier, RecordingNotifier};
pub use config::{AnalysisConfig, CopilotConfig, ServerConfig, StorageConfig};
pub use error::{ConfigError, CopilotError, RemoteError, Result, StoreError, ValidationError};
pub use events::{CopilotEvent, EventBus, Subscription};
pub use guard::{AsyncGuard, GuardOutcome};
pub use host::{CopilotHost, HostContext, Panel};
pub use persistence::{FileStore, KeyValueStore, MemoryStore};
pub use progress::{ProgressStore, WizardProgress};
pub use remote::models::{Assessment, RatingBadge, WwcRating};
pub use remote::{Endpoint, HttpTransport, MockTransport, ResearchClient, Transport};
pub use synthesis::{AnalysisStatus, AnalysisView, SynthesisOptions, SynthesisOrchestrator};
pub use types::{AnalysisKind, AttritionBoundary, Judgments, PaperId, PaperSelection, Step};
pub use wizard::{AssessmentWizard, WizardView};
