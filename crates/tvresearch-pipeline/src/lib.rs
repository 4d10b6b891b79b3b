//! # tvresearch Pipeline
//!
//! Orchestration core for the four-stage research workflow.
//!
//! ```text
//!  create(topic) ──► WorkflowRecord (queued)
//!        │
//!        ▼
//!  trend_research ──► news_aggregation ──► content_strategy ──► final_reporting
//!   (lane + job)        (enqueue_after)      (enqueue_after)      (enqueue_after)
//!        │                   │                    │                    │
//!        └──── status + partial result written to the RecordStore ─────┘
//! ```
//!
//! Each stage job is run by a worker of its lane. The [`PipelineCoordinator`]
//! writes the `<stage>_running` status, invokes the stage capability through
//! the [`StageExecutor`], records the outcome, and hands the accumulated
//! inputs to the next stage. A failure at any stage is terminal for the
//! record and nothing further is enqueued.

pub mod context;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod inputs;
pub mod job;
pub mod projector;
pub mod record;
pub mod service;
pub mod stage;
pub mod status;
pub mod store;

pub use context::{PipelineContext, PipelineSettings, StoreBackend};
pub use coordinator::{PipelineCoordinator, SkipReason, StageOutcome};
pub use error::{CapabilityError, PipelineError, StoreError};
pub use executor::{CapabilitySet, FnCapability, StageCapability, StageExecutor};
pub use inputs::{AccumulatedInputs, RequestParameters};
pub use job::StageJob;
pub use projector::{ExternalState, RecordView, StatusProjection, project};
pub use record::{RecordId, StatusUpdate, WorkflowRecord};
pub use service::{PipelineMetrics, QueueStatus, ResearchService};
pub use stage::StageKind;
pub use status::{StatusParseError, WorkflowStatus};
pub use store::{MemoryRecordStore, RecordStore, SqliteRecordStore};
