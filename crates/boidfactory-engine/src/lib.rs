//! Generation pipeline engine.
//!
//! A batch is `models x times` independent jobs. Each job drives one
//! [`StageChain`] through a [`Generator`], writes every stage's output to a
//! name issued by the [`NamingAuthority`], reduces the final output with the
//! [`ArtifactExtractor`], and optionally runs one corrective pass. The
//! [`JobScheduler`] bounds how many jobs run at once.

pub mod chain;
pub mod correction;
pub mod extract;
pub mod generator;
pub mod job;
pub mod models;
pub mod naming;
pub mod run_log;
pub mod scheduler;
pub mod stage;
pub mod summary;
pub mod template;

pub use chain::{ChainContext, ChainError, ChainOutput, DiscardSinks, StageChain, StageOutput, StageSinks};
pub use correction::{CommandDiagnostics, CorrectionError, CorrectionLoop, DiagnosticsSource};
pub use extract::{ArtifactExtractor, ExtractError};
pub use generator::{CliGenerator, GenerationRequest, Generator, GeneratorError};
pub use job::{Console, JobContext, RunJob};
pub use models::{CatalogError, ModelCatalog};
pub use naming::NamingAuthority;
pub use run_log::RunLog;
pub use scheduler::{BatchPlan, JobScheduler, SchedulerError};
pub use stage::{ComposedInstruction, Stage};
pub use summary::{BatchSummary, JobReport, JobStatus};
