use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use serde::Serialize;
use uuid::Uuid;

/// Terminal state of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum JobStatus {
    Completed,
    /// The chain succeeded but the final output held no document.
    EmptyArtifact,
    Failed {
        stage: Option<String>,
        error: String,
    },
}

impl JobStatus {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub model: String,
    pub index: u32,
    pub status: JobStatus,
    /// Every stage output path, by stage name. Paths of stages that never ran
    /// do not exist on disk.
    pub stage_paths: BTreeMap<String, Utf8PathBuf>,
    pub final_path: Utf8PathBuf,
    /// Set only when a corrected artifact was written.
    pub corrected_path: Option<Utf8PathBuf>,
    pub elapsed_ms: u64,
}

/// Outcome of a whole batch, in model order then run index order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub run_dir: Utf8PathBuf,
    pub run_uuid: Uuid,
    pub jobs: Vec<JobReport>,
}

impl BatchSummary {
    #[must_use]
    pub fn completed(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Completed))
    }

    #[must_use]
    pub fn empty_artifacts(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::EmptyArtifact))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(JobStatus::is_failed)
    }

    fn count(&self, pred: impl Fn(&JobStatus) -> bool) -> usize {
        self.jobs.iter().filter(|j| pred(&j.status)).count()
    }

    /// Final artifacts written by successful jobs, with corrected versions
    /// right after their originals.
    #[must_use]
    pub fn artifacts(&self) -> Vec<&Utf8PathBuf> {
        self.jobs
            .iter()
            .filter(|j| !j.status.is_failed())
            .flat_map(|j| std::iter::once(&j.final_path).chain(j.corrected_path.as_ref()))
            .collect()
    }
}
