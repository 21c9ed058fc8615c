//! Collision-free artifact names.
//!
//! Every file a batch writes is named
//! `<model>_<timestamp>_<uuid8>_<NN>-<stage>.<ext>` inside the run directory.
//! The timestamp and run UUID are fixed per invocation, so names within one
//! batch differ by model, index and stage, and two invocations sharing a
//! directory differ by UUID. A corrected artifact is
//! `<model>_<timestamp>_<uuid8>_<NN>-<stage>.fixed.<ext>`; stage names and
//! extensions never contain `.`, so it cannot match any stage output.

use std::io;

use boidfactory_config::OutputLocation;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Local};
use uuid::Uuid;

/// Timestamp format used in run directory and artifact names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Prefix of generated run directories.
pub const RUN_DIR_PREFIX: &str = "boids-";

/// Marker inserted before the extension of a corrected artifact.
pub const CORRECTED_SUFFIX: &str = "fixed";

/// Issues artifact paths for one batch.
#[derive(Debug, Clone)]
pub struct NamingAuthority {
    run_dir: Utf8PathBuf,
    timestamp: String,
    run_uuid: Uuid,
    index_width: usize,
}

impl NamingAuthority {
    /// `max_index` is the largest run index the batch will use; indices are
    /// zero-padded to its width (at least two digits) so names sort.
    #[must_use]
    pub fn new(run_dir: Utf8PathBuf, started_at: DateTime<Local>, run_uuid: Uuid, max_index: u32) -> Self {
        Self {
            run_dir,
            timestamp: started_at.format(TIMESTAMP_FORMAT).to_string(),
            run_uuid,
            index_width: max_index.to_string().len().max(2),
        }
    }

    /// The run directory for a batch started at `started_at`.
    #[must_use]
    pub fn run_dir_for(location: &OutputLocation, started_at: DateTime<Local>) -> Utf8PathBuf {
        match location {
            OutputLocation::Exact(dir) => dir.clone(),
            OutputLocation::Root(root) => root.join(format!(
                "{RUN_DIR_PREFIX}{}",
                started_at.format(TIMESTAMP_FORMAT)
            )),
        }
    }

    #[must_use]
    pub fn run_dir(&self) -> &Utf8Path {
        &self.run_dir
    }

    #[must_use]
    pub fn run_uuid(&self) -> Uuid {
        self.run_uuid
    }

    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Create the run directory if needed. Safe to call repeatedly and from
    /// several processes.
    pub fn ensure_run_dir(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.run_dir)
    }

    /// Path of `stage`'s output for job `run_index` of `model_id`.
    #[must_use]
    pub fn name_for(&self, model_id: &str, run_index: u32, stage: &str, extension: &str) -> Utf8PathBuf {
        self.run_dir
            .join(format!("{}-{stage}.{extension}", self.stem_for(model_id, run_index)))
    }

    /// Path of the corrected artifact derived from the final stage's output.
    #[must_use]
    pub fn corrected_name_for(&self, model_id: &str, run_index: u32, stage: &str, extension: &str) -> Utf8PathBuf {
        self.run_dir.join(format!(
            "{}-{stage}.{CORRECTED_SUFFIX}.{extension}",
            self.stem_for(model_id, run_index)
        ))
    }

    /// `<model>_<timestamp>_<uuid8>_<NN>`, shared by every file of one job.
    #[must_use]
    pub fn stem_for(&self, model_id: &str, run_index: u32) -> String {
        let uuid = self.run_uuid.simple().to_string();
        format!(
            "{}_{}_{}_{:0width$}",
            sanitize_model(model_id),
            self.timestamp,
            &uuid[..8],
            run_index,
            width = self.index_width
        )
    }
}

/// Make a model identifier safe for a file name.
///
/// Characters outside `[A-Za-z0-9._-]` become `-`. When anything was
/// replaced a short digest of the original id is appended, so ids that
/// differ only in replaced characters (`a:b` and `a/b`) stay distinct.
#[must_use]
pub fn sanitize_model(model_id: &str) -> String {
    let cleaned: String = model_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();

    if cleaned == model_id && !cleaned.is_empty() {
        return cleaned;
    }
    let digest = blake3::hash(model_id.as_bytes()).to_hex();
    format!("{cleaned}-{}", &digest.as_str()[..6])
}
