//! Trial and record stores.
//!
//! [`TrialStore`] loads one unit's epochs, [`RecordStore`] persists one unit's
//! evoked records in order. [`FileStore`] implements both over a derivatives
//! directory:
//!
//! ```text
//! <root>/sub-01/ses-a/sub-01_ses-a_task-audvis_proc-clean_epo.safetensors   (input)
//! <root>/sub-01/ses-a/sub-01_ses-a_task-audvis_ave.safetensors              (output)
//! ```
use std::path::PathBuf;

use crate::config::{PipelineConfig, Unit};
use crate::epochs::Epochs;
use crate::error::{EvokedError, Result};
use crate::io;
use crate::output::OutputSet;

/// Source of per-unit trial collections.
pub trait TrialStore: Sync {
    fn load(&self, unit: &Unit) -> Result<Epochs>;

    /// Where `load` reads from, for log messages.
    fn location(&self, unit: &Unit) -> PathBuf;
}

/// Sink for per-unit evoked records. Must keep record order and comments.
pub trait RecordStore: Sync {
    fn save(&self, unit: &Unit, records: &OutputSet) -> Result<()>;

    fn location(&self, unit: &Unit) -> PathBuf;
}

/// Safetensors files under a derivatives root.
#[derive(Debug, Clone)]
pub struct FileStore {
    pub root: PathBuf,
    pub task: String,
    /// Processing tag of the input files (`proc-<tag>`).
    pub processing: Option<String>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, task: impl Into<String>) -> Self {
        Self { root: root.into(), task: task.into(), processing: None }
    }

    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self {
            root: cfg.deriv_root.clone(),
            task: cfg.task.clone(),
            processing: cfg.processing.clone(),
        }
    }

    fn unit_dir(&self, unit: &Unit) -> PathBuf {
        let mut dir = self.root.join(format!("sub-{}", unit.subject));
        if let Some(ses) = &unit.session {
            dir.push(format!("ses-{ses}"));
        }
        dir
    }

    fn file_name(&self, unit: &Unit, processing: Option<&str>, suffix: &str) -> String {
        let mut stem = format!("{unit}_task-{}", self.task);
        if let Some(proc_) = processing {
            stem.push_str(&format!("_proc-{proc_}"));
        }
        format!("{stem}_{suffix}.safetensors")
    }

    pub fn epochs_path(&self, unit: &Unit) -> PathBuf {
        self.unit_dir(unit)
            .join(self.file_name(unit, self.processing.as_deref(), "epo"))
    }

    pub fn evoked_path(&self, unit: &Unit) -> PathBuf {
        self.unit_dir(unit).join(self.file_name(unit, None, "ave"))
    }
}

impl TrialStore for FileStore {
    fn load(&self, unit: &Unit) -> Result<Epochs> {
        let path = self.epochs_path(unit);
        io::read_epochs(&path).map_err(|e| EvokedError::Load { path, source: e.into() })
    }

    fn location(&self, unit: &Unit) -> PathBuf {
        self.epochs_path(unit)
    }
}

impl RecordStore for FileStore {
    fn save(&self, unit: &Unit, records: &OutputSet) -> Result<()> {
        let path = self.evoked_path(unit);
        io::write_evokeds(&path, &records.records()).map_err(|e| EvokedError::Write { path, source: e.into() })
    }

    fn location(&self, unit: &Unit) -> PathBuf {
        self.evoked_path(unit)
    }
}
