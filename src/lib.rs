//! # evoked — condition averages and contrasts from epoched EEG/MEG
//!
//! `evoked` turns per-trial segments ("epochs") into condition-averaged
//! responses ("evoked" data) and signed contrasts between conditions, one
//! subject/session at a time, for many subjects in parallel. It mirrors the
//! "Create evoked data" step of the MNE-BIDS sensor pipeline.
//!
//! ## Pipeline overview
//!
//! ```text
//! sub-01_task-audvis_epo.safetensors        [E, C, T] + one label per trial
//!   │
//!   ├─ Epochs::select()        trials whose label matches the condition
//!   ├─ average()               mean over trials → [C, T], nave = E
//!   ├─ (rename)                comment "auditory/left" → "left"
//!   ├─ contrast()              a − b, comment "a - b"
//!   └─ write_evokeds()         records in order: conditions, then contrasts
//!        │
//!        └─→ sub-01_task-audvis_ave.safetensors
//! ```
//!
//! ## Quick start
//!
//! ```
//! use evoked::{make_evoked, ConditionSpec, Contrast, Epochs, EpochsInfo};
//! use ndarray::Array3;
//!
//! // 2 trials of "A" at 1.0, 2 trials of "B" at 3.0, 1 channel × 3 samples
//! let data = Array3::from_shape_fn((4, 1, 3), |(e, _, _)| if e < 2 { 1.0 } else { 3.0 });
//! let labels = vec!["A".into(), "A".into(), "B".into(), "B".into()];
//! let epochs = Epochs::new(data, labels, EpochsInfo::default()).unwrap();
//!
//! let out = make_evoked(
//!     &epochs,
//!     &ConditionSpec::Labels(vec!["A".into(), "B".into()]),
//!     &[Contrast::new("A", "B")],
//! ).unwrap();
//!
//! let diff = out.lookup("A - B").unwrap();
//! assert_eq!(diff.data[[0, 0]], -2.0);
//! ```
//!
//! ## Running a batch
//!
//! ```no_run
//! use evoked::{BatchRunner, FileStore, PipelineConfig};
//! use std::path::Path;
//!
//! let cfg = PipelineConfig::load(Path::new("evoked.toml")).unwrap();
//! let store = FileStore::from_config(&cfg);
//! let report = BatchRunner::new(&cfg, &store, &store).run().unwrap();
//! println!("{} of {} units ok", report.n_ok(), report.outcomes.len());
//! ```

pub mod batch;
pub mod config;
pub mod epochs;
pub mod error;
pub mod evoked;
pub mod io;
pub mod job;
pub mod output;
pub mod store;
pub mod viewer;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config
pub use config::{ConditionSpec, Contrast, PipelineConfig, Rename, Unit};

// data
pub use epochs::{matches_condition, Epochs, EpochsInfo};
pub use evoked::{average, combine_evoked, contrast, Evoked};
pub use output::{OutputKey, OutputSet};

// errors
pub use error::{EvokedError, Result};

// orchestration
pub use batch::{BatchReport, BatchRunner, UnitOutcome};
pub use job::{add_contrasts, average_conditions, JobState, SubjectJob};

// collaborators
pub use io::{read_epochs, read_evokeds, write_epochs, write_evokeds, StWriter};
pub use store::{FileStore, RecordStore, TrialStore};
pub use viewer::{SummaryViewer, Viewer};

/// Average every condition of one unit and append the contrasts.
///
/// This is the whole computation of a [`SubjectJob`] without the loading and
/// writing around it. Records come out in write order: condition averages in
/// `conditions` order, then contrasts in `contrasts` order.
///
/// # Errors
///
/// * [`EvokedError::UnknownCondition`] if a condition matches no trial or a
///   contrast names a record that was not computed.
/// * [`EvokedError::ShapeMismatch`] if two records to contrast differ in shape.
pub fn make_evoked(
    epochs: &Epochs,
    conditions: &ConditionSpec,
    contrasts: &[Contrast],
) -> Result<OutputSet> {
    let mut out = average_conditions(epochs, conditions)?;
    add_contrasts(&mut out, contrasts)?;
    Ok(out)
}
