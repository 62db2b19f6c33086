//! Per-unit evoked job.
//!
//! A [`SubjectJob`] walks one subject/session through
//! `Pending → Loading → Averaging → Contrasting → Writing → Done`.
//! Any error moves it to `Failed` and nothing is written for the unit.
use std::fmt;
use tracing::{debug, info};

use crate::config::{ConditionSpec, Contrast, PipelineConfig, Unit};
use crate::epochs::Epochs;
use crate::error::{EvokedError, Result};
use crate::evoked::{average, contrast};
use crate::output::{OutputKey, OutputSet};
use crate::store::{RecordStore, TrialStore};
use crate::viewer::Viewer;

/// Step number of this stage in the sensor-level pipeline.
pub const STEP: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Loading,
    Averaging,
    Contrasting,
    Writing,
    Done,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Pending => "pending",
            JobState::Loading => "loading",
            JobState::Averaging => "averaging",
            JobState::Contrasting => "contrasting",
            JobState::Writing => "writing",
            JobState::Done => "done",
            JobState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Average every configured condition of `epochs`, in configuration order.
///
/// Under [`ConditionSpec::Renames`] each record is averaged from its source
/// label and the label is replaced by the new name in the comment.
pub fn average_conditions(epochs: &Epochs, conditions: &ConditionSpec) -> Result<OutputSet> {
    let mut out = OutputSet::new();
    for (name, source) in conditions.entries() {
        let selected = epochs.select(source)?;
        let mut evoked = average(&selected, source)?;
        if name != source {
            evoked.comment = evoked.comment.replace(source, name);
        }
        out.insert(OutputKey::Condition(name.to_string()), evoked);
    }
    Ok(out)
}

/// Append `positive − negative` for every contrast, in order.
///
/// # Errors
///
/// [`EvokedError::UnknownCondition`] when a contrast names a record that is
/// not in `out`.
pub fn add_contrasts(out: &mut OutputSet, contrasts: &[Contrast]) -> Result<()> {
    for c in contrasts {
        let pos = out
            .lookup(&c.0)
            .ok_or_else(|| EvokedError::UnknownCondition(c.0.clone()))?;
        let neg = out
            .lookup(&c.1)
            .ok_or_else(|| EvokedError::UnknownCondition(c.1.clone()))?;
        let diff = contrast(pos, neg)?;
        out.insert(OutputKey::Contrast(c.0.clone(), c.1.clone()), diff);
    }
    Ok(())
}

/// One subject/session run.
#[derive(Debug)]
pub struct SubjectJob {
    unit: Unit,
    state: JobState,
    failed_in: Option<JobState>,
}

impl SubjectJob {
    pub fn new(unit: Unit) -> Self {
        Self { unit, state: JobState::Pending, failed_in: None }
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// The state the job was in when it failed.
    pub fn failed_in(&self) -> Option<JobState> {
        self.failed_in
    }

    fn enter(&mut self, state: JobState) {
        debug!(step = STEP, unit = %self.unit, from = %self.state, to = %state, "state change");
        self.state = state;
    }

    /// Run the job to completion, returning the records it wrote.
    pub fn run(
        &mut self,
        cfg: &PipelineConfig,
        trials: &dyn TrialStore,
        records: &dyn RecordStore,
        viewer: Option<&dyn Viewer>,
    ) -> Result<OutputSet> {
        match self.execute(cfg, trials, records, viewer) {
            Ok(out) => {
                self.enter(JobState::Done);
                Ok(out)
            }
            Err(e) => {
                self.failed_in = Some(self.state);
                self.enter(JobState::Failed);
                Err(e)
            }
        }
    }

    fn execute(
        &mut self,
        cfg: &PipelineConfig,
        trials: &dyn TrialStore,
        records: &dyn RecordStore,
        viewer: Option<&dyn Viewer>,
    ) -> Result<OutputSet> {
        let subject = self.unit.subject.clone();
        let session = self.unit.session.clone();
        info!(
            step = STEP, %subject, ?session,
            "Input: {}, Output: {}",
            trials.location(&self.unit).display(),
            records.location(&self.unit).display(),
        );

        self.enter(JobState::Loading);
        let epochs = trials.load(&self.unit)?;

        self.enter(JobState::Averaging);
        info!(step = STEP, %subject, ?session, "Creating evoked data based on experimental conditions …");
        let mut out = average_conditions(&epochs, &cfg.conditions)?;
        drop(epochs);

        if !cfg.contrasts.is_empty() {
            self.enter(JobState::Contrasting);
            info!(step = STEP, %subject, ?session, "Contrasting evoked responses …");
            add_contrasts(&mut out, &cfg.contrasts)?;
        }

        self.enter(JobState::Writing);
        records.save(&self.unit, &out)?;
        info!(step = STEP, %subject, ?session, n_records = out.len(), "wrote evoked data");

        if cfg.interactive {
            if let Some(viewer) = viewer {
                for ev in out.records() {
                    viewer.show(&self.unit, ev);
                }
            }
        }
        Ok(out)
    }
}
