//! Batch driver: one [`SubjectJob`] per unit on a bounded thread pool.
//!
//! A unit's error (or panic) is logged and recorded for that unit only; the
//! other units keep running. The batch returns once every unit was attempted.
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, info};

use crate::config::{PipelineConfig, Unit};
use crate::error::{EvokedError, Result};
use crate::job::{JobState, SubjectJob, STEP};
use crate::store::{RecordStore, TrialStore};
use crate::viewer::Viewer;

/// Result of one unit.
#[derive(Debug)]
pub struct UnitOutcome {
    pub unit: Unit,
    /// Number of records written.
    pub result: Result<usize>,
    /// State the job failed in, if it failed inside the job.
    pub failed_in: Option<JobState>,
}

impl UnitOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-unit outcomes of a finished batch, in unit order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<UnitOutcome>,
}

impl BatchReport {
    pub fn n_ok(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &UnitOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    pub fn all_ok(&self) -> bool {
        self.outcomes.iter().all(UnitOutcome::is_ok)
    }
}

/// Runs the evoked stage over many units.
pub struct BatchRunner<'a> {
    cfg: &'a PipelineConfig,
    trials: &'a dyn TrialStore,
    records: &'a dyn RecordStore,
    viewer: Option<&'a dyn Viewer>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        cfg: &'a PipelineConfig,
        trials: &'a dyn TrialStore,
        records: &'a dyn RecordStore,
    ) -> Self {
        Self { cfg, trials, records, viewer: None }
    }

    pub fn with_viewer(mut self, viewer: &'a dyn Viewer) -> Self {
        self.viewer = Some(viewer);
        self
    }

    /// Process every unit of the configuration.
    pub fn run(&self) -> Result<BatchReport> {
        self.run_units(&self.cfg.units())
    }

    /// Process `units` with `cfg.n_jobs` workers.
    ///
    /// # Errors
    ///
    /// Only for problems that concern the whole batch: an invalid
    /// configuration or a thread pool that cannot be built. Unit failures are
    /// reported in the returned [`BatchReport`].
    pub fn run_units(&self, units: &[Unit]) -> Result<BatchReport> {
        self.cfg.validate()?;
        info!(step = STEP, n_units = units.len(), n_jobs = self.cfg.n_jobs, "Running Step {STEP}: Create evoked data");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.cfg.n_jobs)
            .thread_name(|i| format!("evoked-{i}"))
            .build()?;
        let outcomes: Vec<UnitOutcome> =
            pool.install(|| units.par_iter().map(|u| self.run_one(u)).collect());

        let report = BatchReport { outcomes };
        info!(
            step = STEP,
            n_ok = report.n_ok(),
            n_failed = report.outcomes.len() - report.n_ok(),
            "Completed Step {STEP}: Create evoked data"
        );
        Ok(report)
    }

    /// Run one unit, turning errors and panics into a failed outcome.
    fn run_one(&self, unit: &Unit) -> UnitOutcome {
        let mut job = SubjectJob::new(unit.clone());
        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            job.run(self.cfg, self.trials, self.records, self.viewer)
        }));
        let result = match caught {
            Ok(res) => res.map(|out| out.len()),
            Err(payload) => Err(EvokedError::Panicked(panic_message(&*payload))),
        };
        if let Err(e) = &result {
            error!(
                step = STEP,
                subject = %unit.subject,
                session = ?unit.session,
                state = ?job.failed_in(),
                "A critical error occurred: {}",
                error_chain(e),
            );
        }
        UnitOutcome { unit: unit.clone(), result, failed_in: job.failed_in() }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// `error: cause: cause …`
fn error_chain(e: &EvokedError) -> String {
    let mut msg = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
