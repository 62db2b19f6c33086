//! Pipeline configuration.
//!
//! [`PipelineConfig`] holds every setting of the evoked stage. It is read once
//! from a TOML file before any unit runs and shared read-only by all workers.
//!
//! ```toml
//! deriv_root = "derivatives/mne-bids-pipeline"
//! task = "audvis"
//! subjects = ["01", "02"]
//! sessions = []
//! n_jobs = 4
//! contrasts = [["auditory/left", "auditory/right"]]
//!
//! [conditions]
//! labels = ["auditory/left", "auditory/right"]
//! ```
//!
//! Renaming conditions while averaging uses the other form:
//!
//! ```toml
//! [[conditions.renames]]
//! name = "left"
//! source = "auditory/left"
//! ```
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::EvokedError;

/// Which conditions to average, and under which names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionSpec {
    /// Average each label and keep its name.
    Labels(Vec<String>),
    /// Average `source` and store it under `name`, in list order.
    Renames(Vec<Rename>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rename {
    pub name: String,
    pub source: String,
}

impl Default for ConditionSpec {
    fn default() -> Self {
        ConditionSpec::Labels(vec![])
    }
}

impl ConditionSpec {
    /// `(output name, source label)` pairs in averaging order.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        match self {
            ConditionSpec::Labels(labels) => labels.iter().map(|l| (l.as_str(), l.as_str())).collect(),
            ConditionSpec::Renames(renames) => renames
                .iter()
                .map(|r| (r.name.as_str(), r.source.as_str()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ConditionSpec::Labels(l) => l.is_empty(),
            ConditionSpec::Renames(r) => r.is_empty(),
        }
    }
}

/// `positive − negative`, given as a two-element array in TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contrast(pub String, pub String);

impl Contrast {
    pub fn new(positive: impl Into<String>, negative: impl Into<String>) -> Self {
        Self(positive.into(), negative.into())
    }

    /// Name under which later contrasts can refer to this one.
    pub fn label(&self) -> String {
        format!("{} - {}", self.0, self.1)
    }
}

/// One subject/session to process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Unit {
    pub subject: String,
    pub session: Option<String>,
}

impl Unit {
    pub fn new(subject: impl Into<String>, session: Option<&str>) -> Self {
        Self { subject: subject.into(), session: session.map(str::to_string) }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.session {
            Some(ses) => write!(f, "sub-{}_ses-{ses}", self.subject),
            None => write!(f, "sub-{}", self.subject),
        }
    }
}

/// Configuration for the evoked stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Derivatives root holding the epochs files; evoked files are written
    /// next to them.
    pub deriv_root: PathBuf,

    /// Task name used in file names.
    pub task: String,

    pub subjects: Vec<String>,

    /// Sessions to process for every subject. Empty means the data has no
    /// session level.
    pub sessions: Vec<String>,

    /// Processing tag of the input epochs, e.g. `"clean"` after ICA/SSP.
    pub processing: Option<String>,

    pub conditions: ConditionSpec,

    /// Contrasts computed after all conditions, in order.
    pub contrasts: Vec<Contrast>,

    /// Worker threads. `0` lets the pool pick one per core.
    pub n_jobs: usize,

    /// Hand every record to a viewer after writing.
    pub interactive: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            deriv_root: PathBuf::from("derivatives"),
            task: "task".to_string(),
            subjects: vec![],
            sessions: vec![],
            processing: None,
            conditions: ConditionSpec::default(),
            contrasts: vec![],
            n_jobs: 1,
            interactive: false,
        }
    }
}

impl PipelineConfig {
    /// Read a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Every subject × session pair, subjects outermost.
    pub fn units(&self) -> Vec<Unit> {
        let mut units = Vec::new();
        for sub in &self.subjects {
            if self.sessions.is_empty() {
                units.push(Unit::new(sub.as_str(), None));
            } else {
                for ses in &self.sessions {
                    units.push(Unit::new(sub.as_str(), Some(ses.as_str())));
                }
            }
        }
        units
    }

    /// Check the condition and contrast settings before any unit runs.
    ///
    /// Every contrast must name condition outputs or earlier contrasts.
    pub fn validate(&self) -> Result<(), EvokedError> {
        if self.conditions.is_empty() {
            return Err(EvokedError::Config("no conditions configured".into()));
        }
        let mut known: Vec<String> = self
            .conditions
            .entries()
            .into_iter()
            .map(|(name, _)| name.to_string())
            .collect();
        for c in &self.contrasts {
            for name in [&c.0, &c.1] {
                if !known.contains(name) {
                    return Err(EvokedError::Config(format!(
                        "contrast `{}` refers to `{name}`, which is neither a condition nor an earlier contrast",
                        c.label()
                    )));
                }
            }
            known.push(c.label());
        }
        Ok(())
    }
}
