//! Labelled trial collections and condition selection.
//!
//! An [`Epochs`] holds every trial of one subject/session as a single
//! `[E, C, T]` array, so all trials share the same channel and sample count
//! by construction. Each trial carries a condition label such as
//! `"auditory/left"`.
use ndarray::{Array3, Axis};

use crate::error::{EvokedError, Result};

/// Measurement info shared by all trials of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochsInfo {
    /// Channel names, one per row of every trial. May be empty.
    pub ch_names: Vec<String>,
    /// Sampling rate in Hz.
    pub sfreq: f32,
    /// Time of the first sample relative to the event, in seconds.
    pub tmin: f32,
}

impl Default for EpochsInfo {
    fn default() -> Self {
        Self { ch_names: vec![], sfreq: 1.0, tmin: 0.0 }
    }
}

impl EpochsInfo {
    /// Sample times in seconds for `n_times` samples.
    pub fn times(&self, n_times: usize) -> Vec<f32> {
        (0..n_times).map(|i| self.tmin + i as f32 / self.sfreq).collect()
    }
}

/// Trials of one unit: data `[E, C, T]` plus one label per trial.
#[derive(Debug, Clone)]
pub struct Epochs {
    data: Array3<f32>,
    labels: Vec<String>,
    info: EpochsInfo,
}

impl Epochs {
    /// Build a collection, checking labels and channel names against `data`.
    pub fn new(data: Array3<f32>, labels: Vec<String>, info: EpochsInfo) -> Result<Self> {
        let (n_epochs, n_ch, _) = data.dim();
        if labels.len() != n_epochs {
            return Err(EvokedError::InvalidEpochs(format!(
                "{} labels for {n_epochs} trials",
                labels.len()
            )));
        }
        if !info.ch_names.is_empty() && info.ch_names.len() != n_ch {
            return Err(EvokedError::InvalidEpochs(format!(
                "{} channel names for {n_ch} channels",
                info.ch_names.len()
            )));
        }
        Ok(Self { data, labels, info })
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn info(&self) -> &EpochsInfo {
        &self.info
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn n_channels(&self) -> usize {
        self.data.dim().1
    }

    pub fn n_times(&self) -> usize {
        self.data.dim().2
    }

    /// Distinct labels in order of first appearance.
    pub fn conditions(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for l in &self.labels {
            if !seen.contains(&l.as_str()) {
                seen.push(l);
            }
        }
        seen
    }

    /// Sub-collection of trials whose label matches `condition`.
    ///
    /// See [`matches_condition`] for the matching rule. Trial order is kept.
    ///
    /// # Errors
    ///
    /// [`EvokedError::UnknownCondition`] if no trial matches.
    pub fn select(&self, condition: &str) -> Result<Epochs> {
        let idx: Vec<usize> = self
            .labels
            .iter()
            .enumerate()
            .filter(|(_, l)| matches_condition(l, condition))
            .map(|(i, _)| i)
            .collect();
        if idx.is_empty() {
            return Err(EvokedError::UnknownCondition(condition.to_string()));
        }
        Ok(Epochs {
            data: self.data.select(Axis(0), &idx),
            labels: idx.iter().map(|&i| self.labels[i].clone()).collect(),
            info: self.info.clone(),
        })
    }
}

/// Whether a trial `label` belongs to the condition `query`.
///
/// Exact equality always matches. Otherwise labels and queries are split into
/// `/`-separated tags and the label matches when it carries every tag of the
/// query, so `"left"` selects both `"auditory/left"` and `"visual/left"`.
pub fn matches_condition(label: &str, query: &str) -> bool {
    if label == query {
        return true;
    }
    let tags: Vec<&str> = label.split('/').collect();
    query.split('/').all(|q| !q.is_empty() && tags.contains(&q))
}
