//! Averaging and linear combination of evoked responses.
//!
//! `average`        — elementwise mean over trials: `evoked[c, t] = mean_e(epochs[e, c, t])`
//! `combine_evoked` — weighted sum of records:     `out[c, t] = Σ wᵢ · evokedᵢ[c, t]`
//! `contrast`       — `combine_evoked` with weights `[+1, −1]`
use ndarray::{Array1, Array2, Axis};

use crate::epochs::{Epochs, EpochsInfo};
use crate::error::{EvokedError, Result};

/// One averaged (or combined) response, shape `[C, T]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Evoked {
    /// `[C, T]` signal.
    pub data: Array2<f32>,
    /// Display label.
    pub comment: String,
    /// Number of trials behind the record. For combinations this is the
    /// effective count; `None` when any input had none.
    pub nave: Option<usize>,
    pub info: EpochsInfo,
}

impl Evoked {
    /// `(channels, samples)`.
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn times(&self) -> Vec<f32> {
        self.info.times(self.data.ncols())
    }

    /// Global field power: standard deviation across channels at each sample.
    pub fn gfp(&self) -> Array1<f32> {
        self.data.std_axis(Axis(0), 0.0)
    }

    /// `(channel, sample, value)` of the largest absolute value.
    pub fn peak(&self) -> Option<(usize, usize, f32)> {
        self.data
            .indexed_iter()
            .max_by(|(_, a), (_, b)| a.abs().total_cmp(&b.abs()))
            .map(|((c, t), &v)| (c, t, v))
    }
}

/// Average all trials of `epochs` into one record labelled `comment`.
///
/// # Errors
///
/// [`EvokedError::EmptyAverage`] when `epochs` holds no trials.
pub fn average(epochs: &Epochs, comment: &str) -> Result<Evoked> {
    let data = epochs
        .data()
        .mean_axis(Axis(0))
        .ok_or_else(|| EvokedError::EmptyAverage(comment.to_string()))?;
    Ok(Evoked {
        data,
        comment: comment.to_string(),
        nave: Some(epochs.len()),
        info: epochs.info().clone(),
    })
}

/// Weighted sum of evoked records.
///
/// All records must share one `[C, T]` shape. Measurement info is taken from
/// the first record. When every input carries a trial count, the result's
/// count is `max(1, round(1 / Σ wᵢ² / naveᵢ))`.
///
/// # Errors
///
/// * [`EvokedError::EmptyAverage`] for an empty list.
/// * [`EvokedError::ShapeMismatch`] if any shape differs from the first.
pub fn combine_evoked(terms: &[(&Evoked, f32)]) -> Result<Evoked> {
    let (first, _) = terms
        .first()
        .ok_or_else(|| EvokedError::EmptyAverage("combination".to_string()))?;
    let shape = first.shape();

    let mut data = Array2::<f32>::zeros(shape);
    for (ev, w) in terms {
        if ev.shape() != shape {
            return Err(EvokedError::ShapeMismatch { left: shape, right: ev.shape() });
        }
        data.scaled_add(*w, &ev.data);
    }

    let nave = terms
        .iter()
        .map(|(ev, w)| ev.nave.map(|n| (*w as f64).powi(2) / n as f64))
        .sum::<Option<f64>>()
        .map(|s| if s > 0.0 { ((1.0 / s).round() as usize).max(1) } else { 1 });

    Ok(Evoked {
        data,
        comment: combined_comment(terms),
        nave,
        info: first.info.clone(),
    })
}

/// `a − b`, labelled `"<a> - <b>"`.
pub fn contrast(a: &Evoked, b: &Evoked) -> Result<Evoked> {
    combine_evoked(&[(a, 1.0), (b, -1.0)])
}

fn combined_comment(terms: &[(&Evoked, f32)]) -> String {
    let mut out = String::new();
    for (i, (ev, w)) in terms.iter().enumerate() {
        let name = ev.comment.as_str();
        let mag = w.abs();
        let term = if mag == 1.0 { name.to_string() } else { format!("{mag} × {name}") };
        match (i, *w < 0.0) {
            (0, false) => out.push_str(&term),
            (0, true) => out.push_str(&format!("-{term}")),
            (_, false) => out.push_str(&format!(" + {term}")),
            (_, true) => out.push_str(&format!(" - {term}")),
        }
    }
    out
}
