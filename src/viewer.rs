//! Hand-off of finished records to a display collaborator.
//!
//! When `interactive` is set the job passes every written record to a
//! [`Viewer`]. [`SummaryViewer`] logs where each response peaks.
use tracing::info;

use crate::config::Unit;
use crate::evoked::Evoked;

pub trait Viewer: Sync {
    fn show(&self, unit: &Unit, evoked: &Evoked);
}

/// Logs peak channel, latency and amplitude, plus the GFP maximum.
#[derive(Debug, Default, Clone, Copy)]
pub struct SummaryViewer;

impl Viewer for SummaryViewer {
    fn show(&self, unit: &Unit, evoked: &Evoked) {
        let Some((ch, t, value)) = evoked.peak() else {
            return;
        };
        let times = evoked.times();
        let ch_name = evoked
            .info
            .ch_names
            .get(ch)
            .cloned()
            .unwrap_or_else(|| format!("#{ch}"));
        let gfp_max = evoked.gfp().iter().copied().fold(0.0_f32, f32::max);
        info!(
            %unit,
            comment = %evoked.comment,
            nave = ?evoked.nave,
            "peak {value:.3e} at {ch_name}, {:.3} s; max GFP {gfp_max:.3e}",
            times[t],
        );
    }
}
