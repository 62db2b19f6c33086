//! Shared helpers for the integration tests: synthetic epochs and an
//! in-memory store that can be told to fail for chosen units.
use evoked::{
    Epochs, EpochsInfo, Evoked, EvokedError, OutputSet, RecordStore, TrialStore, Unit, Viewer,
};
use ndarray::Array3;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

#[allow(unused)]
/// Build epochs with `n` trials per `(label, value)` pair, every sample set to
/// `value`, shape `[n_ch, n_t]` per trial.
pub fn constant_epochs(groups: &[(&str, usize, f32)], n_ch: usize, n_t: usize) -> Epochs {
    let total: usize = groups.iter().map(|g| g.1).sum();
    let mut data = Array3::<f32>::zeros((total, n_ch, n_t));
    let mut labels = Vec::with_capacity(total);
    let mut e = 0;
    for &(label, n, value) in groups {
        for _ in 0..n {
            data.index_axis_mut(ndarray::Axis(0), e).fill(value);
            labels.push(label.to_string());
            e += 1;
        }
    }
    let info = EpochsInfo {
        ch_names: (0..n_ch).map(|c| format!("EEG{c:03}")).collect(),
        sfreq: 100.0,
        tmin: -0.1,
    };
    Epochs::new(data, labels, info).unwrap()
}

#[allow(unused)]
/// Epochs used throughout: 10 × "A" at 1.0, 10 × "B" at 3.0, 1 ch × 3 samples.
pub fn ab_epochs() -> Epochs {
    constant_epochs(&[("A", 10, 1.0), ("B", 10, 3.0)], 1, 3)
}

/// In-memory trial and record store.
#[derive(Default)]
pub struct MemoryStore {
    pub epochs: HashMap<Unit, Epochs>,
    pub fail_load: HashSet<Unit>,
    pub fail_write: HashSet<Unit>,
    pub panic_load: HashSet<Unit>,
    pub written: Mutex<HashMap<Unit, OutputSet>>,
}

#[allow(unused)]
impl MemoryStore {
    pub fn with_units(units: &[Unit], epochs: &Epochs) -> Self {
        Self {
            epochs: units.iter().map(|u| (u.clone(), epochs.clone())).collect(),
            ..Self::default()
        }
    }

    pub fn written(&self, unit: &Unit) -> Option<OutputSet> {
        self.written.lock().unwrap().get(unit).cloned()
    }

    pub fn n_written(&self) -> usize {
        self.written.lock().unwrap().len()
    }
}

impl TrialStore for MemoryStore {
    fn load(&self, unit: &Unit) -> Result<Epochs, EvokedError> {
        if self.panic_load.contains(unit) {
            panic!("corrupt buffer for {unit}");
        }
        let path = TrialStore::location(self, unit);
        if self.fail_load.contains(unit) {
            return Err(EvokedError::Load { path, source: "simulated read failure".into() });
        }
        self.epochs
            .get(unit)
            .cloned()
            .ok_or_else(|| EvokedError::Load { path, source: "no such file".into() })
    }

    fn location(&self, unit: &Unit) -> PathBuf {
        PathBuf::from(format!("mem://{unit}_epo"))
    }
}

impl RecordStore for MemoryStore {
    fn save(&self, unit: &Unit, records: &OutputSet) -> Result<(), EvokedError> {
        if self.fail_write.contains(unit) {
            return Err(EvokedError::Write {
                path: RecordStore::location(self, unit),
                source: "disk full".into(),
            });
        }
        self.written.lock().unwrap().insert(unit.clone(), records.clone());
        Ok(())
    }

    fn location(&self, unit: &Unit) -> PathBuf {
        PathBuf::from(format!("mem://{unit}_ave"))
    }
}

#[allow(unused)]
/// Comments of the records in write order.
pub fn comments(out: &OutputSet) -> Vec<String> {
    out.records().iter().map(|e| e.comment.clone()).collect()
}

#[allow(unused)]
/// Viewer that remembers the comment of every record it was shown.
#[derive(Default)]
pub struct RecordingViewer {
    pub shown: Mutex<Vec<String>>,
}

#[allow(unused)]
impl RecordingViewer {
    pub fn shown(&self) -> Vec<String> {
        self.shown.lock().unwrap().clone()
    }
}

impl Viewer for RecordingViewer {
    fn show(&self, _unit: &Unit, evoked: &Evoked) {
        self.shown.lock().unwrap().push(evoked.comment.clone());
    }
}
