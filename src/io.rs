//! Safetensors I/O for epochs and evoked files.
//!
//! Epochs file (`*_epo.safetensors`):
//!   data      [E, C, T]  F32
//!   labels    [n]        U8   newline-joined condition labels
//!   ch_names  [n]        U8   newline-joined channel names (optional)
//!   sfreq     [1]        F32
//!   tmin      [1]        F32
//!
//! Evoked file (`*_ave.safetensors`), records in write order:
//!   evoked_N   [C, T]    F32
//!   comment_N  [n]       U8
//!   nave       [K]       I32  −1 when unset
//!   n_evoked   [1]       I32
//!   ch_names, sfreq, tmin as above, taken from the first record
use anyhow::{bail, ensure, Context, Result};
use ndarray::{Array2, Array3};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use crate::epochs::{Epochs, EpochsInfo};
use crate::evoked::Evoked;

// ── Low-level safetensors parser (raw bytes → ndarray). ─────────────────────

struct StFile {
    bytes: Vec<u8>,
    header: HashMap<String, serde_json::Value>,
    data_start: usize,
}

impl StFile {
    fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        ensure!(bytes.len() >= 8, "safetensors file too small");
        let n = usize::try_from(u64::from_le_bytes(bytes[..8].try_into()?))?;
        let data_start = n
            .checked_add(8)
            .filter(|&end| end <= bytes.len())
            .context("truncated safetensors header")?;
        let header: HashMap<String, serde_json::Value> =
            serde_json::from_slice(&bytes[8..data_start]).context("failed to parse safetensors header")?;
        Ok(Self { bytes, header, data_start })
    }

    fn entry(&self, name: &str) -> Result<&serde_json::Value> {
        self.header.get(name).with_context(|| format!("missing '{name}' key"))
    }

    fn has(&self, name: &str) -> bool {
        self.header.contains_key(name)
    }

    fn raw(&self, name: &str) -> Result<&[u8]> {
        let entry = self.entry(name)?;
        let offsets = entry["data_offsets"]
            .as_array()
            .with_context(|| format!("'{name}': missing data_offsets"))?;
        let s = usize::try_from(offsets.first().and_then(|v| v.as_u64()).context("bad data_offsets")?)?;
        let e = usize::try_from(offsets.get(1).and_then(|v| v.as_u64()).context("bad data_offsets")?)?;
        let start = self.data_start.checked_add(s);
        let end = self.data_start.checked_add(e);
        match (start, end) {
            (Some(start), Some(end)) if start <= end && end <= self.bytes.len() => {
                Ok(&self.bytes[start..end])
            }
            _ => bail!("'{name}': data out of bounds"),
        }
    }

    fn shape(&self, name: &str) -> Result<Vec<usize>> {
        self.entry(name)?["shape"]
            .as_array()
            .with_context(|| format!("'{name}': missing shape"))?
            .iter()
            .map(|v| v.as_u64().map(|d| d as usize).context("bad shape"))
            .collect()
    }

    fn dtype(&self, name: &str) -> Result<&str> {
        self.entry(name)?["dtype"].as_str().context("missing dtype")
    }

    fn f32s(&self, name: &str) -> Result<Vec<f32>> {
        ensure!(self.dtype(name)? == "F32", "'{name}': expected F32");
        Ok(self
            .raw(name)?
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    fn i32s(&self, name: &str) -> Result<Vec<i32>> {
        ensure!(self.dtype(name)? == "I32", "'{name}': expected I32");
        Ok(self
            .raw(name)?
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    fn scalar_f32(&self, name: &str) -> Result<f32> {
        self.f32s(name)?.first().copied().with_context(|| format!("'{name}' is empty"))
    }

    fn string(&self, name: &str) -> Result<String> {
        Ok(std::str::from_utf8(self.raw(name)?)?.to_string())
    }

    fn lines(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.string(name)?.split('\n').filter(|s| !s.is_empty()).map(String::from).collect())
    }

    fn array2(&self, name: &str) -> Result<Array2<f32>> {
        let shape = self.shape(name)?;
        ensure!(shape.len() == 2, "'{name}': expected 2-D, got {shape:?}");
        Ok(Array2::from_shape_vec((shape[0], shape[1]), self.f32s(name)?)?)
    }

    fn info(&self) -> Result<EpochsInfo> {
        let ch_names = if self.has("ch_names") { self.lines("ch_names")? } else { vec![] };
        Ok(EpochsInfo {
            ch_names,
            sfreq: self.scalar_f32("sfreq")?,
            tmin: self.scalar_f32("tmin")?,
        })
    }
}

// ── Generic safetensors builder ─────────────────────────────────────────────

/// Simple safetensors file writer for F32, I32 and U8 tensors.
///
/// ```rust,no_run
/// use evoked::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f32("signal", &[1.0f32, 2.0, 3.0], &[1, 3]);
/// w.add_str("comment", "auditory/left");
/// w.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Default)]
pub struct StWriter {
    entries: Vec<(String, Vec<u8>, &'static str, Vec<usize>)>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_f32(&mut self, name: &str, data: &[f32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F32", shape.to_vec()));
    }

    pub fn add_f32_arr2(&mut self, name: &str, arr: &Array2<f32>) {
        let data: Vec<f32> = arr.iter().copied().collect();
        self.add_f32(name, &data, &[arr.nrows(), arr.ncols()]);
    }

    pub fn add_f32_arr3(&mut self, name: &str, arr: &Array3<f32>) {
        let data: Vec<f32> = arr.iter().copied().collect();
        self.add_f32(name, &data, arr.shape());
    }

    pub fn add_i32(&mut self, name: &str, data: &[i32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "I32", shape.to_vec()));
    }

    pub fn add_str(&mut self, name: &str, s: &str) {
        let bytes = s.as_bytes().to_vec();
        let n = bytes.len();
        self.entries.push((name.to_string(), bytes, "U8", vec![n]));
    }

    fn add_info(&mut self, info: &EpochsInfo) {
        if !info.ch_names.is_empty() {
            self.add_str("ch_names", &info.ch_names.join("\n"));
        }
        self.add_f32("sfreq", &[info.sfreq], &[1]);
        self.add_f32("tmin", &[info.tmin], &[1]);
    }

    /// Write to `path`, creating parent directories. The file is written
    /// under a temporary name first and renamed into place.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut header_map = serde_json::Map::new();
        let mut offset: usize = 0;
        for (name, data, dtype, shape) in &self.entries {
            header_map.insert(name.clone(), serde_json::json!({
                "dtype": dtype,
                "shape": shape,
                "data_offsets": [offset, offset + data.len()],
            }));
            offset += data.len();
        }
        let hdr_bytes = serde_json::to_vec(&header_map)?;
        let pad = (8 - hdr_bytes.len() % 8) % 8;
        let padded: Vec<u8> = hdr_bytes.into_iter()
            .chain(std::iter::repeat(b' ').take(pad))
            .collect();

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let tmp = path.with_extension("safetensors.part");
        {
            let mut f = std::fs::File::create(&tmp)
                .with_context(|| format!("creating {}", tmp.display()))?;
            f.write_all(&(padded.len() as u64).to_le_bytes())?;
            f.write_all(&padded)?;
            for (_, data, _, _) in &self.entries {
                f.write_all(data)?;
            }
            f.sync_all()?;
        }
        std::fs::rename(&tmp, path)
            .with_context(|| format!("moving {} into place", path.display()))?;
        Ok(())
    }
}

// ── Epochs ──────────────────────────────────────────────────────────────────

pub fn read_epochs(path: &Path) -> Result<Epochs> {
    let st = StFile::read(path)?;
    let shape = st.shape("data")?;
    if shape.len() != 3 {
        bail!("'data': expected [E, C, T], got {shape:?}");
    }
    let data = Array3::from_shape_vec((shape[0], shape[1], shape[2]), st.f32s("data")?)?;
    let labels = if shape[0] == 0 {
        vec![]
    } else {
        st.string("labels")?.split('\n').map(String::from).collect()
    };
    let epochs = Epochs::new(data, labels, st.info()?)?;
    Ok(epochs)
}

pub fn write_epochs(path: &Path, epochs: &Epochs) -> Result<()> {
    let mut w = StWriter::new();
    w.add_f32_arr3("data", epochs.data());
    w.add_str("labels", &epochs.labels().join("\n"));
    w.add_info(epochs.info());
    w.write(path)
}

// ── Evoked ──────────────────────────────────────────────────────────────────

/// Write `records` in order to one evoked file.
pub fn write_evokeds(path: &Path, records: &[&Evoked]) -> Result<()> {
    let first = records.first().context("no evoked records to write")?;
    let mut w = StWriter::new();
    for (i, ev) in records.iter().enumerate() {
        w.add_f32_arr2(&format!("evoked_{i}"), &ev.data);
        w.add_str(&format!("comment_{i}"), &ev.comment);
    }
    let nave = records
        .iter()
        .map(|ev| match ev.nave {
            Some(n) => i32::try_from(n).with_context(|| format!("nave {n} of '{}' exceeds I32", ev.comment)),
            None => Ok(-1),
        })
        .collect::<Result<Vec<i32>>>()?;
    let n_evoked = i32::try_from(records.len()).context("too many evoked records for I32")?;
    w.add_i32("nave", &nave, &[nave.len()]);
    w.add_i32("n_evoked", &[n_evoked], &[1]);
    w.add_info(&first.info);
    w.write(path)
}

/// Read every record of an evoked file, in the order written.
pub fn read_evokeds(path: &Path) -> Result<Vec<Evoked>> {
    let st = StFile::read(path)?;
    let n = usize::try_from(st.i32s("n_evoked")?.first().copied().context("'n_evoked' is empty")?)
        .context("negative 'n_evoked'")?;
    let nave = st.i32s("nave")?;
    ensure!(nave.len() == n, "'nave' has {} entries for {n} records", nave.len());
    let info = st.info()?;

    (0..n)
        .map(|i| -> Result<Evoked> {
            Ok(Evoked {
                data: st.array2(&format!("evoked_{i}"))?,
                comment: st.string(&format!("comment_{i}"))?,
                nave: usize::try_from(nave[i]).ok(),
                info: info.clone(),
            })
        })
        .collect()
}
