//! Safetensors I/O for epoched data and spectral results.
//!
//! Reader: `epochs.safetensors` with keys
//!
//! | key        | dtype     | shape       |            |
//! |------------|-----------|-------------|------------|
//! | `epochs`   | F32 / F64 | `[E, C, T]` | required   |
//! | `sfreq`    | F32 / F64 | `[1]`       | required   |
//! | `tmin`     | F32 / F64 | `[1]`       | default 0  |
//! | `ch_names` | U8        | `[n]`       | newline-separated, default `ch0..` |
//!
//! Writers: [`EpochedSeries::save`] (same layout, F64), [`PsdResult::save`]
//! (`freqs`, `psd`) and [`TfrResult::save`] (`freqs`, `times`, `power`,
//! optional `itc`).
use anyhow::{bail, Context, Result};
use ndarray::Array3;
use std::collections::HashMap;
use std::path::Path;

use crate::epochs::{default_names, EpochedSeries};
use crate::psd::{PsdData, PsdResult};
use crate::tfr::TfrResult;

// ── Low-level safetensors parser (raw bytes → Vec<f64>) ──────────────────

type Header = HashMap<String, serde_json::Value>;

fn parse_header(bytes: &[u8]) -> Result<(Header, usize)> {
    if bytes.len() < 8 {
        bail!("safetensors file too small");
    }
    let mut len = [0u8; 8];
    len.copy_from_slice(&bytes[..8]);
    let n = u64::from_le_bytes(len);
    let end = usize::try_from(n).ok().and_then(|n| n.checked_add(8));
    let Some(end) = end.filter(|&end| end <= bytes.len()) else {
        bail!("safetensors header claims {n} bytes, file has {}", bytes.len() - 8);
    };
    let mut header: Header =
        serde_json::from_slice(&bytes[8..end]).context("failed to parse safetensors header")?;
    header.remove("__metadata__");
    Ok((header, end))
}

fn tensor_bytes<'a>(
    bytes: &'a [u8],
    data_start: usize,
    entry: &serde_json::Value,
) -> Result<&'a [u8]> {
    let offsets = entry["data_offsets"]
        .as_array()
        .context("tensor entry without data_offsets")?;
    let (Some(s), Some(e)) = (
        offsets.first().and_then(|v| v.as_u64()),
        offsets.get(1).and_then(|v| v.as_u64()),
    ) else {
        bail!("malformed data_offsets {offsets:?}");
    };
    let abs = |off: u64| usize::try_from(off).ok().and_then(|o| data_start.checked_add(o));
    match (abs(s), abs(e)) {
        (Some(s), Some(e)) if s <= e && e <= bytes.len() => Ok(&bytes[s..e]),
        _ => bail!("tensor data [{s}, {e}) outside file of {} bytes", bytes.len()),
    }
}

/// Read an F32 or F64 tensor, widened to `f64`.
fn read_float_tensor(
    bytes: &[u8],
    data_start: usize,
    entry: &serde_json::Value,
) -> Result<Vec<f64>> {
    let raw = tensor_bytes(bytes, data_start, entry)?;
    match entry["dtype"].as_str() {
        Some("F32") => Ok(raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect()),
        Some("F64") => Ok(raw
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect()),
        other => bail!("expected an F32 or F64 tensor, got {other:?}"),
    }
}

fn shape_of(entry: &serde_json::Value) -> Result<Vec<usize>> {
    entry["shape"]
        .as_array()
        .context("tensor entry without shape")?
        .iter()
        .map(|v| v.as_u64().map(|d| d as usize).context("non-integer dimension"))
        .collect()
}

fn read_scalar(bytes: &[u8], data_start: usize, header: &Header, key: &str) -> Result<Option<f64>> {
    let Some(entry) = header.get(key) else {
        return Ok(None);
    };
    let v = read_float_tensor(bytes, data_start, entry)
        .with_context(|| format!("reading '{key}'"))?;
    match v.first() {
        Some(&x) => Ok(Some(x)),
        None => bail!("'{key}' is empty"),
    }
}

impl EpochedSeries {
    /// Load epochs from a safetensors file (see the [module docs](crate::io)).
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let (header, data_start) = parse_header(&bytes)?;

        let entry = header.get("epochs").context("missing 'epochs' key")?;
        let shape = shape_of(entry)?;
        let &[n_e, n_c, n_t] = shape.as_slice() else {
            bail!("'epochs' must be [E, C, T], got shape {shape:?}");
        };
        let values = read_float_tensor(&bytes, data_start, entry).context("reading 'epochs'")?;
        let data = Array3::from_shape_vec((n_e, n_c, n_t), values)?;

        let sfreq = read_scalar(&bytes, data_start, &header, "sfreq")?
            .context("missing 'sfreq' key")?;
        let tmin = read_scalar(&bytes, data_start, &header, "tmin")?.unwrap_or(0.0);

        // Channel names are optional.
        let ch_names = if let Some(e) = header.get("ch_names") {
            let raw_str = std::str::from_utf8(tensor_bytes(&bytes, data_start, e)?)?;
            raw_str
                .split('\n')
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        } else {
            default_names(n_c)
        };

        Ok(EpochedSeries::new(data, sfreq, tmin, ch_names)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut w = StWriter::new();
        let data = self.data();
        w.add_f64("epochs", &data.iter().copied().collect::<Vec<_>>(), data.shape());
        w.add_f64("sfreq", &[self.sfreq()], &[1]);
        w.add_f64("tmin", &[self.tmin()], &[1]);
        w.add_u8("ch_names", self.ch_names().join("\n").as_bytes());
        w.write(path)
    }
}

impl PsdResult {
    /// Write `freqs` `[F]` and `psd` (`[E, C, F]` or `[E, C, F, S]`).
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut w = StWriter::new();
        w.add_f64("freqs", &self.freqs, &[self.freqs.len()]);
        let (values, shape): (Vec<f64>, &[usize]) = match &self.data {
            PsdData::Averaged(a) => (a.iter().copied().collect(), a.shape()),
            PsdData::Segments(a) => (a.iter().copied().collect(), a.shape()),
        };
        w.add_f64("psd", &values, shape);
        w.write(path)
    }
}

impl TfrResult {
    /// Write `freqs`, `times`, `power` `[C, F, T]` and, when present, `itc`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut w = StWriter::new();
        w.add_f64("freqs", &self.freqs, &[self.freqs.len()]);
        w.add_f64("times", &self.times, &[self.times.len()]);
        w.add_f64_arr3("power", &self.power);
        if let Some(itc) = &self.itc {
            w.add_f64_arr3("itc", itc);
        }
        w.write(path)
    }
}

// ── Generic safetensors builder ──────────────────────────────────────────────

/// Simple safetensors file writer that handles F32, F64, I32 and U8 tensors.
///
/// Usage:
/// ```rust,no_run
/// use exg_spectral::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f32("signal", &[1.0f32, 2.0, 3.0], &[1, 3]);
/// w.add_f64("signal_d", &[1.0f64, 2.0, 3.0], &[1, 3]);
/// w.add_u8("ch_names", b"Fz\nCz");
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

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F64", shape.to_vec()));
    }

    pub fn add_f64_arr3(&mut self, name: &str, arr: &Array3<f64>) {
        let data: Vec<f64> = arr.iter().copied().collect();
        self.add_f64(name, &data, arr.shape());
    }

    pub fn add_i32(&mut self, name: &str, data: &[i32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "I32", shape.to_vec()));
    }

    pub fn add_u8(&mut self, name: &str, data: &[u8]) {
        self.entries.push((name.to_string(), data.to_vec(), "U8", vec![data.len()]));
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        use std::io::Write;
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
        let mut f = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        f.write_all(&(padded.len() as u64).to_le_bytes())?;
        f.write_all(&padded)?;
        for (_, data, _, _) in &self.entries {
            f.write_all(data)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_padded_to_eight_bytes() {
        let path = std::env::temp_dir().join("exg_spectral_io_header.safetensors");
        let mut w = StWriter::new();
        w.add_i32("n", &[7], &[1]);
        w.add_u8("name", b"Cz");
        w.write(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let (header, start) = parse_header(&bytes).unwrap();
        assert_eq!(start % 8, 0);
        assert_eq!(header["n"]["dtype"], "I32");
        assert_eq!(tensor_bytes(&bytes, start, &header["name"]).unwrap(), b"Cz");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn f32_tensors_are_widened() {
        let path = std::env::temp_dir().join("exg_spectral_io_f32.safetensors");
        let mut w = StWriter::new();
        w.add_f32("epochs", &[0.5, -1.25, 2.0, 4.0], &[1, 2, 2]);
        w.add_f32("sfreq", &[100.0], &[1]);
        w.write(&path).unwrap();
        let x = EpochedSeries::load(&path).unwrap();
        assert_eq!(x.data().shape(), &[1, 2, 2]);
        assert_eq!(x.data()[[0, 0, 1]], -1.25);
        assert_eq!(x.sfreq(), 100.0);
        assert_eq!(x.tmin(), 0.0);
        assert_eq!(x.ch_names(), &["ch0".to_string(), "ch1".to_string()]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn truncated_file_is_rejected() {
        assert!(parse_header(&[1, 2, 3]).is_err());
        let mut bytes = 100u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"{}");
        assert!(parse_header(&bytes).is_err());

        let mut huge = u64::MAX.to_le_bytes().to_vec();
        huge.extend_from_slice(b"{}");
        assert!(parse_header(&huge).is_err());

        let file = [0u8; 16];
        let entry = serde_json::json!({ "dtype": "F64", "data_offsets": [u64::MAX - 4, u64::MAX] });
        assert!(tensor_bytes(&file, 8, &entry).is_err());
        let entry = serde_json::json!({ "dtype": "F64", "data_offsets": [8, 0] });
        assert!(tensor_bytes(&file, 8, &entry).is_err());
        let entry = serde_json::json!({ "dtype": "F64", "data_offsets": [0, 8] });
        assert_eq!(tensor_bytes(&file, 8, &entry).unwrap().len(), 8);
    }
}
