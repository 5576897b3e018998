//! Versioned single-file container for a built hypercube.
//!
//! Layout: the ASCII header line `HCUBEv<major>.<minor>\n` followed by a
//! zstd-compressed JSON record. The record carries the axes, the nonzero
//! spectral coefficients as parallel `indices`/`values` arrays, the topology
//! summary and the metadata map. Decoding goes through a fixed serde schema
//! and is validated field by field before anything reaches the engine.
//!
//! The field itself is not stored; loading reconstructs it from the spectrum.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hc_core::topology::{singularities, square_side};
use hc_core::{
    Axis, GridSpace, HypercubeConfig, ParametricHypercube, RATIO_KEY, SparseSpectrum,
    TopologySummary,
};

use crate::error::{Result, StoreError};

pub const FORMAT_MAJOR: u32 = 1;
pub const FORMAT_MINOR: u32 = 0;
/// Tag written in the header line and repeated inside the record.
pub const FORMAT_TAG: &str = "HCUBEv1.0";
/// zstd level used when the caller has no preference.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Header lines longer than this are not headers.
const MAX_HEADER_LEN: usize = 32;

/// Decompressed JSON allowed per grid cell. A retained coefficient is an index
/// and a float; a singularity is one index per axis.
const RECORD_BYTES_PER_CELL: usize = 128;
/// Decompressed JSON allowed on top of the per-cell budget (axes, metadata).
const RECORD_OVERHEAD_BYTES: usize = 1 << 20;

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^HCUBEv(\d+)\.(\d+)$").unwrap());

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireRecord {
    format: String,
    id: Uuid,
    axes: Vec<WireAxis>,
    spectrum: WireSpectrum,
    topology: WireTopology,
    metadata: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireAxis {
    name: String,
    lower: f64,
    upper: f64,
    samples: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireSpectrum {
    shape: Vec<usize>,
    compression_ratio: f64,
    threshold: f64,
    indices: Vec<usize>,
    values: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireTopology {
    euler_characteristic: i64,
    betti_numbers: [usize; 3],
    singularities: Vec<Vec<usize>>,
}

fn corrupt(msg: impl Into<String>) -> StoreError {
    StoreError::CorruptContainer(msg.into())
}

// ---------------------------------------------------------------------------
// Record <-> hypercube
// ---------------------------------------------------------------------------

fn to_record(cube: &ParametricHypercube) -> Result<WireRecord> {
    let (spectrum, topology) = match (cube.spectrum(), cube.topology()) {
        (Some(s), Some(t)) => (s, t),
        _ => {
            return Err(StoreError::InvalidData(format!(
                "hypercube {} has not been built",
                cube.id()
            )));
        }
    };

    let entries = spectrum.nonzero_entries();
    if let Some((index, _)) = entries.iter().find(|(_, v)| !v.is_finite()) {
        return Err(StoreError::InvalidData(format!(
            "coefficient {index} is not finite; the law produced NaN or infinity"
        )));
    }
    if !spectrum.threshold().is_finite() {
        return Err(StoreError::InvalidData(
            "spectrum threshold is not finite".to_string(),
        ));
    }
    if let Some((key, _)) = cube.metadata().iter().find(|(_, v)| !v.is_finite()) {
        return Err(StoreError::InvalidData(format!(
            "metadata '{key}' is not finite"
        )));
    }

    let (indices, values) = entries.into_iter().unzip();
    Ok(WireRecord {
        format: FORMAT_TAG.to_string(),
        id: cube.id(),
        axes: cube
            .grid()
            .axes()
            .iter()
            .map(|a| WireAxis {
                name: a.name.clone(),
                lower: a.lower,
                upper: a.upper,
                samples: a.samples,
            })
            .collect(),
        spectrum: WireSpectrum {
            shape: spectrum.shape().to_vec(),
            compression_ratio: spectrum.compression_ratio(),
            threshold: spectrum.threshold(),
            indices,
            values,
        },
        topology: WireTopology {
            euler_characteristic: topology.euler_characteristic,
            betti_numbers: topology.betti_numbers,
            singularities: topology.singularities.iter().cloned().collect(),
        },
        metadata: cube.metadata().clone(),
    })
}

/// Config for a container loaded without one: the stored ratio, and the
/// constants recovered from metadata.
fn config_from_record(record: &WireRecord) -> HypercubeConfig {
    let constants = record
        .metadata
        .iter()
        .filter(|(k, _)| k.as_str() != RATIO_KEY)
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    HypercubeConfig {
        compression_ratio: record.spectrum.compression_ratio,
        constants,
        ..HypercubeConfig::default()
    }
}

fn from_record(record: WireRecord, config: HypercubeConfig) -> Result<ParametricHypercube> {
    if record.format != FORMAT_TAG {
        return Err(corrupt(format!(
            "record tag '{}' does not match header {FORMAT_TAG}",
            record.format
        )));
    }

    let cells = record
        .axes
        .iter()
        .try_fold(1usize, |acc, a| acc.checked_mul(a.samples))
        .ok_or_else(|| corrupt(format!("{} axes: cell count overflows", record.axes.len())))?;
    if let Some(limit) = config.max_cells
        && cells > limit
    {
        return Err(corrupt(format!("{cells} cells exceeds max_cells {limit}")));
    }

    let axes: Vec<Axis> = record
        .axes
        .iter()
        .map(|a| Axis::new(&a.name, a.lower, a.upper, a.samples))
        .collect();
    let grid = GridSpace::new(axes).map_err(|e| corrupt(format!("axes: {e}")))?;
    let shape = grid.shape();

    let wire = record.spectrum;
    if wire.shape != shape {
        return Err(corrupt(format!(
            "spectrum shape {:?} does not match axes {shape:?}",
            wire.shape
        )));
    }
    if !(wire.compression_ratio > 0.0 && wire.compression_ratio <= 1.0) {
        return Err(corrupt(format!(
            "compression ratio {} outside (0, 1]",
            wire.compression_ratio
        )));
    }
    if !(wire.threshold.is_finite() && wire.threshold >= 0.0) {
        return Err(corrupt(format!("threshold {} is invalid", wire.threshold)));
    }
    if wire.indices.len() != wire.values.len() {
        return Err(corrupt(format!(
            "{} indices but {} values",
            wire.indices.len(),
            wire.values.len()
        )));
    }
    let entries: Vec<(usize, f64)> = wire.indices.into_iter().zip(wire.values).collect();
    let spectrum =
        SparseSpectrum::from_entries(wire.shape, &entries, wire.compression_ratio, wire.threshold)
            .map_err(|e| corrupt(format!("spectrum: {e}")))?;

    let topology = topology_from_wire(record.topology, &spectrum)?;

    let cube = ParametricHypercube::restore(
        record.id,
        grid,
        config,
        spectrum,
        topology,
        record.metadata,
    )
    .map_err(|e| corrupt(format!("restore: {e}")))?;
    Ok(cube)
}

fn topology_from_wire(wire: WireTopology, spectrum: &SparseSpectrum) -> Result<TopologySummary> {
    let shape = spectrum.shape();
    let nonzero = spectrum.nonzero_count();
    let sign: i64 = if shape.len() % 2 == 0 { 1 } else { -1 };
    if wire.euler_characteristic != sign * nonzero as i64 {
        return Err(corrupt(format!(
            "euler characteristic {} disagrees with {nonzero} retained coefficients",
            wire.euler_characteristic
        )));
    }

    let mut stored = BTreeSet::new();
    for index in wire.singularities {
        if index.len() != shape.len() || index.iter().zip(shape).any(|(i, n)| i >= n) {
            return Err(corrupt(format!(
                "singularity {index:?} does not fit shape {shape:?}"
            )));
        }
        stored.insert(index);
    }
    if stored != singularities(spectrum) {
        return Err(corrupt(format!(
            "{} singularities disagree with the spectrum peak",
            stored.len()
        )));
    }

    let side = square_side(spectrum.coefficients().len());
    if wire.betti_numbers.iter().sum::<usize>() != side {
        return Err(corrupt(format!(
            "betti numbers {:?} do not sum to {side}",
            wire.betti_numbers
        )));
    }

    Ok(TopologySummary {
        euler_characteristic: wire.euler_characteristic,
        betti_numbers: wire.betti_numbers,
        singularities: stored,
    })
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Split a container into its `(major, minor)` version and body.
pub fn read_header(bytes: &[u8]) -> Result<((u32, u32), &[u8])> {
    let window = &bytes[..bytes.len().min(MAX_HEADER_LEN)];
    let newline = window
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| StoreError::UnsupportedFormat("missing header line".to_string()))?;
    let line = std::str::from_utf8(&window[..newline])
        .map_err(|_| StoreError::UnsupportedFormat("header is not ASCII".to_string()))?;
    let caps = HEADER_RE
        .captures(line)
        .ok_or_else(|| StoreError::UnsupportedFormat(format!("unrecognized header '{line}'")))?;
    let parse = |i: usize| {
        caps[i]
            .parse::<u32>()
            .map_err(|_| StoreError::UnsupportedFormat(format!("bad version in '{line}'")))
    };
    Ok(((parse(1)?, parse(2)?), &bytes[newline + 1..]))
}

fn check_version(version: (u32, u32)) -> Result<()> {
    if version == (FORMAT_MAJOR, FORMAT_MINOR) {
        Ok(())
    } else {
        Err(StoreError::UnsupportedFormat(format!(
            "container version {}.{} (this build reads {FORMAT_MAJOR}.{FORMAT_MINOR})",
            version.0, version.1
        )))
    }
}

// ---------------------------------------------------------------------------
// Bytes
// ---------------------------------------------------------------------------

/// Serialize a built hypercube into container bytes.
pub fn encode(cube: &ParametricHypercube, level: i32) -> Result<Vec<u8>> {
    let record = to_record(cube)?;
    let json = serde_json::to_vec(&record)
        .map_err(|e| StoreError::InvalidData(format!("JSON encoding failed: {e}")))?;
    let compressed = zstd::encode_all(&json[..], level)?;

    tracing::debug!(
        id = %cube.id(),
        json_bytes = json.len(),
        compressed_bytes = compressed.len(),
        retained = record.spectrum.indices.len(),
        "container encoded"
    );

    let mut out = Vec::with_capacity(FORMAT_TAG.len() + 1 + compressed.len());
    out.extend_from_slice(FORMAT_TAG.as_bytes());
    out.push(b'\n');
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Decode container bytes. The config is rebuilt from the stored ratio and
/// the constants carried in metadata.
pub fn decode(bytes: &[u8]) -> Result<ParametricHypercube> {
    let record = decode_record(bytes, HypercubeConfig::default().max_cells)?;
    let config = config_from_record(&record);
    from_record(record, config)
}

/// Decode container bytes into an instance that uses `config`.
pub fn decode_with_config(bytes: &[u8], config: HypercubeConfig) -> Result<ParametricHypercube> {
    config.validate()?;
    let record = decode_record(bytes, config.max_cells)?;
    from_record(record, config)
}

/// Largest decompressed record accepted for a grid of at most `max_cells`.
fn record_limit(max_cells: Option<usize>) -> Option<usize> {
    max_cells.map(|cells| {
        cells
            .saturating_mul(RECORD_BYTES_PER_CELL)
            .saturating_add(RECORD_OVERHEAD_BYTES)
    })
}

fn decode_record(bytes: &[u8], max_cells: Option<usize>) -> Result<WireRecord> {
    let (version, body) = read_header(bytes)?;
    check_version(version)?;

    let mut decoder = zstd::stream::read::Decoder::new(body)?;
    let mut json = Vec::new();
    match record_limit(max_cells) {
        Some(limit) => {
            decoder
                .take(limit as u64 + 1)
                .read_to_end(&mut json)
                .map_err(|e| corrupt(format!("zstd: {e}")))?;
            if json.len() > limit {
                return Err(corrupt(format!(
                    "record decompresses past {limit} bytes"
                )));
            }
        }
        None => {
            decoder
                .read_to_end(&mut json)
                .map_err(|e| corrupt(format!("zstd: {e}")))?;
        }
    }
    tracing::debug!(
        compressed_bytes = body.len(),
        json_bytes = json.len(),
        "container body decompressed"
    );
    serde_json::from_slice(&json).map_err(|e| corrupt(format!("record: {e}")))
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write the container atomically: a temporary sibling is written, synced
/// and renamed over `path`.
pub fn save(cube: &ParametricHypercube, path: &Path, level: i32) -> Result<()> {
    let bytes = encode(cube, level)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_sibling(path);
    let written = (|| -> std::io::Result<()> {
        use std::io::Write;
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    tracing::info!(
        id = %cube.id(),
        path = %path.display(),
        bytes = bytes.len(),
        "hypercube saved"
    );
    Ok(())
}

pub fn load(path: &Path) -> Result<ParametricHypercube> {
    let bytes = fs::read(path)?;
    let cube = decode(&bytes)?;
    tracing::info!(
        id = %cube.id(),
        path = %path.display(),
        axes = cube.grid().ndim(),
        "hypercube loaded"
    );
    Ok(cube)
}

/// Load and require the stored axes to match `grid` in name, order and
/// sample count.
pub fn load_matching(path: &Path, grid: &GridSpace) -> Result<ParametricHypercube> {
    let cube = load(path)?;
    grid.check_compatible(cube.grid())?;
    Ok(cube)
}

// ---------------------------------------------------------------------------
// Uncompressed JSON
// ---------------------------------------------------------------------------

/// The container record as pretty JSON, without header or compression.
pub fn export_json(cube: &ParametricHypercube) -> Result<String> {
    let record = to_record(cube)?;
    serde_json::to_string_pretty(&record)
        .map_err(|e| StoreError::InvalidData(format!("JSON export failed: {e}")))
}

/// Inverse of [`export_json`], with the same validation as [`decode`].
pub fn import_json(json: &str) -> Result<ParametricHypercube> {
    let record: WireRecord =
        serde_json::from_str(json).map_err(|e| corrupt(format!("record: {e}")))?;
    let config = config_from_record(&record);
    from_record(record, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hc_core::{HypercubeError, Law};

    fn built(ratio: f64) -> ParametricHypercube {
        let grid = GridSpace::new(vec![Axis::new("t", 1.0, 2.0, 8)]).unwrap();
        let mut cube = ParametricHypercube::new(grid, HypercubeConfig::default()).unwrap();
        cube.build(&Law::expression("t^2"), ratio).unwrap();
        cube
    }

    fn body_of(bytes: &[u8]) -> Vec<u8> {
        let (_, body) = read_header(bytes).unwrap();
        zstd::decode_all(body).unwrap()
    }

    fn reframe(json: &[u8]) -> Vec<u8> {
        let mut out = b"HCUBEv1.0\n".to_vec();
        out.extend(zstd::encode_all(json, DEFAULT_COMPRESSION_LEVEL).unwrap());
        out
    }

    #[test]
    fn test_header_is_first_line() {
        let bytes = encode(&built(1.0), DEFAULT_COMPRESSION_LEVEL).unwrap();
        assert!(bytes.starts_with(b"HCUBEv1.0\n"));
        let (version, _) = read_header(&bytes).unwrap();
        assert_eq!(version, (1, 0));
    }

    #[test]
    fn test_roundtrip_preserves_parts() {
        let cube = built(1.0);
        let back = decode(&encode(&cube, DEFAULT_COMPRESSION_LEVEL).unwrap()).unwrap();
        assert_eq!(back.id(), cube.id());
        assert_eq!(back.grid(), cube.grid());
        assert_eq!(back.spectrum(), cube.spectrum());
        assert_eq!(back.topology(), cube.topology());
        assert_eq!(back.metadata(), cube.metadata());
        assert!((back.query(&[("t", 1.5)]).unwrap() - 2.25).abs() < 1e-9);
    }

    #[test]
    fn test_sparse_storage() {
        let cube = built(0.25);
        let bytes = encode(&cube, DEFAULT_COMPRESSION_LEVEL).unwrap();
        let record: WireRecord = serde_json::from_slice(&body_of(&bytes)).unwrap();
        let retained = cube.spectrum().unwrap().nonzero_count();
        assert_eq!(record.spectrum.indices.len(), retained);
        assert!(retained < 8);
    }

    #[test]
    fn test_rejects_foreign_headers() {
        for bytes in [
            b"HCUBEv2.0\nxxxx".to_vec(),
            b"HCUBEv1.1\nxxxx".to_vec(),
            b"PNG\r\n".to_vec(),
            b"no newline at all".to_vec(),
            Vec::new(),
        ] {
            assert!(
                matches!(decode(&bytes), Err(StoreError::UnsupportedFormat(_))),
                "{bytes:?}"
            );
        }
    }

    #[test]
    fn test_rejects_garbled_body() {
        let mut bytes = encode(&built(1.0), DEFAULT_COMPRESSION_LEVEL).unwrap();
        let n = bytes.len();
        bytes.truncate(n - 5);
        assert!(matches!(decode(&bytes), Err(StoreError::CorruptContainer(_))));

        let junk = b"HCUBEv1.0\nthis is not zstd".to_vec();
        assert!(matches!(decode(&junk), Err(StoreError::CorruptContainer(_))));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let bytes = encode(&built(1.0), DEFAULT_COMPRESSION_LEVEL).unwrap();
        let mut value: serde_json::Value = serde_json::from_slice(&body_of(&bytes)).unwrap();
        value["law"] = serde_json::Value::String("__import__('os')".to_string());
        let tampered = reframe(&serde_json::to_vec(&value).unwrap());
        assert!(matches!(
            decode(&tampered),
            Err(StoreError::CorruptContainer(_))
        ));
    }

    #[test]
    fn test_rejects_inconsistent_record() {
        let bytes = encode(&built(1.0), DEFAULT_COMPRESSION_LEVEL).unwrap();
        let original: serde_json::Value = serde_json::from_slice(&body_of(&bytes)).unwrap();

        let mut cases = Vec::new();

        let mut v = original.clone();
        v["spectrum"]["shape"] = serde_json::json!([9]);
        cases.push(v);

        let mut v = original.clone();
        v["spectrum"]["indices"] = serde_json::json!([7, 3]);
        v["spectrum"]["values"] = serde_json::json!([1.0, 2.0]);
        cases.push(v);

        let mut v = original.clone();
        v["spectrum"]["indices"] = serde_json::json!([40]);
        v["spectrum"]["values"] = serde_json::json!([1.0]);
        cases.push(v);

        let mut v = original.clone();
        v["topology"]["singularities"] = serde_json::json!([[0, 0]]);
        cases.push(v);

        let mut v = original.clone();
        v["axes"][0]["samples"] = serde_json::json!(1);
        cases.push(v);

        let mut v = original.clone();
        v["format"] = serde_json::json!("HCUBEv0.9");
        cases.push(v);

        for case in cases {
            let tampered = reframe(&serde_json::to_vec(&case).unwrap());
            assert!(
                matches!(decode(&tampered), Err(StoreError::CorruptContainer(_))),
                "{case}"
            );
        }
    }

    #[test]
    fn test_rejects_tampered_topology() {
        let bytes = encode(&built(1.0), DEFAULT_COMPRESSION_LEVEL).unwrap();
        let original: serde_json::Value = serde_json::from_slice(&body_of(&bytes)).unwrap();
        // t^2 is dominated by its mean, so only the DC term is singular
        assert_eq!(original["topology"]["singularities"], serde_json::json!([[0]]));

        let tampers = [
            ("betti_numbers", serde_json::json!([0, 0, 99])),
            ("betti_numbers", serde_json::json!([0, 0, 0])),
            ("singularities", serde_json::json!([[3]])),
            ("singularities", serde_json::json!([[0], [3]])),
            ("singularities", serde_json::json!([])),
        ];
        for (field, value) in tampers {
            let mut v = original.clone();
            v["topology"][field] = value;
            let tampered = reframe(&serde_json::to_vec(&v).unwrap());
            assert!(
                matches!(decode(&tampered), Err(StoreError::CorruptContainer(_))),
                "{v}"
            );
        }
    }

    #[test]
    fn test_cell_limit_applies_before_allocation() {
        let bytes = encode(&built(1.0), DEFAULT_COMPRESSION_LEVEL).unwrap();
        let tight = HypercubeConfig {
            max_cells: Some(4),
            ..HypercubeConfig::default()
        };
        assert!(matches!(
            decode_with_config(&bytes, tight),
            Err(StoreError::CorruptContainer(_))
        ));
        let unlimited = HypercubeConfig {
            max_cells: None,
            ..HypercubeConfig::default()
        };
        assert!(decode_with_config(&bytes, unlimited).is_ok());
    }

    #[test]
    fn test_record_limit() {
        assert_eq!(record_limit(None), None);
        assert_eq!(
            record_limit(Some(10)),
            Some(10 * RECORD_BYTES_PER_CELL + RECORD_OVERHEAD_BYTES)
        );
        assert_eq!(record_limit(Some(usize::MAX)), Some(usize::MAX));
    }

    #[test]
    fn test_unbuilt_cube_refuses_to_encode() {
        let grid = GridSpace::new(vec![Axis::new("t", 0.0, 1.0, 4)]).unwrap();
        let cube = ParametricHypercube::new(grid, HypercubeConfig::default()).unwrap();
        assert!(matches!(
            encode(&cube, DEFAULT_COMPRESSION_LEVEL),
            Err(StoreError::InvalidData(_))
        ));
    }

    #[test]
    fn test_non_finite_law_refuses_to_encode() {
        let grid = GridSpace::new(vec![Axis::new("t", 0.0, 1.0, 4)]).unwrap();
        let mut cube = ParametricHypercube::new(grid, HypercubeConfig::default()).unwrap();
        cube.build(&Law::expression("1 / t"), 1.0).unwrap();
        assert!(matches!(
            encode(&cube, DEFAULT_COMPRESSION_LEVEL),
            Err(StoreError::InvalidData(_))
        ));
    }

    #[test]
    fn test_decode_recovers_constants() {
        let grid = GridSpace::new(vec![Axis::new("v", 0.0, 1.0, 5)]).unwrap();
        let config = HypercubeConfig::default().with_constant("c", 2.0);
        let mut cube = ParametricHypercube::new(grid, config).unwrap();
        cube.build(&Law::expression("c * v"), 0.5).unwrap();

        let back = decode(&encode(&cube, DEFAULT_COMPRESSION_LEVEL).unwrap()).unwrap();
        assert_eq!(back.config().constants.get("c"), Some(&2.0));
        assert!(!back.config().constants.contains_key(RATIO_KEY));
        assert_eq!(back.config().compression_ratio, 0.5);
    }

    #[test]
    fn test_decode_with_config() {
        let bytes = encode(&built(1.0), DEFAULT_COMPRESSION_LEVEL).unwrap();
        let config = HypercubeConfig::default()
            .with_out_of_bounds(hc_core::OutOfBoundsPolicy::Clamp);
        let back = decode_with_config(&bytes, config).unwrap();
        assert!((back.query(&[("t", 5.0)]).unwrap() - 4.0).abs() < 1e-9);

        let bad = HypercubeConfig {
            compression_ratio: 0.0,
            ..HypercubeConfig::default()
        };
        assert!(matches!(
            decode_with_config(&bytes, bad),
            Err(StoreError::Core(HypercubeError::InvalidParameter(_)))
        ));
    }

    #[test]
    fn test_json_export_import() {
        let cube = built(1.0);
        let json = export_json(&cube).unwrap();
        assert!(json.contains("\"format\": \"HCUBEv1.0\""));
        let back = import_json(&json).unwrap();
        assert_eq!(back.spectrum(), cube.spectrum());
        assert!(matches!(
            import_json("{\"format\": 1}"),
            Err(StoreError::CorruptContainer(_))
        ));
    }

    #[test]
    fn test_temp_sibling_name() {
        let tmp = temp_sibling(Path::new("/data/cubes/a.hcube"));
        assert_eq!(tmp, PathBuf::from("/data/cubes/a.hcube.tmp"));
    }
}
