//! Save/load round trips through real files, and the failure modes a loader
//! must report distinctly.

use std::fs;

use approx::assert_abs_diff_eq;
use hc_core::{Axis, GridSpace, HypercubeConfig, HypercubeError, Law, ParametricHypercube};
use hc_store::{
    DEFAULT_COMPRESSION_LEVEL, FORMAT_TAG, StoreError, decode_with_config, load, load_matching,
    save,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn rng() -> SmallRng {
    SmallRng::seed_from_u64(42)
}

/// A structurally complete record over `axes`, with an empty spectrum.
fn record_over(axes: serde_json::Value, shape: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "format": FORMAT_TAG,
        "id": "00000000-0000-0000-0000-000000000000",
        "axes": axes,
        "spectrum": {
            "shape": shape,
            "compression_ratio": 1.0,
            "threshold": 0.0,
            "indices": [],
            "values": []
        },
        "topology": {
            "euler_characteristic": 0,
            "betti_numbers": [0, 0, 0],
            "singularities": []
        },
        "metadata": {}
    })
}

fn container_of(json: &[u8]) -> Vec<u8> {
    let mut out = format!("{FORMAT_TAG}\n").into_bytes();
    out.extend(zstd::encode_all(json, DEFAULT_COMPRESSION_LEVEL).unwrap());
    out
}

fn square_law() -> ParametricHypercube {
    let grid = GridSpace::new(vec![Axis::new("t", 1.0, 2.0, 8)]).unwrap();
    let mut cube = ParametricHypercube::new(grid, HypercubeConfig::default()).unwrap();
    cube.build(&Law::expression("t^2"), 1.0).unwrap();
    cube
}

#[test]
fn square_law_survives_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("square.hcube");
    save(&square_law(), &path, DEFAULT_COMPRESSION_LEVEL).unwrap();

    let loaded = load(&path).unwrap();
    assert_abs_diff_eq!(loaded.query(&[("t", 1.5)]).unwrap(), 2.25, epsilon = 1e-9);
    assert!(!dir.path().join("square.hcube.tmp").exists());
}

#[test]
fn loaded_cube_answers_like_the_original() {
    let grid = GridSpace::new(vec![
        Axis::new("p", 0.0, 2.0, 9),
        Axis::new("q", -1.0, 1.0, 7),
        Axis::new("r", 10.0, 11.0, 5),
    ])
    .unwrap();
    let config = HypercubeConfig::default().with_constant("k", 0.5);
    let mut cube = ParametricHypercube::new(grid, config).unwrap();
    cube.build(&Law::expression("exp(-k*p) * cos(q) + r / 10"), 1.0)
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("three.hcube");
    save(&cube, &path, 9).unwrap();
    let loaded = load(&path).unwrap();

    assert_eq!(loaded.id(), cube.id());
    assert_eq!(loaded.topology(), cube.topology());
    assert_eq!(loaded.metadata(), cube.metadata());

    let mut rng = rng();
    for _ in 0..100 {
        let p = rng.random_range(0.0..2.0);
        let q = rng.random_range(-1.0..1.0);
        let r = rng.random_range(10.0..11.0);
        let point = [("p", p), ("q", q), ("r", r)];
        assert_abs_diff_eq!(
            cube.query(&point).unwrap(),
            loaded.query(&point).unwrap(),
            epsilon = 1e-9
        );
    }
}

#[test]
fn lossy_cube_loads_its_reconstruction() {
    let grid = GridSpace::uniform(&[("x", 0.0, 10.0), ("y", 0.0, 10.0)], 16).unwrap();
    let mut cube = ParametricHypercube::new(grid, HypercubeConfig::default()).unwrap();
    cube.build(&Law::expression("sin(x) * cos(y / 3)"), 0.05).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lossy.hcube");
    save(&cube, &path, DEFAULT_COMPRESSION_LEVEL).unwrap();
    let loaded = load(&path).unwrap();

    let expected = cube.reconstruct().unwrap().clone();
    let got = loaded.field().unwrap();
    assert!(expected.max_abs_diff(got).unwrap() < 1e-12);
    assert_eq!(loaded.spectrum().unwrap().compression_ratio(), 0.05);
}

#[test]
fn overwrite_replaces_container() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("same.hcube");
    let first = square_law();
    let second = square_law();
    save(&first, &path, DEFAULT_COMPRESSION_LEVEL).unwrap();
    save(&second, &path, DEFAULT_COMPRESSION_LEVEL).unwrap();
    assert_eq!(load(&path).unwrap().id(), second.id());
}

#[test]
fn bad_header_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.hcube");
    fs::write(&path, b"\x80\x04\x95pickled bytes\n").unwrap();
    assert!(matches!(load(&path), Err(StoreError::UnsupportedFormat(_))));

    fs::write(&path, b"HCUBEv3.0\n").unwrap();
    assert!(matches!(load(&path), Err(StoreError::UnsupportedFormat(_))));
}

#[test]
fn garbled_body_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("square.hcube");
    save(&square_law(), &path, DEFAULT_COMPRESSION_LEVEL).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    let mid = 10 + (bytes.len() - 10) / 2;
    for b in &mut bytes[mid..] {
        *b ^= 0x5a;
    }
    fs::write(&path, &bytes).unwrap();
    assert!(matches!(load(&path), Err(StoreError::CorruptContainer(_))));

    let header_only = dir.path().join("empty.hcube");
    fs::write(&header_only, b"HCUBEv1.0\n").unwrap();
    assert!(matches!(
        load(&header_only),
        Err(StoreError::CorruptContainer(_))
    ));
}

#[test]
fn missing_file_is_io() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        load(&dir.path().join("absent.hcube")),
        Err(StoreError::Io(_))
    ));
}

#[test]
fn load_matching_checks_axes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("square.hcube");
    save(&square_law(), &path, DEFAULT_COMPRESSION_LEVEL).unwrap();

    let same = GridSpace::new(vec![Axis::new("t", 1.0, 2.0, 8)]).unwrap();
    assert!(load_matching(&path, &same).is_ok());

    let renamed = GridSpace::new(vec![Axis::new("s", 1.0, 2.0, 8)]).unwrap();
    assert!(matches!(
        load_matching(&path, &renamed),
        Err(StoreError::Core(HypercubeError::DimensionMismatch(_)))
    ));

    let finer = GridSpace::new(vec![Axis::new("t", 1.0, 2.0, 16)]).unwrap();
    assert!(matches!(
        load_matching(&path, &finer),
        Err(StoreError::Core(HypercubeError::DimensionMismatch(_)))
    ));
}

#[test]
fn huge_axis_is_corrupt_not_a_panic() {
    let samples: usize = 2305843009213693952;
    let record = record_over(
        serde_json::json!([{"name": "x", "lower": 0.0, "upper": 1.0, "samples": samples}]),
        serde_json::json!([samples]),
    );
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("huge.hcube");
    fs::write(&path, container_of(&serde_json::to_vec(&record).unwrap())).unwrap();
    assert!(matches!(load(&path), Err(StoreError::CorruptContainer(_))));
}

#[test]
fn overflowing_cell_count_is_corrupt() {
    let axes: Vec<serde_json::Value> = (0..70)
        .map(|i| serde_json::json!({"name": format!("a{i}"), "lower": 0.0, "upper": 1.0, "samples": 2}))
        .collect();
    let record = record_over(serde_json::Value::Array(axes), serde_json::json!(vec![2; 70]));
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wide.hcube");
    fs::write(&path, container_of(&serde_json::to_vec(&record).unwrap())).unwrap();
    assert!(matches!(load(&path), Err(StoreError::CorruptContainer(_))));
}

#[test]
fn oversized_body_stops_decompressing() {
    let mut record = record_over(
        serde_json::json!([{"name": "t", "lower": 0.0, "upper": 1.0, "samples": 2}]),
        serde_json::json!([2]),
    );
    record["topology"]["betti_numbers"] = serde_json::json!([2, 0, 0]);
    let compact = serde_json::to_vec(&record).unwrap();
    let two_cells = || HypercubeConfig {
        max_cells: Some(2),
        ..HypercubeConfig::default()
    };
    assert!(decode_with_config(&container_of(&compact), two_cells()).is_ok());

    // Leading whitespace is valid JSON and compresses to almost nothing.
    let mut padded = vec![b' '; 4 << 20];
    padded.extend(&compact);
    let bytes = container_of(&padded);
    assert!(bytes.len() < 64 << 10);
    assert!(matches!(
        decode_with_config(&bytes, two_cells()),
        Err(StoreError::CorruptContainer(_))
    ));
}
