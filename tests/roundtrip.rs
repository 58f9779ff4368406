//! File-level round trips through the container format

use canon_core::storage::{self, Container};
use canon_core::{compress, decompress, CanonConfig, CanonError, CompressionStats, Termination};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::time::Duration;

fn test_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("canon-roundtrip-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn log_lines(count: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(2026);
    let levels = ["INFO ", "WARN ", "DEBUG"];
    let mut out = Vec::new();
    for i in 0..count {
        let level = levels[rng.gen_range(0..levels.len())];
        out.extend_from_slice(format!("{} request {:04} ok\n", level, i % 10).as_bytes());
    }
    out
}

#[test]
fn compress_file_and_restore() {
    let dir = test_dir();
    let input = dir.join("server.log");
    let data = log_lines(2000);
    std::fs::write(&input, &data).unwrap();

    let compressed = compress(&data, &CanonConfig::default()).unwrap();
    let output = storage::compressed_path(&input);
    storage::write_atomic(&output, &compressed.bytes).unwrap();

    let container = storage::read_container(&output).unwrap();
    assert_eq!(container.byte_len(), data.len());
    assert_eq!(container.chain().width(), 8);

    let restored_path = storage::decompressed_path(&output);
    assert_eq!(restored_path, input);
    let restored = decompress(&std::fs::read(&output).unwrap()).unwrap();
    assert_eq!(restored, data);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn stats_match_a_reloaded_container() {
    let dir = test_dir();
    let data = log_lines(500);
    let config = CanonConfig {
        unit_width: 16,
        ..Default::default()
    };
    let compressed = compress(&data, &config).unwrap();
    let path = dir.join("log.canon");
    storage::write_atomic(&path, &compressed.bytes).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let container = Container::decode(&bytes).unwrap();
    let described = CompressionStats::from_container(&container, &bytes, Duration::ZERO);
    assert_eq!(described.levels, compressed.stats.levels);
    assert_eq!(described.checksum, compressed.stats.checksum);
    assert_eq!(described.output_bytes, bytes.len());
    assert_eq!(described.unit_width, 16);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn config_file_drives_compression() {
    let dir = test_dir();
    let config_path = dir.join("canon.json");
    std::fs::write(&config_path, r#"{"unit_width": 24, "recursive": false}"#).unwrap();
    let config = CanonConfig::load(&config_path).unwrap();

    let data = log_lines(300);
    let compressed = compress(&data, &config).unwrap();
    let container = Container::decode(&compressed.bytes).unwrap();
    assert_eq!(container.chain().width(), 24);
    assert_eq!(container.chain().depth(), 1);
    assert_ne!(container.chain().termination(), Termination::DepthLimit);
    assert_eq!(container.decode_data().unwrap(), data);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn corrupted_file_is_rejected() {
    let dir = test_dir();
    let data = log_lines(100);
    let mut bytes = compress(&data, &CanonConfig::default()).unwrap().bytes;
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0x10;
    let path = dir.join("bad.canon");
    std::fs::write(&path, &bytes).unwrap();

    assert!(matches!(
        storage::read_container(&path),
        Err(CanonError::FormatError(_))
    ));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn random_inputs_round_trip() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..20 {
        let len = rng.gen_range(0..600);
        let alphabet: Vec<u8> = (0..rng.gen_range(1..6)).map(|_| rng.gen()).collect();
        let data: Vec<u8> = (0..len)
            .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
            .collect();
        let config = CanonConfig {
            unit_width: rng.gen_range(1..80),
            max_depth: rng.gen_range(1..10),
            recursive: rng.gen_bool(0.8),
            verify: false,
        };
        let compressed = compress(&data, &config).unwrap();
        assert_eq!(decompress(&compressed.bytes).unwrap(), data);
    }
}
