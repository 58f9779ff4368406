//! Byte-level compress / decompress

use crate::closure::RecursiveClosure;
use crate::config::CanonConfig;
use crate::error::{CanonError, Result};
use crate::gf2::units_from_bytes;
use crate::stats::CompressionStats;
use crate::storage::Container;
use log::{debug, info};
use std::time::Instant;

/// A serialized container and what it took to build it
#[derive(Debug, Clone)]
pub struct Compressed {
    pub bytes: Vec<u8>,
    pub stats: CompressionStats,
}

/// Run the closure over `input` and serialize the result
pub fn compress(input: &[u8], config: &CanonConfig) -> Result<Compressed> {
    config.validate()?;
    let start = Instant::now();
    let width = config.unit_width;

    let units = units_from_bytes(input, width);
    info!(
        "Compressing {} bytes as {} units of {} bits",
        input.len(),
        units.len(),
        width
    );
    let chain = RecursiveClosure::from_config(config).run(&units, width)?;
    let container = Container::new(input.len(), chain)?;
    let bytes = container.encode();

    if config.verify {
        let restored = Container::decode(&bytes)?.decode_data()?;
        if restored != input {
            return Err(CanonError::FormatError(
                "verification failed: decoded container differs from the input".into(),
            ));
        }
        debug!("Verified {} bytes", input.len());
    }

    let stats = CompressionStats::from_container(&container, &bytes, start.elapsed());
    info!("{}", stats.summary());
    Ok(Compressed { bytes, stats })
}

/// Parse a container and reconstruct the original bytes
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    let container = Container::decode(bytes)?;
    let data = container.decode_data()?;
    info!(
        "Decompressed {} levels into {} bytes",
        container.chain().depth(),
        data.len()
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_round_trip_defaults() {
        let input = b"to be or not to be, that is the question".repeat(20);
        let compressed = compress(&input, &CanonConfig::default()).unwrap();
        assert_eq!(decompress(&compressed.bytes).unwrap(), input);
        assert_eq!(compressed.stats.input_bytes, input.len());
        assert_eq!(compressed.stats.output_bytes, compressed.bytes.len());
    }

    #[test]
    fn test_round_trip_widths_and_modes() {
        let mut rng = StdRng::seed_from_u64(11);
        let inputs: Vec<Vec<u8>> = vec![
            Vec::new(),
            vec![0],
            vec![0u8; 777],
            (0..500).map(|_| rng.gen()).collect(),
            (0..900).map(|i| [0x00, 0x0f, 0xf0, 0xff][i % 4]).collect(),
        ];
        for input in &inputs {
            for width in [1usize, 7, 8, 16, 64, 100] {
                for recursive in [true, false] {
                    let config = CanonConfig {
                        unit_width: width,
                        recursive,
                        max_depth: 6,
                        verify: true,
                    };
                    let compressed = compress(input, &config).unwrap();
                    assert_eq!(&decompress(&compressed.bytes).unwrap(), input);
                }
            }
        }
    }

    #[test]
    fn test_recursion_shrinks_repetitive_input() {
        let input: Vec<u8> = (0..65536).map(|i| if i % 3 == 0 { 0xaa } else { 0x55 }).collect();
        let flat = CanonConfig {
            recursive: false,
            ..Default::default()
        };
        let single = compress(&input, &flat).unwrap();
        let deep = compress(&input, &CanonConfig::default()).unwrap();
        assert!(deep.bytes.len() < single.bytes.len());
        assert!(deep.stats.levels.len() > 1);
    }

    #[test]
    fn test_invalid_config() {
        let config = CanonConfig {
            unit_width: 0,
            ..Default::default()
        };
        assert!(matches!(compress(b"x", &config), Err(CanonError::ConfigError(_))));
    }

    #[test]
    fn test_decompress_rejects_garbage() {
        assert!(decompress(b"definitely not a container").is_err());
        assert!(decompress(b"").is_err());
    }
}
