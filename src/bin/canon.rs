//! CANON CLI — GF(2) basis compression with recursive closure
//!
//! Commands:
//!   canon compress   — compress a file into a .canon container
//!   canon decompress — restore the original bytes
//!   canon stats      — describe a container
//!   canon batch      — compress several files concurrently
//!   canon demo       — compress synthetic data and print the report

use canon_core::config::CanonConfig;
use canon_core::stats::CompressionStats;
use canon_core::storage::{self, Container};
use canon_core::{compress, decompress, CanonError, Result};
use futures::future::join_all;
use rand::Rng;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_DEMO_SIZE: usize = 1 << 20;

fn print_usage() {
    println!(
        r#"
╔══════════════════════════════════════════════════════════════╗
║        CANON v0.1 — Canonical Basis Compression              ║
║        Incremental GF(2) basis + recursive closure           ║
╚══════════════════════════════════════════════════════════════╝

Usage: canon <command> [options]

Commands:
  compress   <in> [out]          Compress a file (default out: <in>.canon)
  decompress <in> [out]          Restore a file (default out: <in> without .canon)
  stats      <in.canon>          Describe a container without decoding the data
  batch      <out-dir> <in>...   Compress independent files concurrently
  demo       [size]              Compress synthetic structured data

Options:
  --width N          Bits per unit (1..=4096, default 8)
  --max-depth N      Maximum closure levels (default 32)
  --no-recursive     Level 0 only
  --no-verify        Skip the decode check after compressing
  --config <file>    Load settings from a JSON file; flags override it
  --json             Print statistics as JSON

Complexity: Θ(n·r) where n = units, r = rank
  - Highly compressible: r << n → Θ(n) linear
  - Random data: r = width → no reduction

Examples:
  canon compress data.bin
  canon compress data.bin --width 16 --max-depth 8
  canon decompress data.bin.canon restored.bin
  canon stats data.bin.canon --json
  canon batch out/ a.log b.log c.log
"#
    );
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return;
    }

    let result = match args[1].as_str() {
        "compress" => cmd_compress(&args[2..]).await,
        "decompress" => cmd_decompress(&args[2..]).await,
        "stats" => cmd_stats(&args[2..]).await,
        "batch" => cmd_batch(&args[2..]).await,
        "demo" => cmd_demo(&args[2..]).await,
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            print_usage();
            Err(CanonError::ConfigError(format!("Unknown command: {}", other)))
        }
    };

    if let Err(e) = result {
        eprintln!("  Error: {}", e);
        std::process::exit(1);
    }
}

/// Positional arguments plus the settings built from flags
struct Options {
    positional: Vec<String>,
    config: CanonConfig,
    json: bool,
}

fn parse_options(args: &[String]) -> Result<Options> {
    let mut positional = Vec::new();
    let mut config_path = None;
    let mut width = None;
    let mut max_depth = None;
    let mut no_recursive = false;
    let mut no_verify = false;
    let mut json = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--width" => width = Some(flag_value(&mut iter, "--width")?),
            "--max-depth" => max_depth = Some(flag_value(&mut iter, "--max-depth")?),
            "--config" => {
                let path = iter
                    .next()
                    .ok_or_else(|| CanonError::ConfigError("--config needs a file".into()))?;
                config_path = Some(path.clone());
            }
            "--no-recursive" => no_recursive = true,
            "--no-verify" => no_verify = true,
            "--json" => json = true,
            flag if flag.starts_with("--") => {
                return Err(CanonError::ConfigError(format!("Unknown option: {}", flag)));
            }
            _ => positional.push(arg.clone()),
        }
    }

    let mut config = match config_path {
        Some(path) => CanonConfig::load(path)?,
        None => CanonConfig::default(),
    };
    if let Some(width) = width {
        config.unit_width = width;
    }
    if let Some(depth) = max_depth {
        config.max_depth = depth;
    }
    if no_recursive {
        config.recursive = false;
    }
    if no_verify {
        config.verify = false;
    }
    config.validate()?;

    Ok(Options {
        positional,
        config,
        json,
    })
}

fn flag_value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> Result<usize> {
    iter.next()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| CanonError::ConfigError(format!("{} needs a number", flag)))
}

fn print_stats(stats: &CompressionStats, json: bool) -> Result<()> {
    if json {
        println!("{}", stats.to_json()?);
    } else {
        println!("\n{}\n", stats.report());
    }
    Ok(())
}

/// Read, compress and write one file
fn compress_file(input: &Path, output: &Path, config: &CanonConfig) -> Result<CompressionStats> {
    let data = std::fs::read(input)?;
    let compressed = compress(&data, config)?;
    storage::write_atomic(output, &compressed.bytes)?;
    Ok(compressed.stats)
}

async fn cmd_compress(args: &[String]) -> Result<()> {
    let opts = parse_options(args)?;
    let input = match opts.positional.first() {
        Some(path) => PathBuf::from(path),
        None => {
            return Err(CanonError::ConfigError(
                "Usage: canon compress <in> [out] [options]".into(),
            ))
        }
    };
    let output = opts
        .positional
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| storage::compressed_path(&input));

    if !opts.json {
        println!("  Compressing: {}", input.display());
        println!("  Output:      {}", output.display());
    }
    let stats = compress_file(&input, &output, &opts.config)?;
    print_stats(&stats, opts.json)?;
    if !opts.json {
        println!("  ✓ Compressed file saved: {}", output.display());
    }
    Ok(())
}

async fn cmd_decompress(args: &[String]) -> Result<()> {
    let opts = parse_options(args)?;
    let input = match opts.positional.first() {
        Some(path) => PathBuf::from(path),
        None => {
            return Err(CanonError::ConfigError(
                "Usage: canon decompress <in> [out]".into(),
            ))
        }
    };
    let output = opts
        .positional
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| storage::decompressed_path(&input));

    println!("  Decompressing: {}", input.display());
    println!("  Output:        {}", output.display());
    let data = storage::read_container(&input)?.decode_data()?;
    storage::write_atomic(&output, &data)?;
    println!("  ✓ Decompressed file saved: {} ({} bytes)", output.display(), data.len());
    Ok(())
}

async fn cmd_stats(args: &[String]) -> Result<()> {
    let opts = parse_options(args)?;
    let input = opts
        .positional
        .first()
        .ok_or_else(|| CanonError::ConfigError("Usage: canon stats <in.canon> [--json]".into()))?;
    let bytes = std::fs::read(input)?;
    let container = Container::decode(&bytes)?;
    let stats = CompressionStats::from_container(&container, &bytes, Duration::ZERO);
    print_stats(&stats, opts.json)
}

async fn cmd_batch(args: &[String]) -> Result<()> {
    let opts = parse_options(args)?;
    if opts.positional.len() < 2 {
        return Err(CanonError::ConfigError(
            "Usage: canon batch <out-dir> <in>... [options]".into(),
        ));
    }
    let out_dir = PathBuf::from(&opts.positional[0]);
    std::fs::create_dir_all(&out_dir)?;

    let jobs = opts.positional[1..].iter().map(|input| {
        let input = PathBuf::from(input);
        let name = input
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| input.as_os_str().to_os_string());
        let output = storage::compressed_path(&out_dir.join(name));
        let config = opts.config.clone();
        async move {
            let result = tokio::task::spawn_blocking({
                let input = input.clone();
                let output = output.clone();
                move || compress_file(&input, &output, &config)
            })
            .await
            .map_err(|e| CanonError::IoError(std::io::Error::other(e)))
            .and_then(|r| r);
            (input, output, result)
        }
    });

    let mut failures = 0;
    for (input, output, result) in join_all(jobs).await {
        match result {
            Ok(stats) if opts.json => println!("{}", stats.to_json()?),
            Ok(stats) => println!("  ✓ {} -> {} | {}", input.display(), output.display(), stats.summary()),
            Err(e) => {
                failures += 1;
                eprintln!("  ✗ {}: {}", input.display(), e);
            }
        }
    }

    if failures > 0 {
        return Err(CanonError::FormatError(format!(
            "{} of {} files failed",
            failures,
            opts.positional.len() - 1
        )));
    }
    Ok(())
}

/// Records drawn from a small vocabulary, with occasional noise bytes
fn synthetic_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let vocabulary: Vec<[u8; 4]> = (0..6).map(|_| rng.gen()).collect();
    let mut data = Vec::with_capacity(size);
    while data.len() < size {
        if rng.gen_bool(0.01) {
            data.push(rng.gen());
        } else {
            data.extend_from_slice(&vocabulary[rng.gen_range(0..vocabulary.len())]);
        }
    }
    data.truncate(size);
    data
}

async fn cmd_demo(args: &[String]) -> Result<()> {
    let opts = parse_options(args)?;
    let size = opts
        .positional
        .first()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_DEMO_SIZE);

    println!(
        r#"
╔══════════════════════════════════════════════════════════════╗
║              CANON v0.1 — Demo                               ║
║       Basis construction + recursive closure                 ║
╚══════════════════════════════════════════════════════════════╝
"#
    );

    println!("Step 1: Generating {} bytes of structured data...", size);
    println!("{}", "-".repeat(60));
    let data = synthetic_data(size);

    println!("\nStep 2: Compressing at {} bits per unit...", opts.config.unit_width);
    println!("{}", "-".repeat(60));
    let compressed = compress(&data, &opts.config)?;
    print_stats(&compressed.stats, opts.json)?;

    println!("Step 3: Decompressing and comparing...");
    println!("{}", "-".repeat(60));
    let restored = decompress(&compressed.bytes)?;
    if restored != data {
        return Err(CanonError::FormatError("demo round trip differs from the input".into()));
    }
    println!("  ✓ {} bytes restored exactly", restored.len());
    Ok(())
}
