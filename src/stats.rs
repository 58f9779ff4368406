//! Compression statistics
//!
//! Gathered from a finished container: sizes, per-level ranks, timing, and
//! the Θ(n·r) work estimate with the class it falls in.

use crate::closure::Termination;
use crate::error::{CanonError, Result};
use crate::storage::{checksum_hex, Container};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MB: f64 = 1_048_576.0;

/// How the Θ(n·r) cost behaves for a given rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityClass {
    NearLinear,
    Linear,
    SubQuadratic,
    Incompressible,
}

impl ComplexityClass {
    pub fn classify(unit_count: usize, rank: usize) -> Self {
        if rank < 1000 {
            ComplexityClass::NearLinear
        } else if rank < unit_count / 100 {
            ComplexityClass::Linear
        } else if rank < unit_count / 10 {
            ComplexityClass::SubQuadratic
        } else {
            ComplexityClass::Incompressible
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ComplexityClass::NearLinear => "~Θ(n), nearly linear",
            ComplexityClass::Linear => "~Θ(n), linear with small constant",
            ComplexityClass::SubQuadratic => "Θ(n·r), sub-quadratic",
            ComplexityClass::Incompressible => "Θ(n·W), no structure found",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelStats {
    pub unit_count: usize,
    pub rank: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionStats {
    pub input_bytes: usize,
    pub output_bytes: usize,
    pub unit_width: usize,
    pub unit_count: usize,
    pub levels: Vec<LevelStats>,
    pub final_rank: usize,
    pub termination: Termination,
    /// output / input
    pub ratio: f64,
    pub space_saving_percent: f64,
    pub elapsed_seconds: f64,
    pub throughput_mb_s: f64,
    /// Sum of n·r over all levels
    pub work: u64,
    pub complexity: ComplexityClass,
    pub checksum: String,
    pub completed_at: DateTime<Utc>,
}

impl CompressionStats {
    /// Describe `container`, whose serialized form is `encoded`
    pub fn from_container(container: &Container, encoded: &[u8], elapsed: Duration) -> Self {
        let chain = container.chain();
        let levels: Vec<LevelStats> = chain
            .level_shapes()
            .into_iter()
            .map(|(unit_count, rank)| LevelStats { unit_count, rank })
            .collect();
        let work: u64 = levels
            .iter()
            .map(|l| l.unit_count as u64 * l.rank as u64)
            .sum();
        let max_rank = levels.iter().map(|l| l.rank).max().unwrap_or(0);

        let input_bytes = container.byte_len();
        let output_bytes = encoded.len();
        let ratio = if input_bytes == 0 {
            0.0
        } else {
            output_bytes as f64 / input_bytes as f64
        };
        let elapsed_seconds = elapsed.as_secs_f64();
        let throughput_mb_s = if elapsed_seconds > 0.0 {
            input_bytes as f64 / MB / elapsed_seconds
        } else {
            0.0
        };

        Self {
            input_bytes,
            output_bytes,
            unit_width: chain.width(),
            unit_count: chain.unit_count(),
            final_rank: chain.terminal().rank(),
            termination: chain.termination(),
            ratio,
            space_saving_percent: if input_bytes == 0 { 0.0 } else { (1.0 - ratio) * 100.0 },
            elapsed_seconds,
            throughput_mb_s,
            work,
            complexity: ComplexityClass::classify(chain.unit_count(), max_rank),
            checksum: checksum_hex(encoded).unwrap_or_default(),
            completed_at: Utc::now(),
            levels,
        }
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        format!(
            "CANON | {} -> {} bytes | ratio={:.3} | width={} | levels={} | final rank={} | {}",
            self.input_bytes,
            self.output_bytes,
            self.ratio,
            self.unit_width,
            self.levels.len(),
            self.final_rank,
            self.termination.describe(),
        )
    }

    /// Aligned multi-line report
    pub fn report(&self) -> String {
        let rule = "═══════════════════════════════════════════════════════";
        let mut lines = vec![
            rule.to_string(),
            "            CANON COMPRESSION STATISTICS".to_string(),
            rule.to_string(),
            format!(
                "Input Size:         {} bytes ({:.2} MB)",
                self.input_bytes,
                self.input_bytes as f64 / MB
            ),
            format!(
                "Output Size:        {} bytes ({:.2} KB)",
                self.output_bytes,
                self.output_bytes as f64 / 1024.0
            ),
            format!("Unit Width:         {} bits", self.unit_width),
            format!("Units:              {}", self.unit_count),
        ];
        for (depth, level) in self.levels.iter().enumerate() {
            lines.push(format!(
                "Level {:<3}           {} units, rank {}",
                depth, level.unit_count, level.rank
            ));
        }
        lines.extend([
            format!("Final Rank (GF(2)): {}", self.final_rank),
            format!("Termination:        {}", self.termination.describe()),
            format!("Ratio:              {:.4}", self.ratio),
            format!("Space Saving:       {:.2}%", self.space_saving_percent),
            format!("Time Taken:         {:.3} seconds", self.elapsed_seconds),
            format!("Throughput:         {:.2} MB/s", self.throughput_mb_s),
            format!("Complexity:         Θ(n·r) = Θ({})", self.work),
            format!("Effective:          {}", self.complexity.label()),
            format!("Checksum:           {}", self.checksum),
            format!("Completed:          {}", self.completed_at.to_rfc3339()),
            rule.to_string(),
        ]);
        lines.join("\n")
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CanonError::FormatError(format!("Serialize stats: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::RecursiveClosure;
    use crate::gf2::units_from_bytes;

    fn stats_for(input: &[u8]) -> CompressionStats {
        let chain = RecursiveClosure::new(32).run(&units_from_bytes(input, 8), 8).unwrap();
        let container = Container::new(input.len(), chain).unwrap();
        let encoded = container.encode();
        CompressionStats::from_container(&container, &encoded, Duration::from_millis(20))
    }

    #[test]
    fn test_classify() {
        assert_eq!(ComplexityClass::classify(1_000_000, 8), ComplexityClass::NearLinear);
        assert_eq!(ComplexityClass::classify(1_000_000, 4000), ComplexityClass::Linear);
        assert_eq!(ComplexityClass::classify(1_000_000, 50_000), ComplexityClass::SubQuadratic);
        assert_eq!(ComplexityClass::classify(10_000, 4000), ComplexityClass::Incompressible);
    }

    #[test]
    fn test_labels_never_claim_quadratic_cost() {
        for class in [
            ComplexityClass::NearLinear,
            ComplexityClass::Linear,
            ComplexityClass::SubQuadratic,
            ComplexityClass::Incompressible,
        ] {
            assert!(!class.label().contains('²'));
        }
        assert_eq!(ComplexityClass::Incompressible.label(), "Θ(n·W), no structure found");
    }

    #[test]
    fn test_stats_for_repetitive_input() {
        let input: Vec<u8> = (0..4096).map(|i| if i % 2 == 0 { 0x05 } else { 0x00 }).collect();
        let stats = stats_for(&input);
        assert_eq!(stats.input_bytes, 4096);
        assert_eq!(stats.unit_count, 4096);
        assert_eq!(stats.levels.len(), 5);
        assert_eq!(stats.levels[0], LevelStats { unit_count: 4096, rank: 1 });
        assert_eq!(stats.final_rank, 1);
        assert_eq!(stats.termination, Termination::FixedPoint);
        assert_eq!(stats.work, 4096 + 512 + 64 + 8 + 1);
        assert!(stats.ratio < 0.1);
        assert!(stats.space_saving_percent > 90.0);
        assert!(stats.throughput_mb_s > 0.0);
        assert_eq!(stats.checksum.len(), 64);
    }

    #[test]
    fn test_empty_input_has_no_ratio() {
        let stats = stats_for(b"");
        assert_eq!(stats.ratio, 0.0);
        assert_eq!(stats.space_saving_percent, 0.0);
        assert_eq!(stats.levels, vec![LevelStats { unit_count: 0, rank: 0 }]);
    }

    #[test]
    fn test_report_and_json() {
        let stats = stats_for(b"abababababababab");
        let report = stats.report();
        assert!(report.contains("CANON COMPRESSION STATISTICS"));
        assert!(report.contains("Final Rank (GF(2)): 1"));
        assert!(stats.summary().starts_with("CANON | 16 ->"));

        let json = stats.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["input_bytes"], 16);
        assert_eq!(value["termination"], "FixedPoint");
        assert_eq!(value["complexity"], "near_linear");
    }
}
