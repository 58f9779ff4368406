//! Recursive closure — feed each level's derivation stream back in as raw
//! input until nothing more can be gained
//!
//! The loop keeps a level only if its input is strictly shorter than the
//! previous level's, so the chain always ends. Only the deepest level keeps
//! its derivation records; shallower levels keep their basis and unit count.

use super::level::{ClosureLevel, RetainedLevel};
use super::reconstruct::Reconstructor;
use crate::config::CanonConfig;
use crate::error::{CanonError, Result};
use crate::gf2::Unit;
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Why the closure loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// The deepest level's rank equals its unit count
    FixedPoint,
    /// The next derivation stream would be no shorter than this level's input
    NoReduction,
    /// Stopped by the depth cap; the last valid level is kept
    DepthLimit,
    /// Recursion switched off: level 0 only
    Disabled,
}

impl Termination {
    /// Wire code used by the container header
    pub fn code(&self) -> u8 {
        match self {
            Termination::FixedPoint => 0,
            Termination::NoReduction => 1,
            Termination::DepthLimit => 2,
            Termination::Disabled => 3,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Termination::FixedPoint),
            1 => Ok(Termination::NoReduction),
            2 => Ok(Termination::DepthLimit),
            3 => Ok(Termination::Disabled),
            other => Err(CanonError::FormatError(format!(
                "unknown termination code {}",
                other
            ))),
        }
    }

    pub fn describe(&self) -> &str {
        match self {
            Termination::FixedPoint => "fixed point",
            Termination::NoReduction => "no further reduction",
            Termination::DepthLimit => "depth limit reached",
            Termination::Disabled => "single level",
        }
    }
}

/// The levels produced by one closure run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosureChain {
    retained: Vec<RetainedLevel>,
    terminal: ClosureLevel,
    termination: Termination,
}

impl ClosureChain {
    /// Reassemble a chain, checking that consecutive levels fit together
    pub fn from_parts(
        retained: Vec<RetainedLevel>,
        terminal: ClosureLevel,
        termination: Termination,
    ) -> Result<Self> {
        let width = terminal.width();
        for (depth, level) in retained.iter().enumerate() {
            if level.width() != width {
                return Err(CanonError::WidthMismatch {
                    expected: width,
                    found: level.width(),
                });
            }
            let next_count = match retained.get(depth + 1) {
                Some(next) => next.unit_count(),
                None => terminal.unit_count(),
            };
            if next_count != level.stream_unit_count() {
                return Err(CanonError::FormatError(format!(
                    "level {} declares {} units, level {} needs {}",
                    depth + 1,
                    next_count,
                    depth,
                    level.stream_unit_count()
                )));
            }
        }
        Ok(Self {
            retained,
            terminal,
            termination,
        })
    }

    pub fn width(&self) -> usize {
        self.terminal.width()
    }

    /// Number of levels, terminal included
    pub fn depth(&self) -> usize {
        self.retained.len() + 1
    }

    pub fn retained(&self) -> &[RetainedLevel] {
        &self.retained
    }

    pub fn terminal(&self) -> &ClosureLevel {
        &self.terminal
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    /// Units at level 0, i.e. in the original input
    pub fn unit_count(&self) -> usize {
        self.retained
            .first()
            .map(|level| level.unit_count())
            .unwrap_or_else(|| self.terminal.unit_count())
    }

    /// `(unit_count, rank)` for every level, shallowest first
    pub fn level_shapes(&self) -> Vec<(usize, usize)> {
        self.retained
            .iter()
            .map(|level| (level.unit_count(), level.rank()))
            .chain(std::iter::once((
                self.terminal.unit_count(),
                self.terminal.rank(),
            )))
            .collect()
    }

    /// Fails when the depth cap stopped the loop before a natural end
    pub fn require_fixed_point(&self) -> Result<&Self> {
        if self.termination == Termination::DepthLimit {
            return Err(CanonError::NonTerminatingClosure {
                max_depth: self.depth(),
            });
        }
        Ok(self)
    }

    /// Recover the level-0 units
    pub fn decode(&self) -> Result<Vec<Unit>> {
        Reconstructor::decode(self)
    }
}

/// Drives levels until the termination predicate holds
#[derive(Debug, Clone)]
pub struct RecursiveClosure {
    max_depth: usize,
    recursive: bool,
}

impl RecursiveClosure {
    /// Recursive closure keeping at most `max_depth` levels (at least one)
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
            recursive: true,
        }
    }

    /// Level 0 only
    pub fn single_level() -> Self {
        Self {
            max_depth: 1,
            recursive: false,
        }
    }

    pub fn from_config(config: &CanonConfig) -> Self {
        if config.recursive {
            Self::new(config.max_depth)
        } else {
            Self::single_level()
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Build level 0 from `units` and keep descending
    pub fn run(&self, units: &[Unit], width: usize) -> Result<ClosureChain> {
        let level0 = ClosureLevel::build(units, width)?;
        self.drive(Vec::new(), level0)
    }

    /// Continue a chain from its deepest level. A chain that ended at a
    /// fixed point or without reduction comes back unchanged.
    pub fn advance(&self, chain: ClosureChain) -> Result<ClosureChain> {
        match chain.termination {
            Termination::FixedPoint | Termination::NoReduction => Ok(chain),
            Termination::DepthLimit | Termination::Disabled => {
                self.drive(chain.retained, chain.terminal)
            }
        }
    }

    fn drive(
        &self,
        mut retained: Vec<RetainedLevel>,
        mut current: ClosureLevel,
    ) -> Result<ClosureChain> {
        loop {
            let depth = retained.len();
            info!(
                "Level {}: {} units, rank {}",
                depth,
                current.unit_count(),
                current.rank()
            );

            let stop = if current.is_fixed_point() {
                Some(Termination::FixedPoint)
            } else if !self.recursive {
                Some(Termination::Disabled)
            } else if current.next_unit_count() >= current.unit_count() {
                Some(Termination::NoReduction)
            } else if depth + 1 >= self.max_depth {
                warn!(
                    "Closure stopped at depth limit {} with {} units still reducible",
                    self.max_depth,
                    current.unit_count()
                );
                Some(Termination::DepthLimit)
            } else {
                None
            };

            if let Some(termination) = stop {
                info!(
                    "Closure finished after {} levels: {}",
                    depth + 1,
                    termination.describe()
                );
                return Ok(ClosureChain {
                    retained,
                    terminal: current,
                    termination,
                });
            }

            let next = ClosureLevel::build(&current.next_input(), current.width())?;
            retained.push(current.retain());
            current = next;
        }
    }
}
