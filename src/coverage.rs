//! Per-position sequencing depth and directional coverage sampling.

use crate::error::{Result, TsError};
use crate::feature::FeatureKind;
use crate::input::open_text;
use log::{debug, info};
use rustc_hash::FxHashMap;
use std::io::BufRead;

/// contig -> position -> depth. Read-only once built.
#[derive(Debug, Default)]
pub struct CoverageTrack {
    depths: FxHashMap<String, FxHashMap<i64, u32>>,
}

impl CoverageTrack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a three-column `contig\tpos\tdepth` file without header.
    pub fn from_path(path: &str) -> Result<Self> {
        let reader = open_text(path)?;
        let mut track = CoverageTrack::new();
        let mut positions = 0usize;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 3 {
                return Err(TsError::malformed(
                    path,
                    idx + 1,
                    "expected contig, position and depth",
                ));
            }
            let pos = fields[1].trim().parse::<i64>().map_err(|e| {
                TsError::malformed(path, idx + 1, format!("invalid position '{}': {}", fields[1], e))
            })?;
            let depth = fields[2].trim().parse::<u32>().map_err(|e| {
                TsError::malformed(path, idx + 1, format!("invalid depth '{}': {}", fields[2], e))
            })?;
            track.insert(fields[0], pos, depth);
            positions += 1;
        }

        info!(
            "Loaded coverage for {} positions on {} contigs",
            positions,
            track.depths.len()
        );
        Ok(track)
    }

    pub fn insert(&mut self, contig: &str, pos: i64, depth: u32) {
        match self.depths.get_mut(contig) {
            Some(positions) => {
                positions.insert(pos, depth);
            }
            None => {
                let mut positions = FxHashMap::default();
                positions.insert(pos, depth);
                self.depths.insert(contig.to_string(), positions);
            }
        }
    }

    /// Depth at a position; uncovered positions have depth 0.
    pub fn depth(&self, contig: &str, pos: i64) -> u32 {
        self.depths
            .get(contig)
            .and_then(|positions| positions.get(&pos))
            .copied()
            .unwrap_or(0)
    }

    /// Depth lookup restricted to one contig
    pub fn contig(&self, contig: &str) -> ContigCoverage<'_> {
        ContigCoverage {
            depths: self.depths.get(contig),
        }
    }
}

#[derive(Clone, Copy)]
pub struct ContigCoverage<'a> {
    depths: Option<&'a FxHashMap<i64, u32>>,
}

impl ContigCoverage<'_> {
    pub fn depth(&self, pos: i64) -> u32 {
        self.depths
            .and_then(|positions| positions.get(&pos))
            .copied()
            .unwrap_or(0)
    }
}

/// Signed offset and width of the run of coordinates averaged around a
/// position. Both carry the same sign, which gives the sampling direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleWindow {
    pub distance: i64,
    pub width: i64,
}

impl SampleWindow {
    /// Outward window for `kind`: the direction follows the strand, and is
    /// flipped once more for 3' ends.
    pub fn for_kind(kind: FeatureKind, distance: i64, width: i64) -> Self {
        let mut sign = kind.strand().sign();
        if kind.is_three_prime() {
            sign = -sign;
        }
        SampleWindow {
            distance: distance.abs() * sign,
            width: width.abs() * sign,
        }
    }

    /// The same window mirrored to the other side of the position
    pub fn inward(self) -> Self {
        SampleWindow {
            distance: -self.distance,
            width: -self.width,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 {
            return Err(TsError::InvalidConfig(
                "coverage sample width must not be 0".to_string(),
            ));
        }
        if self.width.abs() > self.distance.abs() {
            return Err(TsError::InvalidConfig(format!(
                "coverage sample width ({}) must not exceed the sampling distance ({})",
                self.width.abs(),
                self.distance.abs()
            )));
        }
        Ok(())
    }

    /// Half-open coordinate range sampled for `pos`
    pub fn range(&self, pos: i64) -> std::ops::Range<i64> {
        if self.distance > self.width {
            (pos + self.distance - self.width)..(pos + self.distance)
        } else if self.distance < self.width {
            (pos + self.distance)..(pos + self.distance - self.width)
        } else {
            (pos + self.distance)..(pos + self.distance + 1)
        }
    }
}

/// Mean depth over the window sampled for `pos`.
pub fn sample_mean(coverage: ContigCoverage<'_>, pos: i64, window: SampleWindow) -> f64 {
    let range = window.range(pos);
    let len = range.end - range.start;
    if len <= 0 {
        return 0.0;
    }
    let total: u64 = range.map(|p| coverage.depth(p) as u64).sum();
    total as f64 / len as f64
}

/// Coverage on both sides of a candidate end
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageProfile {
    pub before: f64,
    pub after: f64,
}

/// The outward and inward windows, derived once per run.
#[derive(Debug, Clone, Copy)]
pub struct CoverageSampler {
    pub outward: SampleWindow,
    pub inward: SampleWindow,
}

impl CoverageSampler {
    pub fn new(kind: FeatureKind, distance: i64, width: i64) -> Result<Self> {
        let outward = SampleWindow::for_kind(kind, distance, width);
        outward.validate()?;
        debug!(
            "Coverage windows for {}: outward {:?}, inward {:?}",
            kind,
            outward,
            outward.inward()
        );
        Ok(CoverageSampler {
            outward,
            inward: outward.inward(),
        })
    }

    pub fn profile(&self, coverage: ContigCoverage<'_>, pos: i64) -> CoverageProfile {
        CoverageProfile {
            before: sample_mean(coverage, pos, self.outward),
            after: sample_mean(coverage, pos, self.inward),
        }
    }
}
