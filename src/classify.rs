//! Classification of candidate transcript ends.
//!
//! Each contig goes through the same fixed sequence of stages: positions are
//! sorted in the scan order of the feature kind, coverage is sampled on both
//! sides, local maxima are picked, the qualification gate is applied, vicinity
//! support is summed, and qualifying rows finally get a poly-A run length and a
//! label.

use crate::counts::{group_by_contig, CountIndex};
use crate::coverage::{CoverageProfile, CoverageSampler, CoverageTrack};
use crate::dedup::{is_greatest, pick_from_greatest, window_average, AVERAGE_WINDOW};
use crate::error::{Result, TsError};
use crate::feature::{FeatureKind, Label, PositionCount, ScanOrder};
use crate::limits::LimitTable;
use crate::polya::poly_a_length;
use crate::reference::SequenceIndex;
use crate::vicinity::{self, Vicinity};
use log::{debug, info};
use rayon::prelude::*;

/// Configuration for the classify step
#[derive(Debug, Clone)]
pub struct ClassifyConfig {
    pub feature: FeatureKind,
    /// Minimal number of reads ending at a position
    pub minimum: u32,
    pub wobble: i64,
    /// Minimal count / coverage ratio
    pub ratio: f64,
    pub multiplier: f64,
    pub distance: i64,
    pub cov_sample: i64,
    pub check_surroundings: i64,
}

impl ClassifyConfig {
    pub fn new(feature: FeatureKind) -> Self {
        ClassifyConfig {
            feature,
            minimum: 2,
            wobble: 10,
            ratio: 0.001,
            multiplier: 1.0,
            distance: 15,
            cov_sample: 5,
            check_surroundings: 10,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.wobble < 0 {
            return Err(TsError::InvalidConfig(format!(
                "wobble must not be negative (got {})",
                self.wobble
            )));
        }
        if self.check_surroundings < 0 {
            return Err(TsError::InvalidConfig(format!(
                "vicinity window must not be negative (got {})",
                self.check_surroundings
            )));
        }
        if self.cov_sample == 0 || self.cov_sample.abs() > self.distance.abs() {
            return Err(TsError::InvalidConfig(format!(
                "coverage sample ({}) must be non-zero and not larger than the distance ({})",
                self.cov_sample, self.distance
            )));
        }
        Ok(())
    }
}

/// One candidate position with everything derived for it
#[derive(Debug, Clone)]
pub struct CandidateFeature {
    pub contig: String,
    pub pos: i64,
    pub count: u32,
    pub average: f64,
    pub is_greatest: bool,
    pub is_picked: bool,
    pub coverage: CoverageProfile,
    pub ratio: f64,
    pub is_qualified: bool,
    /// Support from the feature's own count file
    pub fsupport: Vicinity,
    /// Support from the all-hits count file
    pub rsupport: Vicinity,
    /// `None` when the row was not qualified and never scored
    pub poly_a_length: Option<u32>,
    pub label: Label,
}

impl CandidateFeature {
    /// Poly-A length as written out, -2 for rows that were not evaluated
    pub fn poly_a_column(&self) -> i64 {
        self.poly_a_length.map(|l| l as i64).unwrap_or(-2)
    }
}

pub fn is_qualified(count: u32, ratio: f64, is_picked: bool, minimum: u32, ratio_threshold: f64) -> bool {
    count >= minimum && ratio >= ratio_threshold && is_picked
}

/// Numbers the final decision is made on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evidence {
    pub rsum: u64,
    pub fsum: u64,
    pub coverage_before: f64,
    pub coverage_after: f64,
}

/// True for a genuine end, false for a template-switching artifact.
///
/// The end must explain the coverage drop, and either the all-hits support
/// outweighs the feature's own support (only when more than one all-hits read
/// is present), or the support relative to coverage beats `limit`. Zero
/// coverage is divided as if it were 1.
pub fn is_genuine(evidence: &Evidence, limit: f64, multiplier: f64) -> bool {
    let multiplier = if evidence.rsum > 1 { multiplier } else { 0.0 };
    let zero = if evidence.coverage_before == 0.0 { 1.0 } else { 0.0 };
    let support = (evidence.rsum + evidence.fsum) as f64;

    support * 100.0 > evidence.coverage_before - evidence.coverage_after
        && (evidence.rsum as f64 * multiplier >= evidence.fsum as f64
            || support / (evidence.coverage_before + zero) > limit)
}

pub fn label_for(kind: FeatureKind, genuine: bool) -> Label {
    if genuine {
        Label::Site(kind)
    } else {
        Label::Artifact(kind)
    }
}

/// Read-only inputs shared by all contigs of a run
pub struct ClassifyContext<'a, S: SequenceIndex + Sync + ?Sized> {
    pub config: &'a ClassifyConfig,
    pub sampler: CoverageSampler,
    pub coverage: &'a CoverageTrack,
    pub feature_counts: &'a CountIndex,
    pub all_hits: &'a CountIndex,
    pub reference: &'a S,
    pub limits: &'a LimitTable,
}

impl<'a, S: SequenceIndex + Sync + ?Sized> ClassifyContext<'a, S> {
    pub fn new(
        config: &'a ClassifyConfig,
        coverage: &'a CoverageTrack,
        feature_counts: &'a CountIndex,
        all_hits: &'a CountIndex,
        reference: &'a S,
        limits: &'a LimitTable,
    ) -> Result<Self> {
        config.validate()?;
        let sampler = CoverageSampler::new(config.feature, config.distance, config.cov_sample)?;
        Ok(ClassifyContext {
            config,
            sampler,
            coverage,
            feature_counts,
            all_hits,
            reference,
            limits,
        })
    }

    /// Run every stage for the positions of one contig.
    ///
    /// Rows come back in scan order.
    pub fn classify_contig(&self, contig: &str, mut points: Vec<(i64, u32)>) -> Result<Vec<CandidateFeature>> {
        let config = self.config;
        let kind = config.feature;

        match kind.scan_order() {
            ScanOrder::Ascending => points.sort_by_key(|&(pos, _)| pos),
            ScanOrder::Descending => points.sort_by_key(|&(pos, _)| std::cmp::Reverse(pos)),
        }

        let coverage = self.coverage.contig(contig);
        let averages = window_average(&points, AVERAGE_WINDOW);
        let greatest = is_greatest(&points, config.wobble);
        let positions: Vec<i64> = points.iter().map(|&(pos, _)| pos).collect();
        let picked = pick_from_greatest(&positions, &greatest, config.wobble);

        let mut rows = Vec::with_capacity(points.len());
        for (i, &(pos, count)) in points.iter().enumerate() {
            let profile = self.sampler.profile(coverage, pos);
            let ratio = count as f64 / profile.before;
            let qualified = is_qualified(count, ratio, picked[i], config.minimum, config.ratio);
            let reverse = kind.reverses_vicinity();

            rows.push(CandidateFeature {
                contig: contig.to_string(),
                pos,
                count,
                average: averages[i],
                is_greatest: greatest[i],
                is_picked: picked[i],
                coverage: profile,
                ratio,
                is_qualified: qualified,
                fsupport: vicinity::collect(self.feature_counts, contig, pos, config.check_surroundings, reverse),
                rsupport: vicinity::collect(self.all_hits, contig, pos, config.check_surroundings, reverse),
                poly_a_length: None,
                label: Label::None,
            });
        }

        for row in rows.iter_mut().filter(|row| row.is_qualified) {
            let length = poly_a_length(self.reference, contig, row.pos, kind.strand())?;
            let limit = self.limits.get(length)?;
            let evidence = Evidence {
                rsum: row.rsupport.sum,
                fsum: row.fsupport.sum,
                coverage_before: row.coverage.before,
                coverage_after: row.coverage.after,
            };
            row.poly_a_length = Some(length);
            row.label = label_for(kind, is_genuine(&evidence, limit, config.multiplier));
        }

        debug!(
            "{}: {} positions, {} picked, {} qualified",
            contig,
            rows.len(),
            rows.iter().filter(|r| r.is_picked).count(),
            rows.iter().filter(|r| r.is_qualified).count()
        );
        Ok(rows)
    }

    /// Classify all observations, contigs in parallel.
    ///
    /// Contigs come back in natural name order.
    pub fn classify_all(&self, records: Vec<PositionCount>) -> Result<Vec<CandidateFeature>> {
        let mut contigs: Vec<(String, Vec<(i64, u32)>)> = group_by_contig(records).into_iter().collect();
        contigs.sort_by(|a, b| natord::compare(&a.0, &b.0));
        info!(
            "Classifying {} features on {} contigs",
            self.config.feature,
            contigs.len()
        );

        let per_contig: Vec<Vec<CandidateFeature>> = contigs
            .into_par_iter()
            .map(|(contig, points)| self.classify_contig(&contig, points))
            .collect::<Result<_>>()?;

        let rows: Vec<CandidateFeature> = per_contig.into_iter().flatten().collect();
        let sites = rows
            .iter()
            .filter(|r| matches!(r.label, Label::Site(_)))
            .count();
        let artifacts = rows
            .iter()
            .filter(|r| matches!(r.label, Label::Artifact(_)))
            .count();
        info!(
            "{} {} sites and {} template-switching artifacts among {} positions",
            sites,
            self.config.feature.site_label(),
            artifacts,
            rows.len()
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::PositionKey;
    use crate::reference::InMemoryReference;

    fn counts(contig: &str, entries: &[(i64, u32)]) -> Vec<PositionCount> {
        entries
            .iter()
            .map(|&(pos, count)| PositionCount {
                key: PositionKey::new(contig, pos),
                count,
            })
            .collect()
    }

    fn flat_coverage(contig: &str, len: i64, depth: u32) -> CoverageTrack {
        let mut track = CoverageTrack::new();
        for pos in 0..len {
            track.insert(contig, pos, depth);
        }
        track
    }

    fn all_limits(limit: f64) -> LimitTable {
        LimitTable::from_pairs((0..=20).map(|l| (l, limit)))
    }

    #[test]
    fn test_qualification_gate() {
        assert!(is_qualified(5, 0.05, true, 2, 0.001));
        assert!(!is_qualified(1, 0.05, true, 2, 0.001));
        assert!(!is_qualified(5, 0.0005, true, 2, 0.001));
        assert!(!is_qualified(5, 0.05, false, 2, 0.001));
        assert!(is_qualified(2, 0.001, true, 2, 0.001));
    }

    #[test]
    fn test_genuine_by_ratio_over_limit() {
        let evidence = Evidence {
            rsum: 0,
            fsum: 5,
            coverage_before: 100.0,
            coverage_after: 10.0,
        };
        assert!(is_genuine(&evidence, 0.01, 1.0));
        assert!(!is_genuine(&evidence, 0.05, 1.0));
        assert_eq!(label_for(FeatureKind::R3, true).as_str(), "tes");
    }

    #[test]
    fn test_genuine_by_multiplier() {
        let evidence = Evidence {
            rsum: 6,
            fsum: 5,
            coverage_before: 1000.0,
            coverage_after: 990.0,
        };
        assert!(is_genuine(&evidence, 1.0, 1.0));
        // A single all-hits read switches the multiplier off
        let single = Evidence { rsum: 1, fsum: 3, ..evidence };
        assert!(!is_genuine(&single, 1.0, 1.0));
    }

    #[test]
    fn test_coverage_drop_must_be_explained() {
        let evidence = Evidence {
            rsum: 10,
            fsum: 1,
            coverage_before: 5000.0,
            coverage_after: 0.0,
        };
        // 11 * 100 = 1100 is not above the 5000 drop
        assert!(!is_genuine(&evidence, 0.0, 1.0));
    }

    #[test]
    fn test_zero_coverage_guard() {
        let evidence = Evidence {
            rsum: 0,
            fsum: 1,
            coverage_before: 0.0,
            coverage_after: 0.0,
        };
        // 1 / (0 + 1) = 1.0
        assert!(is_genuine(&evidence, 0.99, 1.0));
        assert!(!is_genuine(&evidence, 1.0, 1.0));
    }

    #[test]
    fn test_decision_is_pure() {
        let evidence = Evidence {
            rsum: 3,
            fsum: 7,
            coverage_before: 40.0,
            coverage_after: 20.0,
        };
        let first = is_genuine(&evidence, 0.2, 2.0);
        for _ in 0..10 {
            assert_eq!(is_genuine(&evidence, 0.2, 2.0), first);
        }
    }

    #[test]
    fn test_config_validation() {
        let mut config = ClassifyConfig::new(FeatureKind::L3);
        assert!(config.validate().is_ok());
        config.cov_sample = 20;
        assert!(config.validate().is_err());
        config.cov_sample = 0;
        assert!(config.validate().is_err());
        let mut config = ClassifyConfig::new(FeatureKind::L3);
        config.wobble = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_single_position_on_flat_coverage() {
        let config = ClassifyConfig::new(FeatureKind::R3);
        let coverage = flat_coverage("chr1", 400, 100);
        let records = counts("chr1", &[(200, 5)]);
        let feature_counts = CountIndex::from_records(&records);
        let all_hits = CountIndex::default();
        let reference = InMemoryReference::from_pairs(vec![("chr1", vec![b'C'; 400])]);
        let limits = all_limits(0.01);

        let ctx = ClassifyContext::new(&config, &coverage, &feature_counts, &all_hits, &reference, &limits)
            .unwrap();
        let rows = ctx.classify_all(records).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.coverage.before, 100.0);
        assert!((row.ratio - 0.05).abs() < 1e-12);
        assert!(row.is_greatest && row.is_picked && row.is_qualified);
        assert_eq!(row.fsupport.sum, 5);
        assert_eq!(row.rsupport.sum, 0);
        assert_eq!(row.poly_a_length, Some(0));
        // 5 * 100 > 0, and 5 / 100 > 0.01
        assert_eq!(row.label, Label::Site(FeatureKind::R3));
    }

    #[test]
    fn test_unqualified_rows_skip_reference() {
        let config = ClassifyConfig::new(FeatureKind::L3);
        let coverage = flat_coverage("chr1", 400, 100);
        // Count 1 is below the minimum of 2
        let records = counts("chr1", &[(200, 1)]);
        let feature_counts = CountIndex::from_records(&records);
        let all_hits = CountIndex::default();
        // The contig is absent from the reference; it must not be looked up
        let reference = InMemoryReference::default();
        let limits = LimitTable::default();

        let ctx = ClassifyContext::new(&config, &coverage, &feature_counts, &all_hits, &reference, &limits)
            .unwrap();
        let rows = ctx.classify_all(records).unwrap();
        assert!(!rows[0].is_qualified);
        assert_eq!(rows[0].poly_a_column(), -2);
        assert_eq!(rows[0].label, Label::None);
    }

    #[test]
    fn test_missing_reference_contig_fails() {
        let config = ClassifyConfig::new(FeatureKind::R3);
        let coverage = flat_coverage("chr1", 400, 100);
        let records = counts("chr1", &[(200, 5)]);
        let feature_counts = CountIndex::from_records(&records);
        let all_hits = CountIndex::default();
        let reference = InMemoryReference::from_pairs(vec![("chr2", vec![b'A'; 400])]);
        let limits = all_limits(0.01);

        let ctx = ClassifyContext::new(&config, &coverage, &feature_counts, &all_hits, &reference, &limits)
            .unwrap();
        assert!(matches!(
            ctx.classify_all(records),
            Err(TsError::MissingReferenceContig(_))
        ));
    }

    #[test]
    fn test_missing_limit_fails() {
        let config = ClassifyConfig::new(FeatureKind::R3);
        let coverage = flat_coverage("chr1", 400, 100);
        let records = counts("chr1", &[(200, 5)]);
        let feature_counts = CountIndex::from_records(&records);
        let all_hits = CountIndex::default();
        let reference = InMemoryReference::from_pairs(vec![("chr1", vec![b'A'; 400])]);
        // Window is all A, length 20 has no entry
        let limits = LimitTable::from_pairs((0..20).map(|l| (l, 0.01)));

        let ctx = ClassifyContext::new(&config, &coverage, &feature_counts, &all_hits, &reference, &limits)
            .unwrap();
        assert!(matches!(
            ctx.classify_all(records),
            Err(TsError::MissingLimitEntry(20))
        ));
    }

    #[test]
    fn test_close_positions_scan_direction() {
        let coverage = flat_coverage("chr1", 400, 100);
        let records = counts("chr1", &[(100, 4), (103, 4)]);
        let feature_counts = CountIndex::from_records(&records);
        let all_hits = CountIndex::default();
        let reference = InMemoryReference::from_pairs(vec![("chr1", vec![b'C'; 400])]);
        let limits = all_limits(0.01);

        for (kind, survivor) in [(FeatureKind::L3, 100), (FeatureKind::R3, 103)] {
            let config = ClassifyConfig::new(kind);
            let ctx =
                ClassifyContext::new(&config, &coverage, &feature_counts, &all_hits, &reference, &limits)
                    .unwrap();
            let rows = ctx.classify_all(records.clone()).unwrap();
            let picked: Vec<i64> = rows.iter().filter(|r| r.is_picked).map(|r| r.pos).collect();
            assert_eq!(picked, vec![survivor]);
        }
    }

    #[test]
    fn test_contigs_in_natural_order() {
        let config = ClassifyConfig::new(FeatureKind::L5);
        let coverage = CoverageTrack::new();
        let mut records = counts("chr10", &[(50, 1)]);
        records.extend(counts("chr2", &[(50, 1), (10, 1)]));
        let feature_counts = CountIndex::from_records(&records);
        let all_hits = CountIndex::default();
        let reference = InMemoryReference::default();
        let limits = LimitTable::default();

        let ctx = ClassifyContext::new(&config, &coverage, &feature_counts, &all_hits, &reference, &limits)
            .unwrap();
        let rows = ctx.classify_all(records).unwrap();
        let order: Vec<(&str, i64)> = rows.iter().map(|r| (r.contig.as_str(), r.pos)).collect();
        assert_eq!(order, vec![("chr2", 10), ("chr2", 50), ("chr10", 50)]);
    }
}
