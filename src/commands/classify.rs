use crate::classify::{ClassifyConfig, ClassifyContext};
use crate::counts::{default_all_hits_path, load_counts, CountIndex};
use crate::coverage::CoverageTrack;
use crate::feature::FeatureKind;
use crate::input::is_effectively_empty;
use crate::limits::LimitTable;
use crate::reference::FastaIndex;
use crate::table::write_table;
use log::{info, warn};
use std::fs::File;
use std::io::{self, BufWriter, Write};

/// Files used by the classify command
#[derive(Debug, Clone)]
pub struct ClassifyPaths {
    pub coverage_file: String,
    pub feature_file: String,
    /// Defaults to the feature file without `_ts`
    pub all_hits_file: Option<String>,
    pub reference: String,
    pub dictionary: String,
    /// Defaults to the feature file with the kind's suffix before `.tsv`
    pub output: Option<String>,
}

/// Classified table path for a feature file, e.g. `x_ts_l3.tsv` -> `x_ts_l3_tes.tsv`
pub fn default_output_path(feature_file: &str, kind: FeatureKind) -> String {
    match feature_file.strip_suffix(".tsv") {
        Some(stem) => format!("{}{}.tsv", stem, kind.output_suffix()),
        None => format!("{}{}.tsv", feature_file, kind.output_suffix()),
    }
}

/// Classify one feature file. Returns the written table, or `None` when the
/// feature file holds no observations.
pub fn run_classify(paths: &ClassifyPaths, config: &ClassifyConfig) -> io::Result<Option<String>> {
    info!("Calculating {} feature statistics...", config.feature);

    if is_effectively_empty(&paths.feature_file)? {
        warn!(
            "Feature file {} is empty. There is nothing to do here.",
            paths.feature_file
        );
        return Ok(None);
    }
    config.validate()?;

    let records = load_counts(&paths.feature_file)?;
    let feature_counts = CountIndex::from_records(&records);
    let all_hits_file = paths
        .all_hits_file
        .clone()
        .unwrap_or_else(|| default_all_hits_path(&paths.feature_file));
    let all_hits = CountIndex::from_path(&all_hits_file)?;
    info!(
        "{} positions in '{}', {} in '{}'",
        feature_counts.len(),
        paths.feature_file,
        all_hits.len(),
        all_hits_file
    );

    let coverage = CoverageTrack::from_path(&paths.coverage_file)?;
    let limits = LimitTable::from_path(&paths.dictionary)?;
    let reference = FastaIndex::from_path(&paths.reference)?;

    let context = ClassifyContext::new(
        config,
        &coverage,
        &feature_counts,
        &all_hits,
        &reference,
        &limits,
    )?;
    let rows = context.classify_all(records)?;

    let output = paths
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&paths.feature_file, config.feature));
    let mut writer = BufWriter::new(File::create(&output)?);
    write_table(&mut writer, &rows, config.check_surroundings)?;
    writer.flush()?;
    info!("Wrote {} rows to '{}'", rows.len(), output);

    Ok(Some(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path("run/x_ts_l3.tsv", FeatureKind::L3),
            "run/x_ts_l3_tes.tsv"
        );
        assert_eq!(
            default_output_path("x_ts_r5.tsv", FeatureKind::R5),
            "x_ts_r5_tss.tsv"
        );
        assert_eq!(
            default_output_path("x_ts_in.tsv", FeatureKind::Intron),
            "x_ts_intron.tsv"
        );
        assert_eq!(default_output_path("counts", FeatureKind::R3), "counts_tes.tsv");
    }

    #[test]
    fn test_empty_feature_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let feature_file = dir.path().join("x_ts_l3.tsv");
        std::fs::write(&feature_file, "").unwrap();

        // Nothing else exists; none of it may be opened
        let paths = ClassifyPaths {
            coverage_file: dir.path().join("missing_cov.tsv").to_string_lossy().into_owned(),
            feature_file: feature_file.to_string_lossy().into_owned(),
            all_hits_file: None,
            reference: dir.path().join("missing.fa").to_string_lossy().into_owned(),
            dictionary: dir.path().join("missing_dict.tsv").to_string_lossy().into_owned(),
            output: None,
        };
        let config = ClassifyConfig::new(FeatureKind::L3);
        assert_eq!(run_classify(&paths, &config).unwrap(), None);
        assert!(!dir.path().join("x_ts_l3_tes.tsv").exists());
    }
}
