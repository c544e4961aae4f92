use crate::classify::ClassifyConfig;
use crate::commands::classify::{run_classify, ClassifyPaths};
use crate::commands::merge::{merge_rows, MergePaths};
use crate::feature::{FeatureKind, SiteKind};
use crate::merge::MergeConfig;
use crate::table::{read_classified, ClassifiedRow};
use log::{info, warn};
use std::io;

/// Inputs shared by both classifications of a full run
#[derive(Debug, Clone)]
pub struct RunInputs {
    pub prefix: String,
    pub reference: String,
    pub dictionary: String,
}

fn classify_strand(
    inputs: &RunInputs,
    kind: FeatureKind,
    template: &ClassifyConfig,
) -> io::Result<Vec<ClassifiedRow>> {
    let paths = ClassifyPaths {
        coverage_file: format!("{}_out_allcov.tsv", inputs.prefix),
        feature_file: format!("{}_ts_{}.tsv", inputs.prefix, kind.code()),
        all_hits_file: None,
        reference: inputs.reference.clone(),
        dictionary: inputs.dictionary.clone(),
        output: None,
    };
    let config = ClassifyConfig {
        feature: kind,
        ..template.clone()
    };

    match run_classify(&paths, &config)? {
        Some(table) => Ok(read_classified(&table)?),
        None => {
            warn!("No {} candidates; continuing with the other strand", kind);
            Ok(Vec::new())
        }
    }
}

/// Classify both strands of `site` and merge them with `<prefix>_<site>.gff3`.
pub fn run_pipeline(
    inputs: &RunInputs,
    site: SiteKind,
    classify: &ClassifyConfig,
    merge: &MergeConfig,
) -> io::Result<()> {
    let (forward_kind, reverse_kind) = site.feature_kinds();
    info!(
        "Running {} pipeline on '{}' ({} and {} ends)",
        site, inputs.prefix, reverse_kind, forward_kind
    );

    let reverse = classify_strand(inputs, reverse_kind, classify)?;
    let forward = classify_strand(inputs, forward_kind, classify)?;

    let paths = MergePaths::from_prefix(&inputs.prefix, site, merge.wobble);
    merge_rows(&forward, &reverse, &paths, merge)
}
