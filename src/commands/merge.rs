use crate::feature::SiteKind;
use crate::gff::{read_gff, write_gff};
use crate::merge::{merge, MergeConfig};
use crate::table::{read_classified, ClassifiedRow};
use log::info;
use std::fs::File;
use std::io::{self, BufWriter, Write};

/// Files read and written by the merge command
#[derive(Debug, Clone)]
pub struct MergePaths {
    pub forward_table: String,
    pub reverse_table: String,
    pub external_gff: String,
    pub sites_output: String,
    pub artifacts_output: String,
}

impl MergePaths {
    /// The file layout produced by classifying `<prefix>_ts_<kind>.tsv` files
    pub fn from_prefix(prefix: &str, site: SiteKind, wobble: i64) -> Self {
        let (forward, reverse) = site.feature_kinds();
        MergePaths {
            forward_table: format!("{}_ts_{}_{}.tsv", prefix, forward.code(), site),
            reverse_table: format!("{}_ts_{}_{}.tsv", prefix, reverse.code(), site),
            external_gff: format!("{}_{}.gff3", prefix, site),
            sites_output: format!("{}_not_ts_{}.gff3", prefix, site),
            artifacts_output: format!("{}_ts_{}w{}.gff3", prefix, site, wobble),
        }
    }
}

/// Merge already loaded classified rows with the external annotation and
/// write both outputs.
pub fn merge_rows(
    forward: &[ClassifiedRow],
    reverse: &[ClassifiedRow],
    paths: &MergePaths,
    config: &MergeConfig,
) -> io::Result<()> {
    info!("Creating {} template-switching gff files...", config.site);
    let external = read_gff(&paths.external_gff)?;
    let output = merge(forward, reverse, external, config);

    for (path, records) in [
        (&paths.sites_output, &output.sites),
        (&paths.artifacts_output, &output.artifacts),
    ] {
        let mut writer = BufWriter::new(File::create(path)?);
        write_gff(&mut writer, records)?;
        writer.flush()?;
        info!("Wrote {} records to '{}'", records.len(), path);
    }
    Ok(())
}

pub fn run_merge(paths: &MergePaths, config: &MergeConfig) -> io::Result<()> {
    let forward = read_classified(&paths.forward_table)?;
    let reverse = read_classified(&paths.reverse_table)?;
    merge_rows(&forward, &reverse, paths, config)
}
