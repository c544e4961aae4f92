//! Cross-source merge of classified ends with an existing annotation.
//!
//! Records of both strands of one site kind, plus the external annotation,
//! are clustered by start coordinate and each cluster is reduced to a single
//! representative.

use crate::feature::{SiteKind, Strand};
use crate::gff::GffRecord;
use crate::table::ClassifiedRow;
use log::{debug, info};
use std::cmp::Ordering;

/// Where a record entered the merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Site,
    Artifact,
    External,
}

#[derive(Debug, Clone)]
pub struct AnnotationRecord {
    pub record: GffRecord,
    pub origin: Origin,
    pub cluster_id: usize,
    pub is_greatest: bool,
    pub is_picked: bool,
}

impl AnnotationRecord {
    pub fn new(record: GffRecord, origin: Origin) -> Self {
        AnnotationRecord {
            record,
            origin,
            cluster_id: 0,
            is_greatest: false,
            is_picked: false,
        }
    }
}

/// Configuration for the merge step
#[derive(Debug, Clone)]
pub struct MergeConfig {
    pub site: SiteKind,
    pub wobble: i64,
    /// Value of the source column for records built from classified tables
    pub source: String,
}

impl MergeConfig {
    pub fn new(site: SiteKind) -> Self {
        MergeConfig {
            site,
            wobble: 10,
            source: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

/// Final representatives, split by label
#[derive(Debug, Default)]
pub struct MergeOutput {
    pub sites: Vec<GffRecord>,
    pub artifacts: Vec<GffRecord>,
}

/// One-position records for the classified rows carrying `label`
pub fn records_from_rows(rows: &[ClassifiedRow], label: &str, strand: Strand, source: &str) -> Vec<GffRecord> {
    rows.iter()
        .filter(|row| row.feature == label)
        .map(|row| GffRecord {
            contig: row.contig.clone(),
            source: source.to_string(),
            feature: label.to_string(),
            start: row.pos,
            end: row.pos,
            score: row.count as f64,
            strand,
            frame: ".".to_string(),
            attributes: row.count.to_string(),
        })
        .collect()
}

fn by_contig_then_start(a: &GffRecord, b: &GffRecord) -> Ordering {
    natord::compare(&a.contig, &b.contig).then(a.start.cmp(&b.start))
}

/// Number clusters over records sorted by contig and start.
///
/// A record opens a new cluster when it is on another contig than the
/// previous one, or starts more than `wobble` after it. Returns the next
/// unused cluster id.
pub fn assign_clusters(records: &mut [AnnotationRecord], wobble: i64, first_id: usize) -> usize {
    let mut next_id = first_id;
    for i in 0..records.len() {
        // Contig changes always split, even when the starts are close
        let opens = i == 0
            || records[i].record.contig != records[i - 1].record.contig
            || records[i].record.start - records[i - 1].record.start > wobble;
        if opens {
            next_id += 1;
        }
        records[i].cluster_id = next_id - 1;
    }
    next_id
}

/// Mark the best-scoring records of one cluster, and pick one of them.
///
/// Among tied best scores the leftmost or rightmost start is kept; at equal
/// starts the record listed first wins.
pub fn pick_in_cluster(cluster: &mut [AnnotationRecord], leftmost: bool) {
    let max = cluster
        .iter()
        .map(|r| r.record.score)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut chosen: Option<usize> = None;
    for i in 0..cluster.len() {
        cluster[i].is_greatest = cluster[i].record.score == max;
        cluster[i].is_picked = false;
        if !cluster[i].is_greatest {
            continue;
        }
        let better = match chosen {
            None => true,
            Some(best) => {
                let (start, best_start) = (cluster[i].record.start, cluster[best].record.start);
                if leftmost {
                    start < best_start
                } else {
                    start > best_start
                }
            }
        };
        if better {
            chosen = Some(i);
        }
    }
    if let Some(best) = chosen {
        cluster[best].is_picked = true;
    }
}

/// Cluster the records of one strand and pick a representative per cluster.
///
/// Records are reordered by contig and start; the sort is stable, so input
/// order breaks ties.
pub fn resolve_strand(records: &mut [AnnotationRecord], site: SiteKind, strand: Strand, wobble: i64) {
    records.sort_by(|a, b| by_contig_then_start(&a.record, &b.record));
    let clusters = assign_clusters(records, wobble, 0);
    let leftmost = site.prefers_leftmost(strand);

    let mut begin = 0;
    while begin < records.len() {
        let id = records[begin].cluster_id;
        let mut end = begin + 1;
        while end < records.len() && records[end].cluster_id == id {
            end += 1;
        }
        pick_in_cluster(&mut records[begin..end], leftmost);
        begin = end;
    }
    debug!(
        "Strand {}: {} records in {} clusters",
        strand.as_char(),
        records.len(),
        clusters
    );
}

/// Merge the classified rows of both strands with the external annotation.
pub fn merge(
    forward: &[ClassifiedRow],
    reverse: &[ClassifiedRow],
    external: Vec<GffRecord>,
    config: &MergeConfig,
) -> MergeOutput {
    let site_label = config.site.label();
    let artifact_label = config.site.artifact_label();

    let mut union: Vec<AnnotationRecord> = Vec::new();
    for (label, origin) in [(site_label, Origin::Site), (artifact_label, Origin::Artifact)] {
        for (rows, strand) in [(forward, Strand::Forward), (reverse, Strand::Reverse)] {
            union.extend(
                records_from_rows(rows, label, strand, &config.source)
                    .into_iter()
                    .map(|r| AnnotationRecord::new(r, origin)),
            );
        }
    }
    let external_count = external.len();
    union.extend(
        external
            .into_iter()
            .map(|r| AnnotationRecord::new(r, Origin::External)),
    );
    info!(
        "Merging {} {} records ({} from the external annotation)",
        union.len(),
        config.site,
        external_count
    );

    let mut picked: Vec<GffRecord> = Vec::new();
    for strand in [Strand::Forward, Strand::Reverse] {
        let mut stranded: Vec<AnnotationRecord> = union
            .iter()
            .filter(|r| r.record.strand == strand)
            .cloned()
            .collect();
        resolve_strand(&mut stranded, config.site, strand, config.wobble);
        picked.extend(stranded.into_iter().filter(|r| r.is_picked).map(|r| r.record));
    }
    picked.sort_by(by_contig_then_start);

    let mut output = MergeOutput::default();
    for record in picked {
        if record.feature == site_label {
            output.sites.push(record);
        } else if record.feature == artifact_label {
            output.artifacts.push(record);
        }
    }
    info!(
        "{} {} sites and {} template-switching sites after merging",
        output.sites.len(),
        config.site,
        output.artifacts.len()
    );
    output
}
