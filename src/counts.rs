//! Read-end count files.
//!
//! Each line holds a `('contig', position)` key followed by the number of
//! reads ending there, separated by a tab.

use crate::error::{Result, TsError};
use crate::feature::{PositionCount, PositionKey};
use crate::input::open_text;
use log::debug;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::io::BufRead;
use std::path::Path;
use std::sync::OnceLock;

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^\(\s*(?:'([^']*)'|"([^"]*)")\s*,\s*(-?\d+)\s*\)$"#)
            .expect("static key pattern is valid")
    })
}

/// Parse a `('contig', 123)` key.
pub fn parse_key(text: &str) -> Option<PositionKey> {
    let caps = key_pattern().captures(text.trim())?;
    let contig = caps.get(1).or_else(|| caps.get(2))?.as_str();
    let pos = caps.get(3)?.as_str().parse::<i64>().ok()?;
    Some(PositionKey::new(contig, pos))
}

fn parse_count_line(line: &str, file: &str, line_no: usize) -> Result<PositionCount> {
    let mut fields = line.split('\t');
    let key_field = fields.next().unwrap_or("");
    let count_field = fields
        .next()
        .ok_or_else(|| TsError::malformed(file, line_no, "expected a key and a count"))?;

    let key = parse_key(key_field).ok_or_else(|| {
        TsError::malformed(file, line_no, format!("unparsable position key '{}'", key_field))
    })?;
    let count = count_field.trim().parse::<u32>().map_err(|e| {
        TsError::malformed(file, line_no, format!("invalid count '{}': {}", count_field, e))
    })?;

    Ok(PositionCount { key, count })
}

/// Load all observations of a count file, in file order.
pub fn load_counts(path: &str) -> Result<Vec<PositionCount>> {
    let reader = open_text(path)?;
    let mut records = Vec::new();
    let mut seen: FxHashMap<PositionKey, usize> = FxHashMap::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = parse_count_line(&line, path, idx + 1)?;
        if let Some(first) = seen.insert(record.key.clone(), idx + 1) {
            return Err(TsError::malformed(
                path,
                idx + 1,
                format!(
                    "position {}:{} already listed at line {}",
                    record.key.contig, record.key.pos, first
                ),
            ));
        }
        records.push(record);
    }

    debug!("Loaded {} positions from '{}'", records.len(), path);
    Ok(records)
}

/// Position-indexed counts used for vicinity sums.
#[derive(Debug, Default)]
pub struct CountIndex {
    counts: FxHashMap<PositionKey, u32>,
}

impl CountIndex {
    pub fn from_records(records: &[PositionCount]) -> Self {
        CountIndex {
            counts: records.iter().map(|r| (r.key.clone(), r.count)).collect(),
        }
    }

    pub fn from_path(path: &str) -> Result<Self> {
        Ok(Self::from_records(&load_counts(path)?))
    }

    /// Count at a position, 0 if no read ends there
    pub fn get(&self, contig: &str, pos: i64) -> u32 {
        self.counts
            .get(&PositionKey::new(contig, pos))
            .copied()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// The all-hits count file that accompanies a template-switching count file:
/// the same path with the first `_ts` of the file name removed.
pub fn default_all_hits_path(feature_file: &str) -> String {
    let path = Path::new(feature_file);
    match path.file_name().and_then(|name| name.to_str()) {
        Some(name) => path
            .with_file_name(name.replacen("_ts", "", 1))
            .to_string_lossy()
            .into_owned(),
        None => feature_file.to_string(),
    }
}

/// Group observations per contig, keeping file order within a contig.
pub fn group_by_contig(records: Vec<PositionCount>) -> FxHashMap<String, Vec<(i64, u32)>> {
    let mut groups: FxHashMap<String, Vec<(i64, u32)>> = FxHashMap::default();
    for record in records {
        groups
            .entry(record.key.contig)
            .or_default()
            .push((record.key.pos, record.count));
    }
    groups
}
