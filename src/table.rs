//! Classified feature tables: the output of the classify step and the input
//! of the merge step.

use crate::classify::CandidateFeature;
use crate::error::{Result, TsError};
use crate::input::open_text;
use crate::vicinity::column_names;
use std::io::{BufRead, Write};

fn header(radius: i64) -> Vec<String> {
    let mut columns: Vec<String> = [
        "contig",
        "pos",
        "count",
        "average",
        "is_greatest",
        "is_picked",
        "coverage_before",
        "coverage_after",
        "ratio",
        "is_qualified",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect();
    columns.extend(column_names('f', radius));
    columns.push("fsum".to_string());
    columns.extend(column_names('r', radius));
    columns.push("rsum".to_string());
    columns.push("polyA_length".to_string());
    columns.push("feature".to_string());
    columns
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("\t")
}

/// Write rows as a tab-separated table with a header line.
///
/// `radius` is the vicinity window the rows were built with.
pub fn write_table<W: Write>(writer: &mut W, rows: &[CandidateFeature], radius: i64) -> Result<()> {
    writeln!(writer, "{}", header(radius).join("\t"))?;
    for row in rows {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.contig,
            row.pos,
            row.count,
            row.average,
            row.is_greatest,
            row.is_picked,
            row.coverage.before,
            row.coverage.after,
            row.ratio,
            row.is_qualified,
            join(&row.fsupport.values),
            row.fsupport.sum,
            join(&row.rsupport.values),
            row.rsupport.sum,
            row.poly_a_column(),
            row.label.as_str(),
        )?;
    }
    Ok(())
}

/// The columns of a classified table the merge step needs
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRow {
    pub contig: String,
    pub pos: i64,
    pub count: u32,
    /// Empty when the row was never labelled
    pub feature: String,
}

fn column_index(columns: &[&str], name: &str, path: &str) -> Result<usize> {
    columns
        .iter()
        .position(|&c| c == name)
        .ok_or_else(|| TsError::malformed(path, 1, format!("missing '{}' column", name)))
}

/// Read back the contig, position, count and label of every row.
pub fn read_classified(path: &str) -> Result<Vec<ClassifiedRow>> {
    let mut lines = open_text(path)?.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => return Ok(Vec::new()),
    };
    let columns: Vec<&str> = header.split('\t').collect();
    let contig_col = column_index(&columns, "contig", path)?;
    let pos_col = column_index(&columns, "pos", path)?;
    let count_col = column_index(&columns, "count", path)?;
    let feature_col = column_index(&columns, "feature", path)?;

    let mut rows = Vec::new();
    for (idx, line) in lines.enumerate() {
        let line = line?;
        let line_no = idx + 2;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let get = |col: usize| -> Result<String> {
            fields
                .get(col)
                .map(|f| f.to_string())
                .ok_or_else(|| TsError::malformed(path, line_no, "row is shorter than the header"))
        };

        let pos_text = get(pos_col)?;
        let count_text = get(count_col)?;
        rows.push(ClassifiedRow {
            contig: get(contig_col)?,
            pos: pos_text.parse().map_err(|e| {
                TsError::malformed(path, line_no, format!("invalid position '{}': {}", pos_text, e))
            })?,
            count: count_text.parse().map_err(|e| {
                TsError::malformed(path, line_no, format!("invalid count '{}': {}", count_text, e))
            })?,
            // A trailing empty label may be dropped by other tools
            feature: fields.get(feature_col).map(|f| f.to_string()).unwrap_or_default(),
        });
    }
    Ok(rows)
}
