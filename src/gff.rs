//! Nine-column interval annotations (GFF3 body lines).

use crate::error::{Result, TsError};
use crate::feature::Strand;
use crate::input::open_text;
use std::io::{BufRead, Write};

#[derive(Debug, Clone, PartialEq)]
pub struct GffRecord {
    pub contig: String,
    pub source: String,
    pub feature: String,
    pub start: i64,
    pub end: i64,
    pub score: f64,
    pub strand: Strand,
    pub frame: String,
    pub attributes: String,
}

pub fn parse_gff_line(line: &str, file: &str, line_no: usize) -> Result<GffRecord> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 9 {
        return Err(TsError::malformed(
            file,
            line_no,
            format!("expected 9 columns, found {}", fields.len()),
        ));
    }

    let int = |text: &str, what: &str| -> Result<i64> {
        text.trim().parse::<i64>().map_err(|e| {
            TsError::malformed(file, line_no, format!("invalid {} '{}': {}", what, text, e))
        })
    };
    let score = fields[5].trim().parse::<f64>().map_err(|e| {
        TsError::malformed(file, line_no, format!("invalid score '{}': {}", fields[5], e))
    })?;
    let strand = fields[6]
        .trim()
        .chars()
        .next()
        .and_then(Strand::from_char)
        .ok_or_else(|| {
            TsError::malformed(file, line_no, format!("invalid strand '{}'", fields[6]))
        })?;

    Ok(GffRecord {
        contig: fields[0].to_string(),
        source: fields[1].to_string(),
        feature: fields[2].to_string(),
        start: int(fields[3], "start")?,
        end: int(fields[4], "end")?,
        score,
        strand,
        frame: fields[7].to_string(),
        attributes: fields[8..].join("\t"),
    })
}

/// Read all records, skipping comments and blank lines.
pub fn read_gff(path: &str) -> Result<Vec<GffRecord>> {
    let reader = open_text(path)?;
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        records.push(parse_gff_line(&line, path, idx + 1)?);
    }
    Ok(records)
}

pub fn write_gff<'a, W, I>(writer: &mut W, records: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a GffRecord>,
{
    for record in records {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            record.contig,
            record.source,
            record.feature,
            record.start,
            record.end,
            record.score,
            record.strand.as_char(),
            record.frame,
            record.attributes
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let record = parse_gff_line("chr1\tsrc\ttes\t100\t100\t12\t-\t.\t12", "a.gff3", 1).unwrap();
        assert_eq!(record.start, 100);
        assert_eq!(record.score, 12.0);
        assert_eq!(record.strand, Strand::Reverse);

        assert!(parse_gff_line("chr1\tsrc\ttes\t100\t100\t.\t-\t.\t12", "a.gff3", 1).is_err());
        assert!(parse_gff_line("chr1\tsrc\ttes\t100\t100\t3\t?\t.\t12", "a.gff3", 1).is_err());
        assert!(parse_gff_line("chr1\tsrc\ttes\t100", "a.gff3", 1).is_err());
    }

    #[test]
    fn test_write_integral_score() {
        let record = parse_gff_line("chr1\tsrc\ttes\t5\t5\t7\t+\t.\tID=x", "a.gff3", 1).unwrap();
        let mut out = Vec::new();
        write_gff(&mut out, [&record]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "chr1\tsrc\ttes\t5\t5\t7\t+\t.\tID=x\n");
    }

    #[test]
    fn test_read_skips_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.gff3");
        std::fs::write(&path, "##gff-version 3\n\nchr1\ts\ttes\t1\t1\t2\t+\t.\t2\n").unwrap();
        assert_eq!(read_gff(path.to_str().unwrap()).unwrap().len(), 1);
    }
}
