use crate::error::{Result, TsError};
use crate::input::open_text;
use log::debug;
use rustc_hash::FxHashMap;
use std::io::BufRead;

/// Minimum support ratio required for a candidate 3' end, keyed by the
/// poly-A run length found next to it.
#[derive(Debug, Default, Clone)]
pub struct LimitTable {
    limits: FxHashMap<u32, f64>,
}

impl LimitTable {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u32, f64)>) -> Self {
        LimitTable {
            limits: pairs.into_iter().collect(),
        }
    }

    /// Load a tab-separated table with a header row holding a `limit` column.
    ///
    /// A column before `limit` holds the poly-A length; without one the
    /// lengths are the 0-based data row numbers. The first column is taken as
    /// the length even when its values are not the contiguous row numbers
    /// `0..n`, so gapped index columns key by their own values.
    pub fn from_path(path: &str) -> Result<Self> {
        let mut lines = open_text(path)?.lines();

        let header = match lines.next() {
            Some(line) => line?,
            None => return Err(TsError::malformed(path, 1, "missing header row")),
        };
        let columns: Vec<&str> = header.split('\t').map(str::trim).collect();
        let limit_col = columns
            .iter()
            .position(|&c| c == "limit")
            .ok_or_else(|| TsError::malformed(path, 1, "no 'limit' column in header"))?;
        let key_col = if limit_col > 0 { Some(0) } else { None };

        let mut limits = FxHashMap::default();
        let mut row = 0u32;
        for (idx, line) in lines.enumerate() {
            let line = line?;
            let line_no = idx + 2;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();

            let key = match key_col {
                Some(col) => {
                    let text = column(&fields, col, path, line_no)?;
                    text.parse::<u32>().map_err(|e| {
                        TsError::malformed(path, line_no, format!("invalid length '{}': {}", text, e))
                    })?
                }
                None => row,
            };
            let text = column(&fields, limit_col, path, line_no)?;
            let limit = text.parse::<f64>().map_err(|e| {
                TsError::malformed(path, line_no, format!("invalid limit '{}': {}", text, e))
            })?;

            limits.insert(key, limit);
            row += 1;
        }

        debug!("Loaded {} poly-A limits from '{}'", limits.len(), path);
        Ok(LimitTable { limits })
    }

    pub fn get(&self, poly_a_length: u32) -> Result<f64> {
        self.limits
            .get(&poly_a_length)
            .copied()
            .ok_or(TsError::MissingLimitEntry(poly_a_length))
    }

    pub fn len(&self) -> usize {
        self.limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }
}

fn column<'a>(fields: &[&'a str], col: usize, path: &str, line_no: usize) -> Result<&'a str> {
    fields
        .get(col)
        .map(|f| f.trim())
        .ok_or_else(|| TsError::malformed(path, line_no, format!("missing column {}", col + 1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexed_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dict.tsv");
        std::fs::write(&path, "\tlimit\n0\t0.05\n1\t0.04\n20\t0.5\n").unwrap();
        let table = LimitTable::from_path(path.to_str().unwrap()).unwrap();
        assert_eq!(table.get(0).unwrap(), 0.05);
        assert_eq!(table.get(20).unwrap(), 0.5);
        assert!(matches!(table.get(2), Err(TsError::MissingLimitEntry(2))));
    }

    #[test]
    fn test_row_ordinal_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dict.tsv");
        std::fs::write(&path, "limit\n0.1\n0.2\n").unwrap();
        let table = LimitTable::from_path(path.to_str().unwrap()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1).unwrap(), 0.2);
    }

    #[test]
    fn test_bad_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dict.tsv");
        std::fs::write(&path, "length\tvalue\n0\t0.1\n").unwrap();
        assert!(LimitTable::from_path(path.to_str().unwrap()).is_err());

        std::fs::write(&path, "\tlimit\n0\tlots\n").unwrap();
        assert!(LimitTable::from_path(path.to_str().unwrap()).is_err());
    }
}
