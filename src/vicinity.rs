use crate::counts::CountIndex;

/// Read-end counts around a candidate, one value per offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vicinity {
    pub values: Vec<u32>,
    pub sum: u64,
}

/// Collect the counts of `source` for `pos - radius ..= pos + radius`.
///
/// With `reverse` set the vector runs from the highest coordinate down.
pub fn collect(source: &CountIndex, contig: &str, pos: i64, radius: i64, reverse: bool) -> Vicinity {
    let mut values: Vec<u32> = (pos - radius..=pos + radius)
        .map(|p| source.get(contig, p))
        .collect();
    if reverse {
        values.reverse();
    }
    let sum = values.iter().map(|&v| v as u64).sum();
    Vicinity { values, sum }
}

/// Column names for the per-offset values, prefixed with `mark`
pub fn column_names(mark: char, radius: i64) -> Vec<String> {
    (-radius..=radius).map(|off| format!("{}{}", mark, off)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{PositionCount, PositionKey};

    fn index(entries: &[(&str, i64, u32)]) -> CountIndex {
        let records: Vec<PositionCount> = entries
            .iter()
            .map(|&(c, p, n)| PositionCount {
                key: PositionKey::new(c, p),
                count: n,
            })
            .collect();
        CountIndex::from_records(&records)
    }

    #[test]
    fn test_sums_and_missing_positions() {
        let source = index(&[("chr1", 98, 2), ("chr1", 100, 5), ("chr1", 103, 1), ("chr2", 100, 9)]);
        let forward = collect(&source, "chr1", 100, 2, false);
        assert_eq!(forward.values, vec![2, 0, 5, 0, 0]);
        assert_eq!(forward.sum, 7);

        let reversed = collect(&source, "chr1", 100, 2, true);
        assert_eq!(reversed.values, vec![0, 0, 5, 0, 2]);
        assert_eq!(reversed.sum, forward.sum);

        let empty = collect(&source, "chr3", 100, 10, false);
        assert_eq!(empty.values.len(), 21);
        assert_eq!(empty.sum, 0);
    }

    #[test]
    fn test_column_names() {
        assert_eq!(column_names('f', 1), vec!["f-1", "f0", "f1"]);
    }
}
