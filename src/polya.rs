//! Genomic poly-A run scoring next to candidate 3' ends.

use crate::error::Result;
use crate::feature::Strand;
use crate::reference::SequenceIndex;

/// Number of reference bases inspected next to a candidate
pub const POLYA_WINDOW: i64 = 20;

/// Score an adenine run, scanning `window` from its last base to its first.
///
/// Each `A` adds one, anything else subtracts one. The scan ends once the
/// running score drops below zero; the best score seen (at least 0) is the
/// run length.
pub fn score_run(window: &[u8]) -> u32 {
    let mut score: i32 = 0;
    let mut best: i32 = 0;
    for &base in window.iter().rev() {
        if base.eq_ignore_ascii_case(&b'A') {
            score += 1;
        } else {
            score -= 1;
        }
        if score < 0 {
            break;
        }
        best = best.max(score);
    }
    best as u32
}

pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&b| match b {
            b'A' => b'T',
            b'T' => b'A',
            b'G' => b'C',
            b'C' => b'G',
            b'a' => b't',
            b't' => b'a',
            b'g' => b'c',
            b'c' => b'g',
            other => other,
        })
        .collect()
}

/// Reference bases next to `pos` (1-based), oriented so that the base
/// closest to the candidate comes last.
///
/// Forward strand: the 20 bases ending at `pos`. Reverse strand: the 20 bases
/// starting at `pos`, reverse-complemented. The range is clamped to the contig.
pub fn oriented_window<S: SequenceIndex + ?Sized>(
    reference: &S,
    contig: &str,
    pos: i64,
    strand: Strand,
) -> Result<Vec<u8>> {
    let length = reference.sequence_length(contig)? as i64;
    let (start, end) = match strand {
        Strand::Forward => (pos - POLYA_WINDOW, pos),
        Strand::Reverse => (pos - 1, pos + POLYA_WINDOW - 1),
    };
    let start = start.clamp(0, length);
    let end = end.clamp(0, length);
    if start >= end {
        return Ok(Vec::new());
    }

    let seq = reference.fetch_sequence(contig, start, end)?;
    Ok(match strand {
        Strand::Forward => seq,
        Strand::Reverse => reverse_complement(&seq),
    })
}

/// Poly-A run length next to a candidate end
pub fn poly_a_length<S: SequenceIndex + ?Sized>(
    reference: &S,
    contig: &str,
    pos: i64,
    strand: Strand,
) -> Result<u32> {
    let window = oriented_window(reference, contig, pos, strand)?;
    Ok(score_run(&window))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TsError;
    use crate::reference::InMemoryReference;

    #[test]
    fn test_score_run() {
        assert_eq!(score_run(b"AAAAAAAAAAAAAAAAAAAA"), 20);
        assert_eq!(score_run(b"CCCCGGGGTTTTCCCCGGGG"), 0);
        assert_eq!(score_run(b"TTTTAAAAAAAAAAAAAAAA"), 16);
        assert_eq!(score_run(b"aaaa"), 4);
        assert_eq!(score_run(b""), 0);
        // AAGA from the end: 1,2,1,2 -> then T drops to 1, T to 0, T to -1
        assert_eq!(score_run(b"TTTAGAA"), 2);
        // Isolated mismatch is tolerated
        assert_eq!(score_run(b"AAAAACAAAA"), 8);
    }

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement(b"AACGTt"), b"aACGTT".to_vec());
    }

    #[test]
    fn test_forward_window() {
        // 1-based positions 21..=30 are A, the candidate at 30 ends the window
        let mut seq = vec![b'C'; 20];
        seq.extend(vec![b'A'; 10]);
        seq.extend(vec![b'G'; 20]);
        let reference = InMemoryReference::from_pairs(vec![("chr1", seq)]);

        let window = oriented_window(&reference, "chr1", 30, Strand::Forward).unwrap();
        assert_eq!(window.len(), 20);
        assert_eq!(&window[10..], b"AAAAAAAAAA");
        assert_eq!(poly_a_length(&reference, "chr1", 30, Strand::Forward).unwrap(), 10);
    }

    #[test]
    fn test_reverse_window() {
        // T run at 1-based 11..=20 reads as A run on the reverse strand
        let mut seq = vec![b'G'; 10];
        seq.extend(vec![b'T'; 10]);
        seq.extend(vec![b'C'; 20]);
        let reference = InMemoryReference::from_pairs(vec![("chr1", seq)]);

        assert_eq!(poly_a_length(&reference, "chr1", 11, Strand::Reverse).unwrap(), 10);
        assert_eq!(poly_a_length(&reference, "chr1", 21, Strand::Reverse).unwrap(), 0);
    }

    #[test]
    fn test_window_clamped_at_contig_start() {
        let reference = InMemoryReference::from_pairs(vec![("chr1", b"AAAAAGGGG".to_vec())]);
        assert_eq!(poly_a_length(&reference, "chr1", 5, Strand::Forward).unwrap(), 5);
        assert_eq!(poly_a_length(&reference, "chr1", 0, Strand::Forward).unwrap(), 0);
    }

    #[test]
    fn test_missing_contig_fails() {
        let reference = InMemoryReference::from_pairs(vec![("chr1", b"AAAA".to_vec())]);
        assert!(matches!(
            poly_a_length(&reference, "chr9", 3, Strand::Forward),
            Err(TsError::MissingReferenceContig(name)) if name == "chr9"
        ));
    }
}
