//! Reference sequence access by contig name.

use crate::error::{Result, TsError};
use log::debug;
use rust_htslib::faidx;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::io;

// Trait for sequence fetching from different sources
pub trait SequenceIndex {
    /// Bases of `seq_name` in the 0-based half-open range `[start, end)`
    fn fetch_sequence(&self, seq_name: &str, start: i64, end: i64) -> Result<Vec<u8>>;

    fn sequence_length(&self, seq_name: &str) -> Result<usize>;
}

// One open reader per thread, reopened when another FASTA is requested
struct ThreadReader {
    path: String,
    reader: faidx::Reader,
}

fn open_reader(path: &str) -> io::Result<ThreadReader> {
    let reader = faidx::Reader::from_path(path)
        .map_err(|e| io::Error::other(format!("Failed to open FASTA file '{path}': {e}")))?;
    Ok(ThreadReader {
        path: path.to_string(),
        reader,
    })
}

thread_local! {
    // Rayon workers each keep their own handle
    static FAIDX_READER: RefCell<Option<ThreadReader>> = const { RefCell::new(None) };
}

/// Indexed FASTA reference. The `.fai` index is created next to the file if
/// it does not exist yet.
#[derive(Debug)]
pub struct FastaIndex {
    pub fasta_path: String,
    pub sequence_lengths: FxHashMap<String, usize>,
}

impl FastaIndex {
    pub fn from_path(fasta_path: &str) -> io::Result<Self> {
        let fai_path = format!("{fasta_path}.fai");

        let fai_content = match std::fs::read_to_string(&fai_path) {
            Ok(content) => content,
            Err(_) => {
                // Opening through htslib builds the index
                match faidx::Reader::from_path(fasta_path) {
                    Ok(_) => std::fs::read_to_string(&fai_path)?,
                    Err(e) => {
                        return Err(io::Error::other(format!(
                            "Failed to create FASTA index for '{fasta_path}': {e}"
                        )));
                    }
                }
            }
        };

        let mut sequence_lengths = FxHashMap::default();
        for line in fai_content.lines() {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() >= 2 && !fields[0].is_empty() {
                if let Ok(length) = fields[1].parse::<usize>() {
                    sequence_lengths.insert(fields[0].to_string(), length);
                }
            }
        }
        debug!(
            "Indexed {} sequences in '{}'",
            sequence_lengths.len(),
            fasta_path
        );

        Ok(FastaIndex {
            fasta_path: fasta_path.to_string(),
            sequence_lengths,
        })
    }
}

impl SequenceIndex for FastaIndex {
    fn fetch_sequence(&self, seq_name: &str, start: i64, end: i64) -> Result<Vec<u8>> {
        if !self.sequence_lengths.contains_key(seq_name) {
            return Err(TsError::MissingReferenceContig(seq_name.to_string()));
        }
        if start >= end {
            return Ok(Vec::new());
        }

        FAIDX_READER.with(|cell| -> Result<Vec<u8>> {
            let mut slot = cell.borrow_mut();
            let open = match slot.take() {
                Some(open) if open.path == self.fasta_path => slot.insert(open),
                _ => slot.insert(open_reader(&self.fasta_path)?),
            };
            let reader = &open.reader;

            // fetch_seq expects a 0-based inclusive end coordinate
            match reader.fetch_seq(seq_name, start as usize, (end - 1) as usize) {
                Ok(seq) => {
                    let mut seq_vec = seq.to_vec();
                    unsafe { libc::free(seq.as_ptr() as *mut std::ffi::c_void) }; // Free up memory to avoid memory leak (bug https://github.com/rust-bio/rust-htslib/issues/401#issuecomment-1704290171)
                    seq_vec.make_ascii_uppercase();
                    Ok(seq_vec)
                }
                Err(e) => Err(TsError::Io(io::Error::other(format!(
                    "Failed to fetch sequence for {seq_name}: {e}"
                )))),
            }
        })
    }

    fn sequence_length(&self, seq_name: &str) -> Result<usize> {
        self.sequence_lengths
            .get(seq_name)
            .copied()
            .ok_or_else(|| TsError::MissingReferenceContig(seq_name.to_string()))
    }
}

/// Sequences held in memory, upper-cased on insertion.
#[derive(Debug, Default)]
pub struct InMemoryReference {
    sequences: FxHashMap<String, Vec<u8>>,
}

impl InMemoryReference {
    pub fn from_pairs<N: Into<String>>(pairs: Vec<(N, Vec<u8>)>) -> Self {
        let sequences = pairs
            .into_iter()
            .map(|(name, mut seq)| {
                seq.make_ascii_uppercase();
                (name.into(), seq)
            })
            .collect();
        InMemoryReference { sequences }
    }
}

impl SequenceIndex for InMemoryReference {
    fn fetch_sequence(&self, seq_name: &str, start: i64, end: i64) -> Result<Vec<u8>> {
        let seq = self
            .sequences
            .get(seq_name)
            .ok_or_else(|| TsError::MissingReferenceContig(seq_name.to_string()))?;
        let start = start.clamp(0, seq.len() as i64) as usize;
        let end = end.clamp(0, seq.len() as i64) as usize;
        if start >= end {
            return Ok(Vec::new());
        }
        Ok(seq[start..end].to_vec())
    }

    fn sequence_length(&self, seq_name: &str) -> Result<usize> {
        self.sequences
            .get(seq_name)
            .map(|seq| seq.len())
            .ok_or_else(|| TsError::MissingReferenceContig(seq_name.to_string()))
    }
}
