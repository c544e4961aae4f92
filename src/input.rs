//! Opening of tab-separated inputs, plain or BGZF-compressed.

use log::debug;
use noodles::bgzf;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};

const BGZF_HEADER_SIZE: usize = 18;

/// Check whether a file starts with a valid BGZF header.
/// Returns `Ok(false)` for regular gzip, too-small files, or plain text.
fn is_bgzf<R: Read + Seek>(reader: &mut R) -> io::Result<bool> {
    let mut header = [0u8; BGZF_HEADER_SIZE];
    let result = match reader.read_exact(&mut header) {
        Ok(()) => {
            Ok(header[0..2] == [0x1f, 0x8b]      // gzip magic
                && header[2] == 0x08              // DEFLATE
                && header[3] == 0x04              // FEXTRA
                && header[10..12] == [0x06, 0x00] // XLEN=6
                && header[12..14] == [b'B', b'C'] // BC subfield
                && header[14..16] == [0x02, 0x00]) // SLEN=2
        }
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    };
    reader.seek(SeekFrom::Start(0))?;
    result
}

/// Open `path` for line-oriented reading.
pub fn open_text(path: &str) -> io::Result<Box<dyn BufRead>> {
    let mut file = File::open(path)
        .map_err(|e| io::Error::new(e.kind(), format!("Failed to open '{}': {}", path, e)))?;

    let is_compressed = [".gz", ".bgz"].iter().any(|e| path.ends_with(e));
    if is_compressed {
        if !is_bgzf(&mut file)? {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "'{}' is regular gzip, not BGZF. Convert with: zcat '{}' | bgzip > out.gz",
                    path, path
                ),
            ));
        }
        debug!("Reading '{}' as BGZF", path);
        Ok(Box::new(BufReader::new(bgzf::io::Reader::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// True if the file has no bytes, or nothing but whitespace.
pub fn is_effectively_empty(path: &str) -> io::Result<bool> {
    if std::fs::metadata(path)?.len() == 0 {
        return Ok(true);
    }
    let reader = open_text(path)?;
    for line in reader.lines() {
        if !line?.trim().is_empty() {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_plain_text_is_not_bgzf() {
        let mut cursor = Cursor::new(b"chr1\t1\t5\n".to_vec());
        assert!(!is_bgzf(&mut cursor).unwrap());
        // The reader is rewound
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_empty_detection() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.tsv");
        std::fs::write(&empty, "").unwrap();
        assert!(is_effectively_empty(empty.to_str().unwrap()).unwrap());

        let blank = dir.path().join("blank.tsv");
        std::fs::write(&blank, "\n  \n").unwrap();
        assert!(is_effectively_empty(blank.to_str().unwrap()).unwrap());

        let full = dir.path().join("full.tsv");
        std::fs::write(&full, "('chr1', 5)\t3\n").unwrap();
        assert!(!is_effectively_empty(full.to_str().unwrap()).unwrap());
    }
}
