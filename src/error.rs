use std::io;

/// Failures that abort a run.
///
/// Sparse data (missing coverage or vicinity counts) never ends up here: those
/// gaps resolve to zero where they are looked up.
#[derive(Debug)]
pub enum TsError {
    MalformedRecord {
        file: String,
        line: usize,
        reason: String,
    },
    MissingReferenceContig(String),
    MissingLimitEntry(u32),
    InvalidConfig(String),
    Io(io::Error),
}

impl TsError {
    pub fn malformed(file: &str, line: usize, reason: impl Into<String>) -> Self {
        TsError::MalformedRecord {
            file: file.to_string(),
            line,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for TsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TsError::MalformedRecord { file, line, reason } => {
                write!(f, "Malformed record in '{}' at line {}: {}", file, line, reason)
            }
            TsError::MissingReferenceContig(name) => {
                write!(f, "Contig '{}' not found in the reference", name)
            }
            TsError::MissingLimitEntry(len) => {
                write!(f, "No limit defined for poly-A length {}", len)
            }
            TsError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            TsError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for TsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TsError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TsError {
    fn from(e: io::Error) -> Self {
        TsError::Io(e)
    }
}

impl From<TsError> for io::Error {
    fn from(e: TsError) -> Self {
        match e {
            TsError::Io(e) => e,
            TsError::MalformedRecord { .. } => io::Error::new(io::ErrorKind::InvalidData, e.to_string()),
            TsError::MissingReferenceContig(_) => {
                io::Error::new(io::ErrorKind::NotFound, e.to_string())
            }
            TsError::MissingLimitEntry(_) => io::Error::new(io::ErrorKind::NotFound, e.to_string()),
            TsError::InvalidConfig(_) => io::Error::new(io::ErrorKind::InvalidInput, e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TsError>;
