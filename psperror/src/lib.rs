//! Error types shared by the pseudopotential crates

use thiserror::Error;

/// Everything that can go wrong while building, reading or writing a
/// pseudopotential dataset.
#[derive(Error, Debug)]
pub enum PspError {
    /// stream read/write failure
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// a line does not carry the expected fields
    #[error("corrupt data: {0}")]
    Corrupt(String),

    /// missing or misplaced tag, wrong block order
    #[error("malformed file: {0}")]
    MalformedFormat(String),

    /// ultrasoft, PAW, or a format variant without a reader
    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("unable to allocate {0} values")]
    OutOfMemory(usize),

    /// violated precondition of an operation
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// fields that parse on their own but contradict each other
    #[error("inconsistent data: {0}")]
    Inconsistent(String),

    /// every candidate format failed; one diagnostic per attempt
    #[error("unrecognized format (tried: {})", .attempts.join("; "))]
    UnrecognizedFormat { attempts: Vec<String> },

    #[error("xml error: {0}")]
    Xml(String),
}

pub type Result<T> = std::result::Result<T, PspError>;

impl PspError {
    pub fn corrupt<S: Into<String>>(msg: S) -> PspError {
        PspError::Corrupt(msg.into())
    }

    pub fn malformed<S: Into<String>>(msg: S) -> PspError {
        PspError::MalformedFormat(msg.into())
    }

    pub fn unsupported<S: Into<String>>(msg: S) -> PspError {
        PspError::Unsupported(msg.into())
    }

    pub fn invalid<S: Into<String>>(msg: S) -> PspError {
        PspError::InvalidArgument(msg.into())
    }

    pub fn inconsistent<S: Into<String>>(msg: S) -> PspError {
        PspError::Inconsistent(msg.into())
    }
}

/// Reserve room for `n` values up front, so that an absurd count read from a
/// file is reported instead of aborting the process.
pub fn try_alloc<T>(n: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();

    v.try_reserve_exact(n).map_err(|_| PspError::OutOfMemory(n))?;

    Ok(v)
}
