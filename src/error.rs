use std::fmt;

use thiserror::Error;

pub type BufferResult<T, E = BufferError> = Result<T, E>;

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("Invalid capacity: {0} (must be positive)")]
    InvalidCapacity(i64),

    #[error("Interrupted while waiting")]
    Interrupted,

    #[error("Buffer closed")]
    Closed,

    #[error("Timed out while waiting")]
    Timeout,

    #[error("Buffer full")]
    Full,

    #[error("Buffer empty")]
    Empty,

    #[error("Config error: {0}")]
    Config(String),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of an insertion. The rejected item is always handed back.
#[derive(Error, PartialEq, Eq)]
pub enum PutError<T> {
    #[error("Buffer full")]
    Full(T),

    #[error("Timed out waiting for a free slot")]
    Timeout(T),

    #[error("Interrupted waiting for a free slot")]
    Interrupted(T),

    #[error("Buffer closed")]
    Closed(T),
}

impl<T> PutError<T> {
    pub fn into_inner(self) -> T {
        match self {
            PutError::Full(item)
            | PutError::Timeout(item)
            | PutError::Interrupted(item)
            | PutError::Closed(item) => item,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, PutError::Interrupted(_))
    }
}

impl<T> fmt::Debug for PutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PutError::Full(_) => "Full",
            PutError::Timeout(_) => "Timeout",
            PutError::Interrupted(_) => "Interrupted",
            PutError::Closed(_) => "Closed",
        };
        write!(f, "{}(..)", name)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TakeError {
    #[error("Buffer empty")]
    Empty,

    #[error("Timed out waiting for an item")]
    Timeout,

    #[error("Interrupted waiting for an item")]
    Interrupted,

    #[error("Buffer closed")]
    Closed,
}

impl<T> From<PutError<T>> for BufferError {
    fn from(err: PutError<T>) -> Self {
        match err {
            PutError::Full(_) => BufferError::Full,
            PutError::Timeout(_) => BufferError::Timeout,
            PutError::Interrupted(_) => BufferError::Interrupted,
            PutError::Closed(_) => BufferError::Closed,
        }
    }
}

impl From<TakeError> for BufferError {
    fn from(err: TakeError) -> Self {
        match err {
            TakeError::Empty => BufferError::Empty,
            TakeError::Timeout => BufferError::Timeout,
            TakeError::Interrupted => BufferError::Interrupted,
            TakeError::Closed => BufferError::Closed,
        }
    }
}
