use serde_json::error::Category;
use std::{
    fmt::{self, Display},
    io,
};

#[derive(Debug)]
pub enum Error {
    /// No entry with the requested id.
    NotFound,
    /// The backing file exists but does not hold a history.
    Corrupt,
    /// Reading or writing the backing file failed.
    Io(io::ErrorKind),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err.kind())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            Category::Io => Self::Io(io::ErrorKind::Other),
            _ => Self::Corrupt,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("No exam with that id is in the history."),
            Self::Corrupt => f.write_str("The history file is corrupt."),
            Self::Io(kind) => write!(f, "The history file could not be accessed ({kind})."),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;
