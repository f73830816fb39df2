use serde_json::error::Category;
use std::fmt::{self, Display};

/// Reasons an import attempt ends without a quiz.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// The extraction gateway failed.
    Gateway,
    /// The gateway answered with something that is not JSON.
    Syntax,
    /// The gateway answered with JSON of an unexpected shape.
    Data,
    /// The gateway found no questions.
    EmptyResult,
    /// A question has no usable number, so the batch cannot be ordered.
    MissingNumber,
    /// Two questions share a number, so answers cannot be keyed.
    DuplicateNumber,
    /// A newer import replaced this one before the gateway answered.
    Superseded,
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            Category::Data => Self::Data,
            Category::Syntax | Category::Eof => Self::Syntax,
            Category::Io => Self::Gateway,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Error::*;
        f.write_str(match self {
            Gateway => "The document could not be processed. Please try again.",
            Syntax => "The extracted exam is not valid JSON.",
            Data => "The extracted exam has an unexpected format.",
            EmptyResult => "No valid questions could be parsed from the document. Please check the file format.",
            MissingNumber => "Some questions in the document have no question number.",
            DuplicateNumber => "Some questions in the document share the same question number.",
            Superseded => "This import was replaced by a newer document.",
        })
    }
}

impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;
