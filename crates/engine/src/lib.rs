pub mod config;
pub mod error;
pub mod gateway;
pub mod importer;
pub mod ledger;
pub mod question_set;
pub mod scorer;
pub mod session;

pub use config::Config;
pub use error::{Error, Result};
pub use gateway::{Document, ExtractionGateway, ResultSink};
pub use importer::{Importer, SessionId, Snapshot, Stage, State};
pub use ledger::AnswerLedger;
pub use question_set::QuestionSet;
pub use session::QuizSession;
