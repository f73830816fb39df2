use crate::{error::Error, ledger::AnswerLedger, question_set::QuestionSet};
use model::ExamResult;
use std::{
    fmt::{self, Display},
    sync::Arc,
};

/// Identity of one import attempt. Every import and every discard moves to a new one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub(super) const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Progress of an outstanding import.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Waiting on the extraction gateway.
    Uploading,
    /// Building the question set from the gateway payload.
    Parsing,
}

impl Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uploading => "Uploading the document and preparing it for analysis...",
            Self::Parsing => "Parsing the questions...",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Idle,
    Processing(Stage),
    Quiz,
    Finished,
}

impl State {
    pub const fn is_processing(self) -> bool {
        matches!(self, Self::Processing(_))
    }
}

/// Read-only view of the current session for rendering.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub session: SessionId,
    pub state: State,
    pub remaining: u32,
    pub answers: AnswerLedger,
    pub questions: Option<Arc<QuestionSet>>,
    pub result: Option<Arc<ExamResult>>,
    /// Whether the result sink accepted the result. `None` until the store attempt completes.
    pub stored: Option<bool>,
    /// Why the last import of this session failed.
    pub error: Option<Error>,
}

impl Snapshot {
    pub(super) fn idle(session: SessionId, duration: u32) -> Self {
        Self {
            session,
            state: State::Idle,
            remaining: duration,
            answers: AnswerLedger::default(),
            questions: None,
            result: None,
            stored: None,
            error: None,
        }
    }

    pub(super) fn processing(session: SessionId, duration: u32) -> Self {
        Self { state: State::Processing(Stage::Uploading), ..Self::idle(session, duration) }
    }

    pub(super) fn failed(session: SessionId, duration: u32, error: Error) -> Self {
        Self { error: Some(error), ..Self::idle(session, duration) }
    }

    pub(super) fn quiz(session: SessionId, duration: u32, questions: Arc<QuestionSet>) -> Self {
        Self { state: State::Quiz, questions: Some(questions), ..Self::idle(session, duration) }
    }

    pub fn is_answered(&self, number: u32) -> bool {
        self.answers.is_answered(number)
    }
}
