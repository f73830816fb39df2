use crate::{ledger::AnswerLedger, question_set::QuestionSet, scorer};
use model::ExamResult;
use std::sync::Arc;

/// The `quiz` and `finished` states of an exam: answers, countdown and the frozen result.
///
/// This type knows nothing about wall-clock time. Whoever owns it calls [`QuizSession::tick`]
/// once per elapsed second.
#[derive(Debug)]
pub struct QuizSession {
    questions: Arc<QuestionSet>,
    answers: AnswerLedger,
    remaining: u32,
    total: u32,
    result: Option<Arc<ExamResult>>,
}

impl QuizSession {
    pub fn new(questions: Arc<QuestionSet>, total: u32) -> Self {
        Self { questions, answers: AnswerLedger::default(), remaining: total, total, result: None }
    }

    pub fn questions(&self) -> &Arc<QuestionSet> {
        &self.questions
    }

    pub fn answers(&self) -> &AnswerLedger {
        &self.answers
    }

    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    pub const fn total(&self) -> u32 {
        self.total
    }

    pub const fn is_finished(&self) -> bool {
        self.result.is_some()
    }

    pub fn result(&self) -> Option<&Arc<ExamResult>> {
        self.result.as_ref()
    }

    /// Records a selection. Returns `false` when the exam is over or the question does not exist.
    pub fn answer(&mut self, number: u32, key: impl Into<String>) -> bool {
        if self.is_finished() || !self.questions.contains(number) {
            return false;
        }
        self.answers.record(number, key);
        true
    }

    /// Counts down one second. Returns the result when this tick expired the exam.
    pub fn tick(&mut self) -> Option<Arc<ExamResult>> {
        if self.is_finished() {
            return None;
        }
        if self.remaining > 1 {
            self.remaining -= 1;
            return None;
        }
        self.remaining = 0;
        Some(self.finalize())
    }

    /// Finishes the exam now. Returns the result only for the call that actually finalized.
    pub fn submit(&mut self) -> Option<Arc<ExamResult>> {
        if self.is_finished() {
            return None;
        }
        Some(self.finalize())
    }

    fn finalize(&mut self) -> Arc<ExamResult> {
        let time_taken = self.total - self.remaining;
        let result = Arc::new(scorer::score(&self.questions, &self.answers, time_taken));
        self.result = Some(Arc::clone(&result));
        result
    }
}
