use crate::question::Question;
use alloc::{collections::BTreeMap, string::String, vec::Vec};
use serde::{Deserialize, Serialize};

/// Correct and total counts for a single question type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Tally {
    pub correct: u32,
    pub total: u32,
}

impl Tally {
    pub fn record(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        }
    }

    /// Percentage of correct answers, rounded down. Empty tallies score zero.
    pub const fn percent(&self) -> u32 {
        if self.total == 0 {
            0
        } else {
            self.correct * 100 / self.total
        }
    }
}

/// Frozen outcome of a finished exam.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub id: String,
    /// Human-readable finalization time. Never used for ordering or lookups.
    pub timestamp: String,
    pub questions: Vec<Question>,
    #[serde(rename = "userAnswers")]
    pub answers: BTreeMap<u32, String>,
    /// Seconds spent before finalization.
    #[serde(rename = "timeTaken")]
    pub time_taken: u32,
    pub score: u32,
    pub total_questions: u32,
    pub performance_by_type: BTreeMap<String, Tally>,
}

impl ExamResult {
    pub fn answer(&self, number: u32) -> Option<&str> {
        self.answers.get(&number).map(String::as_str)
    }
}
