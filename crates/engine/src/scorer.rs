use crate::{ledger::AnswerLedger, question_set::QuestionSet};
use model::{ExamResult, Tally};
use std::collections::BTreeMap;

/// Display format of [`ExamResult::timestamp`].
pub const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// The deterministic part of a result.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Grade {
    pub score: u32,
    pub performance_by_type: BTreeMap<String, Tally>,
}

/// Grades every question. Unanswered questions count as incorrect.
pub fn grade(questions: &QuestionSet, answers: &AnswerLedger) -> Grade {
    let mut grade = Grade::default();
    for question in questions {
        let correct = answers.get(question.number).is_some_and(|key| question.is_correct(key));
        grade.performance_by_type.entry(String::from(question.kind())).or_default().record(correct);
        if correct {
            grade.score += 1;
        }
    }
    grade
}

/// Freezes the exam into a result with a fresh time-ordered id.
pub fn score(questions: &QuestionSet, answers: &AnswerLedger, time_taken: u32) -> ExamResult {
    let Grade { score, performance_by_type } = grade(questions, answers);
    ExamResult {
        id: uuid::Uuid::now_v7().to_string(),
        timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
        questions: questions.to_vec(),
        answers: answers.to_map(),
        time_taken,
        score,
        total_questions: u32::try_from(questions.len()).unwrap_or(u32::MAX),
        performance_by_type,
    }
}
