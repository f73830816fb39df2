use core::fmt::Write as _;
use engine::{QuestionSet, Snapshot};
use model::{
    clock::{format_clock, is_running_low},
    ExamResult, Question,
};

pub const HELP: &str = "Commands: `<number> <key>` to answer, `status`, `submit`, `help`.";

#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Answer { number: u32, key: &'a str },
    Status,
    Submit,
    Help,
}

impl<'a> Command<'a> {
    pub fn parse(line: &'a str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let first = words.next()?;
        let command = match first.to_ascii_lowercase().as_str() {
            "status" | "s" => Self::Status,
            "submit" => Self::Submit,
            "help" | "?" => Self::Help,
            _ => {
                let number = first.trim_end_matches(['.', ')']).parse().ok()?;
                let key = words.next()?;
                Self::Answer { number, key }
            }
        };
        words.next().is_none().then_some(command)
    }
}

/// Option key of `question` that matches `input` regardless of case. Unknown keys pass through.
pub fn resolve_key<'q>(question: &'q Question, input: &'q str) -> &'q str {
    question
        .options
        .iter()
        .find(|choice| choice.key.eq_ignore_ascii_case(input))
        .map_or(input, |choice| choice.key.as_str())
}

pub fn render_questions(questions: &QuestionSet) -> String {
    let mut out = String::new();
    for (index, question) in questions.iter().enumerate() {
        if let Some(passage) = questions.passage_header(index) {
            let _ = writeln!(out, "\n--- Passage ---\n{passage}\n---------------");
        }
        let _ = writeln!(out, "\n{}. [{}] {}", question.number, question.kind(), question.text);
        for choice in &question.options {
            let _ = writeln!(out, "   {}) {}", choice.key, choice.value);
        }
    }
    out
}

pub fn render_status(snap: &Snapshot) -> String {
    let clock = format_clock(snap.remaining);
    let warning = if is_running_low(snap.remaining) { " (running low)" } else { "" };
    let Some(questions) = snap.questions.as_deref() else {
        return format!("Time left: {clock}{warning}");
    };

    let grid: Vec<_> = questions
        .iter()
        .map(|question| match snap.answers.get(question.number) {
            Some(key) => format!("{}:{key}", question.number),
            None => format!("{}:-", question.number),
        })
        .collect();
    format!(
        "Time left: {clock}{warning} | answered {}/{}\n{}",
        snap.answers.len(),
        questions.len(),
        grid.join(" ")
    )
}

pub fn render_result(result: &ExamResult) -> String {
    let mut out = String::new();
    let percent = if result.total_questions == 0 { 0 } else { result.score * 100 / result.total_questions };
    let _ = writeln!(out, "\nExam finished at {}.", result.timestamp);
    let _ = writeln!(out, "Score: {}/{} ({percent}%)", result.score, result.total_questions);
    let _ = writeln!(out, "Time taken: {}", format_clock(result.time_taken));

    let _ = writeln!(out, "\nBy question type:");
    for (kind, tally) in &result.performance_by_type {
        let _ = writeln!(out, "  {kind}: {}/{} ({}%)", tally.correct, tally.total, tally.percent());
    }

    let missed: Vec<_> = result
        .questions
        .iter()
        .filter(|question| !result.answer(question.number).is_some_and(|key| question.is_correct(key)))
        .collect();
    if !missed.is_empty() {
        let _ = writeln!(out, "\nReview:");
        for question in missed {
            let given = result.answer(question.number).unwrap_or("-");
            let _ = writeln!(out, "  {}. yours {given}, correct {}", question.number, question.correct_answer);
        }
    }
    out
}
