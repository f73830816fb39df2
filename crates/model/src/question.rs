use crate::{
    choice::{deserialize_choices, Choice},
    lenient::{deserialize_number, deserialize_text},
};
use alloc::{string::String, vec::Vec};
use serde::{Deserialize, Serialize};

/// Question exactly as the extraction gateway handed it over. Any field may be missing, and a
/// field of the wrong shape is read as leniently as possible instead of failing the payload.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RawQuestion {
    #[serde(default, rename = "questionNumber", alias = "number", deserialize_with = "deserialize_number")]
    pub number: Option<u32>,
    #[serde(default, rename = "questionText", alias = "text", deserialize_with = "deserialize_text")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub passage: Option<String>,
    #[serde(default, deserialize_with = "deserialize_choices")]
    pub options: Vec<Choice>,
    #[serde(default, rename = "correctAnswer", deserialize_with = "deserialize_text")]
    pub correct_answer: Option<String>,
    #[serde(default, rename = "questionType", alias = "type", deserialize_with = "deserialize_text")]
    pub kind: Option<String>,
}

/// Top-level payload of an extraction.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RawExam {
    #[serde(default)]
    pub questions: Option<Vec<RawQuestion>>,
}

/// A keyed question ready to be presented.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Question {
    /// Positive number which orders the exam and keys the answers.
    #[serde(rename = "questionNumber")]
    pub number: u32,
    #[serde(rename = "questionText")]
    pub text: String,
    /// Reading context shared by consecutive questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passage: Option<String>,
    pub options: Vec<Choice>,
    #[serde(rename = "correctAnswer")]
    pub correct_answer: String,
    #[serde(default, rename = "questionType", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Question {
    /// Category assigned to questions without a type.
    pub const UNKNOWN_KIND: &'static str = "unknown";

    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or(Self::UNKNOWN_KIND)
    }

    pub fn passage(&self) -> Option<&str> {
        self.passage.as_deref()
    }

    pub fn choice(&self, key: &str) -> Option<&Choice> {
        self.options.iter().find(|choice| choice.key == key)
    }

    pub fn is_correct(&self, key: &str) -> bool {
        self.correct_answer == key
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|text| !text.trim().is_empty())
}

impl RawQuestion {
    /// Keys the question. Only a missing or zero number is fatal here since everything else
    /// can still be rendered as-is.
    pub fn into_question(self) -> Option<Question> {
        let Self { number, text, passage, options, correct_answer, kind } = self;
        let number = number.filter(|&number| number > 0)?;
        Some(Question {
            number,
            text: text.unwrap_or_default(),
            passage: non_empty(passage),
            options,
            correct_answer: correct_answer.unwrap_or_default(),
            kind: non_empty(kind),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gateway_field_names() {
        let exam: RawExam = serde_json::from_str(
            r#"{"questions":[{
                "questionNumber": 4,
                "questionText": "Capital of Turkey?",
                "passage": "",
                "options": [{"key":"A","value":"Ankara"},{"key":"B","value":"Izmir"}],
                "correctAnswer": "A",
                "questionType": "Geography"
            }]}"#,
        )
        .unwrap();
        let mut questions = exam.questions.unwrap();
        let question = questions.pop().unwrap().into_question().unwrap();
        assert_eq!(question.number, 4);
        assert_eq!(question.text, "Capital of Turkey?");
        assert_eq!(question.passage(), None);
        assert_eq!(question.kind(), "Geography");
        assert_eq!(question.choice("A").map(|c| c.value.as_str()), Some("Ankara"));
        assert!(question.is_correct("A"));
        assert!(!question.is_correct("B"));
    }

    #[test]
    fn accepts_short_aliases() {
        let raw: RawQuestion = serde_json::from_str(r#"{"number":2,"text":"Why?","type":"Logic"}"#).unwrap();
        let question = raw.into_question().unwrap();
        assert_eq!(question.number, 2);
        assert_eq!(question.kind(), "Logic");
        assert!(question.options.is_empty());
        assert!(question.correct_answer.is_empty());
    }

    #[test]
    fn missing_type_is_unknown() {
        let raw: RawQuestion = serde_json::from_str(r#"{"questionNumber":1,"questionType":" "}"#).unwrap();
        assert_eq!(raw.into_question().unwrap().kind(), Question::UNKNOWN_KIND);
    }

    #[test]
    fn unkeyable_questions_are_rejected() {
        let missing: RawQuestion = serde_json::from_str(r#"{"questionText":"Orphan"}"#).unwrap();
        assert!(missing.into_question().is_none());
        let zero: RawQuestion = serde_json::from_str(r#"{"questionNumber":0}"#).unwrap();
        assert!(zero.into_question().is_none());
    }

    #[test]
    fn odd_field_shapes_are_kept() {
        let raw: RawQuestion = serde_json::from_str(
            r#"{"questionNumber":"3","questionText":42,"passage":{"body":"x"},"options":["A) a","B) b"],"correctAnswer":["B"],"questionType":null}"#,
        )
        .unwrap();
        let question = raw.into_question().unwrap();
        assert_eq!(question.number, 3);
        assert_eq!(question.text, "42");
        assert_eq!(question.passage(), None);
        assert_eq!(question.options, [Choice::new("A", "a"), Choice::new("B", "b")]);
        assert!(question.is_correct("B"));
        assert_eq!(question.kind(), Question::UNKNOWN_KIND);
    }

    #[test]
    fn absent_question_list_is_none() {
        let exam: RawExam = serde_json::from_str("{}").unwrap();
        assert!(exam.questions.is_none());
    }
}
