use crate::error::{Error, Result};
use model::{Question, RawExam};

/// Non-empty questions of one exam, ascending by number. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuestionSet(Box<[Question]>);

impl QuestionSet {
    /// Validates and orders the gateway payload. Individual questions are otherwise taken
    /// as-is; only problems that break ordering or answer keying reject the batch.
    pub fn from_raw(exam: RawExam) -> Result<Self> {
        let raw = exam.questions.filter(|questions| !questions.is_empty()).ok_or(Error::EmptyResult)?;

        let mut questions = Vec::with_capacity(raw.len());
        for (index, question) in raw.into_iter().enumerate() {
            let Some(question) = question.into_question() else {
                log::warn!("Question at index {index} has no usable number.");
                return Err(Error::MissingNumber);
            };
            questions.push(question);
        }

        // Stable sort: ties keep their input order until the duplicate check below.
        questions.sort_by_key(|question| question.number);
        if let Some(pair) = questions.windows(2).find(|pair| pair[0].number == pair[1].number) {
            log::warn!("Question number {} appears more than once.", pair[0].number);
            return Err(Error::DuplicateNumber);
        }

        Ok(Self(questions.into_boxed_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false` for a constructed set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Question] {
        &self.0
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Question> {
        self.0.iter()
    }

    /// Question at a presentation index.
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.0.get(index)
    }

    /// Question with the given number.
    pub fn find(&self, number: u32) -> Option<&Question> {
        self.position(number).map(|index| &self.0[index])
    }

    /// Presentation index of the question with the given number.
    pub fn position(&self, number: u32) -> Option<usize> {
        self.0.binary_search_by_key(&number, |question| question.number).ok()
    }

    pub fn contains(&self, number: u32) -> bool {
        self.position(number).is_some()
    }

    /// Passage to show above the question at `index`: only when it differs from the
    /// passage of the question right before it.
    pub fn passage_header(&self, index: usize) -> Option<&str> {
        let passage = self.0.get(index)?.passage()?;
        let previous = index.checked_sub(1).and_then(|prev| self.0[prev].passage());
        (previous != Some(passage)).then_some(passage)
    }

    /// Deep copy for result snapshots.
    pub fn to_vec(&self) -> Vec<Question> {
        self.0.to_vec()
    }
}

impl<'a> IntoIterator for &'a QuestionSet {
    type Item = &'a Question;
    type IntoIter = core::slice::Iter<'a, Question>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
