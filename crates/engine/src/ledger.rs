use std::collections::BTreeMap;

/// Selected option key per question number.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnswerLedger(BTreeMap<u32, String>);

impl AnswerLedger {
    /// Records the selection, returning the one it replaced.
    pub fn record(&mut self, number: u32, key: impl Into<String>) -> Option<String> {
        self.0.insert(number, key.into())
    }

    pub fn get(&self, number: u32) -> Option<&str> {
        self.0.get(&number).map(String::as_str)
    }

    pub fn is_answered(&self, number: u32) -> bool {
        self.0.contains_key(&number)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.0.iter().map(|(&number, key)| (number, key.as_str()))
    }

    /// Deep copy for result snapshots.
    pub fn to_map(&self) -> BTreeMap<u32, String> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_selection_wins() {
        let mut ledger = AnswerLedger::default();
        assert_eq!(ledger.record(3, "A"), None);
        assert_eq!(ledger.record(3, "C").as_deref(), Some("A"));
        assert_eq!(ledger.get(3), Some("C"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn snapshot_is_detached() {
        let mut ledger = AnswerLedger::default();
        ledger.record(1, "B");
        let snapshot = ledger.to_map();
        ledger.record(1, "D");
        ledger.record(2, "A");
        assert_eq!(snapshot.get(&1).map(String::as_str), Some("B"));
        assert_eq!(snapshot.len(), 1);
        assert!(ledger.is_answered(2));
        assert_eq!(ledger.iter().collect::<Vec<_>>(), [(1, "D"), (2, "A")]);
    }
}
