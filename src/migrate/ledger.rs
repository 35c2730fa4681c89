use crate::schema::TransitionKey;

/// Record of the transitions applied to a store, in application order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    applied: Vec<TransitionKey>,
}

impl Ledger {
    pub fn contains(&self, key: &TransitionKey) -> bool {
        self.applied.contains(key)
    }

    pub fn record(&mut self, key: TransitionKey) {
        if !self.contains(&key) {
            self.applied.push(key);
        }
    }

    pub fn len(&self) -> usize {
        self.applied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

impl FromIterator<TransitionKey> for Ledger {
    fn from_iter<I: IntoIterator<Item = TransitionKey>>(iter: I) -> Self {
        let mut ledger = Ledger::default();
        for key in iter {
            ledger.record(key);
        }
        ledger
    }
}
