//! Answer ledger — ordered, validated answers for one flow run.

use serde::{Deserialize, Serialize};

use crate::error::DuplicateAnswerError;

/// A validated answer: free text, a whole-rupee amount, or a selection set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Amount(i64),
    Text(String),
    Selections(Vec<String>),
}

impl AnswerValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_amount(&self) -> Option<i64> {
        match self {
            Self::Amount(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_selections(&self) -> Option<&[String]> {
        match self {
            Self::Selections(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for AnswerValue {
    /// User-facing echo of the answer, the way the chat bubbles show it.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Amount(0) => write!(f, "Starting fresh! ₹0"),
            Self::Amount(n) => write!(f, "₹{}", group_inr(*n)),
            Self::Selections(s) => write!(f, "{}", s.join(", ")),
        }
    }
}

/// Group an amount with Indian digit separators (1,00,000 style).
fn group_inr(amount: i64) -> String {
    let (sign, digits) = if amount < 0 {
        ("-", amount.unsigned_abs().to_string())
    } else {
        ("", amount.to_string())
    };
    if digits.len() <= 3 {
        return format!("{sign}{digits}");
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut grouped = Vec::new();
    let head_bytes = head.as_bytes();
    let mut idx = head_bytes.len();
    while idx > 2 {
        grouped.push(std::str::from_utf8(&head_bytes[idx - 2..idx]).unwrap_or_default());
        idx -= 2;
    }
    grouped.push(std::str::from_utf8(&head_bytes[..idx]).unwrap_or_default());
    grouped.reverse();
    format!("{sign}{},{tail}", grouped.join(","))
}

/// Insertion-ordered mapping from step id to validated answer.
///
/// An answer is absent until its step has been reached and validated, and
/// immutable once recorded. A restart clears the whole ledger, never a
/// single field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerLedger {
    entries: Vec<(String, AnswerValue)>,
}

impl AnswerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a validated answer. Fails if the step already has one.
    pub fn record(
        &mut self,
        step_id: impl Into<String>,
        value: AnswerValue,
    ) -> Result<(), DuplicateAnswerError> {
        let step_id = step_id.into();
        if self.get(&step_id).is_some() {
            return Err(DuplicateAnswerError { step_id });
        }
        self.entries.push((step_id, value));
        Ok(())
    }

    pub fn get(&self, step_id: &str) -> Option<&AnswerValue> {
        self.entries
            .iter()
            .find(|(id, _)| id == step_id)
            .map(|(_, v)| v)
    }

    /// Ordered view of everything recorded so far. Keys are the gateway's
    /// field names, one-to-one.
    pub fn snapshot(&self) -> &[(String, AnswerValue)] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_get() {
        let mut ledger = AnswerLedger::new();
        ledger
            .record("name", AnswerValue::Text("Trip to Bali".into()))
            .unwrap();
        ledger.record("target", AnswerValue::Amount(100_000)).unwrap();

        assert_eq!(ledger.get("name").unwrap().as_text(), Some("Trip to Bali"));
        assert_eq!(ledger.get("target").unwrap().as_amount(), Some(100_000));
        assert!(ledger.get("missing").is_none());
    }

    #[test]
    fn duplicate_record_fails() {
        let mut ledger = AnswerLedger::new();
        ledger.record("name", AnswerValue::Text("A".into())).unwrap();
        let err = ledger
            .record("name", AnswerValue::Text("B".into()))
            .unwrap_err();
        assert_eq!(err.step_id, "name");
        // First answer untouched
        assert_eq!(ledger.get("name").unwrap().as_text(), Some("A"));
    }

    #[test]
    fn snapshot_preserves_insertion_order_and_is_idempotent() {
        let mut ledger = AnswerLedger::new();
        ledger.record("b", AnswerValue::Amount(2)).unwrap();
        ledger.record("a", AnswerValue::Amount(1)).unwrap();

        let first: Vec<_> = ledger.snapshot().to_vec();
        let second: Vec<_> = ledger.snapshot().to_vec();
        assert_eq!(first, second);
        assert_eq!(first[0].0, "b");
        assert_eq!(first[1].0, "a");
    }

    #[test]
    fn clear_resets_everything() {
        let mut ledger = AnswerLedger::new();
        ledger.record("a", AnswerValue::Amount(1)).unwrap();
        ledger.clear();
        assert!(ledger.is_empty());
        // A cleared ledger accepts the id again
        ledger.record("a", AnswerValue::Amount(2)).unwrap();
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn display_groups_amounts_indian_style() {
        assert_eq!(AnswerValue::Amount(500).to_string(), "₹500");
        assert_eq!(AnswerValue::Amount(10_000).to_string(), "₹10,000");
        assert_eq!(AnswerValue::Amount(100_000).to_string(), "₹1,00,000");
        assert_eq!(AnswerValue::Amount(12_345_678).to_string(), "₹1,23,45,678");
        assert_eq!(AnswerValue::Amount(0).to_string(), "Starting fresh! ₹0");
    }

    #[test]
    fn display_selections_joined() {
        let value = AnswerValue::Selections(vec!["a".into(), "b".into()]);
        assert_eq!(value.to_string(), "a, b");
    }
}
