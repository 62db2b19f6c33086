//! Ordered collection of the records produced for one unit.
//!
//! Records are kept in insertion order, which is also the order they are
//! written in: condition averages first, then contrasts.
use std::fmt;

use crate::evoked::Evoked;

/// Key of a record in an [`OutputSet`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OutputKey {
    /// Average of one condition, keyed by its output name.
    Condition(String),
    /// `positive − negative`.
    Contrast(String, String),
}

impl fmt::Display for OutputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputKey::Condition(name) => f.write_str(name),
            OutputKey::Contrast(pos, neg) => write!(f, "{pos} - {neg}"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OutputSet {
    entries: Vec<(OutputKey, Evoked)>,
}

impl OutputSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record. An existing key keeps its position and gets the new value.
    pub fn insert(&mut self, key: OutputKey, evoked: Evoked) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = evoked,
            None => self.entries.push((key, evoked)),
        }
    }

    pub fn get(&self, key: &OutputKey) -> Option<&Evoked> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, ev)| ev)
    }

    /// Resolve a name used in a contrast.
    ///
    /// A name refers to a condition average, or to an earlier contrast whose
    /// label (`"a - b"`) equals it.
    pub fn lookup(&self, name: &str) -> Option<&Evoked> {
        self.get(&OutputKey::Condition(name.to_string())).or_else(|| {
            self.entries
                .iter()
                .find(|(k, _)| matches!(k, OutputKey::Contrast(..)) && k.to_string() == name)
                .map(|(_, ev)| ev)
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &OutputKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OutputKey, &Evoked)> {
        self.entries.iter().map(|(k, ev)| (k, ev))
    }

    /// Records in write order.
    pub fn records(&self) -> Vec<&Evoked> {
        self.entries.iter().map(|(_, ev)| ev).collect()
    }

    pub fn into_records(self) -> Vec<Evoked> {
        self.entries.into_iter().map(|(_, ev)| ev).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epochs::EpochsInfo;
    use ndarray::Array2;

    fn ev(comment: &str, v: f32) -> Evoked {
        Evoked {
            data: Array2::from_elem((1, 2), v),
            comment: comment.into(),
            nave: Some(1),
            info: EpochsInfo::default(),
        }
    }

    #[test]
    fn reinsert_keeps_position() {
        let mut out = OutputSet::new();
        out.insert(OutputKey::Condition("a".into()), ev("a", 1.0));
        out.insert(OutputKey::Condition("b".into()), ev("b", 2.0));
        out.insert(OutputKey::Condition("a".into()), ev("a", 5.0));
        let comments: Vec<_> = out.records().iter().map(|e| e.comment.clone()).collect();
        assert_eq!(comments, vec!["a", "b"]);
        assert_eq!(out.lookup("a").unwrap().data[[0, 0]], 5.0);
    }

    #[test]
    fn lookup_resolves_earlier_contrast_by_label() {
        let mut out = OutputSet::new();
        out.insert(OutputKey::Contrast("a".into(), "b".into()), ev("a - b", 1.0));
        assert!(out.lookup("a - b").is_some());
        assert!(out.lookup("a").is_none());
    }
}
