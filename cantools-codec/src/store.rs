//! Bounded signal store
//!
//! Ordered collection of committed signals with an explicit capacity. The
//! store is rebuilt from scratch on every file load and mutated only through
//! add, replace and delete.

use crate::signals::Signal;
use crate::types::{CodecError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Default capacity of a signal store
pub const MAX_SIGNALS: usize = 32;

/// Ordering applied to the store after loading and on request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Case-insensitive signal name
    #[default]
    ByName,
    /// CAN ID, then case-insensitive signal name
    ByCanId,
}

impl SortMode {
    /// The other mode
    pub fn toggle(self) -> Self {
        match self {
            SortMode::ByName => SortMode::ByCanId,
            SortMode::ByCanId => SortMode::ByName,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortMode::ByName => "Name",
            SortMode::ByCanId => "CAN ID",
        }
    }

    fn compare(self, a: &Signal, b: &Signal) -> Ordering {
        let by_name = || compare_names(&a.signal_name, &b.signal_name);
        match self {
            SortMode::ByName => by_name(),
            SortMode::ByCanId => a.can_id.cmp(&b.can_id).then_with(by_name),
        }
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    let a = a.bytes().map(|c| c.to_ascii_lowercase());
    let b = b.bytes().map(|c| c.to_ascii_lowercase());
    a.cmp(b)
}

/// Signals sharing a CAN ID and message name
#[derive(Debug, Clone, PartialEq)]
pub struct MessageGroup<'a> {
    pub can_id: u32,
    pub name: &'a str,
    pub signals: Vec<&'a Signal>,
}

/// Store statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub num_messages: usize,
    pub num_signals: usize,
    pub capacity: usize,
}

/// Bounded, ordered collection of signals
#[derive(Debug, Clone, PartialEq)]
pub struct SignalStore {
    signals: Vec<Signal>,
    max_signals: usize,
}

impl SignalStore {
    /// Create an empty store holding at most `max_signals` entries
    pub fn new(max_signals: usize) -> Self {
        Self {
            signals: Vec::new(),
            max_signals,
        }
    }

    /// Append a signal. A full store is left unchanged.
    pub fn add(&mut self, signal: Signal) -> Result<()> {
        if self.is_full() {
            return Err(CodecError::CapacityExceeded {
                max: self.max_signals,
            });
        }
        self.signals.push(signal);
        Ok(())
    }

    /// Overwrite the signal at `index`
    pub fn replace(&mut self, index: usize, signal: Signal) -> Result<()> {
        let len = self.signals.len();
        let slot = self
            .signals
            .get_mut(index)
            .ok_or(CodecError::IndexOutOfRange { index, len })?;
        *slot = signal;
        Ok(())
    }

    /// Remove the signal at `index`, shifting later entries down
    pub fn delete(&mut self, index: usize) -> Result<Signal> {
        if index >= self.signals.len() {
            return Err(CodecError::IndexOutOfRange {
                index,
                len: self.signals.len(),
            });
        }
        Ok(self.signals.remove(index))
    }

    /// Stable sort by the given mode
    pub fn sort(&mut self, mode: SortMode) {
        self.signals.sort_by(|a, b| mode.compare(a, b));
    }

    pub fn get(&self, index: usize) -> Option<&Signal> {
        self.signals.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Signal> {
        self.signals.iter()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.signals.len() >= self.max_signals
    }

    pub fn capacity(&self) -> usize {
        self.max_signals
    }

    pub fn clear(&mut self) {
        self.signals.clear();
    }

    /// Signals whose CAN ID equals `can_id`, in store order
    pub fn matching(&self, can_id: u32) -> impl Iterator<Item = &Signal> + '_ {
        self.signals.iter().filter(move |s| s.can_id == can_id)
    }

    /// Index of the signal with this exact name and CAN ID
    pub fn position(&self, signal_name: &str, can_id: u32) -> Option<usize> {
        self.signals
            .iter()
            .position(|s| s.can_id == can_id && s.signal_name == signal_name)
    }

    /// Signals grouped by `(can_id, message label)` in order of first appearance
    pub fn messages(&self) -> Vec<MessageGroup<'_>> {
        let mut groups: Vec<MessageGroup<'_>> = Vec::new();
        for signal in &self.signals {
            let name = signal.message_label();
            match groups
                .iter_mut()
                .find(|g| g.can_id == signal.can_id && g.name == name)
            {
                Some(group) => group.signals.push(signal),
                None => groups.push(MessageGroup {
                    can_id: signal.can_id,
                    name,
                    signals: vec![signal],
                }),
            }
        }
        groups
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            num_messages: self.messages().len(),
            num_signals: self.signals.len(),
            capacity: self.max_signals,
        }
    }
}

impl Default for SignalStore {
    fn default() -> Self {
        Self::new(MAX_SIGNALS)
    }
}

impl<'a> IntoIterator for &'a SignalStore {
    type Item = &'a Signal;
    type IntoIter = std::slice::Iter<'a, Signal>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(store: &SignalStore) -> Vec<&str> {
        store.iter().map(|s| s.signal_name.as_str()).collect()
    }

    #[test]
    fn test_capacity_leaves_store_unchanged() {
        let mut store = SignalStore::new(2);
        store.add(Signal::new("A", 1)).unwrap();
        store.add(Signal::new("B", 2)).unwrap();

        let before = store.clone();
        let err = store.add(Signal::new("C", 3)).unwrap_err();
        assert!(matches!(err, CodecError::CapacityExceeded { max: 2 }));
        assert_eq!(store, before);
    }

    #[test]
    fn test_replace_and_delete() {
        let mut store = SignalStore::default();
        for name in ["A", "B", "C"] {
            store.add(Signal::new(name, 1)).unwrap();
        }

        store.replace(1, Signal::new("B2", 1)).unwrap();
        let removed = store.delete(0).unwrap();
        assert_eq!(removed.signal_name, "A");
        assert_eq!(names(&store), vec!["B2", "C"]);

        assert!(matches!(
            store.delete(5),
            Err(CodecError::IndexOutOfRange { index: 5, len: 2 })
        ));
        assert!(store.replace(2, Signal::new("X", 1)).is_err());
    }

    #[test]
    fn test_sort_by_name_ignores_case() {
        let mut store = SignalStore::default();
        for name in ["beta", "Alpha", "gamma", "ALPHA2"] {
            store.add(Signal::new(name, 1)).unwrap();
        }
        store.sort(SortMode::ByName);
        assert_eq!(names(&store), vec!["Alpha", "ALPHA2", "beta", "gamma"]);
    }

    #[test]
    fn test_sort_by_can_id_is_stable() {
        let mut store = SignalStore::default();
        store.add(Signal::new("speed", 0x200).with_message("first")).unwrap();
        store.add(Signal::new("rpm", 0x100)).unwrap();
        store.add(Signal::new("Speed", 0x200).with_message("second")).unwrap();
        store.add(Signal::new("gear", 0x200)).unwrap();

        store.sort(SortMode::ByCanId);
        assert_eq!(names(&store), vec!["rpm", "gear", "speed", "Speed"]);
        // Equal keys keep their relative order
        assert_eq!(store.get(2).unwrap().message_name, "first");
        assert_eq!(store.get(3).unwrap().message_name, "second");
    }

    #[test]
    fn test_sort_mode_toggle() {
        assert_eq!(SortMode::default(), SortMode::ByName);
        assert_eq!(SortMode::ByName.toggle(), SortMode::ByCanId);
        assert_eq!(SortMode::ByCanId.toggle(), SortMode::ByName);
    }

    #[test]
    fn test_lookup_and_grouping() {
        let mut store = SignalStore::default();
        store.add(Signal::new("Speed", 0x257).with_message("DI")).unwrap();
        store.add(Signal::new("Rpm", 0x100)).unwrap();
        store.add(Signal::new("Gear", 0x257).with_message("DI")).unwrap();

        assert_eq!(store.matching(0x257).count(), 2);
        assert_eq!(store.position("Gear", 0x257), Some(2));
        assert_eq!(store.position("Gear", 0x100), None);

        let groups = store.messages();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "DI");
        assert_eq!(groups[0].signals.len(), 2);
        assert_eq!(groups[1].name, "Rpm");

        let stats = store.stats();
        assert_eq!(stats.num_messages, 2);
        assert_eq!(stats.num_signals, 3);
        assert_eq!(stats.capacity, MAX_SIGNALS);
    }
}
