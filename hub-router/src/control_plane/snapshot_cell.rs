/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Copy-on-write hub map with lock-free reads and compare-and-swap writes.

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) type HubMap<V> = HashMap<String, Arc<V>>;
pub(crate) type Snapshot<V> = Arc<HubMap<V>>;

/// Holds an immutable `hub -> value` map that is only ever replaced whole.
pub(crate) struct SnapshotCell<V: ?Sized> {
    cell: ArcSwap<HubMap<V>>,
}

impl<V: ?Sized> SnapshotCell<V> {
    pub(crate) fn new() -> Self {
        Self {
            cell: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    pub(crate) fn load(&self) -> Snapshot<V> {
        self.cell.load_full()
    }

    pub(crate) fn get(&self, hub: &str) -> Option<Arc<V>> {
        self.cell.load().get(hub).cloned()
    }

    /// Stores `new` only if the current map is still `expected` (pointer identity).
    pub(crate) fn compare_and_swap(&self, expected: &Snapshot<V>, new: HubMap<V>) -> bool {
        let previous = self.cell.compare_and_swap(expected, Arc::new(new));
        Arc::ptr_eq(&previous, expected)
    }

    /// Replaces the map with an empty one and returns what was stored.
    pub(crate) fn take(&self) -> Snapshot<V> {
        self.cell.swap(Arc::new(HashMap::new()))
    }

    pub(crate) fn hubs(&self) -> Vec<String> {
        let mut hubs: Vec<String> = self.cell.load().keys().cloned().collect();
        hubs.sort();
        hubs
    }
}

pub(crate) fn with_entry<V: ?Sized>(snapshot: &HubMap<V>, hub: &str, value: Arc<V>) -> HubMap<V> {
    let mut next = snapshot.clone();
    next.insert(hub.to_string(), value);
    next
}

pub(crate) fn without_entry<V: ?Sized>(snapshot: &HubMap<V>, hub: &str) -> HubMap<V> {
    let mut next = snapshot.clone();
    next.remove(hub);
    next
}

#[cfg(test)]
mod tests {
    use super::{with_entry, without_entry, SnapshotCell};
    use std::sync::Arc;

    #[test]
    fn compare_and_swap_requires_the_exact_snapshot() {
        let cell: SnapshotCell<str> = SnapshotCell::new();
        let first = cell.load();

        assert!(cell.compare_and_swap(&first, with_entry(&first, "h1", Arc::from("a"))));
        // A map with equal contents is still a different snapshot.
        let stale = Arc::new(with_entry(&first, "h1", Arc::from("a")));
        assert!(!cell.compare_and_swap(&stale, with_entry(&stale, "h2", Arc::from("b"))));
        assert!(!cell.compare_and_swap(&first, with_entry(&first, "h3", Arc::from("c"))));

        assert_eq!(cell.hubs(), vec!["h1".to_string()]);
        assert_eq!(cell.get("h1").as_deref(), Some("a"));
    }

    #[test]
    fn loaded_snapshot_is_unaffected_by_later_swaps() {
        let cell: SnapshotCell<str> = SnapshotCell::new();
        let empty = cell.load();
        assert!(cell.compare_and_swap(&empty, with_entry(&empty, "h1", Arc::from("a"))));

        let before = cell.load();
        assert!(cell.compare_and_swap(&before, without_entry(&before, "h1")));

        assert!(before.contains_key("h1"));
        assert!(cell.get("h1").is_none());
    }

    #[test]
    fn take_empties_the_cell() {
        let cell: SnapshotCell<str> = SnapshotCell::new();
        let empty = cell.load();
        assert!(cell.compare_and_swap(&empty, with_entry(&empty, "h1", Arc::from("a"))));

        let taken = cell.take();

        assert_eq!(taken.len(), 1);
        assert!(cell.hubs().is_empty());
    }
}
