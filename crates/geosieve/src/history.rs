use crate::chain::Step;

use geosieve_core::{schema::DatasetId, stmt::Expr};

use std::{
    collections::{HashMap, VecDeque},
    time::SystemTime,
};

/// Which history ring an undo or redo moves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Only the steps of one dataset.
    Dataset(DatasetId),

    /// Logical steps across every dataset they touched.
    All,
}

/// Filter state of one or more datasets at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySnapshot {
    pub scope: Scope,
    pub entries: Vec<HistoryEntry>,
    pub timestamp: SystemTime,

    /// Position in the ledger. Increases with every recorded snapshot.
    pub sequence: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub dataset: DatasetId,

    /// Effective filter of the dataset. `None` means unfiltered.
    pub filter: Option<Expr>,

    /// The filter as native predicate text. Empty when unfiltered.
    pub predicate: String,

    pub buffer: f64,

    /// The whole chain, so a restored dataset accepts the same next
    /// position it did when the entry was recorded.
    pub(crate) chain: Vec<Step>,
}

/// Which way history moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Undo,
    Redo,
}

/// Undo/redo rings, one per dataset plus one for logical steps.
#[derive(Debug)]
pub(crate) struct History {
    depth: usize,
    datasets: HashMap<DatasetId, Ring>,
    global: Ring,
    sequence: u64,
}

/// Snapshots in order, with a cursor counting how many are applied.
#[derive(Debug, Default)]
struct Ring {
    snapshots: VecDeque<HistorySnapshot>,
    cursor: usize,
}

impl History {
    pub(crate) fn new(depth: usize) -> History {
        History {
            depth,
            datasets: HashMap::new(),
            global: Ring::default(),
            sequence: 0,
        }
    }

    /// Records the state of one dataset after a step.
    pub(crate) fn record(&mut self, entry: HistoryEntry) {
        let snapshot = self.snapshot(Scope::Dataset(entry.dataset.clone()), vec![entry]);
        let ring = self.datasets.entry(snapshot.entries[0].dataset.clone()).or_default();
        ring.push(snapshot, self.depth);
    }

    /// Records the state of every dataset touched by one logical step.
    pub(crate) fn record_step(&mut self, entries: Vec<HistoryEntry>) {
        if entries.is_empty() {
            return;
        }
        let snapshot = self.snapshot(Scope::All, entries);
        self.global.push(snapshot, self.depth);
    }

    /// Steps back. Returns the state to restore: for every dataset of the
    /// undone snapshot, its latest earlier entry, or unfiltered when there is
    /// none.
    pub(crate) fn undo(&mut self, scope: &Scope) -> Option<HistorySnapshot> {
        let ring = self.ring_mut(scope)?;
        if ring.cursor == 0 {
            return None;
        }
        ring.cursor -= 1;

        let undone = &ring.snapshots[ring.cursor];
        let earlier = ring.snapshots.range(..ring.cursor);

        let entries = undone
            .entries
            .iter()
            .map(|entry| {
                earlier
                    .clone()
                    .rev()
                    .find_map(|snapshot| {
                        snapshot
                            .entries
                            .iter()
                            .find(|earlier| earlier.dataset == entry.dataset)
                    })
                    .cloned()
                    .unwrap_or_else(|| HistoryEntry::cleared(entry.dataset.clone()))
            })
            .collect();

        let (sequence, timestamp) = match ring.cursor.checked_sub(1) {
            Some(i) => (ring.snapshots[i].sequence, ring.snapshots[i].timestamp),
            None => (0, SystemTime::now()),
        };

        Some(HistorySnapshot {
            scope: scope.clone(),
            entries,
            timestamp,
            sequence,
        })
    }

    /// Datasets the next move in `direction` would restore, or `None` when
    /// there is nothing to move to.
    pub(crate) fn peek(&self, scope: &Scope, direction: Direction) -> Option<Vec<DatasetId>> {
        let ring = match scope {
            Scope::Dataset(dataset) => self.datasets.get(dataset)?,
            Scope::All => &self.global,
        };
        let index = match direction {
            Direction::Undo => ring.cursor.checked_sub(1)?,
            Direction::Redo if ring.cursor < ring.snapshots.len() => ring.cursor,
            Direction::Redo => return None,
        };
        Some(
            ring.snapshots[index]
                .entries
                .iter()
                .map(|entry| entry.dataset.clone())
                .collect(),
        )
    }

    pub(crate) fn travel(&mut self, scope: &Scope, direction: Direction) -> Option<HistorySnapshot> {
        match direction {
            Direction::Undo => self.undo(scope),
            Direction::Redo => self.redo(scope),
        }
    }

    /// Re-applies the snapshot most recently undone.
    pub(crate) fn redo(&mut self, scope: &Scope) -> Option<HistorySnapshot> {
        let ring = self.ring_mut(scope)?;
        if ring.cursor == ring.snapshots.len() {
            return None;
        }
        ring.cursor += 1;
        Some(ring.snapshots[ring.cursor - 1].clone())
    }

    pub(crate) fn clear(&mut self) {
        self.datasets.clear();
        self.global = Ring::default();
    }

    fn snapshot(&mut self, scope: Scope, entries: Vec<HistoryEntry>) -> HistorySnapshot {
        self.sequence += 1;
        HistorySnapshot {
            scope,
            entries,
            timestamp: SystemTime::now(),
            sequence: self.sequence,
        }
    }

    fn ring_mut(&mut self, scope: &Scope) -> Option<&mut Ring> {
        match scope {
            Scope::Dataset(dataset) => self.datasets.get_mut(dataset),
            Scope::All => Some(&mut self.global),
        }
    }
}

impl Ring {
    fn push(&mut self, snapshot: HistorySnapshot, depth: usize) {
        // Recording after an undo abandons the redo tail.
        self.snapshots.truncate(self.cursor);
        self.snapshots.push_back(snapshot);

        while self.snapshots.len() > depth.max(1) {
            self.snapshots.pop_front();
        }
        self.cursor = self.snapshots.len();
    }
}

impl HistoryEntry {
    pub(crate) fn cleared(dataset: DatasetId) -> HistoryEntry {
        HistoryEntry {
            dataset,
            filter: None,
            predicate: String::new(),
            buffer: 0.0,
            chain: vec![],
        }
    }

    /// Steps in the dataset's chain in this state; the position a chained
    /// request continues at.
    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }
}
