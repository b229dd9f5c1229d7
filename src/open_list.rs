//! The open list of the planner: an indexed binary heap over inconsistent cells.
//!
//! Every cell carries the sequence number it received when it was first inserted, and entries
//! whose keys compare equal are ordered by that number. [OpenList::update] re-keys an entry
//! in place, so a cell keeps its slot among equal keys instead of moving behind the others.
use crate::cost_grid::CellId;
use crate::math::{greater_within, less_within};
use crate::KEY_EPSILON;
use core::fmt;
use fxhash::FxHashMap;
use std::cmp::Ordering;

/// Two-part priority of a cell: `(min(g, rhs) + h(start, cell) + km, min(g, rhs))`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Key {
    pub k1: f64,
    pub k2: f64,
}

impl Key {
    pub fn new(k1: f64, k2: f64) -> Key {
        Key { k1, k2 }
    }

    /// Lexicographic comparison in which components within [KEY_EPSILON] count as equal.
    pub fn compare(&self, other: &Key) -> Ordering {
        if less_within(self.k1, other.k1, KEY_EPSILON) {
            Ordering::Less
        } else if greater_within(self.k1, other.k1, KEY_EPSILON) {
            Ordering::Greater
        } else if less_within(self.k2, other.k2, KEY_EPSILON) {
            Ordering::Less
        } else if greater_within(self.k2, other.k2, KEY_EPSILON) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }

    pub fn less(&self, other: &Key) -> bool {
        self.compare(other) == Ordering::Less
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{:.3}; {:.3}]", self.k1, self.k2)
    }
}

#[derive(Clone, Debug)]
struct Entry {
    key: Key,
    seq: u64,
    cell: CellId,
}

impl Entry {
    fn before(&self, other: &Entry) -> bool {
        match self.key.compare(&other.key) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => self.seq < other.seq,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct OpenList {
    heap: Vec<Entry>,
    positions: FxHashMap<CellId, usize>,
    next_seq: u64,
}

impl OpenList {
    pub fn new() -> OpenList {
        OpenList::default()
    }
    pub fn len(&self) -> usize {
        self.heap.len()
    }
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
    pub fn contains(&self, cell: CellId) -> bool {
        self.positions.contains_key(&cell)
    }
    #[cfg(test)]
    fn key_of(&self, cell: CellId) -> Option<Key> {
        self.positions.get(&cell).map(|&pos| self.heap[pos].key)
    }
    /// The entry with the smallest key, without removing it.
    pub fn peek(&self) -> Option<(CellId, Key)> {
        self.heap.first().map(|e| (e.cell, e.key))
    }
    #[cfg(test)]
    fn top_key(&self) -> Option<Key> {
        self.heap.first().map(|e| e.key)
    }
    pub fn clear(&mut self) {
        self.heap.clear();
        self.positions.clear();
        self.next_seq = 0;
    }

    /// Adds a cell that is not yet on the list. A cell that is already present is re-keyed
    /// instead.
    pub fn insert(&mut self, cell: CellId, key: Key) {
        if self.contains(cell) {
            self.update(cell, key);
            return;
        }
        let pos = self.heap.len();
        self.heap.push(Entry {
            key,
            seq: self.next_seq,
            cell,
        });
        self.next_seq += 1;
        self.positions.insert(cell, pos);
        self.sift_up(pos);
    }

    /// Removes a cell, returning the key it was stored under.
    pub fn remove(&mut self, cell: CellId) -> Option<Key> {
        let pos = self.positions.remove(&cell)?;
        let removed = self.heap.swap_remove(pos);
        if pos < self.heap.len() {
            self.positions.insert(self.heap[pos].cell, pos);
            self.sift_down(pos);
            self.sift_up(pos);
        }
        Some(removed.key)
    }

    /// Changes the key of a cell that is on the list. Returns false if it is not present.
    pub fn update(&mut self, cell: CellId, key: Key) -> bool {
        let Some(&pos) = self.positions.get(&cell) else {
            return false;
        };
        let old_key = self.heap[pos].key;
        self.heap[pos].key = key;
        if key.less(&old_key) {
            self.sift_up(pos);
        } else {
            self.sift_down(pos);
        }
        true
    }

    #[cfg(test)]
    fn pop(&mut self) -> Option<(CellId, Key)> {
        let (cell, key) = self.peek()?;
        self.remove(cell);
        Some((cell, key))
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.positions.insert(self.heap[a].cell, a);
        self.positions.insert(self.heap[b].cell, b);
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.heap[pos].before(&self.heap[parent]) {
                self.swap(pos, parent);
                pos = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * pos + 1;
            let right = left + 1;
            let mut smallest = pos;
            if left < len && self.heap[left].before(&self.heap[smallest]) {
                smallest = left;
            }
            if right < len && self.heap[right].before(&self.heap[smallest]) {
                smallest = right;
            }
            if smallest == pos {
                break;
            }
            self.swap(pos, smallest);
            pos = smallest;
        }
    }
}
