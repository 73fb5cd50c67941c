//! Hash-consed, reference-counted cons lists.
//!
//! A [`ConsTable`] interns cells `(car, cdr)` so that two structurally
//! equal lists are always the same [`ListId`]. List equality is therefore
//! handle equality, which is what the closure engine and the superstate
//! cache rely on when comparing side-effect paths and NFA-state sets.
//!
//! The empty list is `None`. A cell owns its tail: creating a cell takes a
//! reference on the cdr, and freeing a cell releases it. Cells start with no
//! owner of their own; callers [`protect`](ConsTable::protect) what they
//! keep and [`release`](ConsTable::release) it when done.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::hash::HashTable;

/// Handle to an interned cons cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListId(u32);

impl ListId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct Cell<T, X> {
    car: T,
    cdr: Option<ListId>,
    hash: u32,
    refs: u32,
    extra: X,
}

/// Interning table for lists of `T`, with an `X` payload per cell.
#[derive(Debug)]
pub struct ConsTable<T, X = ()> {
    cells: Vec<Option<Cell<T, X>>>,
    free: Vec<u32>,
    index: HashTable<ListId>,
}

impl<T, X> Default for ConsTable<T, X>
where
    T: Copy + Eq + Hash,
    X: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

fn cell_hash<T: Hash>(car: &T, cdr: Option<ListId>) -> u32 {
    let mut hasher = FxHasher::default();
    car.hash(&mut hasher);
    cdr.hash(&mut hasher);
    let h = hasher.finish();
    (h ^ (h >> 32)) as u32
}

impl<T, X> ConsTable<T, X>
where
    T: Copy + Eq + Hash,
    X: Default,
{
    pub fn new() -> Self {
        Self {
            cells: Vec::new(),
            free: Vec::new(),
            index: HashTable::new(),
        }
    }

    /// Number of live cells.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns the unique cell `(car, cdr)`, creating it if needed.
    pub fn cons(&mut self, car: T, cdr: Option<ListId>) -> ListId {
        let hash = cell_hash(&car, cdr);
        let cells = &self.cells;
        let found = self.index.find(hash, |id| {
            cells[id.index()]
                .as_ref()
                .is_some_and(|c| c.car == car && c.cdr == cdr)
        });
        if let Some(id) = found {
            return id;
        }
        self.protect(cdr);
        let cell = Cell {
            car,
            cdr,
            hash,
            refs: 0,
            extra: X::default(),
        };
        let id = match self.free.pop() {
            Some(slot) => {
                self.cells[slot as usize] = Some(cell);
                ListId(slot)
            }
            None => {
                self.cells.push(Some(cell));
                ListId(self.cells.len() as u32 - 1)
            }
        };
        self.index.insert(hash, id);
        id
    }

    /// Interns `items` as a list in the given order.
    pub fn from_slice(&mut self, items: &[T]) -> Option<ListId> {
        items
            .iter()
            .rev()
            .fold(None, |tail, &car| Some(self.cons(car, tail)))
    }

    pub fn protect(&mut self, list: Option<ListId>) {
        if let Some(cell) = list.and_then(|id| self.cells[id.index()].as_mut()) {
            cell.refs += 1;
        }
    }

    /// Drops one reference; a cell left without owners is freed together
    /// with every tail cell that it alone kept alive.
    pub fn release(&mut self, list: Option<ListId>) {
        let mut next = list;
        while let Some(id) = next {
            let Some(cell) = self.cells[id.index()].as_mut() else {
                return;
            };
            cell.refs = cell.refs.saturating_sub(1);
            if cell.refs > 0 {
                return;
            }
            let hash = cell.hash;
            next = cell.cdr;
            self.index.remove(hash, |other| other == id);
            self.cells[id.index()] = None;
            self.free.push(id.0);
        }
    }

    pub fn refs(&self, id: ListId) -> u32 {
        self.cells[id.index()].as_ref().map_or(0, |c| c.refs)
    }

    pub fn is_live(&self, id: ListId) -> bool {
        self.cells[id.index()].is_some()
    }

    pub fn car(&self, id: ListId) -> Option<T> {
        self.cells[id.index()].as_ref().map(|c| c.car)
    }

    pub fn cdr(&self, id: ListId) -> Option<ListId> {
        self.cells[id.index()].as_ref().and_then(|c| c.cdr)
    }

    pub fn extra(&self, id: ListId) -> Option<&X> {
        self.cells[id.index()].as_ref().map(|c| &c.extra)
    }

    pub fn extra_mut(&mut self, id: ListId) -> Option<&mut X> {
        self.cells[id.index()].as_mut().map(|c| &mut c.extra)
    }

    pub fn iter(&self, list: Option<ListId>) -> Iter<'_, T, X> {
        Iter { table: self, next: list }
    }

    pub fn to_vec(&self, list: Option<ListId>) -> Vec<T> {
        self.iter(list).collect()
    }
}

pub struct Iter<'t, T, X> {
    table: &'t ConsTable<T, X>,
    next: Option<ListId>,
}

impl<T: Copy, X> Iterator for Iter<'_, T, X> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let cell = self.table.cells[self.next?.index()].as_ref()?;
        self.next = cell.cdr;
        Some(cell.car)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_lists_are_identical() {
        let mut table: ConsTable<u32> = ConsTable::new();
        let a = table.from_slice(&[1, 2, 3]);
        let b = table.from_slice(&[1, 2, 3]);
        let c = table.from_slice(&[1, 2, 4]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.to_vec(a), vec![1, 2, 3]);
        // [1,2,3], [2,3], [3], [1,2,4], [2,4], [4]
        assert_eq!(table.len(), 6);
        assert_eq!(table.from_slice(&[]), None);
    }

    #[test]
    fn shared_tails() {
        let mut table: ConsTable<u32> = ConsTable::new();
        let tail = table.from_slice(&[7, 8]);
        let a = table.cons(1, tail);
        let b = table.cons(2, tail);
        assert_eq!(table.cdr(a), tail);
        assert_eq!(table.cdr(b), tail);
        // Owned by both heads.
        assert_eq!(table.refs(tail.unwrap()), 2);
    }

    #[test]
    fn balanced_protect_release_keeps_refcount() {
        let mut table: ConsTable<u32> = ConsTable::new();
        let list = table.from_slice(&[4, 5]);
        table.protect(list);
        let id = list.unwrap();
        let before = table.refs(id);
        for _ in 0..3 {
            table.protect(list);
        }
        for _ in 0..3 {
            table.release(list);
        }
        assert_eq!(table.refs(id), before);
        assert!(table.is_live(id));
    }

    #[test]
    fn release_frees_whole_unshared_list() {
        let mut table: ConsTable<u32> = ConsTable::new();
        let keep = table.from_slice(&[2, 3]);
        table.protect(keep);
        let list = table.cons(1, keep);
        table.protect(Some(list));
        assert_eq!(table.len(), 3);

        table.release(Some(list));
        assert!(!table.is_live(list));
        // Tail survives: still protected by the caller.
        assert_eq!(table.len(), 2);
        assert_eq!(table.refs(keep.unwrap()), 1);

        table.release(keep);
        assert!(table.is_empty());

        // Slots are recycled and the index stays consistent.
        let again = table.from_slice(&[1, 2, 3]);
        assert_eq!(table.to_vec(again), vec![1, 2, 3]);
        assert_eq!(table.from_slice(&[1, 2, 3]), again);
    }

    #[test]
    fn extra_payload() {
        let mut table: ConsTable<u32, Option<usize>> = ConsTable::new();
        let id = table.cons(9, None);
        assert_eq!(table.extra(id), Some(&None));
        *table.extra_mut(id).unwrap() = Some(3);
        assert_eq!(table.extra(id), Some(&Some(3)));
    }
}
