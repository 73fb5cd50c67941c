//! A self-splitting chained hash table.
//!
//! The root table has 13 buckets. A bucket whose chain reaches
//! [`SPLIT_THRESHOLD`] entries is replaced by a child table that looks at a
//! different mask of the same hash value, so crowded buckets spread out
//! without rehashing the rest of the table. Tables that become empty are
//! collapsed back into their parent.
//!
//! The table stores small `Copy` handles; callers supply the hash and an
//! equality predicate, which is how the cons tables in [`crate::hashcons`]
//! compare structure without the table knowing about it.

const BUCKETS: usize = 13;
const SPLIT_THRESHOLD: usize = 4;
const MASKS: [u32; 4] = [0x1248_8421, 0x9669_9669, 0xbe7d_d7eb, 0xffff_ffff];
const MAX_DEPTH: usize = MASKS.len() - 1;

#[derive(Debug, Clone, Copy)]
struct Item<T> {
    hash: u32,
    value: T,
}

#[derive(Debug)]
enum Bucket<T> {
    Items(Vec<Item<T>>),
    Child(Box<Table<T>>),
}

#[derive(Debug)]
struct Table<T> {
    buckets: [Bucket<T>; BUCKETS],
    /// Items stored directly plus child tables.
    refs: usize,
}

impl<T> Table<T> {
    fn new() -> Self {
        Self {
            buckets: std::array::from_fn(|_| Bucket::Items(Vec::new())),
            refs: 0,
        }
    }
}

fn bucket_of(hash: u32, depth: usize) -> usize {
    ((hash & MASKS[depth]) % BUCKETS as u32) as usize
}

#[derive(Debug)]
pub struct HashTable<T> {
    root: Table<T>,
    len: usize,
}

impl<T: Copy> Default for HashTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> HashTable<T> {
    pub fn new() -> Self {
        Self {
            root: Table::new(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the stored value with this hash accepted by `eq`.
    pub fn find(&self, hash: u32, mut eq: impl FnMut(T) -> bool) -> Option<T> {
        let mut table = &self.root;
        let mut depth = 0;
        loop {
            match &table.buckets[bucket_of(hash, depth)] {
                Bucket::Child(child) => {
                    table = child;
                    depth += 1;
                }
                Bucket::Items(items) => {
                    return items
                        .iter()
                        .find(|item| item.hash == hash && eq(item.value))
                        .map(|item| item.value);
                }
            }
        }
    }

    /// Stores `value`, which the caller guarantees is not already present.
    pub fn insert(&mut self, hash: u32, value: T) {
        Self::insert_in(&mut self.root, 0, Item { hash, value });
        self.len += 1;
    }

    fn insert_in(table: &mut Table<T>, depth: usize, item: Item<T>) {
        let b = bucket_of(item.hash, depth);
        if let Bucket::Items(items) = &mut table.buckets[b] {
            if depth < MAX_DEPTH && items.len() >= SPLIT_THRESHOLD {
                let mut child = Table::new();
                for moved in items.drain(..) {
                    Self::insert_in(&mut child, depth + 1, moved);
                }
                table.refs -= child.refs;
                table.buckets[b] = Bucket::Child(Box::new(child));
                table.refs += 1;
            }
        }
        match &mut table.buckets[b] {
            Bucket::Child(child) => Self::insert_in(child, depth + 1, item),
            Bucket::Items(items) => {
                items.push(item);
                table.refs += 1;
            }
        }
    }

    /// Removes the value accepted by `eq`, collapsing child tables left empty.
    pub fn remove(&mut self, hash: u32, eq: impl FnMut(T) -> bool) -> Option<T> {
        let removed = Self::remove_in(&mut self.root, 0, hash, eq);
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    fn remove_in(
        table: &mut Table<T>,
        depth: usize,
        hash: u32,
        mut eq: impl FnMut(T) -> bool,
    ) -> Option<T> {
        let b = bucket_of(hash, depth);
        match &mut table.buckets[b] {
            Bucket::Child(child) => {
                let removed = Self::remove_in(child, depth + 1, hash, eq);
                if removed.is_some() && child.refs == 0 {
                    table.buckets[b] = Bucket::Items(Vec::new());
                    table.refs -= 1;
                }
                removed
            }
            Bucket::Items(items) => {
                let at = items
                    .iter()
                    .position(|item| item.hash == hash && eq(item.value))?;
                let item = items.swap_remove(at);
                table.refs -= 1;
                Some(item.value)
            }
        }
    }

    /// Deepest level of child tables currently in use.
    pub fn depth(&self) -> usize {
        fn depth_of<T>(table: &Table<T>) -> usize {
            table
                .buckets
                .iter()
                .map(|b| match b {
                    Bucket::Child(child) => 1 + depth_of(child),
                    Bucket::Items(_) => 0,
                })
                .max()
                .unwrap_or(0)
        }
        depth_of(&self.root)
    }
}
