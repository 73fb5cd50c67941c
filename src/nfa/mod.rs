//! Non-deterministic automata.
//!
//! [`NfaBuilder`] performs the Thompson construction from an expression
//! tree, keeping epsilon and side-effect edges. [`NfaBuilder::freeze`] then
//! computes every needed epsilon closure, partitioned by the side effects
//! crossed, drops the epsilon and side-effect edges and lays the remaining
//! graph out in one index-addressed [`Nfa`].
//!
//! In a frozen automaton the states that own character edges come first,
//! so their ids double as indices. Those are the only ids that appear in
//! destination sets and, later, in superstate subsets.

mod builder;
mod closure;

use crate::bitset::Bitset;
use crate::hashcons::{ConsTable, ListId};
use crate::rexp::SideEffect;

pub use builder::{EdgeLabel, NfaBuilder};

/// States reachable from a state by epsilon moves that cross exactly the
/// side effects in `effects`, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PossibleFuture {
    /// Interned in [`Nfa::effects`].
    pub effects: Option<ListId>,
    /// Ascending state ids, interned in [`Nfa::sets`].
    pub destset: Option<ListId>,
}

#[derive(Debug, Clone)]
pub struct NfaEdge {
    pub cset: Bitset,
    /// Index of the destination state.
    pub dest: usize,
}

#[derive(Debug, Clone)]
pub struct NfaState {
    pub id: i32,
    pub is_start: bool,
    pub is_final: bool,
    pub edges: Box<[NfaEdge]>,
    pub futures: Box<[PossibleFuture]>,
}

/// A frozen automaton.
#[derive(Debug)]
pub struct Nfa {
    rx_id: u64,
    start: usize,
    states: Box<[NfaState]>,
    char_states: usize,
    cset_size: usize,
    effects: ConsTable<SideEffect>,
    sets: ConsTable<u32>,
}

impl Nfa {
    /// Generation tag of this automaton, unique per process.
    pub fn rx_id(&self) -> u64 {
        self.rx_id
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn state(&self, index: usize) -> &NfaState {
        &self.states[index]
    }

    pub fn states(&self) -> &[NfaState] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Number of states with character edges.
    pub fn char_states(&self) -> usize {
        self.char_states
    }

    pub fn cset_size(&self) -> usize {
        self.cset_size
    }

    pub fn effects(&self) -> &ConsTable<SideEffect> {
        &self.effects
    }

    pub fn sets(&self) -> &ConsTable<u32> {
        &self.sets
    }

    /// The side effects of `list`, in the order they are crossed.
    pub fn effect_list(&self, list: Option<ListId>) -> Vec<SideEffect> {
        self.effects.to_vec(list)
    }

    /// Member state ids of a destination set.
    pub fn set_members(&self, set: Option<ListId>) -> Vec<u32> {
        self.sets.to_vec(set)
    }

    /// The futures of the start state that cross no side effect.
    pub fn start_set(&self) -> Option<ListId> {
        self.states[self.start]
            .futures
            .iter()
            .find(|f| f.effects.is_none())
            .and_then(|f| f.destset)
    }
}
