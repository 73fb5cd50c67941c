use log::*;

use crate::bitset::Bitset;
use crate::error::{Error, Resource};
use crate::hashcons::ConsTable;
use crate::rexp::{Expr, Rexp, SideEffect};

use super::PossibleFuture;

#[derive(Debug, Clone)]
pub enum EdgeLabel {
    Epsilon,
    SideEffect(SideEffect),
    CharSet(Bitset),
}

#[derive(Debug, Clone)]
pub(super) struct BuildEdge {
    pub(super) label: EdgeLabel,
    pub(super) dest: usize,
}

#[derive(Debug, Default)]
pub(super) struct BuildState {
    pub(super) id: i32,
    pub(super) is_start: bool,
    pub(super) is_final: bool,
    /// Set while the state is on the current closure path.
    pub(super) mark: bool,
    pub(super) eclosure_needed: bool,
    pub(super) edges: Vec<BuildEdge>,
    pub(super) futures: Vec<PossibleFuture>,
}

/// An automaton under construction.
#[derive(Debug)]
pub struct NfaBuilder {
    pub(super) states: Vec<BuildState>,
    pub(super) cset_size: usize,
    state_limit: usize,
    pub(super) effects: ConsTable<SideEffect>,
    pub(super) sets: ConsTable<u32>,
}

impl NfaBuilder {
    pub fn new(cset_size: usize, state_limit: usize) -> Self {
        Self {
            states: Vec::new(),
            cset_size,
            state_limit,
            effects: ConsTable::new(),
            sets: ConsTable::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn add_state(&mut self) -> Result<usize, Error> {
        if self.states.len() >= self.state_limit {
            return Err(Error::ResourceExhausted(Resource::NfaStates));
        }
        self.states.push(BuildState::default());
        Ok(self.states.len() - 1)
    }

    pub fn add_edge(&mut self, from: usize, to: usize, label: EdgeLabel) {
        self.states[from].edges.push(BuildEdge { label, dest: to });
    }

    pub fn set_start(&mut self, state: usize) {
        self.states[state].is_start = true;
    }

    pub fn set_final(&mut self, state: usize) {
        self.states[state].is_final = true;
    }

    fn epsilon(&mut self, from: usize, to: usize) {
        self.add_edge(from, to, EdgeLabel::Epsilon);
    }

    /// Builds `rexp` starting at `start` and returns its end state. An empty
    /// expression ends where it starts.
    pub fn build(&mut self, rexp: &Rexp, start: usize) -> Result<usize, Error> {
        let Some(node) = rexp.as_deref() else {
            return Ok(start);
        };
        match node {
            Expr::CharSet(set) => {
                let end = self.add_state()?;
                self.add_edge(start, end, EdgeLabel::CharSet(set.clone()));
                Ok(end)
            }
            Expr::SideEffect(se) => {
                let end = self.add_state()?;
                self.add_edge(start, end, EdgeLabel::SideEffect(*se));
                Ok(end)
            }
            Expr::Concat(left, right) => {
                let mid = self.build(left, start)?;
                self.build(right, mid)
            }
            Expr::Alternate(left, right) => {
                let left_start = self.add_state()?;
                let left_end = self.build(left, left_start)?;
                let right_start = self.add_state()?;
                let right_end = self.build(right, right_start)?;
                let end = self.add_state()?;
                self.epsilon(start, left_start);
                self.epsilon(start, right_start);
                self.epsilon(left_end, end);
                self.epsilon(right_end, end);
                Ok(end)
            }
            Expr::Opt(inner) => {
                let end = self.build(inner, start)?;
                self.epsilon(start, end);
                Ok(end)
            }
            Expr::Star(inner) => {
                let star_start = self.add_state()?;
                let star_end = self.build(inner, star_start)?;
                let end = self.add_state()?;
                self.epsilon(star_start, star_end);
                self.epsilon(start, star_start);
                self.epsilon(star_end, end);
                self.epsilon(star_end, star_start);
                Ok(end)
            }
            Expr::TwoPhaseStar(body, repeat) => {
                let star_start = self.add_state()?;
                let star_end = self.build(body, star_start)?;
                let loop_start = self.add_state()?;
                let loop_end = self.build(repeat, loop_start)?;
                let end = self.add_state()?;
                self.epsilon(star_start, end);
                self.epsilon(start, star_start);
                self.epsilon(star_end, end);
                self.epsilon(star_end, loop_start);
                self.epsilon(loop_end, star_start);
                Ok(end)
            }
            Expr::Data(_) => Err(Error::Internal(
                "data node reached the automaton builder".to_string(),
            )),
        }
    }

    /// Builds a whole tree into a fresh start and final state.
    pub fn from_rexp(rexp: &Rexp, cset_size: usize, state_limit: usize) -> Result<Self, Error> {
        let mut builder = Self::new(cset_size, state_limit);
        let start = builder.add_state()?;
        let end = builder.build(rexp, start)?;
        builder.set_start(start);
        builder.set_final(end);
        debug!("built automaton with {} states", builder.len());
        Ok(builder)
    }
}
