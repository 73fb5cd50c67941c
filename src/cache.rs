//! The superstate cache.
//!
//! Superstates are DFA states realized on demand from sets of NFA states
//! (supersets). Each one owns a transition table indexed by input byte
//! whose entries start out as [`Inx::CacheMiss`] and are filled in by
//! [`Cache::handle_cache_miss`] as the matcher walks the automaton.
//!
//! Memory is bounded by `cache_bound`. Under pressure a superstate first
//! becomes *semi-free*: it stays valid, but every transition that led to it
//! is redirected to a fault so that the next use can either revive it or
//! notice that it is gone. Only semi-free states (or, failing that, the
//! least recently used hot state) are actually reclaimed. States locked by
//! an ongoing match are never touched.

use std::cmp::Ordering;

use log::*;

use crate::bitset::Bitset;
use crate::error::{Error, Resource};
use crate::hashcons::{ConsTable, ListId};
use crate::nfa::Nfa;
use crate::rexp::SideEffect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SuperstateId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FutureId(u32);

/// What the matcher does next on a given byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inx {
    /// Consume the byte and continue in the given superstate.
    NextChar(SuperstateId),
    /// Several side-effect paths are possible: try each option in turn.
    BacktrackPoint(EdgeId),
    /// Run the future's side effects, then follow its frame.
    DoSideEffects(FutureId),
    /// Nothing is known about this byte yet.
    CacheMiss,
    /// The future's destination is unknown or semi-free.
    FutureMiss(FutureId),
    /// No NFA state can make progress.
    Backtrack,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Superstates kept before reclaiming.
    pub cache_bound: usize,
    /// Slots added to the superstate arena at a time.
    pub chunk: usize,
    /// Absolute ceiling, used when every reclaimable state is locked.
    pub max_superstates: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_bound: 128,
            chunk: 16,
            max_superstates: 4096,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Live superstates, hot or semi-free.
    pub superstates: usize,
    pub semifree: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ring {
    Hot,
    SemiFree,
}

#[derive(Debug)]
struct Superstate {
    rx_id: u64,
    contents: Option<ListId>,
    table: Box<[Inx]>,
    edges: Vec<EdgeId>,
    /// Futures whose destination is this state.
    transition_refs: Vec<FutureId>,
    locks: u32,
    semifree: bool,
    next: SuperstateId,
    prev: SuperstateId,
}

impl Superstate {
    fn vacant(id: SuperstateId) -> Self {
        Self {
            rx_id: 0,
            contents: None,
            table: Box::new([]),
            edges: Vec::new(),
            transition_refs: Vec::new(),
            locks: 0,
            semifree: false,
            next: id,
            prev: id,
        }
    }
}

/// A set of bytes that share the same futures out of one superstate.
#[derive(Debug)]
struct SuperEdge {
    cset: Bitset,
    options: Vec<FutureId>,
}

#[derive(Debug)]
struct DistinctFuture {
    effects: Option<ListId>,
    future: Option<SuperstateId>,
    future_frame: Inx,
    edge: EdgeId,
    present: SuperstateId,
}

fn install(table: &mut [Inx], cset: &Bitset, inx: Inx) {
    for c in cset.iter() {
        table[c] = inx;
    }
}

/// Orders two side-effect paths leaving the same superstate: paths without
/// complex effects first, then by their complex effects read from the last
/// one crossed, a path that extends another coming first.
fn posix_se_list_order(nfa: &Nfa, a: Option<ListId>, b: Option<ListId>) -> Ordering {
    let complex = |list| {
        let mut params: Vec<u32> = nfa
            .effects()
            .iter(list)
            .filter_map(|se| match se {
                SideEffect::Complex(i) => Some(i),
                SideEffect::Simple(_) => None,
            })
            .collect();
        params.reverse();
        params
    };
    let (ca, cb) = (complex(a), complex(b));
    match (ca.is_empty(), cb.is_empty()) {
        (true, true) => return a.cmp(&b),
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }
    let mut i = 0;
    loop {
        let x = ca.get(i).map_or(u64::MAX - 1, |&p| p as u64);
        let y = cb.get(i).map_or(u64::MAX, |&p| p as u64);
        if x != y {
            return if x < y { Ordering::Less } else { Ordering::Greater };
        }
        i += 1;
    }
}

#[derive(Debug)]
pub struct Cache {
    config: CacheConfig,
    superstates: Vec<Superstate>,
    free_superstates: Vec<SuperstateId>,
    edges: Vec<SuperEdge>,
    free_edges: Vec<EdgeId>,
    futures: Vec<DistinctFuture>,
    free_futures: Vec<FutureId>,
    /// Supersets, each bound to at most one superstate.
    supersets: ConsTable<u32, Option<SuperstateId>>,
    lru: Option<SuperstateId>,
    semifree: Option<SuperstateId>,
    live: usize,
    semifree_count: usize,
    allowed: usize,
    /// Decaying counters driving the eviction heuristic.
    hits: u64,
    misses: u64,
    total_hits: u64,
    total_misses: u64,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl Cache {
    pub fn new(config: CacheConfig) -> Self {
        let allowed = config.cache_bound.max(1);
        Self {
            config,
            superstates: Vec::new(),
            free_superstates: Vec::new(),
            edges: Vec::new(),
            free_edges: Vec::new(),
            futures: Vec::new(),
            free_futures: Vec::new(),
            supersets: ConsTable::new(),
            lru: None,
            semifree: None,
            live: 0,
            semifree_count: 0,
            allowed,
            hits: 0,
            misses: 0,
            total_hits: 0,
            total_misses: 0,
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.total_hits,
            misses: self.total_misses,
            superstates: self.live,
            semifree: self.semifree_count,
        }
    }

    /// Changes the number of superstates kept before reclaiming.
    pub fn set_bound(&mut self, bound: usize) {
        self.config.cache_bound = bound.max(1);
        self.allowed = self.config.cache_bound;
    }

    pub fn bound(&self) -> usize {
        self.allowed
    }

    /// The action for `chr` in `ss`.
    pub fn transition(&self, ss: SuperstateId, chr: u8) -> Inx {
        self.superstates[ss.0 as usize].table[chr as usize]
    }

    pub fn lock(&mut self, ss: SuperstateId) {
        self.superstates[ss.0 as usize].locks += 1;
    }

    pub fn unlock(&mut self, ss: SuperstateId) {
        let state = &mut self.superstates[ss.0 as usize];
        state.locks = state.locks.saturating_sub(1);
    }

    pub fn is_semifree(&self, ss: SuperstateId) -> bool {
        self.superstates[ss.0 as usize].semifree
    }

    /// The NFA-state ids a superstate stands for.
    pub fn members(&self, ss: SuperstateId) -> Vec<u32> {
        self.supersets.to_vec(self.superstates[ss.0 as usize].contents)
    }

    pub fn future_frame(&self, df: FutureId) -> Inx {
        self.futures[df.0 as usize].future_frame
    }

    pub fn future_effects(&self, df: FutureId) -> Option<ListId> {
        self.futures[df.0 as usize].effects
    }

    pub fn future_present(&self, df: FutureId) -> SuperstateId {
        self.futures[df.0 as usize].present
    }

    pub fn edge_options(&self, edge: EdgeId) -> &[FutureId] {
        &self.edges[edge.0 as usize].options
    }

    /// How the matcher enters one option of an edge.
    pub fn option_frame(&self, df: FutureId) -> Inx {
        let future = &self.futures[df.0 as usize];
        if future.effects.is_some() {
            Inx::DoSideEffects(df)
        } else {
            future.future_frame
        }
    }

    fn ss(&self, id: SuperstateId) -> &Superstate {
        &self.superstates[id.0 as usize]
    }

    fn ss_mut(&mut self, id: SuperstateId) -> &mut Superstate {
        &mut self.superstates[id.0 as usize]
    }

    fn df_mut(&mut self, id: FutureId) -> &mut DistinctFuture {
        &mut self.futures[id.0 as usize]
    }

    fn head_mut(&mut self, ring: Ring) -> &mut Option<SuperstateId> {
        match ring {
            Ring::Hot => &mut self.lru,
            Ring::SemiFree => &mut self.semifree,
        }
    }

    /// Inserts `id` just before the head, the most recently used position.
    fn ring_push(&mut self, ring: Ring, id: SuperstateId) {
        let head = *self.head_mut(ring);
        match head {
            None => {
                let state = self.ss_mut(id);
                state.next = id;
                state.prev = id;
                *self.head_mut(ring) = Some(id);
            }
            Some(head) => {
                let tail = self.ss(head).prev;
                self.ss_mut(id).next = head;
                self.ss_mut(id).prev = tail;
                self.ss_mut(tail).next = id;
                self.ss_mut(head).prev = id;
            }
        }
    }

    fn ring_unlink(&mut self, ring: Ring, id: SuperstateId) {
        let (next, prev) = (self.ss(id).next, self.ss(id).prev);
        let head = self.head_mut(ring);
        if next == id {
            *head = None;
        } else {
            if *head == Some(id) {
                *head = Some(next);
            }
            self.ss_mut(prev).next = next;
            self.ss_mut(next).prev = prev;
        }
        self.ss_mut(id).next = id;
        self.ss_mut(id).prev = id;
    }

    /// Points every future leading to `ss` either at a fault or back at
    /// `ss`, patching the source tables where the future is installed
    /// directly.
    fn redirect_incoming(&mut self, ss: SuperstateId, to_fault: bool) {
        let refs = self.ss(ss).transition_refs.clone();
        for df in refs {
            let frame = if to_fault {
                Inx::FutureMiss(df)
            } else {
                Inx::NextChar(ss)
            };
            let future = &mut self.futures[df.0 as usize];
            future.future_frame = frame;
            let (effects, edge, present) = (future.effects, future.edge, future.present);
            let edge = &self.edges[edge.0 as usize];
            if effects.is_none() && edge.options.len() == 1 {
                install(&mut self.superstates[present.0 as usize].table, &edge.cset, frame);
            }
        }
    }

    fn semifree_this(&mut self, ss: SuperstateId) {
        self.ring_unlink(Ring::Hot, ss);
        self.ring_push(Ring::SemiFree, ss);
        self.ss_mut(ss).semifree = true;
        self.semifree_count += 1;
        self.redirect_incoming(ss, true);
        trace!("superstate {} is semi-free", ss.0);
    }

    /// Moves the least recently used unlocked hot state to the semi-free
    /// ring.
    fn semifree_superstate(&mut self) {
        let mut disqualified = self.semifree_count;
        if disqualified >= self.live {
            return;
        }
        let Some(mut it) = self.lru else {
            return;
        };
        while self.ss(it).locks > 0 {
            it = self.ss(it).next;
            self.lru = Some(it);
            disqualified += 1;
            if disqualified >= self.live {
                return;
            }
        }
        self.semifree_this(it);
    }

    fn refresh_semifree(&mut self, ss: SuperstateId) {
        self.redirect_incoming(ss, false);
        self.ring_unlink(Ring::SemiFree, ss);
        self.ss_mut(ss).semifree = false;
        self.semifree_count -= 1;
        self.ring_push(Ring::Hot, ss);
        trace!("superstate {} revived", ss.0);
    }

    /// Marks `ss` as just used.
    fn refresh(&mut self, ss: SuperstateId) {
        if self.ss(ss).semifree {
            self.refresh_semifree(ss);
        } else if self.lru == Some(ss) {
            self.lru = Some(self.ss(ss).next);
        } else if self.lru.map(|head| self.ss(head).prev) != Some(ss) {
            self.ring_unlink(Ring::Hot, ss);
            self.ring_push(Ring::Hot, ss);
        }
    }

    /// Reclaims one superstate. Returns false when every state is locked.
    fn really_free_superstate(&mut self) -> bool {
        if self.live == 0 {
            return false;
        }
        while self.hits + self.misses > self.allowed as u64 {
            self.hits >>= 1;
            self.misses >>= 1;
        }
        if (self.hits + self.misses) * (self.semifree_count as u64)
            < (self.live as u64) * self.misses
        {
            self.semifree_superstate();
            self.semifree_superstate();
        }

        let mut locked = 0;
        while let Some(head) = self.semifree {
            if self.ss(head).locks == 0 {
                break;
            }
            self.refresh_semifree(head);
            locked += 1;
            if locked >= self.live {
                return false;
            }
        }

        let victim = match self.semifree {
            Some(head) => {
                self.ring_unlink(Ring::SemiFree, head);
                self.ss_mut(head).semifree = false;
                self.semifree_count -= 1;
                head
            }
            None => {
                let Some(mut it) = self.lru else {
                    return false;
                };
                let mut seen = 0;
                while self.ss(it).locks > 0 {
                    it = self.ss(it).next;
                    seen += 1;
                    if seen >= self.live {
                        return false;
                    }
                }
                self.redirect_incoming(it, true);
                self.ring_unlink(Ring::Hot, it);
                it
            }
        };

        for df in std::mem::take(&mut self.ss_mut(victim).transition_refs) {
            let future = self.df_mut(df);
            future.future = None;
            future.future_frame = Inx::FutureMiss(df);
        }
        for edge in std::mem::take(&mut self.ss_mut(victim).edges) {
            for df in std::mem::take(&mut self.edges[edge.0 as usize].options) {
                if let Some(dest) = self.futures[df.0 as usize].future {
                    self.ss_mut(dest).transition_refs.retain(|&r| r != df);
                }
                self.free_futures.push(df);
            }
            self.free_edges.push(edge);
        }

        let contents = self.ss(victim).contents;
        if let Some(set) = contents {
            if let Some(binding) = self.supersets.extra_mut(set) {
                if *binding == Some(victim) {
                    *binding = None;
                }
            }
        }
        self.supersets.release(contents);
        let state = self.ss_mut(victim);
        state.contents = None;
        state.rx_id = 0;
        self.free_superstates.push(victim);
        self.live -= 1;
        trace!("superstate {} reclaimed", victim.0);
        true
    }

    /// Grows the arena by one chunk, never past the current allowance.
    fn morecore(&mut self) {
        let room = self.allowed.saturating_sub(self.superstates.len());
        let grow = self.config.chunk.max(1).min(room);
        for _ in 0..grow {
            let id = SuperstateId(self.superstates.len() as u32);
            self.superstates.push(Superstate::vacant(id));
            self.free_superstates.push(id);
        }
        if grow > 0 {
            trace!("superstate arena grew to {}", self.superstates.len());
        }
    }

    fn get_superstate_slot(&mut self) -> Result<SuperstateId, Error> {
        // Free slots left over from a larger bound do not count as room.
        while self.live >= self.allowed && self.really_free_superstate() {}
        if self.free_superstates.is_empty() && self.live < self.allowed {
            self.morecore();
        }
        while self.free_superstates.is_empty() {
            if !self.really_free_superstate() {
                break;
            }
        }
        if let Some(id) = self.free_superstates.pop() {
            return Ok(id);
        }
        if self.superstates.len() >= self.config.max_superstates {
            return Err(Error::ResourceExhausted(Resource::Superstates));
        }
        warn!(
            "every superstate is locked, growing the cache past {}",
            self.allowed
        );
        self.allowed += 1;
        let id = SuperstateId(self.superstates.len() as u32);
        self.superstates.push(Superstate::vacant(id));
        Ok(id)
    }

    /// Returns the superstate realizing `set` for `nfa`, creating it on a
    /// miss. The caller keeps its own reference on `set` for the duration
    /// of the call.
    pub fn superstate(&mut self, nfa: &Nfa, set: ListId) -> Result<SuperstateId, Error> {
        if let Some(Some(ss)) = self.supersets.extra(set).copied() {
            if self.ss(ss).rx_id == nfa.rx_id() {
                self.hits += 1;
                self.total_hits += 1;
                self.refresh(ss);
                return Ok(ss);
            }
            trace!("superstate {} belongs to another automaton", ss.0);
            if !self.ss(ss).semifree {
                self.semifree_this(ss);
            }
            self.semifree = Some(ss);
            if let Some(binding) = self.supersets.extra_mut(set) {
                *binding = None;
            }
        }

        self.misses += 1;
        self.total_misses += 1;
        let id = self.get_superstate_slot()?;
        let size = nfa.cset_size();
        let state = self.ss_mut(id);
        state.rx_id = nfa.rx_id();
        state.contents = Some(set);
        if state.table.len() == size {
            state.table.fill(Inx::CacheMiss);
        } else {
            state.table = vec![Inx::CacheMiss; size].into_boxed_slice();
        }
        state.edges.clear();
        state.transition_refs.clear();
        state.locks = 0;
        state.semifree = false;
        self.live += 1;
        self.ring_push(Ring::Hot, id);
        self.supersets.protect(Some(set));
        if let Some(binding) = self.supersets.extra_mut(set) {
            *binding = Some(id);
        }
        trace!("superstate {} realizes {:?}", id.0, self.supersets.to_vec(Some(set)));
        Ok(id)
    }

    /// Interns a set of NFA-state ids (ascending) as a superset.
    pub fn superset(&mut self, members: &[u32]) -> Option<ListId> {
        self.supersets.from_slice(members)
    }

    pub fn protect_set(&mut self, set: Option<ListId>) {
        self.supersets.protect(set);
    }

    pub fn release_set(&mut self, set: Option<ListId>) {
        self.supersets.release(set);
    }

    /// Merges an NFA destination set into a superset.
    fn eclosure_union(&mut self, nfa: &Nfa, set: Option<ListId>, ecl: Option<ListId>) -> Option<ListId> {
        if ecl.is_none() {
            return set;
        }
        let mut members = self.supersets.to_vec(set);
        let before = members.len();
        for id in nfa.sets().iter(ecl) {
            if let Err(at) = members.binary_search(&id) {
                members.insert(at, id);
            }
        }
        if members.len() == before {
            return set;
        }
        self.supersets.from_slice(&members)
    }

    /// Adds the futures of NFA state `state` to `futures`, keeping the list
    /// free of duplicate paths and in preference order.
    fn include_futures(nfa: &Nfa, futures: &mut Vec<Option<ListId>>, state: usize) {
        for pf in nfa.state(state).futures.iter() {
            if futures.contains(&pf.effects) {
                continue;
            }
            let at = futures
                .iter()
                .position(|&f| posix_se_list_order(nfa, f, pf.effects) == Ordering::Greater)
                .unwrap_or(futures.len());
            futures.insert(at, pf.effects);
        }
    }

    /// The transition class of `chr` out of `ss`: the largest set of bytes
    /// behaving like `chr`, and the side-effect paths they lead along.
    fn compute_super_edge(&self, nfa: &Nfa, ss: SuperstateId, chr: u8) -> (Bitset, Vec<Option<ListId>>) {
        let mut cset = Bitset::universe(nfa.cset_size());
        let mut futures = Vec::new();
        for id in self.supersets.iter(self.ss(ss).contents) {
            for edge in nfa.state(id as usize).edges.iter() {
                if edge.cset.contains(chr as usize) {
                    Self::include_futures(nfa, &mut futures, edge.dest);
                    cset.intersect(&edge.cset);
                } else {
                    cset.difference(&edge.cset);
                }
            }
        }
        (cset, futures)
    }

    fn add_super_edge(&mut self, ss: SuperstateId, cset: Bitset, paths: Vec<Option<ListId>>) -> EdgeId {
        let edge = match self.free_edges.pop() {
            Some(edge) => {
                self.edges[edge.0 as usize] = SuperEdge {
                    cset,
                    options: Vec::new(),
                };
                edge
            }
            None => {
                self.edges.push(SuperEdge {
                    cset,
                    options: Vec::new(),
                });
                EdgeId(self.edges.len() as u32 - 1)
            }
        };
        let mut options = Vec::with_capacity(paths.len());
        for effects in paths {
            let future = DistinctFuture {
                effects,
                future: None,
                future_frame: Inx::Backtrack,
                edge,
                present: ss,
            };
            let df = match self.free_futures.pop() {
                Some(df) => {
                    self.futures[df.0 as usize] = future;
                    df
                }
                None => {
                    self.futures.push(future);
                    FutureId(self.futures.len() as u32 - 1)
                }
            };
            self.df_mut(df).future_frame = Inx::FutureMiss(df);
            options.push(df);
        }
        self.edges[edge.0 as usize].options = options;
        self.ss_mut(ss).edges.push(edge);
        edge
    }

    fn edge_answer(&self, edge: EdgeId) -> Inx {
        match self.edges[edge.0 as usize].options.as_slice() {
            [df] => self.option_frame(*df),
            _ => Inx::BacktrackPoint(edge),
        }
    }

    /// Resolves the destination of `df` by following every NFA edge of the
    /// source superstate that covers the whole transition class.
    fn solve_destination(&mut self, nfa: &Nfa, df: FutureId) -> Result<(), Error> {
        let DistinctFuture {
            effects,
            edge,
            present,
            ..
        } = self.futures[df.0 as usize];
        let members = self.supersets.to_vec(self.ss(present).contents);
        let mut solution = None;
        for id in members {
            for nfa_edge in nfa.state(id as usize).edges.iter() {
                if !self.edges[edge.0 as usize].cset.is_subset(&nfa_edge.cset) {
                    continue;
                }
                for pf in nfa.state(nfa_edge.dest).futures.iter() {
                    if pf.effects == effects {
                        let old = solution;
                        solution = self.eclosure_union(nfa, solution, pf.destset);
                        self.supersets.protect(solution);
                        self.supersets.release(old);
                    }
                }
            }
        }

        let Some(set) = solution else {
            self.df_mut(df).future_frame = Inx::Backtrack;
            return Ok(());
        };
        let dest = self.superstate(nfa, set);
        self.supersets.release(Some(set));
        let dest = dest?;
        let future = self.df_mut(df);
        future.future = Some(dest);
        future.future_frame = Inx::NextChar(dest);
        self.ss_mut(dest).transition_refs.push(df);
        Ok(())
    }

    /// Fills in the transition of `ss` on `chr`. With `df`, resolves that
    /// particular future instead. Returns the frame the matcher continues
    /// with.
    pub fn handle_cache_miss(
        &mut self,
        nfa: &Nfa,
        ss: SuperstateId,
        chr: u8,
        df: Option<FutureId>,
    ) -> Result<Inx, Error> {
        let Some(df) = df else {
            let known = self
                .ss(ss)
                .edges
                .iter()
                .copied()
                .find(|e| self.edges[e.0 as usize].cset.contains(chr as usize));
            if let Some(edge) = known {
                let answer = self.edge_answer(edge);
                install(&mut self.superstates[ss.0 as usize].table, &self.edges[edge.0 as usize].cset, answer);
                return Ok(answer);
            }

            self.lock(ss);
            let (cset, paths) = self.compute_super_edge(nfa, ss, chr);
            let answer = if paths.is_empty() {
                Inx::Backtrack
            } else {
                let edge = self.add_super_edge(ss, cset.clone(), paths);
                self.edge_answer(edge)
            };
            install(&mut self.ss_mut(ss).table, &cset, answer);
            self.unlock(ss);
            trace!("superstate {} on {:?}: {:?}", ss.0, cset, answer);
            return Ok(answer);
        };

        if let Some(dest) = self.futures[df.0 as usize].future {
            if self.ss(dest).semifree {
                self.refresh_semifree(dest);
            }
            return Ok(self.future_frame(df));
        }

        let present = self.future_present(df);
        self.lock(present);
        let solved = self.solve_destination(nfa, df);
        self.unlock(present);
        solved?;

        let DistinctFuture {
            effects,
            edge,
            future_frame,
            ..
        } = self.futures[df.0 as usize];
        let edge = &self.edges[edge.0 as usize];
        if effects.is_none() && edge.options.len() == 1 {
            install(&mut self.superstates[present.0 as usize].table, &edge.cset, future_frame);
        }
        Ok(future_frame)
    }

    #[cfg(test)]
    fn forget_transition(&mut self, ss: SuperstateId, chr: u8) {
        self.ss_mut(ss).table[chr as usize] = Inx::CacheMiss;
    }

    #[cfg(test)]
    fn edge_count(&self, ss: SuperstateId) -> usize {
        self.ss(ss).edges.len()
    }

    #[cfg(test)]
    pub(crate) fn locked_count(&self) -> usize {
        self.superstates.iter().filter(|s| s.locks > 0).count()
    }
}
