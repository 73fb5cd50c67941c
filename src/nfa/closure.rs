//! Side-effect partitioned epsilon closures and freezing.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use log::*;

use crate::error::{Error, Resource};
use crate::hashcons::{ConsTable, ListId};
use crate::rexp::SideEffect;

use super::builder::{BuildEdge, EdgeLabel, NfaBuilder};
use super::{Nfa, NfaEdge, NfaState, PossibleFuture};

static NEXT_RX_ID: AtomicU64 = AtomicU64::new(1);

enum Step {
    Epsilon(usize),
    Effect(SideEffect, usize),
}

/// Orders effect lists: the empty list first, then by descending effect
/// code, element by element.
fn se_list_cmp(effects: &ConsTable<SideEffect>, a: Option<ListId>, b: Option<ListId>) -> Ordering {
    let (mut a, mut b) = (a, b);
    loop {
        if a == b {
            return Ordering::Equal;
        }
        let (Some(x), Some(y)) = (a, b) else {
            return if a.is_none() { Ordering::Less } else { Ordering::Greater };
        };
        let cx = effects.car(x).map_or(0, SideEffect::code);
        let cy = effects.car(y).map_or(0, SideEffect::code);
        match cy.cmp(&cx) {
            Ordering::Equal => {
                a = effects.cdr(x);
                b = effects.cdr(y);
            }
            other => return other,
        }
    }
}

struct Closure<'b> {
    builder: &'b mut NfaBuilder,
    path: Vec<SideEffect>,
    visits: usize,
    limit: usize,
}

impl Closure<'_> {
    fn eclose_node(&mut self, root: usize, node: usize) -> Result<(), Error> {
        if self.builder.states[node].mark {
            return Ok(());
        }
        self.visits += 1;
        if self.visits > self.limit {
            return Err(Error::ResourceExhausted(Resource::Closures));
        }
        self.builder.states[node].mark = true;
        let result = self.visit(root, node);
        self.builder.states[node].mark = false;
        result
    }

    fn visit(&mut self, root: usize, node: usize) -> Result<(), Error> {
        let state = &self.builder.states[node];
        if state.id >= 0 || state.is_final {
            let id = state.id;
            self.record_future(root, id);
        }

        let steps: Vec<Step> = self.builder.states[node]
            .edges
            .iter()
            .filter_map(|e| match e.label {
                EdgeLabel::Epsilon => Some(Step::Epsilon(e.dest)),
                EdgeLabel::SideEffect(se) => Some(Step::Effect(se, e.dest)),
                EdgeLabel::CharSet(_) => None,
            })
            .collect();
        for step in steps {
            match step {
                Step::Epsilon(dest) => self.eclose_node(root, dest)?,
                Step::Effect(se, dest) => {
                    self.path.push(se);
                    let result = self.eclose_node(root, dest);
                    self.path.pop();
                    result?;
                }
            }
        }
        Ok(())
    }

    fn record_future(&mut self, root: usize, id: i32) {
        let builder = &mut *self.builder;
        let effects = builder.effects.from_slice(&self.path);
        let futures = &builder.states[root].futures;
        let at = futures
            .iter()
            .position(|f| se_list_cmp(&builder.effects, f.effects, effects) != Ordering::Less);
        let slot = match at {
            Some(i) if futures[i].effects == effects => i,
            _ => {
                let i = at.unwrap_or(futures.len());
                builder.effects.protect(effects);
                builder.states[root].futures.insert(
                    i,
                    PossibleFuture {
                        effects,
                        destset: None,
                    },
                );
                i
            }
        };
        if id >= 0 {
            let old = builder.states[root].futures[slot].destset;
            let new = enjoin(&mut builder.sets, id as u32, old);
            if new != old {
                builder.sets.protect(new);
                builder.sets.release(old);
                builder.states[root].futures[slot].destset = new;
            }
        }
    }
}

/// Adds `id` to an ascending state set.
fn enjoin(sets: &mut ConsTable<u32>, id: u32, set: Option<ListId>) -> Option<ListId> {
    let mut members = sets.to_vec(set);
    match members.binary_search(&id) {
        Ok(_) => set,
        Err(at) => {
            members.insert(at, id);
            sets.from_slice(&members)
        }
    }
}

impl NfaBuilder {
    /// Numbers states with character edges from 0 upward and every other
    /// state from -1 downward, and flags the states whose closure is needed.
    pub(super) fn name_states(&mut self) -> usize {
        let mut char_states = 0;
        let mut others = 0;
        for i in 0..self.states.len() {
            let has_cset = self.states[i]
                .edges
                .iter()
                .any(|e| matches!(e.label, EdgeLabel::CharSet(_)));
            if has_cset {
                self.states[i].id = char_states;
                char_states += 1;
                let dests: Vec<usize> = self.states[i]
                    .edges
                    .iter()
                    .filter(|e| matches!(e.label, EdgeLabel::CharSet(_)))
                    .map(|e| e.dest)
                    .collect();
                for dest in dests {
                    self.states[dest].eclosure_needed = true;
                }
            } else {
                others -= 1;
                self.states[i].id = others;
            }
            if self.states[i].is_start {
                self.states[i].eclosure_needed = true;
            }
        }
        char_states as usize
    }

    /// Computes the closure of every flagged state and returns the
    /// automaton's fresh generation id.
    pub(super) fn eclose(&mut self, limit: usize) -> Result<u64, Error> {
        let rx_id = NEXT_RX_ID.fetch_add(1, AtomicOrdering::Relaxed);
        let mut closure = Closure {
            builder: self,
            path: Vec::new(),
            visits: 0,
            limit,
        };
        for root in 0..closure.builder.states.len() {
            if closure.builder.states[root].eclosure_needed {
                closure.eclose_node(root, root)?;
            }
        }
        trace!("closures took {} visits", closure.visits);
        Ok(rx_id)
    }

    pub(super) fn delete_epsilon_transitions(&mut self) {
        for state in self.states.iter_mut() {
            state
                .edges
                .retain(|e| matches!(e.label, EdgeLabel::CharSet(_)));
        }
    }

    /// Lays the graph out with character states first, in id order.
    pub(super) fn compactify(self, rx_id: u64, char_states: usize) -> Result<Nfa, Error> {
        let mut order: Vec<usize> = (0..self.states.len()).collect();
        order.sort_by_key(|&i| {
            let id = self.states[i].id;
            if id >= 0 { (0, id) } else { (1, -id) }
        });
        let mut remap = vec![0; self.states.len()];
        for (new, &old) in order.iter().enumerate() {
            remap[old] = new;
        }
        let start = self
            .states
            .iter()
            .position(|s| s.is_start)
            .map(|old| remap[old])
            .ok_or_else(|| Error::Internal("automaton has no start state".to_string()))?;

        let mut slots: Vec<Option<_>> = self.states.into_iter().map(Some).collect();
        let mut states = Vec::with_capacity(slots.len());
        for &old in &order {
            let Some(state) = slots[old].take() else {
                return Err(Error::Internal("state laid out twice".to_string()));
            };
            let edges = state
                .edges
                .into_iter()
                .filter_map(|BuildEdge { label, dest }| match label {
                    EdgeLabel::CharSet(cset) => Some(NfaEdge {
                        cset,
                        dest: remap[dest],
                    }),
                    _ => None,
                })
                .collect();
            states.push(NfaState {
                id: state.id,
                is_start: state.is_start,
                is_final: state.is_final,
                edges,
                futures: state.futures.into_boxed_slice(),
            });
        }

        Ok(Nfa {
            rx_id,
            start,
            states: states.into_boxed_slice(),
            char_states,
            cset_size: self.cset_size,
            effects: self.effects,
            sets: self.sets,
        })
    }

    /// Computes closures and produces the frozen automaton. A failure drops
    /// the builder with everything computed so far.
    pub fn freeze(mut self, closure_limit: usize) -> Result<Nfa, Error> {
        let char_states = self.name_states();
        let rx_id = self.eclose(closure_limit)?;
        self.delete_epsilon_transitions();
        let nfa = self.compactify(rx_id, char_states)?;
        debug!(
            "froze automaton {}: {} states, {} with character edges",
            nfa.rx_id(),
            nfa.len(),
            nfa.char_states()
        );
        Ok(nfa)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rustc_hash::FxHashMap;

    use super::*;
    use crate::bitset::Bitset;
    use crate::nfa::builder::EdgeLabel;
    use crate::rexp::SimpleEffect;

    const A: SideEffect = SideEffect::Simple(SimpleEffect::Hat);
    const B: SideEffect = SideEffect::Complex(0);

    /// Per state: (id, [(effects, member ids)]).
    fn futures_of(nfa: &Nfa) -> Vec<(i32, Vec<(Vec<SideEffect>, Vec<u32>)>)> {
        nfa.states()
            .iter()
            .filter(|s| !s.futures.is_empty())
            .map(|s| {
                let mut fs: Vec<_> = s
                    .futures
                    .iter()
                    .map(|f| (nfa.effect_list(f.effects), nfa.set_members(f.destset)))
                    .collect();
                fs.sort_by_key(|(e, _)| format!("{e:?}"));
                (s.id, fs)
            })
            .collect()
    }

    #[test]
    fn closure_partitions_by_effect_path() {
        // 0 -eps-> 1 -a-> 4 (final)
        // 0 -A-> 2 -b-> 4
        // 0 -A-> 3 -B-> 1
        // 3 -eps-> 0 (cycle)
        let mut b = NfaBuilder::new(256, 100);
        let s: Vec<usize> = (0..5).map(|_| b.add_state().unwrap()).collect();
        b.add_edge(s[0], s[1], EdgeLabel::Epsilon);
        b.add_edge(s[1], s[4], EdgeLabel::CharSet(Bitset::from_bytes(b"a")));
        b.add_edge(s[0], s[2], EdgeLabel::SideEffect(A));
        b.add_edge(s[2], s[4], EdgeLabel::CharSet(Bitset::from_bytes(b"b")));
        b.add_edge(s[0], s[3], EdgeLabel::SideEffect(A));
        b.add_edge(s[3], s[1], EdgeLabel::SideEffect(B));
        b.add_edge(s[3], s[0], EdgeLabel::Epsilon);
        b.set_start(s[0]);
        b.set_final(s[4]);
        let nfa = b.freeze(1000).unwrap();

        assert_eq!(nfa.char_states(), 2);
        let id1 = nfa.states().iter().position(|st| st.edges.iter().any(|e| e.cset.contains(b'a' as usize))).unwrap() as u32;
        let id2 = 1 - id1;
        let start = nfa.state(nfa.start());
        assert!(start.id < 0);

        // Paths from 0: [] -> {1}; [A] -> {2}; [A, B] -> {1}; [A] then the
        // cycle back to 0 is cut because 0 is on the path.
        let mut expected = vec![
            (vec![], vec![id1]),
            (vec![A], vec![id2]),
            (vec![A, B], vec![id1]),
        ];
        expected.sort_by_key(|(e, _)| format!("{e:?}"));
        let got = futures_of(&nfa);
        let start_futures = got.iter().find(|(id, _)| *id == start.id).unwrap();
        assert_eq!(start_futures.1, expected);

        // The final state records an empty destination set.
        let fin = nfa.states().iter().find(|st| st.is_final).unwrap();
        assert_eq!(fin.futures.len(), 1);
        assert_eq!(fin.futures[0].destset, None);
        assert_eq!(fin.futures[0].effects, None);
    }

    /// Every simple epsilon path from `root` in a graph given as
    /// `(from, to, label)` triples: effects crossed mapped to the ids of the
    /// character states reached.
    fn enumerate_paths(
        edges: &[(usize, usize, EdgeLabel)],
        ids: &[Option<u32>],
        is_final: &[bool],
        root: usize,
    ) -> FxHashMap<Vec<SideEffect>, Vec<u32>> {
        fn walk(
            edges: &[(usize, usize, EdgeLabel)],
            ids: &[Option<u32>],
            is_final: &[bool],
            node: usize,
            on_path: &mut Vec<usize>,
            effects: &mut Vec<SideEffect>,
            out: &mut FxHashMap<Vec<SideEffect>, Vec<u32>>,
        ) {
            if on_path.contains(&node) {
                return;
            }
            on_path.push(node);
            if ids[node].is_some() || is_final[node] {
                let dests = out.entry(effects.clone()).or_default();
                if let Some(id) = ids[node] {
                    if !dests.contains(&id) {
                        dests.push(id);
                        dests.sort();
                    }
                }
            }
            for (from, to, label) in edges {
                if *from != node {
                    continue;
                }
                match label {
                    EdgeLabel::Epsilon => walk(edges, ids, is_final, *to, on_path, effects, out),
                    EdgeLabel::SideEffect(se) => {
                        effects.push(*se);
                        walk(edges, ids, is_final, *to, on_path, effects, out);
                        effects.pop();
                    }
                    EdgeLabel::CharSet(_) => {}
                }
            }
            on_path.pop();
        }
        let mut out = FxHashMap::default();
        walk(edges, ids, is_final, root, &mut Vec::new(), &mut Vec::new(), &mut out);
        out
    }

    #[test]
    fn closures_match_path_enumeration() {
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move |bound: u64| {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed % bound
        };

        for _ in 0..40 {
            let n = 6;
            let mut edges = Vec::new();
            for from in 0..n {
                for to in 0..n {
                    let label = match next(8) {
                        0 | 1 => EdgeLabel::Epsilon,
                        2 => EdgeLabel::SideEffect(A),
                        3 => EdgeLabel::SideEffect(B),
                        4 => EdgeLabel::CharSet(Bitset::from_bytes(&[b'a' + to as u8])),
                        _ => continue,
                    };
                    edges.push((from, to, label));
                }
            }
            let is_final: Vec<bool> = (0..n).map(|i| i == n - 1).collect();
            let mut ids = vec![None; n];
            let mut char_states = 0;
            for (i, id) in ids.iter_mut().enumerate() {
                if edges
                    .iter()
                    .any(|(from, _, l)| *from == i && matches!(l, EdgeLabel::CharSet(_)))
                {
                    *id = Some(char_states);
                    char_states += 1;
                }
            }
            // Frozen layout: character states in id order, then the rest.
            let mut order: Vec<usize> = (0..n).filter(|&i| ids[i].is_some()).collect();
            order.extend((0..n).filter(|&i| ids[i].is_none()));

            let mut b = NfaBuilder::new(256, 100);
            for _ in 0..n {
                b.add_state().unwrap();
            }
            for (from, to, label) in &edges {
                b.add_edge(*from, *to, label.clone());
            }
            b.set_start(0);
            b.set_final(n - 1);
            let nfa = b.freeze(1_000_000).unwrap();

            let mut roots = vec![0];
            for (from, to, label) in &edges {
                if ids[*from].is_some() && matches!(label, EdgeLabel::CharSet(_)) {
                    roots.push(*to);
                }
            }
            for root in roots {
                let state = nfa.state(order.iter().position(|&i| i == root).unwrap());
                let got: FxHashMap<Vec<SideEffect>, Vec<u32>> = state
                    .futures
                    .iter()
                    .map(|f| (nfa.effect_list(f.effects), nfa.set_members(f.destset)))
                    .collect();
                assert_eq!(got, enumerate_paths(&edges, &ids, &is_final, root));
            }
        }
    }

    #[test]
    fn char_states_come_first() {
        let mut b = NfaBuilder::new(256, 100);
        let s0 = b.add_state().unwrap();
        let s1 = b.add_state().unwrap();
        let s2 = b.add_state().unwrap();
        b.add_edge(s0, s1, EdgeLabel::Epsilon);
        b.add_edge(s1, s2, EdgeLabel::CharSet(Bitset::from_bytes(b"x")));
        b.set_start(s0);
        b.set_final(s2);
        let nfa = b.freeze(100).unwrap();
        assert_eq!(nfa.state(0).id, 0);
        assert_eq!(nfa.state(0).edges.len(), 1);
        assert!(nfa.states()[1..].iter().all(|s| s.id < 0));
        assert!(nfa.states().iter().all(|s| s.edges.iter().all(|e| e.dest < nfa.len())));
        assert_eq!(nfa.set_members(nfa.start_set()), vec![0]);
    }

    #[test]
    fn ids_are_fresh() {
        let make = || {
            let mut b = NfaBuilder::new(256, 10);
            let s = b.add_state().unwrap();
            b.set_start(s);
            b.set_final(s);
            b.freeze(10).unwrap()
        };
        assert_ne!(make().rx_id(), make().rx_id());
    }

    #[test]
    fn closure_limit() {
        // A ladder of diamonds: each level doubles the number of paths.
        let mut b = NfaBuilder::new(256, 1000);
        let mut prev = b.add_state().unwrap();
        b.set_start(prev);
        for _ in 0..20 {
            let left = b.add_state().unwrap();
            let right = b.add_state().unwrap();
            let join = b.add_state().unwrap();
            b.add_edge(prev, left, EdgeLabel::SideEffect(A));
            b.add_edge(prev, right, EdgeLabel::SideEffect(B));
            b.add_edge(left, join, EdgeLabel::Epsilon);
            b.add_edge(right, join, EdgeLabel::Epsilon);
            prev = join;
        }
        b.set_final(prev);
        assert_eq!(
            b.freeze(10_000).unwrap_err(),
            Error::ResourceExhausted(Resource::Closures)
        );
    }
}
