//! The match driver.
//!
//! A search tries candidate start positions from left to right. At each
//! one it feeds a prefix byte selecting one of the two compiled trees and
//! then the subject to the superstate automaton, dispatching on the
//! instruction found in the current superstate's table:
//!
//! * [`Inx::NextChar`] moves to the next superstate and reads one byte;
//! * [`Inx::DoSideEffects`] runs the effects of one path (group markers,
//!   anchors, counters, backreferences) and continues with its future;
//! * [`Inx::BacktrackPoint`] pushes a frame and tries every path in
//!   preference order;
//! * [`Inx::CacheMiss`] and [`Inx::FutureMiss`] ask the cache to build the
//!   missing piece;
//! * [`Inx::Backtrack`] resumes the newest frame.
//!
//! Every superstate a frame refers to is locked until the frame is popped,
//! so the cache never reclaims it while it may still be resumed.

use log::*;

use crate::cache::{Cache, EdgeId, FutureId, Inx, SuperstateId};
use crate::compile::{CAPTURE_PREFIX, PUSHBACK_BYTE, Program, SEARCH_PREFIX, is_word_byte};
use crate::error::{Error, Resource};
use crate::rexp::{ParamKind, SideEffect, SimpleEffect};
use crate::util::{Input, Span};

/// What a search is asked to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Stop at the first win; only the pruned tree is used.
    Exists,
    /// Leftmost-longest bounds of group 0.
    Longest,
    /// Leftmost-longest match with every group recorded.
    Captures,
}

impl Mode {
    fn prefix(self) -> u8 {
        match self {
            Mode::Captures => CAPTURE_PREFIX,
            Mode::Exists | Mode::Longest => SEARCH_PREFIX,
        }
    }
}

/// Runs one search. Returns the spans of group 0 and, in
/// [`Mode::Captures`], of every other group.
pub fn search(
    program: &Program,
    cache: &mut Cache,
    input: &Input<'_>,
    mode: Mode,
    backtrack_limit: usize,
) -> Result<Option<Box<[Span]>>, Error> {
    if !input.valid() {
        return Ok(None);
    }
    let mut search = Search::new(program, cache, input, mode, backtrack_limit)?;
    search.run()
}

#[derive(Debug, Clone, Copy)]
struct Counter {
    val: usize,
    next: Option<u32>,
}

/// A stack of counters that backtracking can restore in constant time:
/// nodes are never modified, an update pushes a new node.
#[derive(Debug, Default)]
struct Counters {
    nodes: Vec<Counter>,
    top: Option<u32>,
}

impl Counters {
    fn clear(&mut self) {
        self.nodes.clear();
        self.top = None;
    }

    fn mark(&self) -> (Option<u32>, usize) {
        (self.top, self.nodes.len())
    }

    fn restore(&mut self, (top, len): (Option<u32>, usize)) {
        self.top = top;
        self.nodes.truncate(len);
    }

    fn push(&mut self, val: usize) {
        self.nodes.push(Counter {
            val,
            next: self.top,
        });
        self.top = Some(self.nodes.len() as u32 - 1);
    }

    fn peek(&self) -> Result<usize, Error> {
        match self.top {
            Some(top) => Ok(self.nodes[top as usize].val),
            None => Err(Error::Internal("counter stack underflow".to_string())),
        }
    }

    fn pop(&mut self) -> Result<(), Error> {
        match self.top {
            Some(top) => {
                self.top = self.nodes[top as usize].next;
                Ok(())
            }
            None => Err(Error::Internal("counter stack underflow".to_string())),
        }
    }

    fn set(&mut self, val: usize) -> Result<(), Error> {
        self.pop()?;
        self.push(val);
        Ok(())
    }
}

/// Saved state of a non-deterministic choice.
#[derive(Debug)]
struct Frame {
    ss: SuperstateId,
    c: u8,
    at: usize,
    last_l: isize,
    last_r: isize,
    edge: EdgeId,
    /// Option being explored.
    option: usize,
    counters: (Option<u32>, usize),
    /// Start of this frame's saved registers, when they are saved.
    regs: usize,
}

struct Search<'a> {
    program: &'a Program,
    cache: &'a mut Cache,
    subject: &'a [u8],
    input: &'a Input<'a>,
    mode: Mode,
    backtrack_limit: usize,
    regs_on_stack: bool,
    start: SuperstateId,

    ss: SuperstateId,
    c: u8,
    /// Bytes consumed so far, as an offset into the subject.
    at: usize,
    lparen: Vec<isize>,
    rparen: Vec<isize>,
    last_l: isize,
    last_r: isize,
    counters: Counters,
    frames: Vec<Frame>,
    saved_regs: Vec<isize>,

    best_lparen: Vec<isize>,
    best_rparen: Vec<isize>,
    best_last_l: isize,
    best_last_r: isize,
    best_end: Option<usize>,
}

impl<'a> Search<'a> {
    fn new(
        program: &'a Program,
        cache: &'a mut Cache,
        input: &'a Input<'a>,
        mode: Mode,
        backtrack_limit: usize,
    ) -> Result<Self, Error> {
        let start = start_superstate(program, cache)?;
        let regs = program.re_nsub + 1;
        let regs_on_stack = match mode {
            Mode::Captures => program.match_regs_on_stack,
            Mode::Exists | Mode::Longest => program.search_regs_on_stack,
        };
        Ok(Self {
            program,
            cache,
            subject: input.subject,
            input,
            mode,
            backtrack_limit,
            regs_on_stack,
            start,
            ss: start,
            c: 0,
            at: 0,
            lparen: vec![-1; regs],
            rparen: vec![-1; regs],
            last_l: 0,
            last_r: 0,
            counters: Counters::default(),
            frames: Vec::new(),
            saved_regs: Vec::new(),
            best_lparen: vec![-1; regs],
            best_rparen: vec![-1; regs],
            best_last_l: -1,
            best_last_r: -1,
            best_end: None,
        })
    }

    fn translate(&self, c: u8) -> u8 {
        self.program.translate[c as usize]
    }

    /// Whether a match may begin at `at`, before running the automaton.
    fn plausible_start(&self, at: usize) -> bool {
        let program = self.program;
        if program.is_anchored && at > 0 {
            if !program.newline_anchor {
                return false;
            }
            if self.translate(self.subject[at - 1]) != self.translate(b'\n') {
                return false;
            }
        }
        match self.subject.get(at) {
            Some(&c) => program.fastset.contains(c as usize),
            None => program.can_match_empty,
        }
    }

    fn run(&mut self) -> Result<Option<Box<[Span]>>, Error> {
        let span = self.input.span;
        let mut last = span.to;
        if self.program.begbuf_only {
            if span.from > 0 {
                return Ok(None);
            }
            last = 0;
        }
        if self.input.anchored {
            last = span.from;
        }

        for at in span.from..=last {
            if self.program.is_anchored && !self.program.newline_anchor && at > 0 {
                break;
            }
            if !self.plausible_start(at) {
                continue;
            }
            self.test(at)?;
            if self.best_end.is_some() {
                trace!("match at {} ending at {:?}", at, self.best_end);
                return Ok(Some(self.spans(at)));
            }
        }
        Ok(None)
    }

    fn spans(&self, start: usize) -> Box<[Span]> {
        let end = self.best_end.unwrap_or(start);
        let mut spans = vec![Span::invalid(); if self.mode == Mode::Captures { self.lparen.len() } else { 1 }];
        spans[0] = Span { from: start, to: end };
        for (group, slot) in spans.iter_mut().enumerate().skip(1) {
            let group_i = group as isize;
            if group_i > self.best_last_l || group_i > self.best_last_r {
                continue;
            }
            let (from, to) = (self.best_lparen[group], self.best_rparen[group]);
            if from >= 0 && to >= from {
                *slot = Span {
                    from: from as usize,
                    to: to as usize,
                };
            }
        }
        spans.into_boxed_slice()
    }

    fn reset(&mut self, start: usize) {
        self.lparen.fill(-1);
        self.rparen.fill(-1);
        self.lparen[0] = start as isize;
        self.last_l = 0;
        self.last_r = 0;
        self.counters.clear();
        self.saved_regs.clear();
        self.best_last_l = -1;
        self.best_last_r = -1;
        self.best_end = None;
    }

    /// Explores every path from `start`, recording the longest win.
    fn test(&mut self, start: usize) -> Result<(), Error> {
        self.reset(start);
        self.ss = self.start;
        self.c = self.mode.prefix();
        self.at = start;
        let mut inx = self.cache.transition(self.ss, self.c);
        loop {
            let next = match inx {
                Inx::NextChar(dest) => {
                    self.ss = dest;
                    match self.subject.get(self.at) {
                        Some(&c) => {
                            self.c = c;
                            self.at += 1;
                            Some(self.cache.transition(dest, c))
                        }
                        None => self.backtrack(),
                    }
                }
                Inx::CacheMiss => Some(self.cache.handle_cache_miss(
                    &self.program.nfa,
                    self.ss,
                    self.c,
                    None,
                )?),
                Inx::FutureMiss(df) => Some(self.cache.handle_cache_miss(
                    &self.program.nfa,
                    self.ss,
                    self.c,
                    Some(df),
                )?),
                Inx::Backtrack => self.backtrack(),
                Inx::DoSideEffects(df) => match self.side_effects(df)? {
                    Effects::Continue(inx) => Some(inx),
                    Effects::Fail => self.backtrack(),
                    Effects::Found => {
                        self.unwind();
                        return Ok(());
                    }
                },
                Inx::BacktrackPoint(edge) => Some(self.backtrack_point(edge)?),
            };
            match next {
                Some(next) => inx = next,
                None => return Ok(()),
            }
        }
    }

    fn backtrack_point(&mut self, edge: EdgeId) -> Result<Inx, Error> {
        let options = self.cache.edge_options(edge);
        let Some(&first) = options.first() else {
            return Ok(Inx::Backtrack);
        };
        if options.len() == 1 {
            return Ok(self.cache.option_frame(first));
        }
        if self.frames.len() >= self.backtrack_limit {
            return Err(Error::ResourceExhausted(Resource::BacktrackDepth));
        }

        let regs = self.saved_regs.len();
        if self.regs_on_stack {
            let l = (self.last_l + 1) as usize;
            let r = (self.last_r + 1) as usize;
            self.saved_regs.extend_from_slice(&self.lparen[..l]);
            self.saved_regs.extend_from_slice(&self.rparen[..r]);
        }
        self.cache.lock(self.ss);
        self.frames.push(Frame {
            ss: self.ss,
            c: self.c,
            at: self.at,
            last_l: self.last_l,
            last_r: self.last_r,
            edge,
            option: 0,
            counters: self.counters.mark(),
            regs,
        });
        Ok(self.cache.option_frame(first))
    }

    /// Resumes the newest frame with its next option. Returns `None` when no
    /// frame is left.
    fn backtrack(&mut self) -> Option<Inx> {
        let frame = self.frames.last_mut()?;
        frame.option += 1;
        let options = self.cache.edge_options(frame.edge);
        let df = options[frame.option];
        let is_last = frame.option + 1 == options.len();

        self.ss = frame.ss;
        self.c = frame.c;
        self.at = frame.at;
        self.last_l = frame.last_l;
        self.last_r = frame.last_r;
        self.counters.restore(frame.counters);
        if self.regs_on_stack {
            let l = (self.last_l + 1) as usize;
            let r = (self.last_r + 1) as usize;
            let saved = &self.saved_regs[frame.regs..];
            self.lparen[..l].copy_from_slice(&saved[..l]);
            self.rparen[..r].copy_from_slice(&saved[l..l + r]);
        }
        let next = self.cache.option_frame(df);

        if is_last {
            let regs = frame.regs;
            self.frames.pop();
            self.saved_regs.truncate(regs);
            self.cache.unlock(self.ss);
        }
        Some(next)
    }

    fn unwind(&mut self) {
        for frame in self.frames.drain(..) {
            self.cache.unlock(frame.ss);
        }
        self.saved_regs.clear();
    }

    fn is_word_at(&self, at: usize) -> bool {
        self.subject.get(at).is_some_and(|&c| is_word_byte(c))
    }

    fn at_word_boundary(&self) -> bool {
        let len = self.subject.len();
        if self.at == 0 || self.at == len {
            return true;
        }
        self.is_word_at(self.at - 1) != self.is_word_at(self.at)
    }

    fn simple_effect(&mut self, effect: SimpleEffect) -> Result<bool, Error> {
        let at = self.at;
        let len = self.subject.len();
        let pass = match effect {
            // handled by the caller
            SimpleEffect::Pushback => true,
            SimpleEffect::Push0 => {
                self.counters.push(0);
                true
            }
            SimpleEffect::PushPos => {
                self.counters.push(at);
                true
            }
            SimpleEffect::ChkPos => {
                if self.counters.peek()? == at {
                    false
                } else {
                    self.counters.set(at)?;
                    true
                }
            }
            SimpleEffect::PopPos => {
                self.counters.pop()?;
                true
            }
            SimpleEffect::BegBuf => at == 0,
            SimpleEffect::EndBuf => at == len,
            SimpleEffect::Hat => {
                if at == 0 {
                    !self.input.not_bol
                } else {
                    self.program.newline_anchor
                        && self.translate(self.subject[at - 1]) == self.translate(b'\n')
                }
            }
            SimpleEffect::Dollar => {
                if at == len {
                    !self.input.not_eol
                } else {
                    self.program.newline_anchor
                        && self.translate(self.subject[at]) == self.translate(b'\n')
                }
            }
            SimpleEffect::WordBeg => self.is_word_at(at) && (at == 0 || !self.is_word_at(at - 1)),
            SimpleEffect::WordEnd => {
                at > 0 && self.is_word_at(at - 1) && (at == len || !self.is_word_at(at))
            }
            SimpleEffect::WordBound => self.at_word_boundary(),
            SimpleEffect::NotWordBound => !self.at_word_boundary(),
        };
        Ok(pass)
    }

    fn win(&mut self) -> bool {
        let at = self.at;
        if self.best_end.is_none_or(|end| at > end) {
            let l = (self.last_l + 1) as usize;
            let r = (self.last_r + 1) as usize;
            self.best_lparen[..l].copy_from_slice(&self.lparen[..l]);
            self.best_rparen[..r].copy_from_slice(&self.rparen[..r]);
            self.best_last_l = self.last_l;
            self.best_last_r = self.last_r;
            self.best_end = Some(at);
        }
        self.mode == Mode::Exists
    }

    fn backref(&mut self, group: usize) -> bool {
        if group as isize > self.last_r {
            return false;
        }
        let (from, to) = (self.lparen[group], self.rparen[group]);
        if from < 0 || to < from {
            return false;
        }
        let (from, to) = (from as usize, to as usize);
        let n = to - from;
        if self.at + n > self.subject.len() {
            return false;
        }
        let same = (0..n).all(|i| {
            self.translate(self.subject[from + i]) == self.translate(self.subject[self.at + i])
        });
        if same {
            self.at += n;
        }
        same
    }

    fn set_paren(regs: &mut [isize], last: &mut isize, group: usize, at: usize) {
        regs[group] = at as isize;
        let group = group as isize;
        if *last < group {
            *last += 1;
            while *last < group {
                regs[*last as usize] = -1;
                *last += 1;
            }
        }
    }

    fn side_effects(&mut self, df: FutureId) -> Result<Effects, Error> {
        let program = self.program;
        let list = self.cache.future_effects(df);
        for se in program.nfa.effects().iter(list) {
            let pass = match se {
                SideEffect::Simple(SimpleEffect::Pushback) => return self.pushback(df),
                SideEffect::Simple(effect) => self.simple_effect(effect)?,
                SideEffect::Complex(index) => {
                    let param = program
                        .params
                        .get(index)
                        .copied()
                        .ok_or_else(|| Error::Internal(format!("unknown side effect {index}")))?;
                    match param.kind {
                        ParamKind::Win => {
                            if self.win() {
                                return Ok(Effects::Found);
                            }
                            true
                        }
                        ParamKind::LParen => {
                            let at = self.at;
                            Self::set_paren(&mut self.lparen, &mut self.last_l, param.op1 as usize, at);
                            true
                        }
                        ParamKind::RParen => {
                            let at = self.at;
                            Self::set_paren(&mut self.rparen, &mut self.last_r, param.op1 as usize, at);
                            true
                        }
                        ParamKind::Backref => self.backref(param.op1 as usize),
                        ParamKind::Iter => {
                            let val = self.counters.peek()?;
                            if val == param.op2 as usize {
                                false
                            } else {
                                self.counters.set(val + 1)?;
                                true
                            }
                        }
                        ParamKind::EndIter => {
                            if self.counters.peek()? < param.op1 as usize {
                                false
                            } else {
                                self.counters.pop()?;
                                true
                            }
                        }
                        ParamKind::Tv => true,
                    }
                }
            };
            if !pass {
                return Ok(Effects::Fail);
            }
        }
        Ok(Effects::Continue(self.cache.future_frame(df)))
    }

    /// Moves to the future of `df` and feeds it the pushback byte without
    /// reading the subject.
    fn pushback(&mut self, df: FutureId) -> Result<Effects, Error> {
        let mut frame = self.cache.future_frame(df);
        if !matches!(frame, Inx::NextChar(_)) {
            frame = self
                .cache
                .handle_cache_miss(&self.program.nfa, self.ss, self.c, Some(df))?;
        }
        let Inx::NextChar(dest) = frame else {
            return Ok(Effects::Fail);
        };
        self.ss = dest;
        self.c = PUSHBACK_BYTE;
        Ok(Effects::Continue(self.cache.transition(dest, PUSHBACK_BYTE)))
    }
}

enum Effects {
    Continue(Inx),
    Fail,
    Found,
}

impl Drop for Search<'_> {
    fn drop(&mut self) {
        self.unwind();
        self.cache.unlock(self.start);
    }
}

/// Builds and locks the superstate of the start set. The caller unlocks it.
fn start_superstate(program: &Program, cache: &mut Cache) -> Result<SuperstateId, Error> {
    let nfa = &program.nfa;
    let members = nfa.set_members(nfa.start_set());
    let set = cache
        .superset(&members)
        .ok_or_else(|| Error::Internal("empty start set".to_string()))?;
    cache.protect_set(Some(set));
    let ss = cache.superstate(nfa, set);
    cache.release_set(Some(set));
    let ss = ss?;
    cache.lock(ss);
    Ok(ss)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::regex::Config;

    fn program(pattern: &str) -> Program {
        Program::compile(pattern.as_bytes(), &Config::default()).unwrap()
    }

    fn run(pattern: &str, subject: &str, mode: Mode) -> Option<Vec<Option<(usize, usize)>>> {
        let program = program(pattern);
        let mut cache = Cache::default();
        let input = Input::from(subject);
        search(&program, &mut cache, &input, mode, 10_000)
            .unwrap()
            .map(|spans| {
                spans
                    .iter()
                    .map(|s| s.valid().then_some((s.from, s.to)))
                    .collect()
            })
    }

    fn group0(pattern: &str, subject: &str) -> Option<(usize, usize)> {
        run(pattern, subject, Mode::Longest).and_then(|spans| spans[0])
    }

    #[test]
    fn leftmost_longest() {
        assert_eq!(group0("a|ab", "xab"), Some((1, 3)));
        assert_eq!(group0("a*", "baaa"), Some((0, 0)));
        assert_eq!(group0("b+", "abbbc"), Some((1, 4)));
        assert_eq!(group0("x", "abc"), None);
    }

    #[test]
    fn exists_stops_early() {
        let spans = run("a+", "aaa", Mode::Exists).unwrap();
        assert_eq!(spans[0], Some((0, 1)));
    }

    #[test]
    fn groups() {
        let spans = run("(a|b)*c", "abac", Mode::Captures).unwrap();
        assert_eq!(spans, vec![Some((0, 4)), Some((2, 3))]);
        let spans = run("(x)?y", "y", Mode::Captures).unwrap();
        assert_eq!(spans, vec![Some((0, 1)), None]);
    }

    #[test]
    fn counters_and_backrefs() {
        assert_eq!(group0("a{2,3}", "aaaa"), Some((0, 3)));
        assert_eq!(group0("a{2}", "a"), None);
        assert_eq!(group0(r"(a)\1", "xaa"), Some((1, 3)));
        assert_eq!(group0(r"(a)\1", "ab"), None);
    }

    #[test]
    fn anchors() {
        assert_eq!(group0("^b", "ab"), None);
        assert_eq!(group0("a$", "ab\na"), Some((3, 4)));
        assert_eq!(group0(r"\bfoo\b", "a foo b"), Some((2, 5)));
        assert_eq!(group0(r"\Boo", "foo"), Some((1, 3)));
    }

    #[test]
    fn frames_release_their_locks() {
        let program = program("(a|ab)(c|bcd)");
        let mut cache = Cache::new(CacheConfig {
            cache_bound: 2,
            chunk: 1,
            max_superstates: 64,
        });
        let input = Input::from("abcd");
        let found = search(&program, &mut cache, &input, Mode::Captures, 100).unwrap();
        assert_eq!(found.map(|s| s[0]), Some(Span::from(0..4)));
        assert_eq!(cache.locked_count(), 0);

        // the first win unwinds every pending frame
        let found = search(&program, &mut cache, &input, Mode::Exists, 100).unwrap();
        assert!(found.is_some());
        assert_eq!(cache.locked_count(), 0);
    }

    #[test]
    fn failed_search_releases_its_locks() {
        let program = program("(a|ab)(c|bcd)(a*)(a*)");
        let mut cache = Cache::default();
        let input = Input::from("abcdaaaa");
        let err = search(&program, &mut cache, &input, Mode::Captures, 2).unwrap_err();
        assert_eq!(err, Error::ResourceExhausted(Resource::BacktrackDepth));
        assert_eq!(cache.locked_count(), 0);

        // the cache is still usable afterwards
        let found = search(&program, &mut cache, &input, Mode::Longest, 100).unwrap();
        assert_eq!(found.map(|s| s[0]), Some(Span::from(0..8)));
        assert_eq!(cache.locked_count(), 0);
    }

    #[test]
    fn backtrack_limit() {
        let program = program("(a*)(a*)");
        let mut cache = Cache::default();
        let input = Input::from("aaaa");
        let err = search(&program, &mut cache, &input, Mode::Captures, 0).unwrap_err();
        assert_eq!(err, Error::ResourceExhausted(Resource::BacktrackDepth));
    }
}
