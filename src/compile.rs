//! Pattern compiler.
//!
//! [`Program::compile`] parses a pattern under a set of [`Syntax`] bits into
//! an expression tree `R`, derives a second tree `R'` with the capture
//! markers that no backreference needs removed, and freezes
//!
//! ```text
//! \0 R win | \1 R' win
//! ```
//!
//! into one automaton. The matcher selects a tree by feeding the prefix byte
//! before the subject: [`CAPTURE_PREFIX`] when groups are wanted,
//! [`SEARCH_PREFIX`] otherwise.

use log::*;

use crate::bitset::{Bitset, CHAR_SET_SIZE};
use crate::error::{Error, SyntaxErrorKind};
use crate::nfa::{Nfa, NfaBuilder};
use crate::regex::Config;
use crate::rexp::{
    Anchoring, ParamKind, Rexp, SeParams, SideEffect, SimpleEffect, alternate, compute_fastset,
    concat, cset, find_backrefs, has_any_se, has_non_idempotent_epsilon_path, is_anchored, opt,
    pointless_if_repeated, registers_on_stack, remove_unnecessary_side_effects, side_effect,
    simple, speed_up_alt, star, two_phase_star,
};
use crate::syntax::Syntax;

/// Largest bound accepted in an interval.
pub const RE_DUP_MAX: i32 = 0x7fff;

/// Prefix byte selecting the tree that records every group.
pub const CAPTURE_PREFIX: u8 = 0;
/// Prefix byte selecting the pruned tree.
pub const SEARCH_PREFIX: u8 = 1;
/// Byte fed to the automaton to resume after a pushback.
pub const PUSHBACK_BYTE: u8 = b't';

const CHAR_CLASS_MAX_LENGTH: usize = 6;

/// Byte translation applied to the pattern and to backreference comparisons.
pub type Translate = [u8; CHAR_SET_SIZE];

pub fn identity_translate() -> Translate {
    let mut table = [0u8; CHAR_SET_SIZE];
    for (i, slot) in table.iter_mut().enumerate() {
        *slot = i as u8;
    }
    table
}

/// A compiled pattern and everything the matcher needs to know about it.
#[derive(Debug)]
pub struct Program {
    pub nfa: Nfa,
    pub params: SeParams,
    pub translate: Translate,
    /// `^` and `$` also match after and before a newline.
    pub newline_anchor: bool,
    /// Number of groups, not counting group 0.
    pub re_nsub: usize,
    /// Bytes that can begin a match.
    pub fastset: Bitset,
    pub can_match_empty: bool,
    /// Every match begins with `^`.
    pub is_anchored: bool,
    /// Every match begins with `` \` ``.
    pub begbuf_only: bool,
    pub match_regs_on_stack: bool,
    pub search_regs_on_stack: bool,
}

impl Program {
    pub fn compile(pattern: &[u8], config: &Config) -> Result<Program, Error> {
        let mut syntax = config.syntax;
        if config.newline {
            syntax.remove(Syntax::DOT_NEWLINE);
            syntax.insert(Syntax::HAT_LISTS_NOT_NEWLINE);
        }
        let mut translate = config.translate.unwrap_or_else(identity_translate);
        if config.case_insensitive {
            for slot in translate.iter_mut() {
                *slot = slot.to_ascii_lowercase();
            }
        }

        let parser = Parser::new(pattern, syntax, &translate);
        let Parsed {
            tree: mut full,
            params,
            re_nsub,
        } = parser.parse()?;

        let mut needed = vec![false; re_nsub + 1];
        find_backrefs(&full, &params, &mut needed);
        let mut pruned = remove_unnecessary_side_effects(full.clone(), &needed, &params);
        speed_up_alt(&mut full, false);
        speed_up_alt(&mut pruned, true);

        let mut fastset = Bitset::new(CHAR_SET_SIZE);
        let can_match_empty = compute_fastset(&full, &mut fastset);
        if can_match_empty {
            fastset.fill();
        }
        let match_regs_on_stack = registers_on_stack(&full, false, &params);
        let search_regs_on_stack = registers_on_stack(&pruned, false, &params);
        let hat = SideEffect::Simple(SimpleEffect::Hat);
        let begbuf = SideEffect::Simple(SimpleEffect::BegBuf);
        let anchored = is_anchored(&full, hat) == Anchoring::Yes;
        let begbuf_only = is_anchored(&full, begbuf) == Anchoring::Yes;

        let tree = alternate(
            concat(cset(Bitset::from_bytes(&[CAPTURE_PREFIX])), full),
            concat(cset(Bitset::from_bytes(&[SEARCH_PREFIX])), pruned),
        );
        let nfa = NfaBuilder::from_rexp(&tree, CHAR_SET_SIZE, config.nfa_state_limit)?
            .freeze(config.closure_limit)?;
        debug!(
            "compiled {:?}: {} groups, {} side effect params, {} nfa states",
            bstr::BStr::new(pattern),
            re_nsub,
            params.len(),
            nfa.len()
        );

        Ok(Program {
            nfa,
            params,
            translate,
            newline_anchor: config.newline,
            re_nsub,
            fastset,
            can_match_empty,
            is_anchored: anchored,
            begbuf_only,
            match_regs_on_stack,
            search_regs_on_stack,
        })
    }
}

struct Parsed {
    tree: Rexp,
    params: SeParams,
    re_nsub: usize,
}

static EMPTY: Rexp = None;

/// One nesting level: the whole pattern or an open group.
#[derive(Debug, Default)]
struct Level {
    /// Everything left of the last `|`, with the sync marker that opens the
    /// current branch.
    alternation: Option<(Rexp, SideEffect)>,
    /// Items of the current branch. Only the last one may be empty.
    items: Vec<Rexp>,
    regnum: u32,
    offset: usize,
}

impl Level {
    fn last(&self) -> &Rexp {
        self.items.last().unwrap_or(&EMPTY)
    }

    fn last_mut(&mut self) -> &mut Rexp {
        if self.items.is_empty() {
            self.items.push(None);
        }
        let last = self.items.len() - 1;
        &mut self.items[last]
    }

    fn append(&mut self, node: Rexp) {
        match self.items.last_mut() {
            Some(slot @ None) => *slot = node,
            _ => self.items.push(node),
        }
    }

    fn finish_branch(&mut self) -> Rexp {
        let branch = self
            .items
            .drain(..)
            .rev()
            .fold(None, |acc, item| match (item, acc) {
                (item, None) => item,
                (None, acc) => acc,
                (item, acc) => concat(item, acc),
            });
        match self.alternation.take() {
            Some((left, tv)) => alternate(left, concat(side_effect(tv), branch)),
            None => branch,
        }
    }
}

struct Parser<'p> {
    pattern: &'p [u8],
    pos: usize,
    syntax: Syntax,
    translate: &'p Translate,
    params: SeParams,
    regnum: u32,
    open: Vec<Level>,
    level: Level,
}

impl<'p> Parser<'p> {
    fn new(pattern: &'p [u8], syntax: Syntax, translate: &'p Translate) -> Self {
        Self {
            pattern,
            pos: 0,
            syntax,
            translate,
            params: SeParams::new(),
            regnum: 0,
            open: Vec::new(),
            level: Level::default(),
        }
    }

    fn has(&self, flag: Syntax) -> bool {
        self.syntax.contains(flag)
    }

    fn error(&self, kind: SyntaxErrorKind) -> Error {
        Error::syntax(kind, self.pos)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.pattern.len()
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.pattern.get(self.pos + ahead).copied()
    }

    fn fetch_raw(&mut self) -> Result<u8, Error> {
        let c = self
            .pattern
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.error(SyntaxErrorKind::PrematureEnd))?;
        self.pos += 1;
        Ok(c)
    }

    fn fetch(&mut self) -> Result<u8, Error> {
        let c = self.fetch_raw()?;
        Ok(self.translate[c as usize])
    }

    /// Every byte that translates the same way as `c`.
    fn inverse(&self, c: u8) -> Bitset {
        let target = self.translate[c as usize];
        let mut set = Bitset::new(CHAR_SET_SIZE);
        for x in 0..CHAR_SET_SIZE {
            if self.translate[x] == target {
                set.insert(x);
            }
        }
        set
    }

    fn literal(&mut self, c: u8) {
        let set = self.inverse(c);
        self.level.append(cset(set));
    }

    fn complex(&mut self, kind: ParamKind, op1: i32, op2: i32) -> SideEffect {
        self.params.push(kind, op1, op2)
    }

    fn parse(mut self) -> Result<Parsed, Error> {
        while !self.at_end() {
            let c = self.fetch()?;
            match c {
                b'^' => {
                    if self.pos == 1 || self.has(Syntax::CONTEXT_INDEP_ANCHORS) || self.at_begline()
                    {
                        self.level.append(simple(SimpleEffect::Hat));
                    } else {
                        self.literal(c);
                    }
                }
                b'$' => {
                    if self.at_end() || self.has(Syntax::CONTEXT_INDEP_ANCHORS) || self.at_endline()
                    {
                        self.level.append(simple(SimpleEffect::Dollar));
                    } else {
                        self.literal(c);
                    }
                }
                b'+' | b'?' if self.has(Syntax::BK_PLUS_QM) || self.has(Syntax::LIMITED_OPS) => {
                    self.literal(c)
                }
                b'*' | b'+' | b'?' => self.repeat(c)?,
                b'.' => {
                    let mut set = Bitset::universe(CHAR_SET_SIZE);
                    if !self.has(Syntax::DOT_NEWLINE) {
                        set.remove(b'\n' as usize);
                    }
                    if self.has(Syntax::DOT_NOT_NULL) {
                        set.remove(0);
                    }
                    self.level.append(cset(set));
                }
                b'[' => self.bracket()?,
                b'(' if self.has(Syntax::NO_BK_PARENS) => self.open_group(),
                b')' if self.has(Syntax::NO_BK_PARENS) => self.close_group(c)?,
                b'\n' if self.has(Syntax::NEWLINE_ALT) => self.alternative(c),
                b'|' if self.has(Syntax::NO_BK_VBAR) => self.alternative(c),
                b'{' if self.has(Syntax::INTERVALS) && self.has(Syntax::NO_BK_BRACES) => {
                    self.interval()?
                }
                b'\\' => self.backslash()?,
                _ => self.literal(c),
            }
        }

        let win = self.complex(ParamKind::Win, 0, 0);
        if let Some(group) = self.open.first() {
            return Err(Error::syntax(SyntaxErrorKind::UnmatchedOpenGroup, group.offset));
        }
        let tree = concat(self.level.finish_branch(), side_effect(win));
        Ok(Parsed {
            tree,
            params: self.params,
            re_nsub: self.regnum as usize,
        })
    }

    /// The `^` just fetched follows an open group or an alternation operator.
    fn at_begline(&self) -> bool {
        if self.pos < 2 {
            return false;
        }
        let prev = self.pattern[self.pos - 2];
        let prev_backslash = self.pos >= 3 && self.pattern[self.pos - 3] == b'\\';
        (prev == b'(' && (self.has(Syntax::NO_BK_PARENS) || prev_backslash))
            || (prev == b'|' && (self.has(Syntax::NO_BK_VBAR) || prev_backslash))
    }

    /// The `$` just fetched precedes a close group or an alternation operator.
    fn at_endline(&self) -> bool {
        let next = self.peek(0);
        let escaped = next == Some(b'\\');
        let next_next = self.peek(1);
        let closes = if self.has(Syntax::NO_BK_PARENS) {
            next == Some(b')')
        } else {
            escaped && next_next == Some(b')')
        };
        let alternates = if self.has(Syntax::NO_BK_VBAR) {
            next == Some(b'|')
        } else {
            escaped && next_next == Some(b'|')
        };
        closes || alternates
    }

    fn backslash(&mut self) -> Result<(), Error> {
        if self.at_end() {
            return Err(self.error(SyntaxErrorKind::TrailingEscape));
        }
        // Not translated, so `\B` stays distinct from `\b`.
        let c = self.fetch_raw()?;
        match c {
            b'(' if !self.has(Syntax::NO_BK_PARENS) => self.open_group(),
            b')' if !self.has(Syntax::NO_BK_PARENS) => self.close_group(c)?,
            b'|' if !self.has(Syntax::LIMITED_OPS) && !self.has(Syntax::NO_BK_VBAR) => {
                self.alternative(c)
            }
            b'{' if self.has(Syntax::INTERVALS)
                && !self.has(Syntax::NO_BK_BRACES)
                && !(self.pos == 2 && self.at_end()) =>
            {
                self.interval()?
            }
            b'w' | b'W' => {
                let mut set = Bitset::new(CHAR_SET_SIZE);
                for x in 0..CHAR_SET_SIZE {
                    if is_word_byte(x as u8) {
                        set.insert(x);
                    }
                }
                if c == b'W' {
                    set.complement();
                }
                self.level.append(cset(set));
            }
            b'<' => self.level.append(simple(SimpleEffect::WordBeg)),
            b'>' => self.level.append(simple(SimpleEffect::WordEnd)),
            b'b' => self.level.append(simple(SimpleEffect::WordBound)),
            b'B' => self.level.append(simple(SimpleEffect::NotWordBound)),
            b'`' => self.level.append(simple(SimpleEffect::BegBuf)),
            b'\'' => self.level.append(simple(SimpleEffect::EndBuf)),
            b'1'..=b'9' if !self.has(Syntax::NO_BK_REFS) => {
                let group = (c - b'0') as u32;
                let inside = self.level.regnum == group || self.open.iter().any(|l| l.regnum == group);
                if group > self.regnum || inside {
                    return Err(self.error(SyntaxErrorKind::BadBackref));
                }
                let backref = self.complex(ParamKind::Backref, group as i32, 0);
                self.level.append(side_effect(backref));
            }
            b'+' | b'?' if self.has(Syntax::BK_PLUS_QM) => self.repeat(c)?,
            _ => self.literal(c),
        }
        Ok(())
    }

    /// Applies `*`, `+` or `?` (and any operators directly following it) to
    /// the last item.
    fn repeat(&mut self, first: u8) -> Result<(), Error> {
        if pointless_if_repeated(self.level.last(), &self.params) {
            if self.has(Syntax::CONTEXT_INVALID_OPS) {
                return Err(Error::syntax(SyntaxErrorKind::BadRepetition, self.pos - 1));
            } else if !self.has(Syntax::CONTEXT_INDEP_OPS) {
                self.literal(first);
                return Ok(());
            }
        }

        let mut zero_ok = false;
        let mut many_ok = false;
        let mut c = first;
        loop {
            zero_ok |= c != b'+';
            many_ok |= c != b'?';
            let Some(next) = self.peek(0) else {
                break;
            };
            let next = self.translate[next as usize];
            if next == b'*' || (!self.has(Syntax::BK_PLUS_QM) && (next == b'+' || next == b'?')) {
                self.pos += 1;
                c = next;
            } else if self.has(Syntax::BK_PLUS_QM) && next == b'\\' {
                match self.peek(1) {
                    None => {
                        self.pos += 1;
                        return Err(self.error(SyntaxErrorKind::TrailingEscape));
                    }
                    Some(op @ (b'+' | b'?')) => {
                        self.pos += 2;
                        c = op;
                    }
                    Some(_) => break,
                }
            } else {
                break;
            }
        }

        let slot = self.level.last_mut();
        if slot.is_none() {
            return Ok(());
        }
        let inner = slot.take();
        let mut need_sync = false;
        let repeated = if many_ok && has_non_idempotent_epsilon_path(&inner, &self.params) {
            let guard = concat(
                simple(SimpleEffect::ChkPos),
                concat(
                    simple(SimpleEffect::Pushback),
                    cset(Bitset::from_bytes(&[PUSHBACK_BYTE])),
                ),
            );
            concat(
                concat(
                    simple(SimpleEffect::PushPos),
                    two_phase_star(inner.clone(), guard),
                ),
                simple(SimpleEffect::PopPos),
            )
        } else {
            let looped = if many_ok {
                star(inner.clone())
            } else {
                opt(inner.clone())
            };
            need_sync = has_any_se(&looped);
            looped
        };
        let repeated = if zero_ok {
            repeated
        } else {
            concat(inner, repeated)
        };
        *self.level.last_mut() = repeated;

        if need_sync {
            let tv = self.complex(ParamKind::Tv, 0, 0);
            self.level.append(side_effect(tv));
        }
        Ok(())
    }

    /// Parses the bounds of an interval whose opening brace was just
    /// consumed. A malformed interval under `NO_BK_BRACES` is re-read as a
    /// literal `{`.
    fn interval(&mut self) -> Result<(), Error> {
        let brace = self.pos - 1;
        match self.interval_bounds()? {
            Some((lower, upper)) => {
                if pointless_if_repeated(self.level.last(), &self.params) {
                    if self.has(Syntax::CONTEXT_INVALID_OPS) {
                        return Err(Error::syntax(SyntaxErrorKind::BadRepetition, brace));
                    } else if !self.has(Syntax::CONTEXT_INDEP_OPS) {
                        return self.unfetch_interval(brace);
                    }
                }
                if upper == 0 {
                    *self.level.last_mut() = None;
                    return Ok(());
                }
                let iter = self.complex(ParamKind::Iter, lower, upper);
                let end = self.complex(ParamKind::EndIter, lower, upper);
                let slot = self.level.last_mut();
                let body = slot.take();
                let looped = two_phase_star(
                    concat(side_effect(iter), body),
                    concat(
                        simple(SimpleEffect::Pushback),
                        cset(Bitset::from_bytes(&[PUSHBACK_BYTE])),
                    ),
                );
                *slot = concat(concat(simple(SimpleEffect::Push0), looped), side_effect(end));
                Ok(())
            }
            None => self.unfetch_interval(brace),
        }
    }

    fn unfetch_interval(&mut self, brace: usize) -> Result<(), Error> {
        self.pos = brace + 1;
        self.literal(b'{');
        Ok(())
    }

    /// Returns `None` when the interval is malformed and braces are plain
    /// characters.
    fn interval_bounds(&mut self) -> Result<Option<(i32, i32)>, Error> {
        let lenient = self.has(Syntax::NO_BK_BRACES);
        if self.at_end() {
            return if lenient {
                Ok(None)
            } else {
                Err(self.error(SyntaxErrorKind::UnmatchedBrace))
            };
        }

        let (lower, mut c) = self.unsigned_number()?;
        let upper = if c == Some(b',') {
            let (upper, next) = self.unsigned_number()?;
            if next.is_some() {
                c = next;
            }
            if upper < 0 { RE_DUP_MAX } else { upper }
        } else {
            lower
        };

        if lower < 0 || upper > RE_DUP_MAX || lower > upper {
            return if lenient {
                Ok(None)
            } else {
                Err(self.error(SyntaxErrorKind::BadInterval))
            };
        }

        if !lenient {
            if c != Some(b'\\') {
                return Err(self.error(SyntaxErrorKind::UnmatchedBrace));
            }
            c = Some(self.fetch()?);
        }

        if c != Some(b'}') {
            return if lenient {
                Ok(None)
            } else {
                Err(self.error(SyntaxErrorKind::BadInterval))
            };
        }
        Ok(Some((lower, upper)))
    }

    /// Reads decimal digits. Returns the value (or -1 when there were none)
    /// and the last byte fetched, which is the first non-digit unless the
    /// pattern ran out.
    fn unsigned_number(&mut self) -> Result<(i32, Option<u8>), Error> {
        if self.at_end() {
            return Ok((-1, None));
        }
        let mut num: i32 = -1;
        let mut c = self.fetch()?;
        while c.is_ascii_digit() {
            num = num.max(0).saturating_mul(10).saturating_add((c - b'0') as i32);
            if self.at_end() {
                break;
            }
            c = self.fetch()?;
        }
        Ok((num, Some(c)))
    }

    fn open_group(&mut self) {
        self.regnum += 1;
        let level = Level {
            regnum: self.regnum,
            offset: self.pos - 1,
            ..Level::default()
        };
        let outer = std::mem::replace(&mut self.level, level);
        self.open.push(outer);
    }

    fn close_group(&mut self, c: u8) -> Result<(), Error> {
        let Some(outer) = self.open.pop() else {
            if self.has(Syntax::UNMATCHED_RIGHT_PAREN_ORD) {
                self.literal(c);
                return Ok(());
            }
            return Err(Error::syntax(SyntaxErrorKind::UnmatchedCloseGroup, self.pos - 1));
        };
        let mut inner = std::mem::replace(&mut self.level, outer);
        let body = inner.finish_branch();
        let group = inner.regnum as i32;
        let lparen = self.complex(ParamKind::LParen, group, 0);
        let rparen = self.complex(ParamKind::RParen, group, 0);
        let opened = match body {
            Some(_) => concat(side_effect(lparen), body),
            None => side_effect(lparen),
        };
        self.level.append(concat(opened, side_effect(rparen)));
        Ok(())
    }

    fn alternative(&mut self, c: u8) {
        if self.has(Syntax::LIMITED_OPS) {
            self.literal(c);
            return;
        }
        let left = self.level.finish_branch();
        let tv = self.complex(ParamKind::Tv, 0, 0);
        self.level.alternation = Some((left, tv));
    }

    fn bracket(&mut self) -> Result<(), Error> {
        if self.at_end() {
            return Err(self.error(SyntaxErrorKind::UnmatchedBracket));
        }
        let mut set = Bitset::new(CHAR_SET_SIZE);
        let inverted = self.peek(0) == Some(b'^');
        if inverted {
            self.pos += 1;
        }
        let first = self.pos;
        let mut had_char_class = false;

        loop {
            if self.at_end() {
                return Err(self.error(SyntaxErrorKind::UnmatchedBracket));
            }
            let c = self.fetch()?;

            if self.has(Syntax::BACKSLASH_ESCAPE_IN_LISTS) && c == b'\\' {
                if self.at_end() {
                    return Err(self.error(SyntaxErrorKind::TrailingEscape));
                }
                let escaped = self.fetch()?;
                set.union(&self.inverse(escaped));
                continue;
            }

            if c == b']' && self.pos != first + 1 {
                break;
            }

            let before_close = self.peek(0) == Some(b']');
            if had_char_class && c == b'-' && !before_close {
                return Err(self.error(SyntaxErrorKind::BadRange));
            }

            let p = self.pos;
            let opens_list = p >= 2 && self.pattern[p - 2] == b'[';
            let opens_inverted = p >= 3 && self.pattern[p - 3] == b'[' && self.pattern[p - 2] == b'^';
            if c == b'-' && !opens_list && !opens_inverted && !before_close {
                let start = self.translate[self.pattern[p - 2] as usize];
                self.range(&mut set, start)?;
            } else if self.peek(0) == Some(b'-') && self.peek(1) != Some(b']') {
                self.pos += 1;
                self.range(&mut set, c)?;
            } else if self.has(Syntax::CHAR_CLASSES) && c == b'[' && self.peek(0) == Some(b':') {
                had_char_class = self.char_class(&mut set)?;
            } else {
                had_char_class = false;
                set.union(&self.inverse(c));
            }
        }

        if inverted {
            set.complement();
            if self.has(Syntax::HAT_LISTS_NOT_NEWLINE) {
                set.remove(b'\n' as usize);
            }
        }
        self.level.append(cset(set));
        Ok(())
    }

    fn range(&mut self, set: &mut Bitset, start: u8) -> Result<(), Error> {
        if self.at_end() {
            return Err(self.error(SyntaxErrorKind::BadRange));
        }
        let end = self.fetch()?;
        if start > end {
            if self.has(Syntax::NO_EMPTY_RANGES) {
                return Err(self.error(SyntaxErrorKind::BadRange));
            }
            return Ok(());
        }
        for c in start..=end {
            set.union(&self.inverse(c));
        }
        Ok(())
    }

    /// Parses `[:name:]` after its `[`. Returns whether a class was read;
    /// otherwise `[` and `:` were taken literally.
    fn char_class(&mut self, set: &mut Bitset) -> Result<bool, Error> {
        self.pos += 1;
        if self.at_end() {
            return Err(self.error(SyntaxErrorKind::UnmatchedBracket));
        }
        let name_start = self.pos;
        let mut name = Vec::new();
        let mut c;
        loop {
            c = self.fetch()?;
            if c == b':' || c == b']' || self.at_end() || name.len() == CHAR_CLASS_MAX_LENGTH {
                break;
            }
            name.push(c);
        }

        if c == b':' && self.peek(0) == Some(b']') {
            let class = CharClass::from_name(&name)
                .ok_or_else(|| Error::syntax(SyntaxErrorKind::CharClass, name_start))?;
            self.pos += 1;
            if self.at_end() {
                return Err(self.error(SyntaxErrorKind::UnmatchedBracket));
            }
            for x in 0..CHAR_SET_SIZE {
                if class.contains(x as u8) {
                    set.union(&self.inverse(x as u8));
                }
            }
            Ok(true)
        } else {
            self.pos = name_start;
            set.union(&self.inverse(b'['));
            set.union(&self.inverse(b':'));
            Ok(false)
        }
    }
}

/// Letters, digits and `_`.
pub fn is_word_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Alnum,
    Alpha,
    Blank,
    Cntrl,
    Digit,
    Graph,
    Lower,
    Print,
    Punct,
    Space,
    Upper,
    Xdigit,
}

impl CharClass {
    fn from_name(name: &[u8]) -> Option<CharClass> {
        let class = match name {
            b"alnum" => CharClass::Alnum,
            b"alpha" => CharClass::Alpha,
            b"blank" => CharClass::Blank,
            b"cntrl" => CharClass::Cntrl,
            b"digit" => CharClass::Digit,
            b"graph" => CharClass::Graph,
            b"lower" => CharClass::Lower,
            b"print" => CharClass::Print,
            b"punct" => CharClass::Punct,
            b"space" => CharClass::Space,
            b"upper" => CharClass::Upper,
            b"xdigit" => CharClass::Xdigit,
            _ => return None,
        };
        Some(class)
    }

    fn contains(self, c: u8) -> bool {
        match self {
            CharClass::Alnum => c.is_ascii_alphanumeric(),
            CharClass::Alpha => c.is_ascii_alphabetic(),
            CharClass::Blank => c == b' ' || c == b'\t',
            CharClass::Cntrl => c.is_ascii_control(),
            CharClass::Digit => c.is_ascii_digit(),
            CharClass::Graph => c.is_ascii_graphic(),
            CharClass::Lower => c.is_ascii_lowercase(),
            CharClass::Print => c.is_ascii_graphic() || c == b' ',
            CharClass::Punct => c.is_ascii_punctuation(),
            // `is_ascii_whitespace` leaves out vertical tab
            CharClass::Space => c.is_ascii_whitespace() || c == 0x0b,
            CharClass::Upper => c.is_ascii_uppercase(),
            CharClass::Xdigit => c.is_ascii_hexdigit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rexp::Expr;

    fn parse_with(pattern: &str, syntax: Syntax) -> Result<Parsed, Error> {
        let translate = identity_translate();
        Parser::new(pattern.as_bytes(), syntax, &translate).parse()
    }

    fn parse(pattern: &str) -> Parsed {
        parse_with(pattern, Syntax::POSIX_EXTENDED).unwrap()
    }

    fn kind(pattern: &str, syntax: Syntax) -> SyntaxErrorKind {
        parse_with(pattern, syntax)
            .err()
            .and_then(|e| e.syntax_kind())
            .unwrap()
    }

    fn lit(c: u8) -> Rexp {
        cset(Bitset::from_bytes(&[c]))
    }

    /// Strips the trailing win marker.
    fn body(parsed: &Parsed) -> &Rexp {
        match parsed.tree.as_deref() {
            Some(Expr::Concat(body, _)) => body,
            _ => panic!("missing win marker"),
        }
    }

    #[test]
    fn literals_fold_to_the_right() {
        let parsed = parse("abc");
        assert_eq!(body(&parsed), &concat(lit(b'a'), concat(lit(b'b'), lit(b'c'))));
        assert_eq!(parsed.re_nsub, 0);
        assert_eq!(parsed.params.len(), 1);
    }

    #[test]
    fn groups_and_alternation() {
        let parsed = parse("(a)|b");
        assert_eq!(parsed.re_nsub, 1);
        let Some(Expr::Alternate(left, right)) = body(&parsed).as_deref() else {
            panic!("expected an alternation");
        };
        assert!(matches!(left.as_deref(), Some(Expr::Concat(..))));
        let Some(Expr::Concat(tv, branch)) = right.as_deref() else {
            panic!("expected a sync marker");
        };
        assert!(matches!(tv.as_deref(), Some(Expr::SideEffect(SideEffect::Complex(_)))));
        assert_eq!(branch, &lit(b'b'));
    }

    #[test]
    fn plus_keeps_a_mandatory_copy() {
        let parsed = parse("a+");
        assert_eq!(body(&parsed), &concat(lit(b'a'), star(lit(b'a'))));
        // `a+?` collapses to `a*`
        let parsed = parse("a+?");
        assert_eq!(body(&parsed), &star(lit(b'a')));
    }

    #[test]
    fn basic_syntax_operators() {
        let parsed = parse_with(r"\(a\)\{2\}", Syntax::POSIX_BASIC).unwrap();
        assert_eq!(parsed.re_nsub, 1);
        let parsed = parse_with("a+", Syntax::POSIX_BASIC).unwrap();
        assert_eq!(body(&parsed), &concat(lit(b'a'), lit(b'+')));
        // a leading star is an ordinary character
        let parsed = parse_with("*a", Syntax::POSIX_BASIC).unwrap();
        assert_eq!(body(&parsed), &concat(lit(b'*'), lit(b'a')));
    }

    #[test]
    fn anchors_depend_on_context_in_basic_syntax() {
        let parsed = parse_with("a^b$c", Syntax::POSIX_BASIC).unwrap();
        assert_eq!(
            body(&parsed),
            &concat(lit(b'a'), concat(lit(b'^'), concat(lit(b'b'), concat(lit(b'$'), lit(b'c')))))
        );
        let parsed = parse_with("^a$", Syntax::POSIX_BASIC).unwrap();
        assert_eq!(
            body(&parsed),
            &concat(
                simple(SimpleEffect::Hat),
                concat(lit(b'a'), simple(SimpleEffect::Dollar))
            )
        );
    }

    #[test]
    fn zero_interval_deletes() {
        let parsed = parse("ab{0}c");
        assert_eq!(body(&parsed), &concat(lit(b'a'), lit(b'c')));
    }

    #[test]
    fn bad_interval_is_literal_in_extended() {
        let parsed = parse("a{x");
        assert_eq!(body(&parsed), &concat(lit(b'a'), concat(lit(b'{'), lit(b'x'))));
        assert_eq!(kind(r"a\{x", Syntax::POSIX_BASIC), SyntaxErrorKind::BadInterval);
        assert_eq!(kind(r"a\{2", Syntax::POSIX_BASIC), SyntaxErrorKind::UnmatchedBrace);
    }

    #[test]
    fn brackets() {
        let parsed = parse("[a-c]");
        assert_eq!(body(&parsed), &cset(Bitset::from_bytes(b"abc")));
        let parsed = parse("[]a]");
        assert_eq!(body(&parsed), &cset(Bitset::from_bytes(b"]a")));
        let parsed = parse("[a-]");
        assert_eq!(body(&parsed), &cset(Bitset::from_bytes(b"a-")));
        let parsed = parse("[[:digit:]x]");
        assert_eq!(body(&parsed), &cset(Bitset::from_bytes(b"0123456789x")));
        let parsed = parse("[^a]");
        let Some(Expr::CharSet(set)) = body(&parsed).as_deref() else {
            panic!("expected a set");
        };
        assert!(!set.contains(b'a' as usize));
        assert!(set.contains(b'\n' as usize));
        assert_eq!(set.len(), 255);
    }

    #[test]
    fn errors() {
        let ere = Syntax::POSIX_EXTENDED;
        assert_eq!(kind("(a", ere), SyntaxErrorKind::UnmatchedOpenGroup);
        assert_eq!(kind("[a", ere), SyntaxErrorKind::UnmatchedBracket);
        assert_eq!(kind("[[:foo:]]", ere), SyntaxErrorKind::CharClass);
        assert_eq!(kind("[z-a]", ere), SyntaxErrorKind::BadRange);
        assert_eq!(kind("a\\", ere), SyntaxErrorKind::TrailingEscape);
        assert_eq!(kind(r"\(a\)\2", Syntax::POSIX_BASIC), SyntaxErrorKind::BadBackref);
        assert_eq!(kind(r"\(a\1\)", Syntax::POSIX_BASIC), SyntaxErrorKind::BadBackref);
        assert_eq!(kind(r"a\)", Syntax::POSIX_BASIC), SyntaxErrorKind::UnmatchedCloseGroup);
        assert_eq!(kind("*a", Syntax::POSIX_MINIMAL_EXTENDED), SyntaxErrorKind::BadRepetition);
    }

    #[test]
    fn unmatched_close_is_literal_in_extended() {
        let parsed = parse("a)");
        assert_eq!(body(&parsed), &concat(lit(b'a'), lit(b')')));
    }

    #[test]
    fn program_summary() {
        let config = Config::default();
        let program = Program::compile(b"^ab", &config).unwrap();
        assert!(program.is_anchored);
        assert!(!program.begbuf_only);
        assert!(!program.can_match_empty);
        assert_eq!(program.fastset, Bitset::from_bytes(b"a"));

        let program = Program::compile(b"x*", &config).unwrap();
        assert!(program.can_match_empty);
        assert_eq!(program.fastset.len(), CHAR_SET_SIZE);

        let program = Program::compile(b"(a)*", &config).unwrap();
        assert!(program.match_regs_on_stack);
        assert!(!program.search_regs_on_stack);
    }

    #[test]
    fn case_insensitive_literals() {
        let config = Config {
            case_insensitive: true,
            ..Config::default()
        };
        let program = Program::compile(b"[B-C]", &config).unwrap();
        assert_eq!(program.fastset, Bitset::from_bytes(b"bcBC"));
    }
}
