//! Expression trees and the side effects they carry.
//!
//! A parsed pattern is a tree of [`Expr`] nodes. Children are optional: an
//! absent child stands for the empty expression, which is how the compiler
//! represents things like `()` or a deleted `x{0}`.

use crate::bitset::Bitset;

/// Side effects with no parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimpleEffect {
    Pushback,
    Push0,
    PushPos,
    ChkPos,
    PopPos,
    BegBuf,
    Hat,
    WordBeg,
    WordBound,
    NotWordBound,
    WordEnd,
    EndBuf,
    Dollar,
}

impl SimpleEffect {
    /// Crossing the effect twice in a row is the same as crossing it once.
    pub fn is_idempotent(self) -> bool {
        !matches!(
            self,
            SimpleEffect::Pushback
                | SimpleEffect::Push0
                | SimpleEffect::PushPos
                | SimpleEffect::ChkPos
                | SimpleEffect::PopPos
        )
    }

    fn code(self) -> i64 {
        -(self as i64 + 1)
    }
}

/// Side effects that carry operands, stored out of line in [`SeParams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// The pattern matched.
    Win,
    /// Start of group `op1`.
    LParen,
    /// End of group `op1`.
    RParen,
    /// Backreference to group `op1`.
    Backref,
    /// One more iteration of `{op1,op2}`.
    Iter,
    /// Leaving `{op1,op2}`.
    EndIter,
    /// Alternation sync point.
    Tv,
}

impl ParamKind {
    pub fn is_idempotent(self) -> bool {
        matches!(self, ParamKind::Win | ParamKind::LParen | ParamKind::RParen)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeParam {
    pub kind: ParamKind,
    pub op1: i32,
    pub op2: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SideEffect {
    Simple(SimpleEffect),
    /// Index into the pattern's [`SeParams`].
    Complex(u32),
}

impl SideEffect {
    /// Ordering key used to sort closure entries: simple effects are
    /// negative, complex ones are their parameter index.
    pub fn code(self) -> i64 {
        match self {
            SideEffect::Simple(s) => s.code(),
            SideEffect::Complex(i) => i as i64,
        }
    }

    pub fn is_complex(self) -> bool {
        matches!(self, SideEffect::Complex(_))
    }
}

/// Operands of every complex side effect of one pattern.
#[derive(Debug, Clone, Default)]
pub struct SeParams(Vec<SeParam>);

impl SeParams {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, kind: ParamKind, op1: i32, op2: i32) -> SideEffect {
        self.0.push(SeParam { kind, op1, op2 });
        SideEffect::Complex(self.0.len() as u32 - 1)
    }

    pub fn get(&self, index: u32) -> Option<&SeParam> {
        self.0.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn kind_of(&self, se: SideEffect) -> Option<SeParam> {
        match se {
            SideEffect::Complex(i) => self.get(i).copied(),
            SideEffect::Simple(_) => None,
        }
    }

    fn is_idempotent(&self, se: SideEffect) -> bool {
        match se {
            SideEffect::Simple(s) => s.is_idempotent(),
            SideEffect::Complex(i) => self.get(i).is_none_or(|p| p.kind.is_idempotent()),
        }
    }
}

/// A possibly empty expression.
pub type Rexp = Option<Box<Expr>>;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    CharSet(Bitset),
    Concat(Rexp, Rexp),
    Alternate(Rexp, Rexp),
    Opt(Rexp),
    Star(Rexp),
    /// First pass through the body, then repeats through the second tree.
    TwoPhaseStar(Rexp, Rexp),
    SideEffect(SideEffect),
    /// Compiler-internal payload; never reaches the NFA builder.
    Data(u32),
}

pub fn cset(set: Bitset) -> Rexp {
    Some(Box::new(Expr::CharSet(set)))
}

pub fn side_effect(se: SideEffect) -> Rexp {
    Some(Box::new(Expr::SideEffect(se)))
}

pub fn simple(se: SimpleEffect) -> Rexp {
    side_effect(SideEffect::Simple(se))
}

pub fn concat(left: Rexp, right: Rexp) -> Rexp {
    Some(Box::new(Expr::Concat(left, right)))
}

pub fn alternate(left: Rexp, right: Rexp) -> Rexp {
    Some(Box::new(Expr::Alternate(left, right)))
}

pub fn opt(inner: Rexp) -> Rexp {
    Some(Box::new(Expr::Opt(inner)))
}

pub fn star(inner: Rexp) -> Rexp {
    Some(Box::new(Expr::Star(inner)))
}

pub fn two_phase_star(body: Rexp, repeat: Rexp) -> Rexp {
    Some(Box::new(Expr::TwoPhaseStar(body, repeat)))
}

/// How a tree relates to a given anchoring side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchoring {
    /// Every match begins by crossing the effect.
    Yes,
    /// Only effects or the empty string were seen so far.
    Maybe,
    No,
}

pub fn is_anchored(rexp: &Rexp, se: SideEffect) -> Anchoring {
    let Some(node) = rexp.as_deref() else {
        return Anchoring::Maybe;
    };
    match node {
        Expr::CharSet(_) | Expr::Data(_) => Anchoring::No,
        Expr::Concat(l, r) | Expr::TwoPhaseStar(l, r) => match is_anchored(l, se) {
            Anchoring::Maybe => is_anchored(r, se),
            other => other,
        },
        Expr::Alternate(l, r) => {
            let l = is_anchored(l, se);
            let r = if l == Anchoring::No {
                Anchoring::No
            } else {
                is_anchored(r, se)
            };
            if l == r {
                l
            } else if l == Anchoring::No || r == Anchoring::No {
                Anchoring::No
            } else {
                Anchoring::Maybe
            }
        }
        Expr::Opt(l) | Expr::Star(l) => match is_anchored(l, se) {
            Anchoring::No => Anchoring::No,
            _ => Anchoring::Maybe,
        },
        Expr::SideEffect(s) if *s == se => Anchoring::Yes,
        Expr::SideEffect(_) => Anchoring::Maybe,
    }
}

/// Adds to `fastset` every byte that can begin a match. Returns true when
/// the tree can match without consuming anything.
pub fn compute_fastset(rexp: &Rexp, fastset: &mut Bitset) -> bool {
    let Some(node) = rexp.as_deref() else {
        return true;
    };
    match node {
        Expr::Data(_) | Expr::SideEffect(_) => true,
        Expr::CharSet(set) => {
            fastset.union(set);
            false
        }
        Expr::Concat(l, r) => compute_fastset(l, fastset) && compute_fastset(r, fastset),
        Expr::TwoPhaseStar(l, _) | Expr::Opt(l) | Expr::Star(l) => {
            compute_fastset(l, fastset);
            true
        }
        Expr::Alternate(l, r) => {
            let l = compute_fastset(l, fastset);
            let r = compute_fastset(r, fastset);
            l || r
        }
    }
}

pub fn has_any_se(rexp: &Rexp) -> bool {
    match rexp.as_deref() {
        None | Some(Expr::CharSet(_)) | Some(Expr::Data(_)) => false,
        Some(Expr::SideEffect(_)) => true,
        Some(Expr::Concat(l, r)) | Some(Expr::Alternate(l, r)) | Some(Expr::TwoPhaseStar(l, r)) => {
            has_any_se(l) || has_any_se(r)
        }
        Some(Expr::Opt(l)) | Some(Expr::Star(l)) => has_any_se(l),
    }
}

/// True when some path through the tree that consumes no input crosses a
/// side effect that is not idempotent. Repeating such an expression needs a
/// guard against empty iterations.
pub fn has_non_idempotent_epsilon_path(rexp: &Rexp, params: &SeParams) -> bool {
    match rexp.as_deref() {
        None | Some(Expr::CharSet(_)) | Some(Expr::Data(_)) | Some(Expr::Star(_)) => false,
        Some(Expr::SideEffect(se)) => !params.is_idempotent(*se),
        Some(Expr::Alternate(l, r)) => {
            has_non_idempotent_epsilon_path(l, params) || has_non_idempotent_epsilon_path(r, params)
        }
        Some(Expr::Concat(l, r)) | Some(Expr::TwoPhaseStar(l, r)) => {
            has_non_idempotent_epsilon_path(l, params) && has_non_idempotent_epsilon_path(r, params)
        }
        Some(Expr::Opt(l)) => has_non_idempotent_epsilon_path(l, params),
    }
}

/// True when a repetition operator applied to this tree adds nothing.
pub fn pointless_if_repeated(rexp: &Rexp, params: &SeParams) -> bool {
    match rexp.as_deref() {
        None => true,
        Some(Expr::CharSet(_)) | Some(Expr::Data(_)) => false,
        Some(Expr::Concat(l, r)) | Some(Expr::Alternate(l, r)) | Some(Expr::TwoPhaseStar(l, r)) => {
            pointless_if_repeated(l, params) && pointless_if_repeated(r, params)
        }
        Some(Expr::Opt(l)) | Some(Expr::Star(l)) => pointless_if_repeated(l, params),
        Some(Expr::SideEffect(SideEffect::Simple(s))) => !matches!(
            s,
            SimpleEffect::Pushback
                | SimpleEffect::Push0
                | SimpleEffect::PushPos
                | SimpleEffect::ChkPos
                | SimpleEffect::PopPos
        ),
        Some(Expr::SideEffect(se)) => {
            matches!(params.kind_of(*se), Some(SeParam { kind: ParamKind::Win, .. }))
        }
    }
}

fn begins_with_complex_se(rexp: &Rexp) -> bool {
    match rexp.as_deref() {
        Some(Expr::SideEffect(se)) => se.is_complex(),
        Some(Expr::Alternate(l, r)) => begins_with_complex_se(l) && begins_with_complex_se(r),
        Some(Expr::Concat(l, _)) => has_any_se(l),
        _ => false,
    }
}

/// Marks in `needed` every group number used by a backreference.
pub fn find_backrefs(rexp: &Rexp, params: &SeParams, needed: &mut [bool]) {
    match rexp.as_deref() {
        None | Some(Expr::CharSet(_)) | Some(Expr::Data(_)) => {}
        Some(Expr::Concat(l, r)) | Some(Expr::Alternate(l, r)) | Some(Expr::TwoPhaseStar(l, r)) => {
            find_backrefs(l, params, needed);
            find_backrefs(r, params, needed);
        }
        Some(Expr::Opt(l)) | Some(Expr::Star(l)) => find_backrefs(l, params, needed),
        Some(Expr::SideEffect(se)) => {
            if let Some(SeParam {
                kind: ParamKind::Backref,
                op1,
                ..
            }) = params.kind_of(*se)
            {
                if let Some(slot) = needed.get_mut(op1 as usize) {
                    *slot = true;
                }
            }
        }
    }
}

/// Drops group markers (other than group 0) that no backreference needs.
pub fn remove_unnecessary_side_effects(rexp: Rexp, needed: &[bool], params: &SeParams) -> Rexp {
    let node = *rexp?;
    let prune = |r: Rexp| remove_unnecessary_side_effects(r, needed, params);
    match node {
        Expr::CharSet(_) | Expr::Data(_) => Some(Box::new(node)),
        Expr::Concat(l, r) => match (prune(l), prune(r)) {
            (Some(l), Some(r)) => concat(Some(l), Some(r)),
            (l, r) => l.or(r),
        },
        Expr::Alternate(l, r) => alternate(prune(l), prune(r)),
        Expr::TwoPhaseStar(l, r) => two_phase_star(prune(l), prune(r)),
        Expr::Opt(l) => prune(l).and_then(|l| opt(Some(l))),
        Expr::Star(l) => prune(l).and_then(|l| star(Some(l))),
        Expr::SideEffect(se) => match params.kind_of(se) {
            Some(SeParam {
                kind: ParamKind::LParen | ParamKind::RParen,
                op1,
                ..
            }) if op1 > 0 && !needed.get(op1 as usize).copied().unwrap_or(false) => None,
            _ => Some(Box::new(node)),
        },
    }
}

/// True when saving registers on the backtrack stack is required: some
/// group marker sits inside a loop.
pub fn registers_on_stack(rexp: &Rexp, in_danger: bool, params: &SeParams) -> bool {
    match rexp.as_deref() {
        None | Some(Expr::CharSet(_)) | Some(Expr::Data(_)) => false,
        Some(Expr::Concat(l, r)) | Some(Expr::Alternate(l, r)) => {
            registers_on_stack(l, in_danger, params) || registers_on_stack(r, in_danger, params)
        }
        Some(Expr::Opt(l)) => registers_on_stack(l, false, params),
        Some(Expr::Star(l)) => registers_on_stack(l, true, params),
        Some(Expr::TwoPhaseStar(l, r)) => {
            registers_on_stack(l, true, params) || registers_on_stack(r, true, params)
        }
        Some(Expr::SideEffect(se)) => {
            in_danger
                && matches!(
                    params.kind_of(*se),
                    Some(SeParam { kind: ParamKind::LParen | ParamKind::RParen, op1, .. }) if op1 > 0
                )
        }
    }
}

/// Removes alternation sync markers where they cannot affect which branch
/// wins. Every `Alternate` built by the compiler has a right child of the
/// shape `Concat(tv, branch)`.
pub fn speed_up_alt(rexp: &mut Rexp, unposix: bool) {
    let Some(node) = rexp.as_deref_mut() else {
        return;
    };
    match node {
        Expr::CharSet(_) | Expr::Data(_) | Expr::SideEffect(_) => {}
        Expr::Opt(l) | Expr::Star(l) => speed_up_alt(l, unposix),
        Expr::Concat(l, r) | Expr::TwoPhaseStar(l, r) => {
            speed_up_alt(l, unposix);
            speed_up_alt(r, unposix);
        }
        Expr::Alternate(left, right) => {
            speed_up_alt(left, unposix);
            let Some(Expr::Concat(_, branch)) = right.as_deref_mut() else {
                speed_up_alt(right, unposix);
                return;
            };
            speed_up_alt(branch, unposix);
            if unposix
                || begins_with_complex_se(branch)
                || !(has_any_se(branch) || has_any_se(left))
            {
                let branch = branch.take();
                *right = branch;
            }
        }
    }
}
