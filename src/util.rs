/*!
This module contains the types shared by the public API and the matcher:
what to search ([`Input`]), where ([`Span`]) and what was found ([`Match`],
[`Captures`]).
*/

use std::ops::Range;

use bstr::BStr;

/// Defines the input parameter to most matching methods on a [`crate::Regex`].
/// Since all values other than subject have a default value it's always
/// sufficient to only provide the subject, but for cases where we need more
/// control (when finding all matches for instance) this type comes handy.
#[derive(Clone, Debug)]
pub struct Input<'s> {
    /// The bytes against which the regex is matched
    pub subject: &'s [u8],
    /// Candidate start positions, both ends included. A match may extend
    /// past `span.to`.
    /// Default: 0..subject.len()
    pub span: Span,
    /// Only try `span.from`.
    /// Default: false
    pub anchored: bool,
    /// Stop at the first match found instead of looking for the longest.
    /// Default: false
    pub first_match: bool,
    /// Record the bounds of every group.
    /// Default: true
    pub captures: bool,
    /// The subject does not start at a line start: `^` fails at offset 0.
    /// Default: false
    pub not_bol: bool,
    /// The subject does not end at a line end: `$` fails at its end.
    /// Default: false
    pub not_eol: bool,
}

impl<'s> Input<'s> {
    pub fn new(subject: &'s [u8]) -> Self {
        Self {
            subject,
            span: (0..subject.len()).into(),
            anchored: false,
            first_match: false,
            captures: true,
            not_bol: false,
            not_eol: false,
        }
    }

    pub fn span(mut self, span: impl Into<Span>) -> Self {
        self.span = span.into();
        self
    }

    pub fn anchored(mut self, value: bool) -> Self {
        self.anchored = value;
        self
    }

    pub fn first_match(mut self, value: bool) -> Self {
        self.first_match = value;
        self
    }

    pub fn captures(mut self, value: bool) -> Self {
        self.captures = value;
        self
    }

    pub fn not_bol(mut self, value: bool) -> Self {
        self.not_bol = value;
        self
    }

    pub fn not_eol(mut self, value: bool) -> Self {
        self.not_eol = value;
        self
    }

    pub fn valid(&self) -> bool {
        self.span.valid() && self.span.to <= self.subject.len()
    }
}

impl<'s> From<&'s [u8]> for Input<'s> {
    fn from(subject: &'s [u8]) -> Self {
        Self::new(subject)
    }
}

impl<'s, const N: usize> From<&'s [u8; N]> for Input<'s> {
    fn from(subject: &'s [u8; N]) -> Self {
        Self::new(subject)
    }
}

impl<'s> From<&'s str> for Input<'s> {
    fn from(subject: &'s str) -> Self {
        Self::new(subject.as_bytes())
    }
}

/// A span of bytes. Similar to [`std::ops::Range`], but implements Copy.
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub from: usize,
    pub to: usize,
}

impl Span {
    pub fn empty(&self) -> bool {
        self.from == self.to
    }

    pub fn valid(&self) -> bool {
        self.from <= self.to
    }

    pub fn invalid() -> Span {
        Span { from: 1, to: 0 }
    }
}

impl From<Range<usize>> for Span {
    fn from(value: Range<usize>) -> Self {
        Self {
            from: value.start,
            to: value.end,
        }
    }
}

impl From<Span> for Range<usize> {
    fn from(val: Span) -> Self {
        val.from..val.to
    }
}

/// Successful non-capturing match. Contains only the bounds of the
/// overall match.
#[derive(Copy, Debug, Clone)]
pub struct Match<'s> {
    pub subject: &'s [u8],
    pub span: Span,
}

impl<'s> Match<'s> {
    pub fn new(subject: &'s [u8], span: impl Into<Span>) -> Self {
        let span = span.into();
        Self { subject, span }
    }

    pub fn slice(&self) -> &'s [u8] {
        &self.subject[self.span.from..self.span.to]
    }

    pub fn as_bstr(&self) -> &'s BStr {
        BStr::new(self.slice())
    }

    pub fn range(&self) -> Range<usize> {
        self.span.into()
    }

    /// Returns the byte-index where the next non-overlapping
    /// match could start. This takes empty matches into account.
    pub fn next_match_start(&self) -> usize {
        if self.span.empty() {
            // Must advance otherwise we would always return
            // the same empty match forever.
            self.span.to + 1
        } else {
            self.span.to
        }
    }
}

/// Successful capturing match. Contains the bounds (if any) of all capture groups
/// defined in the pattern. In particular this includes the implicit capture-group
/// 0.
#[derive(Debug, Clone)]
pub struct Captures<'s> {
    subject: &'s [u8],
    spans: Box<[Span]>,
}

impl<'s> Captures<'s> {
    pub fn get(&self, group_index: usize) -> Option<Match<'s>> {
        let span = *self.spans.get(group_index)?;
        if !span.valid() {
            return None;
        }

        Some(Match {
            subject: self.subject,
            span,
        })
    }

    pub fn group0(&self) -> Match<'s> {
        // Group 0 is always set by the matcher
        Match {
            subject: self.subject,
            span: self.spans[0],
        }
    }

    pub fn new(subject: &'s [u8], spans: Box<[Span]>) -> Self {
        Self { subject, spans }
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Every group in order, `None` for the ones that did not participate.
    pub fn iter(&self) -> impl Iterator<Item = Option<Match<'s>>> + '_ {
        (0..self.spans.len()).map(|i| self.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_match_advances() {
        let m = Match::new(b"abc", 1..1);
        assert_eq!(m.next_match_start(), 2);
        let m = Match::new(b"abc", 1..3);
        assert_eq!(m.next_match_start(), 3);
        assert_eq!(m.as_bstr(), "bc");
    }

    #[test]
    fn unset_groups() {
        let caps = Captures::new(b"ab", vec![Span::from(0..2), Span::invalid()].into_boxed_slice());
        assert_eq!(caps.len(), 2);
        assert_eq!(caps.group0().slice(), b"ab");
        assert!(caps.get(1).is_none());
        assert!(caps.get(2).is_none());
    }

    #[test]
    fn input_defaults() {
        let input = Input::from("hello");
        assert_eq!(input.span, Span::from(0..5));
        assert!(input.captures && !input.anchored && !input.not_bol);
        assert!(input.valid());
        assert!(!input.span(2..9).valid());
    }
}
