//! Types and API for Regex matching
//!
//! This module defines the [`Regex`] struct, which pairs a compiled
//! [`Program`] with the superstate [`Cache`] it runs in, and the
//! [`Builder`] used to configure compilation.

use std::cell::RefCell;

use log::*;

use crate::cache::{Cache, CacheConfig, CacheStats};
use crate::compile::{Program, Translate};
use crate::error::Error;
use crate::matcher::{self, Mode};
use crate::syntax::Syntax;
use crate::util::{Captures, Input, Match, Span};

/// A compiled regular expression.
///
/// Matching builds the automaton lazily, so every search may grow the
/// regex's cache. Use [`Regex::search_with`] to run several regexes in one
/// shared cache.
#[derive(Debug)]
pub struct Regex {
    program: Program,
    cache: RefCell<Cache>,
    nosub: bool,
    backtrack_limit: usize,
}

impl Regex {
    /// Compiles `pattern` with POSIX extended syntax.
    pub fn new(pattern: &str) -> Result<Self, Error> {
        Builder::new(pattern).build()
    }

    pub fn with_config(pattern: &[u8], config: Config) -> Result<Self, Error> {
        let program = Program::compile(pattern, &config)?;
        debug!(
            "compiled {} nfa states, {} groups",
            program.nfa.len(),
            program.re_nsub
        );
        Ok(Self {
            program,
            cache: RefCell::new(Cache::new(config.cache)),
            nosub: config.nosub,
            backtrack_limit: config.backtrack_limit,
        })
    }

    /// Number of capture groups, including the implicit group 0.
    pub fn group_len(&self) -> usize {
        self.program.re_nsub + 1
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Returns true whenever the input matches the regex or not, without
    /// returning the bounds of the match. This stops at the first match
    /// found, so it may be faster than `find`.
    pub fn is_match<'s>(&self, input: impl Into<Input<'s>>) -> Result<bool, Error> {
        let input = input.into().first_match(true);
        Ok(self.search(&input)?.is_some())
    }

    /// Match the regex against the input and returns the bounds of the
    /// leftmost-longest match or None.
    pub fn find<'s>(&self, input: impl Into<Input<'s>>) -> Result<Option<Match<'s>>, Error> {
        let input = input.into().captures(false);
        let spans = self.search(&input)?;
        Ok(spans.map(|spans| Match::new(input.subject, spans[0])))
    }

    /// Returns an iterator over all non-overlapping match in the input.
    pub fn find_all<'r, 's>(&'r self, input: impl Into<Input<'s>>) -> AllMatch<'r, 's> {
        AllMatch {
            regex: self,
            input: input.into().captures(false),
        }
    }

    /// Match the regex against the input and returns a match with all its
    /// capture groups bounds or None. If only the overall match is needed,
    /// you should prefer `find` since it can be faster.
    pub fn find_captures<'s>(
        &self,
        input: impl Into<Input<'s>>,
    ) -> Result<Option<Captures<'s>>, Error> {
        let input = input.into().captures(true);
        let spans = self.search(&input)?;
        Ok(spans.map(|spans| Captures::new(input.subject, spans)))
    }

    /// Returns an iterator over all non-overlapping match in the input,
    /// with their capture group bounds.
    pub fn find_all_captures<'r, 's>(
        &'r self,
        input: impl Into<Input<'s>>,
    ) -> AllCaptures<'r, 's> {
        AllCaptures {
            regex: self,
            input: input.into().captures(true),
        }
    }

    /// Runs one search in this regex's own cache. Returns the spans of
    /// every group when `input.captures` is set, of group 0 otherwise.
    pub fn search(&self, input: &Input<'_>) -> Result<Option<Box<[Span]>>, Error> {
        let mut cache = self.cache.borrow_mut();
        self.search_with(&mut cache, input)
    }

    /// Like [`Regex::search`], but in a cache the caller owns.
    pub fn search_with(
        &self,
        cache: &mut Cache,
        input: &Input<'_>,
    ) -> Result<Option<Box<[Span]>>, Error> {
        let mode = if input.first_match {
            Mode::Exists
        } else if input.captures && !self.nosub {
            Mode::Captures
        } else {
            Mode::Longest
        };
        let found = matcher::search(&self.program, cache, input, mode, self.backtrack_limit);
        if let Err(err) = &found {
            warn!("search failed: {err}");
        }
        found
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.borrow().stats()
    }

    /// Changes how many superstates the cache keeps before reclaiming.
    pub fn set_cache_bound(&self, bound: usize) {
        self.cache.borrow_mut().set_bound(bound);
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub syntax: Syntax,
    pub case_insensitive: bool,
    /// `.` and `[^...]` skip newlines, `^` and `$` match around them.
    pub newline: bool,
    /// Maps every byte before comparing. Defaults to the identity.
    pub translate: Option<Translate>,
    /// Only report whether and where the whole pattern matched.
    pub nosub: bool,
    pub nfa_state_limit: usize,
    /// Nodes visited while computing one state's closures.
    pub closure_limit: usize,
    /// Pending choice points of one search.
    pub backtrack_limit: usize,
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            syntax: Syntax::POSIX_EXTENDED,
            case_insensitive: false,
            newline: false,
            translate: None,
            nosub: false,
            nfa_state_limit: 10_000,
            closure_limit: 100_000,
            backtrack_limit: 100_000,
            cache: CacheConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Builder<'p> {
    pattern: &'p [u8],
    config: Config,
}

impl<'p> Builder<'p> {
    pub fn new(pattern: &'p str) -> Self {
        Self::bytes(pattern.as_bytes())
    }

    pub fn bytes(pattern: &'p [u8]) -> Self {
        Self {
            pattern,
            config: Config::default(),
        }
    }

    pub fn syntax(mut self, value: Syntax) -> Self {
        self.config.syntax = value;
        self
    }

    pub fn case_insensitive(mut self, value: bool) -> Self {
        self.config.case_insensitive = value;
        self
    }

    pub fn newline(mut self, value: bool) -> Self {
        self.config.newline = value;
        self
    }

    pub fn translate(mut self, value: Translate) -> Self {
        self.config.translate = Some(value);
        self
    }

    pub fn nosub(mut self, value: bool) -> Self {
        self.config.nosub = value;
        self
    }

    pub fn nfa_state_limit(mut self, value: usize) -> Self {
        self.config.nfa_state_limit = value;
        self
    }

    pub fn closure_limit(mut self, value: usize) -> Self {
        self.config.closure_limit = value;
        self
    }

    pub fn backtrack_limit(mut self, value: usize) -> Self {
        self.config.backtrack_limit = value;
        self
    }

    pub fn cache(mut self, value: CacheConfig) -> Self {
        self.config.cache = value;
        self
    }

    pub fn build(self) -> Result<Regex, Error> {
        Regex::with_config(self.pattern, self.config)
    }
}

/// Iterator over all match in a regex.
pub struct AllMatch<'r, 's> {
    regex: &'r Regex,
    input: Input<'s>,
}

impl<'s> Iterator for AllMatch<'_, 's> {
    type Item = Result<Match<'s>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.input.valid() {
            return None;
        }
        let spans = match self.regex.search(&self.input) {
            Ok(spans) => spans?,
            Err(err) => {
                // one error ends the iteration
                self.input.span = Span::invalid();
                return Some(Err(err));
            }
        };
        let result = Match::new(self.input.subject, spans[0]);
        self.input.span.from = result.next_match_start();
        Some(Ok(result))
    }
}

/// Iterator over all match and their capture groups.
pub struct AllCaptures<'r, 's> {
    regex: &'r Regex,
    input: Input<'s>,
}

impl<'s> Iterator for AllCaptures<'_, 's> {
    type Item = Result<Captures<'s>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.input.valid() {
            return None;
        }
        let spans = match self.regex.search(&self.input) {
            Ok(spans) => spans?,
            Err(err) => {
                self.input.span = Span::invalid();
                return Some(Err(err));
            }
        };
        let result = Captures::new(self.input.subject, spans);
        self.input.span.from = result.group0().next_match_start();
        Some(Ok(result))
    }
}
