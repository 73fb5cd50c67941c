//! A POSIX regular expression matcher built on a lazily constructed DFA.
//!
//! Patterns are parsed with GNU syntax options into an expression tree,
//! compiled to an NFA whose edges may carry side effects, and matched by
//! building superstates of that NFA on demand. Choices that the DFA cannot
//! resolve (group bounds, backreferences, counted repetition) are explored
//! by backtracking over the superstate graph, yielding POSIX
//! leftmost-longest matches.

pub mod bitset;
pub mod cache;
pub mod compile;
pub mod error;
pub mod hash;
pub mod hashcons;
pub mod matcher;
pub mod nfa;
pub mod regex;
pub mod rexp;
pub mod syntax;
pub mod util;

pub use cache::{Cache, CacheConfig, CacheStats};
pub use error::{Error, Resource, SyntaxErrorKind};
pub use regex::{Builder, Config, Regex};
pub use syntax::Syntax;
pub use util::{Captures, Input, Match, Span};

/// Compiles `pattern` with the given syntax and default settings.
pub fn compile(pattern: &[u8], syntax: Syntax) -> Result<Regex, Error> {
    Builder::bytes(pattern).syntax(syntax).build()
}
