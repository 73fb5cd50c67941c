//! GNU regex syntax options.

use bitflags::bitflags;

bitflags! {
    /// Which operators a pattern may use and how they are spelled.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Syntax: u32 {
        /// A backslash inside a bracket expression escapes the next character.
        const BACKSLASH_ESCAPE_IN_LISTS = 1 << 0;
        /// `\+` and `\?` are operators, `+` and `?` are literals.
        const BK_PLUS_QM = 1 << 1;
        /// `[:alpha:]` and friends are recognized inside brackets.
        const CHAR_CLASSES = 1 << 2;
        /// `^` and `$` are anchors anywhere in the pattern.
        const CONTEXT_INDEP_ANCHORS = 1 << 3;
        /// `*`, `+`, `?` are operators anywhere.
        const CONTEXT_INDEP_OPS = 1 << 4;
        /// A repetition operator with nothing to repeat is an error.
        const CONTEXT_INVALID_OPS = 1 << 5;
        /// `.` matches a newline.
        const DOT_NEWLINE = 1 << 6;
        /// `.` does not match NUL.
        const DOT_NOT_NULL = 1 << 7;
        /// `[^...]` never matches a newline.
        const HAT_LISTS_NOT_NEWLINE = 1 << 8;
        /// Intervals `{m,n}` are recognized.
        const INTERVALS = 1 << 9;
        /// `+`, `?` and `|` are not operators at all.
        const LIMITED_OPS = 1 << 10;
        /// A newline separates alternatives.
        const NEWLINE_ALT = 1 << 11;
        /// `{` and `}` delimit intervals rather than `\{` and `\}`.
        const NO_BK_BRACES = 1 << 12;
        /// `(` and `)` group rather than `\(` and `\)`.
        const NO_BK_PARENS = 1 << 13;
        /// `\1`..`\9` are literals, not backreferences.
        const NO_BK_REFS = 1 << 14;
        /// `|` alternates rather than `\|`.
        const NO_BK_VBAR = 1 << 15;
        /// A range whose end precedes its start is an error.
        const NO_EMPTY_RANGES = 1 << 16;
        /// An unmatched `)` is a literal.
        const UNMATCHED_RIGHT_PAREN_ORD = 1 << 17;
    }
}

impl Syntax {
    pub const EMACS: Syntax = Syntax::empty();

    pub const POSIX_COMMON: Syntax = Syntax::CHAR_CLASSES
        .union(Syntax::DOT_NEWLINE)
        .union(Syntax::DOT_NOT_NULL)
        .union(Syntax::INTERVALS)
        .union(Syntax::NO_EMPTY_RANGES);

    pub const POSIX_BASIC: Syntax = Syntax::POSIX_COMMON.union(Syntax::BK_PLUS_QM);

    pub const POSIX_MINIMAL_BASIC: Syntax = Syntax::POSIX_COMMON.union(Syntax::LIMITED_OPS);

    pub const POSIX_EXTENDED: Syntax = Syntax::POSIX_COMMON
        .union(Syntax::CONTEXT_INDEP_ANCHORS)
        .union(Syntax::CONTEXT_INDEP_OPS)
        .union(Syntax::NO_BK_BRACES)
        .union(Syntax::NO_BK_PARENS)
        .union(Syntax::NO_BK_VBAR)
        .union(Syntax::UNMATCHED_RIGHT_PAREN_ORD);

    pub const POSIX_MINIMAL_EXTENDED: Syntax = Syntax::POSIX_COMMON
        .union(Syntax::CONTEXT_INDEP_ANCHORS)
        .union(Syntax::CONTEXT_INVALID_OPS)
        .union(Syntax::NO_BK_BRACES)
        .union(Syntax::NO_BK_PARENS)
        .union(Syntax::NO_BK_REFS)
        .union(Syntax::NO_BK_VBAR)
        .union(Syntax::UNMATCHED_RIGHT_PAREN_ORD);

    pub const AWK: Syntax = Syntax::BACKSLASH_ESCAPE_IN_LISTS
        .union(Syntax::DOT_NOT_NULL)
        .union(Syntax::NO_BK_PARENS)
        .union(Syntax::NO_BK_REFS)
        .union(Syntax::NO_BK_VBAR)
        .union(Syntax::NO_EMPTY_RANGES)
        .union(Syntax::UNMATCHED_RIGHT_PAREN_ORD);

    pub const POSIX_AWK: Syntax = Syntax::POSIX_EXTENDED.union(Syntax::BACKSLASH_ESCAPE_IN_LISTS);

    pub const GREP: Syntax = Syntax::BK_PLUS_QM
        .union(Syntax::CHAR_CLASSES)
        .union(Syntax::HAT_LISTS_NOT_NEWLINE)
        .union(Syntax::INTERVALS)
        .union(Syntax::NEWLINE_ALT);

    pub const EGREP: Syntax = Syntax::CHAR_CLASSES
        .union(Syntax::CONTEXT_INDEP_ANCHORS)
        .union(Syntax::CONTEXT_INDEP_OPS)
        .union(Syntax::HAT_LISTS_NOT_NEWLINE)
        .union(Syntax::NEWLINE_ALT)
        .union(Syntax::NO_BK_PARENS)
        .union(Syntax::NO_BK_VBAR);

    pub const POSIX_EGREP: Syntax = Syntax::EGREP
        .union(Syntax::INTERVALS)
        .union(Syntax::NO_BK_BRACES);

    pub const SED: Syntax = Syntax::POSIX_BASIC;

    /// Looks a preset up by its lowercase name.
    pub fn preset(name: &str) -> Option<Syntax> {
        let syntax = match name {
            "emacs" => Syntax::EMACS,
            "posix-basic" | "basic" => Syntax::POSIX_BASIC,
            "posix-minimal-basic" => Syntax::POSIX_MINIMAL_BASIC,
            "posix-extended" | "extended" => Syntax::POSIX_EXTENDED,
            "posix-minimal-extended" => Syntax::POSIX_MINIMAL_EXTENDED,
            "awk" => Syntax::AWK,
            "posix-awk" => Syntax::POSIX_AWK,
            "grep" => Syntax::GREP,
            "egrep" => Syntax::EGREP,
            "posix-egrep" => Syntax::POSIX_EGREP,
            "sed" => Syntax::SED,
            _ => return None,
        };
        Some(syntax)
    }
}

impl Default for Syntax {
    fn default() -> Self {
        Syntax::POSIX_EXTENDED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        assert!(Syntax::POSIX_BASIC.contains(Syntax::BK_PLUS_QM));
        assert!(!Syntax::POSIX_BASIC.contains(Syntax::NO_BK_PARENS));
        assert!(Syntax::POSIX_EXTENDED.contains(Syntax::NO_BK_VBAR | Syntax::INTERVALS));
        assert_eq!(Syntax::preset("sed"), Some(Syntax::POSIX_BASIC));
        assert_eq!(Syntax::preset("perl"), None);
        assert_eq!(Syntax::default(), Syntax::POSIX_EXTENDED);
    }
}
