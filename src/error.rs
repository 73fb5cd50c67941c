use thiserror::Error;

/// Why a pattern was rejected. `Display` gives the GNU message text.
///
/// The set mirrors the POSIX `REG_*` codes. `BadPattern`, `Collation` and
/// `TooBig` are never produced by this parser: collating elements are not
/// supported and size limits surface as [`Error::ResourceExhausted`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    #[error("Invalid regular expression")]
    BadPattern,
    #[error("Invalid collation character")]
    Collation,
    #[error("Invalid character class name")]
    CharClass,
    #[error("Trailing backslash")]
    TrailingEscape,
    #[error("Invalid back reference")]
    BadBackref,
    #[error("Unmatched [ or [^")]
    UnmatchedBracket,
    #[error("Unmatched ( or \\(")]
    UnmatchedOpenGroup,
    #[error("Unmatched \\{{")]
    UnmatchedBrace,
    #[error("Invalid content of \\{{\\}}")]
    BadInterval,
    #[error("Invalid range end")]
    BadRange,
    #[error("Invalid preceding regular expression")]
    BadRepetition,
    #[error("Premature end of regular expression")]
    PrematureEnd,
    #[error("Regular expression too big")]
    TooBig,
    #[error("Unmatched ) or \\)")]
    UnmatchedCloseGroup,
}

impl SyntaxErrorKind {
    /// The POSIX error code name.
    pub fn code(self) -> &'static str {
        match self {
            SyntaxErrorKind::BadPattern => "REG_BADPAT",
            SyntaxErrorKind::Collation => "REG_ECOLLATE",
            SyntaxErrorKind::CharClass => "REG_ECTYPE",
            SyntaxErrorKind::TrailingEscape => "REG_EESCAPE",
            SyntaxErrorKind::BadBackref => "REG_ESUBREG",
            SyntaxErrorKind::UnmatchedBracket => "REG_EBRACK",
            SyntaxErrorKind::UnmatchedOpenGroup => "REG_EPAREN",
            SyntaxErrorKind::UnmatchedBrace => "REG_EBRACE",
            SyntaxErrorKind::BadInterval => "REG_BADBR",
            SyntaxErrorKind::BadRange => "REG_ERANGE",
            SyntaxErrorKind::BadRepetition => "REG_BADRPT",
            SyntaxErrorKind::PrematureEnd => "REG_EEND",
            SyntaxErrorKind::TooBig => "REG_ESIZE",
            SyntaxErrorKind::UnmatchedCloseGroup => "REG_ERPAREN",
        }
    }
}

/// The bounded resource that ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    NfaStates,
    Closures,
    Superstates,
    BacktrackDepth,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("{kind} at offset {offset}")]
    Syntax { kind: SyntaxErrorKind, offset: usize },

    #[error("resource exhausted: {0:?}")]
    ResourceExhausted(Resource),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub(crate) fn syntax(kind: SyntaxErrorKind, offset: usize) -> Self {
        Error::Syntax { kind, offset }
    }

    /// The syntax error kind, if this is a compile error.
    pub fn syntax_kind(&self) -> Option<SyntaxErrorKind> {
        match self {
            Error::Syntax { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
