mod utils;

use lazyrx::{Builder, CacheConfig, Error, Input, Regex, Resource, Syntax, SyntaxErrorKind};
use pretty_assertions::assert_eq;
use utils::spans;

fn find(re: &Regex, input: &str) -> Option<(usize, usize)> {
    re.find(input)
        .unwrap()
        .map(|m| (m.span.from, m.span.to))
}

#[test]
fn last_iteration_is_captured() {
    let re = Regex::new("a(b|c)*d").unwrap();
    assert_eq!(spans(&re, "abcbcd"), Some(vec![Some((0, 6)), Some((4, 5))]));
}

#[test]
fn posix_longest_alternative() {
    let re = Regex::new("(a|ab)(c|bcd)(d*)").unwrap();
    assert_eq!(find(&re, "abcd"), Some((0, 4)));
    let re = Regex::new("x|xy|xyz").unwrap();
    assert_eq!(find(&re, "axyzb"), Some((1, 4)));
}

#[test]
fn newline_sensitive_anchors() {
    let re = Builder::new("^foo$").newline(true).build().unwrap();
    assert_eq!(find(&re, "bar\nfoo\nbaz"), Some((4, 7)));
    let re = Regex::new("^foo$").unwrap();
    assert_eq!(find(&re, "bar\nfoo\nbaz"), None);
}

#[test]
fn newline_mode_dot() {
    let re = Builder::new("a.b").newline(true).build().unwrap();
    assert_eq!(find(&re, "a\nb"), None);
    let re = Builder::new("a[^x]b").newline(true).build().unwrap();
    assert_eq!(find(&re, "a\nb"), None);
    let re = Regex::new("a.b").unwrap();
    assert_eq!(find(&re, "a\nb"), Some((0, 3)));
}

#[test]
fn backreferences() {
    let re = Regex::new(r"(a)\1").unwrap();
    assert!(re.is_match("aa").unwrap());
    assert!(!re.is_match("ab").unwrap());
    let re = Regex::new(r"([a-z]+) \1").unwrap();
    assert_eq!(spans(&re, "say bye bye"), Some(vec![Some((4, 11)), Some((4, 7))]));
}

#[test]
fn intervals() {
    let re = Regex::new("a{2,3}").unwrap();
    assert_eq!(find(&re, "aaaa"), Some((0, 3)));
    let re = Regex::new("(ab){2}").unwrap();
    assert_eq!(spans(&re, "xababab"), Some(vec![Some((1, 5)), Some((3, 5))]));
    let re = Regex::new("a{0}b").unwrap();
    assert_eq!(find(&re, "aab"), Some((2, 3)));
}

#[test]
fn empty_pattern_matches_empty() {
    let re = Regex::new("").unwrap();
    assert_eq!(find(&re, "abc"), Some((0, 0)));
    assert_eq!(find(&re, ""), Some((0, 0)));
}

#[test]
fn syntax_errors() {
    let kind = |pattern: &str| Regex::new(pattern).unwrap_err().syntax_kind();
    assert_eq!(kind("("), Some(SyntaxErrorKind::UnmatchedOpenGroup));
    assert_eq!(kind("[a"), Some(SyntaxErrorKind::UnmatchedBracket));
    assert_eq!(kind("a\\"), Some(SyntaxErrorKind::TrailingEscape));
    assert_eq!(kind("[[:foo:]]"), Some(SyntaxErrorKind::CharClass));
    assert_eq!(kind("[z-a]"), Some(SyntaxErrorKind::BadRange));
}

#[test]
fn word_operators() {
    let re = Regex::new(r"\<is\>").unwrap();
    assert_eq!(find(&re, "this is it"), Some((5, 7)));
    let re = Regex::new(r"\w+").unwrap();
    assert_eq!(find(&re, "  snake_case9 "), Some((2, 13)));
    let re = Regex::new(r"\W").unwrap();
    assert_eq!(find(&re, "ab-c"), Some((2, 3)));
}

#[test]
fn buffer_anchors() {
    let re = Regex::new(r"\`ab").unwrap();
    assert_eq!(find(&re, "abab"), Some((0, 2)));
    let re = Regex::new(r"ab\'").unwrap();
    assert_eq!(find(&re, "abab"), Some((2, 4)));
}

#[test]
fn not_bol_and_not_eol() {
    let re = Regex::new("^a").unwrap();
    assert!(re.is_match("a").unwrap());
    assert!(!re.is_match(Input::from("a").not_bol(true)).unwrap());
    let re = Regex::new("a$").unwrap();
    assert!(!re.is_match(Input::from("a").not_eol(true)).unwrap());
}

#[test]
fn character_classes() {
    let re = Regex::new("[[:upper:]][[:lower:]]+").unwrap();
    assert_eq!(find(&re, "hello World"), Some((6, 11)));
    let re = Regex::new("[]a]+").unwrap();
    assert_eq!(find(&re, "x]a]"), Some((1, 4)));
    let re = Regex::new("[a-]+").unwrap();
    assert_eq!(find(&re, "b-a-"), Some((1, 4)));
}

#[test]
fn basic_syntax() {
    let re = lazyrx::compile(br"\(ab\)*c", Syntax::POSIX_BASIC).unwrap();
    let caps = re.find_captures("ababc").unwrap().unwrap();
    assert_eq!(caps.group0().slice(), b"ababc");
    assert_eq!(caps.get(1).map(|m| m.range()), Some(2..4));

    let re = lazyrx::compile(b"a+", Syntax::POSIX_BASIC).unwrap();
    assert_eq!(find(&re, "aa+"), Some((1, 3)));
    let re = lazyrx::compile(br"a\{2\}", Syntax::POSIX_BASIC).unwrap();
    assert_eq!(find(&re, "baaa"), Some((1, 3)));
}

#[test]
fn case_insensitive() {
    let re = Builder::new("hello").case_insensitive(true).build().unwrap();
    assert_eq!(find(&re, "say HeLLo"), Some((4, 9)));
    let re = Builder::new(r"(x)\1").case_insensitive(true).build().unwrap();
    assert!(re.is_match("xX").unwrap());
}

#[test]
fn span_bounds_start_positions() {
    let re = Regex::new("b+").unwrap();
    let input = Input::from("abbb").span(2..2);
    let found = re.search(&input).unwrap().unwrap();
    assert_eq!(found[0].from, 2);
    assert_eq!(found[0].to, 4);
    let input = Input::from("abbb").span(0..0).anchored(true);
    assert!(re.search(&input).unwrap().is_none());
}

#[test]
fn find_all_captures() {
    let re = Regex::new("([a-z])([0-9])").unwrap();
    let all: Vec<_> = re
        .find_all_captures("a1 b2 c3")
        .map(|caps| {
            let caps = caps.unwrap();
            (caps.get(1).unwrap().slice()[0], caps.get(2).unwrap().slice()[0])
        })
        .collect();
    assert_eq!(all, vec![(b'a', b'1'), (b'b', b'2'), (b'c', b'3')]);
}

#[test]
fn tiny_cache_still_matches() {
    let cache = CacheConfig {
        cache_bound: 1,
        chunk: 1,
        max_superstates: 32,
    };
    let re = Builder::new("(a|b)*abb(c|d)").cache(cache).build().unwrap();
    let subject = "abababababbabbbbaabbd";
    assert_eq!(find(&re, subject), Some((0, 21)));
    assert!(re.cache_stats().superstates <= 32);
}

#[test]
fn nfa_state_limit() {
    let err = Builder::new("abcdefghijklmnopqrstuvwxyz").nfa_state_limit(20).build().unwrap_err();
    assert_eq!(err, Error::ResourceExhausted(Resource::NfaStates));
}
