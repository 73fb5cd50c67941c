#![allow(dead_code)]

use lazyrx::Regex;
use regex::bytes as rust_regex;

/// Compile a pattern with both engines. `.` spans newlines and classes are
/// ASCII, as in POSIX extended syntax.
fn compile_both(pattern: &str) -> (Result<rust_regex::Regex, regex::Error>, Option<Regex>) {
    let rust = rust_regex::Regex::new(&format!("(?s-u){pattern}"));
    let ours = Regex::new(pattern).ok();
    (rust, ours)
}

fn groups<'s>(caps: &lazyrx::Captures<'s>) -> Vec<Option<&'s [u8]>> {
    caps.iter().map(|g| g.map(|m| m.slice())).collect()
}

/// Match a pattern against a given input with lazyrx and rust-regex, and
/// compare the result of both compilation and execution. Only use patterns
/// on which leftmost-first and leftmost-longest agree.
pub fn check_against_rust(pattern: &str, input: &str) {
    let subject = input.as_bytes();
    match compile_both(pattern) {
        (Ok(rust_re), Some(ours)) => {
            // find
            let rust_match = rust_re.find(subject).map(|m| m.range());
            let my_match = ours.find(subject).unwrap().map(|m| m.range());
            assert_eq!(
                my_match, rust_match,
                "Mismatch for pattern {:?} input {:?} (find)",
                pattern, input
            );

            // find_all, where no empty match is involved
            let rust_all: Vec<_> = rust_re.find_iter(subject).map(|m| m.range()).collect();
            let my_all: Vec<_> = ours
                .find_all(subject)
                .map(|m| m.unwrap().range())
                .collect();
            if !my_all.iter().chain(&rust_all).any(|r| r.is_empty()) {
                assert_eq!(
                    my_all, rust_all,
                    "Mismatch for pattern {:?} input {:?} (find_all)",
                    pattern, input
                );
            }

            // find_captures
            let rust_groups = rust_re.captures(subject).map(|caps| {
                caps.iter()
                    .map(|g| g.map(|m| m.as_bytes()))
                    .collect::<Vec<_>>()
            });
            let my_caps = ours.find_captures(subject).unwrap();
            let my_groups = my_caps.as_ref().map(groups);
            assert_eq!(
                my_groups, rust_groups,
                "Mismatch for pattern {:?} input {:?} (find_captures)",
                pattern, input
            );

            // is_match
            assert_eq!(
                ours.is_match(subject).unwrap(),
                rust_re.is_match(subject),
                "Mismatch for pattern {:?} input {:?} (is_match)",
                pattern,
                input
            );
        }
        (Err(_), None) => {} // Both failed, that's good
        (Ok(_), None) => panic!("lazyrx failed to compile {pattern:?} but rust-regex succeeded"),
        (Err(e), Some(_)) => {
            panic!("rust-regex failed to compile {pattern:?} but lazyrx succeeded: {e}")
        }
    }
}

/// Runs `pattern` on `input` and returns every group as a byte range.
pub fn spans(re: &Regex, input: &str) -> Option<Vec<Option<(usize, usize)>>> {
    re.find_captures(input)
        .unwrap()
        .map(|caps| caps.iter().map(|g| g.map(|m| (m.span.from, m.span.to))).collect())
}
