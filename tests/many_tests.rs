mod utils;

const CASES: &[(&str, &str)] = &[
    (r"[0-9]+", "abc123def"),
    (r"foo", "foobar"),
    (r"bar", "foobar"),
    (r"baz", "foobar"),
    (r"(\w+)-([0-9]+)", "test-42"),
    (r"([0-9]+)?", ""),
    (r"[a-z]{3}", "xyz"),
    (r"invalid[", "anything"),
    (r"[0-9]+=[0-9]+", "124221=12323=2=abd"),
    (
        r"Sherlock Holmes|Shrelock Holm|John Watson|Irene Adler|Inspector Lestrade|Professor Moriarty",
        "Professor Moriarty
        Sherlock Holmes
        John Watson
        Irene Adler
        ",
    ),
    (
        r".*d",
        "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaad",
    ),
    (r"a(b|c)*d", "xabcbcd"),
    (r"(a+)(b+)?", "caaab"),
    (r"x*", "aaa"),
    (r"^abc$", "abc"),
    (r"^b", "ab"),
    (r"[[:alpha:]]+[[:digit:]]", "--ab1--"),
    (r"colou?r", "the color red"),
    (r"(foo|bar)+", "foobarbaz"),
    (r"[^a-c]+", "abcdefabc"),
    (r"\bcat\b", "concat cat"),
    (r"a.c", "a\nc"),
    (r"(a|b)*abb", "babaabb"),
    (r"a{2,}", "aaaaa"),
    (r"[0-9]{2,3}", "12345"),
    (r"([a-z]+)@([a-z]+)\.com", "mail bob@example.com now"),
];

#[test]
fn test_many() {
    for (pattern, input) in CASES {
        utils::check_against_rust(pattern, input);
    }
}
