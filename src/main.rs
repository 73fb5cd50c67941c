use std::io::{self, BufRead, Write};

use bstr::ByteSlice;
use lazyrx::{Builder, Regex, Syntax};

fn prompt(text: &str) -> io::Result<Option<Vec<u8>>> {
    print!("{text}");
    io::stdout().flush()?;
    let mut line = Vec::new();
    if io::stdin().lock().read_until(b'\n', &mut line)? == 0 {
        return Ok(None);
    }
    while line.last().is_some_and(|&c| c == b'\n' || c == b'\r') {
        line.pop();
    }
    Ok(Some(line))
}

fn report(regex: &Regex, subject: &[u8]) {
    match regex.find_captures(subject) {
        Ok(Some(caps)) => {
            println!("Matched!");
            for (i, group) in caps.iter().enumerate() {
                match group {
                    Some(m) => println!("Group {i}: {:?} {:?}", m.range(), m.as_bstr()),
                    None => println!("Group {i}: None"),
                }
            }
        }
        Ok(None) => println!("No match."),
        Err(e) => println!("Match error: {e}"),
    }
}

fn main() -> io::Result<()> {
    env_logger::init();

    println!("lazyrx REPL");
    println!("Type an empty pattern to exit, :syntax <name> to switch syntax.");
    let mut syntax = Syntax::default();

    while let Some(pattern) = prompt("regex> ")? {
        if pattern.is_empty() {
            break;
        }
        if let Some(name) = pattern.strip_prefix(b":syntax ") {
            match Syntax::preset(&name.to_str_lossy()) {
                Some(s) => syntax = s,
                None => println!("Unknown syntax {:?}", name.as_bstr()),
            }
            continue;
        }

        let regex = match Builder::bytes(&pattern).syntax(syntax).build() {
            Ok(regex) => regex,
            Err(e) => {
                println!("Compile error: {e}");
                continue;
            }
        };

        println!("Type :q to go back to the regex prompt, :stats for cache counters.");
        while let Some(input) = prompt("input> ")? {
            match input.as_slice() {
                b":q" => break,
                b":stats" => println!("{:?}", regex.cache_stats()),
                subject => report(&regex, subject),
            }
        }
    }
    Ok(())
}
