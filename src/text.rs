//! `cat` and `wc`.

use crate::command::CommandResult;
use crate::error::describe;
use std::fs::File;
use std::io::{self, Read};

const BUFFER_SIZE: usize = 4096;

/// `cat <file>...`
pub(crate) fn cat(args: &[String]) -> CommandResult {
    if args.is_empty() {
        return CommandResult::failure("cat: missing file operand");
    }

    let mut out = String::new();
    for name in args {
        let mut bytes = Vec::new();
        let read = File::open(name)
            .map_err(|e| format!("cat: cannot open {name}: {}", describe(&e)))
            .and_then(|mut file| {
                file.read_to_end(&mut bytes)
                    .map_err(|e| format!("cat: error reading {name}: {}", describe(&e)))
            });
        if let Err(error) = read {
            return CommandResult::failure(error);
        }
        out.push_str(&String::from_utf8_lossy(&bytes));
        out.push('\n');
    }
    out.pop();
    CommandResult::success(out)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Counts {
    lines: usize,
    words: usize,
    bytes: usize,
}

/// Counts over a stream. A last line without `\n` still counts as a line.
fn count(reader: &mut impl Read) -> io::Result<Counts> {
    let mut counts = Counts::default();
    let mut buf = [0u8; BUFFER_SIZE];
    let mut in_word = false;
    let mut last = b'\n';

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        for &b in &buf[..n] {
            counts.bytes += 1;
            if b == b'\n' {
                counts.lines += 1;
            }
            if matches!(b, b' ' | b'\t' | b'\n' | b'\r') {
                in_word = false;
            } else if !in_word {
                counts.words += 1;
                in_word = true;
            }
            last = b;
        }
    }
    if last != b'\n' {
        counts.lines += 1;
    }
    Ok(counts)
}

/// `wc [-l] [-w] [-c] <file>...`
pub(crate) fn wc(args: &[String]) -> CommandResult {
    let (mut lines, mut words, mut bytes) = (false, false, false);
    let mut idx = 0;
    while let Some(flag) = args.get(idx).filter(|a| a.starts_with('-')) {
        match flag.as_str() {
            "-l" => lines = true,
            "-w" => words = true,
            "-c" => bytes = true,
            _ => return CommandResult::failure(format!("wc: invalid option '{flag}'")),
        }
        idx += 1;
    }
    if !(lines || words || bytes) {
        (lines, words, bytes) = (true, true, true);
    }

    let files = &args[idx..];
    if files.is_empty() {
        return CommandResult::failure("wc: missing file operand");
    }

    let mut rows = Vec::with_capacity(files.len());
    for name in files {
        let counts = match File::open(name) {
            Ok(mut file) => match count(&mut file) {
                Ok(counts) => counts,
                Err(e) => {
                    return CommandResult::failure(format!(
                        "wc: error reading file '{name}': {}",
                        describe(&e)
                    ));
                }
            },
            Err(e) => {
                return CommandResult::failure(format!(
                    "wc: cannot open file '{name}': {}",
                    describe(&e)
                ));
            }
        };

        let mut row = String::new();
        for (enabled, value) in [(lines, counts.lines), (words, counts.words), (bytes, counts.bytes)] {
            if enabled {
                row.push_str(&value.to_string());
                row.push(' ');
            }
        }
        row.push_str(name);
        rows.push(row);
    }
    CommandResult::success(rows.join("\n"))
}
