//! `grep`: a streaming, regex-based line filter.
//!
//! Exactly one option may be given per invocation. Files are read in small
//! fixed-size chunks and split into lines on `\n`, so memory use does not depend
//! on the size of the input, only on the length of its longest line.

use crate::command::CommandResult;
use crate::error::describe;
use regex::{Regex, RegexBuilder};
use std::fs::File;
use std::io::{self, Read};
use std::ops::ControlFlow;
use tracing::debug;

const CHUNK_SIZE: usize = 1024;

/// The single option selected for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Options {
    ignore_case: bool,
    line_number: bool,
    invert: bool,
    word_regexp: bool,
    count: bool,
    only_matching: bool,
    max_count: Option<usize>,
}

#[derive(Debug, PartialEq, Eq)]
struct Invocation<'a> {
    options: Options,
    pattern: &'a str,
    files: &'a [String],
}

fn parse_args(args: &[String]) -> Result<Invocation<'_>, String> {
    if args.len() < 2 {
        return Err("grep: missing arguments".to_string());
    }

    let mut options = Options::default();
    let mut idx = 0;
    let mut seen_flag = false;

    while let Some(flag) = args.get(idx).filter(|a| a.starts_with('-')) {
        if seen_flag {
            return Err("grep: only one flag can be used at a time".to_string());
        }
        seen_flag = true;

        match flag.as_str() {
            "-i" => options.ignore_case = true,
            "-n" => options.line_number = true,
            "-v" => options.invert = true,
            "-w" => options.word_regexp = true,
            "-c" => options.count = true,
            "-o" => options.only_matching = true,
            "-m" => {
                idx += 1;
                let raw = args
                    .get(idx)
                    .ok_or_else(|| "grep: missing argument for -m".to_string())?;
                let max = raw
                    .parse::<usize>()
                    .map_err(|_| format!("grep: invalid max count '{raw}'"))?;
                options.max_count = Some(max);
            }
            // Not an option after all: this is the pattern.
            _ => break,
        }
        idx += 1;
    }

    let pattern = args
        .get(idx)
        .ok_or_else(|| "grep: missing pattern".to_string())?;
    let files = &args[idx + 1..];
    if files.is_empty() {
        return Err("grep: missing file operand".to_string());
    }

    Ok(Invocation {
        options,
        pattern,
        files,
    })
}

fn compile(pattern: &str, options: &Options) -> Result<Regex, String> {
    let source = if options.word_regexp {
        format!(r"\b{pattern}\b")
    } else {
        pattern.to_string()
    };
    RegexBuilder::new(&source)
        .case_insensitive(options.ignore_case)
        .build()
        .map_err(|e| {
            debug!(pattern = %source, error = %e, "rejected grep pattern");
            format!("grep: invalid regex '{pattern}'")
        })
}

/// Matching state shared across all files of one invocation.
struct Scan<'a> {
    re: Regex,
    options: Options,
    show_file_names: bool,
    matches: usize,
    out: String,
    file: &'a str,
}

impl Scan<'_> {
    /// Handles one complete line.
    ///
    /// Breaks as soon as the running match count goes past `-m`; the line that
    /// crosses the limit contributes nothing.
    fn line(&mut self, number: usize, line: &str) -> ControlFlow<()> {
        let found = self.re.find(line);
        if found.is_some() == self.options.invert {
            return ControlFlow::Continue(());
        }

        self.matches += 1;
        if self.options.max_count.is_some_and(|max| self.matches > max) {
            return ControlFlow::Break(());
        }
        if self.options.count {
            return ControlFlow::Continue(());
        }

        if self.show_file_names {
            self.out.push_str(self.file);
            self.out.push(':');
        }
        if self.options.line_number {
            self.out.push_str(&number.to_string());
            self.out.push(':');
        }
        // With -v there is never a match to print, so the whole line goes out.
        match found {
            Some(m) if self.options.only_matching => self.out.push_str(m.as_str()),
            _ => self.out.push_str(line),
        }
        self.out.push('\n');
        ControlFlow::Continue(())
    }

    /// Streams `reader` chunk by chunk, feeding every line to [`Scan::line`].
    fn stream(&mut self, reader: &mut impl Read) -> io::Result<ControlFlow<()>> {
        let mut chunk = [0u8; CHUNK_SIZE];
        let mut pending: Vec<u8> = Vec::new();
        // Bytes of `pending` already known to hold no '\n'.
        let mut searched = 0;
        let mut number = 0;

        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            pending.extend_from_slice(&chunk[..n]);

            let mut start = 0;
            while let Some(offset) = pending[searched..].iter().position(|&b| b == b'\n') {
                let end = searched + offset;
                number += 1;
                let line = String::from_utf8_lossy(&pending[start..end]);
                if self.line(number, &line).is_break() {
                    return Ok(ControlFlow::Break(()));
                }
                start = end + 1;
                searched = start;
            }
            pending.drain(..start);
            searched = pending.len();
        }

        if !pending.is_empty() {
            number += 1;
            let line = String::from_utf8_lossy(&pending);
            return Ok(self.line(number, &line));
        }
        Ok(ControlFlow::Continue(()))
    }
}

fn finish(mut out: String) -> CommandResult {
    if out.ends_with('\n') {
        out.pop();
    }
    CommandResult::success(out)
}

/// `grep [-i|-n|-v|-w|-c|-o|-m N] <pattern> <file>...`
pub(crate) fn grep(args: &[String]) -> CommandResult {
    let invocation = match parse_args(args) {
        Ok(invocation) => invocation,
        Err(error) => return CommandResult::failure(error),
    };
    let options = invocation.options;
    let re = match compile(invocation.pattern, &options) {
        Ok(re) => re,
        Err(error) => return CommandResult::failure(error),
    };

    let mut scan = Scan {
        re,
        options,
        show_file_names: invocation.files.len() > 1,
        matches: 0,
        out: String::new(),
        file: "",
    };

    for file in invocation.files {
        // Output gathered from earlier files is dropped when a later one
        // cannot be opened.
        let mut handle = match File::open(file) {
            Ok(handle) => handle,
            Err(_) => return CommandResult::failure(format!("grep: cannot open file '{file}'")),
        };
        // A directory opens fine but has no lines to offer.
        if handle.metadata().is_ok_and(|m| m.is_dir()) {
            debug!(file = %file, "grep skipping directory operand");
            continue;
        }
        scan.file = file;
        match scan.stream(&mut handle) {
            Ok(ControlFlow::Continue(())) => {}
            Ok(ControlFlow::Break(())) => {
                debug!(limit = ?options.max_count, "grep stopped at max count");
                return finish(scan.out);
            }
            Err(e) => {
                return CommandResult::failure(format!(
                    "grep: error reading '{file}': {}",
                    describe(&e)
                ));
            }
        }
    }

    if options.count {
        return CommandResult::success(scan.matches.to_string());
    }
    if scan.matches == 0 {
        return CommandResult::quiet_failure();
    }
    finish(scan.out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Status;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::{TempDir, tempdir};

    fn fixture(content: &str) -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.txt");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    fn arg(p: &Path) -> String {
        p.to_string_lossy().to_string()
    }

    fn run(flags: &[&str], pattern: &str, files: &[&Path]) -> CommandResult {
        let mut args: Vec<String> = flags.iter().map(|s| s.to_string()).collect();
        args.push(pattern.to_string());
        args.extend(files.iter().map(|p| arg(p)));
        grep(&args)
    }

    const EIGHT_LINES: &str = "foo one\nbar\nfoo two\nbaz\nqux\nfoo three\nquux\ncorge\n";

    #[test]
    fn test_plain_match_prints_whole_lines() {
        let (_dir, path) = fixture(EIGHT_LINES);
        let res = run(&[], "foo", &[&path]);
        assert!(res.is_success());
        assert_eq!(res.output, "foo one\nfoo two\nfoo three");
    }

    #[test]
    fn test_count_reports_total() {
        let (_dir, path) = fixture(EIGHT_LINES);
        let res = run(&["-c"], "foo", &[&path]);
        assert_eq!(res.status, Status::Success);
        assert_eq!(res.output, "3");

        let res = run(&["-c"], "nothing", &[&path]);
        assert_eq!(res.status, Status::Success);
        assert_eq!(res.output, "0");
    }

    #[test]
    fn test_count_sums_over_all_files() {
        let (dir, first) = fixture(EIGHT_LINES);
        let second = dir.path().join("second.txt");
        fs::write(&second, "foo four
nope
foo five").unwrap();

        let res = run(&["-c"], "foo", &[&first, &second]);
        assert_eq!(res.status, Status::Success);
        assert_eq!(res.output, "5");
    }

    #[test]
    fn test_directory_operand_counts_as_empty() {
        let (dir, path) = fixture(EIGHT_LINES);
        let res = run(&[], "foo one", &[dir.path(), &path]);
        assert!(res.is_success(), "{}", res.error);
        assert_eq!(res.output, format!("{}:foo one", arg(&path)));

        let res = run(&[], "foo", &[dir.path()]);
        assert_eq!(res.status, Status::Failure);
        assert!(res.error.is_empty());
    }

    #[test]
    fn test_max_count_stops_early() {
        let (_dir, path) = fixture("foo 1\nfoo 2\nfoo 3\nfoo 4\n");
        let res = run(&["-m", "2"], "foo", &[&path]);
        assert!(res.is_success());
        assert_eq!(res.output, "foo 1\nfoo 2");

        let res = run(&["-m", "0"], "foo", &[&path]);
        assert!(res.is_success());
        assert_eq!(res.output, "");
    }

    #[test]
    fn test_max_count_spans_files() {
        let (dir, first) = fixture("foo a\nfoo b\n");
        let second = dir.path().join("second.txt");
        fs::write(&second, "foo c\nfoo d\n").unwrap();
        let res = run(&["-m", "3"], "foo", &[&first, &second]);
        let expected = format!(
            "{0}:foo a\n{0}:foo b\n{1}:foo c",
            arg(&first),
            arg(&second)
        );
        assert_eq!(res.output, expected);
    }

    #[test]
    fn test_no_match_is_quiet_failure() {
        let (dir, path) = fixture(EIGHT_LINES);
        let res = run(&[], "zzz", &[&path]);
        assert_eq!(res.status, Status::Failure);
        assert_eq!(res.error, "");

        let missing = dir.path().join("missing_file");
        let res = run(&[], "zzz", &[&missing]);
        assert_eq!(res.status, Status::Failure);
        assert_eq!(res.error, format!("grep: cannot open file '{}'", arg(&missing)));
    }

    #[test]
    fn test_open_failure_discards_earlier_output() {
        let (dir, path) = fixture("foo\n");
        let missing = dir.path().join("missing");
        let res = run(&[], "foo", &[&path, &missing]);
        assert_eq!(res.status, Status::Failure);
        assert!(res.output.is_empty());
    }

    #[test]
    fn test_ignore_case_and_word() {
        let (_dir, path) = fixture("Target 1\nTaRgEt 2\ntargets 3\nNo match\n");
        let res = run(&["-i"], "target", &[&path]);
        assert_eq!(res.output, "Target 1\nTaRgEt 2\ntargets 3");

        let res = run(&["-w"], "targets", &[&path]);
        assert_eq!(res.output, "targets 3");
        let res = run(&["-w"], "target", &[&path]);
        assert_eq!(res.status, Status::Failure);
    }

    #[test]
    fn test_line_numbers_and_file_prefixes() {
        let (dir, first) = fixture("alpha\nbeta\n");
        let second = dir.path().join("other.txt");
        fs::write(&second, "gamma\nbeta again").unwrap();

        let res = run(&["-n"], "beta", &[&first, &second]);
        let expected = format!("{}:2:beta\n{}:2:beta again", arg(&first), arg(&second));
        assert_eq!(res.output, expected);
    }

    #[test]
    fn test_invert_prints_whole_lines() {
        let (_dir, path) = fixture("keep\ndrop me\nkeep too\n");
        let res = run(&["-v"], "drop", &[&path]);
        assert_eq!(res.output, "keep\nkeep too");
    }

    #[test]
    fn test_only_matching() {
        let (_dir, path) = fixture("id=42 and id=7\nnone\nid=1000\n");
        let res = run(&["-o"], "id=[0-9]+", &[&path]);
        assert_eq!(res.output, "id=42\nid=1000");
    }

    #[test]
    fn test_final_line_without_newline_and_long_lines() {
        let long = "y".repeat(3000);
        let content = format!("{long}needle{long}\nother\nlast needle");
        let (_dir, path) = fixture(&content);
        let res = run(&["-n"], "needle", &[&path]);
        let expected = format!("1:{long}needle{long}\n3:last needle");
        assert_eq!(res.output, expected);
    }

    /// Hands out at most `step` bytes per read.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_lines_split_across_short_reads() {
        let long = "z".repeat(5000);
        let content = format!("ab\n{long}hit\n\ncd hit\ntail");
        let mut scan = Scan {
            re: compile("hit", &Options::default()).unwrap(),
            options: Options {
                line_number: true,
                ..Options::default()
            },
            show_file_names: false,
            matches: 0,
            out: String::new(),
            file: "",
        };
        let mut reader = Trickle {
            data: content.as_bytes(),
            step: 7,
        };

        assert!(scan.stream(&mut reader).unwrap().is_continue());
        assert_eq!(scan.matches, 2);
        assert_eq!(scan.out, format!("2:{long}hit\n4:cd hit\n"));
    }

    #[test]
    fn test_rejects_flag_combinations_and_bad_input() {
        let (_dir, path) = fixture("x\n");
        assert_eq!(
            run(&["-i", "-n"], "x", &[&path]).error,
            "grep: only one flag can be used at a time"
        );
        assert_eq!(
            run(&["-m", "lots"], "x", &[&path]).error,
            "grep: invalid max count 'lots'"
        );
        assert_eq!(run(&[], "(", &[&path]).error, "grep: invalid regex '('");
        assert_eq!(grep(&["x".to_string()]).error, "grep: missing arguments");
        assert_eq!(
            grep(&["-c".to_string(), "x".to_string()]).error,
            "grep: missing file operand"
        );
        assert_eq!(
            grep(&["-m".to_string(), "3".to_string()]).error,
            "grep: missing pattern"
        );
        assert_eq!(
            grep(&["-i".to_string(), "-m".to_string()]).error,
            "grep: only one flag can be used at a time"
        );
    }

    #[test]
    fn test_unknown_dash_token_is_the_pattern() {
        let (_dir, path) = fixture("a -x b\nplain\n");
        let res = run(&[], "-x", &[&path]);
        assert_eq!(res.output, "a -x b");
    }

    #[test]
    fn test_parse_args_consumes_max_count_value() {
        let args: Vec<String> = ["-m", "5", "pat", "f1", "f2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let invocation = parse_args(&args).unwrap();
        assert_eq!(invocation.options.max_count, Some(5));
        assert_eq!(invocation.pattern, "pat");
        assert_eq!(invocation.files, &args[3..]);
    }
}
