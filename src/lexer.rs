//! Lexical analysis of a single input line.
//!
//! The grammar is deliberately small:
//!
//! * runs of whitespace separate tokens;
//! * `'...'` keeps everything up to the closing quote literally;
//! * `"..."` keeps everything literally, except that `\` escapes the next character;
//! * outside quotes, `\` escapes the next character;
//! * quoted and unquoted pieces that touch form one token (`a"b c"d` is `ab cd`).
//!
//! Nothing else is special: `|`, `>`, `<`, `=` or `$` are plain text.

use thiserror::Error;

/// Distinguishes plain words from words built (at least partly) from quoted spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Quoted,
}

/// A single token of the input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn word(text: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Word,
            text: text.into(),
        }
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Quoted,
            text: text.into(),
        }
    }
}

/// Errors that can occur during the lexical analysis process.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LexingError {
    /// A closing quote (single or double) was not found.
    #[error("unterminated {0} quote")]
    UnfinishedQuote(&'static str),
    /// The line ends with a backslash that has nothing to escape.
    #[error("trailing backslash escapes nothing")]
    DanglingEscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingSingleQuote,
    ReadingDoubleQuote,
}

struct LexingFSM<'a> {
    input: std::str::Chars<'a>,
    state: LexingState,
    buffer: String,
    quoted: bool,
}

impl<'a> LexingFSM<'a> {
    fn new(line: &'a str) -> Self {
        LexingFSM {
            input: line.chars(),
            state: LexingState::Start,
            buffer: String::new(),
            quoted: false,
        }
    }

    /// Runs the machine over the whole line.
    fn make_tokens(mut self) -> Result<Vec<Token>, LexingError> {
        let mut out = Vec::new();

        while let Some(ch) = self.input.next() {
            match self.state {
                LexingState::Start => self.handle_start(ch)?,
                LexingState::ReadingWord => self.handle_word(ch, &mut out)?,
                LexingState::ReadingSingleQuote => self.handle_single_quote(ch),
                LexingState::ReadingDoubleQuote => self.handle_double_quote(ch)?,
            }
        }

        match self.state {
            LexingState::ReadingSingleQuote => Err(LexingError::UnfinishedQuote("single")),
            LexingState::ReadingDoubleQuote => Err(LexingError::UnfinishedQuote("double")),
            LexingState::ReadingWord => {
                self.finish_token(&mut out);
                Ok(out)
            }
            LexingState::Start => Ok(out),
        }
    }

    fn handle_start(&mut self, ch: char) -> Result<(), LexingError> {
        if ch.is_whitespace() {
            return Ok(());
        }
        self.state = LexingState::ReadingWord;
        self.read_unquoted(ch)
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<Token>) -> Result<(), LexingError> {
        if ch.is_whitespace() {
            self.finish_token(out);
            self.state = LexingState::Start;
            return Ok(());
        }
        self.read_unquoted(ch)
    }

    fn read_unquoted(&mut self, ch: char) -> Result<(), LexingError> {
        match ch {
            '\'' => {
                self.quoted = true;
                self.state = LexingState::ReadingSingleQuote;
            }
            '"' => {
                self.quoted = true;
                self.state = LexingState::ReadingDoubleQuote;
            }
            '\\' => {
                let escaped = self.input.next().ok_or(LexingError::DanglingEscape)?;
                self.buffer.push(escaped);
            }
            c => self.buffer.push(c),
        }
        Ok(())
    }

    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => self.state = LexingState::ReadingWord,
            c => self.buffer.push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) -> Result<(), LexingError> {
        match ch {
            '"' => self.state = LexingState::ReadingWord,
            '\\' => {
                let escaped = self
                    .input
                    .next()
                    .ok_or(LexingError::UnfinishedQuote("double"))?;
                self.buffer.push(escaped);
            }
            c => self.buffer.push(c),
        }
        Ok(())
    }

    fn finish_token(&mut self, out: &mut Vec<Token>) {
        let text = std::mem::take(&mut self.buffer);
        let kind = if std::mem::take(&mut self.quoted) {
            TokenKind::Quoted
        } else {
            TokenKind::Word
        };
        out.push(Token { kind, text });
    }
}

/// Splits `line` into tokens.
///
/// Returns an empty vector for a blank line; callers decide whether that is an
/// error.
pub fn split_into_tokens(line: &str) -> Result<Vec<Token>, LexingError> {
    LexingFSM::new(line).make_tokens()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(line: &str) -> Vec<String> {
        split_into_tokens(line)
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_splits_on_whitespace_runs() {
        assert_eq!(texts("  ls   -a\tdir  "), vec!["ls", "-a", "dir"]);
        assert!(split_into_tokens("   \t ").unwrap().is_empty());
    }

    #[test]
    fn test_quoted_span_keeps_whitespace() {
        let tokens = split_into_tokens("grep \"two  words\" 'a b' file").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::word("grep"),
                Token::quoted("two  words"),
                Token::quoted("a b"),
                Token::word("file"),
            ]
        );
    }

    #[test]
    fn test_adjacent_pieces_join() {
        assert_eq!(texts("a\"b c\"d'e'"), vec!["ab cde"]);
        assert_eq!(split_into_tokens("\"\"").unwrap(), vec![Token::quoted("")]);
    }

    #[test]
    fn test_backslash_escapes() {
        assert_eq!(texts(r"my\ file"), vec!["my file"]);
        assert_eq!(texts(r#""say \"hi\"""#), vec![r#"say "hi""#]);
        assert_eq!(texts(r"'no\escape'"), vec![r"no\escape"]);
    }

    #[test]
    fn test_operators_are_plain_text() {
        assert_eq!(texts("echo a|b > c <d $x"), vec!["echo", "a|b", ">", "c", "<d", "$x"]);
    }

    #[test]
    fn test_unterminated_quotes_fail() {
        assert_eq!(
            split_into_tokens("echo 'oops"),
            Err(LexingError::UnfinishedQuote("single"))
        );
        assert_eq!(
            split_into_tokens("echo \"oops"),
            Err(LexingError::UnfinishedQuote("double"))
        );
        assert_eq!(
            split_into_tokens("echo \"oops\\"),
            Err(LexingError::UnfinishedQuote("double"))
        );
        assert_eq!(split_into_tokens("echo \\"), Err(LexingError::DanglingEscape));
    }
}
