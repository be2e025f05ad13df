use crate::lexer::Token;
use thiserror::Error;

/// The parsed form of one input line: a command name and its arguments.
///
/// `args` never contains `name` and keeps the order of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

/// Errors that can occur while building a [`Command`] from tokens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParsingError {
    /// There was no token to use as the command name.
    #[error("empty command")]
    EmptyInput,
}

struct CommandBuilder {
    tokens: std::vec::IntoIter<Token>,
}

impl CommandBuilder {
    fn from(tokens: Vec<Token>) -> Self {
        CommandBuilder {
            tokens: tokens.into_iter(),
        }
    }

    fn build(mut self) -> Result<Command, ParsingError> {
        let name = self.tokens.next().ok_or(ParsingError::EmptyInput)?.text;
        let args = self.tokens.map(|token| token.text).collect();
        Ok(Command { name, args })
    }
}

/// Builds a [`Command`] from the tokens of one line.
///
/// The first token names the command and the rest are passed through verbatim.
/// No expansion of any kind happens here.
pub fn construct_command(tokens: Vec<Token>) -> Result<Command, ParsingError> {
    CommandBuilder::from(tokens).build()
}
