//! A small interactive shell whose commands are all built in.
//!
//! Every input line goes through the same pipeline: the [`lexer`] splits it into
//! tokens, the [`parser`] turns the tokens into a [`Command`](parser::Command), and
//! the [`Interpreter`] looks the command name up in an immutable registry of
//! builtins and runs the handler. Handlers never fail with a Rust error: they
//! always hand back a [`CommandResult`](command::CommandResult), which the REPL
//! renders to standard output or standard error.
//!
//! There are no pipelines, redirections, variables or external programs; the
//! shell only knows the commands listed by `help`.

mod builtin;
pub mod command;
pub mod error;
mod fs_tree;
mod grep;
mod interpreter;
pub mod lexer;
mod listing;
pub mod logging;
mod mover;
pub mod parser;
#[cfg(test)]
mod test_support;
mod text;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::{Interpreter, LoopControl};
