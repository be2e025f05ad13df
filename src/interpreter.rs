use crate::builtin;
use crate::command::{CommandResult, Dispatch, Registry};
use crate::error::InterpretError;
use crate::lexer;
use crate::parser::{self, Command};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, Write};
use tracing::debug;

/// Whether the REPL should read another line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

/// Runs input lines against a registry of builtins.
///
/// Example
/// ```
/// use custom_shell::Interpreter;
/// let sh = Interpreter::default();
/// let dispatch = sh.run("echo", &["hello", "world"]);
/// assert_eq!(dispatch.result().output, "hello world");
/// ```
pub struct Interpreter<'r> {
    registry: &'r Registry,
}

impl<'r> Interpreter<'r> {
    /// Create an interpreter over a custom registry.
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Lex, parse and dispatch one line.
    pub fn interpret(&self, line: &str) -> Result<Dispatch, InterpretError> {
        let tokens = lexer::split_into_tokens(line)?;
        debug!(?tokens, "lexed");
        let command = parser::construct_command(tokens)?;
        debug!(name = %command.name, args = ?command.args, "parsed");
        Ok(self.dispatch(&command))
    }

    /// Look the command up and run it. A successful run of a terminating
    /// builtin ends the session.
    pub fn dispatch(&self, command: &Command) -> Dispatch {
        let Some(builtin) = self.registry.get(&command.name) else {
            debug!(name = %command.name, "not found");
            return Dispatch::Continue(CommandResult::failure(format!(
                "{}: command not found",
                command.name
            )));
        };

        let result = (builtin.handler)(&command.args);
        debug!(name = builtin.name, status = ?result.status, "dispatched");
        if builtin.terminates && result.is_success() {
            Dispatch::Terminate(result)
        } else {
            Dispatch::Continue(result)
        }
    }

    /// Run a single command invocation by name with arguments.
    pub fn run(&self, name: &str, args: &[&str]) -> Dispatch {
        self.dispatch(&Command {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        })
    }

    /// Process one line of input, writing its result to `out` or `err`.
    pub fn handle_line(
        &self,
        line: &str,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> io::Result<LoopControl> {
        if line.trim().is_empty() {
            return Ok(LoopControl::Continue);
        }

        match self.interpret(line) {
            Ok(Dispatch::Continue(result)) => {
                render(&result, out, err)?;
                Ok(LoopControl::Continue)
            }
            Ok(Dispatch::Terminate(result)) => {
                render(&result, out, err)?;
                Ok(LoopControl::Exit)
            }
            Err(e) => {
                writeln!(err, "Error: {e}")?;
                Ok(LoopControl::Continue)
            }
        }
    }

    /// Interactive loop. Returns when a terminating builtin succeeds or input ends.
    pub fn repl(&self) -> anyhow::Result<()> {
        let mut rl = DefaultEditor::new()?;

        loop {
            match rl.readline(&prompt()) {
                Ok(line) => {
                    let control = self.handle_line(&line, &mut io::stdout(), &mut io::stderr())?;
                    io::stdout().flush()?;
                    if control == LoopControl::Exit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }

        Ok(())
    }
}

impl Default for Interpreter<'static> {
    /// An interpreter over every builtin listed by `help`.
    fn default() -> Self {
        Self::new(builtin::registry())
    }
}

/// Success goes to `out`, failure to `err`. Empty text prints nothing.
pub fn render(result: &CommandResult, out: &mut impl Write, err: &mut impl Write) -> io::Result<()> {
    if result.is_success() {
        if !result.output.is_empty() {
            out.write_all(result.output.as_bytes())?;
            if !result.suppress_trailing_newline {
                out.write_all(b"\n")?;
            }
        }
    } else if !result.error.is_empty() {
        writeln!(err, "{}", result.error)?;
    }
    Ok(())
}

fn prompt() -> String {
    let cwd = std::env::current_dir()
        .map(|dir| dir.to_string_lossy().into_owned())
        .unwrap_or_else(|_| String::from("?"));
    format!("custom-shell:{cwd}# ")
}
