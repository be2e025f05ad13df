use std::collections::HashMap;

/// Outcome of a single builtin invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
}

/// What a builtin hands back to the REPL.
///
/// Both text fields always exist, but only one of them is meaningful: `output`
/// when the status is [`Status::Success`], `error` when it is [`Status::Failure`].
/// A failure with an empty `error` is a quiet failure (e.g. `grep` without
/// matches) and renders nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub status: Status,
    pub output: String,
    pub error: String,
    /// When set, the REPL writes `output` as-is, without a trailing newline.
    pub suppress_trailing_newline: bool,
}

impl CommandResult {
    /// Successful result whose output is followed by a newline when rendered.
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            output: output.into(),
            error: String::new(),
            suppress_trailing_newline: false,
        }
    }

    /// Successful result with no output at all.
    pub fn empty() -> Self {
        Self::success(String::new())
    }

    /// Successful result rendered verbatim, without the trailing newline.
    pub fn success_no_newline(output: impl Into<String>) -> Self {
        Self {
            suppress_trailing_newline: true,
            ..Self::success(output)
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            status: Status::Failure,
            output: String::new(),
            error: error.into(),
            suppress_trailing_newline: false,
        }
    }

    /// Failure that carries no message.
    pub fn quiet_failure() -> Self {
        Self::failure(String::new())
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

impl From<Result<String, String>> for CommandResult {
    fn from(value: Result<String, String>) -> Self {
        match value {
            Ok(output) => Self::success(output),
            Err(error) => Self::failure(error),
        }
    }
}

/// Signature shared by every builtin: the arguments after the command name.
pub type Handler = fn(&[String]) -> CommandResult;

/// A registry entry.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub handler: Handler,
    /// A successful run of this builtin ends the session.
    pub terminates: bool,
}

impl Builtin {
    pub const fn new(name: &'static str, handler: Handler) -> Self {
        Self {
            name,
            handler,
            terminates: false,
        }
    }

    pub const fn terminating(name: &'static str, handler: Handler) -> Self {
        Self {
            name,
            handler,
            terminates: true,
        }
    }
}

/// Immutable mapping from command name to builtin.
///
/// Built once and only read afterwards; there is no way to add or remove
/// entries after construction.
pub struct Registry {
    commands: HashMap<&'static str, Builtin>,
}

impl Registry {
    pub fn new(builtins: impl IntoIterator<Item = Builtin>) -> Self {
        Self {
            commands: builtins.into_iter().map(|b| (b.name, b)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Builtin> {
        self.commands.get(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// What the dispatcher returns for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Render the result and read the next line.
    Continue(CommandResult),
    /// Render the result, then end the session. There is no way back.
    Terminate(CommandResult),
}

impl Dispatch {
    pub fn result(&self) -> &CommandResult {
        match self {
            Dispatch::Continue(result) | Dispatch::Terminate(result) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(_: &[String]) -> CommandResult {
        CommandResult::success("ok")
    }

    #[test]
    fn test_constructors_fill_only_the_relevant_field() {
        let s = CommandResult::success("out");
        assert_eq!(s.status, Status::Success);
        assert_eq!(s.output, "out");
        assert!(s.error.is_empty());
        assert!(!s.suppress_trailing_newline);

        let f = CommandResult::failure("bad");
        assert_eq!(f.status, Status::Failure);
        assert!(f.output.is_empty());
        assert_eq!(f.error, "bad");

        assert!(CommandResult::success_no_newline("x").suppress_trailing_newline);
        assert!(CommandResult::quiet_failure().error.is_empty());
    }

    #[test]
    fn test_registry_lookup() {
        let registry = Registry::new([Builtin::new("ok", ok), Builtin::terminating("bye", ok)]);
        assert_eq!(registry.len(), 2);
        assert!(registry.get("ok").is_some_and(|b| !b.terminates));
        assert!(registry.get("bye").is_some_and(|b| b.terminates));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_result_from_string_result() {
        assert!(CommandResult::from(Ok::<_, String>("a".to_string())).is_success());
        assert_eq!(
            CommandResult::from(Err::<String, _>("e".to_string())).error,
            "e"
        );
    }
}
