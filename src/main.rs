use argh::FromArgs;
use custom_shell::Interpreter;
use custom_shell::logging::init_logging;

/// An interactive shell with builtin file, text and directory commands.
#[derive(FromArgs)]
struct Options {
    /// do not print the welcome banner
    #[argh(switch, short = 'q')]
    quiet: bool,

    /// tracing filter directives, e.g. "debug" or "custom_shell=info"
    #[argh(option)]
    log: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let options: Options = argh::from_env();
    init_logging(options.log.as_deref())?;

    if !options.quiet {
        println!("|  Welcome to our Custom Shell!");
        println!("|  Type help for our list of commands!");
    }

    Interpreter::default().repl()
}
