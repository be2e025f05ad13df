use crate::command::{Builtin, CommandResult, Registry};
use crate::error::describe;
use crate::{fs_tree, grep, listing, mover, text};
use nix::sys::stat::{UtimensatFlags, utimensat};
use nix::sys::time::TimeSpec;
use nix::unistd::User;
use std::env;
use std::fs::{self, OpenOptions, Permissions};
use std::io;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;
use std::sync::LazyLock;

const CLEAR_SCREEN: &str = "\x1b[H\x1b[J";
const FAREWELL: &str = "[Shell Terminated]";

const HELP: &str = "\
Available Commands:
  cd [dir]                                 Change directory.
  clr                                      Clear the screen.
  dir [-a] [-A] [-l] [path]...             List directory contents.
  environ                                  Display environment variables.
  echo [text]                              Print text.
  help                                     Show help.
  pause                                    Pause shell until Enter is pressed.
  quit                                     Exit shell.
  chmod <mode> <file>                      Change permissions (octal mode).
  chown <owner> <file>...                  Change ownership.
  ls [-a] [-A] [-l] [path]...              List directory contents.
  pwd                                      Print working directory.
  cat <file>...                            Print file contents.
  mkdir [-p] <dir>...                      Create directories.
  rmdir [-p] <dir>                         Remove directory.
  rm [-r] <path>...                        Remove files or directory trees.
  cp <src>... <dst>                        Copy files.
  mv <src> <dst>                           Move or rename.
  touch <file>                             Create empty file or update its times.
  grep [-i|-n|-v|-w|-c|-o|-m N] <pattern> <file>...
                                           Search text (one option at a time).
  wc [-l] [-w] [-c] <file>...              Count lines/words/bytes.";

static REGISTRY: LazyLock<Registry> = LazyLock::new(|| {
    Registry::new([
        Builtin::new("cd", cd),
        Builtin::new("clr", clr),
        Builtin::new("dir", listing::ls),
        Builtin::new("environ", environ),
        Builtin::new("echo", echo),
        Builtin::new("help", help),
        Builtin::new("pause", pause),
        Builtin::terminating("quit", quit),
        Builtin::new("chmod", chmod),
        Builtin::new("chown", chown),
        Builtin::new("ls", listing::ls),
        Builtin::new("pwd", pwd),
        Builtin::new("cat", text::cat),
        Builtin::new("mkdir", fs_tree::mkdir),
        Builtin::new("rmdir", fs_tree::rmdir),
        Builtin::new("rm", fs_tree::rm),
        Builtin::new("cp", mover::cp),
        Builtin::new("mv", mover::mv),
        Builtin::new("touch", touch),
        Builtin::new("grep", grep::grep),
        Builtin::new("wc", text::wc),
    ])
});

/// The process-wide table of builtins, built on first use.
pub(crate) fn registry() -> &'static Registry {
    &REGISTRY
}

fn no_args(name: &str, args: &[String]) -> Result<(), CommandResult> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandResult::failure(format!(
            "{name}: this command takes no arguments"
        )))
    }
}

fn help(args: &[String]) -> CommandResult {
    if let Err(failure) = no_args("help", args) {
        return failure;
    }
    CommandResult::success(HELP)
}

fn echo(args: &[String]) -> CommandResult {
    CommandResult::success(args.join(" "))
}

/// Blocks until the user presses Enter.
fn pause(args: &[String]) -> CommandResult {
    if let Err(failure) = no_args("pause", args) {
        return failure;
    }
    let mut discard = String::new();
    match std::io::stdin().read_line(&mut discard) {
        Ok(_) => CommandResult::empty(),
        Err(e) => CommandResult::failure(format!("pause: {}", describe(&e))),
    }
}

fn quit(args: &[String]) -> CommandResult {
    if let Err(failure) = no_args("quit", args) {
        return failure;
    }
    CommandResult::success(FAREWELL)
}

fn clr(args: &[String]) -> CommandResult {
    if !args.is_empty() {
        return CommandResult::failure("clr: takes no arguments");
    }
    CommandResult::success_no_newline(CLEAR_SCREEN)
}

fn pwd(args: &[String]) -> CommandResult {
    if let Err(failure) = no_args("pwd", args) {
        return failure;
    }
    match env::current_dir() {
        Ok(dir) => CommandResult::success(dir.to_string_lossy()),
        Err(_) => CommandResult::failure("pwd: failed to get current directory"),
    }
}

fn environ(args: &[String]) -> CommandResult {
    if let Err(failure) = no_args("environ", args) {
        return failure;
    }
    let lines: Vec<String> = env::vars_os()
        .map(|(k, v)| format!("{}={}", k.to_string_lossy(), v.to_string_lossy()))
        .collect();
    CommandResult::success(lines.join("\n"))
}

fn cd(args: &[String]) -> CommandResult {
    let home = env::var("HOME").ok();
    let target = match (args, &home) {
        ([], Some(home)) => home.clone(),
        ([], None) => return CommandResult::failure("cd: HOME not set"),
        ([path], Some(home)) if path.starts_with('~') => format!("{home}{}", &path[1..]),
        ([path], _) => path.clone(),
        _ => return CommandResult::failure("cd: too many arguments"),
    };

    match env::set_current_dir(&target) {
        Ok(()) => CommandResult::empty(),
        Err(e) => CommandResult::failure(format!(
            "cd: failed to change directory: {target}: {}",
            describe(&e)
        )),
    }
}

/// Creates an empty file, or refreshes the access and modification times of an
/// existing one without touching its content.
fn touch(args: &[String]) -> CommandResult {
    let [name] = args else {
        return CommandResult::failure("touch: invalid arguments passed");
    };

    if !Path::new(name).exists() {
        return match OpenOptions::new().write(true).create(true).mode(0o644).open(name) {
            Ok(_) => CommandResult::empty(),
            Err(e) => CommandResult::failure(format!(
                "touch: cannot create file '{name}': {}",
                describe(&e)
            )),
        };
    }

    // By path, so files without read permission can be touched too.
    let now = TimeSpec::UTIME_NOW;
    match utimensat(None, name.as_str(), &now, &now, UtimensatFlags::FollowSymlink) {
        Ok(()) => CommandResult::empty(),
        Err(errno) => CommandResult::failure(format!(
            "touch: failed to update timestamps for '{name}': {}",
            describe(&io::Error::from(errno))
        )),
    }
}

fn chmod(args: &[String]) -> CommandResult {
    let [mode, file] = args else {
        return CommandResult::failure("chmod: requires exactly two arguments: permissions and file");
    };
    let mode = match u32::from_str_radix(mode, 8) {
        Ok(mode) if mode <= 0o7777 => mode,
        _ => return CommandResult::failure("chmod: invalid permissions format"),
    };

    match fs::set_permissions(file, Permissions::from_mode(mode)) {
        Ok(()) => CommandResult::empty(),
        Err(e) => CommandResult::failure(format!(
            "chmod: failed to change permissions for '{file}': {}",
            describe(&e)
        )),
    }
}

fn chown(args: &[String]) -> CommandResult {
    let (user, files) = match args {
        [] => return CommandResult::failure("chown: missing arguments"),
        [_] => return CommandResult::failure("chown: missing operand"),
        [user, files @ ..] => (user, files),
    };
    let uid = match User::from_name(user) {
        Ok(Some(user)) => user.uid.as_raw(),
        _ => return CommandResult::failure("chown: no such user found"),
    };

    for file in files {
        if let Err(e) = fs::metadata(file) {
            return CommandResult::failure(format!(
                "chown: cannot access '{file}': {}",
                describe(&e)
            ));
        }
        if let Err(e) = std::os::unix::fs::chown(file, Some(uid), None) {
            return CommandResult::failure(format!(
                "chown: failed to change owner of '{file}': {}",
                describe(&e)
            ));
        }
    }
    CommandResult::empty()
}
