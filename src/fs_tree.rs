//! Directory tree builtins: `rmdir`, `mkdir` and `rm`.

use crate::command::CommandResult;
use crate::error::{describe, os_message};
use std::fs::{self, DirBuilder};
use std::io::{self, ErrorKind};
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use tracing::debug;

const DIR_MODE: u32 = 0o755;

/// `rmdir [-p] <dir>`
pub(crate) fn rmdir(args: &[String]) -> CommandResult {
    let mut parents = false;
    let mut idx = 0;
    while let Some(flag) = args.get(idx).filter(|a| a.starts_with('-')) {
        match flag.as_str() {
            "-p" => parents = true,
            _ => return CommandResult::failure(format!("rmdir: unrecognized option '{flag}'")),
        }
        idx += 1;
    }

    let operands = &args[idx..];
    let path = match operands {
        [] => return CommandResult::failure("rmdir: missing operand"),
        [path] => path.as_str(),
        _ => return CommandResult::failure("rmdir: too many arguments"),
    };

    let result = if parents {
        remove_with_parents(path)
    } else {
        fs::remove_dir(path).map_err(|e| rmdir_error(path, &e))
    };
    result.map(|_| String::new()).into()
}

/// Removes `path`, then each of its ancestors until one cannot be removed.
///
/// Only a failure on `path` itself is an error.
fn remove_with_parents(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("rmdir: no path specified".to_string());
    }
    let mut current = path.trim_end_matches('/');
    if current.is_empty() {
        return Err("rmdir: refusing to remove '/'".to_string());
    }

    fs::remove_dir(current).map_err(|e| rmdir_error(current, &e))?;

    while let Some(pos) = current.rfind('/') {
        current = current[..pos].trim_end_matches('/');
        if current.is_empty() {
            break;
        }
        if let Err(e) = fs::remove_dir(current) {
            debug!(path = current, error = %e, "rmdir -p stopped at ancestor");
            break;
        }
    }
    Ok(())
}

fn rmdir_error(path: &str, err: &io::Error) -> String {
    let reason = match err.kind() {
        ErrorKind::DirectoryNotEmpty | ErrorKind::AlreadyExists => "directory not empty".to_string(),
        ErrorKind::NotFound => "no such file or directory".to_string(),
        ErrorKind::NotADirectory => "not a directory".to_string(),
        ErrorKind::PermissionDenied => "permission denied".to_string(),
        _ => os_message(err),
    };
    format!("rmdir: failed to remove '{path}': {reason}")
}

/// `mkdir [-p] <dir>...`
pub(crate) fn mkdir(args: &[String]) -> CommandResult {
    let mut parents = false;
    let mut idx = 0;
    while let Some(flag) = args.get(idx).filter(|a| a.starts_with('-')) {
        match flag.as_str() {
            "-p" => parents = true,
            _ => return CommandResult::failure(format!("mkdir: invalid option '{flag}'")),
        }
        idx += 1;
    }

    let operands = &args[idx..];
    if operands.is_empty() {
        return CommandResult::failure("mkdir: missing directory argument");
    }

    for path in operands {
        let created = if parents {
            create_with_parents(path)
        } else {
            create_dir(path).map_err(|e| mkdir_error(path, &e))
        };
        if let Err(error) = created {
            return CommandResult::failure(error);
        }
    }
    CommandResult::empty()
}

fn create_dir(path: &str) -> io::Result<()> {
    DirBuilder::new().mode(DIR_MODE).create(path)
}

/// Creates every prefix of `path` that ends at a `/`, then `path` itself.
fn create_with_parents(path: &str) -> Result<(), String> {
    let prefixes = path
        .match_indices('/')
        .map(|(pos, _)| &path[..=pos])
        .chain(std::iter::once(path))
        .filter(|prefix| !prefix.trim_matches('/').is_empty());

    for prefix in prefixes {
        match create_dir(prefix) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(mkdir_error(prefix, &e)),
        }
    }
    Ok(())
}

fn mkdir_error(path: &str, err: &io::Error) -> String {
    format!("mkdir: cannot create directory '{path}': {}", describe(err))
}

/// `rm [-r] <path>...`
pub(crate) fn rm(args: &[String]) -> CommandResult {
    if args.is_empty() {
        return CommandResult::failure("rm: missing operand");
    }

    let mut recursive = false;
    let mut idx = 0;
    while let Some(flag) = args.get(idx).filter(|a| a.starts_with('-')) {
        if !flag.contains('r') {
            return CommandResult::failure(format!("rm: invalid option '{flag}'"));
        }
        recursive = true;
        idx += 1;
        if idx == args.len() {
            return CommandResult::failure(format!("rm: missing operand after '{flag}'"));
        }
    }

    for path in &args[idx..] {
        let metadata = match fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(e) => {
                return CommandResult::failure(format!(
                    "rm: cannot access '{path}': {}",
                    describe(&e)
                ));
            }
        };

        let removed = if !metadata.is_dir() {
            remove_file(Path::new(path))
        } else if recursive {
            remove_tree(Path::new(path))
        } else {
            Err(format!("rm: '{path}' is a directory"))
        };
        if let Err(error) = removed {
            return CommandResult::failure(error);
        }
    }
    CommandResult::empty()
}

fn remove_file(path: &Path) -> Result<(), String> {
    fs::remove_file(path)
        .map_err(|e| format!("rm: cannot remove '{}': {}", path.display(), describe(&e)))
}

/// Removes a directory and everything below it, children before parents.
///
/// Work is kept on an explicit stack instead of the call stack, so the depth
/// of the tree is not limited by recursion. Symbolic links are removed, never
/// followed. The first error ends the whole operation.
fn remove_tree(root: &Path) -> Result<(), String> {
    // (directory, its children have already been queued)
    let mut pending: Vec<(PathBuf, bool)> = vec![(root.to_path_buf(), false)];

    while let Some((dir, expanded)) = pending.pop() {
        if expanded {
            fs::remove_dir(&dir).map_err(|e| {
                format!(
                    "rm: failed to remove directory '{}': {}",
                    dir.display(),
                    describe(&e)
                )
            })?;
            continue;
        }

        pending.push((dir.clone(), true));
        for child in list_dir(&dir)? {
            let is_dir = fs::symlink_metadata(&child)
                .map(|m| m.is_dir())
                .map_err(|e| format!("rm: cannot access '{}': {}", child.display(), describe(&e)))?;
            if is_dir {
                pending.push((child, false));
            } else {
                remove_file(&child)?;
            }
        }
    }
    debug!(path = %root.display(), "removed directory tree");
    Ok(())
}

/// Reads every entry of `dir` and releases the directory handle before returning.
fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, String> {
    let open_error =
        |e: io::Error| format!("rm: cannot open directory '{}': {}", dir.display(), describe(&e));
    fs::read_dir(dir)
        .map_err(open_error)?
        .map(|entry| entry.map(|e| e.path()).map_err(open_error))
        .collect()
}
