//! `ls` and its alias `dir`.

use crate::command::CommandResult;
use crate::error::describe;
use chrono::{DateTime, Local};
use nix::unistd::{Gid, Group, Uid, User};
use std::fs::{self, Metadata};
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;

#[derive(Debug, Default, Clone, Copy)]
struct Flags {
    all: bool,
    almost_all: bool,
    long: bool,
}

/// `ls [-a] [-A] [-l] [path]...`
///
/// Directory entries are sorted by name. Dot entries are hidden unless `-a`
/// (which also lists `.` and `..`) or `-A` is given.
pub(crate) fn ls(args: &[String]) -> CommandResult {
    let mut flags = Flags::default();
    let mut idx = 0;
    while let Some(flag) = args.get(idx).filter(|a| a.len() > 1 && a.starts_with('-')) {
        match flag.as_str() {
            "-a" => flags.all = true,
            "-A" => flags.almost_all = true,
            "-l" => flags.long = true,
            _ => return CommandResult::failure(format!("ls: invalid flag -- '{flag}'")),
        }
        idx += 1;
    }

    let operands: Vec<&str> = match &args[idx..] {
        [] => vec!["."],
        rest => rest.iter().map(String::as_str).collect(),
    };

    let mut sections = Vec::with_capacity(operands.len());
    for path in &operands {
        match list_one(path, flags, operands.len() > 1) {
            Ok(section) => sections.push(section),
            Err(error) => return CommandResult::failure(error),
        }
    }
    CommandResult::success(sections.join("\n"))
}

fn list_one(path: &str, flags: Flags, with_header: bool) -> Result<String, String> {
    let metadata = fs::metadata(path)
        .map_err(|e| format!("ls: cannot access '{path}': {}", describe(&e)))?;

    if !metadata.is_dir() {
        return Ok(if flags.long {
            long_line(path, &metadata)
        } else {
            path.to_string()
        });
    }

    let mut names: Vec<String> = fs::read_dir(path)
        .map_err(|e| format!("ls: cannot open directory '{path}': {}", describe(&e)))?
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| flags.all || flags.almost_all || !name.starts_with('.'))
        .collect();
    if flags.all && !flags.almost_all {
        names.push(".".to_string());
        names.push("..".to_string());
    }
    names.sort();

    let body = if flags.long {
        let mut lines = Vec::with_capacity(names.len());
        for name in &names {
            let full = Path::new(path).join(name);
            let metadata = fs::metadata(&full)
                .or_else(|_| fs::symlink_metadata(&full))
                .map_err(|e| format!("ls: cannot access '{name}': {}", describe(&e)))?;
            lines.push(long_line(name, &metadata));
        }
        lines.join("\n")
    } else {
        names.join(" ")
    };

    Ok(if with_header {
        format!("{path}:\n{body}")
    } else {
        body
    })
}

/// `drwxr-xr-x 2 user group 4096 Jan 01 12:00 name`
fn long_line(name: &str, metadata: &Metadata) -> String {
    let user = User::from_uid(Uid::from_raw(metadata.uid()))
        .ok()
        .flatten()
        .map(|u| u.name)
        .unwrap_or_else(|| metadata.uid().to_string());
    let group = Group::from_gid(Gid::from_raw(metadata.gid()))
        .ok()
        .flatten()
        .map(|g| g.name)
        .unwrap_or_else(|| metadata.gid().to_string());
    let modified = metadata
        .modified()
        .map(|t| DateTime::<Local>::from(t).format("%b %d %H:%M").to_string())
        .unwrap_or_else(|_| "?".to_string());

    format!(
        "{} {} {} {} {} {} {}",
        mode_string(metadata),
        metadata.nlink(),
        user,
        group,
        metadata.len(),
        modified,
        name
    )
}

fn mode_string(metadata: &Metadata) -> String {
    let kind = if metadata.is_dir() {
        'd'
    } else if metadata.is_symlink() {
        'l'
    } else {
        '-'
    };
    let mode = metadata.permissions().mode();
    let mut out = String::with_capacity(10);
    out.push(kind);
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}
