//! `cp` and `mv`.

use crate::command::CommandResult;
use crate::error::{describe, is_cross_device};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const FILE_MODE: u32 = 0o644;
const CP_BUFFER: usize = 1024;
const MV_BUFFER: usize = 4096;

/// Why a bounded copy loop stopped early.
#[derive(Debug)]
enum CopyError {
    Read(io::Error),
    Write(io::Error),
    /// The destination accepted fewer bytes than were offered.
    ShortWrite,
}

/// Copies `reader` into `writer` through a fixed-size buffer.
fn copy_bounded<const N: usize>(reader: &mut impl Read, writer: &mut impl Write) -> Result<u64, CopyError> {
    let mut buf = [0u8; N];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CopyError::Read(e)),
        };
        let written = writer.write(&buf[..n]).map_err(CopyError::Write)?;
        if written != n {
            return Err(CopyError::ShortWrite);
        }
        total += n as u64;
    }
}

fn create_destination(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(FILE_MODE)
        .open(path)
}

/// `dir/<last component of src>`
fn inside(dir: &str, src: &str) -> PathBuf {
    let trimmed = src.trim_end_matches('/');
    let base = trimmed.rsplit('/').next().unwrap_or(trimmed);
    Path::new(dir).join(base)
}

fn is_dir(path: impl AsRef<Path>) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_dir())
}

/// `cp <src>... <dst>`
pub(crate) fn cp(args: &[String]) -> CommandResult {
    let (dest, sources) = match args {
        [] => return CommandResult::failure("cp: missing operand"),
        [only] => {
            return CommandResult::failure(format!(
                "cp: missing destination file operand after '{only}'"
            ));
        }
        [sources @ .., dest] => (dest.as_str(), sources),
    };

    let dest_is_dir = is_dir(dest);
    if sources.len() > 1 && !dest_is_dir {
        return CommandResult::failure(format!("cp: target '{dest}' is not a directory"));
    }

    for src in sources {
        if is_dir(src) {
            return CommandResult::failure(format!("cp: omitting directory '{src}'"));
        }
        let target = if dest_is_dir {
            inside(dest, src)
        } else {
            PathBuf::from(dest)
        };
        if let Err(error) = copy_file(Path::new(src), &target) {
            return CommandResult::failure(error);
        }
    }
    CommandResult::empty()
}

fn copy_file(src: &Path, dest: &Path) -> Result<(), String> {
    let mut input = File::open(src).map_err(|e| {
        format!(
            "cp: cannot open source file '{}': {}",
            src.display(),
            describe(&e)
        )
    })?;
    if same_file(src, dest) {
        return Err(format!(
            "cp: '{}' and '{}' are the same file",
            src.display(),
            dest.display()
        ));
    }
    let mut output = create_destination(dest).map_err(|e| {
        format!(
            "cp: cannot create destination file '{}': {}",
            dest.display(),
            describe(&e)
        )
    })?;

    match copy_bounded::<CP_BUFFER>(&mut input, &mut output) {
        Ok(_) => Ok(()),
        Err(CopyError::Read(e)) => Err(format!(
            "cp: read error on '{}': {}",
            src.display(),
            describe(&e)
        )),
        Err(CopyError::Write(e)) => Err(format!(
            "cp: write error on '{}': {}",
            dest.display(),
            describe(&e)
        )),
        Err(CopyError::ShortWrite) => {
            Err(format!("cp: write error on '{}': short write", dest.display()))
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

/// The filesystem calls `mv` depends on.
pub(crate) trait MoveOps {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// [`MoveOps`] backed by the real filesystem.
pub(crate) struct HostFs;

impl MoveOps for HostFs {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// `mv <src> <dst>`
pub(crate) fn mv(args: &[String]) -> CommandResult {
    move_with(&HostFs, args)
}

pub(crate) fn move_with(ops: &dyn MoveOps, args: &[String]) -> CommandResult {
    let [src, dest] = args else {
        return CommandResult::failure(
            "mv: requires exactly two arguments: source and destination",
        );
    };

    let target = if is_dir(dest) {
        inside(dest, src)
    } else {
        PathBuf::from(dest)
    };
    let source = Path::new(src);

    match ops.rename(source, &target) {
        Ok(()) => CommandResult::empty(),
        Err(e) if is_cross_device(&e) => copy_then_remove(ops, source, &target).into(),
        Err(e) => CommandResult::failure(format!(
            "mv: failed to move '{}' to '{}': {}",
            src,
            target.display(),
            describe(&e)
        )),
    }
}

/// Fallback for a rename across devices.
///
/// When the source cannot be removed after a successful copy, the copy stays
/// where it is and the failure says so: both files exist afterwards.
fn copy_then_remove(ops: &dyn MoveOps, src: &Path, dest: &Path) -> Result<String, String> {
    info!(src = %src.display(), dest = %dest.display(), "rename crosses devices, copying");
    if is_dir(src) {
        return Err(format!(
            "mv: cannot move directory '{}' across devices",
            src.display()
        ));
    }

    {
        let mut input = File::open(src)
            .map_err(|_| format!("mv: cannot open source file '{}'", src.display()))?;
        let mut output = create_destination(dest)
            .map_err(|_| format!("mv: cannot create destination file '{}'", dest.display()))?;
        copy_bounded::<MV_BUFFER>(&mut input, &mut output)
            .map_err(|_| format!("mv: write error while copying to '{}'", dest.display()))?;
    }

    if let Err(e) = ops.remove_file(src) {
        warn!(src = %src.display(), error = %e, "copied across devices but the source stayed");
        return Err(format!(
            "mv: copied but failed to remove original '{}'",
            src.display()
        ));
    }
    Ok(String::new())
}
