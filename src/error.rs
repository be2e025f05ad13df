//! Error types for line interpretation and the text used for OS failures.
//!
//! Interpretation errors (a line that cannot be tokenized or parsed) are real
//! Rust errors and surface at the top level as `Error: ...`. Command errors are
//! not: builtins turn every [`io::Error`] into a message with [`describe`] or
//! [`os_message`] and return an ordinary failed
//! [`CommandResult`](crate::command::CommandResult).

use crate::lexer::LexingError;
use crate::parser::ParsingError;
use nix::errno::Errno;
use std::io::{self, ErrorKind};
use thiserror::Error;

/// Failure to turn an input line into a command.
#[derive(Debug, Error)]
pub enum InterpretError {
    #[error(transparent)]
    Lex(#[from] LexingError),
    #[error(transparent)]
    Parse(#[from] ParsingError),
}

/// The system's own description of `err`, without the `(os error N)` suffix.
pub fn os_message(err: &io::Error) -> String {
    match err.raw_os_error() {
        Some(code) => Errno::from_raw(code).desc().to_string(),
        None => err.to_string(),
    }
}

/// Curated wording for the common failures, the raw system text otherwise.
pub fn describe(err: &io::Error) -> String {
    let text = match err.kind() {
        ErrorKind::NotFound => "no such file or directory",
        ErrorKind::DirectoryNotEmpty => "directory not empty",
        ErrorKind::NotADirectory => "not a directory",
        ErrorKind::IsADirectory => "is a directory",
        ErrorKind::PermissionDenied => "permission denied",
        ErrorKind::AlreadyExists => "file exists",
        ErrorKind::CrossesDevices => "invalid cross-device link",
        _ => return os_message(err),
    };
    text.to_string()
}

/// Whether `err` reports that source and destination live on different devices.
pub fn is_cross_device(err: &io::Error) -> bool {
    err.kind() == ErrorKind::CrossesDevices || err.raw_os_error() == Some(Errno::EXDEV as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_curated_kinds() {
        assert_eq!(
            describe(&io::Error::from_raw_os_error(Errno::ENOENT as i32)),
            "no such file or directory"
        );
        assert_eq!(
            describe(&io::Error::from_raw_os_error(Errno::ENOTEMPTY as i32)),
            "directory not empty"
        );
        assert_eq!(
            describe(&io::Error::from_raw_os_error(Errno::EACCES as i32)),
            "permission denied"
        );
        assert_eq!(
            describe(&io::Error::from(ErrorKind::CrossesDevices)),
            "invalid cross-device link"
        );
    }

    #[test]
    fn test_describe_falls_back_to_system_text() {
        let err = io::Error::from_raw_os_error(Errno::EROFS as i32);
        let text = describe(&err);
        assert_eq!(text, "Read-only file system");
    }

    #[test]
    fn test_os_message_without_errno_keeps_text() {
        let err = io::Error::other("custom failure (os error 5)");
        assert_eq!(os_message(&err), "custom failure (os error 5)");
        assert_eq!(
            os_message(&io::Error::from_raw_os_error(Errno::EROFS as i32)),
            "Read-only file system"
        );
    }

    #[test]
    fn test_cross_device_detection() {
        assert!(is_cross_device(&io::Error::from_raw_os_error(Errno::EXDEV as i32)));
        assert!(is_cross_device(&io::Error::from(ErrorKind::CrossesDevices)));
        assert!(!is_cross_device(&io::Error::from(ErrorKind::NotFound)));
    }
}
