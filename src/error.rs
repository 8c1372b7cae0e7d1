use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum.
    ///
    /// In particular this means that use of Internal is never a guarantee
    /// the error is not, for example, due to a user error - merely that it
    /// cannot be confidently determined by the code.
    Internal,

    /// The caller provided invalid input or asked for something that is
    /// unsupported or impossible to complete.
    User,
}

/// Raised by [`crate::initialize`] when the host cannot provide the
/// data protection service at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum EnvironmentError {
    #[error("unsupported operating system {os:?}: data protection is only available on windows")]
    UnsupportedPlatform { os: &'static str },
}

/// Failure reported by a [`crate::DataProtector`] backend.
///
/// `code` carries the raw OS error code when the backend has one (for DPAPI
/// this is the `GetLastError()` value captured right after the failed call).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{}", code_suffix(.code))]
pub struct PlatformError {
    code: Option<i32>,
    message: String,
}

fn code_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" (os error {code})"),
        None => String::new(),
    }
}

impl PlatformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    /// The error every backend call produces on hosts without DPAPI.
    pub fn unavailable() -> Self {
        Self::new(format!(
            "data protection service is not available on {}",
            std::env::consts::OS
        ))
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors from protecting or unprotecting an in-memory buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProtectionError {
    /// A zero-length buffer was passed in. The backend is never called.
    #[error("input data cannot be empty")]
    EmptyInput,

    /// The backend refused the request: wrong machine or key context,
    /// a corrupted or foreign blob, or access denied.
    #[error("data protection service rejected the request")]
    PlatformRejected(#[source] PlatformError),
}

impl ProtectionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::EmptyInput => ErrorCategory::User,
            Self::PlatformRejected(_) => ErrorCategory::Internal,
        }
    }
}

/// Errors from the whole-file protect/unprotect round-trips.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FileProtectionError {
    #[error("failed to read from {}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encrypt contents of {}", .path.display())]
    EncryptionFailed {
        path: PathBuf,
        #[source]
        source: ProtectionError,
    },

    #[error("failed to decrypt contents of {}", .path.display())]
    DecryptionFailed {
        path: PathBuf,
        #[source]
        source: ProtectionError,
    },

    #[error("failed to write to {}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FileProtectionError {
    /// The file the failing step was working on.
    pub fn path(&self) -> &Path {
        match self {
            Self::ReadFailed { path, .. }
            | Self::EncryptionFailed { path, .. }
            | Self::DecryptionFailed { path, .. }
            | Self::WriteFailed { path, .. } => path,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ReadFailed { source, .. } => io_category(source, &[io::ErrorKind::NotFound]),
            Self::EncryptionFailed { source, .. } | Self::DecryptionFailed { source, .. } => {
                source.category()
            }
            Self::WriteFailed { source, .. } => io_category(
                source,
                &[io::ErrorKind::NotFound, io::ErrorKind::PermissionDenied],
            ),
        }
    }
}

fn io_category(err: &io::Error, user_kinds: &[io::ErrorKind]) -> ErrorCategory {
    if user_kinds.contains(&err.kind()) {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    }
}
