//! Tracer error taxonomy.
//!
//! Every registration failure is local and atomic: nothing is installed or
//! published unless the whole pipeline succeeded. At the control-file
//! boundary errors are reported as errno values.

use alloc::string::String;
use axerrno::LinuxError;

use crate::hook::HookError;

/// Error types for tracer operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Control write did not parse into `<target> <hex-offset> <callback>`.
    MalformedCommand,
    /// Target or callback name could not be resolved to an address.
    UnresolvedSymbol(String),
    /// The instrumentation layer refused to install the hook.
    HookInstallFailed(HookError),
    /// Out of memory while building a probe.
    AllocationFailed,
    /// Copying data to the caller's buffer faulted.
    TransferFault,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MalformedCommand => {
                write!(f, "malformed command, expected <target> <hex-offset> <callback>")
            }
            Self::UnresolvedSymbol(name) => write!(f, "cannot resolve symbol {}", name),
            Self::HookInstallFailed(err) => write!(f, "hook installation failed: {}", err),
            Self::AllocationFailed => write!(f, "out of memory"),
            Self::TransferFault => write!(f, "buffer transfer faulted"),
        }
    }
}

impl core::error::Error for Error {}

impl From<HookError> for Error {
    fn from(err: HookError) -> Self {
        match err {
            HookError::OutOfMemory => Self::AllocationFailed,
            other => Self::HookInstallFailed(other),
        }
    }
}

impl From<Error> for LinuxError {
    fn from(err: Error) -> Self {
        match err {
            Error::MalformedCommand => LinuxError::EIO,
            Error::UnresolvedSymbol(_) => LinuxError::EINVAL,
            Error::HookInstallFailed(_) => LinuxError::EINVAL,
            Error::AllocationFailed => LinuxError::ENOMEM,
            Error::TransferFault => LinuxError::EIO,
        }
    }
}
