// Copyright takubokudori.
// This source code is licensed under the MIT or Apache-2.0 license.
//! Common types.
use serde::{Deserialize, Serialize};

#[derive(Debug, Eq, PartialEq, Clone, Hash)]
pub struct VmError {
    repr: Repr,
}

#[macro_export]
macro_rules! vmerr {
    (@r $x:expr) => {
        $crate::types::VmError::from($x)
    };
    ($x:expr) => {
        Err($crate::types::VmError::from($x))
    };
}

macro_rules! starts_err {
    ($s:expr, $x:expr, $y:expr) => {
        if $s.starts_with($x) {
            return VmError::from($y);
        }
    };
}

macro_rules! impl_setter {
    (@opt $(#[$meta:meta])* $name:ident: $t:ty) => {
        $(#[$meta])*
        pub fn $name<T: Into<Option<$t>>>(mut self, $name: T) -> Self {
            self.$name = $name.into();
            self
        }
    };
    ($(#[$meta:meta])* $name:ident: $t:ty) => {
        $(#[$meta])*
        pub fn $name<T: Into<$t>>(mut self, $name: T) -> Self {
            self.$name = $name.into();
            self
        }
    };
}

impl VmError {
    pub fn new(repr: Repr) -> Self { Self { repr } }

    pub fn get_repr(&self) -> &Repr { &self.repr }

    /// Returns the error kind, or `None` for unclassified errors.
    pub fn kind(&self) -> Option<&ErrorKind> {
        match &self.repr {
            Repr::Simple(x) => Some(x),
            Repr::Unknown(_) => None,
        }
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        self.kind() == Some(&ErrorKind::VmNotFound)
    }

    #[inline]
    pub fn is_timeout(&self) -> bool {
        self.kind() == Some(&ErrorKind::Timeout)
    }
}

impl std::error::Error for VmError {}

impl std::fmt::Display for VmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.repr {
            Repr::Simple(x) => x.fmt(f),
            Repr::Unknown(x) => x.fmt(f),
        }
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Hash)]
pub enum Repr {
    Simple(ErrorKind),
    Unknown(String),
}

#[derive(Debug, Eq, PartialEq, Clone, Hash)]
pub enum ErrorKind {
    /// The native libvirt client is not compiled in.
    LibraryUnavailable,
    /// The daemon is unreachable or rejected the connection.
    ConnectionFailed(String),
    VmNotFound,
    /// libvirt failed while acting on a domain.
    OperationFailed(String),
    /// A required external tool is not on PATH.
    ToolMissing(String),
    /// An external command could not be executed.
    ExecutionFailed(String),
    UnexpectedResponse(String),
    InvalidParameter(String),
    FileError(String),
    Timeout,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LibraryUnavailable => {
                write!(f, "libvirt client library is not available")
            }
            Self::ConnectionFailed(x) => {
                write!(f, "Failed to connect to libvirt: {}", x)
            }
            Self::VmNotFound => write!(f, "VM not found"),
            Self::OperationFailed(x) => write!(f, "Operation failed: {}", x),
            Self::ToolMissing(x) => write!(f, "{} not found", x),
            Self::ExecutionFailed(x) => write!(f, "Execution failed: {}", x),
            Self::UnexpectedResponse(x) => {
                write!(f, "Unexpected response: {}", x)
            }
            Self::InvalidParameter(x) => write!(f, "Invalid parameter: {}", x),
            Self::FileError(x) => write!(f, "File error: {}", x),
            Self::Timeout => write!(f, "Operation timed out"),
        }
    }
}

impl From<Repr> for VmError {
    fn from(repr: Repr) -> Self { Self { repr } }
}

impl From<ErrorKind> for VmError {
    fn from(e: ErrorKind) -> Self {
        Self {
            repr: Repr::Simple(e),
        }
    }
}

pub type VmResult<T> = Result<T, VmError>;

/// Runtime state of a libvirt domain.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash, Serialize, Deserialize)]
pub enum DomainState {
    NoState,
    Running,
    Blocked,
    Paused,
    Shutdown,
    ShutOff,
    Crashed,
    Unknown,
}

impl DomainState {
    /// Maps a raw `virDomainState` value. Values outside the known range,
    /// including pm-suspended, become `Unknown`.
    pub fn from_raw(state: u32) -> Self {
        match state {
            0 => Self::NoState,
            1 => Self::Running,
            2 => Self::Blocked,
            3 => Self::Paused,
            4 => Self::Shutdown,
            5 => Self::ShutOff,
            6 => Self::Crashed,
            _ => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NoState => "No state",
            Self::Running => "Running",
            Self::Blocked => "Blocked",
            Self::Paused => "Paused",
            Self::Shutdown => "Shutdown",
            Self::ShutOff => "Shut off",
            Self::Crashed => "Crashed",
            Self::Unknown => "Unknown",
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool { *self == Self::Running }
}

impl std::fmt::Display for DomainState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.label().fmt(f)
    }
}

/// A domain and the state it reported when queried.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct DomainStatus {
    pub name: String,
    pub state: DomainState,
}

/// What a lifecycle request did.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash, Serialize, Deserialize)]
pub enum LifecycleOutcome {
    Started,
    AlreadyRunning,
    /// A graceful shutdown was requested. Completion is not awaited.
    ShutdownInitiated,
    Destroyed,
    AlreadyStopped,
}

impl LifecycleOutcome {
    /// Returns `true` if the daemon was not asked to change the domain state.
    #[inline]
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::AlreadyRunning | Self::AlreadyStopped)
    }
}

pub trait PowerCmd {
    /// Starts a VM. Does not wait for the guest to boot.
    fn start(&self, name: &str) -> VmResult<LifecycleOutcome>;
    /// Requests a graceful shutdown of a VM.
    fn stop(&self, name: &str) -> VmResult<LifecycleOutcome>;
    /// Powers off a VM immediately.
    fn hard_stop(&self, name: &str) -> VmResult<LifecycleOutcome>;
    fn is_running(&self, name: &str) -> VmResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_state_labels() {
        assert_eq!("No state", DomainState::from_raw(0).label());
        assert_eq!("Running", DomainState::from_raw(1).label());
        assert_eq!("Blocked", DomainState::from_raw(2).label());
        assert_eq!("Paused", DomainState::from_raw(3).label());
        assert_eq!("Shutdown", DomainState::from_raw(4).label());
        assert_eq!("Shut off", DomainState::from_raw(5).label());
        assert_eq!("Crashed", DomainState::from_raw(6).label());
        assert_eq!("Unknown", DomainState::from_raw(7).label());
        assert_eq!("Unknown", DomainState::from_raw(u32::MAX).label());
    }

    #[test]
    fn test_error_kind() {
        let e: VmResult<()> = vmerr!(ErrorKind::VmNotFound);
        let e = e.unwrap_err();
        assert!(e.is_not_found());
        assert!(!e.is_timeout());
        assert_eq!("VM not found", e.to_string());
        let e = VmError::from(Repr::Unknown("boom".to_string()));
        assert_eq!(None, e.kind());
    }
}
