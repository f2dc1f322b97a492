// Copyright takubokudori.
// This source code is licensed under the MIT or Apache-2.0 license.
//! libvirt controllers.
//!
//! A [`Connector`] opens [`Connection`]s to the daemon. The native client is
//! in [`native`] and only built with the `libvirt` feature; everything else
//! works against the traits so another client can be plugged in.
pub mod lifecycle;
pub mod native;

pub use lifecycle::*;

use crate::types::*;
use std::sync::Arc;

/// A domain handle obtained from an open connection.
pub trait Domain: Send {
    fn name(&self) -> VmResult<String>;
    fn state(&self) -> VmResult<DomainState>;
    fn is_active(&self) -> VmResult<bool>;
    /// Starts the domain.
    fn create(&self) -> VmResult<()>;
    /// Requests a graceful shutdown. Returns once the request is accepted.
    fn shutdown(&self) -> VmResult<()>;
    /// Powers the domain off immediately.
    fn destroy(&self) -> VmResult<()>;
}

/// An open handle to the hypervisor daemon.
pub trait Connection: Send {
    fn list_all_domains(&self) -> VmResult<Vec<Box<dyn Domain>>>;
    /// Fails with [`ErrorKind::VmNotFound`] if no domain is named `name`.
    fn lookup_by_name(&self, name: &str) -> VmResult<Box<dyn Domain>>;
    fn close(&mut self) -> VmResult<()>;
}

/// The capability of opening connections to a hypervisor.
pub trait Connector: Send + Sync {
    fn open(&self, uri: &str) -> VmResult<Box<dyn Connection>>;
}

/// Classifies a libvirt error message.
#[cfg_attr(not(feature = "libvirt"), allow(dead_code))]
pub(crate) fn handle_error(s: &str) -> VmError {
    starts_err!(s, "Domain not found", ErrorKind::VmNotFound);
    if s.contains("no domain with matching name") {
        return VmError::from(ErrorKind::VmNotFound);
    }
    starts_err!(
        s,
        "Failed to connect socket",
        ErrorKind::ConnectionFailed(s.to_string())
    );
    starts_err!(
        s,
        "authentication failed",
        ErrorKind::ConnectionFailed(s.to_string())
    );
    VmError::from(ErrorKind::OperationFailed(s.to_string()))
}

/// Owns an open connection and closes it exactly once.
///
/// Dropping the guard closes the connection if [`ConnectionGuard::close`]
/// was not called.
pub struct ConnectionGuard {
    uri: String,
    conn: Box<dyn Connection>,
    closed: bool,
}

impl ConnectionGuard {
    fn new(uri: &str, conn: Box<dyn Connection>) -> Self {
        Self {
            uri: uri.to_string(),
            conn,
            closed: false,
        }
    }

    pub fn uri(&self) -> &str { &self.uri }

    /// Closes the connection now and reports a failure to close.
    pub fn close(mut self) -> VmResult<()> { self.close_inner() }

    fn close_inner(&mut self) -> VmResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!("Closing libvirt connection to {}", self.uri);
        self.conn.close()
    }
}

impl std::ops::Deref for ConnectionGuard {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target { self.conn.as_ref() }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if let Err(x) = self.close_inner() {
            warn!("Failed to close libvirt connection to {}: {}", self.uri, x);
        }
    }
}

/// Opens one short-lived connection per operation. No pooling, no retry.
#[derive(Clone)]
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>) -> Self { Self { connector } }

    /// Builds a manager on the native libvirt client.
    ///
    /// Fails with [`ErrorKind::LibraryUnavailable`] if this crate was built
    /// without the `libvirt` feature.
    pub fn system() -> VmResult<Self> {
        native::system_connector().map(Self::new)
    }

    pub fn open_connection(&self, uri: &str) -> VmResult<ConnectionGuard> {
        debug!("Opening libvirt connection to {}", uri);
        match self.connector.open(uri) {
            Ok(conn) => Ok(ConnectionGuard::new(uri, conn)),
            Err(x) => {
                error!("Failed to connect to libvirt ({}): {}", uri, x);
                match x.kind() {
                    Some(ErrorKind::ConnectionFailed(_))
                    | Some(ErrorKind::LibraryUnavailable) => Err(x),
                    _ => vmerr!(ErrorKind::ConnectionFailed(x.to_string())),
                }
            }
        }
    }

    /// Opens and closes a connection to `uri`.
    pub fn probe(&self, uri: &str) -> VmResult<()> {
        self.open_connection(uri)?.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_error() {
        assert!(handle_error("Domain not found: no domain with matching name 'x'")
            .is_not_found());
        assert!(handle_error("error: no domain with matching name 'dc01'")
            .is_not_found());
        assert!(matches!(
            handle_error("Failed to connect socket to '/var/run/libvirt/libvirt-sock'")
                .kind(),
            Some(ErrorKind::ConnectionFailed(_))
        ));
        assert_eq!(
            Some(&ErrorKind::OperationFailed("Requested operation is not valid".to_string())),
            handle_error("Requested operation is not valid").kind()
        );
    }
}
