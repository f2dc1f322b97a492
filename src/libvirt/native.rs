// Copyright takubokudori.
// This source code is licensed under the MIT or Apache-2.0 license.
//! Native libvirt client.
use super::Connector;
use crate::types::*;
use std::sync::Arc;

/// Returns the native connector, or [`ErrorKind::LibraryUnavailable`] if the
/// client library was not compiled in.
pub fn system_connector() -> VmResult<Arc<dyn Connector>> {
    #[cfg(feature = "libvirt")]
    {
        Ok(Arc::new(imp::VirtConnector))
    }
    #[cfg(not(feature = "libvirt"))]
    {
        error!("libvirt client not available. Rebuild with `--features libvirt`");
        vmerr!(ErrorKind::LibraryUnavailable)
    }
}

#[cfg(feature = "libvirt")]
pub use imp::VirtConnector;

#[cfg(feature = "libvirt")]
mod imp {
    use super::super::{handle_error, Connection, Connector, Domain};
    use crate::types::*;
    use virt::{connect::Connect, sys};

    fn to_err(e: virt::error::Error) -> VmError { handle_error(&e.to_string()) }

    /// Connects through `virConnectOpen`.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct VirtConnector;

    impl Connector for VirtConnector {
        fn open(&self, uri: &str) -> VmResult<Box<dyn Connection>> {
            match Connect::open(Some(uri)) {
                Ok(conn) => Ok(Box::new(VirtConnection { conn })),
                Err(x) => vmerr!(ErrorKind::ConnectionFailed(x.to_string())),
            }
        }
    }

    struct VirtConnection {
        conn: Connect,
    }

    impl Connection for VirtConnection {
        fn list_all_domains(&self) -> VmResult<Vec<Box<dyn Domain>>> {
            let flags = sys::VIR_CONNECT_LIST_DOMAINS_ACTIVE
                | sys::VIR_CONNECT_LIST_DOMAINS_INACTIVE;
            let domains = self.conn.list_all_domains(flags).map_err(to_err)?;
            Ok(domains
                .into_iter()
                .map(|dom| Box::new(VirtDomain { dom }) as Box<dyn Domain>)
                .collect())
        }

        fn lookup_by_name(&self, name: &str) -> VmResult<Box<dyn Domain>> {
            let dom = virt::domain::Domain::lookup_by_name(&self.conn, name)
                .map_err(to_err)?;
            Ok(Box::new(VirtDomain { dom }))
        }

        fn close(&mut self) -> VmResult<()> {
            self.conn.close().map_err(to_err)?;
            Ok(())
        }
    }

    struct VirtDomain {
        dom: virt::domain::Domain,
    }

    impl Domain for VirtDomain {
        fn name(&self) -> VmResult<String> { self.dom.get_name().map_err(to_err) }

        fn state(&self) -> VmResult<DomainState> {
            let (state, _reason) = self.dom.get_state().map_err(to_err)?;
            Ok(DomainState::from_raw(state as u32))
        }

        fn is_active(&self) -> VmResult<bool> { self.dom.is_active().map_err(to_err) }

        fn create(&self) -> VmResult<()> {
            self.dom.create().map_err(to_err)?;
            Ok(())
        }

        fn shutdown(&self) -> VmResult<()> {
            self.dom.shutdown().map_err(to_err)?;
            Ok(())
        }

        fn destroy(&self) -> VmResult<()> { self.dom.destroy().map_err(to_err) }
    }
}
