// Copyright takubokudori.
// This source code is licensed under the MIT or Apache-2.0 license.
//! Lab VM lifecycle.
use super::{ConnectionGuard, ConnectionManager};
use crate::{config::LabConfig, types::*};
use std::{
    sync::mpsc::{self, RecvTimeoutError},
    thread,
};

/// Status, start, stop and destroy of lab VMs.
///
/// Every operation opens its own connection, acts and closes the connection
/// again, whatever the outcome. Domain state is always queried live.
#[derive(Clone)]
pub struct Lifecycle {
    manager: ConnectionManager,
    config: LabConfig,
}

fn log_failure(action: &str, name: &str, e: &VmError) {
    match e.kind() {
        Some(ErrorKind::VmNotFound) => {
            error!("Failed to {} VM {}: no such domain", action, name)
        }
        _ => error!("Failed to {} VM {}: {}", action, name, e),
    }
}

impl Lifecycle {
    pub fn new(manager: ConnectionManager, config: LabConfig) -> Self {
        Self { manager, config }
    }

    pub fn config(&self) -> &LabConfig { &self.config }

    /// Opens a connection, runs `f` and closes the connection.
    ///
    /// With a timeout configured the envelope runs on a worker thread. On
    /// expiry the caller gets [`ErrorKind::Timeout`] and the worker closes
    /// its connection once the blocked call returns.
    fn run<T, F>(&self, what: &str, f: F) -> VmResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&ConnectionGuard) -> VmResult<T> + Send + 'static,
    {
        let manager = self.manager.clone();
        let uri = self.config.get_libvirt_uri().to_string();
        let envelope = move || -> VmResult<T> {
            let conn = manager.open_connection(&uri)?;
            let ret = f(&conn);
            drop(conn);
            ret
        };
        let timeout = match self.config.get_timeout() {
            Some(x) => x,
            None => return envelope(),
        };
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name(format!("labvirt-{}", what))
            .spawn(move || {
                let _ = tx.send(envelope());
            })
            .map_err(|x| {
                error!("Failed to spawn worker for {}: {}", what, x);
                vmerr!(@r ErrorKind::ExecutionFailed(x.to_string()))
            })?;
        match rx.recv_timeout(timeout) {
            Ok(x) => x,
            Err(RecvTimeoutError::Timeout) => {
                error!("{} did not finish within {:?}", what, timeout);
                vmerr!(ErrorKind::Timeout)
            }
            Err(RecvTimeoutError::Disconnected) => {
                error!("{} worker exited without a result", what);
                vmerr!(ErrorKind::OperationFailed(format!(
                    "{} worker exited without a result",
                    what
                )))
            }
        }
    }

    /// Returns the state of every lab VM and logs it.
    pub fn status(&self) -> VmResult<Vec<DomainStatus>> {
        let config = self.config.clone();
        self.run("status", move |conn| {
            let ret = (|| -> VmResult<Vec<DomainStatus>> {
                let mut ret = vec![];
                for dom in conn.list_all_domains()? {
                    let name = dom.name()?;
                    if !config.is_lab_domain(&name) {
                        continue;
                    }
                    let state = dom.state()?;
                    ret.push(DomainStatus { name, state });
                }
                Ok(ret)
            })();
            match &ret {
                Ok(v) if v.is_empty() => info!("No lab VMs found"),
                Ok(v) => {
                    info!("Lab VM status:");
                    for x in v {
                        info!("  {}: {}", x.name, x.state);
                    }
                }
                Err(x) => error!("Error checking VM status: {}", x),
            }
            ret
        })
    }

    pub fn start(&self, name: &str) -> VmResult<LifecycleOutcome> {
        let name = name.to_string();
        self.run("start", move |conn| {
            let ret = (|| -> VmResult<LifecycleOutcome> {
                let dom = conn.lookup_by_name(&name)?;
                if dom.is_active()? {
                    info!("VM {} is already running", name);
                    return Ok(LifecycleOutcome::AlreadyRunning);
                }
                dom.create()?;
                info!("VM {} started", name);
                Ok(LifecycleOutcome::Started)
            })();
            if let Err(x) = &ret {
                log_failure("start", &name, x);
            }
            ret
        })
    }

    /// Requests a graceful shutdown. Does not wait for the VM to power off.
    pub fn stop(&self, name: &str) -> VmResult<LifecycleOutcome> {
        let name = name.to_string();
        self.run("stop", move |conn| {
            let ret = (|| -> VmResult<LifecycleOutcome> {
                let dom = conn.lookup_by_name(&name)?;
                if !dom.is_active()? {
                    info!("VM {} is already stopped", name);
                    return Ok(LifecycleOutcome::AlreadyStopped);
                }
                dom.shutdown()?;
                info!("VM {} shutdown initiated", name);
                Ok(LifecycleOutcome::ShutdownInitiated)
            })();
            if let Err(x) = &ret {
                log_failure("stop", &name, x);
            }
            ret
        })
    }

    /// Powers a VM off without a guest shutdown.
    pub fn destroy(&self, name: &str) -> VmResult<LifecycleOutcome> {
        let name = name.to_string();
        self.run("destroy", move |conn| {
            let ret = (|| -> VmResult<LifecycleOutcome> {
                let dom = conn.lookup_by_name(&name)?;
                if !dom.is_active()? {
                    info!("VM {} is already stopped", name);
                    return Ok(LifecycleOutcome::AlreadyStopped);
                }
                dom.destroy()?;
                info!("VM {} destroyed", name);
                Ok(LifecycleOutcome::Destroyed)
            })();
            if let Err(x) = &ret {
                log_failure("destroy", &name, x);
            }
            ret
        })
    }

    pub fn start_vm(&self, name: &str) -> bool { self.start(name).is_ok() }

    pub fn stop_vm(&self, name: &str) -> bool { self.stop(name).is_ok() }

    pub fn destroy_vm(&self, name: &str) -> bool { self.destroy(name).is_ok() }
}

impl PowerCmd for Lifecycle {
    fn start(&self, name: &str) -> VmResult<LifecycleOutcome> {
        Lifecycle::start(self, name)
    }

    fn stop(&self, name: &str) -> VmResult<LifecycleOutcome> {
        Lifecycle::stop(self, name)
    }

    fn hard_stop(&self, name: &str) -> VmResult<LifecycleOutcome> {
        self.destroy(name)
    }

    fn is_running(&self, name: &str) -> VmResult<bool> {
        let name = name.to_string();
        self.run("is_running", move |conn| {
            let ret = conn.lookup_by_name(&name).and_then(|dom| dom.is_active());
            if let Err(x) = &ret {
                log_failure("query", &name, x);
            }
            ret
        })
    }
}
