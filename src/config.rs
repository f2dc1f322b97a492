// Copyright takubokudori.
// This source code is licensed under the MIT or Apache-2.0 license.
//! Lab configuration.
//!
//! # config.toml example
//!
//! ```toml
//! [libvirt]
//! libvirt_uri = "qemu:///system"
//! storage_pool = "default"
//! network_name = "goad-network"
//! timeout_secs = 60
//! lab_hosts = ["dc01", "dc02", "dc03", "srv02", "srv03", "ws01"]
//! ```
use crate::types::*;
use serde::Deserialize;
use std::{path::Path, time::Duration};

pub const DEFAULT_LIBVIRT_URI: &str = "qemu:///system";
pub const DEFAULT_STORAGE_POOL: &str = "default";
pub const DEFAULT_NETWORK_NAME: &str = "goad-network";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_LAB_HOSTS: &[&str] =
    &["dc01", "dc02", "dc03", "srv02", "srv03", "ws01"];

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LabConfig {
    libvirt_uri: String,
    storage_pool: String,
    network_name: String,
    timeout: Option<Duration>,
    lab_hosts: Vec<String>,
}

impl Default for LabConfig {
    fn default() -> Self { Self::new() }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigToml {
    libvirt: Option<LibvirtSection>,
}

#[derive(Debug, Default, Deserialize)]
struct LibvirtSection {
    libvirt_uri: Option<String>,
    storage_pool: Option<String>,
    network_name: Option<String>,
    timeout_secs: Option<u64>,
    lab_hosts: Option<Vec<String>>,
}

impl LabConfig {
    pub fn new() -> Self {
        Self {
            libvirt_uri: DEFAULT_LIBVIRT_URI.to_string(),
            storage_pool: DEFAULT_STORAGE_POOL.to_string(),
            network_name: DEFAULT_NETWORK_NAME.to_string(),
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            lab_hosts: DEFAULT_LAB_HOSTS.iter().map(|x| x.to_string()).collect(),
        }
    }

    impl_setter!(
        /// Sets the hypervisor connection URI.
        libvirt_uri: String
    );
    impl_setter!(storage_pool: String);
    impl_setter!(
        /// Sets the network name used to recognize lab VMs.
        network_name: String
    );
    impl_setter!(
        @opt
        /// Sets the deadline for each hypervisor operation. `None` waits forever.
        timeout: Duration
    );

    pub fn lab_hosts<I, S>(mut self, lab_hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lab_hosts = lab_hosts.into_iter().map(Into::into).collect();
        self
    }

    pub fn get_libvirt_uri(&self) -> &str { &self.libvirt_uri }

    pub fn get_storage_pool(&self) -> &str { &self.storage_pool }

    pub fn get_network_name(&self) -> &str { &self.network_name }

    pub fn get_timeout(&self) -> Option<Duration> { self.timeout }

    pub fn get_lab_hosts(&self) -> &[String] { &self.lab_hosts }

    /// Parses a TOML document. Absent keys keep their defaults.
    pub fn from_toml_str(s: &str) -> VmResult<Self> {
        let config: ConfigToml = toml::from_str(s)
            .map_err(|x| vmerr!(@r ErrorKind::InvalidParameter(x.to_string())))?;
        let section = config.libvirt.unwrap_or_default();
        let mut ret = Self::new();
        if let Some(x) = section.libvirt_uri {
            if x.trim().is_empty() {
                return vmerr!(ErrorKind::InvalidParameter(
                    "libvirt_uri cannot be empty".to_string()
                ));
            }
            ret.libvirt_uri = x.trim().to_string();
        }
        if let Some(x) = section.storage_pool {
            ret.storage_pool = x;
        }
        if let Some(x) = section.network_name {
            ret.network_name = x;
        }
        if let Some(x) = section.timeout_secs {
            ret.timeout = match x {
                0 => None,
                x => Some(Duration::from_secs(x)),
            };
        }
        if let Some(x) = section.lab_hosts {
            ret.lab_hosts = x;
        }
        Ok(ret)
    }

    /// Reads the configuration from `path`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> VmResult<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|x| {
            vmerr!(@r ErrorKind::FileError(format!("{}: {}", path.display(), x)))
        })?;
        Self::from_toml_str(&s)
    }

    /// Returns `true` if `domain_name` looks like a lab VM: its name contains
    /// the network name or one of the lab host names, case-insensitively.
    pub fn is_lab_domain(&self, domain_name: &str) -> bool {
        let name = domain_name.to_lowercase();
        let network = self.network_name.to_lowercase();
        (!network.is_empty() && name.contains(&network))
            || self
                .lab_hosts
                .iter()
                .any(|x| !x.is_empty() && name.contains(&x.to_lowercase()))
    }
}
