// Copyright takubokudori.
// This source code is licensed under the MIT or Apache-2.0 license.
//! Lab providers built on libvirt.
use crate::{
    config::LabConfig, libvirt::ConnectionManager, preflight::Preflight, types::*,
    vagrant::VagrantLibvirtCheck,
};
use serde::Serialize;
use std::str::FromStr;

/// How a lab gets provisioned once its VMs are up.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provisioning {
    Local,
    Runner,
    Docker,
    Vm,
}

impl Provisioning {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Runner => "runner",
            Self::Docker => "docker",
            Self::Vm => "vm",
        }
    }
}

impl std::fmt::Display for Provisioning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash, Serialize)]
pub enum Provider {
    /// Terraform with the libvirt provider.
    #[serde(rename = "libvirt")]
    Libvirt,
    #[serde(rename = "vagrant-libvirt")]
    VagrantLibvirt,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Self::Libvirt, Self::VagrantLibvirt];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Libvirt => "libvirt",
            Self::VagrantLibvirt => "vagrant-libvirt",
        }
    }

    pub fn default_provisioner(&self) -> Provisioning { Provisioning::Local }

    pub fn allowed_provisioners(&self) -> &'static [Provisioning] {
        use Provisioning::*;
        match self {
            Self::Libvirt => &[Local, Runner],
            Self::VagrantLibvirt => &[Local, Runner, Docker, Vm],
        }
    }

    #[inline]
    pub fn allows(&self, p: Provisioning) -> bool {
        self.allowed_provisioners().contains(&p)
    }

    /// Runs the prerequisite checks of this provider.
    pub fn check(&self, manager: Option<ConnectionManager>, config: &LabConfig) -> bool {
        match self {
            Self::Libvirt => Preflight::new(manager, config.clone()).check(),
            Self::VagrantLibvirt => VagrantLibvirtCheck::new().check(),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.name().fmt(f)
    }
}

impl FromStr for Provider {
    type Err = VmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "libvirt" => Ok(Self::Libvirt),
            "vagrant-libvirt" => Ok(Self::VagrantLibvirt),
            x => vmerr!(ErrorKind::InvalidParameter(format!(
                "unknown provider: {}",
                x
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider() {
        assert_eq!(Ok(Provider::Libvirt), "libvirt".parse());
        assert_eq!(Ok(Provider::VagrantLibvirt), "Vagrant-Libvirt".parse());
        assert!("virtualbox".parse::<Provider>().is_err());

        assert_eq!(Provisioning::Local, Provider::Libvirt.default_provisioner());
        assert!(Provider::Libvirt.allows(Provisioning::Runner));
        assert!(!Provider::Libvirt.allows(Provisioning::Docker));
        assert!(Provider::VagrantLibvirt.allows(Provisioning::Vm));
        assert_eq!("vagrant-libvirt", Provider::VagrantLibvirt.to_string());
    }
}
