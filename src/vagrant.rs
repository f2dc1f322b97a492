// Copyright takubokudori.
// This source code is licensed under the MIT or Apache-2.0 license.
//! Prerequisite checks for the vagrant-libvirt provider.
use crate::{env_search_path, exec_cmd, tool, types::*};
use regex::Regex;
use serde::Serialize;
use std::{
    path::{Path, PathBuf},
    process::Command,
};

pub const VAGRANT_LIBVIRT_PLUGIN: &str = "vagrant-libvirt";

const VAGRANT_VERSION: (&[&str], &str) = (&["--version"], r"Vagrant (\S+)");

/// An installed Vagrant plugin, as listed by `vagrant plugin list`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct VagrantPlugin {
    pub name: String,
    pub version: String,
    /// `global` or `local`.
    pub scope: Option<String>,
}

/// Parses `vagrant plugin list` output, e.g. `vagrant-libvirt (0.12.2, global)`.
pub fn parse_plugin_list(s: &str) -> VmResult<Vec<VagrantPlugin>> {
    let re = Regex::new(r"^(\S+) \(([^,()]+)(?:, ([^()]+))?\)")
        .map_err(|x| vmerr!(@r ErrorKind::UnexpectedResponse(x.to_string())))?;
    Ok(s.lines()
        .filter_map(|x| re.captures(x.trim_end()))
        .map(|c| VagrantPlugin {
            name: c[1].to_string(),
            version: c[2].trim().to_string(),
            scope: c.get(3).map(|m| m.as_str().trim().to_string()),
        })
        .collect())
}

#[derive(Clone, Debug)]
pub struct VagrantLibvirtCheck {
    search_path: Vec<PathBuf>,
}

impl Default for VagrantLibvirtCheck {
    fn default() -> Self { Self::new() }
}

impl VagrantLibvirtCheck {
    pub fn new() -> Self {
        Self {
            search_path: env_search_path(),
        }
    }

    impl_setter!(
        /// Sets the directories searched for tools. Defaults to `PATH`.
        search_path: Vec<PathBuf>
    );

    fn list_plugins(vagrant: &Path) -> VmResult<Vec<VagrantPlugin>> {
        let (stdout, stderr) = exec_cmd(Command::new(vagrant).args(&["plugin", "list"]))?;
        if stdout.trim().is_empty() && !stderr.trim().is_empty() {
            return vmerr!(ErrorKind::ExecutionFailed(stderr.trim().to_string()));
        }
        parse_plugin_list(&stdout)
    }

    /// Returns `true` if plugin `name` is installed. A missing plugin that
    /// is not `required` only produces a warning.
    pub fn check_vagrant_plugin(&self, name: &str, required: bool) -> bool {
        let vagrant = match tool::locate("vagrant", &self.search_path) {
            Ok(x) => x,
            Err(x) => {
                error!("Cannot check plugin {}: {}", name, x);
                return false;
            }
        };
        let installed = match Self::list_plugins(&vagrant) {
            Ok(v) => v.into_iter().find(|x| x.name == name),
            Err(x) => {
                error!("Failed to list vagrant plugins: {}", x);
                return false;
            }
        };
        match installed {
            Some(x) => {
                info!("vagrant plugin {} {} installed", x.name, x.version);
                true
            }
            None if required => {
                error!(
                    "vagrant plugin {} not installed. Install with: vagrant plugin install {}",
                    name, name
                );
                false
            }
            None => {
                warn!(
                    "vagrant plugin {} not installed. Install with: vagrant plugin install {}",
                    name, name
                );
                true
            }
        }
    }

    pub fn check_vagrant(&self) -> bool {
        tool::check(
            "vagrant",
            &self.search_path,
            Some(VAGRANT_VERSION),
            "Install it from https://developer.hashicorp.com/vagrant/install",
        )
        .found()
    }

    /// Checks that the libvirt tools are installed.
    pub fn check_libvirt(&self) -> bool {
        tool::check(
            "virsh",
            &self.search_path,
            None,
            "Install libvirt (libvirt-clients / libvirt) first",
        )
        .found()
    }

    /// Runs every check, even after one fails, so that all problems are logged.
    pub fn check(&self) -> bool {
        let checks = [
            self.check_vagrant(),
            self.check_libvirt(),
            self.check_vagrant_plugin(VAGRANT_LIBVIRT_PLUGIN, true),
        ];
        checks.iter().all(|x| *x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plugin_list() {
        let s = "vagrant-libvirt (0.12.2, global)\n\
                 vagrant-reload (0.0.1, global)\n  \
                 - Version Constraint: > 0\n\
                 vagrant-vbguest (0.32.0)\n";
        let v = parse_plugin_list(s).unwrap();
        assert_eq!(3, v.len());
        assert_eq!(
            VagrantPlugin {
                name: "vagrant-libvirt".to_string(),
                version: "0.12.2".to_string(),
                scope: Some("global".to_string()),
            },
            v[0]
        );
        assert_eq!(None, v[2].scope);
        assert!(parse_plugin_list("No plugins installed.\n").unwrap().is_empty());
    }
}
