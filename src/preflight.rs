// Copyright takubokudori.
// This source code is licensed under the MIT or Apache-2.0 license.
//! Prerequisite checks for the Terraform libvirt provider.
use crate::{
    config::LabConfig,
    env_search_path,
    libvirt::ConnectionManager,
    tool::{self, ToolReport},
};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const REQUIRED_TOOLS: &[&str] = &["terraform", "rsync"];
/// Either one is enough.
pub const ISO_TOOLS: &[&str] = &["mkisofs", "genisoimage"];

pub const REQUIRED_TEMPLATES: &[&str] = &["WinServer2019_x64.qcow2"];
pub const OPTIONAL_TEMPLATES: &[&str] =
    &["WinServer2016_x64.qcow2", "Windows10_22h2_x64.qcow2"];

const TERRAFORM_VERSION: (&[&str], &str) = (&["version"], r"Terraform v(\S+)");
const RSYNC_VERSION: (&[&str], &str) = (&["--version"], r"rsync\s+version\s+(\S+)");

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct TemplateSpec {
    pub name: String,
    pub required: bool,
}

impl TemplateSpec {
    pub fn required<T: Into<String>>(name: T) -> Self {
        Self {
            name: name.into(),
            required: true,
        }
    }

    pub fn optional<T: Into<String>>(name: T) -> Self {
        Self {
            name: name.into(),
            required: false,
        }
    }
}

/// The Windows templates used by the labs.
pub fn default_templates() -> Vec<TemplateSpec> {
    REQUIRED_TEMPLATES
        .iter()
        .map(|x| TemplateSpec::required(*x))
        .chain(OPTIONAL_TEMPLATES.iter().map(|x| TemplateSpec::optional(*x)))
        .collect()
}

/// Template directories in search order.
pub fn default_template_dirs() -> Vec<PathBuf> {
    let mut ret = vec![PathBuf::from("/var/lib/libvirt/images")];
    if let Some(home) = std::env::var_os("HOME") {
        let home = PathBuf::from(home);
        ret.push(home.join("Downloads"));
        ret.push(home.join("VMs"));
    }
    ret.push(PathBuf::from("/tmp"));
    ret.push(PathBuf::from("."));
    ret
}

/// Returns the first `dir/name` that exists.
pub fn find_template<P: AsRef<Path>>(name: &str, dirs: &[P]) -> Option<PathBuf> {
    dirs.iter()
        .map(|d| d.as_ref().join(name))
        .find(|p| p.exists())
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct TemplateReport {
    pub template: String,
    pub required: bool,
    pub path: Option<PathBuf>,
}

impl TemplateReport {
    #[inline]
    pub fn found(&self) -> bool { self.path.is_some() }
}

/// Searches every template in `dirs`.
pub fn check_templates<P: AsRef<Path>>(
    templates: &[TemplateSpec],
    dirs: &[P],
) -> Vec<TemplateReport> {
    templates
        .iter()
        .map(|t| TemplateReport {
            template: t.name.clone(),
            required: t.required,
            path: find_template(&t.name, dirs),
        })
        .collect()
}

/// Logs found and missing templates and how to get the missing required ones.
pub fn log_templates(reports: &[TemplateReport]) {
    let found: Vec<_> = reports.iter().filter(|x| x.found()).collect();
    let missing_required: Vec<_> = reports
        .iter()
        .filter(|x| x.required && !x.found())
        .collect();
    let missing_optional: Vec<_> = reports
        .iter()
        .filter(|x| !x.required && !x.found())
        .collect();

    if !found.is_empty() {
        info!("Windows VM templates:");
        for x in &found {
            // `found` only holds reports with a path.
            let path = x.path.as_deref().unwrap_or_else(|| Path::new(""));
            if x.required {
                info!("  {} ({})", x.template, path.display());
            } else {
                info!("  {} ({}) [optional]", x.template, path.display());
            }
        }
    }

    if !missing_required.is_empty() {
        error!("Missing REQUIRED templates:");
        for x in &missing_required {
            error!("  {}", x.template);
        }
        error!("");
        error!("Quick start - only Windows Server 2019 is needed:");
        error!("   1. Download: https://www.microsoft.com/en-us/evalcenter/download-windows-server-2019");
        error!("   2. Create VM: virt-install --name win2019 --ram 4096 --vcpus 2 \\");
        error!("      --disk path=/var/lib/libvirt/images/WinServer2019_x64.qcow2,size=60,format=qcow2 \\");
        error!("      --cdrom /path/to/windows-server-2019.iso --network bridge=virbr0");
        error!("   3. Run setup script: ./scripts/setup-libvirt-images.sh");
        return;
    }

    if missing_optional.is_empty() {
        info!("All Windows VM templates found!");
    } else {
        info!("Missing optional templates (only needed for specific labs):");
        for x in &missing_optional {
            info!("  {}", x.template);
        }
        info!("Core template ready! Most labs can run.");
        info!("Add optional templates as needed for specific configurations.");
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct PreflightReport {
    pub tools: Vec<ToolReport>,
    pub connection: bool,
    /// The ISO creation tool that was found, if any.
    pub iso_tool: Option<ToolReport>,
    pub templates: Vec<TemplateReport>,
}

impl PreflightReport {
    /// Templates do not affect the result.
    pub fn passed(&self) -> bool {
        self.tools.iter().all(|x| x.found()) && self.connection && self.iso_tool.is_some()
    }

    pub fn missing_required_templates(&self) -> Vec<&str> {
        self.templates
            .iter()
            .filter(|x| x.required && !x.found())
            .map(|x| x.template.as_str())
            .collect()
    }
}

/// Checks the prerequisites of the libvirt provider.
#[derive(Clone)]
pub struct Preflight {
    manager: Option<ConnectionManager>,
    config: LabConfig,
    search_path: Vec<PathBuf>,
    template_dirs: Vec<PathBuf>,
    templates: Vec<TemplateSpec>,
}

impl Preflight {
    /// `manager` is `None` when no libvirt client is available.
    pub fn new(manager: Option<ConnectionManager>, config: LabConfig) -> Self {
        Self {
            manager,
            config,
            search_path: env_search_path(),
            template_dirs: default_template_dirs(),
            templates: default_templates(),
        }
    }

    impl_setter!(
        /// Sets the directories searched for tools. Defaults to `PATH`.
        search_path: Vec<PathBuf>
    );
    impl_setter!(
        /// Sets the directories searched for templates, in order.
        template_dirs: Vec<PathBuf>
    );
    impl_setter!(templates: Vec<TemplateSpec>);

    fn check_connection(&self) -> bool {
        let manager = match &self.manager {
            Some(x) => x,
            None => {
                error!("libvirt client not available");
                return false;
            }
        };
        match manager.probe(self.config.get_libvirt_uri()) {
            Ok(()) => {
                info!("Libvirt connection successful");
                true
            }
            Err(x) => {
                error!("Libvirt connection failed: {}", x);
                false
            }
        }
    }

    fn check_iso_tool(&self) -> Option<ToolReport> {
        let found = ISO_TOOLS
            .iter()
            .find_map(|x| tool::locate(x, &self.search_path).ok().map(|p| (*x, p)));
        match found {
            Some((name, path)) => {
                info!("ISO creation tools available ({})", path.display());
                Some(ToolReport {
                    tool: name.to_string(),
                    path: Some(path),
                    version: None,
                })
            }
            None => {
                error!("mkisofs/genisoimage not found. Install with: sudo pacman -S cdrtools");
                None
            }
        }
    }

    /// Runs every check and logs the outcome.
    pub fn run(&self) -> PreflightReport {
        let tools = REQUIRED_TOOLS
            .iter()
            .map(|name| {
                let version = match *name {
                    "terraform" => Some(TERRAFORM_VERSION),
                    "rsync" => Some(RSYNC_VERSION),
                    _ => None,
                };
                tool::check(name, &self.search_path, version, "")
            })
            .collect();
        let connection = self.check_connection();
        let iso_tool = self.check_iso_tool();
        let templates = check_templates(&self.templates, &self.template_dirs);
        log_templates(&templates);
        PreflightReport {
            tools,
            connection,
            iso_tool,
            templates,
        }
    }

    /// Returns `true` if tools and the hypervisor connection are available.
    /// Missing templates are reported but never fail the check.
    pub fn check(&self) -> bool { self.run().passed() }
}
