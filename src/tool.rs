// Copyright takubokudori.
// This source code is licensed under the MIT or Apache-2.0 license.
//! External tools.
use crate::{exec_cmd, find_executable, types::*};
use regex::Regex;
use serde::Serialize;
use std::{
    path::{Path, PathBuf},
    process::Command,
};

/// Where a tool was found, if anywhere.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct ToolReport {
    pub tool: String,
    pub path: Option<PathBuf>,
    pub version: Option<String>,
}

impl ToolReport {
    #[inline]
    pub fn found(&self) -> bool { self.path.is_some() }
}

/// Looks up `name` in `search_path`.
pub fn locate(name: &str, search_path: &[PathBuf]) -> VmResult<PathBuf> {
    find_executable(name, search_path)
        .ok_or_else(|| vmerr!(@r ErrorKind::ToolMissing(name.to_string())))
}

/// Runs `path args..` and returns the first capture of `pattern` in its output.
pub fn version(path: &Path, args: &[&str], pattern: &str) -> VmResult<String> {
    let re = Regex::new(pattern)
        .map_err(|x| vmerr!(@r ErrorKind::InvalidParameter(x.to_string())))?;
    let (stdout, stderr) = exec_cmd(Command::new(path).args(args))?;
    parse_version(&re, &stdout)
        .or_else(|| parse_version(&re, &stderr))
        .ok_or_else(|| vmerr!(@r ErrorKind::UnexpectedResponse(stdout)))
}

fn parse_version(re: &Regex, s: &str) -> Option<String> {
    re.captures(s)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Locates a tool and, if a version pattern is given, asks it for its version.
/// Logs the result.
pub fn check(
    name: &str,
    search_path: &[PathBuf],
    version_args: Option<(&[&str], &str)>,
    hint: &str,
) -> ToolReport {
    match locate(name, search_path) {
        Ok(path) => {
            let version = version_args.and_then(|(args, pattern)| {
                match version(&path, args, pattern) {
                    Ok(x) => Some(x),
                    Err(x) => {
                        debug!("Could not get the {} version: {}", name, x);
                        None
                    }
                }
            });
            match &version {
                Some(v) => info!("{} {} found ({})", name, v, path.display()),
                None => info!("{} found ({})", name, path.display()),
            }
            ToolReport {
                tool: name.to_string(),
                path: Some(path),
                version,
            }
        }
        Err(x) => {
            if hint.is_empty() {
                error!("{}", x);
            } else {
                error!("{}. {}", x, hint);
            }
            ToolReport {
                tool: name.to_string(),
                path: None,
                version: None,
            }
        }
    }
}
