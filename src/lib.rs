// Copyright takubokudori.
// This source code is licensed under the MIT or Apache-2.0 license.
//! # labvirt
//! A libvirt lab provider controller library
//!
//! # Supported OS
//! Linux.
//!
//! # Features
//!
//! - Prerequisite checks for the [Terraform](https://www.terraform.io/) libvirt provider
//!   and for [vagrant-libvirt](https://github.com/vagrant-libvirt/vagrant-libvirt).
//! - Lab VM status, start, graceful stop and forced destroy through
//!   [libvirt](https://libvirt.org/).
//!
//! The native libvirt client is behind the `libvirt` feature.
//!
//! # License
//!
//! This software is released under the MIT or Apache-2.0 License, see LICENSE-MIT or LICENSE-APACHE.
#[macro_use]
pub mod types;

pub mod config;
pub mod libvirt;
pub mod preflight;
pub mod provider;
pub mod tool;
pub mod vagrant;

#[macro_use]
extern crate log;

use crate::types::{ErrorKind, VmResult};
use encoding_rs::{Encoding, UTF_8};
use log::Level;
use std::{
    ffi::OsStr,
    io::Write,
    path::{Path, PathBuf},
    process::Command,
};

pub(crate) fn decode(encoding: &'static Encoding, b: &[u8]) -> String {
    let (text, _, _) = encoding.decode(b);
    text.into_owned()
}

/// Executes `cmd` and Returns `(stdout, stderr)`.
pub(crate) fn exec_cmd(cmd: &mut Command) -> VmResult<(String, String)> {
    dbg_cmd(cmd);
    match cmd.output() {
        Ok(o) => Ok((decode(UTF_8, &o.stdout), decode(UTF_8, &o.stderr))),
        Err(x) => vmerr!(ErrorKind::ExecutionFailed(x.to_string())),
    }
}

pub(crate) fn dbg_cmd(cmd: &Command) {
    if log_enabled!(Level::Debug) {
        let stdout = std::io::stdout();
        let mut stdout = stdout.lock();
        let _ = write!(stdout, "{}", cmd.get_program().to_string_lossy());
        for arg in cmd.get_args() {
            let _ = write!(stdout, " {}", arg.to_string_lossy());
        }
        let _ = writeln!(stdout);
        let _ = stdout.flush();
    }
}

/// Returns the directories listed in `PATH`.
pub fn env_search_path() -> Vec<PathBuf> {
    std::env::var_os("PATH")
        .map(|x| std::env::split_paths(&x).collect())
        .unwrap_or_default()
}

/// Looks up `name` in `search_path`, first match wins.
pub fn find_executable<S: AsRef<OsStr>>(
    name: S,
    search_path: &[PathBuf],
) -> Option<PathBuf> {
    let name = name.as_ref();
    search_path
        .iter()
        .map(|dir| dir.join(name))
        .find(|p| is_executable(p))
}

#[cfg(unix)]
fn is_executable(p: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(p) {
        Ok(m) => m.is_file() && m.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_executable(p: &Path) -> bool { p.is_file() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_lossy() {
        assert_eq!("abc", decode(UTF_8, b"abc"));
        assert_eq!("a\u{FFFD}c", decode(UTF_8, b"a\xffc"));
    }

    #[test]
    fn test_exec_missing_program() {
        let r = exec_cmd(&mut Command::new("labvirt-no-such-program"));
        match r.unwrap_err().kind() {
            Some(ErrorKind::ExecutionFailed(_)) => {}
            x => panic!("Unexpected error: {:?}", x),
        }
    }
}
