// Copyright takubokudori.
// This source code is licensed under the MIT or Apache-2.0 license.

#[cfg(test)]
mod tests {
    use labvirt::{
        config::LabConfig,
        libvirt::ConnectionManager,
        types::ErrorKind,
    };
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("labvirt.toml");
        std::fs::write(
            &path,
            r#"
[libvirt]
libvirt_uri = "qemu:///session"
storage_pool = "lab-pool"
timeout_secs = 5
lab_hosts = ["castelblack", "winterfell"]
"#,
        )
        .unwrap();
        let c = LabConfig::from_file(&path).unwrap();
        assert_eq!("qemu:///session", c.get_libvirt_uri());
        assert_eq!("lab-pool", c.get_storage_pool());
        assert_eq!("goad-network", c.get_network_name());
        assert_eq!(Some(Duration::from_secs(5)), c.get_timeout());
        assert!(c.is_lab_domain("GOAD-WINTERFELL"));
        assert!(!c.is_lab_domain("GOAD-DC01"));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        match LabConfig::from_file(dir.path().join("nope.toml")).unwrap_err().kind() {
            Some(ErrorKind::FileError(_)) => {}
            x => panic!("Unexpected error: {:?}", x),
        }
    }

    #[cfg(not(feature = "libvirt"))]
    #[test]
    fn test_system_without_client() {
        match ConnectionManager::system() {
            Err(x) => assert_eq!(Some(&ErrorKind::LibraryUnavailable), x.kind()),
            Ok(_) => panic!("The native client is not compiled in"),
        }
    }
}
