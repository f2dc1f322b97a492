
#[cfg(test)]
mod tests {
    use crate::test_fake_hv::{lab, lifecycle, manager, FakeHv};
    use labvirt::{
        config::LabConfig,
        libvirt::Lifecycle,
        types::{DomainState, DomainStatus, ErrorKind, LifecycleOutcome, PowerCmd},
        vmerr,
    };
    use std::{
        sync::Arc,
        time::{Duration, Instant},
    };

    fn assert_balanced(hv: &FakeHv) {
        assert_eq!(
            FakeHv::count(&hv.opens),
            FakeHv::count(&hv.closes),
            "every opened connection must be closed"
        );
    }

    #[test]
    fn test_status_filters_lab_vms() {
        let hv = Arc::new(lab());
        let v = lifecycle(&hv).status().unwrap();
        let names: Vec<_> = v.iter().map(|x| x.name.as_str()).collect();
        assert_eq!(
            vec!["GOAD-DC01", "GOAD-DC02", "GOAD-SRV02", "goad-network-router"],
            names
        );
        assert_eq!(
            DomainStatus {
                name: "goad-network-router".to_string(),
                state: DomainState::Crashed,
            },
            v[3]
        );
        assert_eq!("Paused", v[2].state.label());
        assert_eq!(1, FakeHv::count(&hv.opens));
        assert_balanced(&hv);
    }

    #[test]
    fn test_status_without_lab_vms() {
        let hv = Arc::new(FakeHv::new(&[("fedora39", DomainState::Running)]));
        assert_eq!(Ok(vec![]), lifecycle(&hv).status());
        assert_balanced(&hv);
    }

    #[test]
    fn test_status_uses_configured_network_name() {
        let hv = Arc::new(FakeHv::new(&[
            ("kingslanding", DomainState::Running),
            ("sevenkingdoms-dc", DomainState::ShutOff),
        ]));
        let lc = Lifecycle::new(
            manager(&hv),
            LabConfig::new()
                .timeout(None::<Duration>)
                .network_name("SevenKingdoms")
                .lab_hosts(Vec::<String>::new()),
        );
        let v = lc.status().unwrap();
        assert_eq!(1, v.len());
        assert_eq!("sevenkingdoms-dc", v[0].name);
    }

    #[test]
    fn test_start() {
        let hv = Arc::new(lab());
        let lc = lifecycle(&hv);
        assert_eq!(Ok(LifecycleOutcome::Started), lc.start("GOAD-DC02"));
        assert_eq!(Some(DomainState::Running), hv.state_of("GOAD-DC02"));
        assert_eq!(1, FakeHv::count(&hv.creates));
        assert!(lc.is_running("GOAD-DC02").unwrap());
        assert_balanced(&hv);
    }

    #[test]
    fn test_start_already_running_is_noop() {
        let hv = Arc::new(lab());
        let r = lifecycle(&hv).start("GOAD-DC01").unwrap();
        assert_eq!(LifecycleOutcome::AlreadyRunning, r);
        assert!(r.is_noop());
        assert_eq!(0, FakeHv::count(&hv.creates));
        assert_balanced(&hv);
    }

    #[test]
    fn test_stop() {
        let hv = Arc::new(lab());
        let lc = lifecycle(&hv);
        assert_eq!(Ok(LifecycleOutcome::ShutdownInitiated), lc.stop("GOAD-DC01"));
        assert_eq!(1, FakeHv::count(&hv.shutdowns));
        assert_eq!(0, FakeHv::count(&hv.destroys));
        assert_balanced(&hv);
    }

    #[test]
    fn test_stop_and_destroy_inactive_are_noops() {
        let hv = Arc::new(lab());
        let lc = lifecycle(&hv);
        assert_eq!(Ok(LifecycleOutcome::AlreadyStopped), lc.stop("GOAD-DC02"));
        assert_eq!(Ok(LifecycleOutcome::AlreadyStopped), lc.destroy("GOAD-DC02"));
        assert_eq!(0, hv.state_changes());
        assert_eq!(2, FakeHv::count(&hv.opens));
        assert_balanced(&hv);
    }

    #[test]
    fn test_destroy() {
        let hv = Arc::new(lab());
        let lc = lifecycle(&hv);
        assert_eq!(Ok(LifecycleOutcome::Destroyed), lc.hard_stop("GOAD-SRV02"));
        assert_eq!(Some(DomainState::ShutOff), hv.state_of("GOAD-SRV02"));
        assert_eq!(Ok(false), lc.is_running("GOAD-SRV02"));
        assert_balanced(&hv);
    }

    #[test]
    fn test_unknown_vm() {
        let hv = Arc::new(lab());
        let lc = lifecycle(&hv);
        assert_eq!(vmerr!(ErrorKind::VmNotFound), lc.start("ws01"));
        assert_eq!(vmerr!(ErrorKind::VmNotFound), lc.stop("ws01"));
        assert_eq!(vmerr!(ErrorKind::VmNotFound), lc.destroy("ws01"));
        assert!(!lc.start_vm("ws01"));
        assert!(!lc.stop_vm("ws01"));
        assert!(!lc.destroy_vm("ws01"));
        assert_eq!(0, hv.state_changes());
        assert_eq!(6, FakeHv::count(&hv.opens));
        assert_balanced(&hv);
    }

    #[test]
    fn test_operation_failure() {
        let hv = Arc::new(FakeHv {
            fail_actions: true,
            ..lab()
        });
        let lc = lifecycle(&hv);
        match lc.start("GOAD-DC02").unwrap_err().kind() {
            Some(ErrorKind::OperationFailed(_)) => {}
            x => panic!("Unexpected error: {:?}", x),
        }
        assert!(!lc.stop_vm("GOAD-DC01"));
        assert!(!lc.destroy_vm("GOAD-DC01"));
        assert_balanced(&hv);
    }

    #[test]
    fn test_connection_refused() {
        let hv = Arc::new(FakeHv {
            refuse_connection: true,
            ..lab()
        });
        let lc = lifecycle(&hv);
        for r in [lc.start("GOAD-DC01"), lc.stop("GOAD-DC01"), lc.destroy("GOAD-DC01")] {
            match r.unwrap_err().kind() {
                Some(ErrorKind::ConnectionFailed(_)) => {}
                x => panic!("Unexpected error: {:?}", x),
            }
        }
        assert!(lc.status().is_err());
        assert_eq!(0, FakeHv::count(&hv.opens));
        assert_eq!(0, FakeHv::count(&hv.closes));
    }

    #[test]
    fn test_with_deadline() {
        let hv = Arc::new(lab());
        let lc = Lifecycle::new(
            manager(&hv),
            LabConfig::new().timeout(Duration::from_secs(10)),
        );
        assert_eq!(Ok(LifecycleOutcome::Started), lc.start("GOAD-DC02"));
        assert_balanced(&hv);
    }

    #[test]
    fn test_timeout_still_closes_connection() {
        let hv = Arc::new(FakeHv {
            lookup_delay: Some(Duration::from_millis(300)),
            ..lab()
        });
        let lc = Lifecycle::new(
            manager(&hv),
            LabConfig::new().timeout(Duration::from_millis(20)),
        );
        assert_eq!(vmerr!(ErrorKind::Timeout), lc.start("GOAD-DC02"));

        let s = Instant::now();
        while FakeHv::count(&hv.closes) == 0 && s.elapsed() < Duration::from_secs(5) {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(1, FakeHv::count(&hv.opens));
        assert_balanced(&hv);
    }
}
