use toporank_types::*;

#[test]
fn configuration_errors_exit_with_reserved_code() {
    let e = TopoRankError::degree_mismatch(3, 2, 4);
    assert!(e.is_configuration_error());
    assert!(!e.is_retryable());
    assert_eq!(e.exit_code(), CONFIGURATION_EXIT_CODE);

    let e = TopoRankError::control_daemon_missing("/usr/sbin/sshd");
    assert!(e.is_configuration_error());
    assert_eq!(e.exit_code(), 2);

    let e = TopoRankError::malformed_record(3, "h1 spine0 extra");
    assert!(e.is_configuration_error());
}

#[test]
fn readiness_errors_are_retryable() {
    let e = TopoRankError::topology_unavailable("/opt/ml/code/node_to_spine.txt", "not found");
    assert!(e.is_retryable());
    assert!(!e.is_configuration_error());
    assert_eq!(e.exit_code(), FAILURE_EXIT_CODE);
}

#[test]
fn messages_echo_offending_input() {
    let e = TopoRankError::degree_mismatch(3, 2, 4);
    let msg = e.to_string();
    assert!(msg.contains("(3)"));
    assert!(msg.contains("(2)"));
    assert!(msg.contains("(4)"));

    let e = TopoRankError::malformed_record(7, "lonely-host");
    assert!(e.to_string().contains("line 7"));
    assert!(e.to_string().contains("lonely-host"));
}

#[test]
fn error_conversions() {
    let io_err: TopoRankError = std::io::Error::new(std::io::ErrorKind::Other, "io").into();
    match io_err {
        TopoRankError::IO { .. } => {}
        _ => panic!("wrong kind"),
    }

    let ser_err: TopoRankError = serde_json::from_str::<serde_json::Value>("{")
        .unwrap_err()
        .into();
    match ser_err {
        TopoRankError::Serialization { .. } => {}
        _ => panic!("wrong kind"),
    }

    let toml_err: TopoRankError = toml::from_str::<toml::Value>("= nope").unwrap_err().into();
    assert!(toml_err.is_configuration_error());
}
