use hub::{
    create_connection, create_local_connection, create_ssh_connection, Connection, ConnectionConfig,
    ConnectionError, ConnectionFactory, ConnectionType, ExitPolicy, SessionState,
};

fn thread_factory() -> ConnectionFactory {
    ConnectionFactory::builder()
        .exit_policy(ExitPolicy::Thread)
        .build()
}

#[test]
fn local_config_builds_an_idle_local_connection() {
    let conn = create_connection(&ConnectionConfig::for_local("nethack", "nethack")).unwrap();
    assert_eq!(conn.connection_type(), ConnectionType::Local);
    assert_eq!(conn.session_state(), SessionState::Idle);
    assert!(!conn.is_connected());
}

#[test]
fn local_config_needs_a_library_name() {
    for library in [None, Some("")] {
        let mut config = ConnectionConfig::for_local("nethack", "nethack");
        config.library_name = library.map(str::to_owned);
        let err = create_connection(&config).err().expect("expected create_connection to fail");
        assert!(matches!(err, ConnectionError::InvalidConfig(_)));
        assert_eq!(err.to_string(), "Library name required for local connection");
    }
}

#[test]
fn ssh_config_fills_defaults() {
    let config = ConnectionConfig::for_ssh("nethack.alt.org", 0, None, None, "nethack");
    let conn = thread_factory().ssh_from_config(&config).unwrap();
    assert_eq!(conn.host(), "nethack.alt.org");
    assert_eq!(conn.port(), 22);
    assert_eq!(conn.username(), "");
    assert_eq!(conn.password(), "");

    let boxed = create_connection(&config).unwrap();
    assert_eq!(boxed.connection_type(), ConnectionType::Ssh);
}

#[test]
fn ssh_config_keeps_explicit_values() {
    let config =
        ConnectionConfig::for_ssh("localhost", 2022, Some("wizard"), Some("xyzzy"), "slashem");
    let conn = thread_factory().ssh_from_config(&config).unwrap();
    assert_eq!(conn.port(), 2022);
    assert_eq!(conn.username(), "wizard");
    assert_eq!(conn.password(), "xyzzy");
}

#[test]
fn ssh_config_needs_a_host() {
    let mut config = ConnectionConfig::for_ssh("", 22, None, None, "nethack");
    let err = create_connection(&config).err().expect("expected create_connection to fail");
    assert_eq!(err.to_string(), "Host required for SSH connection");

    config.host = None;
    assert!(matches!(
        create_connection(&config),
        Err(ConnectionError::InvalidConfig(_))
    ));
}

#[test]
fn telnet_is_unsupported() {
    let config = ConnectionConfig::for_telnet("nethack.alt.org", 23, "nethack");
    let err = create_connection(&config).err().expect("expected create_connection to fail");
    assert!(matches!(err, ConnectionError::UnsupportedTransport(_)));
    assert_eq!(err.to_string(), "Telnet connections not yet supported");
}

#[test]
fn toml_config_round_trips_through_the_factory() {
    let config = ConnectionConfig::from_toml_str(
        r#"
        type = "SSH"
        host = "eu.hardfought.org"
        port = -1
        variant = "nethack"
        "#,
    )
    .unwrap();
    let conn = thread_factory().ssh_from_config(&config).unwrap();
    assert_eq!(conn.port(), 22);
}

#[test]
fn direct_constructors_skip_validation() {
    let local = create_local_connection("unnethack");
    assert_eq!(local.library_name(), "unnethack");
    let remote = create_ssh_connection("host", 2222, "u", "p");
    assert_eq!(remote.port(), 2222);
}
