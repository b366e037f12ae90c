//! End-to-end suite: connections built by the factory, driven against the
//! scripted mock engine.

#[cfg(test)]
mod local_e2e;

#[cfg(test)]
mod tests {
    use hub::{
        Connection, ConnectionConfig, ConnectionError, ConnectionFactory, ConnectionType,
        ExitPolicy,
    };
    use mock::EchoLoader;
    use std::sync::Arc;

    fn echo_factory() -> ConnectionFactory {
        ConnectionFactory::builder()
            .loader(Arc::new(EchoLoader))
            .exit_policy(ExitPolicy::Thread)
            .build()
    }

    #[test]
    fn empty_library_name_is_rejected() {
        let err = echo_factory()
            .create_connection(&ConnectionConfig::for_local("", "nethack"))
            .err().expect("expected create_connection to fail");
        assert!(matches!(&err, ConnectionError::InvalidConfig(msg)
            if msg == "Library name required for local connection"));
    }

    #[test]
    fn ssh_defaults_fill_in() {
        let config = ConnectionConfig::for_ssh("host", 0, None, None, "nethack");
        let conn = echo_factory().ssh_from_config(&config).unwrap();
        assert_eq!(conn.port(), 22);
        assert_eq!(conn.username(), "");
        assert_eq!(conn.password(), "");
        assert_eq!(conn.connection_type(), ConnectionType::Ssh);
    }

    #[test]
    fn echo_engine_session_runs_to_completion() {
        let _ = env_logger::builder().is_test(true).try_init();
        let conn = echo_factory()
            .local_from_config(&ConnectionConfig::for_local("echo", "echo"))
            .unwrap();
        let (sink, events) = mock::recording_sink();
        conn.set_handler(Some(&sink));
        conn.start(std::path::Path::new("/data")).unwrap();

        conn.wait_ready().unwrap();
        conn.send_line("Elbereth");
        conn.wait_ready().unwrap();
        conn.send_key('q');
        conn.join();

        let said: Vec<String> = events
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                mock::SinkEvent::PutString(id, _, text) if id == mock::ECHO_WINDOW => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(
            said,
            vec![
                "Echo engine ready in /data".to_owned(),
                "You said: Elbereth".to_owned(),
                "Goodbye after 1 turn(s)".to_owned(),
            ]
        );
        assert!(!conn.is_connected());
    }
}
