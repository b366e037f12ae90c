#![cfg(test)]

use hub::{
    Connection, ConnectionConfig, ConnectionError, ConnectionFactory, EventSink, ExitPolicy,
    InputMode, LocalConnection, SessionState, TextAttr, WindowId, WindowType,
};
use mock::{recording_sink, scripted_engine, MockController, SinkEvent, SinkEvents, MOCK_TIMEOUT};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

struct Session {
    conn: LocalConnection,
    engine: MockController,
    events: SinkEvents,
    _sink: Arc<dyn EventSink>,
}

fn session(mode: InputMode, with_save: bool) -> Session {
    let _ = env_logger::builder().is_test(true).try_init();
    let (loader, engine) = scripted_engine(mode, with_save);
    let factory = ConnectionFactory::builder()
        .loader(Arc::new(loader))
        .exit_policy(ExitPolicy::Thread)
        .build();
    let conn = factory
        .local_from_config(&ConnectionConfig::for_local("nethack", "nethack"))
        .expect("local config is valid");
    let (sink, events) = recording_sink();
    conn.set_handler(Some(&sink));
    conn.start(Path::new("/data")).expect("first start");
    assert_eq!(events.next(MOCK_TIMEOUT), Some(SinkEvent::Connected));
    Session {
        conn,
        engine,
        events,
        _sink: sink,
    }
}

impl Session {
    fn finish(self) -> SinkEvents {
        self.engine.exit();
        self.conn.join();
        assert_eq!(self.conn.session_state(), SessionState::Dead);
        self.events
    }
}

fn count(events: &[SinkEvent], want: &SinkEvent) -> usize {
    events.iter().filter(|event| *event == want).count()
}

#[test]
fn basic_key_flow() {
    let s = session(InputMode::Structured, false);
    s.engine.ready();
    s.conn.send_key('h');
    assert_eq!(s.engine.await_key(), 'h' as u32);

    let events = s.finish().drain();
    assert_eq!(count(&events, &SinkEvent::Ready), 1, "{events:?}");
}

#[test]
fn abort_follows_pending_keys() {
    let s = session(InputMode::Structured, false);
    s.conn.send_key('a');
    s.conn.abort();
    assert_eq!(s.engine.await_key(), 'a' as u32);
    assert_eq!(s.engine.await_key(), 0x1B);
    s.finish();
}

#[test]
fn wait_ready_wakes_on_engine_prompt() {
    let s = session(InputMode::Structured, false);
    assert!(!s.conn.is_ready());

    let woke_at = thread::scope(|scope| {
        let waiter = scope.spawn(|| {
            s.conn.wait_ready().expect("engine prompts");
            Instant::now()
        });
        thread::sleep(Duration::from_millis(50));
        let prompted_at = Instant::now();
        s.engine.ready();
        waiter.join().expect("waiter thread") - prompted_at
    });
    assert!(woke_at < Duration::from_millis(500), "woke after {woke_at:?}");
    assert!(s.conn.is_ready());
    s.finish();
}

#[test]
fn abort_is_not_stuck_behind_an_unanswered_line() {
    let s = session(InputMode::Structured, false);
    s.engine.ready();
    s.conn.send_line("Elbereth");
    assert_eq!(s.engine.pull_key(), 0, "line waits for its prompt");
    s.conn.abort();
    assert_eq!(s.engine.await_key(), 0x1B);
    assert_eq!(s.engine.pull_line(), None, "the line was dropped");
    s.finish();
}

#[test]
fn interrupt_reaches_a_waiter_still_draining() {
    let s = session(InputMode::Structured, false);
    s.conn.send_key('x');
    thread::scope(|scope| {
        let waiter = scope.spawn(|| s.conn.wait_ready_timeout(MOCK_TIMEOUT));
        thread::sleep(Duration::from_millis(50));
        s.conn.interrupt_waiters();
        assert!(matches!(
            waiter.join().expect("waiter thread"),
            Err(ConnectionError::Interrupted)
        ));
    });
    assert_eq!(s.engine.await_key(), 'x' as u32);
    s.finish();
}

#[test]
fn second_start_leaves_first_session_running() {
    let s = session(InputMode::Structured, false);
    let err = s.conn.start(Path::new("/elsewhere")).unwrap_err();
    assert!(matches!(err, ConnectionError::AlreadyConnected));
    assert_eq!(s.conn.session_state(), SessionState::Running);
    assert!(s.conn.is_connected());

    s.conn.send_key('i');
    assert_eq!(s.engine.await_key(), 'i' as u32);
    s.finish();
}

#[test]
fn structured_prompts_take_their_own_commands() {
    let s = session(InputMode::Structured, false);
    s.conn.send_position(12, 7);
    s.conn.send_line("Elbereth");
    s.conn.send_menu_selection(&[3, 1]);

    assert_eq!(s.engine.pull_key(), 0, "position waits for its prompt");
    assert_eq!(s.engine.pull_line(), None);
    assert_eq!(s.engine.pull_position(), Some((12, 7)));
    assert_eq!(s.engine.pull_line().as_deref(), Some("Elbereth"));
    assert_eq!(s.engine.pull_menu_selection(), Some(vec![3, 1]));
    assert_eq!(s.engine.pull_key(), 0);
    s.finish();
}

#[test]
fn keys_only_engine_skips_structured_commands() {
    let s = session(InputMode::KeysOnly, false);
    s.conn.send_position(1, 2);
    s.conn.send_key('x');
    assert_eq!(s.engine.pull_key(), 0);
    assert_eq!(s.engine.pull_key(), 'x' as u32);
    s.finish();
}

#[test]
fn save_runs_on_the_engine_thread_between_keys() {
    let s = session(InputMode::Structured, true);
    s.conn.send_key('a');
    s.conn.save_state();
    s.conn.send_key('b');
    assert_eq!(s.engine.pull_key(), 'a' as u32);
    assert_eq!(s.engine.saves(), 0);
    assert_eq!(s.engine.pull_key(), 0);
    assert_eq!(s.engine.saves(), 1);
    assert_eq!(s.engine.pull_key(), 'b' as u32);
    s.finish();
}

#[test]
fn window_output_is_relayed_in_order() {
    let s = session(InputMode::Structured, false);
    s.engine.create_window(2, 4);
    s.engine.put_string(2, 0, "You see here a scroll labeled ELBIB YLOH.");
    s.engine.display_window(2, true);
    s.engine.clear_window(2);
    s.engine.destroy_window(2);

    let events = s.finish().drain();
    assert_eq!(
        events,
        vec![
            SinkEvent::CreateWindow(WindowId(2), WindowType(4)),
            SinkEvent::PutString(
                WindowId(2),
                TextAttr::NONE,
                "You see here a scroll labeled ELBIB YLOH.".into()
            ),
            SinkEvent::DisplayWindow(WindowId(2), true),
            SinkEvent::ClearWindow(WindowId(2)),
            SinkEvent::DestroyWindow(WindowId(2)),
        ]
    );
}

#[test]
fn engine_fault_reaches_sink_and_ends_session() {
    let s = session(InputMode::Structured, false);
    s.engine.ready();
    s.engine.fail("You die...");
    s.conn.join();

    let error = s
        .events
        .wait_for(MOCK_TIMEOUT, |event| matches!(event, SinkEvent::Error(_)));
    assert_eq!(
        error,
        Some(SinkEvent::Error("Native game crashed: You die...".into()))
    );
    assert!(!s.conn.is_connected());
    assert_eq!(s.conn.session_state(), SessionState::Dead);
    assert!(matches!(
        s.conn.wait_ready(),
        Err(ConnectionError::Disconnected)
    ));
}

#[test]
fn engine_panic_is_contained() {
    let s = session(InputMode::Structured, false);
    s.engine.panic("dungeon collapse");
    s.conn.join();
    let error = s
        .events
        .wait_for(MOCK_TIMEOUT, |event| matches!(event, SinkEvent::Error(_)));
    assert_eq!(
        error,
        Some(SinkEvent::Error("Native game crashed: dungeon collapse".into()))
    );
}

#[test]
fn disconnect_unblocks_waiters_and_notifies_once() {
    let s = session(InputMode::Structured, false);
    thread::scope(|scope| {
        let waiter = scope.spawn(|| s.conn.wait_ready());
        thread::sleep(Duration::from_millis(50));
        s.conn.disconnect();
        assert!(matches!(
            waiter.join().expect("waiter thread"),
            Err(ConnectionError::Disconnected)
        ));
    });
    s.conn.disconnect();
    assert_eq!(s.engine.await_key(), 0x1B, "disconnect aborts the prompt");

    let events = s.finish().drain();
    assert_eq!(count(&events, &SinkEvent::Disconnected), 1, "{events:?}");
}

#[test]
fn wait_ready_after_drop_of_sink_still_works() {
    let Session {
        conn,
        engine,
        events,
        _sink,
    } = session(InputMode::Structured, false);
    drop(_sink);
    engine.ready();
    conn.wait_ready().expect("latch works without a sink");
    assert!(events.drain().is_empty());
    engine.exit();
    conn.join();
}
