//! Local transport: runs a native game engine on a dedicated thread and
//! bridges it to the [`Connection`] surface.
//!
//! UI threads enqueue [`Command`]s; the engine pulls them synchronously
//! through [`EngineHost`](runtime_native::EngineHost) hooks and reports
//! output through the attached [`EventSink`].

mod host;

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use connection_abi::{
    Connection, ConnectionError, ConnectionResult, ConnectionType, EventSink, SessionState,
};
use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use runtime_native::{run_session, EngineLoader, ExitPolicy, NativeLoader};
use transport::{
    command_queue, Command, CommandCursor, MenuSelection, DRAIN_DEADLINE, READY_POLL_INTERVAL,
};

use crate::host::{SessionHost, Shared};

const ENGINE_THREAD_NAME: &str = "local-engine";

/// Connection to an engine loaded in-process.
pub struct LocalConnection {
    library: String,
    loader: Arc<dyn EngineLoader>,
    exit_policy: ExitPolicy,
    shared: Arc<Shared>,
    cursor: Mutex<Option<CommandCursor>>,
    data_dir: Mutex<Option<PathBuf>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl LocalConnection {
    /// Connection that loads `library` with the platform's dynamic loader
    /// and ends the process when the engine returns.
    pub fn new(library: impl Into<String>) -> Self {
        Self::with_loader(library, Arc::new(NativeLoader))
    }

    /// Connection that resolves `library` through a custom loader.
    pub fn with_loader(library: impl Into<String>, loader: Arc<dyn EngineLoader>) -> Self {
        let (queue, cursor) = command_queue();
        Self {
            library: library.into(),
            loader,
            exit_policy: ExitPolicy::default(),
            shared: Arc::new(Shared::new(queue)),
            cursor: Mutex::new(Some(cursor)),
            data_dir: Mutex::new(None),
            worker: Mutex::new(None),
        }
    }

    /// Overrides what happens to the process when the engine ends.
    pub fn exit_policy(mut self, policy: ExitPolicy) -> Self {
        self.exit_policy = policy;
        self
    }

    pub fn library_name(&self) -> &str {
        &self.library
    }

    /// Directory handed to the engine, once started.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir.lock().clone()
    }

    /// Wakes threads blocked in [`Connection::wait_ready`] with
    /// [`ConnectionError::Interrupted`].
    pub fn interrupt_waiters(&self) {
        self.shared.latch.interrupt();
    }

    /// Waits for the engine thread to end. Returns immediately if the
    /// session never started.
    pub fn join(&self) {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("engine thread ended by panic");
            }
        }
    }

    fn enqueue(&self, cmd: Command) {
        trace!("enqueue {:?}", cmd.kind());
        self.shared.queue.enqueue(cmd);
    }

    fn worker_alive(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Drains pending input, then waits for the next READY. `timeout`
    /// bounds both phases together. Interrupts raised at any point after
    /// the call began end the wait.
    fn wait_ready_until(&self, timeout: Option<Duration>) -> ConnectionResult<()> {
        if self.shared.state() == SessionState::Idle {
            return Err(ConnectionError::Disconnected);
        }
        let latch = &self.shared.latch;
        let since = latch.interrupt_mark();
        let now = Instant::now();
        let deadline = timeout.map(|timeout| now + timeout);
        let drain_deadline = match deadline {
            Some(deadline) => deadline.min(now + DRAIN_DEADLINE),
            None => now + DRAIN_DEADLINE,
        };
        let drained = self.shared.queue.drain_unless(drain_deadline, || {
            latch.interrupted_since(since) || latch.is_closed()
        });
        if !drained {
            debug!(
                "waiting on the latch with {} command(s) still pending",
                self.shared.queue.len()
            );
        }
        latch.await_ready_by(READY_POLL_INTERVAL, since, deadline)?;
        Ok(())
    }
}

impl Connection for LocalConnection {
    fn start(&self, data_dir: &Path) -> ConnectionResult<()> {
        if !self
            .shared
            .transition(SessionState::Idle, SessionState::Starting)
        {
            return Err(ConnectionError::AlreadyConnected);
        }
        let Some(cursor) = self.cursor.lock().take() else {
            return Err(ConnectionError::AlreadyConnected);
        };
        let data_dir = data_dir.to_path_buf();
        *self.data_dir.lock() = Some(data_dir.clone());

        self.shared.connected.store(true, Ordering::Release);
        self.shared.sink.dispatch(|sink| sink.on_connected());

        let host = SessionHost::new(Arc::clone(&self.shared), cursor);
        let loader = Arc::clone(&self.loader);
        let library = self.library.clone();
        let policy = self.exit_policy;
        let spawned = thread::Builder::new()
            .name(ENGINE_THREAD_NAME.into())
            .spawn(move || {
                let outcome = run_session(loader.as_ref(), &library, &data_dir, &host);
                host.finish(&outcome);
                policy.apply(&outcome);
            });

        match spawned {
            Ok(handle) => {
                *self.worker.lock() = Some(handle);
                self.shared
                    .transition(SessionState::Starting, SessionState::Running);
                info!("local connection started: library={}", self.library);
                Ok(())
            }
            Err(err) => {
                warn!("could not spawn engine thread: {err}");
                self.shared.connected.store(false, Ordering::Release);
                self.shared.latch.close();
                self.shared.set_state(SessionState::Dead);
                self.shared.sink.dispatch(|sink| sink.on_disconnected());
                Err(ConnectionError::StartFailed(err))
            }
        }
    }

    fn send_key(&self, key: char) {
        self.enqueue(Command::Key(key));
    }

    fn send_directional_key(&self, key: char) {
        self.enqueue(Command::DirKey(key));
    }

    fn send_position(&self, x: i32, y: i32) {
        self.enqueue(Command::Position { x, y });
    }

    fn send_line(&self, line: &str) {
        self.enqueue(Command::Line(line.to_owned()));
    }

    fn send_menu_selection(&self, selected: &[i32]) {
        self.enqueue(Command::MenuSelection(MenuSelection::from_slice(selected)));
    }

    fn save_state(&self) {
        self.enqueue(Command::SaveState);
    }

    fn abort(&self) {
        self.enqueue(Command::Abort);
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire) && self.worker_alive()
    }

    fn is_ready(&self) -> bool {
        self.shared.latch.is_ready()
    }

    fn wait_ready(&self) -> ConnectionResult<()> {
        self.wait_ready_until(None)
    }

    fn wait_ready_timeout(&self, timeout: Duration) -> ConnectionResult<()> {
        self.wait_ready_until(Some(timeout))
    }

    fn connection_type(&self) -> ConnectionType {
        ConnectionType::Local
    }

    fn session_state(&self) -> SessionState {
        self.shared.state()
    }

    fn disconnect(&self) {
        if !self.shared.connected.swap(false, Ordering::AcqRel) {
            return;
        }
        info!("disconnecting local connection");
        self.abort();
        self.shared.latch.close();
        self.shared.sink.dispatch(|sink| sink.on_disconnected());
    }

    fn set_handler(&self, sink: Option<&Arc<dyn EventSink>>) {
        self.shared.sink.set(sink);
    }
}

impl std::fmt::Debug for LocalConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalConnection")
            .field("library", &self.library)
            .field("exit_policy", &self.exit_policy)
            .field("state", &self.shared.state())
            .field("connected", &self.shared.connected.load(Ordering::Relaxed))
            .finish()
    }
}
