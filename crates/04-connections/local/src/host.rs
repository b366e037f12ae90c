use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use connection_abi::{SessionState, SinkSlot};
use log::{debug, error, trace, warn};
use parking_lot::Mutex;
use runtime_native::{EngineError, EngineHost, InputMode, SaveHook};
use transport::{
    Command, CommandCursor, CommandQueue, MenuSelection, ReadyLatch, TextAttr, WindowId,
    WindowType, NO_INPUT,
};

/// State shared by the connection handle (UI side) and the engine thread.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) queue: CommandQueue,
    pub(crate) latch: ReadyLatch,
    pub(crate) sink: SinkSlot,
    pub(crate) connected: AtomicBool,
    state: AtomicU8,
}

impl Shared {
    pub(crate) fn new(queue: CommandQueue) -> Self {
        Self {
            queue,
            latch: ReadyLatch::new(),
            sink: SinkSlot::new(),
            connected: AtomicBool::new(false),
            state: AtomicU8::new(SessionState::Idle as u8),
        }
    }

    pub(crate) fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire)).unwrap_or(SessionState::Dead)
    }

    pub(crate) fn set_state(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Moves `from` → `to`; returns `false` if the session was elsewhere.
    pub(crate) fn transition(&self, from: SessionState, to: SessionState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

enum HeadAction {
    Empty,
    Key(u32),
    Save,
    Structured,
}

/// Engine-facing half of a local session. Lives on the engine thread.
pub(crate) struct SessionHost {
    shared: Arc<Shared>,
    cursor: Mutex<CommandCursor>,
    mode: Mutex<InputMode>,
    save: Mutex<Option<SaveHook>>,
}

impl SessionHost {
    pub(crate) fn new(shared: Arc<Shared>, cursor: CommandCursor) -> Self {
        Self {
            shared,
            cursor: Mutex::new(cursor),
            mode: Mutex::new(InputMode::default()),
            save: Mutex::new(None),
        }
    }

    /// Hands a command to the engine. The latch flips to BUSY before the
    /// command leaves the pending count, so a UI thread that saw the queue
    /// drain cannot observe the READY of the prompt that consumed it.
    fn deliver(&self, cursor: &mut CommandCursor) -> Option<Command> {
        self.shared.latch.set_busy();
        cursor.try_pop()
    }

    /// Takes the head only when `extract` recognises it.
    fn pull_structured<T>(&self, extract: impl FnOnce(&Command) -> Option<T>) -> Option<T> {
        let mut cursor = self.cursor.lock();
        let value = extract(cursor.peek()?)?;
        self.deliver(&mut cursor);
        Some(value)
    }

    fn run_save(&self) {
        match self.save.lock().as_ref() {
            Some(save) => {
                debug!("running engine save hook");
                save();
            }
            None => warn!("engine exports no save entry point; save request dropped"),
        }
    }

    /// Records the end of the session and notifies the sink.
    pub(crate) fn finish(&self, outcome: &Result<(), EngineError>) {
        self.shared.set_state(SessionState::Ending);
        self.shared.connected.store(false, Ordering::Release);
        match outcome {
            Ok(()) => debug!("local engine finished"),
            Err(err) => {
                error!("local engine failed: {err}");
                let message = if err.is_load_failure() {
                    format!("Failed to load native game: {err}")
                } else {
                    format!("Native game crashed: {err}")
                };
                self.shared.sink.dispatch(|sink| sink.on_error(&message));
            }
        }
        self.shared.latch.close();
        self.shared.set_state(SessionState::Dead);
    }
}

impl EngineHost for SessionHost {
    fn engine_loaded(&self, mode: InputMode, save: Option<SaveHook>) {
        debug!("engine loaded: mode={mode:?} save_hook={}", save.is_some());
        *self.mode.lock() = mode;
        *self.save.lock() = save;
    }

    fn pull_key(&self) -> u32 {
        let mode = *self.mode.lock();
        let mut cursor = self.cursor.lock();
        loop {
            let action = match cursor.peek() {
                None => HeadAction::Empty,
                Some(Command::SaveState) => HeadAction::Save,
                Some(cmd) => match cmd.key_code() {
                    Some(code) => HeadAction::Key(code),
                    None => HeadAction::Structured,
                },
            };
            match action {
                HeadAction::Empty => return NO_INPUT,
                HeadAction::Key(code) => {
                    self.deliver(&mut cursor);
                    trace!("pull_key -> {code:#x}");
                    return code;
                }
                HeadAction::Save => {
                    cursor.try_pop();
                    drop(cursor);
                    self.run_save();
                    return NO_INPUT;
                }
                HeadAction::Structured if mode == InputMode::KeysOnly => {
                    if let Some(cmd) = cursor.try_pop() {
                        trace!("keys-only engine: discarding {:?}", cmd.kind());
                    }
                    return NO_INPUT;
                }
                // A queued abort must reach the key prompt, so structured
                // input nobody claimed is dropped in front of it.
                HeadAction::Structured if cursor.abort_queued() => {
                    if let Some(cmd) = cursor.try_pop() {
                        debug!("abort pending: discarding unclaimed {:?}", cmd.kind());
                    }
                }
                HeadAction::Structured => return NO_INPUT,
            }
        }
    }

    fn pull_position(&self) -> Option<(i32, i32)> {
        self.pull_structured(|cmd| match cmd {
            Command::Position { x, y } => Some((*x, *y)),
            _ => None,
        })
    }

    fn pull_line(&self) -> Option<String> {
        self.pull_structured(|cmd| match cmd {
            Command::Line(line) => Some(line.clone()),
            _ => None,
        })
    }

    fn pull_menu_selection(&self) -> Option<MenuSelection> {
        self.pull_structured(|cmd| match cmd {
            Command::MenuSelection(ids) => Some(ids.clone()),
            _ => None,
        })
    }

    fn game_ready(&self) {
        if self.shared.latch.set_ready() {
            trace!("engine ready");
            self.shared.sink.dispatch(|sink| sink.on_ready());
        }
    }

    fn game_busy(&self) {
        if self.shared.latch.set_busy() {
            trace!("engine busy");
        }
    }

    fn create_window(&self, id: WindowId, kind: WindowType) {
        self.shared
            .sink
            .dispatch(|sink| sink.on_create_window(id, kind));
    }

    fn clear_window(&self, id: WindowId) {
        self.shared.sink.dispatch(|sink| sink.on_clear_window(id));
    }

    fn display_window(&self, id: WindowId, blocking: bool) {
        self.shared
            .sink
            .dispatch(|sink| sink.on_display_window(id, blocking));
    }

    fn destroy_window(&self, id: WindowId) {
        self.shared.sink.dispatch(|sink| sink.on_destroy_window(id));
    }

    fn put_string(&self, id: WindowId, attr: TextAttr, text: &str) {
        self.shared
            .sink
            .dispatch(|sink| sink.on_put_string(id, attr, text));
    }
}
