use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;
use parking_lot::Mutex;
use runtime_native::{Engine, EngineError, EngineHost, EngineLoader, InputMode, SaveHook};
use transport::{TextAttr, WindowId, WindowType, NO_INPUT};

use crate::MOCK_TIMEOUT;

enum Step {
    Ready,
    Busy,
    PullKey,
    AwaitKey(Duration),
    PullPosition,
    PullLine,
    PullMenu,
    CreateWindow(WindowId, WindowType),
    ClearWindow(WindowId),
    DisplayWindow(WindowId, bool),
    DestroyWindow(WindowId),
    PutString(WindowId, TextAttr, String),
    Exit(Result<(), String>),
    Panic(String),
}

/// What the engine thread observed while executing a step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Done,
    Key(u32),
    Position(Option<(i32, i32)>),
    Line(Option<String>),
    Menu(Option<Vec<i32>>),
}

/// Builds a scripted engine and the controller that drives it.
///
/// The engine executes one step per controller call, on the engine thread,
/// and reports the outcome back before the call returns.
pub fn scripted_engine(mode: InputMode, with_save: bool) -> (MockLoader, MockController) {
    let (step_tx, step_rx) = unbounded();
    let (reply_tx, reply_rx) = unbounded();
    let saves = Arc::new(AtomicUsize::new(0));
    let engine = ScriptedEngine {
        mode,
        saves: with_save.then(|| Arc::clone(&saves)),
        steps: step_rx,
        replies: reply_tx,
    };
    let loader = MockLoader {
        engine: Mutex::new(Some(engine)),
    };
    let controller = MockController {
        steps: step_tx,
        replies: reply_rx,
        saves,
    };
    (loader, controller)
}

/// Hands out the scripted engine once; later loads fail like a missing library.
pub struct MockLoader {
    engine: Mutex<Option<ScriptedEngine>>,
}

impl EngineLoader for MockLoader {
    fn load(&self, library: &str) -> Result<Box<dyn Engine>, EngineError> {
        debug!("mock loader: loading `{library}`");
        match self.engine.lock().take() {
            Some(engine) => Ok(Box::new(engine)),
            None => Err(EngineError::Load {
                library: library.to_owned(),
                source: "mock engine already loaded".into(),
            }),
        }
    }
}

struct ScriptedEngine {
    mode: InputMode,
    saves: Option<Arc<AtomicUsize>>,
    steps: Receiver<Step>,
    replies: Sender<Reply>,
}

impl ScriptedEngine {
    fn await_key(host: &dyn EngineHost, timeout: Duration) -> u32 {
        let deadline = Instant::now() + timeout;
        loop {
            let code = host.pull_key();
            if code != NO_INPUT || Instant::now() >= deadline {
                return code;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }
}

impl Engine for ScriptedEngine {
    fn input_mode(&self) -> InputMode {
        self.mode
    }

    fn save_hook(&self) -> Option<SaveHook> {
        let saves = Arc::clone(self.saves.as_ref()?);
        Some(Box::new(move || {
            saves.fetch_add(1, Ordering::SeqCst);
        }))
    }

    fn run(&mut self, data_dir: &Path, host: &dyn EngineHost) -> Result<(), EngineError> {
        debug!("mock engine running in {}", data_dir.display());
        while let Ok(step) = self.steps.recv() {
            let reply = match step {
                Step::Ready => {
                    host.game_ready();
                    Reply::Done
                }
                Step::Busy => {
                    host.game_busy();
                    Reply::Done
                }
                Step::PullKey => Reply::Key(host.pull_key()),
                Step::AwaitKey(timeout) => Reply::Key(Self::await_key(host, timeout)),
                Step::PullPosition => Reply::Position(host.pull_position()),
                Step::PullLine => Reply::Line(host.pull_line()),
                Step::PullMenu => Reply::Menu(host.pull_menu_selection().map(|ids| ids.to_vec())),
                Step::CreateWindow(id, kind) => {
                    host.create_window(id, kind);
                    Reply::Done
                }
                Step::ClearWindow(id) => {
                    host.clear_window(id);
                    Reply::Done
                }
                Step::DisplayWindow(id, blocking) => {
                    host.display_window(id, blocking);
                    Reply::Done
                }
                Step::DestroyWindow(id) => {
                    host.destroy_window(id);
                    Reply::Done
                }
                Step::PutString(id, attr, text) => {
                    host.put_string(id, attr, &text);
                    Reply::Done
                }
                Step::Exit(result) => {
                    let _ = self.replies.send(Reply::Done);
                    return result.map_err(EngineError::Fault);
                }
                Step::Panic(message) => {
                    let _ = self.replies.send(Reply::Done);
                    panic!("{message}");
                }
            };
            if self.replies.send(reply).is_err() {
                break;
            }
        }
        debug!("mock engine: controller dropped");
        Ok(())
    }
}

/// Drives a [`scripted_engine`] from the test thread.
///
/// Every call blocks until the engine executed the step. Calls panic if
/// the engine does not answer within [`MOCK_TIMEOUT`].
pub struct MockController {
    steps: Sender<Step>,
    replies: Receiver<Reply>,
    saves: Arc<AtomicUsize>,
}

impl MockController {
    fn step(&self, step: Step) -> Reply {
        self.steps.send(step).expect("mock engine is gone");
        self.replies
            .recv_timeout(MOCK_TIMEOUT)
            .expect("mock engine did not answer")
    }

    fn done(&self, step: Step) {
        let reply = self.step(step);
        assert_eq!(reply, Reply::Done, "unexpected mock reply");
    }

    /// Number of times the engine's save hook ran.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn ready(&self) {
        self.done(Step::Ready);
    }

    pub fn busy(&self) {
        self.done(Step::Busy);
    }

    /// One non-blocking key pull.
    pub fn pull_key(&self) -> u32 {
        match self.step(Step::PullKey) {
            Reply::Key(code) => code,
            other => panic!("expected key, got {other:?}"),
        }
    }

    /// Polls the key pull until it yields a key or [`MOCK_TIMEOUT`] passes;
    /// `0` on timeout.
    pub fn await_key(&self) -> u32 {
        self.steps
            .send(Step::AwaitKey(MOCK_TIMEOUT))
            .expect("mock engine is gone");
        match self
            .replies
            .recv_timeout(MOCK_TIMEOUT * 2)
            .expect("mock engine did not answer")
        {
            Reply::Key(code) => code,
            other => panic!("expected key, got {other:?}"),
        }
    }

    pub fn pull_position(&self) -> Option<(i32, i32)> {
        match self.step(Step::PullPosition) {
            Reply::Position(position) => position,
            other => panic!("expected position, got {other:?}"),
        }
    }

    pub fn pull_line(&self) -> Option<String> {
        match self.step(Step::PullLine) {
            Reply::Line(line) => line,
            other => panic!("expected line, got {other:?}"),
        }
    }

    pub fn pull_menu_selection(&self) -> Option<Vec<i32>> {
        match self.step(Step::PullMenu) {
            Reply::Menu(ids) => ids,
            other => panic!("expected menu selection, got {other:?}"),
        }
    }

    pub fn create_window(&self, id: i32, kind: i32) {
        self.done(Step::CreateWindow(WindowId(id), WindowType(kind)));
    }

    pub fn clear_window(&self, id: i32) {
        self.done(Step::ClearWindow(WindowId(id)));
    }

    pub fn display_window(&self, id: i32, blocking: bool) {
        self.done(Step::DisplayWindow(WindowId(id), blocking));
    }

    pub fn destroy_window(&self, id: i32) {
        self.done(Step::DestroyWindow(WindowId(id)));
    }

    pub fn put_string(&self, id: i32, attr: i32, text: &str) {
        self.done(Step::PutString(WindowId(id), TextAttr(attr), text.to_owned()));
    }

    /// Ends the game normally.
    pub fn exit(&self) {
        self.done(Step::Exit(Ok(())));
    }

    /// Ends the game with a fault carrying `message`.
    pub fn fail(&self, message: &str) {
        self.done(Step::Exit(Err(message.to_owned())));
    }

    /// Panics on the engine thread with `message`.
    pub fn panic(&self, message: &str) {
        self.done(Step::Panic(message.to_owned()));
    }
}
