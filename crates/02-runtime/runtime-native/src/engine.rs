//! Engine-side contract: what an embedded game engine provides and what it
//! may call back into while it runs.

use std::error::Error as StdError;
use std::path::Path;

use thiserror::Error;
use transport::{MenuSelection, TextAttr, WindowId, WindowType};

/// Callback the host invokes on the engine thread to snapshot the game.
pub type SaveHook = Box<dyn Fn() + Send>;

/// How the engine takes structured input (positions, lines, menu picks).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InputMode {
    /// Structured commands wait at the queue head for the dedicated pulls;
    /// the key pull returns `0` without consuming them. An unclaimed
    /// structured head blocks every later command until its pull runs,
    /// unless an abort is queued: the key pull then drops it so the
    /// escape still arrives.
    #[default]
    Structured,
    /// Only the key pull is wired: every command is consumed by it and
    /// structured commands yield `0`.
    KeysOnly,
}

/// Failures raised while loading or running an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to load engine library `{library}`: {source}")]
    Load {
        library: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("engine library `{library}` does not export `{symbol}`")]
    MissingSymbol {
        library: String,
        symbol: &'static str,
    },

    #[error("invalid engine argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Fault(String),
}

impl EngineError {
    pub fn fault(msg: impl Into<String>) -> Self {
        EngineError::Fault(msg.into())
    }

    /// True when the engine never started running.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            EngineError::Load { .. } | EngineError::MissingSymbol { .. }
        )
    }
}

/// Services the host offers to a running engine.
///
/// Every method is invoked on the engine thread.
pub trait EngineHost: Sync {
    /// Called once after loading, before [`Engine::run`].
    fn engine_loaded(&self, mode: InputMode, save: Option<SaveHook>);

    /// Pulls one key code: `0` when nothing is available, `0x1B` to abort.
    fn pull_key(&self) -> u32;
    /// Takes a map position if one is at the head of the queue.
    fn pull_position(&self) -> Option<(i32, i32)>;
    /// Takes a text line if one is at the head of the queue.
    fn pull_line(&self) -> Option<String>;
    /// Takes a menu selection if one is at the head of the queue.
    fn pull_menu_selection(&self) -> Option<MenuSelection>;

    /// The engine parked waiting for input.
    fn game_ready(&self);
    /// The engine resumed work.
    fn game_busy(&self);

    fn create_window(&self, id: WindowId, kind: WindowType);
    fn clear_window(&self, id: WindowId);
    fn display_window(&self, id: WindowId, blocking: bool);
    fn destroy_window(&self, id: WindowId);
    fn put_string(&self, id: WindowId, attr: TextAttr, text: &str);
}

/// An engine instance ready to run one session.
pub trait Engine: Send {
    fn input_mode(&self) -> InputMode {
        InputMode::Structured
    }

    /// Snapshot entry point, if the engine exports one.
    fn save_hook(&self) -> Option<SaveHook> {
        None
    }

    /// Runs the game until the session ends.
    fn run(&mut self, data_dir: &Path, host: &dyn EngineHost) -> Result<(), EngineError>;
}

/// Resolves an engine by library name.
pub trait EngineLoader: Send + Sync {
    fn load(&self, library: &str) -> Result<Box<dyn Engine>, EngineError>;
}
