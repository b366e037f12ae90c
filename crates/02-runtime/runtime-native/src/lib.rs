#![deny(unsafe_op_in_unsafe_fn)]
//! Engine runtime: the contract between the host and an embedded game
//! engine, the C hook table native engines call, and the session body that
//! runs on the engine thread.

mod engine;
pub mod ffi;
mod native;
mod session;

pub use engine::{Engine, EngineError, EngineHost, EngineLoader, InputMode, SaveHook};
pub use ffi::ForkfrontHooks;
pub use native::{NativeEngine, NativeLoader, INPUT_MODE_SYMBOL, MAIN_SYMBOL, SAVE_SYMBOL};
pub use session::{run_session, ExitPolicy};
