//! Engine thread body: load, run, and decide what happens to the process
//! when the engine ends.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::process;

use log::{error, info};

use crate::engine::{EngineError, EngineHost, EngineLoader};

/// What the worker does to the host process once the engine ends.
///
/// Engines keep process-wide state that cannot be re-initialised, so the
/// default ends the process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExitPolicy {
    /// Exit with status 0 on a normal return; abort on a fault.
    #[default]
    Process,
    /// Only the engine thread ends. For tests and hosts that isolate the
    /// engine some other way.
    Thread,
}

impl ExitPolicy {
    /// Applies the policy to a finished session. Returns only under
    /// [`ExitPolicy::Thread`].
    pub fn apply(self, outcome: &Result<(), EngineError>) {
        match (self, outcome) {
            (ExitPolicy::Thread, _) => {}
            (ExitPolicy::Process, Ok(())) => {
                info!("engine finished; exiting process");
                process::exit(0);
            }
            (ExitPolicy::Process, Err(err)) => {
                error!("engine failed ({err}); aborting process");
                process::abort();
            }
        }
    }
}

/// Loads `library` and runs it to completion on the calling thread.
///
/// Panics escaping the engine are reported as [`EngineError::Fault`].
pub fn run_session(
    loader: &dyn EngineLoader,
    library: &str,
    data_dir: &Path,
    host: &dyn EngineHost,
) -> Result<(), EngineError> {
    info!("starting engine `{library}` in {}", data_dir.display());
    let mut engine = loader.load(library)?;
    host.engine_loaded(engine.input_mode(), engine.save_hook());
    match catch_unwind(AssertUnwindSafe(|| engine.run(data_dir, host))) {
        Ok(result) => result,
        Err(payload) => Err(EngineError::Fault(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "engine panicked".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Engine, InputMode, SaveHook};
    use parking_lot::Mutex;
    use transport::{MenuSelection, TextAttr, WindowId, WindowType};

    #[derive(Default)]
    struct NullHost {
        loaded: Mutex<Option<(InputMode, bool)>>,
    }

    impl EngineHost for NullHost {
        fn engine_loaded(&self, mode: InputMode, save: Option<SaveHook>) {
            *self.loaded.lock() = Some((mode, save.is_some()));
        }
        fn pull_key(&self) -> u32 {
            0
        }
        fn pull_position(&self) -> Option<(i32, i32)> {
            None
        }
        fn pull_line(&self) -> Option<String> {
            None
        }
        fn pull_menu_selection(&self) -> Option<MenuSelection> {
            None
        }
        fn game_ready(&self) {}
        fn game_busy(&self) {}
        fn create_window(&self, _id: WindowId, _kind: WindowType) {}
        fn clear_window(&self, _id: WindowId) {}
        fn display_window(&self, _id: WindowId, _blocking: bool) {}
        fn destroy_window(&self, _id: WindowId) {}
        fn put_string(&self, _id: WindowId, _attr: TextAttr, _text: &str) {}
    }

    struct PanickingEngine;

    impl Engine for PanickingEngine {
        fn input_mode(&self) -> InputMode {
            InputMode::KeysOnly
        }

        fn run(&mut self, _data_dir: &Path, _host: &dyn EngineHost) -> Result<(), EngineError> {
            panic!("dungeon collapsed");
        }
    }

    struct Loader<F>(F);

    impl<F> EngineLoader for Loader<F>
    where
        F: Fn() -> Result<Box<dyn Engine>, EngineError> + Send + Sync,
    {
        fn load(&self, _library: &str) -> Result<Box<dyn Engine>, EngineError> {
            (self.0)()
        }
    }

    #[test]
    fn panics_become_faults() {
        let host = NullHost::default();
        let loader = Loader(|| Ok(Box::new(PanickingEngine) as Box<dyn Engine>));
        let err = run_session(&loader, "nethack", Path::new("/data"), &host).unwrap_err();
        assert!(matches!(&err, EngineError::Fault(msg) if msg == "dungeon collapsed"));
        assert_eq!(*host.loaded.lock(), Some((InputMode::KeysOnly, false)));
    }

    #[test]
    fn load_failures_skip_the_host() {
        let host = NullHost::default();
        let loader = Loader(|| {
            Err(EngineError::MissingSymbol {
                library: "nethack".into(),
                symbol: "forkfront_main",
            })
        });
        let err = run_session(&loader, "nethack", Path::new("/data"), &host).unwrap_err();
        assert!(err.is_load_failure());
        assert!(host.loaded.lock().is_none());
    }

    #[test]
    fn thread_policy_returns() {
        ExitPolicy::Thread.apply(&Ok(()));
        ExitPolicy::Thread.apply(&Err(EngineError::fault("boom")));
    }
}
