//! Engines shipped as shared libraries and resolved by the platform loader.

use std::ffi::{c_char, c_int, CString};
use std::path::Path;
use std::sync::Arc;

use libloading::Library;
use log::{debug, info};

use crate::engine::{Engine, EngineError, EngineHost, EngineLoader, InputMode, SaveHook};
use crate::ffi::ForkfrontHooks;

/// Required entry point: `int forkfront_main(const char *data_dir, const ForkfrontHooks *hooks)`.
pub const MAIN_SYMBOL: &str = "forkfront_main";
/// Optional: `int forkfront_input_mode(void)`; `1` selects keys-only input.
pub const INPUT_MODE_SYMBOL: &str = "forkfront_input_mode";
/// Optional: `void forkfront_save_state(void)`.
pub const SAVE_SYMBOL: &str = "forkfront_save_state";

type MainFn = unsafe extern "C" fn(*const c_char, *const ForkfrontHooks) -> c_int;
type InputModeFn = unsafe extern "C" fn() -> c_int;
type SaveFn = unsafe extern "C" fn();

const KEYS_ONLY_MODE: c_int = 1;

/// Loads engines with the host's dynamic loader.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeLoader;

impl EngineLoader for NativeLoader {
    fn load(&self, library: &str) -> Result<Box<dyn Engine>, EngineError> {
        NativeEngine::load(library).map(|engine| Box::new(engine) as Box<dyn Engine>)
    }
}

/// Engine backed by a loaded shared library.
pub struct NativeEngine {
    name: String,
    main: MainFn,
    save: Option<SaveFn>,
    mode: InputMode,
    // Keeps the symbols above valid; dropped last.
    library: Arc<Library>,
}

impl NativeEngine {
    /// Resolves `name` the way the platform does for bare library names
    /// (`nethack` → `libnethack.so`, `libnethack.dylib`, `nethack.dll`).
    pub fn load(name: &str) -> Result<Self, EngineError> {
        let filename = libloading::library_filename(name);
        info!("loading engine library {:?}", filename);
        // SAFETY: loading runs the library's initialisers. Engines are
        // trusted code supplied by the embedder.
        let library = unsafe { Library::new(&filename) }.map_err(|err| EngineError::Load {
            library: name.to_owned(),
            source: Box::new(err),
        })?;

        // SAFETY: symbol types mirror the documented C signatures.
        let main = unsafe { required::<MainFn>(&library, name, MAIN_SYMBOL)? };
        // SAFETY: as above.
        let mode_fn = unsafe { optional::<InputModeFn>(&library, INPUT_MODE_SYMBOL) };
        // SAFETY: as above.
        let save = unsafe { optional::<SaveFn>(&library, SAVE_SYMBOL) };

        let mode = match mode_fn {
            // SAFETY: the engine exports a nullary function returning int.
            Some(f) if unsafe { f() } == KEYS_ONLY_MODE => InputMode::KeysOnly,
            _ => InputMode::Structured,
        };
        debug!(
            "engine `{name}` loaded: mode={mode:?} save_hook={}",
            save.is_some()
        );

        Ok(Self {
            name: name.to_owned(),
            main,
            save,
            mode,
            library: Arc::new(library),
        })
    }
}

/// # Safety
/// `T` must match the exported symbol's real type.
unsafe fn required<T: Copy>(
    library: &Library,
    name: &str,
    symbol: &'static str,
) -> Result<T, EngineError> {
    // SAFETY: forwarded to the caller.
    unsafe { optional(library, symbol) }.ok_or_else(|| EngineError::MissingSymbol {
        library: name.to_owned(),
        symbol,
    })
}

/// # Safety
/// `T` must match the exported symbol's real type.
unsafe fn optional<T: Copy>(library: &Library, symbol: &str) -> Option<T> {
    // SAFETY: forwarded to the caller.
    unsafe { library.get::<T>(symbol.as_bytes()) }
        .ok()
        .map(|sym| *sym)
}

impl Engine for NativeEngine {
    fn input_mode(&self) -> InputMode {
        self.mode
    }

    fn save_hook(&self) -> Option<SaveHook> {
        let save = self.save?;
        let library = Arc::clone(&self.library);
        Some(Box::new(move || {
            let _pin = &library;
            // SAFETY: `library` is kept alive by this closure.
            unsafe { save() }
        }))
    }

    fn run(&mut self, data_dir: &Path, host: &dyn EngineHost) -> Result<(), EngineError> {
        let dir = CString::new(data_dir.to_string_lossy().into_owned()).map_err(|_| {
            EngineError::InvalidArgument(format!(
                "data directory {} contains a NUL byte",
                data_dir.display()
            ))
        })?;
        let hooks = ForkfrontHooks::new(&host);
        debug!("entering {MAIN_SYMBOL} for `{}`", self.name);
        // SAFETY: `dir` and `hooks` outlive the call; the engine only uses
        // them until `forkfront_main` returns.
        let status = unsafe { (self.main)(dir.as_ptr(), &hooks) };
        debug!("`{}` returned status {status}", self.name);
        if status == 0 {
            Ok(())
        } else {
            Err(EngineError::fault(format!(
                "engine exited with status {status}"
            )))
        }
    }
}
