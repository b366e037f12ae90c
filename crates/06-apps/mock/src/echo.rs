use std::path::Path;
use std::thread;
use std::time::Duration;

use log::info;
use runtime_native::{Engine, EngineError, EngineHost, EngineLoader, SaveHook};
use transport::{TextAttr, WindowId, WindowType, ESC, NO_INPUT};

/// Message window the echo engine writes to.
pub const ECHO_WINDOW: WindowId = WindowId(1);

const MESSAGE_WINDOW: WindowType = WindowType(1);
const IDLE_POLL: Duration = Duration::from_millis(5);

/// Engine that repeats every input back as a message until `q` or ESC.
#[derive(Debug, Default)]
pub struct EchoEngine {
    turns: u32,
}

impl EchoEngine {
    fn say(host: &dyn EngineHost, text: &str) {
        host.put_string(ECHO_WINDOW, TextAttr::NONE, text);
        host.display_window(ECHO_WINDOW, false);
    }

    /// Handles one structured command at the head; `false` if there was none.
    fn echo_structured(&mut self, host: &dyn EngineHost) -> bool {
        let text = if let Some(line) = host.pull_line() {
            format!("You said: {line}")
        } else if let Some((x, y)) = host.pull_position() {
            format!("You clicked ({x}, {y})")
        } else if let Some(ids) = host.pull_menu_selection() {
            format!("You picked {:?}", ids.as_slice())
        } else {
            return false;
        };
        self.turns += 1;
        Self::say(host, &text);
        true
    }
}

impl Engine for EchoEngine {
    fn save_hook(&self) -> Option<SaveHook> {
        Some(Box::new(|| info!("echo engine: nothing to save")))
    }

    fn run(&mut self, data_dir: &Path, host: &dyn EngineHost) -> Result<(), EngineError> {
        host.create_window(ECHO_WINDOW, MESSAGE_WINDOW);
        Self::say(host, &format!("Echo engine ready in {}", data_dir.display()));
        loop {
            host.game_ready();
            let code = host.pull_key();
            if code == NO_INPUT {
                if !self.echo_structured(host) {
                    thread::sleep(IDLE_POLL);
                }
                continue;
            }
            if code == u32::from(ESC) || code == u32::from('q') {
                break;
            }
            self.turns += 1;
            let shown = char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER);
            Self::say(host, &format!("You pressed '{shown}'"));
        }
        Self::say(host, &format!("Goodbye after {} turn(s)", self.turns));
        host.destroy_window(ECHO_WINDOW);
        Ok(())
    }
}

/// Loader that yields a fresh [`EchoEngine`] for any library name.
#[derive(Debug, Default)]
pub struct EchoLoader;

impl EngineLoader for EchoLoader {
    fn load(&self, library: &str) -> Result<Box<dyn Engine>, EngineError> {
        info!("echo loader standing in for `{library}`");
        Ok(Box::new(EchoEngine::default()))
    }
}
