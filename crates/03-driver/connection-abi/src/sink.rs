//! Event sink contract (engine → UI) and the slot a transport keeps it in.

use std::sync::{Arc, Weak};

use arc_swap::ArcSwapOption;
use transport::{TextAttr, WindowId, WindowType};

/// Callbacks through which a session reports engine output.
///
/// Engine-driven callbacks run on the engine thread; `on_connected` and
/// `on_disconnected` run on the thread that attached or detached the
/// transport. Implementations marshal to their UI thread themselves. Every
/// method defaults to a no-op.
pub trait EventSink: Send + Sync {
    /// The engine opened a window of the given kind.
    fn on_create_window(&self, _id: WindowId, _kind: WindowType) {}
    /// Window content was reset.
    fn on_clear_window(&self, _id: WindowId) {}
    /// Render the window now; `blocking` marks modal prompts.
    fn on_display_window(&self, _id: WindowId, _blocking: bool) {}
    /// The window was closed.
    fn on_destroy_window(&self, _id: WindowId) {}
    /// Append `text` with the given attributes.
    fn on_put_string(&self, _id: WindowId, _attr: TextAttr, _text: &str) {}
    /// The engine is waiting for input.
    fn on_ready(&self) {}
    /// The engine failed and the session is over.
    fn on_error(&self, _message: &str) {}
    fn on_connected(&self) {}
    fn on_disconnected(&self) {}
}

struct SinkRef(Weak<dyn EventSink>);

/// Non-owning, atomically replaceable reference to an [`EventSink`].
///
/// Readers observe either the previous or the new sink, never a torn value.
/// Once the embedder drops its sink, dispatches become no-ops.
#[derive(Default)]
pub struct SinkSlot {
    current: ArcSwapOption<SinkRef>,
}

impl SinkSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the sink; `None` clears it.
    pub fn set(&self, sink: Option<&Arc<dyn EventSink>>) {
        let next = sink.map(|sink| Arc::new(SinkRef(Arc::downgrade(sink))));
        self.current.store(next);
    }

    /// Upgrades the current sink, if one is set and still alive.
    pub fn get(&self) -> Option<Arc<dyn EventSink>> {
        self.current.load().as_ref().and_then(|sink| sink.0.upgrade())
    }

    /// Runs `f` against the current sink; does nothing when there is none.
    pub fn dispatch(&self, f: impl FnOnce(&dyn EventSink)) {
        if let Some(sink) = self.get() {
            f(sink.as_ref());
        }
    }
}

impl std::fmt::Debug for SinkSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkSlot")
            .field("attached", &self.get().is_some())
            .finish()
    }
}
