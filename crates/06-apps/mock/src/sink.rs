use std::sync::Arc;
use std::time::{Duration, Instant};

use connection_abi::EventSink;
use crossbeam_channel::{unbounded, Receiver, Sender};
use transport::{TextAttr, WindowId, WindowType};

/// One sink callback, as observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkEvent {
    CreateWindow(WindowId, WindowType),
    ClearWindow(WindowId),
    DisplayWindow(WindowId, bool),
    DestroyWindow(WindowId),
    PutString(WindowId, TextAttr, String),
    Ready,
    Error(String),
    Connected,
    Disconnected,
}

/// Sink that forwards every callback over a channel.
pub struct RecordingSink {
    events: Sender<SinkEvent>,
}

impl RecordingSink {
    fn record(&self, event: SinkEvent) {
        let _ = self.events.send(event);
    }
}

impl EventSink for RecordingSink {
    fn on_create_window(&self, id: WindowId, kind: WindowType) {
        self.record(SinkEvent::CreateWindow(id, kind));
    }
    fn on_clear_window(&self, id: WindowId) {
        self.record(SinkEvent::ClearWindow(id));
    }
    fn on_display_window(&self, id: WindowId, blocking: bool) {
        self.record(SinkEvent::DisplayWindow(id, blocking));
    }
    fn on_destroy_window(&self, id: WindowId) {
        self.record(SinkEvent::DestroyWindow(id));
    }
    fn on_put_string(&self, id: WindowId, attr: TextAttr, text: &str) {
        self.record(SinkEvent::PutString(id, attr, text.to_owned()));
    }
    fn on_ready(&self) {
        self.record(SinkEvent::Ready);
    }
    fn on_error(&self, message: &str) {
        self.record(SinkEvent::Error(message.to_owned()));
    }
    fn on_connected(&self) {
        self.record(SinkEvent::Connected);
    }
    fn on_disconnected(&self) {
        self.record(SinkEvent::Disconnected);
    }
}

/// Creates a recording sink and the receiving end of its events.
///
/// Keep the returned `Arc` alive for as long as callbacks should be
/// recorded; connections hold only a weak reference.
pub fn recording_sink() -> (Arc<dyn EventSink>, SinkEvents) {
    let (tx, rx) = unbounded();
    (Arc::new(RecordingSink { events: tx }), SinkEvents { events: rx })
}

/// Receiving end of a [`recording_sink`].
pub struct SinkEvents {
    events: Receiver<SinkEvent>,
}

impl SinkEvents {
    /// Next event, waiting up to `timeout`.
    pub fn next(&self, timeout: Duration) -> Option<SinkEvent> {
        self.events.recv_timeout(timeout).ok()
    }

    /// Skips events until one matches `want`; returns it.
    pub fn wait_for(
        &self,
        timeout: Duration,
        mut want: impl FnMut(&SinkEvent) -> bool,
    ) -> Option<SinkEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let event = self.events.recv_deadline(deadline).ok()?;
            if want(&event) {
                return Some(event);
            }
        }
    }

    /// Everything recorded so far, without waiting.
    pub fn drain(&self) -> Vec<SinkEvent> {
        self.events.try_iter().collect()
    }
}
