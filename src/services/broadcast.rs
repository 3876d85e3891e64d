use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::schedule::Mode;
use crate::theme::browsers::Browser;
use crate::theme::colors::ColorScheme;

/// Typed theme-change notification carried to every audience.
#[derive(Debug, Clone, Serialize)]
pub struct ThemeEvent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub mode: Mode,
    pub colors: ColorScheme,
    pub browser: Browser,
    /// Epoch milliseconds of the application.
    pub timestamp: i64,
}

pub const THEME_CHANGED: &str = "theme-changed";

impl ThemeEvent {
    pub fn changed(mode: Mode, colors: ColorScheme, browser: Browser, timestamp: i64) -> Self {
        Self {
            kind: THEME_CHANGED,
            mode,
            colors,
            browser,
            timestamp,
        }
    }
}

/// Delivery seam to contexts outside this process (native messaging host,
/// control socket, ...). Implementations must swallow their own failures;
/// `emit` is fire-and-forget.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &str, payload: serde_json::Value);
}

pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: &str, _payload: serde_json::Value) {}
}

/// Fans a theme event out to in-process subscribers and external sinks.
/// Best-effort on both paths: a missing receiver or failing sink never fails
/// the apply operation that published the event.
#[derive(Clone)]
pub struct Broadcaster {
    channel: broadcast::Sender<ThemeEvent>,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        let (channel, _) = broadcast::channel(16);
        Self {
            channel,
            sinks: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Subscribes an in-process listener.
    pub fn subscribe(&self) -> broadcast::Receiver<ThemeEvent> {
        self.channel.subscribe()
    }

    pub fn publish(&self, event: ThemeEvent) {
        // No subscribers is not an error.
        let _ = self.channel.send(event.clone());

        if self.sinks.is_empty() {
            return;
        }
        match serde_json::to_value(&event) {
            Ok(payload) => {
                for sink in &self.sinks {
                    sink.emit(THEME_CHANGED, payload.clone());
                }
            }
            Err(e) => log::debug!("theme event serialization failed: {}", e),
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
