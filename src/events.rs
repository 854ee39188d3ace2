//! Events pushed to whatever is rendering the session.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Part of the video has been handed to the transport.
    UploadProgress {
        uploaded: u64,
        total_size: u64,
        /// Percentage, 0.0 to 100.0.
        progress: f64,
    },
    StateChanged {
        is_loading: bool,
        has_result: bool,
        last_error: Option<String>,
    },
    GenerationComplete {
        display_path: String,
    },
    Error {
        message: String,
    },
}

impl SessionEvent {
    pub fn upload_progress(uploaded: u64, total_size: u64) -> Self {
        let progress = if total_size > 0 {
            (uploaded as f64 / total_size as f64) * 100.0
        } else {
            100.0
        };
        SessionEvent::UploadProgress {
            uploaded,
            total_size,
            progress,
        }
    }

    /// Event name used on the webview side.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::UploadProgress { .. } => "upload_progress",
            SessionEvent::StateChanged { .. } => "state_changed",
            SessionEvent::GenerationComplete { .. } => "generation_complete",
            SessionEvent::Error { .. } => "error",
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: SessionEvent);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: SessionEvent) {}
}

impl EventSink for broadcast::Sender<SessionEvent> {
    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        if self.send(event).is_err() {
            trace!("Session event dropped, no subscribers");
        }
    }
}

#[cfg(feature = "desktop")]
impl<R: tauri::Runtime> EventSink for tauri::AppHandle<R> {
    fn emit(&self, event: SessionEvent) {
        use tauri::Emitter;

        if let Err(e) = Emitter::emit(self, event.name(), &event) {
            tracing::warn!(error = %e, event = event.name(), "Emit error");
        }
    }
}
