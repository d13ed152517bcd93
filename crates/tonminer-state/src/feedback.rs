use std::sync::Mutex;

use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Haptic {
    /// Heavy impact, played when the passcode prompt opens.
    Impact,
    Success,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

/// Host platform hooks (Telegram WebApp haptics, toasts, native alerts).
/// All calls are fire-and-forget.
pub trait HostFeedback: Send + Sync {
    fn haptic(&self, kind: Haptic);
    fn toast(&self, message: &str, kind: ToastKind);
    fn alert(&self, message: &str);
}

/// Headless host: every call becomes a log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFeedback;

impl HostFeedback for TracingFeedback {
    fn haptic(&self, kind: Haptic) {
        info!(?kind, "haptic");
    }

    fn toast(&self, message: &str, kind: ToastKind) {
        info!(?kind, message, "toast");
    }

    fn alert(&self, message: &str) {
        info!(message, "alert");
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedbackEvent {
    Haptic(Haptic),
    Toast(String, ToastKind),
    Alert(String),
}

/// Keeps every call in order. Handy for embedding and for tests.
#[derive(Debug, Default)]
pub struct RecordingFeedback {
    events: Mutex<Vec<FeedbackEvent>>,
}

impl RecordingFeedback {
    pub fn events(&self) -> Vec<FeedbackEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn haptics(&self) -> Vec<Haptic> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                FeedbackEvent::Haptic(h) => Some(h),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: FeedbackEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl HostFeedback for RecordingFeedback {
    fn haptic(&self, kind: Haptic) {
        self.push(FeedbackEvent::Haptic(kind));
    }

    fn toast(&self, message: &str, kind: ToastKind) {
        self.push(FeedbackEvent::Toast(message.to_string(), kind));
    }

    fn alert(&self, message: &str) {
        self.push(FeedbackEvent::Alert(message.to_string()));
    }
}
