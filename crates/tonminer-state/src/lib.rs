//! tonminer-state
//!
//! Owns the persisted `AppState` and every transition over it.
//!
//!   db       — sled-backed document store
//!   engine   — `RewardEngine`, the only code that mutates state
//!   timers   — readiness derived from stored timestamps
//!   admin    — session-only passcode gate
//!   feedback — haptics/toasts/alerts seam to the host platform
//!   service  — single-owner actor running the periodic tick

pub mod admin;
pub mod db;
pub mod engine;
pub mod feedback;
pub mod service;
pub mod timers;

pub use admin::{AdminGate, TapOutcome};
pub use db::{StateDb, StateSink};
pub use engine::{EngineOptions, RewardEngine, SessionFinished, WithdrawalPolicy};
pub use feedback::{FeedbackEvent, Haptic, HostFeedback, RecordingFeedback, ToastKind, TracingFeedback};
pub use service::{BackgroundWriter, Clock, EngineHandle, EngineService, ManualClock, SystemClock};
pub use timers::Readiness;
