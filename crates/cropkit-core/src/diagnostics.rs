//! Structured diagnostics for the crop session.
//!
//! The session never prints. Everything observable about a session (mounting,
//! selection reports, crop start/success/failure, callback dispatch) is sent
//! as a [`DiagnosticEvent`] to an injected [`DiagnosticSink`].
//!
//! - [`LogSink`] forwards to the `log` facade under the `cropkit` target
//! - [`RecordingSink`] keeps events in memory so callers can assert on them

use std::cell::RefCell;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::encode::SaveOptions;
use crate::selection::{AspectRatio, CropSelection};

/// Log target used by [`LogSink`].
pub const LOG_TARGET: &str = "cropkit";

/// One of the two action controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Control {
    Cancel,
    Confirm,
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Control::Cancel => f.write_str("cancel"),
            Control::Confirm => f.write_str("confirm"),
        }
    }
}

/// Why a press was dropped without doing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NoSelection,
    InProgress,
    Unmounted,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::NoSelection => f.write_str("no selection"),
            IgnoreReason::InProgress => f.write_str("crop in progress"),
            IgnoreReason::Unmounted => f.write_str("session unmounted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticEvent {
    Mounted {
        image_uri: String,
        has_on_crop: bool,
        has_on_cancel: bool,
        aspect: AspectRatio,
    },
    SelectionUpdated(CropSelection),
    PressIgnored {
        control: Control,
        reason: IgnoreReason,
    },
    CropStarted {
        image_uri: String,
        selection: CropSelection,
        save: SaveOptions,
    },
    CropSucceeded {
        uri: String,
    },
    CropFailed {
        message: String,
    },
    CancelPressed,
    CallbackInvoked(Control),
    CallbackMissing(Control),
    /// An engine call finished after the session was torn down.
    CompletionDiscarded,
    Unmounted,
}

impl DiagnosticEvent {
    /// Severity used when the event is written to a log.
    pub fn level(&self) -> log::Level {
        match self {
            DiagnosticEvent::CropFailed { .. } => log::Level::Error,
            DiagnosticEvent::PressIgnored { .. }
            | DiagnosticEvent::CallbackMissing(_)
            | DiagnosticEvent::CompletionDiscarded => log::Level::Warn,
            DiagnosticEvent::SelectionUpdated(_) => log::Level::Debug,
            _ => log::Level::Info,
        }
    }
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticEvent::Mounted {
                image_uri,
                has_on_crop,
                has_on_cancel,
                aspect,
            } => write!(
                f,
                "mounted image={image_uri} on_crop={has_on_crop} on_cancel={has_on_cancel} aspect={}:{}",
                aspect.width, aspect.height
            ),
            DiagnosticEvent::SelectionUpdated(sel) => write!(
                f,
                "selection x={} y={} w={} h={}",
                sel.origin_x, sel.origin_y, sel.width, sel.height
            ),
            DiagnosticEvent::PressIgnored { control, reason } => {
                write!(f, "{control} press ignored: {reason}")
            }
            DiagnosticEvent::CropStarted {
                image_uri, save, ..
            } => write!(
                f,
                "crop started image={image_uri} format={} compress={}",
                save.format, save.compress
            ),
            DiagnosticEvent::CropSucceeded { uri } => write!(f, "crop succeeded uri={uri}"),
            DiagnosticEvent::CropFailed { message } => write!(f, "crop failed: {message}"),
            DiagnosticEvent::CancelPressed => f.write_str("cancel pressed"),
            DiagnosticEvent::CallbackInvoked(control) => write!(f, "{control} callback invoked"),
            DiagnosticEvent::CallbackMissing(control) => {
                write!(f, "{control} callback not provided")
            }
            DiagnosticEvent::CompletionDiscarded => {
                f.write_str("crop finished after unmount; result discarded")
            }
            DiagnosticEvent::Unmounted => f.write_str("unmounted"),
        }
    }
}

/// Receiver for session diagnostics.
pub trait DiagnosticSink {
    fn emit(&self, event: DiagnosticEvent);
}

/// Writes events to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&self, event: DiagnosticEvent) {
        log::log!(target: LOG_TARGET, event.level(), "{event}");
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: RefCell<Vec<DiagnosticEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.borrow().clone()
    }

    /// Drain the recorded events.
    pub fn take(&self) -> Vec<DiagnosticEvent> {
        self.events.take()
    }

    pub fn count(&self, predicate: impl Fn(&DiagnosticEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| predicate(e)).count()
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&self, event: DiagnosticEvent) {
        self.events.borrow_mut().push(event);
    }
}
