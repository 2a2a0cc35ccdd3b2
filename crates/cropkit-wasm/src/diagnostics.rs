//! Diagnostic sink that writes to the browser console.

use cropkit_core::{DiagnosticEvent, DiagnosticSink};
use wasm_bindgen::JsValue;

/// Sends each event to the matching `console` method, prefixed with
/// `[cropkit]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub(crate) fn line(event: &DiagnosticEvent) -> String {
        format!("[cropkit] {event}")
    }
}

impl DiagnosticSink for ConsoleSink {
    fn emit(&self, event: DiagnosticEvent) {
        let line = JsValue::from_str(&Self::line(&event));
        match event.level() {
            log::Level::Error => web_sys::console::error_1(&line),
            log::Level::Warn => web_sys::console::warn_1(&line),
            log::Level::Info => web_sys::console::info_1(&line),
            log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&line),
        }
    }
}

/// Report a JS callback that threw. The session has already moved on.
pub(crate) fn callback_threw(name: &str, error: &JsValue) {
    web_sys::console::error_2(&JsValue::from_str(&format!("[cropkit] {name} threw")), error);
}
