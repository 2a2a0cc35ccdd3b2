//! Cropkit WASM - WebAssembly bindings for the Cropkit crop session
//!
//! This crate exposes the cropkit-core session to JavaScript/TypeScript. The
//! manipulation engine is supplied by the host as a JS function.
//!
//! # Module Structure
//!
//! - `session` - `JsCropSession`, the JS handle for a mounted session
//! - `engine` - `JsEngine`, an engine that forwards to a JS function
//! - `diagnostics` - `ConsoleSink`, writes session diagnostics to the console
//! - `types` - Outcome reports and serde conversions
//!
//! # Usage
//!
//! ```typescript
//! import init, { JsCropSession } from '@cropkit/wasm';
//!
//! await init();
//!
//! const session = new JsCropSession({ imageUri }, engine, onCrop, onCancel);
//! session.report_selection({ originX: 0, originY: 0, width: 200, height: 200 });
//! const report = await session.confirm();
//! ```

use wasm_bindgen::prelude::*;

mod diagnostics;
mod engine;
mod session;
mod types;

pub use diagnostics::ConsoleSink;
pub use engine::JsEngine;
pub use session::JsCropSession;
pub use types::OutcomeReport;

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
