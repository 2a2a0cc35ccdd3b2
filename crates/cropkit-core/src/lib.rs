//! Cropkit Core - crop session adapter and image manipulation engine
//!
//! This crate provides the pieces behind a crop dialog: a session that holds
//! the user's crop selection and drives a manipulation engine when the user
//! confirms, plus a filesystem engine that decodes, crops and re-encodes.
//!
//! # Module Structure
//!
//! - `session` - The crop session adapter (selection, confirm, cancel, render)
//! - `selection` - Crop selection, aspect ratio and shape descriptors
//! - `engine` - `ManipulationEngine` trait and the filesystem `ImageEngine`
//! - `diagnostics` - Injectable diagnostic sinks
//! - `decode` / `transform` / `encode` - Image pipeline used by `ImageEngine`
//! - `style` - Presentation defaults and overrides

pub mod decode;
pub mod diagnostics;
pub mod encode;
pub mod engine;
pub mod selection;
pub mod session;
pub mod style;
pub mod transform;

pub use diagnostics::{DiagnosticEvent, DiagnosticSink, LogSink, RecordingSink};
pub use encode::{SaveFormat, SaveOptions};
pub use engine::{
    ImageEngine, ImageEngineConfig, ManipulateError, ManipulateRequest, ManipulateResult,
    ManipulationEngine,
};
pub use selection::{AspectRatio, CropSelection, CropShape};
pub use session::{ConfirmOutcome, CropSession, CropSessionConfig, CropSessionProps, CropView};
pub use style::{Style, StyleOverrides};
