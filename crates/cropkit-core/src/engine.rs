//! Manipulation engines: the asynchronous collaborator that turns a source
//! image and a crop selection into a new image file.
//!
//! The crop session only knows the [`ManipulationEngine`] trait. This module
//! also provides [`ImageEngine`], a filesystem engine built on the decode,
//! transform and encode modules.
//!
//! # Request Shape
//!
//! A [`ManipulateRequest`] mirrors the JS manipulator call
//! `manipulate(uri, [{ crop: {...} }], { format, compress })`, so it
//! serializes to the same JSON a JS engine expects.

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use futures_channel::oneshot;
use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::{decode_image, DecodeError, DecodedImage};
use crate::encode::{encode_image, EncodeError, SaveOptions};
use crate::selection::CropSelection;
use crate::transform::apply_crop;

const FILE_SCHEME: &str = "file://";

/// Errors an engine can reject a request with.
///
/// The crop session does not distinguish between these; it only logs them.
#[derive(Debug, Error)]
pub enum ManipulateError {
    /// The image reference is empty or uses a scheme the engine cannot read.
    #[error("Invalid source image reference: {0:?}")]
    InvalidSource(String),

    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Encode failed: {0}")]
    Encode(#[from] EncodeError),

    /// The worker thread could not be started or exited without a result.
    #[error("Engine worker failed: {0}")]
    Worker(String),

    /// Rejection reported by an external engine.
    #[error("Engine rejected the request: {0}")]
    Rejected(String),
}

impl ManipulateError {
    fn io(path: &Path, err: std::io::Error) -> Self {
        ManipulateError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// A single manipulation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Crop(CropSelection),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManipulateRequest {
    pub image_uri: String,
    /// Applied in order.
    pub actions: Vec<Action>,
    pub save: SaveOptions,
}

impl ManipulateRequest {
    /// A single crop of `image_uri`.
    pub fn crop(image_uri: impl Into<String>, selection: CropSelection, save: SaveOptions) -> Self {
        Self {
            image_uri: image_uri.into(),
            actions: vec![Action::Crop(selection)],
            save,
        }
    }
}

/// Where the engine put its output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManipulateResult {
    pub uri: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

pub type ManipulateFuture = LocalBoxFuture<'static, Result<ManipulateResult, ManipulateError>>;

/// Asynchronous image manipulation.
///
/// Futures are local (`!Send`) so engines backed by a single-threaded host,
/// such as a JS promise, can implement this trait.
pub trait ManipulationEngine {
    fn manipulate(&self, request: ManipulateRequest) -> ManipulateFuture;
}

impl<E: ManipulationEngine + ?Sized> ManipulationEngine for Rc<E> {
    fn manipulate(&self, request: ManipulateRequest) -> ManipulateFuture {
        (**self).manipulate(request)
    }
}

/// Configuration for [`ImageEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageEngineConfig {
    /// Directory output files are written to. Created on demand.
    pub output_dir: PathBuf,
    /// File name prefix for output files.
    pub file_prefix: String,
}

impl Default for ImageEngineConfig {
    fn default() -> Self {
        Self {
            output_dir: std::env::temp_dir(),
            file_prefix: "cropped".to_string(),
        }
    }
}

/// Filesystem engine: reads `file://` URIs or plain paths, writes the result
/// into [`ImageEngineConfig::output_dir`], and resolves to a `file://` URI.
///
/// Each request is processed on its own worker thread, started by
/// `manipulate`; the returned future only waits for the result.
#[derive(Debug, Default)]
pub struct ImageEngine {
    config: ImageEngineConfig,
    requests: Cell<u64>,
}

static NEXT_FILE_ID: AtomicU64 = AtomicU64::new(0);

impl ImageEngine {
    pub fn new(config: ImageEngineConfig) -> Self {
        Self {
            config,
            requests: Cell::new(0),
        }
    }

    pub fn config(&self) -> &ImageEngineConfig {
        &self.config
    }

    /// Number of requests this engine has been handed.
    pub fn request_count(&self) -> u64 {
        self.requests.get()
    }

    /// Run a request to completion on the current thread.
    pub fn run(&self, request: &ManipulateRequest) -> Result<ManipulateResult, ManipulateError> {
        let source = resolve_source(&request.image_uri)?;
        let output = self.output_path(&request.save);
        process(&source, &output, request)
    }

    fn output_path(&self, save: &SaveOptions) -> PathBuf {
        let id = NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        self.config.output_dir.join(format!(
            "{}-{id}-{nanos}.{}",
            self.config.file_prefix,
            save.format.extension()
        ))
    }
}

impl ManipulationEngine for ImageEngine {
    fn manipulate(&self, request: ManipulateRequest) -> ManipulateFuture {
        self.requests.set(self.requests.get() + 1);
        let output = self.output_path(&request.save);
        let (sender, receiver) = oneshot::channel();

        let spawned = thread::Builder::new()
            .name("cropkit-engine".to_string())
            .spawn(move || {
                let result = resolve_source(&request.image_uri)
                    .and_then(|source| process(&source, &output, &request));
                // The session may have been torn down; nobody is listening then.
                let _ = sender.send(result);
            });

        async move {
            spawned.map_err(|e| ManipulateError::Worker(e.to_string()))?;
            receiver
                .await
                .map_err(|_| ManipulateError::Worker("exited without a result".to_string()))?
        }
        .boxed_local()
    }
}

/// Map an image reference to a local path.
///
/// Accepts `file://` URIs and bare paths; any other scheme is rejected.
pub fn resolve_source(image_uri: &str) -> Result<PathBuf, ManipulateError> {
    let path = image_uri.strip_prefix(FILE_SCHEME).unwrap_or(image_uri);

    if path.is_empty() || path.contains("://") {
        return Err(ManipulateError::InvalidSource(image_uri.to_string()));
    }
    Ok(PathBuf::from(path))
}

fn process(
    source: &Path,
    output: &Path,
    request: &ManipulateRequest,
) -> Result<ManipulateResult, ManipulateError> {
    let bytes = std::fs::read(source).map_err(|e| ManipulateError::io(source, e))?;
    let mut image = decode_image(&bytes)?;

    for action in &request.actions {
        image = apply_action(&image, action);
    }

    let encoded = encode_image(&image, &request.save)?;

    if let Some(dir) = output.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ManipulateError::io(dir, e))?;
    }
    std::fs::write(output, encoded).map_err(|e| ManipulateError::io(output, e))?;

    let absolute = std::fs::canonicalize(output).map_err(|e| ManipulateError::io(output, e))?;
    log::debug!(
        target: crate::diagnostics::LOG_TARGET,
        "wrote {}x{} {} to {}",
        image.width,
        image.height,
        request.save.format,
        absolute.display()
    );

    Ok(ManipulateResult {
        uri: to_file_uri(&absolute),
        width: image.width,
        height: image.height,
    })
}

fn apply_action(image: &DecodedImage, action: &Action) -> DecodedImage {
    match action {
        Action::Crop(selection) => apply_crop(image, selection),
    }
}

fn to_file_uri(path: &Path) -> String {
    format!("{FILE_SCHEME}{}", path.display())
}
