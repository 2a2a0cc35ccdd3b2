//! A manipulation engine backed by a JavaScript function.
//!
//! The function is called as `engine(imageUri, actions, saveOptions)` and may
//! return a `Promise` or a plain value. It must resolve to an object with a
//! `uri` string (and optionally `width` / `height`); a rejection or a thrown
//! error becomes `ManipulateError::Rejected`.
//!
//! # Example
//!
//! ```typescript
//! const engine = (uri, actions, save) =>
//!   ImageManipulator.manipulateAsync(uri, actions, save);
//! ```

use cropkit_core::engine::{ManipulateFuture, ManipulationEngine};
use cropkit_core::{ManipulateError, ManipulateRequest, ManipulateResult};
use futures_util::FutureExt;
use js_sys::{Function, Promise};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::types::{from_js, to_js};

pub struct JsEngine {
    function: Function,
}

impl JsEngine {
    pub fn new(function: Function) -> Self {
        Self { function }
    }

    fn call(&self, request: &ManipulateRequest) -> Result<Promise, JsValue> {
        let returned = self.function.call3(
            &JsValue::NULL,
            &JsValue::from_str(&request.image_uri),
            &to_js(&request.actions)?,
            &to_js(&request.save)?,
        )?;
        Ok(Promise::resolve(&returned))
    }
}

impl ManipulationEngine for JsEngine {
    fn manipulate(&self, request: ManipulateRequest) -> ManipulateFuture {
        let called = self.call(&request);

        async move {
            let promise = called.map_err(rejected)?;
            let value = JsFuture::from(promise).await.map_err(rejected)?;
            from_js::<ManipulateResult>(value).map_err(rejected)
        }
        .boxed_local()
    }
}

/// Best-effort text for a JS error value.
fn rejected(error: JsValue) -> ManipulateError {
    let message = error
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| error.as_string())
        .unwrap_or_else(|| format!("{error:?}"));
    ManipulateError::Rejected(message)
}
