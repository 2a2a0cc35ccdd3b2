//! JavaScript handle for a crop session.
//!
//! # Usage
//!
//! ```typescript
//! const session = new JsCropSession(
//!   { imageUri, aspect: [4, 3], save: { format: 'jpeg', compress: 0.8 } },
//!   (uri, actions, save) => manipulate(uri, actions, save),
//!   (uri) => console.log('cropped to', uri),
//!   () => close(),
//! );
//!
//! widget.onChange = (rect) => session.report_selection(rect);
//! confirmButton.onclick = async () => {
//!   const report = await session.confirm();
//!   redraw(session.render());
//! };
//! ```

use cropkit_core::{CropSelection, CropSession, CropSessionConfig, CropSessionProps};
use js_sys::{Function, Promise};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::diagnostics::{callback_threw, ConsoleSink};
use crate::engine::JsEngine;
use crate::types::{from_js, to_js, OutcomeReport};

/// A mounted crop session driven from JavaScript.
///
/// Call `unmount()` when the dialog goes away; a crop that finishes after
/// that is discarded and `onCrop` is not called.
#[wasm_bindgen]
pub struct JsCropSession {
    session: CropSession<JsEngine>,
}

#[wasm_bindgen]
impl JsCropSession {
    /// Mount a session.
    ///
    /// # Arguments
    /// * `config` - `{ imageUri, aspect?, style?, save? }`
    /// * `engine` - `(imageUri, actions, saveOptions) => Promise<{ uri }>`
    /// * `on_crop` - Called with the output URI after a successful crop
    /// * `on_cancel` - Called when cancel is pressed
    #[wasm_bindgen(constructor)]
    pub fn new(
        config: JsValue,
        engine: Function,
        on_crop: Option<Function>,
        on_cancel: Option<Function>,
    ) -> Result<JsCropSession, JsValue> {
        let config: CropSessionConfig = from_js(config)?;
        let mut props = CropSessionProps::from_config(config).sink(Rc::new(ConsoleSink));

        if let Some(function) = on_crop {
            props = props.on_crop(move |uri: String| {
                if let Err(err) = function.call1(&JsValue::NULL, &JsValue::from_str(&uri)) {
                    callback_threw("onCrop", &err);
                }
            });
        }
        if let Some(function) = on_cancel {
            props = props.on_cancel(move || {
                if let Err(err) = function.call0(&JsValue::NULL) {
                    callback_threw("onCancel", &err);
                }
            });
        }

        Ok(JsCropSession {
            session: CropSession::new(props, JsEngine::new(engine)),
        })
    }

    /// Record the widget's latest `{ originX, originY, width, height }`.
    ///
    /// Returns false when the report was ignored.
    pub fn report_selection(&self, selection: JsValue) -> Result<bool, JsValue> {
        let selection: CropSelection = from_js(selection)?;
        Ok(self.session.report_selection(selection))
    }

    /// Press the confirm control.
    ///
    /// The engine is called before this returns. The promise resolves to
    /// `{ status, uri?, reason? }` and never rejects for engine failures.
    pub fn confirm(&self) -> Promise {
        let pending = self.session.confirm();
        future_to_promise(async move {
            let report = OutcomeReport::from(pending.await);
            to_js(&report)
        })
    }

    /// Press the cancel control. Returns false when the press was ignored.
    pub fn cancel(&self) -> bool {
        self.session.cancel()
    }

    pub fn unmount(&self) {
        self.session.unmount();
    }

    /// The current view description as a plain object.
    pub fn render(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.render())
    }

    #[wasm_bindgen(getter)]
    pub fn in_progress(&self) -> bool {
        self.session.is_in_progress()
    }

    #[wasm_bindgen(getter)]
    pub fn can_confirm(&self) -> bool {
        self.session.can_confirm()
    }

    #[wasm_bindgen(getter)]
    pub fn can_cancel(&self) -> bool {
        self.session.can_cancel()
    }

    /// The latest selection, or `undefined` before the first report.
    #[wasm_bindgen(getter)]
    pub fn selection(&self) -> Result<JsValue, JsValue> {
        match self.session.selection() {
            Some(selection) => to_js(&selection),
            None => Ok(JsValue::UNDEFINED),
        }
    }
}
