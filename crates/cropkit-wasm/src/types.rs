//! Conversions between core session types and JavaScript values.
//!
//! Plain data crosses the boundary through `serde-wasm-bindgen`. Results are
//! serialized with the JSON-compatible serializer so JS receives plain objects
//! rather than `Map`s.

use cropkit_core::diagnostics::IgnoreReason;
use cropkit_core::ConfirmOutcome;
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// What a `confirm()` promise resolves to.
///
/// Failures resolve too (with `status: "failed"`); the promise never rejects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeReport {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<ConfirmOutcome> for OutcomeReport {
    fn from(outcome: ConfirmOutcome) -> Self {
        let (status, uri, reason) = match outcome {
            ConfirmOutcome::Cropped(uri) => ("cropped", Some(uri), None),
            ConfirmOutcome::Failed(message) => ("failed", None, Some(message)),
            ConfirmOutcome::Ignored(reason) => {
                ("ignored", None, Some(ignore_code(reason).to_string()))
            }
            ConfirmOutcome::Discarded => ("discarded", None, None),
        };
        Self {
            status,
            uri,
            reason,
        }
    }
}

fn ignore_code(reason: IgnoreReason) -> &'static str {
    match reason {
        IgnoreReason::NoSelection => "noSelection",
        IgnoreReason::InProgress => "inProgress",
        IgnoreReason::Unmounted => "unmounted",
    }
}

pub(crate) fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

pub(crate) fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
