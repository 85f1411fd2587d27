//! Error types for WASM bindings

use wasm_bindgen::prelude::*;

/// Error type for WASM bindings
#[wasm_bindgen]
pub struct WarbleError {
    message: String,
}

#[wasm_bindgen]
impl WarbleError {
    /// Get the error message
    #[wasm_bindgen(getter)]
    pub fn message(&self) -> String {
        self.message.clone()
    }
}

impl From<crate::error::Error> for WarbleError {
    fn from(e: crate::error::Error) -> Self {
        Self {
            message: e.to_string(),
        }
    }
}

impl WarbleError {
    /// Convert to JsValue for use as error return
    pub fn into_js(self) -> JsValue {
        JsValue::from_str(&self.message)
    }
}
