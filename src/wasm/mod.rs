//! WASM bindings for Warble
//!
//! This module provides the JavaScript-facing API for running the pedal
//! against Web Audio in a browser via WebAssembly.

mod engine;
mod error;

pub use engine::WarbleEngine;
pub use error::WarbleError;

// Re-export wasm_bindgen for convenience
pub use wasm_bindgen::prelude::*;
