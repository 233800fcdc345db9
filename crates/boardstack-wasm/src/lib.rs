#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::indexing_slicing)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Boardstack WASM module: turns Gerber and Excellon fabrication files into
//! one drilled, layered 3-D board mesh, one pipeline stage per host tick.

pub mod config;
pub mod error;
pub mod excellon;
pub mod geometry;
pub mod gerber;
pub mod layer;
pub mod pipeline;
pub mod solid;

use js_sys::{Float32Array, Uint32Array};
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::config::ImportSettings;
use crate::pipeline::Pipeline;

/// Initialize the WASM module. Sets up the panic hook for debugging.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// One board import driven from JavaScript.
///
/// Queue files with [`BoardImport::add_file`], then call [`BoardImport::tick`]
/// from a timer until [`BoardImport::is_done`] returns `true`.
#[wasm_bindgen]
pub struct BoardImport {
    pipeline: Pipeline,
}

#[wasm_bindgen]
impl BoardImport {
    /// Start an import. `settings` may be `undefined` for the defaults.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if `settings` cannot be read.
    #[wasm_bindgen(constructor)]
    pub fn new(settings: JsValue) -> Result<Self, JsValue> {
        let settings = if settings.is_undefined() || settings.is_null() {
            ImportSettings::default()
        } else {
            serde_wasm_bindgen::from_value(settings)
                .map_err(|e| JsValue::from_str(&format!("invalid settings: {e}")))?
        };
        Ok(Self {
            pipeline: Pipeline::new(settings),
        })
    }

    /// Queue a file. Returns `false` once the import has started.
    pub fn add_file(&mut self, name: &str, bytes: &[u8]) -> bool {
        self.pipeline.add_file(name, bytes)
    }

    /// Run one stage and return the `Progress` snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error string if the snapshot cannot be serialized.
    pub fn tick(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.pipeline.tick())
    }

    /// Whether the import reached `FINISHED` or `ERROR`.
    pub fn is_done(&self) -> bool {
        self.pipeline.is_done()
    }

    /// Interleaved `[x0, y0, z0, x1, ...]` positions of the merged board.
    /// Empty until the import finishes.
    pub fn positions(&self) -> Float32Array {
        self.pipeline
            .board()
            .map_or_else(|| Float32Array::new_with_length(0), |board| {
                Float32Array::from(board.mesh.positions.as_slice())
            })
    }

    /// Triangle-list indices of the merged board.
    pub fn indices(&self) -> Uint32Array {
        self.pipeline
            .board()
            .map_or_else(|| Uint32Array::new_with_length(0), |board| {
                Uint32Array::from(board.mesh.indices.as_slice())
            })
    }

    /// Per-layer index ranges with their finishes.
    ///
    /// # Errors
    ///
    /// Returns an error string if the ranges cannot be serialized.
    pub fn material_ranges(&self) -> Result<JsValue, JsValue> {
        let ranges = self
            .pipeline
            .board()
            .map_or_else(Vec::new, |board| board.materials.clone());
        to_js(&ranges)
    }

    /// Mesh name of the merged board, if finished.
    pub fn mesh_name(&self) -> Option<String> {
        self.pipeline.board().map(|board| board.name.clone())
    }

    /// Parse, drill and mesh totals as an `ImportSummary`.
    ///
    /// # Errors
    ///
    /// Returns an error string if the summary cannot be serialized.
    pub fn summary(&self) -> Result<JsValue, JsValue> {
        to_js(&self.pipeline.summary())
    }
}
