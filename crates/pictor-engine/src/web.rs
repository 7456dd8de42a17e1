//! Browser bridge.
//!
//! Exposes a document and a WebGL2 render pipeline to JavaScript. Mutations
//! and reports cross the boundary as JSON so the JS side needs no bindings
//! for engine types. The host drives `frame` from `requestAnimationFrame`.

use kurbo::{Point, Rect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlCanvasElement;

use crate::config::EngineConfig;
use crate::document::{Mutation, SharedDocument};
use crate::export::{export, ExportFormat, ExportOptions};
use crate::logging::init_logging;
use crate::render::RenderPipeline;
use crate::surface::WebSurface;

#[wasm_bindgen(start)]
pub fn start() {
    init_logging(Default::default());
}

fn js_error(context: &str, err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{context}: {err}"))
}

#[wasm_bindgen]
pub struct WebEngine {
    doc: SharedDocument,
    pipeline: RenderPipeline<WebSurface>,
}

#[wasm_bindgen]
impl WebEngine {
    /// Binds a new engine to the canvas with id `canvas_id`.
    ///
    /// `config_json` is an engine config document; defaults apply when absent.
    pub async fn attach(canvas_id: String, config_json: Option<String>) -> Result<WebEngine, JsValue> {
        let config = match config_json {
            Some(json) => EngineConfig::from_json(&json).map_err(|e| js_error("config", format!("{e:#}")))?,
            None => EngineConfig::default(),
        };
        init_logging(config.logging.to_logging_config());

        let canvas = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(&canvas_id))
            .ok_or_else(|| JsValue::from_str(&format!("no element #{canvas_id}")))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| JsValue::from_str(&format!("#{canvas_id} is not a canvas")))?;

        let surface = WebSurface::new(canvas, &config.render)
            .await
            .map_err(|e| js_error("surface", format!("{e:#}")))?;
        log::info!("web engine attached to #{canvas_id}");

        Ok(WebEngine {
            doc: SharedDocument::default(),
            pipeline: RenderPipeline::new(surface, config.render),
        })
    }

    /// Applies a JSON array of mutations as one transaction; returns the new revision.
    pub fn apply(&self, mutations_json: &str) -> Result<f64, JsValue> {
        let batch: Vec<Mutation> = serde_json::from_str(mutations_json).map_err(|e| js_error("mutations", e))?;
        let report = self.doc.submit_batch(&batch).map_err(|e| js_error("apply", e))?;
        Ok(report.revision as f64)
    }

    /// Renders one frame; returns the frame report as JSON.
    pub fn frame(&mut self) -> Result<String, JsValue> {
        match self.pipeline.frame(&self.doc) {
            Ok(report) => serde_json::to_string(&report).map_err(|e| js_error("report", e)),
            // The pipeline already recreated the surface; the next frame redraws everything.
            Err(err) if err.is_context_loss() => {
                log::warn!("{err}; retrying next frame");
                Ok("null".to_string())
            }
            Err(err) => Err(js_error("frame", err)),
        }
    }

    /// Shows the document rectangle `(x0, y0) - (x1, y1)` on the canvas.
    pub fn set_view(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) {
        self.pipeline.set_region(Some(Rect::new(x0, y0, x1, y1)));
    }

    /// Shows document coordinates 1:1 from the origin.
    pub fn reset_view(&mut self) {
        self.pipeline.set_region(None);
    }

    /// Topmost node under a document point, as a UUID string.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<String> {
        self.doc.read().hit_test(Point::new(x, y)).map(|id| id.to_string())
    }

    pub fn revision(&self) -> f64 {
        self.doc.revision() as f64
    }

    /// Exports the whole document as SVG markup.
    pub fn export_svg(&self) -> Result<String, JsValue> {
        let bytes = export(&self.doc.snapshot(), ExportFormat::Svg, &ExportOptions::default())
            .map_err(|e| js_error("export", e))?;
        String::from_utf8(bytes).map_err(|e| js_error("export", e))
    }
}
