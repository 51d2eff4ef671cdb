//! Chart.js bridge.
//!
//! Chart.js is loaded by the page as a global `Chart`. Configurations are
//! built as JSON and converted with `serde-wasm-bindgen`; an existing chart
//! on the same canvas is destroyed before the new one is drawn.

use js_sys::{Array, Function, Reflect};
use serde::Serialize;
use serde_json::{json, Value};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::HtmlCanvasElement;

use crate::app::render::{DoughnutChart, HistorySeries, LocationRow, SEGMENT_LABELS};
use crate::error::{DashboardError, Result};

const SEGMENT_COLOURS: [&str; 4] = ["blue", "orange", "green", "grey"];

fn js_error(e: JsValue) -> DashboardError {
    DashboardError::Dom(format!("Chart.js: {:?}", e))
}

fn function(target: &JsValue, name: &str) -> Result<Function> {
    Reflect::get(target, &JsValue::from_str(name))
        .map_err(js_error)?
        .dyn_into::<Function>()
        .map_err(|_| DashboardError::Dom(format!("Chart.js: {} is not a function", name)))
}

/// Draw `config` on `canvas`, replacing any chart already there.
pub fn draw(canvas: &HtmlCanvasElement, config: &Value) -> Result<()> {
    let chart = function(&js_sys::global(), "Chart")?;

    let existing = function(&chart, "getChart")?
        .call1(&chart, canvas)
        .map_err(js_error)?;
    if !existing.is_undefined() && !existing.is_null() {
        function(&existing, "destroy")?
            .call0(&existing)
            .map_err(js_error)?;
    }

    let config = config
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| DashboardError::Dom(e.to_string()))?;
    Reflect::construct(&chart, &Array::of2(canvas, &config)).map_err(js_error)?;
    Ok(())
}

pub fn doughnut(chart: &DoughnutChart) -> Value {
    json!({
        "type": "doughnut",
        "data": {
            "labels": SEGMENT_LABELS,
            "datasets": [{
                "data": chart.segments,
                "backgroundColor": SEGMENT_COLOURS,
            }],
        },
        "options": {
            "cutout": "60%",
            "responsive": true,
            "plugins": {
                "legend": { "position": "right" },
                "title": { "display": true, "text": chart.centre },
                "subtitle": { "display": true, "text": chart.occupancy },
            },
        },
    })
}

pub fn history(series: &HistorySeries) -> Value {
    json!({
        "type": "line",
        "data": {
            "labels": series.labels,
            "datasets": [{
                "label": "Auslastung",
                "data": series.values,
                "fill": false,
                "borderColor": "rgb(75, 192, 192)",
                "tension": 0.1,
            }],
        },
        "options": {
            "responsive": true,
            "plugins": { "legend": { "display": false } },
            "scales": { "y": { "min": 0, "max": 100 } },
        },
    })
}

/// Stacked occupied/free bar of one list row.
pub fn occupancy_bar(row: &LocationRow) -> Value {
    json!({
        "type": "bar",
        "data": {
            "labels": [row.name],
            "datasets": [
                { "label": "belegt", "data": [row.occupied], "backgroundColor": "green" },
                { "label": "leer", "data": [row.free], "backgroundColor": "grey" },
            ],
        },
        "options": {
            "events": [],
            "indexAxis": "y",
            "plugins": { "legend": { "display": false } },
            "interaction": { "intersect": false },
            "scales": {
                "x": { "stacked": true, "display": false },
                "y": { "stacked": true, "display": false },
            },
        },
    })
}
