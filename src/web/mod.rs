//! Browser entry point and web-sys bindings.
//!
//! Built only for `wasm32`. On module start the dashboard reads the
//! anti-forgery token from the page, resolves the templates, adopts the
//! server-rendered widgets and wires the add-widget menu.

pub mod charts;
pub mod console;
pub mod dom;
pub mod event_loop;
pub mod fetch;

use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, HtmlInputElement};

use crate::api::{CsrfToken, DataAccess};
use crate::app::dom::ADD_WIDGET_SELECTOR;
use crate::app::Dashboard;
use crate::catalog;
use crate::config::Settings;
use crate::error::DashboardError;
use crate::model::{LocationType, ThemeType, TimeType};

use self::dom::BrowserDom;
use self::event_loop::BrowserEventLoop;
use self::fetch::FetchClient;

fn to_js(e: DashboardError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn read_csrf_token(document: &web_sys::Document, field: &str) -> Result<CsrfToken, DashboardError> {
    let value = document
        .query_selector(&format!("[name={}]", field))
        .ok()
        .flatten()
        .and_then(|e| e.dyn_into::<HtmlInputElement>().ok())
        .map(|input| input.value());
    CsrfToken::from_value(value, field)
}

/// Parse the `data-location`/`data-theme`/`data-time` codes of a menu entry.
fn menu_choice(entry: &Element) -> Result<(LocationType, ThemeType, TimeType), DashboardError> {
    let code = |name: &'static str| {
        entry
            .get_attribute(name)
            .ok_or_else(|| DashboardError::InvalidArgument(format!("menu entry without {}", name)))
    };
    Ok((
        LocationType::from_code(&code("data-location")?)?,
        ThemeType::from_code(&code("data-theme")?)?,
        TimeType::from_code(&code("data-time")?)?,
    ))
}

fn wire_add_widget_menu(document: &web_sys::Document, dashboard: &Dashboard<BrowserDom>) {
    let Ok(entries) = document.query_selector_all(ADD_WIDGET_SELECTOR) else {
        return;
    };
    for entry in (0..entries.length())
        .filter_map(|i| entries.item(i))
        .filter_map(|n| n.dyn_into::<Element>().ok())
    {
        if let Ok((location, theme, time)) = menu_choice(&entry) {
            if !catalog::is_offered(location, theme, time) {
                tracing::debug!("Hiding unsupported menu entry {}/{}/{}", location, theme, time);
                let _ = entry.set_attribute("hidden", "");
                continue;
            }
        }
        let dashboard = dashboard.clone();
        let target = entry.clone();
        let on_click = Closure::wrap(Box::new(move |_: Event| match menu_choice(&target) {
            Ok((location, theme, time)) => dashboard.request_widget(location, theme, time),
            Err(e) => tracing::warn!("Ignoring add-widget click: {}", e),
        }) as Box<dyn FnMut(Event)>);
        if entry
            .add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())
            .is_ok()
        {
            // Lives as long as the page.
            on_click.forget();
        }
    }
}

fn wire_unload(window: &web_sys::Window, dashboard: &Dashboard<BrowserDom>) {
    let dashboard = dashboard.clone();
    let on_hide = Closure::wrap(Box::new(move |_: Event| dashboard.shutdown()) as Box<dyn FnMut(Event)>);
    if window
        .add_event_listener_with_callback("pagehide", on_hide.as_ref().unchecked_ref())
        .is_ok()
    {
        on_hide.forget();
    }
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console::init_logging();

    let settings = Settings::default();
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let dom = BrowserDom::new(window.clone()).map_err(to_js)?;

    // A page without the token is broken; refuse to start.
    let csrf = read_csrf_token(dom.document(), &settings.csrf_field).map_err(to_js)?;
    let document = dom.document().clone();

    let api = DataAccess::new(
        Rc::new(FetchClient),
        settings.api_root(),
        settings.csrf_header.clone(),
        csrf,
    );
    let event_loop = Rc::new(BrowserEventLoop::new(window.clone()));
    let dashboard = Dashboard::new(dom, api, event_loop, settings).map_err(to_js)?;

    dashboard.boot();
    wire_add_widget_menu(&document, &dashboard);
    wire_unload(&window, &dashboard);

    tracing::info!(
        "Occupancy dashboard {} ({}) started",
        crate::VERSION,
        crate::GIT_SHA
    );
    Ok(())
}
