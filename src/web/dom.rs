//! [`Dom`] over the real page.

use std::cell::RefCell;
use std::collections::HashMap;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, Element, Event, HtmlCanvasElement, HtmlElement, HtmlInputElement,
    HtmlOptionElement, HtmlSelectElement, Node, Window,
};

use super::charts;
use crate::app::dom::{
    Dom, EventSink, Placement, UiEvent, UiEventKind, CONTENT_CONTAINER, DRAGGED_CLASS,
    EMPTY_SELECTION_LABEL, WIDGET_SELECTOR,
};
use crate::app::render::{RenderedContent, SexMarker, Skeleton};
use crate::app::templates::TemplateRegistry;
use crate::error::{DashboardError, Result};
use crate::model::{
    DatasetAttrs, LocationChoices, TimeType, WidgetDescriptor, WidgetId, WidgetInputs,
    EMPTY_SELECTION_VALUE,
};

type Listener = Closure<dyn FnMut(Event)>;

fn dom_error(e: JsValue) -> DashboardError {
    DashboardError::Dom(format!("{:?}", e))
}

fn find(node: &Element, selector: &str) -> Option<Element> {
    node.query_selector(selector).ok().flatten()
}

fn find_as<T: JsCast>(node: &Element, selector: &str) -> Option<T> {
    find(node, selector).and_then(|e| e.dyn_into::<T>().ok())
}

fn require(node: &Element, selector: &'static str) -> Result<Element> {
    find(node, selector).ok_or(DashboardError::MissingTemplate(selector))
}

fn find_all(node: &Element, selector: &str) -> Vec<Element> {
    let Ok(list) = node.query_selector_all(selector) else {
        return Vec::new();
    };
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|n| n.dyn_into::<Element>().ok())
        .collect()
}

fn clone_element(template: &Element) -> Result<Element> {
    template
        .clone_node_with_deep(true)
        .map_err(dom_error)?
        .dyn_into::<Element>()
        .map_err(|_| DashboardError::Dom("template is not an element".to_string()))
}

fn append(parent: &Element, child: &Element) -> Result<()> {
    parent.append_child(child).map(|_| ()).map_err(dom_error)
}

fn set_text(node: &Element, selector: &str, text: &str) {
    if let Some(element) = find(node, selector) {
        element.set_text_content(Some(text));
    }
}

fn set_shown(element: &Element, display: Option<&str>) {
    if let Some(element) = element.dyn_ref::<HtmlElement>() {
        element.set_hidden(display.is_none());
        let _ = element
            .style()
            .set_property("display", display.unwrap_or("none"));
    }
}

fn set_sex_class(element: &Element, sex: SexMarker) {
    let classes = element.class_list();
    for class in SexMarker::ALL_CLASSES {
        let _ = classes.remove_1(class);
    }
    let _ = classes.add_1(sex.css_class());
}

fn set_input(node: &Element, selector: &str, value: Option<&str>) {
    if let (Some(input), Some(value)) = (find_as::<HtmlInputElement>(node, selector), value) {
        input.set_value(value);
    }
}

pub struct BrowserDom {
    window: Window,
    document: Document,
    container: Element,
    // Keyed by widget id; dropped when the widget's node is removed.
    listeners: RefCell<HashMap<String, Vec<Listener>>>,
}

impl BrowserDom {
    pub fn new(window: Window) -> Result<Self> {
        let document = window
            .document()
            .ok_or_else(|| DashboardError::Dom("no document".to_string()))?;
        let container = document
            .query_selector(CONTENT_CONTAINER)
            .map_err(dom_error)?
            .ok_or(DashboardError::MissingTemplate(CONTENT_CONTAINER))?;
        Ok(Self {
            window,
            document,
            container,
            listeners: RefCell::new(HashMap::new()),
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    fn listen<F>(&self, key: &str, target: &Element, event: &str, handler: F)
    where
        F: FnMut(Event) + 'static,
    {
        let closure: Listener = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        if let Err(e) =
            target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
        {
            tracing::warn!("Cannot listen for {} on widget {}: {:?}", event, key, e);
            return;
        }
        self.listeners
            .borrow_mut()
            .entry(key.to_string())
            .or_default()
            .push(closure);
    }

    fn forward(
        &self,
        target: &Element,
        widget: &WidgetId,
        event: &str,
        kind: UiEventKind,
        sink: &EventSink,
    ) {
        let sink = sink.clone();
        let id = widget.clone();
        self.listen(widget.as_str(), target, event, move |_| {
            sink(UiEvent::new(id.clone(), kind))
        });
    }

    fn new_option(&self, label: &str, value: &str) -> Result<HtmlOptionElement> {
        let option = self
            .document
            .create_element("option")
            .map_err(dom_error)?
            .dyn_into::<HtmlOptionElement>()
            .map_err(|_| DashboardError::Dom("option is not an <option>".to_string()))?;
        option.set_value(value);
        option.set_text(label);
        Ok(option)
    }

    fn hide_data_holders(&self, node: &Element) {
        for holder in find_all(node, ".data-holder") {
            set_shown(&holder, None);
        }
    }
}

impl Dom for BrowserDom {
    type Node = Element;

    fn existing_widget_nodes(&self) -> Vec<Element> {
        find_all(&self.container, WIDGET_SELECTOR)
    }

    fn find_template(&self, selector: &'static str) -> Option<Element> {
        self.document.query_selector(selector).ok().flatten()
    }

    fn read_dataset(&self, node: &Element) -> DatasetAttrs {
        DatasetAttrs {
            id: node.get_attribute("data-id"),
            location: node.get_attribute("data-location"),
            theme: node.get_attribute("data-theme"),
            time: node.get_attribute("data-time"),
            order: node.get_attribute("data-order"),
        }
    }

    fn read_inputs(&self, node: &Element) -> WidgetInputs {
        WidgetInputs {
            selected_location: find_as::<HtmlSelectElement>(node, ".selection-input")
                .map(|select| select.value()),
            time: find_as::<HtmlInputElement>(node, ".time-input")
                .or_else(|| find_as::<HtmlInputElement>(node, ".from-input"))
                .map(|input| input.value()),
            end_time: find_as::<HtmlInputElement>(node, ".to-input").map(|input| input.value()),
        }
    }

    fn create_widget_node(
        &self,
        templates: &TemplateRegistry<Element>,
        descriptor: &WidgetDescriptor,
    ) -> Result<Element> {
        let node = clone_element(&templates.content_view)?;
        node.remove_attribute("id").map_err(dom_error)?;
        node.class_list().add_1("content-view").map_err(dom_error)?;

        let order = descriptor.order.to_string();
        for (name, value) in [
            ("data-id", descriptor.id.as_str()),
            ("data-location", descriptor.location.code()),
            ("data-theme", descriptor.theme.code()),
            ("data-time", descriptor.time_mode.code()),
            ("data-order", order.as_str()),
        ] {
            node.set_attribute(name, value).map_err(dom_error)?;
        }

        let time_div = require(&node, ".time-input-div")?;
        match descriptor.time_mode {
            TimeType::Point => {
                let span = clone_element(&templates.point_input)?;
                set_input(&span, ".time-input", descriptor.time.as_deref());
                append(&time_div, &span)?;
            }
            TimeType::Period => {
                let from = clone_element(&templates.from_input)?;
                set_input(&from, ".from-input", descriptor.time.as_deref());
                append(&time_div, &from)?;

                let to = clone_element(&templates.to_input)?;
                set_input(&to, ".to-input", descriptor.end_time.as_deref());
                append(&time_div, &to)?;
            }
            TimeType::Near => {}
        }

        if descriptor.location.needs_selection() {
            let location_div = require(&node, ".location-input-div")?;
            append(&location_div, &clone_element(&templates.location_select)?)?;
        }

        append(&self.container, &node)?;
        Ok(node)
    }

    fn scroll_into_view(&self, node: &Element) {
        node.scroll_into_view();
    }

    fn set_heading(&self, node: &Element, heading: &str) {
        set_text(node, ".content-view-heading", heading);
    }

    fn mount_skeleton(
        &self,
        node: &Element,
        templates: &TemplateRegistry<Element>,
        skeleton: Skeleton,
    ) -> Result<()> {
        let data_div = require(node, ".content-view-data-div")?;
        let loader = clone_element(&templates.loader)?;

        match skeleton {
            Skeleton::RoomSummary => {
                append(&data_div, &loader)?;
                append(&data_div, &clone_element(&templates.room_data)?)?;
            }
            Skeleton::InfoChart => {
                append(&data_div, &loader)?;
                append(&data_div, &clone_element(&templates.information_chart)?)?;
            }
            Skeleton::HistoryChart => {
                append(&data_div, &loader)?;
                append(&data_div, &clone_element(&templates.history_chart)?)?;
            }
            Skeleton::BedList | Skeleton::LocationList(_) => {
                let head = if skeleton == Skeleton::BedList {
                    clone_element(&templates.bed_list_head)?
                } else {
                    clone_element(&templates.location_list_head)?
                };
                if let Some(text) = skeleton.list_head() {
                    set_text(&head, ".location-name-head", text);
                }
                append(&data_div, &head)?;

                let list = clone_element(&templates.location_list)?;
                append(&list, &loader)?;
                append(&data_div, &list)?;
            }
        }
        Ok(())
    }

    fn set_loader_visible(&self, node: &Element, visible: bool) {
        if let Some(loader) = find_as::<HtmlElement>(node, ".loader") {
            loader.set_hidden(!visible);
        }
    }

    fn clear_content(&self, node: &Element) {
        if find(node, ".data-holder").is_some() {
            self.hide_data_holders(node);
        } else if let Some(list) = find(node, ".location-list-div") {
            for row in find_all(&list, ".location-div") {
                row.remove();
            }
        }
    }

    fn show_content(
        &self,
        node: &Element,
        templates: &TemplateRegistry<Element>,
        content: &RenderedContent,
    ) -> Result<()> {
        match content {
            RenderedContent::Room(summary) => {
                let room = require(node, ".room-data-div")?;
                if let Some(rectangle) = find(&room, ".sex-rectangle-span") {
                    set_sex_class(&rectangle, summary.sex);
                }
                set_text(&room, ".sex-span", summary.sex.label());
                set_text(&room, ".room-age-h4", &summary.average_age);
                set_text(&room, ".room-occupancy-h4", &summary.occupancy);
                set_text(&room, ".room-free-beds-h4", &summary.free_beds);
                set_shown(&room, Some("flex"));
            }
            RenderedContent::Doughnut(chart) => {
                let canvas = find_as::<HtmlCanvasElement>(node, ".information-chart-canvas")
                    .ok_or(DashboardError::MissingTemplate(".information-chart-canvas"))?;
                charts::draw(&canvas, &charts::doughnut(chart))?;
                set_shown(&canvas, Some("block"));
            }
            RenderedContent::History(series) => {
                let canvas = find_as::<HtmlCanvasElement>(node, ".occupancy-history-chart-canvas")
                    .ok_or(DashboardError::MissingTemplate(".occupancy-history-chart-canvas"))?;
                charts::draw(&canvas, &charts::history(series))?;
                set_shown(&canvas, Some("block"));
            }
            RenderedContent::Beds(rows) => {
                let list = require(node, ".location-list-div")?;
                for row in rows {
                    let item = clone_element(&templates.bed_row)?;
                    set_text(&item, ".bed-name-span", &row.name);
                    set_text(&item, ".bed-age-span", &row.average_age);
                    set_text(&item, ".bed-sex-span", row.sex.label());
                    if let Some(rectangle) = find(&item, ".sex-rectangle") {
                        set_sex_class(&rectangle, row.sex);
                    }
                    append(&list, &item)?;
                }
            }
            RenderedContent::Locations { rows, .. } => {
                let list = require(node, ".location-list-div")?;
                for row in rows {
                    let item = clone_element(&templates.location_row)?;
                    set_text(&item, ".location-name-span", &row.name);
                    set_text(&item, ".location-occupancy-span", &row.occupancy);
                    append(&list, &item)?;
                    if let Some(canvas) =
                        find_as::<HtmlCanvasElement>(&item, ".location-occupancy-chart-canvas")
                    {
                        charts::draw(&canvas, &charts::occupancy_bar(row))?;
                    }
                }
            }
            RenderedContent::Unavailable => self.hide_data_holders(node),
        }
        Ok(())
    }

    fn populate_location_select(&self, node: &Element, choices: Option<&LocationChoices>) {
        let Some(select) = find_as::<HtmlSelectElement>(node, ".selection-input") else {
            return;
        };

        if let Some(choices) = choices {
            select.set_length(0);
            for option in &choices.options {
                match self.new_option(&option.name, option.id.as_str()) {
                    Ok(element) => {
                        let _ = select.append_child(&element);
                    }
                    Err(e) => tracing::warn!("Cannot add location option {}: {}", option.id, e),
                }
            }
            if let Some(selected) = &choices.selected {
                select.set_value(selected.as_str());
            }
        }

        if select.length() == 0 {
            match self.new_option(EMPTY_SELECTION_LABEL, EMPTY_SELECTION_VALUE) {
                Ok(placeholder) => {
                    placeholder.set_selected(true);
                    placeholder.set_disabled(true);
                    let _ = select.append_child(&placeholder);
                }
                Err(e) => tracing::warn!("Cannot add placeholder option: {}", e),
            }
        }
    }

    fn write_time_inputs(&self, node: &Element, time: Option<&str>, end_time: Option<&str>) {
        set_input(node, ".time-input", time);
        set_input(node, ".from-input", time);
        set_input(node, ".to-input", end_time);
    }

    fn set_order_attr(&self, node: &Element, order: usize) {
        let _ = node.set_attribute("data-order", &order.to_string());
    }

    fn is_attached(&self, node: &Element) -> bool {
        node.is_connected()
    }

    fn remove_node(&self, node: &Element) {
        node.remove();
        let Some(id) = node.get_attribute("data-id") else {
            return;
        };
        let removed = self.listeners.borrow_mut().remove(&id);
        if let Some(listeners) = removed {
            // One of these may be the click handler that is running right now.
            wasm_bindgen_futures::spawn_local(async move { drop(listeners) });
        }
    }

    fn move_node(&self, node: &Element, anchor: &Element, placement: Placement) {
        let Some(parent) = anchor.parent_node() else {
            return;
        };
        let next = anchor.next_sibling();
        let reference: Option<&Node> = match placement {
            Placement::Before => Some(anchor.as_ref()),
            Placement::After => next.as_ref(),
        };
        if let Err(e) = parent.insert_before(node, reference) {
            tracing::warn!("Cannot move widget node: {:?}", e);
        }
    }

    fn bind_events(&self, node: &Element, widget: &WidgetId, sink: EventSink) {
        for (event, kind) in [
            ("dragstart", UiEventKind::DragStart),
            ("dragenter", UiEventKind::DragEnter),
            ("dragend", UiEventKind::DragEnd),
        ] {
            self.forward(node, widget, event, kind, &sink);
        }

        // Both must be cancelled for the node to accept a drop.
        self.listen(widget.as_str(), node, "dragover", |e: Event| e.prevent_default());
        let drop_sink = sink.clone();
        let drop_id = widget.clone();
        self.listen(widget.as_str(), node, "drop", move |e: Event| {
            e.prevent_default();
            drop_sink(UiEvent::new(drop_id.clone(), UiEventKind::Drop));
        });

        if let Some(delete) = find(node, ".delete-image") {
            self.forward(&delete, widget, "click", UiEventKind::DeleteRequested, &sink);
        }
        if let Some(download) = find(node, ".download-image") {
            self.forward(&download, widget, "click", UiEventKind::DownloadRequested, &sink);
        }
        for input in find_all(node, ".selection-input, .from-input, .to-input, .time-input") {
            self.forward(&input, widget, "change", UiEventKind::InputChanged, &sink);
        }
    }

    fn set_dragging(&self, node: &Element, dragging: bool) {
        let classes = node.class_list();
        let _ = if dragging {
            classes.add_1(DRAGGED_CLASS)
        } else {
            classes.remove_1(DRAGGED_CLASS)
        };
    }

    fn confirm(&self, message: &str) -> bool {
        self.window.confirm_with_message(message).unwrap_or(false)
    }

    fn open_in_new_tab(&self, url: &str) {
        if let Err(e) = self.window.open_with_url_and_target(url, "_blank") {
            tracing::warn!("Cannot open {}: {:?}", url, e);
        }
    }
}
