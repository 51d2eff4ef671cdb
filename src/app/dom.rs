//! DOM seam: everything the engine does to the page goes through [`Dom`].
//!
//! The browser implementation works on `web_sys::Element`s; the test harness
//! keeps an in-memory node table. The engine never inspects a node itself,
//! it only hands nodes back to the implementation that produced them.

use std::rc::Rc;

use super::render::{RenderedContent, Skeleton};
use super::templates::TemplateRegistry;
use crate::error::Result;
use crate::model::{DatasetAttrs, LocationChoices, WidgetDescriptor, WidgetId, WidgetInputs};

pub const CONTENT_CONTAINER: &str = "#content-div";
pub const WIDGET_SELECTOR: &str = ".content-view";
pub const ADD_WIDGET_SELECTOR: &str = ".selection.time";
pub const DRAGGED_CLASS: &str = "dragged-content-view";
pub const EMPTY_SELECTION_LABEL: &str = "-- leer --";

/// Where a moved node lands relative to its anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    Before,
    After,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiEventKind {
    DragStart,
    DragEnter,
    Drop,
    DragEnd,
    /// Location selection, point time, or from/to changed.
    InputChanged,
    DeleteRequested,
    DownloadRequested,
}

/// A user interaction on one widget.
#[derive(Clone, Debug, PartialEq)]
pub struct UiEvent {
    pub widget: WidgetId,
    pub kind: UiEventKind,
}

impl UiEvent {
    pub fn new(widget: WidgetId, kind: UiEventKind) -> Self {
        Self { widget, kind }
    }
}

/// Receiver the DOM forwards widget interactions to.
pub type EventSink = Rc<dyn Fn(UiEvent)>;

pub trait Dom: 'static {
    type Node: Clone + 'static;

    /// Server-rendered widget nodes in on-screen order.
    fn existing_widget_nodes(&self) -> Vec<Self::Node>;

    /// Template lookup, used once to build the [`TemplateRegistry`].
    fn find_template(&self, selector: &'static str) -> Option<Self::Node>;

    fn read_dataset(&self, node: &Self::Node) -> DatasetAttrs;

    /// Current values of the widget's selection and time inputs.
    fn read_inputs(&self, node: &Self::Node) -> WidgetInputs;

    /// Clone a widget node from the templates for a freshly created
    /// descriptor, with its time and location inputs, and append it to the
    /// content container.
    fn create_widget_node(
        &self,
        templates: &TemplateRegistry<Self::Node>,
        descriptor: &WidgetDescriptor,
    ) -> Result<Self::Node>;

    fn scroll_into_view(&self, node: &Self::Node);

    fn set_heading(&self, node: &Self::Node, heading: &str);

    /// Mount the loader and the data container of `skeleton`.
    fn mount_skeleton(
        &self,
        node: &Self::Node,
        templates: &TemplateRegistry<Self::Node>,
        skeleton: Skeleton,
    ) -> Result<()>;

    fn set_loader_visible(&self, node: &Self::Node, visible: bool);

    /// Hide or drop previously rendered data.
    fn clear_content(&self, node: &Self::Node);

    fn show_content(
        &self,
        node: &Self::Node,
        templates: &TemplateRegistry<Self::Node>,
        content: &RenderedContent,
    ) -> Result<()>;

    /// `Some` replaces all options; `None` keeps what the server rendered.
    /// Either way an empty selection ends up holding only the disabled
    /// placeholder.
    fn populate_location_select(&self, node: &Self::Node, choices: Option<&LocationChoices>);

    fn write_time_inputs(&self, node: &Self::Node, time: Option<&str>, end_time: Option<&str>);

    /// Project the in-memory order onto the node's `data-order` attribute.
    fn set_order_attr(&self, node: &Self::Node, order: usize);

    fn is_attached(&self, node: &Self::Node) -> bool;

    fn remove_node(&self, node: &Self::Node);

    fn move_node(&self, node: &Self::Node, anchor: &Self::Node, placement: Placement);

    fn bind_events(&self, node: &Self::Node, widget: &WidgetId, sink: EventSink);

    fn set_dragging(&self, node: &Self::Node, dragging: bool);

    fn confirm(&self, message: &str) -> bool;

    fn open_in_new_tab(&self, url: &str);
}
