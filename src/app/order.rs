//! Ordered widget collection and drag-and-drop reordering.
//!
//! The collection is the only source of truth for order. After every
//! insert, remove or move the widgets' `order` fields equal their indices
//! and the page shows them in the same sequence; `data-order` on the nodes
//! is written from here and never read back.

use std::rc::Rc;

use tracing::debug;

use super::dom::{Dom, Placement};
use super::widget::Widget;
use super::Context;
use crate::model::{OrderEntry, WidgetId};

pub struct OrderController<D: Dom> {
    ctx: Rc<Context<D>>,
    widgets: Vec<Widget<D>>,
    drag_source: Option<WidgetId>,
    /// The current drag moved something the server has not been told about.
    uncommitted_move: bool,
}

impl<D: Dom> OrderController<D> {
    pub fn new(ctx: Rc<Context<D>>) -> Self {
        Self {
            ctx,
            widgets: Vec::new(),
            drag_source: None,
            uncommitted_move: false,
        }
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Widget<D>> {
        self.widgets.iter()
    }

    pub fn get(&self, id: &WidgetId) -> Option<&Widget<D>> {
        self.widgets.iter().find(|w| w.id() == *id)
    }

    fn index_of(&self, id: &WidgetId) -> Option<usize> {
        self.widgets.iter().position(|w| w.id() == *id)
    }

    pub fn drag_source(&self) -> Option<&WidgetId> {
        self.drag_source.as_ref()
    }

    /// Adopt widgets still carrying the order they were rendered with.
    ///
    /// Seed orders are only compared with each other: the batch is stably
    /// sorted by them and appended, so equal seeds keep their page order.
    pub fn adopt(&mut self, mut widgets: Vec<Widget<D>>) {
        widgets.sort_by_key(|w| w.order());
        for widget in widgets {
            self.append(widget);
        }
    }

    /// Add a freshly created widget at the end.
    pub fn append(&mut self, widget: Widget<D>) {
        if let Some(last) = self.widgets.last() {
            self.ctx
                .dom
                .move_node(widget.node(), last.node(), Placement::After);
        }
        self.widgets.push(widget);
        self.renormalize();
    }

    /// Remove a widget from the collection. The node stays where it is.
    pub fn remove(&mut self, id: &WidgetId) -> Option<Widget<D>> {
        let index = self.index_of(id)?;
        let widget = self.widgets.remove(index);
        if self.drag_source.as_ref() == Some(id) {
            self.drag_source = None;
            self.uncommitted_move = false;
        }
        self.renormalize();
        Some(widget)
    }

    /// Remove every widget, leaving the page untouched.
    pub fn take_all(&mut self) -> Vec<Widget<D>> {
        self.drag_source = None;
        self.uncommitted_move = false;
        std::mem::take(&mut self.widgets)
    }

    pub fn on_drag_start(&mut self, id: &WidgetId) {
        if let Some(widget) = self.get(id) {
            self.ctx.dom.set_dragging(widget.node(), true);
            self.drag_source = Some(id.clone());
            self.uncommitted_move = false;
        }
    }

    /// Move the drag source next to `target`: after it when the source sat
    /// above, before it otherwise. Returns whether anything moved.
    pub fn on_drag_enter(&mut self, target: &WidgetId) -> bool {
        let Some(source) = self.drag_source.clone() else {
            return false;
        };
        if source == *target {
            return false;
        }
        let (Some(from), Some(to)) = (self.index_of(&source), self.index_of(target)) else {
            return false;
        };

        let moved = self.widgets.remove(from);
        // Indices past `from` shifted down by one.
        let (anchor, placement) = if from < to {
            (to - 1, Placement::After)
        } else {
            (to, Placement::Before)
        };
        self.ctx
            .dom
            .move_node(moved.node(), self.widgets[anchor].node(), placement);
        // Whichever side it came from, the source lands at the target's old index.
        self.widgets.insert(to, moved);
        self.renormalize();
        self.uncommitted_move = true;

        debug!("Moved widget {} from position {} to {}", source, from, to);
        true
    }

    /// The current order is about to be sent to the server.
    pub fn mark_committed(&mut self) {
        self.uncommitted_move = false;
    }

    /// Finish the drag. Returns whether it moved widgets without a drop
    /// committing them, as when the drag is cancelled outside any widget.
    pub fn on_drag_end(&mut self) -> bool {
        if let Some(source) = self.drag_source.take() {
            if let Some(widget) = self.get(&source) {
                self.ctx.dom.set_dragging(widget.node(), false);
            }
        }
        std::mem::take(&mut self.uncommitted_move)
    }

    /// Set every widget's order to its index, on the page and in memory.
    pub fn renormalize(&self) {
        for (index, widget) in self.widgets.iter().enumerate() {
            widget.set_order(index);
        }
    }

    pub fn entries(&self) -> Vec<OrderEntry> {
        self.widgets
            .iter()
            .map(|w| OrderEntry {
                id: w.id(),
                order: w.order(),
            })
            .collect()
    }
}
