//! One on-screen content view and its fetch/render cycle.
//!
//! A widget owns its node, its descriptor and, in near-time mode, exactly one
//! repeating refresh timer. Fetches run as detached tasks that only hold a
//! weak reference: a widget deleted (or a node detached) while a request is
//! in flight simply drops the response.

use std::cell::{Cell, Ref, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use super::dom::{Dom, EventSink};
use super::event_loop::{spawn_local, IntervalId};
use super::factory::heading;
use super::render::RenderStrategy;
use super::Context;
use crate::api::DataQuery;
use crate::error::Result;
use crate::model::{DataResponse, LocationChoices, TimeType, WidgetDescriptor, WidgetId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WidgetState {
    Constructing,
    /// First fetch in flight, or it failed and the loader is stuck.
    Loading,
    Ready,
    /// Re-fetch in flight (or failed) after at least one successful render.
    Refreshing,
    Destroyed,
}

pub struct Widget<D: Dom> {
    inner: Rc<WidgetInner<D>>,
}

struct WidgetInner<D: Dom> {
    ctx: Rc<Context<D>>,
    node: D::Node,
    descriptor: RefCell<WidgetDescriptor>,
    strategy: RenderStrategy,
    state: Cell<WidgetState>,
    refresh: Cell<Option<IntervalId>>,
}

impl<D: Dom> Clone for Widget<D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<D: Dom> Drop for WidgetInner<D> {
    fn drop(&mut self) {
        if let Some(id) = self.refresh.take() {
            self.ctx.event_loop.clear_interval(id);
        }
    }
}

impl<D: Dom> WidgetInner<D> {
    fn is_live(&self) -> bool {
        self.state.get() != WidgetState::Destroyed && self.ctx.dom.is_attached(&self.node)
    }
}

impl<D: Dom> Widget<D> {
    /// Mount the skeleton, wire events, start the near-time timer and kick
    /// off the first fetch.
    ///
    /// A first fetch that cannot be built (missing time or location) is
    /// logged; the widget then waits with its loader up for an input change.
    pub(crate) fn construct(
        ctx: Rc<Context<D>>,
        node: D::Node,
        descriptor: WidgetDescriptor,
        strategy: RenderStrategy,
        choices: Option<&LocationChoices>,
        sink: EventSink,
    ) -> Result<Self> {
        let dom = &ctx.dom;
        dom.mount_skeleton(&node, &ctx.templates, strategy.skeleton())?;
        dom.set_heading(&node, &heading(descriptor.location, descriptor.theme));
        dom.bind_events(&node, &descriptor.id, sink);
        if descriptor.location.needs_selection() {
            dom.populate_location_select(&node, choices);
        }

        let near = descriptor.time_mode == TimeType::Near;
        let widget = Self {
            inner: Rc::new(WidgetInner {
                ctx,
                node,
                descriptor: RefCell::new(descriptor),
                strategy,
                state: Cell::new(WidgetState::Constructing),
                refresh: Cell::new(None),
            }),
        };

        if near {
            widget.start_refresh_timer();
        }
        if let Err(e) = widget.refresh(false) {
            warn!("Widget {} cannot load yet: {}", widget.id(), e);
        }
        Ok(widget)
    }

    fn start_refresh_timer(&self) {
        let weak: Weak<WidgetInner<D>> = Rc::downgrade(&self.inner);
        let period = self.inner.ctx.settings.near_refresh_interval();
        let id = self.inner.ctx.event_loop.set_interval(
            period,
            Box::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let widget = Widget { inner };
                if let Err(e) = widget.refresh(false) {
                    warn!("Periodic refresh of widget {} failed: {}", widget.id(), e);
                }
            }),
        );
        debug!("Widget {} refreshes every {:?}", self.id(), period);
        self.inner.refresh.set(Some(id));
    }

    pub fn id(&self) -> WidgetId {
        self.inner.descriptor.borrow().id.clone()
    }

    pub fn order(&self) -> usize {
        self.inner.descriptor.borrow().order
    }

    pub fn descriptor(&self) -> Ref<'_, WidgetDescriptor> {
        self.inner.descriptor.borrow()
    }

    pub fn node(&self) -> &D::Node {
        &self.inner.node
    }

    pub fn state(&self) -> WidgetState {
        self.inner.state.get()
    }

    pub fn strategy(&self) -> RenderStrategy {
        self.inner.strategy
    }

    pub fn has_refresh_timer(&self) -> bool {
        self.inner.refresh.get().is_some()
    }

    pub fn is_live(&self) -> bool {
        self.inner.is_live()
    }

    pub fn same_as(&self, other: &Widget<D>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Write `order` to the in-memory descriptor and project it onto the node.
    pub(crate) fn set_order(&self, order: usize) {
        self.inner.descriptor.borrow_mut().order = order;
        self.inner.ctx.dom.set_order_attr(&self.inner.node, order);
    }

    fn sync_inputs(&self) {
        let inputs = self.inner.ctx.dom.read_inputs(&self.inner.node);
        self.inner.descriptor.borrow_mut().apply_inputs(&inputs);
    }

    /// Start a fetch for the current inputs.
    ///
    /// The loader is shown and old data cleared before the query is built,
    /// so a rejected query leaves the loader up. Overlapping fetches are not
    /// cancelled; whichever response lands last is what stays on screen.
    pub fn refresh(&self, update_inputs: bool) -> Result<()> {
        let inner = &self.inner;
        if !inner.is_live() {
            debug!("Skipping refresh of widget {}: not on the page", self.id());
            return Ok(());
        }

        inner.state.set(match inner.state.get() {
            WidgetState::Constructing | WidgetState::Loading => WidgetState::Loading,
            _ => WidgetState::Refreshing,
        });
        inner.ctx.dom.clear_content(&inner.node);
        inner.ctx.dom.set_loader_visible(&inner.node, true);

        self.sync_inputs();
        let query = DataQuery::for_descriptor(&inner.descriptor.borrow(), update_inputs, false)?;

        let weak = Rc::downgrade(inner);
        let api = inner.ctx.api.clone();
        spawn_local(&*inner.ctx.event_loop, async move {
            let result = api.fetch_widget_data(&query).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let widget = Widget { inner };
            match result {
                Ok(response) => widget.finish_fetch(response),
                Err(e) => warn!("Fetching data for widget {} failed: {}", query.id, e),
            }
        });
        Ok(())
    }

    fn finish_fetch(&self, response: DataResponse) {
        if !self.is_live() {
            debug!("Discarding data for widget {}: no longer on the page", self.id());
            return;
        }
        if let Err(e) = self.apply_response(&response) {
            warn!("Rendering widget {} failed: {}", self.id(), e);
        }
    }

    fn apply_response(&self, response: &DataResponse) -> Result<()> {
        let inner = &self.inner;
        let dom = &inner.ctx.dom;

        if let Some(record) = &response.user_data_representation {
            let mut descriptor = inner.descriptor.borrow_mut();
            descriptor.apply_record(record);
            dom.write_time_inputs(
                &inner.node,
                descriptor.time.as_deref(),
                descriptor.end_time.as_deref(),
            );
        }

        let descriptor = inner.descriptor.borrow().clone();
        if descriptor.location.needs_selection() {
            if let Some(options) = &response.locations {
                dom.populate_location_select(
                    &inner.node,
                    Some(&LocationChoices {
                        options: options.clone(),
                        selected: descriptor.selected_location.clone(),
                    }),
                );
            }
        }

        let content = inner.strategy.render(&response.data)?;
        dom.show_content(&inner.node, &inner.ctx.templates, &content)?;
        dom.set_loader_visible(&inner.node, false);
        inner.state.set(WidgetState::Ready);
        debug!("Widget {} rendered", descriptor.id);
        Ok(())
    }

    /// Open the widget's data as a CSV download in a new tab.
    pub fn download(&self) -> Result<()> {
        self.sync_inputs();
        let url = self.inner.ctx.api.download_url(&self.inner.descriptor.borrow())?;
        self.inner.ctx.dom.open_in_new_tab(&url);
        Ok(())
    }

    /// Stop the widget for good: cancel its timer and mark it so pending
    /// fetches are discarded. Page and server cleanup belong to the caller.
    pub fn destroy(&self) {
        if self.inner.state.replace(WidgetState::Destroyed) == WidgetState::Destroyed {
            return;
        }
        if let Some(id) = self.inner.refresh.take() {
            self.inner.ctx.event_loop.clear_interval(id);
            debug!("Cancelled refresh timer of widget {}", self.id());
        }
    }
}
