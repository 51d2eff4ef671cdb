//! Widget lifecycle and ordering engine.
//!
//! [`Dashboard`] owns the ordered widget collection and routes user
//! interactions to it. It is platform-agnostic: the page is reached through
//! [`Dom`], the server through [`DataAccess`], tasks and timers through
//! [`EventLoop`]. The browser bindings live in `crate::web`; tests drive the
//! same engine against in-memory doubles.

pub mod dom;
pub mod event_loop;
pub mod factory;
pub mod order;
pub mod render;
pub mod templates;
pub mod widget;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, info, warn};

use crate::api::DataAccess;
use crate::config::Settings;
use crate::error::Result;
use crate::model::{
    LocationType, OrderEntry, ThemeType, TimeType, WidgetDescriptor, WidgetId,
};

pub use dom::{Dom, EventSink, Placement, UiEvent, UiEventKind};
pub use event_loop::{EventLoop, IntervalId};
pub use factory::WidgetFactory;
pub use order::OrderController;
pub use render::{RenderStrategy, RenderedContent, Skeleton};
pub use templates::TemplateRegistry;
pub use widget::{Widget, WidgetState};

/// Collaborators shared by every widget.
pub struct Context<D: Dom> {
    pub dom: D,
    pub templates: TemplateRegistry<D::Node>,
    pub api: DataAccess,
    pub event_loop: Rc<dyn EventLoop>,
    pub settings: Settings,
}

// =============================================================================
// Dashboard
// =============================================================================

pub struct Dashboard<D: Dom> {
    inner: Rc<DashboardInner<D>>,
}

struct DashboardInner<D: Dom> {
    ctx: Rc<Context<D>>,
    factory: WidgetFactory<D>,
    order: RefCell<OrderController<D>>,
}

impl<D: Dom> Clone for Dashboard<D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<D: Dom> Dashboard<D> {
    /// Resolve the page templates and set up an empty dashboard.
    pub fn new(
        dom: D,
        api: DataAccess,
        event_loop: Rc<dyn EventLoop>,
        settings: Settings,
    ) -> Result<Self> {
        let templates = TemplateRegistry::load(|selector| dom.find_template(selector))?;
        let ctx = Rc::new(Context {
            dom,
            templates,
            api,
            event_loop,
            settings,
        });
        Ok(Self {
            inner: Rc::new(DashboardInner {
                factory: WidgetFactory::new(ctx.clone()),
                order: RefCell::new(OrderController::new(ctx.clone())),
                ctx,
            }),
        })
    }

    pub fn context(&self) -> &Context<D> {
        &self.inner.ctx
    }

    /// Sink handed to the DOM for one widget's interactions.
    fn event_sink(&self) -> EventSink {
        let weak: Weak<DashboardInner<D>> = Rc::downgrade(&self.inner);
        Rc::new(move |event: UiEvent| {
            if let Some(inner) = weak.upgrade() {
                Dashboard { inner }.handle(event);
            }
        })
    }

    /// Adopt the widgets the server rendered into the page.
    ///
    /// A node that can't be turned into a widget is logged and left alone;
    /// the others still load. Returns the number of widgets adopted.
    pub fn boot(&self) -> usize {
        let dom = &self.inner.ctx.dom;
        let mut found = Vec::new();

        for node in dom.existing_widget_nodes() {
            let attrs = dom.read_dataset(&node);
            let inputs = dom.read_inputs(&node);
            match WidgetDescriptor::from_dataset(&attrs, &inputs) {
                Ok(descriptor) => found.push((descriptor, node)),
                Err(e) => warn!("Skipping widget node {:?}: {}", attrs.id, e),
            }
        }

        let mut widgets = Vec::with_capacity(found.len());
        for (descriptor, node) in found {
            let id = descriptor.id.clone();
            match self
                .inner
                .factory
                .create_from_descriptor(descriptor, node, None, self.event_sink())
            {
                Ok(widget) => widgets.push(widget),
                Err(e) => warn!("Skipping widget {}: {}", id, e),
            }
        }

        let adopted = widgets.len();
        self.inner.order.borrow_mut().adopt(widgets);
        info!("Dashboard booted with {} widgets", adopted);
        adopted
    }

    /// Create a widget on the server and append it to the page.
    pub async fn create_widget(
        &self,
        location: LocationType,
        theme: ThemeType,
        time: TimeType,
    ) -> Result<WidgetId> {
        let widget = self
            .inner
            .factory
            .create_from_server_creation(location, theme, time, self.event_sink())
            .await?;
        let id = widget.id();
        self.inner.order.borrow_mut().append(widget);
        debug!("Widget {} added", id);
        Ok(id)
    }

    /// Fire-and-forget [`Dashboard::create_widget`] for menu clicks.
    pub fn request_widget(&self, location: LocationType, theme: ThemeType, time: TimeType) {
        let dashboard = self.clone();
        event_loop::spawn_local(&*self.inner.ctx.event_loop, async move {
            if let Err(e) = dashboard.create_widget(location, theme, time).await {
                warn!(
                    "Adding a {}/{}/{} widget failed: {}",
                    location, theme, time, e
                );
            }
        });
    }

    /// Route one user interaction.
    pub fn handle(&self, event: UiEvent) {
        let id = &event.widget;
        match event.kind {
            UiEventKind::DragStart => self.inner.order.borrow_mut().on_drag_start(id),
            UiEventKind::DragEnter => {
                self.inner.order.borrow_mut().on_drag_enter(id);
            }
            UiEventKind::Drop => self.commit_order(),
            UiEventKind::DragEnd => {
                let uncommitted = self.inner.order.borrow_mut().on_drag_end();
                if uncommitted {
                    debug!("Drag of widget {} ended without a drop", id);
                    self.commit_order();
                }
            }
            UiEventKind::InputChanged => {
                if let Some(widget) = self.widget(id) {
                    if let Err(e) = widget.refresh(true) {
                        warn!("Widget {} not refreshed: {}", id, e);
                    }
                }
            }
            UiEventKind::DeleteRequested => {
                self.delete_widget(id);
            }
            UiEventKind::DownloadRequested => {
                if let Some(widget) = self.widget(id) {
                    if let Err(e) = widget.download() {
                        warn!("Download for widget {} not started: {}", id, e);
                    }
                }
            }
        }
    }

    /// Send the full order to the server in the background.
    pub fn commit_order(&self) {
        self.inner.order.borrow_mut().mark_committed();
        let entries = self.order_entries();
        let api = self.inner.ctx.api.clone();
        event_loop::spawn_local(&*self.inner.ctx.event_loop, async move {
            api.update_order_or_else(&entries, |e| warn!("Saving widget order failed: {}", e))
                .await;
        });
    }

    /// Delete a widget after user confirmation.
    ///
    /// Once confirmed the widget is removed locally whatever the server
    /// answers. Returns whether the widget was removed.
    pub fn delete_widget(&self, id: &WidgetId) -> bool {
        let Some(widget) = self.widget(id) else {
            return false;
        };
        let ctx = &self.inner.ctx;
        if !ctx.dom.confirm(&ctx.settings.delete_confirmation) {
            debug!("Deletion of widget {} declined", id);
            return false;
        }

        widget.destroy();

        let api = ctx.api.clone();
        let server_id = id.clone();
        event_loop::spawn_local(&*ctx.event_loop, async move {
            if let Err(e) = api.delete_widget(&server_id).await {
                warn!("Server deletion of widget {} failed: {}", server_id, e);
            }
        });

        self.inner.order.borrow_mut().remove(id);
        ctx.dom.remove_node(widget.node());
        self.commit_order();
        info!("Widget {} deleted", id);
        true
    }

    /// Stop every widget on page unload. Nothing is deleted on the server.
    pub fn shutdown(&self) {
        let widgets = self.inner.order.borrow_mut().take_all();
        for widget in &widgets {
            widget.destroy();
        }
        debug!("Dashboard shut down, {} widgets stopped", widgets.len());
    }

    pub fn widget(&self, id: &WidgetId) -> Option<Widget<D>> {
        self.inner.order.borrow().get(id).cloned()
    }

    pub fn widgets(&self) -> Vec<Widget<D>> {
        self.inner.order.borrow().iter().cloned().collect()
    }

    pub fn order_entries(&self) -> Vec<OrderEntry> {
        self.inner.order.borrow().entries()
    }

    pub fn len(&self) -> usize {
        self.inner.order.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.order.borrow().is_empty()
    }
}
