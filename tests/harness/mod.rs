//! In-memory page, event loop and server for driving the dashboard engine.
//!
//! - [`FakeDom`] keeps every node in a table and records what the engine did
//!   to it (skeleton, loader, content, order attribute, listeners).
//! - [`ManualEventLoop`] runs spawned tasks on a `LocalPool` and fires
//!   intervals from a virtual clock moved with [`ManualEventLoop::advance`].
//! - [`ScriptedHttp`] records requests and answers from a responder closure,
//!   either immediately or when the test completes a oneshot.

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::oneshot;
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;
use serde_json::{json, Value};

use occupancy_dashboard::api::{CsrfToken, DataAccess, HttpClient, HttpRequest, HttpResponse, Method};
use occupancy_dashboard::app::{
    Dashboard, Dom, EventLoop, EventSink, IntervalId, Placement, RenderedContent, Skeleton,
    TemplateRegistry, UiEvent, UiEventKind,
};
use occupancy_dashboard::config::Settings;
use occupancy_dashboard::model::{
    DatasetAttrs, LocationChoices, WidgetDescriptor, WidgetId, WidgetInputs,
    EMPTY_SELECTION_VALUE,
};
use occupancy_dashboard::{DashboardError, Result};

pub const TOKEN: &str = "test-token";

// =============================================================================
// Page
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeRef(pub usize);

#[derive(Clone, Default)]
pub struct FakeNode {
    pub template: Option<&'static str>,
    pub attached: bool,
    pub dataset: DatasetAttrs,
    pub inputs: WidgetInputs,
    pub heading: Option<String>,
    pub skeleton: Option<Skeleton>,
    pub loader_visible: bool,
    pub content: Option<RenderedContent>,
    /// Location select entries as (value, label).
    pub options: Vec<(String, String)>,
    pub dragging: bool,
    pub scrolled: bool,
    pub sink: Option<(WidgetId, EventSink)>,
}

#[derive(Default)]
struct Page {
    nodes: Vec<FakeNode>,
    /// Widget nodes in the content container, top to bottom.
    container: Vec<NodeRef>,
    broken_skeletons: bool,
    missing_templates: HashSet<&'static str>,
    confirm_answer: bool,
    confirm_prompts: Vec<String>,
    opened: Vec<String>,
}

pub struct FakeDom {
    page: RefCell<Page>,
}

impl Default for FakeDom {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDom {
    pub fn new() -> Self {
        Self {
            page: RefCell::new(Page {
                confirm_answer: true,
                ..Page::default()
            }),
        }
    }

    fn push_node(&self, node: FakeNode) -> NodeRef {
        let mut page = self.page.borrow_mut();
        page.nodes.push(node);
        NodeRef(page.nodes.len() - 1)
    }

    /// Add a server-rendered widget node at the bottom of the container.
    ///
    /// A preselected location comes with a matching select option, as the
    /// server renders it.
    pub fn add_server_widget(&self, id: &str, codes: [&str; 3], order: usize, inputs: WidgetInputs) -> NodeRef {
        let options = inputs
            .selected_location
            .iter()
            .map(|value| (value.clone(), format!("Location {}", value)))
            .collect();
        let node = self.push_node(FakeNode {
            options,
            attached: true,
            dataset: DatasetAttrs {
                id: Some(id.to_string()),
                location: Some(codes[0].to_string()),
                theme: Some(codes[1].to_string()),
                time: Some(codes[2].to_string()),
                order: Some(order.to_string()),
            },
            inputs,
            ..FakeNode::default()
        });
        self.page.borrow_mut().container.push(node);
        node
    }

    pub fn remove_template(&self, selector: &'static str) {
        self.page.borrow_mut().missing_templates.insert(selector);
    }

    /// Make every skeleton mount fail, as if the content-view template
    /// lacked its data container.
    pub fn break_skeletons(&self) {
        self.page.borrow_mut().broken_skeletons = true;
    }

    pub fn answer_confirm(&self, answer: bool) {
        self.page.borrow_mut().confirm_answer = answer;
    }

    pub fn confirm_prompts(&self) -> Vec<String> {
        self.page.borrow().confirm_prompts.clone()
    }

    pub fn opened_tabs(&self) -> Vec<String> {
        self.page.borrow().opened.clone()
    }

    pub fn node(&self, node: NodeRef) -> FakeNode {
        self.page.borrow().nodes[node.0].clone()
    }

    pub fn set_inputs(&self, node: NodeRef, inputs: WidgetInputs) {
        self.page.borrow_mut().nodes[node.0].inputs = inputs;
    }

    /// Widget ids in container order, as the user sees them.
    pub fn page_ids(&self) -> Vec<String> {
        let page = self.page.borrow();
        page.container
            .iter()
            .map(|n| page.nodes[n.0].dataset.id.clone().unwrap_or_default())
            .collect()
    }

    /// `data-order` of the container's nodes, top to bottom.
    pub fn page_orders(&self) -> Vec<String> {
        let page = self.page.borrow();
        page.container
            .iter()
            .map(|n| page.nodes[n.0].dataset.order.clone().unwrap_or_default())
            .collect()
    }

    pub fn node_of(&self, id: &str) -> Option<NodeRef> {
        let page = self.page.borrow();
        page.container
            .iter()
            .copied()
            .find(|n| page.nodes[n.0].dataset.id.as_deref() == Some(id))
    }

    /// Dispatch a user interaction the way the browser listeners would.
    pub fn fire(&self, node: NodeRef, kind: UiEventKind) {
        // Clone out first: the sink re-enters the page.
        let bound = self.page.borrow().nodes[node.0].sink.clone();
        if let Some((id, sink)) = bound {
            sink(UiEvent::new(id, kind));
        }
    }
}

impl Dom for FakeDom {
    type Node = NodeRef;

    fn existing_widget_nodes(&self) -> Vec<NodeRef> {
        self.page.borrow().container.clone()
    }

    fn find_template(&self, selector: &'static str) -> Option<NodeRef> {
        if self.page.borrow().missing_templates.contains(selector) {
            return None;
        }
        Some(self.push_node(FakeNode {
            template: Some(selector),
            ..FakeNode::default()
        }))
    }

    fn read_dataset(&self, node: &NodeRef) -> DatasetAttrs {
        self.page.borrow().nodes[node.0].dataset.clone()
    }

    fn read_inputs(&self, node: &NodeRef) -> WidgetInputs {
        self.page.borrow().nodes[node.0].inputs.clone()
    }

    fn create_widget_node(
        &self,
        _templates: &TemplateRegistry<NodeRef>,
        descriptor: &WidgetDescriptor,
    ) -> Result<NodeRef> {
        let node = self.push_node(FakeNode {
            attached: true,
            dataset: DatasetAttrs {
                id: Some(descriptor.id.to_string()),
                location: Some(descriptor.location.code().to_string()),
                theme: Some(descriptor.theme.code().to_string()),
                time: Some(descriptor.time_mode.code().to_string()),
                order: Some(descriptor.order.to_string()),
            },
            inputs: WidgetInputs {
                selected_location: descriptor.selected_location.as_ref().map(|l| l.to_string()),
                time: descriptor.time.clone(),
                end_time: descriptor.end_time.clone(),
            },
            ..FakeNode::default()
        });
        self.page.borrow_mut().container.push(node);
        Ok(node)
    }

    fn scroll_into_view(&self, node: &NodeRef) {
        self.page.borrow_mut().nodes[node.0].scrolled = true;
    }

    fn set_heading(&self, node: &NodeRef, heading: &str) {
        self.page.borrow_mut().nodes[node.0].heading = Some(heading.to_string());
    }

    fn mount_skeleton(
        &self,
        node: &NodeRef,
        _templates: &TemplateRegistry<NodeRef>,
        skeleton: Skeleton,
    ) -> Result<()> {
        let mut page = self.page.borrow_mut();
        if page.broken_skeletons {
            return Err(DashboardError::MissingTemplate(".content-view-data-div"));
        }
        page.nodes[node.0].skeleton = Some(skeleton);
        Ok(())
    }

    fn set_loader_visible(&self, node: &NodeRef, visible: bool) {
        self.page.borrow_mut().nodes[node.0].loader_visible = visible;
    }

    fn clear_content(&self, node: &NodeRef) {
        self.page.borrow_mut().nodes[node.0].content = None;
    }

    fn show_content(
        &self,
        node: &NodeRef,
        _templates: &TemplateRegistry<NodeRef>,
        content: &RenderedContent,
    ) -> Result<()> {
        self.page.borrow_mut().nodes[node.0].content = Some(content.clone());
        Ok(())
    }

    fn populate_location_select(&self, node: &NodeRef, choices: Option<&LocationChoices>) {
        let mut page = self.page.borrow_mut();
        let node = &mut page.nodes[node.0];
        if let Some(choices) = choices {
            node.options = choices
                .options
                .iter()
                .map(|o| (o.id.to_string(), o.name.clone()))
                .collect();
            node.inputs.selected_location = choices
                .selected
                .as_ref()
                .map(|l| l.to_string())
                .or_else(|| node.options.first().map(|(value, _)| value.clone()));
        }
        if node.options.is_empty() {
            node.options
                .push((EMPTY_SELECTION_VALUE.to_string(), "-- leer --".to_string()));
            node.inputs.selected_location = Some(EMPTY_SELECTION_VALUE.to_string());
        }
    }

    fn write_time_inputs(&self, node: &NodeRef, time: Option<&str>, end_time: Option<&str>) {
        let mut page = self.page.borrow_mut();
        let inputs = &mut page.nodes[node.0].inputs;
        if let Some(time) = time {
            inputs.time = Some(time.to_string());
        }
        if let Some(end_time) = end_time {
            inputs.end_time = Some(end_time.to_string());
        }
    }

    fn set_order_attr(&self, node: &NodeRef, order: usize) {
        self.page.borrow_mut().nodes[node.0].dataset.order = Some(order.to_string());
    }

    fn is_attached(&self, node: &NodeRef) -> bool {
        self.page.borrow().nodes[node.0].attached
    }

    fn remove_node(&self, node: &NodeRef) {
        let mut page = self.page.borrow_mut();
        page.container.retain(|n| n != node);
        let removed = &mut page.nodes[node.0];
        removed.attached = false;
        removed.sink = None;
    }

    fn move_node(&self, node: &NodeRef, anchor: &NodeRef, placement: Placement) {
        let mut page = self.page.borrow_mut();
        page.container.retain(|n| n != node);
        let Some(at) = page.container.iter().position(|n| n == anchor) else {
            panic!("anchor {:?} is not in the container", anchor);
        };
        let at = match placement {
            Placement::Before => at,
            Placement::After => at + 1,
        };
        page.container.insert(at, *node);
    }

    fn bind_events(&self, node: &NodeRef, widget: &WidgetId, sink: EventSink) {
        self.page.borrow_mut().nodes[node.0].sink = Some((widget.clone(), sink));
    }

    fn set_dragging(&self, node: &NodeRef, dragging: bool) {
        self.page.borrow_mut().nodes[node.0].dragging = dragging;
    }

    fn confirm(&self, message: &str) -> bool {
        let mut page = self.page.borrow_mut();
        page.confirm_prompts.push(message.to_string());
        page.confirm_answer
    }

    fn open_in_new_tab(&self, url: &str) {
        self.page.borrow_mut().opened.push(url.to_string());
    }
}

// =============================================================================
// Event loop
// =============================================================================

struct Interval {
    period: Duration,
    due: Duration,
    callback: Option<Box<dyn FnMut()>>,
}

pub struct ManualEventLoop {
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
    now: Cell<Duration>,
    next_id: Cell<u64>,
    intervals: RefCell<BTreeMap<u64, Interval>>,
    created: Cell<usize>,
    cancelled: Cell<usize>,
}

impl Default for ManualEventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualEventLoop {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            pool: RefCell::new(pool),
            spawner,
            now: Cell::new(Duration::ZERO),
            next_id: Cell::new(1),
            intervals: RefCell::new(BTreeMap::new()),
            created: Cell::new(0),
            cancelled: Cell::new(0),
        }
    }

    /// Run every task until none can make progress.
    pub fn settle(&self) {
        self.pool.borrow_mut().run_until_stalled();
    }

    /// Move the clock forward, firing due intervals in time order.
    pub fn advance(&self, by: Duration) {
        let target = self.now.get() + by;
        loop {
            let next = self
                .intervals
                .borrow()
                .iter()
                .filter(|(_, i)| i.due <= target)
                .min_by_key(|(_, i)| i.due)
                .map(|(id, i)| (*id, i.due));
            let Some((id, due)) = next else {
                break;
            };
            self.now.set(due);

            // Take the callback out so it may clear or set intervals itself.
            let callback = self
                .intervals
                .borrow_mut()
                .get_mut(&id)
                .and_then(|i| i.callback.take());
            let Some(mut callback) = callback else {
                break;
            };
            callback();
            if let Some(interval) = self.intervals.borrow_mut().get_mut(&id) {
                interval.due += interval.period;
                interval.callback = Some(callback);
            }
            self.settle();
        }
        self.now.set(target);
        self.settle();
    }

    pub fn intervals_created(&self) -> usize {
        self.created.get()
    }

    pub fn intervals_cancelled(&self) -> usize {
        self.cancelled.get()
    }

    pub fn active_intervals(&self) -> usize {
        self.intervals.borrow().len()
    }
}

impl EventLoop for ManualEventLoop {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        self.spawner.spawn_local(task).expect("pool is alive");
    }

    fn set_interval(&self, period: Duration, callback: Box<dyn FnMut()>) -> IntervalId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.intervals.borrow_mut().insert(
            id,
            Interval {
                period,
                due: self.now.get() + period,
                callback: Some(callback),
            },
        );
        self.created.set(self.created.get() + 1);
        IntervalId(id)
    }

    fn clear_interval(&self, id: IntervalId) {
        let removed = self.intervals.borrow_mut().remove(&id.0);
        if removed.is_some() {
            self.cancelled.set(self.cancelled.get() + 1);
        }
    }
}

// =============================================================================
// Server
// =============================================================================

pub enum Reply {
    Now(HttpResponse),
    Later(oneshot::Receiver<HttpResponse>),
    Fail(DashboardError),
}

pub fn ok_json(value: Value) -> Reply {
    Reply::Now(HttpResponse::new(200, value.to_string()))
}

pub fn status(code: u16) -> Reply {
    Reply::Now(HttpResponse::new(code, ""))
}

type Responder = Box<dyn FnMut(&HttpRequest) -> Reply>;

pub struct ScriptedHttp {
    requests: RefCell<Vec<HttpRequest>>,
    responder: RefCell<Responder>,
}

impl ScriptedHttp {
    pub fn new(responder: impl FnMut(&HttpRequest) -> Reply + 'static) -> Self {
        Self {
            requests: RefCell::new(Vec::new()),
            responder: RefCell::new(Box::new(responder)),
        }
    }

    /// Answers every call with an empty success; data fetches get `data: []`.
    pub fn accepting() -> Self {
        Self::new(|request| {
            if request.url.contains("/get_data/") {
                ok_json(json!({ "data": [] }))
            } else {
                status(200)
            }
        })
    }

    pub fn respond_with(&self, responder: impl FnMut(&HttpRequest) -> Reply + 'static) {
        *self.responder.borrow_mut() = Box::new(responder);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<HttpRequest> {
        self.requests
            .borrow()
            .iter()
            .filter(|r| r.method == method && r.url.contains(path))
            .cloned()
            .collect()
    }

    pub fn data_fetches(&self) -> Vec<HttpRequest> {
        self.requests_to(Method::Get, "/get_data/")
    }
}

#[async_trait(?Send)]
impl HttpClient for ScriptedHttp {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.borrow_mut().push(request.clone());
        let reply = {
            let mut responder = self.responder.borrow_mut();
            (&mut **responder)(&request)
        };
        match reply {
            Reply::Now(response) => Ok(response),
            Reply::Later(rx) => rx
                .await
                .map_err(|_| DashboardError::network(&request.url, "request aborted")),
            Reply::Fail(e) => Err(e),
        }
    }
}

// =============================================================================
// Wiring
// =============================================================================

pub struct Harness {
    pub dashboard: Dashboard<FakeDom>,
    pub event_loop: Rc<ManualEventLoop>,
    pub http: Rc<ScriptedHttp>,
}

impl Harness {
    pub fn new(dom: FakeDom, http: ScriptedHttp) -> Self {
        Self::with_settings(dom, http, Settings::default())
    }

    pub fn with_settings(dom: FakeDom, http: ScriptedHttp, settings: Settings) -> Self {
        let http = Rc::new(http);
        let event_loop = Rc::new(ManualEventLoop::new());
        let csrf = CsrfToken::from_value(Some(TOKEN.to_string()), &settings.csrf_field).unwrap();
        let api = DataAccess::new(http.clone(), "http://dashboard.test", settings.csrf_header.clone(), csrf);
        let dashboard = Dashboard::new(dom, api, event_loop.clone(), settings).unwrap();
        Self {
            dashboard,
            event_loop,
            http,
        }
    }

    pub fn dom(&self) -> &FakeDom {
        &self.dashboard.context().dom
    }

    pub fn settle(&self) {
        self.event_loop.settle();
    }

    pub fn ids(&self) -> Vec<String> {
        self.dashboard
            .widgets()
            .iter()
            .map(|w| w.id().to_string())
            .collect()
    }
}

pub fn inputs(selected: Option<&str>, time: Option<&str>, end_time: Option<&str>) -> WidgetInputs {
    WidgetInputs {
        selected_location: selected.map(str::to_string),
        time: time.map(str::to_string),
        end_time: end_time.map(str::to_string),
    }
}

/// Query parameter `name` of a recorded request URL.
pub fn query_param(request: &HttpRequest, name: &str) -> Option<String> {
    let url = url::Url::parse(&request.url).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Creation response for a fresh widget.
pub fn created(id: u64, codes: [&str; 3], order: usize) -> Value {
    json!({
        "data_representation": {
            "location_type": codes[0],
            "theme_type": codes[1],
            "time_type": codes[2]
        },
        "user_data_representation": {
            "id": id,
            "order": order,
            "time": null,
            "end_time": null,
            "ward": null,
            "room": null
        }
    })
}
