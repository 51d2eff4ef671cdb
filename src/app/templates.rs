//! Page templates, resolved once at startup.
//!
//! The server renders a hidden `#template-div` holding every fragment a
//! widget is built from. Looking them all up front turns a missing fragment
//! into one startup error instead of a null dereference deep inside a
//! render pass.

use crate::error::{DashboardError, Result};

pub const CONTENT_VIEW: &str = "#content-view-template";
pub const POINT_INPUT: &str = "#template-div .time-input-span.time-template";
pub const FROM_INPUT: &str = "#template-div .time-input-span.from-template";
pub const TO_INPUT: &str = "#template-div .time-input-span.to-template";
pub const LOCATION_SELECT: &str = "#template-div .selection-input";
pub const INFORMATION_CHART: &str = "#template-div .information-chart-canvas";
pub const HISTORY_CHART: &str = "#template-div .occupancy-history-chart-canvas";
pub const LOCATION_LIST_HEAD: &str = "#template-div .location-list-head-div.location-template";
pub const LOCATION_LIST: &str = "#template-div .location-list-div";
pub const LOCATION_ROW: &str = "#template-div .location-div.location-template";
pub const BED_LIST_HEAD: &str = "#template-div .location-list-head-div.bed-template";
pub const BED_ROW: &str = "#template-div .location-div.bed-template";
pub const ROOM_DATA: &str = "#template-div .room-data-div";
pub const LOADER: &str = "#template-div .loader";

/// Every selector the registry resolves, in lookup order.
pub const ALL_SELECTORS: [&str; 14] = [
    CONTENT_VIEW,
    POINT_INPUT,
    FROM_INPUT,
    TO_INPUT,
    LOCATION_SELECT,
    INFORMATION_CHART,
    HISTORY_CHART,
    LOCATION_LIST_HEAD,
    LOCATION_LIST,
    LOCATION_ROW,
    BED_LIST_HEAD,
    BED_ROW,
    ROOM_DATA,
    LOADER,
];

/// Template nodes, each to be cloned and never mutated in place.
#[derive(Clone, Debug)]
pub struct TemplateRegistry<T> {
    pub content_view: T,
    pub point_input: T,
    pub from_input: T,
    pub to_input: T,
    pub location_select: T,
    pub information_chart: T,
    pub history_chart: T,
    pub location_list_head: T,
    pub location_list: T,
    pub location_row: T,
    pub bed_list_head: T,
    pub bed_row: T,
    pub room_data: T,
    pub loader: T,
}

impl<T> TemplateRegistry<T> {
    /// Resolve every template through `lookup`, failing on the first miss.
    pub fn load<F>(mut lookup: F) -> Result<Self>
    where
        F: FnMut(&'static str) -> Option<T>,
    {
        let mut find = |selector: &'static str| {
            lookup(selector).ok_or(DashboardError::MissingTemplate(selector))
        };

        let registry = Self {
            content_view: find(CONTENT_VIEW)?,
            point_input: find(POINT_INPUT)?,
            from_input: find(FROM_INPUT)?,
            to_input: find(TO_INPUT)?,
            location_select: find(LOCATION_SELECT)?,
            information_chart: find(INFORMATION_CHART)?,
            history_chart: find(HISTORY_CHART)?,
            location_list_head: find(LOCATION_LIST_HEAD)?,
            location_list: find(LOCATION_LIST)?,
            location_row: find(LOCATION_ROW)?,
            bed_list_head: find(BED_LIST_HEAD)?,
            bed_row: find(BED_ROW)?,
            room_data: find(ROOM_DATA)?,
            loader: find(LOADER)?,
        };
        tracing::debug!("Resolved {} page templates", ALL_SELECTORS.len());
        Ok(registry)
    }
}
