//! Occupancy Dashboard - client engine
//!
//! Drives the widgets ("content views") of the hospital occupancy dashboard:
//! each widget shows bed, room or ward occupancy at a point in time, over a
//! period, or as a near-time snapshot refreshed every few minutes.
//!
//! This library provides:
//! - Wire types and the catalog of offered representations
//! - Data access for the dashboard's JSON API (create, delete, reorder, fetch)
//! - The widget lifecycle and drag-and-drop ordering engine
//! - Browser bindings (web-sys, Chart.js) when built for `wasm32`

pub mod api;
pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod model;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use error::{DashboardError, Result};

/// Release version, stamped by the build script.
pub const VERSION: &str = env!("DASHBOARD_VERSION");

/// Short commit hash of the build, or `unknown`.
pub const GIT_SHA: &str = env!("DASHBOARD_GIT_SHA");
