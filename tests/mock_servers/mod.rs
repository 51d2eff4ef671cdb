//! Mock servers for contract testing
//!
//! Simulates the dashboard backend so the native client can be exercised
//! over real HTTP without a deployment.

pub mod dashboard;

pub use dashboard::MockDashboardServer;
