//! Siteflow: construction-site task review.
//!
//! A worker performs a task, a foreman reviews it, and a project manager
//! gives final sign-off, with rework loops at each stage. This crate holds
//! the lifecycle rules: which status a task may move to, who may trigger the
//! move, which checklist and photo evidence must be present, and how
//! decisions are recorded.
//!
//! # Architecture
//!
//! Siteflow follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for persistence and photo storage
//! - **Adapters**: In-memory implementations of the ports
//!
//! # Modules
//!
//! - [`task`]: Checklist, transition table, approval ledger and review service
//! - [`config`]: Layered configuration
//! - [`telemetry`]: Tracing subscriber installation

pub mod config;
pub mod task;
pub mod telemetry;
