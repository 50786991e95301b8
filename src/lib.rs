/// Session token stores: memory, session file, cookie.
pub mod auth;
/// HTTP client for the task API, error shape, redirect hooks.
pub mod client;
/// Layered configuration: defaults, TOML file, flags and environment.
pub mod config;
/// Reference-zone formatting and editable timestamp conversion.
pub mod datetime;
pub mod debounce;
/// Task and log form state, normalization, single-flight submit.
pub mod form;
/// Data types: Task, TaskLog, DashboardSummary, Status, payloads.
pub mod models;
/// Keyed resource cache with prefix invalidation.
pub mod store;
/// Filter/paginate controller for task tables.
pub mod table;
/// Axum-based dashboard server and router.
pub mod web;
