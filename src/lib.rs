//! Client library for the OpsDesk back-office REST API.
//!
//! The core is a resource cache layer between callers and the backend:
//! [`api::HttpClient`] performs single requests and unwraps the server
//! envelope, [`cache::QueryCache`] deduplicates reads and tracks
//! staleness, and [`api::CachedApiClient`] ties the two together with
//! mutation reconciliation. [`query::Query`] exposes one read's lifecycle
//! as a poll-based state machine for interactive frontends.

pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod query;
