//! # AREA Blueprint Library
//!
//! Graph reconciliation engine behind the AREA blueprint editor: backend
//! client, per-service trigger adapters, and the projection/store/orchestrator
//! pipeline that keeps the editor graph in step with the server.

pub mod blueprint;
pub mod client;
pub mod config;
pub mod connectors;
pub mod error;
pub mod models;
pub mod telemetry;

pub use client::ApiClient;
pub use error::{BlueprintError, RemoteError};
