//! dominion-api: HTTP API layer
//!
//! This crate provides the API layer including:
//! - HTTP REST endpoints via Axum
//! - Middleware (request ids, logging, CORS)
//! - Observability (structured logging, Prometheus metrics)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               dominion-api                   │
//! ├─────────────────────────────────────────────┤
//! │  http/          - HTTP REST endpoints       │
//! │  adapters.rs    - Storage-backed auth       │
//! │  middleware/    - Request ids, logging      │
//! │  observability/ - Logging, metrics          │
//! └─────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod http;
pub mod middleware;
pub mod observability;
