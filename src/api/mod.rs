//! API Module
//!
//! HTTP handlers and routing: the thin shell that exposes the blob cache and
//! the event stream as independent resources.
//!
//! # Endpoints
//! - `PUT /cache` - Upload a blob
//! - `GET /cache` - Fetch a blob
//! - `GET /ts` - Batch write timestamps
//! - `GET /sse` - Live event stream
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
