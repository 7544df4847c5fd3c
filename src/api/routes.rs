//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    get_handler, health_handler, index_handler, put_handler, sse_handler, sse_script_handler,
    stats_handler, timestamps_handler, AppState,
};

/// Allowance on top of the blob ceiling for multipart boundaries and headers
const MULTIPART_OVERHEAD: usize = 16 * 1024;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /cache` - Upload a blob (multipart `fileName` + file part)
/// - `GET /cache?fileName=` - Fetch a blob
/// - `GET /ts?fileName=&fileName=` - Batch write timestamps
/// - `GET /sse` - Live event stream
/// - `GET /stats` - Get cache statistics
/// - `GET /health` - Health check endpoint
/// - `GET /`, `GET /js/sse.js` - Demo page
///
/// # Middleware
/// - Body limit: rejects request bodies far larger than any valid upload
/// - CORS: Allows any origin (configurable for production)
/// - Compression: gzip/deflate for ordinary responses, never for the event stream
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let body_limit = state
        .cache
        .max_blob_size()
        .saturating_add(MULTIPART_OVERHEAD);

    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/js/sse.js", get(sse_script_handler))
        .route("/cache", get(get_handler).put(put_handler))
        .route("/ts", get(timestamps_handler))
        .route("/sse", get(sse_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
