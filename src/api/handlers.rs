//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        rejection::QueryRejection,
        Multipart, Query, State,
    },
    http::{header, HeaderName, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    Json,
};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tracing::{debug, info};

use crate::cache::{content_type_of, CacheStore};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::events::{EventStream, SseEvent};
use crate::models::{
    file_names, FileNameQuery, HealthResponse, PutResponse, StatsResponse, FILE_NAME_PARAM,
};

/// Interval of the comment line that keeps idle event connections open
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Application state shared across all handlers.
///
/// Both components are constructed once at startup and handed to every
/// handler through axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe blob cache
    pub cache: Arc<CacheStore>,
    /// Live event stream
    pub events: EventStream,
}

impl AppState {
    /// Creates a new AppState with the given cache store and event stream.
    pub fn new(cache: CacheStore, events: EventStream) -> Self {
        Self {
            cache: Arc::new(cache),
            events,
        }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(CacheStore::from_config(config), EventStream::new())
    }
}

/// Handler for PUT /cache
///
/// Accepts a multipart form with a `fileName` text field and one file part.
pub async fn put_handler(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<PutResponse>> {
    let mut multipart = multipart?;
    let limit = state.cache.max_blob_size();
    let mut file_name: Option<String> = None;
    let mut content: Option<Bytes> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if field.file_name().is_some() {
            content = Some(read_limited(&mut field, limit).await?);
        } else if name == FILE_NAME_PARAM {
            file_name = Some(field.text().await.map_err(|e| multipart_error(e, limit))?);
        } else {
            return Err(CacheError::InvalidArgument(format!(
                "Unknown form part: '{}'",
                name
            )));
        }
    }

    let file_name = file_name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            CacheError::InvalidArgument(format!("Missing required field '{}'", FILE_NAME_PARAM))
        })?;
    let content =
        content.ok_or_else(|| CacheError::InvalidArgument("Missing file content".to_string()))?;

    let receipt = state.cache.put(&file_name, content)?;
    info!(key = %file_name, size = receipt.size, "blob uploaded");

    Ok(Json(PutResponse::from(receipt)))
}

/// Handler for GET /cache?fileName=...
///
/// Returns the raw blob with a content type derived from the key.
pub async fn get_handler(
    State(state): State<AppState>,
    query: std::result::Result<Query<FileNameQuery>, QueryRejection>,
) -> Result<Response> {
    let Query(query) = query?;
    let key = query.key().map_err(CacheError::InvalidArgument)?;

    let content = state
        .cache
        .get(key)
        .ok_or_else(|| CacheError::NotFound(key.to_string()))?;
    debug!(key, size = content.len(), "blob served");

    Ok(([(header::CONTENT_TYPE, content_type_of(key))], content).into_response())
}

/// Handler for GET /ts?fileName=a&fileName=b
///
/// Maps each requested key to its write timestamp, or -1 when absent.
pub async fn timestamps_handler(
    State(state): State<AppState>,
    query: std::result::Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<BTreeMap<String, i64>>> {
    let Query(pairs) = query?;
    let keys = file_names(pairs).map_err(CacheError::InvalidArgument)?;
    Ok(Json(state.cache.timestamps(keys)))
}

/// Handler for GET /sse
///
/// Holds the connection open and writes each event as it is published.
/// `Sse` marks the response uncacheable; proxy buffering is switched off on
/// top so events arrive live. When the client goes away the body stream is
/// dropped, which drops the subscription and releases it.
pub async fn sse_handler(State(state): State<AppState>) -> Response {
    let events = state
        .events
        .subscribe()
        .into_stream()
        .map(|event| Ok::<_, Infallible>(to_sse_event(&event)));

    (
        [(HeaderName::from_static("x-accel-buffering"), "no")],
        Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)),
    )
        .into_response()
}

/// Converts a published event into its wire form: `id`, then `event`, then
/// one `data` line per payload line.
fn to_sse_event(event: &SseEvent) -> Event {
    let mut sse_event = Event::default();
    if let Some(id) = event.event_id() {
        sse_event = sse_event.id(id);
    }
    if let Some(event_type) = event.event_type() {
        sse_event = sse_event.event(event_type);
    }
    sse_event.data(event.normalized_data())
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.cache.stats(),
        state.events.subscriber_count(),
    ))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /
pub async fn index_handler() -> Html<&'static str> {
    Html(include_str!("../../assets/index.html"))
}

/// Handler for GET /js/sse.js
pub async fn sse_script_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript")],
        include_str!("../../assets/js/sse.js"),
    )
}

async fn read_limited(field: &mut Field<'_>, limit: usize) -> Result<Bytes> {
    let mut buffer = BytesMut::new();

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if buffer.len() + chunk.len() > limit {
            return Err(CacheError::PayloadTooLarge { limit });
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(buffer.freeze())
}

fn multipart_error(err: axum::extract::multipart::MultipartError, limit: usize) -> CacheError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        CacheError::PayloadTooLarge { limit }
    } else {
        CacheError::InvalidArgument(err.body_text())
    }
}
