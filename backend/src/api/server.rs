//! HTTP server for the passboard API.
//!
//! Serves JSON only: reshaped records, extracted outlets and dashboard
//! view models. Drawing them is up to the client.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                              |
//! |--------|-------------------|------------------------------------------|
//! | GET    | `/health`         | Health check                             |
//! | GET    | `/api/datasets`   | Built-in datasets                        |
//! | GET    | `/api/view`       | View model (`dataset`, `region`, `dropZero`) |
//! | POST   | `/api/tidy`       | Upload a wide CSV, get long records      |
//! | POST   | `/api/extract`    | Upload a staggered CSV, get outlet rows  |
//! | GET    | `/api/logs`       | SSE stream for real-time logs            |

use axum::{
    extract::{Multipart, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, log_success, LOG_BROADCASTER};
use super::types::{error_response, DatasetSummary, ExtractResponse, TidyResponse, ViewQuery};
use crate::cache::{shared_state, LayoutRegistry};
use crate::config::Config;
use crate::datasets::{render, Dataset, ViewModel};
use crate::error::{PipelineError, RegistryError, ServerError, ServerResult};
use crate::parser::parse_grid_bytes_auto;
use crate::transform::pipeline::{extract_bytes, reshape_bytes, LayoutSource, ReshapeOptions};
use crate::validation::parse_layout;

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    pub data_dir: Option<PathBuf>,
    pub layout_dir: PathBuf,
}

impl From<&Config> for AppState {
    fn from(config: &Config) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            layout_dir: config.layout_dir.clone(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Pipeline(PipelineError::Registry(RegistryError::NotFound(_))) => {
                StatusCode::NOT_FOUND
            }
            ServerError::Pipeline(PipelineError::Registry(RegistryError::IoError(_))) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServerError::Pipeline(_) => StatusCode::BAD_REQUEST,
        };
        log_error(self.to_string());
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

/// Build the router; split out so handlers can be exercised without a socket.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/datasets", get(datasets))
        .route("/api/view", get(view))
        .route("/api/tidy", post(tidy_csv))
        .route("/api/extract", post(extract_csv))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Start the HTTP server
pub async fn start_server(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    // Parse the datasets up front so a broken data dir fails at startup.
    shared_state(config.data_dir.as_deref())?;

    let app = router(AppState::from(config));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    eprintln!("🚀 Passboard server running on http://localhost:{}", config.port);
    eprintln!("   GET  /api/datasets - Built-in datasets");
    eprintln!("   GET  /api/view     - Dashboard view model");
    eprintln!("   POST /api/tidy     - Upload wide CSV");
    eprintln!("   POST /api/extract  - Upload staggered CSV");
    eprintln!("   GET  /api/logs     - SSE log stream");
    eprintln!("   GET  /health       - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "passboard",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "datasets": "GET /api/datasets",
            "view": "GET /api/view",
            "tidy": "POST /api/tidy",
            "extract": "POST /api/extract",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn datasets() -> Json<Vec<DatasetSummary>> {
    Json(Dataset::ALL.into_iter().map(DatasetSummary::from).collect())
}

async fn view(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> ServerResult<Json<ViewModel>> {
    let filters = query.into_filters()?;
    let dashboard = shared_state(state.data_dir.as_deref())?;
    Ok(Json(render(&dashboard, &filters)?))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        // Lagged receivers skip what they missed.
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Multipart form fields shared by the upload endpoints.
#[derive(Debug, Default)]
struct Upload {
    file_name: Option<String>,
    bytes: Option<Vec<u8>>,
    fields: Vec<(String, String)>,
}

impl Upload {
    async fn read(mut multipart: Multipart) -> ServerResult<Self> {
        let mut upload = Upload::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name == "file" {
                upload.file_name = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                upload.bytes = Some(bytes.to_vec());
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                upload.fields.push((name, text));
            }
        }

        Ok(upload)
    }

    fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }

    fn take_bytes(&mut self) -> ServerResult<Vec<u8>> {
        let bytes = self
            .bytes
            .take()
            .ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;
        log_info(format!(
            "📄 Upload: {} ({} bytes)",
            self.file_name.as_deref().unwrap_or("unknown"),
            bytes.len()
        ));
        Ok(bytes)
    }
}

/// Upload a wide CSV; optional `options` field holds reshape options as JSON.
async fn tidy_csv(multipart: Multipart) -> ServerResult<Json<TidyResponse>> {
    let mut upload = Upload::read(multipart).await?;
    let bytes = upload.take_bytes()?;

    let options = match upload.field("options") {
        Some(raw) => serde_json::from_str::<ReshapeOptions>(raw)
            .map_err(|e| ServerError::BadRequest(format!("Invalid options: {}", e)))?,
        None => ReshapeOptions::compound(),
    };

    let result = reshape_bytes(&bytes, &options)?;
    log_success(format!("{} long records", result.records.len()));
    Ok(Json(TidyResponse::from(result)))
}

/// Upload a staggered CSV.
///
/// The layout comes from a `layout` field (JSON), a `layoutId` from the
/// registry, the best compatible registry layout, or header detection, in
/// that order.
async fn extract_csv(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ServerResult<Json<ExtractResponse>> {
    let mut upload = Upload::read(multipart).await?;
    let bytes = upload.take_bytes()?;
    let mut registry = LayoutRegistry::with_dir(&state.layout_dir);

    let (source, layout_id) = if let Some(raw) = upload.field("layout") {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ServerError::BadRequest(format!("Invalid layout: {}", e)))?;
        let layout = parse_layout(&value).map_err(PipelineError::from)?;
        (LayoutSource::Fixed { layout }, None)
    } else if let Some(id) = upload.field("layoutId") {
        let stored = registry.get(id).map_err(PipelineError::from)?;
        let source = LayoutSource::Fixed {
            layout: stored.layout.clone(),
        };
        (source, Some(id.to_string()))
    } else {
        let grid = parse_grid_bytes_auto(&bytes).map_err(PipelineError::from)?.grid;
        let best = registry
            .find_compatible(&grid)
            .first()
            .map(|(stored, score)| ((*stored).clone(), *score));
        match best {
            Some((stored, score)) => {
                log_info(format!(
                    "♻️  Using stored layout '{}' ({:.0}% match)",
                    stored.name,
                    score * 100.0
                ));
                (LayoutSource::Fixed { layout: stored.layout }, Some(stored.id))
            }
            None => (LayoutSource::default(), None),
        }
    };

    let result = extract_bytes(&bytes, &source)?;
    if let Some(id) = &layout_id {
        registry.record_use(id).map_err(PipelineError::from)?;
    }

    Ok(Json(ExtractResponse::new(result, layout_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> Arc<AppState> {
        LOG_BROADCASTER.set_echo(false);
        Arc::new(AppState {
            data_dir: None,
            layout_dir: std::env::temp_dir().join("passboard-server-tests"),
        })
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "passboard");
    }

    #[tokio::test]
    async fn test_datasets_lists_all() {
        let Json(list) = datasets().await;
        assert_eq!(list.len(), 4);
        assert_eq!(list[3].id, "outlets-by-region");
    }

    #[tokio::test]
    async fn test_view_regional_filtered() {
        let query = ViewQuery {
            dataset: Some("regional".into()),
            region: Some("Sabah".into()),
            drop_zero: false,
        };
        let Json(model) = view(State(state()), Query(query)).await.unwrap();
        assert_eq!(model.table.len(), 1);
        assert_eq!(model.kpis.total_volume, 50);
    }

    #[tokio::test]
    async fn test_view_unknown_dataset_is_bad_request() {
        let query = ViewQuery {
            dataset: Some("sales".into()),
            ..ViewQuery::default()
        };
        let err = view(State(state()), Query(query)).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_statuses() {
        let not_found = ServerError::from(PipelineError::from(RegistryError::NotFound("x".into())));
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let internal = ServerError::Internal("disk".into());
        assert_eq!(internal.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
