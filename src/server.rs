//! HTTP surface: PDF generation and the remembered-defaults document.

use crate::error::{ActaError, ErrorKind};
use crate::record::Record;
use crate::renderer::OverlayRenderer;
use crate::report::ReportType;
use crate::store::{MemoryDocument, RecordStore, StoreError};
use crate::template::TemplateSource;
use axum::{
    Json, Router,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;

pub type SharedRenderer = OverlayRenderer<Box<dyn TemplateSource>>;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    renderer: Arc<SharedRenderer>,
    store: Arc<dyn RecordStore>,
}

impl AppState {
    pub fn new(renderer: SharedRenderer, store: Arc<dyn RecordStore>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                renderer: Arc::new(renderer),
                store,
            }),
        }
    }

    pub fn renderer(&self) -> &Arc<SharedRenderer> {
        &self.inner.renderer
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.inner.store
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Render(#[from] ActaError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("background task failed: {0}")]
    Task(String),

    /// Body that did not deserialize; `public` is the message clients see.
    #[error("rejected request body: {detail}")]
    Body {
        public: &'static str,
        detail: String,
    },
}

const GENERATE_FAILED: &str = "Failed to generate PDF";
const SAVE_FAILED: &str = "Failed to save data";

impl ApiError {
    fn body(public: &'static str, rejection: JsonRejection) -> Self {
        ApiError::Body {
            public,
            detail: rejection.body_text(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Render(err) => match err.kind() {
                ErrorKind::TemplateNotFound | ErrorKind::Configuration => {
                    tracing::warn!(error = %err, "report unavailable");
                    (StatusCode::NOT_FOUND, not_found_message(err))
                }
                ErrorKind::RenderFailure => {
                    tracing::error!(error = %err, stage = ?err.stage(), "pdf generation failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, GENERATE_FAILED.to_string())
                }
            },
            ApiError::Task(msg) => {
                tracing::error!("render task failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, GENERATE_FAILED.to_string())
            }
            ApiError::Body { public, detail } => {
                tracing::warn!(%detail, "request body rejected");
                (StatusCode::INTERNAL_SERVER_ERROR, public.to_string())
            }
            ApiError::Store(err) => {
                tracing::error!(error = %err, "store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to access stored data".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

fn not_found_message(err: &ActaError) -> String {
    match err {
        ActaError::TemplateNotFound { name, .. } => format!("Template not found: {name}"),
        ActaError::TemplateDigestMismatch { report_type, .. } => {
            format!("Template misconfigured: {report_type}")
        }
        other => other.to_string(),
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/pdf/generate", post(generate_pdf))
        .route("/api/data", get(get_data).post(put_data))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub data: Record,
    #[serde(default, rename = "reportType")]
    pub report_type: Option<String>,
}

async fn generate_pdf(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::body(GENERATE_FAILED, rejection))?;
    let report_type = match request.report_type.as_deref() {
        Some(name) => name.parse::<ReportType>()?,
        None => ReportType::Reception,
    };

    let renderer = Arc::clone(state.renderer());
    let record = request.data;
    let bytes = tokio::task::spawn_blocking(move || renderer.render(&record, report_type))
        .await
        .map_err(|err| ApiError::Task(err.to_string()))??;

    let filename = report_type.attachment_filename(chrono::Utc::now().timestamp_millis());
    tracing::info!(report = %report_type, bytes = bytes.len(), "acta generated");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(bytes))
        .map_err(|err| ApiError::Task(err.to_string()))
}

async fn get_data(State(state): State<AppState>) -> Result<Json<MemoryDocument>, ApiError> {
    let store = Arc::clone(state.store());
    let document = tokio::task::spawn_blocking(move || store.get())
        .await
        .map_err(|err| ApiError::Task(err.to_string()))??;
    Ok(Json(document))
}

#[derive(Serialize)]
struct SaveResponse {
    success: bool,
    mode: &'static str,
}

async fn put_data(
    State(state): State<AppState>,
    payload: Result<Json<MemoryDocument>, JsonRejection>,
) -> Result<Json<SaveResponse>, ApiError> {
    let Json(document) = payload.map_err(|rejection| ApiError::body(SAVE_FAILED, rejection))?;
    let store = Arc::clone(state.store());
    let mode = store.mode();
    tokio::task::spawn_blocking(move || store.put(&document))
        .await
        .map_err(|err| ApiError::Task(err.to_string()))??;
    Ok(Json(SaveResponse {
        success: true,
        mode,
    }))
}
