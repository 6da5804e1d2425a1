//! HTTP surface for running checks from a browser or script.
//!
//! `POST /api/qc` takes a multipart form with the fields `reference` and
//! `check` (image files), `prompt` and optionally `detail`, and answers with
//! the rendered markdown.

use crate::client::QcClient;
use crate::image::{ImageBlock, ImageDetail, mime_type_for_path};
use crate::prompts::DEFAULT_QC_PROMPT;
use crate::{Error, Result};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, instrument};

/// Upper bound for a whole form; two phone photos fit comfortably.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// State shared across routes
#[derive(Clone)]
pub struct AppState {
    client: Arc<QcClient>,
}

impl AppState {
    pub fn new(client: QcClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

/// Body of a successful `/api/qc` response
#[derive(Debug, Serialize, Deserialize)]
pub struct QcResponse {
    pub markdown: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/prompt", get(|| async { DEFAULT_QC_PROMPT }))
        .route("/api/qc", post(run_check))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Binds `addr` and serves until the process is stopped.
#[instrument(skip(client))]
pub async fn serve(addr: SocketAddr, client: QcClient) -> Result<()> {
    let app = router(AppState::new(client));

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::other(format!("Failed to bind {}: {}", addr, e)))?;
    info!("QC server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::other(format!("Server error: {}", e)))
}

#[derive(Default)]
struct QcForm {
    reference: Option<ImageBlock>,
    check: Option<ImageBlock>,
    prompt: String,
    detail: Option<ImageDetail>,
}

async fn run_check(
    State(state): State<AppState>,
    multipart: Multipart,
) -> std::result::Result<Json<QcResponse>, ApiError> {
    let form = read_form(multipart).await?;
    let detail = form
        .detail
        .unwrap_or_else(|| state.client.options().detail());

    let markdown = state
        .client
        .check_quality_images(
            form.reference.map(|img| img.with_detail(detail)),
            form.check.map(|img| img.with_detail(detail)),
            &form.prompt,
        )
        .await?;

    Ok(Json(QcResponse { markdown }))
}

async fn read_form(mut multipart: Multipart) -> Result<QcForm> {
    let mut form = QcForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::invalid_input(format!("malformed form: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "reference" | "check" => {
                // Parameters such as `; name=x` are not part of the data URI
                let mime = field
                    .content_type()
                    .map(|ct| ct.split(';').next().unwrap_or_default().trim())
                    .filter(|ct| ct.starts_with("image/"))
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        mime_type_for_path(field.file_name().unwrap_or_default()).to_string()
                    });
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| Error::invalid_input(format!("failed to read {}: {}", name, e)))?;

                // An empty file part means the user left the input blank
                if bytes.is_empty() {
                    continue;
                }
                let image = ImageBlock::from_bytes(&bytes, &mime)?;
                if name == "reference" {
                    form.reference = Some(image);
                } else {
                    form.check = Some(image);
                }
            }
            "prompt" => {
                form.prompt = field
                    .text()
                    .await
                    .map_err(|e| Error::invalid_input(format!("failed to read prompt: {}", e)))?;
            }
            "detail" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| Error::invalid_input(format!("failed to read detail: {}", e)))?;
                if !raw.trim().is_empty() {
                    form.detail = Some(raw.parse()?);
                }
            }
            other => tracing::debug!("Ignoring unknown form field {:?}", other),
        }
    }

    Ok(form)
}

/// Error wrapper that renders as a JSON body with a matching status
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidInput(_) | Error::Image(_) => StatusCode::BAD_REQUEST,
            Error::Api(_) | Error::Status { .. } | Error::Http(_) | Error::Json(_) => {
                StatusCode::BAD_GATEWAY
            }
            Error::Timeout => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("QC request failed: {}", self.0);
        } else {
            tracing::warn!("QC request rejected: {}", self.0);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
