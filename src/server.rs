//! HTTP surface of the service.
//!
//! One route does the work: `POST /optimize` takes a multipart upload with
//! the pack zip and optional tuning fields, runs the pipeline, and answers
//! with the optimized archive plus a JSON statistics header. Everything
//! else is glue: permissive CORS for browser callers, a 405 for stray
//! methods, and a health probe.

use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::optimize::{DeviceMode, OutputFormat, ProcessingOptions, optimize_archive};

/// Hard ceiling on upload size, enforced before any processing begins.
pub const MAX_UPLOAD_BYTES: usize = 150 * 1024 * 1024;

/// Response header carrying the serialized statistics object.
pub const STATS_HEADER: &str = "x-optimization-stats";

#[derive(Clone)]
struct AppState {
    /// Production mode strips error details from 500 bodies.
    production: bool,
}

#[derive(Debug, Error)]
enum UploadError {
    #[error("No file uploaded")]
    MissingFile,
    #[error("File too large")]
    TooLarge,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Build the service router.
pub fn router(production: bool) -> Router {
    router_with_limit(production, MAX_UPLOAD_BYTES)
}

fn router_with_limit(production: bool, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(
            "/optimize",
            post(optimize_handler).fallback(method_not_allowed),
        )
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(AppState { production })
}

/// Bind and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, production: bool) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("packpress listening on {}", addr);
    axum::serve(listener, router(production).into_make_service()).await?;
    Ok(())
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
        .into_response()
}

async fn optimize_handler(State(state): State<AppState>, multipart: Multipart) -> Response {
    match handle_upload(multipart).await {
        Ok(response) => response,
        Err(UploadError::MissingFile) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No file uploaded" })),
        )
            .into_response(),
        Err(UploadError::TooLarge) => (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(json!({
                "error": "File too large",
                "suggestion": "Uploads are limited to 150 MB",
            })),
        )
            .into_response(),
        Err(UploadError::Internal(e)) => {
            error!(error = ?e, "request failed");
            internal_error_response(&e, state.production)
        }
    }
}

/// Parse the multipart body, run the pipeline, build the archive response.
async fn handle_upload(mut multipart: Multipart) -> Result<Response, UploadError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut options = ProcessingOptions::default();

    while let Some(field) = multipart.next_field().await.map_err(from_multipart)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "file" {
            let file_name = field.file_name().unwrap_or("pack.zip").to_string();
            let data = field.bytes().await.map_err(from_multipart)?;
            upload = Some((file_name, data.to_vec()));
            continue;
        }

        // Text fields; anything unparseable keeps its default.
        let text = field.text().await.map_err(from_multipart)?;
        match name.as_str() {
            "resolution" => {
                if let Ok(v) = text.trim().parse::<u32>() {
                    if v > 0 {
                        options.target_resolution = v;
                    }
                }
            }
            "quality" => {
                if let Ok(v) = text.trim().parse::<u8>() {
                    if (1..=100).contains(&v) {
                        options.quality = v;
                    }
                }
            }
            "format" => options.output_format = OutputFormat::parse(&text),
            "aggressive" => options.aggressive = text == "true",
            "deviceMode" => options.device_mode = DeviceMode::parse(&text),
            _ => {}
        }
    }

    let (file_name, data) = upload.ok_or(UploadError::MissingFile)?;
    let result = optimize_archive(data, &options).await?;

    let size_mb = result.stats.final_zip_size as f64 / (1024.0 * 1024.0);
    let base = file_name.strip_suffix(".zip").unwrap_or(&file_name);
    let disposition = format!("attachment; filename=\"{base}-optimized-{size_mb:.2}mb.zip\"");
    let stats_json = serde_json::to_string(&result.stats).map_err(as_internal)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (HeaderName::from_static(STATS_HEADER), stats_json),
        ],
        result.archive,
    )
        .into_response())
}

fn as_internal<E: std::error::Error + Send + Sync + 'static>(e: E) -> UploadError {
    UploadError::Internal(anyhow::Error::new(e))
}

/// A multipart error is either the body-limit layer tripping (surface the
/// 413 it implies) or a genuine parse failure.
fn from_multipart(e: axum::extract::multipart::MultipartError) -> UploadError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge
    } else {
        UploadError::Internal(anyhow::Error::new(e))
    }
}

/// Map a fatal error onto one of the canned user-facing hints.
///
/// Matching is by substring on the full error chain; the default is the
/// generic "failed to process" message.
fn error_hint(message: &str) -> (&'static str, &'static str) {
    let lower = message.to_lowercase();
    if lower.contains("image") || lower.contains("decode") {
        (
            "Image processing failed",
            "Try a lower resolution or enable aggressive mode",
        )
    } else if lower.contains("timeout") {
        (
            "Processing took too long",
            "Try a smaller pack or a lower resolution",
        )
    } else if lower.contains("memory") {
        ("Server ran out of memory", "Try a smaller pack")
    } else if lower.contains("invalid") || lower.contains("zip") {
        (
            "Invalid resource pack archive",
            "Make sure the upload is a valid .zip resource pack",
        )
    } else {
        (
            "Failed to process resource pack",
            "Try lowering resolution or quality, or enable aggressive mode",
        )
    }
}

fn internal_error_response(e: &anyhow::Error, production: bool) -> Response {
    let chain = format!("{e:#}");
    let (message, suggestion) = error_hint(&chain);

    let mut body = json!({
        "error": message,
        "suggestion": suggestion,
    });
    if !production {
        body["details"] = json!({ "message": chain });
    }

    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
