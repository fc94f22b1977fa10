//! OCR Emulator - a local stand-in for a hosted OCR API.
//!
//! Clients upload a document, ask for its URL, then request OCR on that URL
//! and get back per-page text and metadata.

mod config;
mod error;
mod extractor;
mod ocr;
mod registry;
mod schema;
mod storage;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use config::ServerConfig;
use error::ApiError;
use extractor::{ExtractOptions, Extractor};
use ocr::{pdftoppm::PdftoppmRasterizer, tesseract::TesseractRecognizer};
use registry::FileRegistry;
use schema::{FileObject, FileUrl, OcrRequest, OcrResponse};
use std::sync::Arc;
use storage::UploadStore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    registry: FileRegistry,
    uploads: UploadStore,
    extractor: Arc<Extractor>,
    default_model: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "ocr_emulator=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    info!("Loaded config: {:?}", config);

    let uploads = UploadStore::open(&config.upload_dir)?;
    info!("Storing uploads in {:?}", uploads.root());

    let extractor = Extractor::new(
        Arc::new(TesseractRecognizer::new(
            config.ocr.tesseract_bin.clone(),
            config.ocr.tesseract_lang.clone(),
        )),
        Arc::new(PdftoppmRasterizer::new(
            config.ocr.pdftoppm_bin.clone(),
            config.ocr.pdf_dpi,
        )),
        config.ocr.max_jobs,
        config.ocr.timeout,
    );
    if !extractor.recognizer().is_available().await {
        warn!("{} not found; OCR requests will fail", config.ocr.tesseract_bin);
    }
    if !extractor.rasterizer().is_available().await {
        warn!("{} not found; PDF OCR requests will fail", config.ocr.pdftoppm_bin);
    }

    let state = AppState {
        registry: FileRegistry::new(),
        uploads,
        extractor: Arc::new(extractor),
        default_model: config.default_model.clone(),
    };

    // Run server
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Server listening on http://{}", config.bind_addr);
    axum::serve(listener, app(state)).await?;

    Ok(())
}

/// Build the router.
///
/// The id in `/v1/files/:name/url` and the filename in `/v1/files/:name`
/// share a parameter name so the two routes can coexist.
fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/files", post(upload_file))
        .route("/v1/files/:name/url", get(get_file_url))
        .route("/v1/files/:name", get(get_file))
        .route("/v1/ocr", post(ocr_document))
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024)) // 100MB
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Store an uploaded file and register it under a fresh id.
async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<FileObject>, ApiError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(str::to_string)
                .ok_or_else(|| ApiError::BadRequest("File field has no filename".to_string()))?;
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
            upload = Some((filename, data));
            break;
        }
    }

    let (filename, data) =
        upload.ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;
    let filename = storage::validate_filename(&filename)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state.uploads.save(filename, &data).await.map_err(|e| {
        error!("❌ Upload of {} failed: {:#}", filename, e);
        ApiError::Processing(format!("{:#}", e))
    })?;

    let stored = state.registry.register(filename, data.len() as u64);
    info!("➡️ File uploaded: {} ({} bytes), id: {}", stored.filename, stored.bytes, stored.id);

    Ok(Json(FileObject::from(&stored)))
}

#[derive(serde::Deserialize)]
struct UrlQuery {
    expiry: Option<i64>,
}

/// Resolve a file id to the URL its bytes are served from.
async fn get_file_url(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<FileUrl>, ApiError> {
    let stored = state
        .registry
        .get(&file_id)
        .ok_or_else(|| ApiError::NotFound("File ID not found".to_string()))?;

    let url = format!("/v1/files/{}", stored.filename);
    debug!("URL expiry requested: {}h", query.expiry.unwrap_or(24));
    info!("➡️ Returning URL for id {}: {}", file_id, url);

    Ok(Json(FileUrl { url }))
}

/// Serve a stored file's bytes by filename.
async fn get_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let not_found = || ApiError::NotFound("File not found".to_string());

    let filename = storage::validate_filename(&filename).map_err(|_| not_found())?;
    let data = state
        .uploads
        .read(filename)
        .await
        .map_err(|e| ApiError::Processing(format!("{:#}", e)))?
        .ok_or_else(not_found)?;

    let content_type = mime_guess::from_path(filename).first_or_octet_stream();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_LENGTH, data.len())
        .body(Body::from(data))
        .map_err(|e| ApiError::Processing(e.to_string()))
}

/// Run OCR on a previously uploaded document referenced by URL.
async fn ocr_document(
    State(state): State<AppState>,
    payload: Result<Json<OcrRequest>, JsonRejection>,
) -> Result<Json<OcrResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let filename = request.document.filename();
    let stored = state
        .registry
        .find_by_filename(filename)
        .ok_or_else(|| ApiError::NotFound("File not uploaded".to_string()))?;

    let doc_size_bytes = state
        .uploads
        .size(&stored.filename)
        .await
        .map_err(|e| ApiError::Processing(format!("OCR error: {:#}", e)))?
        .ok_or_else(|| ApiError::NotFound("File not found".to_string()))?;

    let model = request
        .model
        .clone()
        .unwrap_or_else(|| state.default_model.clone());
    let options = ExtractOptions {
        include_image_base64: request.include_image_base64,
    };

    let path = state.uploads.path_for(&stored.filename);
    let pages = state
        .extractor
        .extract(&path, &stored.filename, options)
        .await
        .map_err(|e| {
            error!("❌ OCR failed for {}: {:#}", stored.filename, e);
            ApiError::Processing(format!("OCR error: {:#}", e))
        })?;

    Ok(Json(OcrResponse::new(pages, model, doc_size_bytes)))
}
