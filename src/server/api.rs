//! HTTP API server implementation

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Json, Multipart, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use utoipa::{OpenApi, ToSchema};

use crate::core::client::DeepLFactory;
use crate::core::config::GatewayConfig;
use crate::core::errors::{ErrorResponse, GatewayError, Result};
use crate::core::models::{TranslationRequest, UsageInfo};
use crate::server::gateway::{DocumentUpload, Gateway};

/// Header carrying a per-request API key for `/api-usage`
pub const API_KEY_HEADER: &str = "x-api-key";

/// Application state
#[derive(Clone)]
pub struct AppState {
    gateway: Gateway,
}

impl AppState {
    /// Wrap a gateway for the router
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    service: String,
    version: String,
    checked_at: String,
}

/// Text translation response
#[derive(Debug, Serialize, ToSchema)]
pub struct TranslateResponse {
    /// Always `true`
    pub success: bool,
    /// Translated text
    pub translated_text: String,
    /// Source language reported by the vendor
    pub detected_source_lang: String,
    /// Same value as `detected_source_lang`, kept for the bundled page
    pub detected_language: String,
    /// Usage after this translation, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_count: Option<u64>,
    /// Limit of the billing period, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_limit: Option<u64>,
}

/// Key check request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ApiKeyRequest {
    /// Key to check, the configured default is never used instead
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Key check response
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    /// `success` when the key was accepted
    pub status: String,
}

/// Form fields accepted by the document endpoints
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct DocumentUploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
    target_lang: String,
    source_lang: Option<String>,
    api_key: Option<String>,
}

/// OpenAPI document served at `/api-docs/openapi.json`
#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        translate,
        test_api_key,
        api_usage,
        translate_document
    ),
    components(schemas(
        HealthResponse,
        TranslationRequest,
        TranslateResponse,
        ApiKeyRequest,
        StatusResponse,
        UsageInfo,
        DocumentUploadForm,
        ErrorResponse
    )),
    tags((name = "translation", description = "DeepL translation gateway"))
)]
pub struct ApiDoc;

/// Static UI page
async fn index() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}

/// Health check handler
#[utoipa::path(get, path = "/health", tag = "translation",
    responses((status = 200, description = "Service is up", body = HealthResponse)))]
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checked_at: chrono::Utc::now().to_rfc3339(),
    })
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Text translation handler
#[utoipa::path(post, path = "/translate", tag = "translation",
    request_body = TranslationRequest,
    responses(
        (status = 200, description = "Translated text", body = TranslateResponse),
        (status = 400, description = "Missing text, target language or API key", body = ErrorResponse),
        (status = 401, description = "API key rejected", body = ErrorResponse),
        (status = 500, description = "Translation service error", body = ErrorResponse)
    ))]
async fn translate(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<TranslationRequest>, JsonRejection>,
) -> Result<Json<TranslateResponse>> {
    let Json(request) = payload.map_err(|e| {
        GatewayError::validation(format!("Invalid request body: {}", e.body_text()))
    })?;

    let outcome = state.gateway.translate(&request).await.map_err(|e| {
        warn!("Translation failed: {}", e);
        e
    })?;

    let detected = outcome.translation.detected_source_lang;
    Ok(Json(TranslateResponse {
        success: true,
        translated_text: outcome.translation.text,
        detected_language: detected.clone(),
        detected_source_lang: detected,
        character_count: outcome.usage.map(|u| u.character_count),
        character_limit: outcome.usage.map(|u| u.character_limit),
    }))
}

/// Key validation handler, every failure is reported as 400
#[utoipa::path(post, path = "/test-api-key", tag = "translation",
    request_body = ApiKeyRequest,
    responses(
        (status = 200, description = "Key accepted", body = StatusResponse),
        (status = 400, description = "Key missing or rejected", body = ErrorResponse)
    ))]
async fn test_api_key(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ApiKeyRequest>, JsonRejection>,
) -> Response {
    let api_key = payload.ok().and_then(|Json(body)| body.api_key);

    match state.gateway.test_api_key(api_key.as_deref()).await {
        Ok(()) => Json(StatusResponse {
            status: "success".to_string(),
        })
        .into_response(),
        Err(e) => {
            warn!("API key check failed: {}", e);
            (StatusCode::BAD_REQUEST, Json(e.body())).into_response()
        }
    }
}

/// Usage handler, degrades to a fallback snapshot on any failure
#[utoipa::path(get, path = "/api-usage", tag = "translation",
    params(("X-API-Key" = Option<String>, Header, description = "API key, the configured default is used when absent")),
    responses(
        (status = 200, description = "Current usage", body = UsageInfo),
        (status = 500, description = "Fallback usage, the service could not be queried", body = UsageInfo)
    ))]
async fn api_usage(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<UsageInfo>) {
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match state.gateway.usage(api_key).await {
        Ok(usage) => (StatusCode::OK, Json(usage)),
        Err(e) => {
            warn!("Usage lookup failed, reporting fallback: {}", e);
            let limit = state.gateway.config().fallback_character_limit;
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(UsageInfo::fallback(limit)),
            )
        }
    }
}

/// Body over the upload limit gets its own error, anything else is a bad request
fn invalid_upload(err: MultipartError, limit: usize) -> GatewayError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GatewayError::TooLarge(format!("Upload exceeds the limit of {} bytes", limit))
    } else {
        GatewayError::validation(format!("Invalid upload: {}", err.body_text()))
    }
}

/// Collect the multipart fields of a document request
async fn read_upload(mut multipart: Multipart, limit: usize) -> Result<DocumentUpload> {
    let mut upload = DocumentUpload::default();
    let mut has_file = false;
    let invalid = move |e: MultipartError| invalid_upload(e, limit);

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                has_file = true;
                upload.filename = field.file_name().map(str::to_string);
                upload.data = field.bytes().await.map_err(invalid)?;
            }
            "target_lang" => upload.target_lang = Some(field.text().await.map_err(invalid)?),
            "source_lang" => upload.source_lang = Some(field.text().await.map_err(invalid)?),
            "api_key" => upload.api_key = Some(field.text().await.map_err(invalid)?),
            other => debug!("Ignoring form field {}", other),
        }
    }

    if !has_file {
        return Err(GatewayError::validation("No file provided"));
    }

    Ok(upload)
}

/// Document translation handler, serves both `/translate-document` and `/upload-document`
#[utoipa::path(post, path = "/translate-document", tag = "translation",
    request_body(content = DocumentUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Translated file as an attachment named translated_<name>"),
        (status = 400, description = "Missing file, bad extension, missing target language or API key", body = ErrorResponse),
        (status = 401, description = "API key rejected", body = ErrorResponse),
        (status = 413, description = "Upload larger than the configured limit", body = ErrorResponse),
        (status = 500, description = "Translation service or file error", body = ErrorResponse)
    ))]
async fn translate_document(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let multipart = multipart.map_err(|e| {
        GatewayError::validation(format!("Invalid upload: {}", e.body_text()))
    })?;
    let upload = read_upload(multipart, state.gateway.config().max_upload_bytes).await?;

    let document = state
        .gateway
        .translate_document(upload)
        .await
        .map_err(|e| {
            warn!("Document translation failed: {}", e);
            e
        })?;

    info!(
        "Sending {} ({} bytes)",
        document.filename,
        document.data.len()
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, document.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", document.filename),
            ),
        ],
        document.data,
    )
        .into_response())
}

/// Build the router for a prepared state
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.gateway.config().max_upload_bytes;

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .route("/translate", post(translate))
        .route("/test-api-key", post(test_api_key))
        .route("/api-usage", get(api_usage))
        .route("/translate-document", post(translate_document))
        .route("/upload-document", post(translate_document))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}

/// Run the HTTP server
pub async fn run_server(config: GatewayConfig, host: String, port: u16) -> anyhow::Result<()> {
    let config = Arc::new(config);

    // Create gateway
    let factory = Arc::new(DeepLFactory::new(config.clone())?);
    let gateway = Gateway::new(config, factory);
    gateway.scratch().ensure().await?;

    info!("Scratch directory: {}", gateway.scratch().path().display());

    // Create router
    let app = router(Arc::new(AppState::new(gateway)));

    // Bind address
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    info!("Starting server on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
