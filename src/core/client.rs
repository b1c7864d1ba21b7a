//! Async DeepL REST client

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::core::backend::{BackendFactory, TranslationBackend};
use crate::core::config::GatewayConfig;
use crate::core::errors::{GatewayError, Result};
use crate::core::models::{
    DocumentHandle, DocumentState, DocumentStatus, TextTranslation, UsageInfo,
};

const FREE_API_URL: &str = "https://api-free.deepl.com";
const PRO_API_URL: &str = "https://api.deepl.com";

/// Longest single wait between two document status polls
const MAX_POLL_WAIT: Duration = Duration::from_secs(30);

// Only needed for JSON deserialization.
#[derive(Debug, Deserialize)]
struct TranslationsResponse {
    translations: Vec<TranslationItem>,
}

#[derive(Debug, Deserialize)]
struct TranslationItem {
    detected_source_language: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ServerErrorMessage {
    message: String,
    #[serde(default)]
    detail: Option<String>,
}

/// Pick the API host for a key, free-plan keys end in `:fx`
pub fn base_url_for(api_key: &str, server_url: Option<&str>) -> String {
    match server_url {
        Some(url) => url.trim_end_matches('/').to_string(),
        None if api_key.ends_with(":fx") => FREE_API_URL.to_string(),
        None => PRO_API_URL.to_string(),
    }
}

/// Map a failed vendor response to a gateway error
pub fn error_for_status(status: u16, body: &str) -> GatewayError {
    let message = serde_json::from_str::<ServerErrorMessage>(body)
        .ok()
        .map(|m| match m.detail {
            Some(detail) if !detail.is_empty() => format!("{}, {}", m.message, detail),
            _ => m.message,
        })
        .filter(|m| !m.is_empty());

    match status {
        401 | 403 => GatewayError::Credential(match message {
            Some(message) => format!("Authorization failure, check auth_key: {}", message),
            None => "Authorization failure, check auth_key".to_string(),
        }),
        456 => GatewayError::backend("Quota exceeded, the character limit has been reached"),
        429 => GatewayError::backend(
            "Too many requests, DeepL servers are currently experiencing high load",
        ),
        _ => {
            let message = message.unwrap_or_else(|| {
                if body.trim().is_empty() {
                    "no message".to_string()
                } else {
                    body.trim().to_string()
                }
            });
            GatewayError::backend(format!("DeepL API error ({}): {}", status, message))
        }
    }
}

/// Build the shared HTTP client
pub fn build_http_client(config: &GatewayConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .pool_idle_timeout(Some(Duration::from_secs(30)))
        .pool_max_idle_per_host(10)
        .user_agent(concat!("deepl-gateway/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// DeepL client bound to a single API key
#[derive(Clone)]
pub struct DeepLClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    poll_interval: Duration,
    document_timeout: Duration,
}

impl DeepLClient {
    /// Create a new client with its own connection pool
    pub fn new(api_key: impl Into<String>, config: &GatewayConfig) -> Result<Self> {
        let client = build_http_client(config)?;
        Ok(Self::with_http_client(client, api_key, config))
    }

    /// Create a client sharing an existing connection pool
    pub fn with_http_client(
        client: reqwest::Client,
        api_key: impl Into<String>,
        config: &GatewayConfig,
    ) -> Self {
        let api_key = api_key.into();
        let base_url = base_url_for(&api_key, config.server_url.as_deref());

        Self {
            client,
            api_key,
            base_url,
            poll_interval: config.poll_interval(),
            document_timeout: config.document_timeout(),
        }
    }

    /// Server the client talks to, without the `/v2` prefix
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v2/{}", self.base_url, path)
    }

    fn auth_header(&self) -> String {
        format!("DeepL-Auth-Key {}", self.api_key)
    }

    /// Send a request, turning non-success statuses into errors
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        let err = error_for_status(status.as_u16(), &error_text);
        warn!("DeepL request failed with {}: {}", status, err);
        Err(err)
    }

    /// Upload a document and start its translation
    pub async fn upload_document(
        &self,
        input: &Path,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<DocumentHandle> {
        let bytes = tokio::fs::read(input)
            .await
            .map_err(|e| GatewayError::io(input, e))?;
        let filename = input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        debug!("Uploading {} ({} bytes)", filename, bytes.len());

        let mut form = reqwest::multipart::Form::new()
            .text("target_lang", target_lang.to_string())
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(filename),
            );
        if let Some(source_lang) = source_lang {
            form = form.text("source_lang", source_lang.to_string());
        }

        let response = self
            .send(self.client.post(self.endpoint("document")).multipart(form))
            .await?;
        let handle = response.json::<DocumentHandle>().await?;

        info!("Document uploaded as {}", handle.document_id);
        Ok(handle)
    }

    /// Query the status of an uploaded document
    pub async fn document_status(&self, handle: &DocumentHandle) -> Result<DocumentStatus> {
        let response = self
            .send(
                self.client
                    .post(self.endpoint(&format!("document/{}", handle.document_id)))
                    .form(&[("document_key", handle.document_key.as_str())]),
            )
            .await?;
        Ok(response.json::<DocumentStatus>().await?)
    }

    /// Poll until the document is done, failed, or the deadline passes
    pub async fn wait_for_document(&self, handle: &DocumentHandle) -> Result<DocumentStatus> {
        let deadline = Instant::now() + self.document_timeout;

        loop {
            let status = self.document_status(handle).await?;
            debug!(
                "Document {} is {} ({:?}s remaining)",
                handle.document_id, status.status, status.seconds_remaining
            );

            match status.status {
                DocumentState::Done => return Ok(status),
                DocumentState::Error => {
                    return Err(GatewayError::backend(format!(
                        "Document translation failed: {}",
                        status.error_message.as_deref().unwrap_or("unknown error")
                    )));
                }
                DocumentState::Queued | DocumentState::Translating => {}
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(GatewayError::backend(format!(
                    "Document translation timed out after {:?}",
                    self.document_timeout
                )));
            }

            let estimate = status
                .seconds_remaining
                .map(|secs| Duration::from_secs(secs) / 2)
                .unwrap_or_default();
            let wait = estimate
                .clamp(self.poll_interval, MAX_POLL_WAIT.max(self.poll_interval))
                .min(deadline - now);
            sleep(wait).await;
        }
    }

    /// Download a finished document
    pub async fn download_document(&self, handle: &DocumentHandle, output: &Path) -> Result<()> {
        let response = self
            .send(
                self.client
                    .post(self.endpoint(&format!("document/{}/result", handle.document_id)))
                    .form(&[("document_key", handle.document_key.as_str())]),
            )
            .await?;
        let bytes = response.bytes().await?;

        tokio::fs::write(output, &bytes)
            .await
            .map_err(|e| GatewayError::io(output, e))?;

        debug!("Wrote {} bytes to {}", bytes.len(), output.display());
        Ok(())
    }
}

#[async_trait]
impl TranslationBackend for DeepLClient {
    async fn translate_text(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<TextTranslation> {
        let mut params = vec![("text", text), ("target_lang", target_lang)];
        if let Some(source_lang) = source_lang {
            params.push(("source_lang", source_lang));
        }

        let response = self
            .send(self.client.post(self.endpoint("translate")).form(&params))
            .await?;
        let body = response.json::<TranslationsResponse>().await?;

        let item = body
            .translations
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::backend("No translation in response"))?;

        Ok(TextTranslation {
            text: item.text,
            detected_source_lang: item.detected_source_language,
        })
    }

    async fn translate_document(
        &self,
        input: &Path,
        output: &Path,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<()> {
        let handle = self.upload_document(input, target_lang, source_lang).await?;
        let status = self.wait_for_document(&handle).await?;

        if let Some(billed) = status.billed_characters {
            info!("Document {} done, {} characters billed", handle.document_id, billed);
        }

        self.download_document(&handle, output).await
    }

    async fn get_usage(&self) -> Result<UsageInfo> {
        let response = self.send(self.client.get(self.endpoint("usage"))).await?;
        Ok(response.json::<UsageInfo>().await?)
    }
}

/// Creates [`DeepLClient`] handles that share one connection pool
#[derive(Clone)]
pub struct DeepLFactory {
    client: reqwest::Client,
    config: Arc<GatewayConfig>,
}

impl DeepLFactory {
    /// Build the shared HTTP client from the configured timeouts
    pub fn new(config: Arc<GatewayConfig>) -> Result<Self> {
        let client = build_http_client(&config)?;
        Ok(Self { client, config })
    }
}

impl BackendFactory for DeepLFactory {
    fn connect(&self, api_key: &str) -> Result<Arc<dyn TranslationBackend>> {
        Ok(Arc::new(DeepLClient::with_http_client(
            self.client.clone(),
            api_key,
            &self.config,
        )))
    }
}
