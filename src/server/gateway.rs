//! Gateway operations: validate input, call the backend, shape the result

use axum::body::Bytes;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::backend::{BackendFactory, TranslationBackend};
use crate::core::config::GatewayConfig;
use crate::core::errors::{GatewayError, Result};
use crate::core::models::{TextTranslation, TranslationRequest, UsageInfo};
use crate::server::scratch::{
    content_type_for, upload_name, ScratchDir, ScratchJob, ALLOWED_EXTENSIONS,
};

/// Characters of an uploaded text document sampled for language detection
const DETECTION_SAMPLE_CHARS: usize = 1000;

/// Uploaded document plus its form fields
#[derive(Debug, Clone, Default)]
pub struct DocumentUpload {
    /// Filename as sent by the client, unsanitized
    pub filename: Option<String>,
    /// File content
    pub data: Bytes,
    /// Required target language
    pub target_lang: Option<String>,
    /// Source language, detected when absent
    pub source_lang: Option<String>,
    /// Per-request key, the configured default is used when absent
    pub api_key: Option<String>,
}

/// Translated document ready to be sent back
#[derive(Debug, Clone)]
pub struct TranslatedDocument {
    /// `translated_<name>`
    pub filename: String,
    /// MIME type derived from the extension
    pub content_type: &'static str,
    /// Translated file content
    pub data: Vec<u8>,
}

/// Text translation plus the optional usage snapshot taken right after it
#[derive(Debug, Clone)]
pub struct TextOutcome {
    /// Vendor result
    pub translation: TextTranslation,
    /// `None` when disabled or the usage call failed
    pub usage: Option<UsageInfo>,
}

/// Primary language subtag, `EN-US` becomes `EN`
fn primary_language(code: &str) -> String {
    code.split(['-', '_'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_uppercase()
}

/// Trimmed value, `None` when absent or blank
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// First characters of an upload if it is UTF-8 text
fn text_sample(data: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(data).ok()?;
    let sample: String = text.chars().take(DETECTION_SAMPLE_CHARS).collect();
    if sample.trim().is_empty() {
        None
    } else {
        Some(sample)
    }
}

/// The HTTP-independent core of the service
#[derive(Clone)]
pub struct Gateway {
    config: Arc<GatewayConfig>,
    factory: Arc<dyn BackendFactory>,
    scratch: ScratchDir,
}

impl Gateway {
    /// Gateway using `factory` for every backend call
    pub fn new(config: Arc<GatewayConfig>, factory: Arc<dyn BackendFactory>) -> Self {
        let scratch = ScratchDir::new(config.scratch_dir.clone());
        Self {
            config,
            factory,
            scratch,
        }
    }

    /// Configuration the gateway was built with
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Scratch directory for document jobs
    pub fn scratch(&self) -> &ScratchDir {
        &self.scratch
    }

    /// Request key if given, otherwise the configured default
    pub fn resolve_api_key(&self, supplied: Option<&str>) -> Result<String> {
        non_blank(supplied)
            .or_else(|| non_blank(self.config.api_key.as_deref()))
            .map(str::to_string)
            .ok_or_else(|| GatewayError::validation("No API key provided"))
    }

    fn backend(&self, supplied: Option<&str>) -> Result<Arc<dyn TranslationBackend>> {
        let api_key = self.resolve_api_key(supplied)?;
        self.factory.connect(&api_key)
    }

    /// Check a key by fetching usage with it, the default key is never used here
    pub async fn test_api_key(&self, api_key: Option<&str>) -> Result<()> {
        let api_key =
            non_blank(api_key).ok_or_else(|| GatewayError::validation("API key is required"))?;

        let backend = self.factory.connect(api_key)?;
        backend.get_usage().await?;

        info!("API key validated");
        Ok(())
    }

    /// Usage for the supplied key or the configured default
    pub async fn usage(&self, api_key: Option<&str>) -> Result<UsageInfo> {
        let backend = self.backend(api_key)?;
        backend.get_usage().await
    }

    /// Translate text, with a usage snapshot when `include_usage` is set
    pub async fn translate(&self, request: &TranslationRequest) -> Result<TextOutcome> {
        if request.text.trim().is_empty() {
            return Err(GatewayError::validation("No text provided"));
        }
        let target_lang = non_blank(Some(request.target_lang.as_str()))
            .ok_or_else(|| GatewayError::validation("Target language is required"))?;
        let source_lang = non_blank(request.source_lang.as_deref());

        let backend = self.backend(request.api_key.as_deref())?;

        debug!(
            "Translating {} chars to {} (source: {:?})",
            request.text.chars().count(),
            target_lang,
            source_lang
        );
        let translation = backend
            .translate_text(&request.text, target_lang, source_lang)
            .await?;

        let usage = if self.config.include_usage {
            match backend.get_usage().await {
                Ok(usage) => Some(usage),
                Err(e) => {
                    debug!("Usage snapshot unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(TextOutcome { translation, usage })
    }

    /// Validate an upload, translate it, and clean up the scratch files
    pub async fn translate_document(&self, upload: DocumentUpload) -> Result<TranslatedDocument> {
        let original = non_blank(upload.filename.as_deref())
            .ok_or_else(|| GatewayError::validation("No file selected"))?;

        let name = upload_name(original).ok_or_else(|| {
            GatewayError::validation(format!(
                "File type not allowed. Allowed types: {}",
                ALLOWED_EXTENSIONS.join(", ")
            ))
        })?;

        let target_lang = non_blank(upload.target_lang.as_deref())
            .ok_or_else(|| GatewayError::validation("Target language is required"))?;
        let source_lang = non_blank(upload.source_lang.as_deref());

        let backend = self.backend(upload.api_key.as_deref())?;

        let job = self.scratch.job(&name);
        info!("Document job {} -> {}", name, target_lang);

        let result = self
            .run_document_job(&job, &upload.data, backend.as_ref(), target_lang, source_lang)
            .await;
        job.cleanup().await;

        let data = result?;
        Ok(TranslatedDocument {
            content_type: content_type_for(&job.download_name),
            filename: job.download_name,
            data,
        })
    }

    async fn run_document_job(
        &self,
        job: &ScratchJob,
        data: &[u8],
        backend: &dyn TranslationBackend,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<Vec<u8>> {
        self.scratch.ensure().await?;
        tokio::fs::write(&job.input, data)
            .await
            .map_err(|e| GatewayError::io(&job.input, e))?;

        if source_lang.is_none() && self.config.auto_detect_language {
            self.reject_same_language(backend, data, target_lang).await?;
        }

        backend
            .translate_document(&job.input, &job.output, target_lang, source_lang)
            .await?;

        tokio::fs::read(&job.output)
            .await
            .map_err(|e| GatewayError::io(&job.output, e))
    }

    /// Fail when a text upload is already written in the target language
    async fn reject_same_language(
        &self,
        backend: &dyn TranslationBackend,
        data: &[u8],
        target_lang: &str,
    ) -> Result<()> {
        let Some(sample) = text_sample(data) else {
            debug!("Upload is not plain text, skipping language detection");
            return Ok(());
        };

        let detected = match backend.translate_text(&sample, target_lang, None).await {
            Ok(translation) => translation.detected_source_lang,
            Err(e @ GatewayError::Credential(_)) => return Err(e),
            Err(e) => {
                warn!("Language detection failed, continuing without it: {}", e);
                return Ok(());
            }
        };

        debug!("Detected document language {}", detected);
        if primary_language(&detected) == primary_language(target_lang) {
            return Err(GatewayError::validation(format!(
                "Source and target language are the same ({}), nothing to translate",
                detected
            )));
        }

        Ok(())
    }
}
