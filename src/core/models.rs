//! Core data models for translation

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Text translation request
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TranslationRequest {
    /// Text to translate
    #[serde(default)]
    pub text: String,
    /// Target language code, e.g. `EN-US`
    #[serde(default)]
    pub target_lang: String,
    /// Source language code, auto-detected when absent
    #[serde(default)]
    pub source_lang: Option<String>,
    /// Per-request API key, the configured default is used when absent
    #[serde(default)]
    pub api_key: Option<String>,
}

impl TranslationRequest {
    /// Request with the default key and auto-detected source language
    pub fn new(text: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_lang: target_lang.into(),
            ..Default::default()
        }
    }

    /// Set an explicit source language
    pub fn with_source_lang(mut self, source_lang: impl Into<String>) -> Self {
        self.source_lang = Some(source_lang.into());
        self
    }

    /// Use `api_key` instead of the configured default
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// Result of a text translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextTranslation {
    /// Translated text
    pub text: String,
    /// Source language reported by the vendor, e.g. `EN`
    pub detected_source_lang: String,
}

/// Account usage snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UsageInfo {
    /// Characters translated in the current billing period
    pub character_count: u64,
    /// Characters allowed per billing period
    pub character_limit: u64,
}

impl UsageInfo {
    /// Usage reported when the real numbers cannot be fetched
    pub fn fallback(character_limit: u64) -> Self {
        Self {
            character_count: 0,
            character_limit,
        }
    }

    /// Characters left in the current billing period
    pub fn remaining(&self) -> u64 {
        self.character_limit.saturating_sub(self.character_count)
    }
}

/// Identifies a document job on the vendor side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHandle {
    /// Job id used in the status and result URLs
    pub document_id: String,
    /// Secret that must accompany every request about the job
    pub document_key: String,
}

/// State of a vendor-side document job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentState {
    /// Waiting to be picked up
    Queued,
    /// In progress
    Translating,
    /// Result ready for download
    Done,
    /// Failed, see `error_message`
    Error,
}

impl DocumentState {
    /// Whether polling can stop
    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentState::Done | DocumentState::Error)
    }
}

impl fmt::Display for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentState::Queued => write!(f, "queued"),
            DocumentState::Translating => write!(f, "translating"),
            DocumentState::Done => write!(f, "done"),
            DocumentState::Error => write!(f, "error"),
        }
    }
}

/// Status report of a document job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentStatus {
    /// Job the status belongs to
    pub document_id: String,
    /// Current state
    pub status: DocumentState,
    /// Vendor estimate while translating
    #[serde(default)]
    pub seconds_remaining: Option<u64>,
    /// Characters billed once done
    #[serde(default)]
    pub billed_characters: Option<u64>,
    /// Reason given with the `error` state
    #[serde(default)]
    pub error_message: Option<String>,
}
