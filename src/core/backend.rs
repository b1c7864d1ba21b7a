//! Translation backend abstraction
//!
//! The gateway never talks to the vendor directly. It asks a
//! [`BackendFactory`] for a handle bound to one credential and calls the
//! operations of [`TranslationBackend`] on it.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::core::errors::Result;
use crate::core::models::{TextTranslation, UsageInfo};

/// Operations offered by a vendor translation service
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Translate a piece of text, auto-detecting the source language when `source_lang` is `None`
    async fn translate_text(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<TextTranslation>;

    /// Translate the document at `input` and write the result to `output`
    async fn translate_document(
        &self,
        input: &Path,
        output: &Path,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<()>;

    /// Fetch the account usage, also serves as a credential check
    async fn get_usage(&self) -> Result<UsageInfo>;
}

/// Builds backend handles for a credential
pub trait BackendFactory: Send + Sync {
    /// Handle whose calls authenticate with `api_key`
    fn connect(&self, api_key: &str) -> Result<Arc<dyn TranslationBackend>>;
}
