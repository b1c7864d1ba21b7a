//! DeepL Gateway - HTTP wrapper around the DeepL translation API
//!
//! This library provides text translation, document translation, API key
//! checks and usage reporting behind a small set of HTTP endpoints.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod core;
pub mod server;

// Re-export key types for convenience
pub use crate::core::{
    backend::{BackendFactory, TranslationBackend},
    client::{DeepLClient, DeepLFactory},
    config::GatewayConfig,
    errors::GatewayError,
    models::{TextTranslation, TranslationRequest, UsageInfo},
};

pub use crate::server::{
    api::{router, run_server, AppState},
    gateway::{DocumentUpload, Gateway},
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
