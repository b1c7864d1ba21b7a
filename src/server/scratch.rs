//! Scratch directory for document jobs

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::errors::{GatewayError, Result};

/// Stem used when nothing of the uploaded stem survives sanitizing
const FALLBACK_STEM: &str = "document";

/// File extensions accepted for document translation
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "txt", "pdf", "doc", "docx", "pptx", "xlsx", "html", "htm", "xlf", "xliff", "srt",
];

fn unsafe_chars() -> &'static Regex {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("valid regex"))
}

/// Reduce an uploaded filename to a safe, flat ASCII name
///
/// Path separators become underscores, anything outside `[A-Za-z0-9_.-]`
/// is dropped, and leading or trailing dots and underscores are stripped.
/// The result may be empty.
pub fn sanitize_filename(name: &str) -> String {
    let flat = name.replace(['/', '\\'], " ");
    let joined = flat.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = unsafe_chars().replace_all(&joined, "");
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Lowercased final extension of a filename
pub fn file_extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Whether the final extension is on the allow-list, ignoring case
pub fn is_allowed_file(name: &str) -> bool {
    file_extension(name)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Safe name for an upload whose extension is on the allow-list
///
/// The extension is taken from the name as uploaded and only the stem is
/// sanitized, so `日本語.pdf` becomes `document.pdf` rather than losing its
/// extension. `None` when the extension is missing or not allowed.
pub fn upload_name(original: &str) -> Option<String> {
    let original = original.trim();
    if !is_allowed_file(original) {
        return None;
    }

    // allowed extensions are ASCII, so the split is on a char boundary
    let (stem, ext) = original.rsplit_once('.')?;
    let stem = sanitize_filename(stem);
    let stem = if stem.is_empty() {
        FALLBACK_STEM
    } else {
        stem.as_str()
    };

    Some(format!("{}.{}", stem, ext))
}

/// MIME type sent back with a translated document
pub fn content_type_for(name: &str) -> &'static str {
    match file_extension(name).as_deref() {
        Some("txt") => "text/plain; charset=utf-8",
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("pptx") => {
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        }
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("xlf") | Some("xliff") => "application/xliff+xml",
        Some("srt") => "application/x-subrip",
        _ => "application/octet-stream",
    }
}

/// Directory holding uploads and translated outputs while a request runs
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    /// Scratch directory rooted at `root`, created lazily
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Create the directory if it does not exist yet
    pub async fn ensure(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| GatewayError::io(&self.root, e))
    }

    /// Reserve unique paths for one document request
    ///
    /// `name` must already be sanitized.
    pub fn job(&self, name: &str) -> ScratchJob {
        let unique = format!("{}_{}", Uuid::new_v4().simple(), name);

        ScratchJob {
            input: self.root.join(&unique),
            output: self.root.join(format!("translated_{}", unique)),
            download_name: format!("translated_{}", name),
        }
    }
}

/// Files created for a single document request
#[derive(Debug, Clone)]
pub struct ScratchJob {
    /// Where the upload is written
    pub input: PathBuf,
    /// Where the translated document is written
    pub output: PathBuf,
    /// Filename presented to the client
    pub download_name: String,
}

impl ScratchJob {
    /// Delete both files, logging failures instead of returning them
    pub async fn cleanup(&self) {
        for path in [&self.input, &self.output] {
            match tokio::fs::remove_file(path).await {
                Ok(()) => debug!("Removed scratch file {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove scratch file {}: {}", path.display(), e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My Report.docx"), "My_Report.docx");
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("C:\\Users\\bob\\notes.txt"), "C_Users_bob_notes.txt");
        assert_eq!(sanitize_filename("über.pdf"), "ber.pdf");
        assert_eq!(sanitize_filename(".hidden.srt"), "hidden.srt");
        assert_eq!(sanitize_filename("日本語"), "");
    }

    #[test]
    fn test_allowed_extensions() {
        assert!(is_allowed_file("slides.PPTX"));
        assert!(is_allowed_file("subs.srt"));
        assert!(is_allowed_file("archive.tar.txt"));
        assert!(!is_allowed_file("virus.exe"));
        assert!(!is_allowed_file("report.pdf.exe"));
        assert!(!is_allowed_file("pdf"));
        assert!(!is_allowed_file("noext."));
    }

    #[test]
    fn test_upload_name_keeps_extension() {
        assert_eq!(upload_name("日本語.pdf").as_deref(), Some("document.pdf"));
        assert_eq!(upload_name("документ.docx").as_deref(), Some("document.docx"));
        assert_eq!(upload_name("字幕.srt").as_deref(), Some("document.srt"));
        assert_eq!(upload_name("Résumé 2024.txt").as_deref(), Some("Rsum_2024.txt"));
        assert_eq!(upload_name("../../slides.PPTX").as_deref(), Some("slides.PPTX"));
        assert_eq!(upload_name("My Notes.txt").as_deref(), Some("My_Notes.txt"));
        assert_eq!(upload_name(".hidden.srt").as_deref(), Some("hidden.srt"));
    }

    #[test]
    fn test_upload_name_rejects_bad_extensions() {
        assert_eq!(upload_name("virus.exe"), None);
        assert_eq!(upload_name("notes.日本"), None);
        assert_eq!(upload_name("pdf"), None);
        assert_eq!(upload_name(".pdf"), None);
        assert_eq!(upload_name("dir.v2/notes"), None);
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type_for("a.pdf"), "application/pdf");
        assert_eq!(content_type_for("a.HTM"), "text/html; charset=utf-8");
        assert_eq!(content_type_for("a.bin"), "application/octet-stream");
    }

    #[test]
    fn test_jobs_get_unique_paths() {
        let scratch = ScratchDir::new("uploads");
        let first = scratch.job("report.pdf");
        let second = scratch.job("report.pdf");

        assert_ne!(first.input, second.input);
        assert_ne!(first.output, second.output);
        assert_eq!(first.download_name, "translated_report.pdf");
        assert!(first.input.starts_with("uploads"));
        assert!(first
            .output
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("translated_"));
    }

    #[tokio::test]
    async fn test_cleanup_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(dir.path().join("scratch"));
        scratch.ensure().await.unwrap();

        let job = scratch.job("notes.txt");
        tokio::fs::write(&job.input, b"hello").await.unwrap();

        // output was never created, cleanup must still succeed
        job.cleanup().await;

        assert!(!job.input.exists());
        assert!(!job.output.exists());
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }
}
