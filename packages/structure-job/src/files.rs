//! File download and type resolution.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use uuid::Uuid;

/// Extensions the pipeline can structure.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx", "xlsx", "xls"];

pub fn is_supported(extension: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension)
}

/// Extension from the URL path, lowercased, ignoring query and fragment.
pub fn extension_from_url(url: &str) -> Option<String> {
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .trim_end_matches('/');
    let file_name = path.rsplit('/').next()?;
    let (_, extension) = file_name.rsplit_once('.')?;
    if extension.is_empty() {
        None
    } else {
        Some(extension.to_ascii_lowercase())
    }
}

/// Download a file and return its extension and local path.
pub async fn resolve_file(client: &reqwest::Client, url: &str) -> Result<(String, PathBuf)> {
    let extension = extension_from_url(url).unwrap_or_default();

    let bytes = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("failed to download {url}"))?
        .error_for_status()
        .with_context(|| format!("download of {url} rejected"))?
        .bytes()
        .await
        .context("failed to read download body")?;

    let path = std::env::temp_dir().join(format!("structure-job-{}.{extension}", Uuid::new_v4()));
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;

    Ok((extension, path))
}

/// Best-effort removal of a downloaded temp file.
pub async fn cleanup(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        tracing::debug!(path = %path.display(), error = %err, "could not remove temp file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_from_url() {
        assert_eq!(
            extension_from_url("https://example.com/docs/Report.PDF"),
            Some("pdf".to_string())
        );
        assert_eq!(
            extension_from_url("https://example.com/a.xlsx?token=abc#page"),
            Some("xlsx".to_string())
        );
        assert_eq!(extension_from_url("https://example.com/no-extension"), None);
        assert_eq!(extension_from_url("https://example.com/trailing."), None);
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported("pdf"));
        assert!(is_supported("xls"));
        assert!(!is_supported("csv"));
        assert!(!is_supported(""));
    }
}
