use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use floe_application::ScanReportSource;
use floe_core::{AppError, AppResult};
use floe_domain::{ArtifactReference, ScannerFormat};

/// Scan report source reading `{directory}/{tag}.{scanner}.json` files.
#[derive(Debug, Clone)]
pub struct FileScanReportSource {
    directory: PathBuf,
}

impl FileScanReportSource {
    /// Creates a source rooted at `directory`.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Returns the report location for a tag and scanner.
    #[must_use]
    pub fn report_path(&self, tag: &str, format: ScannerFormat) -> PathBuf {
        self.directory.join(format!("{tag}.{}.json", format.as_str()))
    }

    /// Returns the report directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.directory.as_path()
    }
}

#[async_trait]
impl ScanReportSource for FileScanReportSource {
    async fn fetch_report(
        &self,
        artifact: &ArtifactReference,
        format: ScannerFormat,
    ) -> AppResult<String> {
        let path = self.report_path(&artifact.tag, format);

        tokio::fs::read_to_string(&path)
            .await
            .map_err(|error| match error.kind() {
                ErrorKind::NotFound => AppError::Validation(format!(
                    "no {} scan report for '{}' at '{}'",
                    format.as_str(),
                    artifact.tag,
                    path.display()
                )),
                _ => AppError::Internal(format!(
                    "failed to read scan report '{}': {error}",
                    path.display()
                )),
            })
    }
}

#[cfg(test)]
mod tests {
    use floe_application::ScanReportSource;
    use floe_domain::{ArtifactReference, ScannerFormat};
    use uuid::Uuid;

    use super::FileScanReportSource;

    #[tokio::test]
    async fn reads_report_named_after_tag_and_scanner() {
        let directory = std::env::temp_dir().join(format!("floe-scans-{}", Uuid::new_v4().simple()));
        assert!(tokio::fs::create_dir_all(&directory).await.is_ok());
        let source = FileScanReportSource::new(directory.clone());
        let path = source.report_path("v1.0.0", ScannerFormat::Grype);
        assert!(tokio::fs::write(&path, r#"{"matches":[]}"#).await.is_ok());

        let artifact = ArtifactReference::new("registry.example.com", "v1.0.0", "sha256:aaa");
        let grype = source.fetch_report(&artifact, ScannerFormat::Grype).await;
        let trivy = source.fetch_report(&artifact, ScannerFormat::Trivy).await;

        assert_eq!(grype.ok().as_deref(), Some(r#"{"matches":[]}"#));
        assert!(trivy.is_err_and(|error| error.to_string().contains("v1.0.0.trivy.json")));
        assert!(path.ends_with("v1.0.0.grype.json"));

        let _ = tokio::fs::remove_dir_all(&directory).await;
    }
}
