//! Download and unpack Step Functions Local

use crate::config::Config;
use crate::error::{ErrorContext, OfflineError, Result};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// File the emulator distribution is started from
pub const JAR_FILE_NAME: &str = "StepFunctionsLocal.jar";

/// Installs the emulator distribution into a local directory
#[derive(Debug, Clone)]
pub struct Installer {
    path: PathBuf,
    download_url: String,
    client: reqwest::Client,
}

impl Installer {
    /// Installer for `path`, fetching from `download_url`
    pub fn new(path: impl Into<PathBuf>, download_url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            download_url: download_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Installer for the directory and URL in `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.path, &config.download_url)
    }

    /// Install directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location of the emulator jar once installed
    pub fn jar_path(&self) -> PathBuf {
        self.path.join(JAR_FILE_NAME)
    }

    /// Whether the emulator jar is already present
    pub fn is_installed(&self) -> bool {
        self.jar_path().is_file()
    }

    /// Make sure the emulator is installed, downloading it if needed
    ///
    /// Returns the path of the jar. Does nothing when the jar already exists.
    pub async fn install(&self) -> Result<PathBuf> {
        let jar_path = self.jar_path();
        if self.is_installed() {
            tracing::debug!("Step Functions Local already installed at {}", jar_path.display());
            return Ok(jar_path);
        }

        tracing::info!(
            "Installing Step Functions Local from {} into {}",
            self.download_url,
            self.path.display()
        );

        let archive = self.download().await?;

        let dest = self.path.clone();
        tokio::task::spawn_blocking(move || extract_archive(&archive, &dest))
            .await
            .map_err(|e| OfflineError::Install(format!("extraction task failed: {e}")))??;

        if !jar_path.is_file() {
            return Err(OfflineError::Install(format!(
                "archive from {} does not contain {}",
                self.download_url, JAR_FILE_NAME
            )));
        }

        tracing::info!("Step Functions Local installed");
        Ok(jar_path)
    }

    async fn download(&self) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(&self.download_url)
            .send()
            .await
            .map_err(|e| OfflineError::Install(format!("{}: {e}", self.download_url)))?;

        if !response.status().is_success() {
            return Err(OfflineError::Install(format!(
                "HTTP {} when downloading {}",
                response.status(),
                self.download_url
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| OfflineError::Install(format!("{}: {e}", self.download_url)))?;
        Ok(bytes.to_vec())
    }
}

/// Unpack a zip archive held in memory into `dest`, creating it if needed
pub fn extract_archive(archive: &[u8], dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create install directory {}", dest.display()))?;

    let mut zip = zip::ZipArchive::new(Cursor::new(archive))
        .map_err(|e| OfflineError::Install(format!("invalid archive: {e}")))?;
    zip.extract(dest)
        .map_err(|e| OfflineError::Install(format!("failed to extract archive: {e}")))?;

    Ok(())
}
