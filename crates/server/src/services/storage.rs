// Attachment storage on the local filesystem

use std::path::PathBuf;

use tokio::fs;

use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct StorageService {
    base_path: PathBuf,
}

/// Reduces an uploaded file name to a safe final path component.
pub fn sanitize_file_name(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = last
        .chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.');
    if cleaned.is_empty() {
        "attachment".to_string()
    } else {
        cleaned.to_string()
    }
}

impl StorageService {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create storage directory: {e}")))?;
        Ok(())
    }

    /// Storage-relative path for an RFI attachment.
    pub fn attachment_key(
        project_id: &str,
        rfi_id: &str,
        attachment_id: &str,
        file_name: &str,
    ) -> String {
        format!(
            "{project_id}/rfis/{rfi_id}/{attachment_id}-{}",
            sanitize_file_name(file_name)
        )
    }

    fn resolve(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }

    pub async fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(key);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to create directories: {e}")))?;
        }

        fs::write(&path, data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write file: {e}")))?;

        Ok(())
    }

    pub async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key);

        if !path.exists() {
            return Err(AppError::NotFound(format!("File not found: {key}")));
        }

        fs::read(&path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read file: {e}")))
    }

    /// Missing files are not an error.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve(key);

        if path.exists() {
            fs::remove_file(&path)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to delete file: {e}")))?;
        }

        Ok(())
    }

    pub async fn delete_rfi_dir(&self, project_id: &str, rfi_id: &str) -> Result<()> {
        self.remove_dir(self.base_path.join(project_id).join("rfis").join(rfi_id))
            .await
    }

    pub async fn delete_project_dir(&self, project_id: &str) -> Result<()> {
        self.remove_dir(self.base_path.join(project_id)).await
    }

    async fn remove_dir(&self, path: PathBuf) -> Result<()> {
        if path.exists() {
            fs::remove_dir_all(&path)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to delete directory: {e}")))?;
        }
        Ok(())
    }
}
