//! Uploaded documents known to the backend.
//!
//! The backend owns the list; this registry caches it. A failed refresh keeps the previous
//! list, an upload appends the returned names, and a delete re-fetches the whole list.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::gateway::{Backend, GatewayError, UploadFile};

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("no files selected")]
    NoFiles,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Ordered list of uploaded file names. Duplicates are kept as the backend reports them.
#[derive(Clone, Default)]
pub struct DocumentRegistry {
    files: Arc<RwLock<Vec<String>>>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn files(&self) -> Vec<String> {
        self.files.read().await.clone()
    }

    /// Replace the list from the backend. On failure the previous list is kept and the error returned.
    pub async fn refresh(&self, backend: &dyn Backend) -> Result<(), GatewayError> {
        match backend.list_uploaded_files().await {
            Ok(files) => {
                log::debug!("documents: refreshed, {} files", files.len());
                *self.files.write().await = files;
                Ok(())
            }
            Err(e) => {
                log::warn!("documents: refresh failed, keeping previous list: {}", e);
                Err(e)
            }
        }
    }

    /// Upload all files in one request and append the names the backend returns.
    pub async fn upload(
        &self,
        backend: &dyn Backend,
        files: Vec<UploadFile>,
    ) -> Result<Vec<String>, DocumentError> {
        if files.is_empty() {
            return Err(DocumentError::NoFiles);
        }
        let uploaded = backend.upload_files(files).await?;
        self.files.write().await.extend(uploaded.iter().cloned());
        log::info!("documents: uploaded {:?}", uploaded);
        Ok(uploaded)
    }

    /// Delete a file, then re-fetch the list. Returns the backend's status message.
    /// A failed re-fetch keeps the previous list, except that a rejected credential is returned as an error.
    pub async fn delete(
        &self,
        backend: &dyn Backend,
        file_id: &str,
    ) -> Result<String, DocumentError> {
        let message = backend.delete_file(file_id).await?;
        log::info!("documents: deleted {}", file_id);
        match self.refresh(backend).await {
            Err(e) if e.is_unauthorized() => Err(e.into()),
            _ => Ok(message),
        }
    }

    /// Forget all files (logout).
    pub async fn clear(&self) {
        self.files.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;

    #[tokio::test]
    async fn refresh_replaces_list() {
        let backend = FakeBackend::new();
        backend.set_files(&["a.pdf", "b.pdf"]);
        let reg = DocumentRegistry::new();
        reg.refresh(&backend).await.unwrap();
        assert_eq!(reg.files().await, vec!["a.pdf", "b.pdf"]);
    }

    #[tokio::test]
    async fn refresh_failure_keeps_previous_list() {
        let backend = FakeBackend::new();
        backend.set_files(&["a.pdf", "b.pdf"]);
        let reg = DocumentRegistry::new();
        reg.refresh(&backend).await.unwrap();

        backend.set_files(&["c.pdf"]);
        backend.fail_reads(true);
        assert!(reg.refresh(&backend).await.is_err());
        assert_eq!(reg.files().await, vec!["a.pdf", "b.pdf"]);
    }

    #[tokio::test]
    async fn upload_appends_returned_names_without_refresh() {
        let backend = FakeBackend::new();
        backend.set_files(&["old.txt"]);
        let reg = DocumentRegistry::new();
        reg.refresh(&backend).await.unwrap();

        let names = reg
            .upload(&backend, vec![UploadFile::new("fileA.pdf", b"%PDF".to_vec())])
            .await
            .unwrap();
        assert_eq!(names, vec!["fileA.pdf"]);
        assert_eq!(reg.files().await, vec!["old.txt", "fileA.pdf"]);
        assert_eq!(backend.calls(), vec!["list_uploaded_files", "upload_files"]);
    }

    #[tokio::test]
    async fn upload_keeps_duplicates() {
        let backend = FakeBackend::new();
        let reg = DocumentRegistry::new();
        reg.upload(&backend, vec![UploadFile::new("a.txt", b"1".to_vec())])
            .await
            .unwrap();
        reg.upload(&backend, vec![UploadFile::new("a.txt", b"2".to_vec())])
            .await
            .unwrap();
        assert_eq!(reg.files().await, vec!["a.txt", "a.txt"]);
    }

    #[tokio::test]
    async fn upload_failure_leaves_list_unchanged() {
        let backend = FakeBackend::new();
        backend.set_files(&["a.pdf"]);
        let reg = DocumentRegistry::new();
        reg.refresh(&backend).await.unwrap();
        backend.fail_writes(true);
        let err = reg
            .upload(&backend, vec![UploadFile::new("b.pdf", b"x".to_vec())])
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Gateway(_)));
        assert_eq!(reg.files().await, vec!["a.pdf"]);
    }

    #[tokio::test]
    async fn upload_nothing_is_rejected_locally() {
        let backend = FakeBackend::new();
        let reg = DocumentRegistry::new();
        assert!(matches!(
            reg.upload(&backend, Vec::new()).await,
            Err(DocumentError::NoFiles)
        ));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn delete_refetches_list() {
        let backend = FakeBackend::new();
        backend.set_files(&["fileA.pdf", "fileB.pdf"]);
        let reg = DocumentRegistry::new();
        reg.refresh(&backend).await.unwrap();

        let msg = reg.delete(&backend, "fileA.pdf").await.unwrap();
        assert_eq!(msg, "File fileA.pdf deleted successfully");
        assert_eq!(reg.files().await, vec!["fileB.pdf"]);
        assert_eq!(
            backend.calls(),
            vec!["list_uploaded_files", "delete_file", "list_uploaded_files"]
        );
    }

    #[tokio::test]
    async fn delete_failure_does_not_refresh() {
        let backend = FakeBackend::new();
        backend.set_files(&["a.pdf"]);
        let reg = DocumentRegistry::new();
        reg.refresh(&backend).await.unwrap();
        assert!(reg.delete(&backend, "missing.pdf").await.is_err());
        assert_eq!(reg.files().await, vec!["a.pdf"]);
        assert_eq!(backend.calls(), vec!["list_uploaded_files", "delete_file"]);
    }

    #[tokio::test]
    async fn refresh_reports_rejected_token() {
        let backend = FakeBackend::new();
        backend.set_files(&["a.pdf"]);
        let reg = DocumentRegistry::new();
        reg.refresh(&backend).await.unwrap();
        backend.reject_token(true);
        assert!(reg.refresh(&backend).await.unwrap_err().is_unauthorized());
        assert_eq!(reg.files().await, vec!["a.pdf"]);
    }
}
