use std::path::Path;

use bytes::Bytes;
use mime_guess::from_path;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

use crate::{error::AppError, storage::store::StorageManager};

/// Metadata for an uploaded source document after it was written to storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileInfo {
    pub file_name: String,
    pub location: String,
    pub sha256: String,
    pub mime_type: String,
    pub public_url: String,
}

impl FileInfo {
    /// Store `data` under `notes/{user_id}/{uuid}/{sanitized file name}`.
    pub async fn upload(
        data: Bytes,
        file_name: &str,
        user_id: &str,
        storage: &StorageManager,
    ) -> Result<Self, AppError> {
        if file_name.trim().is_empty() {
            return Err(AppError::Validation("File name missing in metadata".into()));
        }

        let sha256 = Self::get_sha(&data);
        let mime_type = Self::guess_mime_type(Path::new(file_name));
        let location = Self::location_for(user_id, &Uuid::new_v4().to_string(), file_name);

        let public_url = storage.upload(&location, data).await?;

        info!(
            user_id = %user_id,
            location = %location,
            sha256 = %sha256,
            "Stored uploaded document"
        );

        Ok(Self {
            file_name: file_name.to_string(),
            location,
            sha256,
            mime_type,
            public_url,
        })
    }

    pub fn location_for(user_id: &str, upload_id: &str, file_name: &str) -> String {
        format!(
            "notes/{}/{}/{}",
            Self::sanitize_file_name(user_id),
            upload_id,
            Self::sanitize_file_name(file_name)
        )
    }

    fn guess_mime_type(path: &Path) -> String {
        from_path(path)
            .first_or(mime::APPLICATION_OCTET_STREAM)
            .to_string()
    }

    fn get_sha(data: &[u8]) -> String {
        let digest = Sha256::digest(data);
        format!("{digest:x}")
    }

    /// Replace anything outside `[A-Za-z0-9_-]` in the stem with `_`, keeping the extension.
    fn sanitize_file_name(file_name: &str) -> String {
        let clean = |part: &str| -> String {
            part.chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                        c
                    } else {
                        '_'
                    }
                })
                .collect()
        };

        match file_name.rfind('.') {
            Some(idx) if idx > 0 => {
                let (name, ext) = file_name.split_at(idx);
                format!("{}.{}", clean(name), clean(ext.trim_start_matches('.')))
            }
            _ => clean(file_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::store::testing::memory_storage;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(
            FileInfo::sanitize_file_name("OS Lecture 3.pdf"),
            "OS_Lecture_3.pdf"
        );
        assert_eq!(FileInfo::sanitize_file_name("../../etc.txt"), "______etc.txt");
        assert_eq!(FileInfo::sanitize_file_name("no_extension"), "no_extension");
        assert_eq!(FileInfo::sanitize_file_name(".hidden"), "_hidden");
    }

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(
            FileInfo::guess_mime_type(Path::new("notes.pdf")),
            "application/pdf"
        );
        assert_eq!(
            FileInfo::guess_mime_type(Path::new("mystery.unknownext")),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_upload_stores_bytes_and_returns_url() {
        let storage = memory_storage();
        let info = FileInfo::upload(
            Bytes::from_static(b"hello notes"),
            "week 1.txt",
            "user_1",
            &storage,
        )
        .await
        .expect("upload");

        assert!(info.location.starts_with("notes/user_1/"));
        assert!(info.location.ends_with("/week_1.txt"));
        assert_eq!(info.mime_type, "text/plain");
        assert_eq!(info.public_url, storage.public_url(&info.location));
        assert_eq!(
            info.sha256,
            format!("{:x}", Sha256::digest(b"hello notes"))
        );

        let stored = storage.get(&info.location).await.expect("stored bytes");
        assert_eq!(stored.as_ref(), b"hello notes");
    }

    #[tokio::test]
    async fn test_upload_requires_file_name() {
        let storage = memory_storage();
        let result = FileInfo::upload(Bytes::from_static(b"x"), "  ", "user_1", &storage).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
