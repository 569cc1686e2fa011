//! Batch file upload to object storage.
//!
//! Objects land under `{prefix}/{identity}/{file id}-{file name}`.
//! Progress is reported after every chunk and ends at the total size.

use crate::{
    error::{HubError, HubResult},
    hub::LiveHub,
    types::Identity,
};
use serde::Serialize;
use std::{
    fmt,
    fs,
    io::{Read, Write},
    path::PathBuf,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadKey {
    pub prefix:    String,
    pub identity:  Identity,
    pub file_id:   String,
    pub file_name: String,
}

impl UploadKey {
    /// Fresh key with a generated file id. Path separators in the file
    /// name are replaced so the key keeps exactly three segments.
    pub fn new(prefix: &str, identity: &str, file_name: &str) -> Self {
        let mut file_id = Uuid::new_v4().simple().to_string();
        file_id.truncate(9);
        Self {
            prefix: prefix.to_string(),
            identity: identity.to_string(),
            file_id,
            file_name: file_name.replace(['/', '\\'], "_"),
        }
    }
}

impl fmt::Display for UploadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}-{}", self.prefix, self.identity, self.file_id, self.file_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UploadProgress {
    pub transferred: u64,
    pub total:       u64,
}

impl UploadProgress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.transferred as f64 / self.total as f64 * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    pub key:      String,
    /// Where the stored object can be fetched from.
    pub location: String,
    pub bytes:    u64,
}

pub trait FileStorage {
    fn put(
        &self,
        key: &UploadKey,
        body: &mut dyn Read,
        total: u64,
        on_progress: &mut dyn FnMut(UploadProgress),
    ) -> HubResult<UploadReceipt>;
}

/// Stores objects as files below a root directory.
pub struct LocalDirStorage {
    root:       PathBuf,
    chunk_size: usize,
}

impl LocalDirStorage {
    pub fn new(root: impl Into<PathBuf>, chunk_size: usize) -> Self {
        Self { root: root.into(), chunk_size: chunk_size.max(1) }
    }

    pub fn object_path(&self, key: &UploadKey) -> PathBuf {
        self.root
            .join(&key.prefix)
            .join(&key.identity)
            .join(format!("{}-{}", key.file_id, key.file_name))
    }
}

impl FileStorage for LocalDirStorage {
    fn put(
        &self,
        key: &UploadKey,
        body: &mut dyn Read,
        total: u64,
        on_progress: &mut dyn FnMut(UploadProgress),
    ) -> HubResult<UploadReceipt> {
        let path = self.object_path(key);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut out = fs::File::create(&path)?;
        let mut buf = vec![0u8; self.chunk_size];
        let mut transferred = 0u64;
        loop {
            let n = body.read(&mut buf)?;
            if n == 0 {
                break;
            }
            out.write_all(&buf[..n])?;
            transferred += n as u64;
            on_progress(UploadProgress { transferred, total: total.max(transferred) });
        }
        out.flush()?;
        if transferred == 0 {
            on_progress(UploadProgress { transferred: 0, total: 0 });
        }
        Ok(UploadReceipt {
            key: key.to_string(),
            location: format!("file://{}", path.display()),
            bytes: transferred,
        })
    }
}

impl LiveHub {
    /// Upload one file for the signed-in identity.
    pub fn upload_file(
        &self,
        storage: &dyn FileStorage,
        file_name: &str,
        body: &mut dyn Read,
        total: u64,
        mut on_progress: impl FnMut(UploadProgress),
    ) -> HubResult<UploadReceipt> {
        let session = self.session().ok_or(HubError::NotSignedIn)?;
        let key = UploadKey::new(&self.config().upload_prefix, &session.identity, file_name);
        log::debug!("uploading {key} ({total} bytes)");
        let receipt = storage.put(&key, body, total, &mut on_progress).map_err(|e| {
            log::error!("upload error: {e}");
            e
        })?;
        log::info!("uploaded {} ({} bytes)", receipt.key, receipt.bytes);
        Ok(receipt)
    }
}
