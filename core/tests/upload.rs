//! Batch upload to local object storage.

use finguard_core::{
    error::{HubError, HubResult},
    hub::LiveHub,
    session::Session,
    types::Tier,
    upload::{FileStorage, LocalDirStorage, UploadKey, UploadProgress},
};
use std::io::Cursor;

#[test]
fn upload_key_layout() {
    let key = UploadKey::new("csv-uploads", "ana", "clients/q1.csv");
    let rendered = key.to_string();
    assert!(rendered.starts_with("csv-uploads/ana/"));
    assert!(rendered.ends_with("-clients_q1.csv"));
    assert_eq!(rendered.split('/').count(), 3);
    assert_eq!(key.file_id.len(), 9);

    // Two uploads of the same file never share a key.
    assert_ne!(key, UploadKey::new("csv-uploads", "ana", "clients/q1.csv"));
}

#[test]
fn upload_reports_monotonic_progress_to_total() -> HubResult<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir()?;
    let mut hub = LiveHub::build_test()?;
    hub.set_session(Some(Session::new("ana", Tier::Analyst, "ana@firm.test")));
    let storage = LocalDirStorage::new(dir.path(), hub.config().upload_chunk_size);

    let body = b"id,amount\n1,20.5\n2,-13\n";
    let mut progress: Vec<UploadProgress> = Vec::new();
    let receipt = hub.upload_file(
        &storage,
        "batch.csv",
        &mut Cursor::new(&body[..]),
        body.len() as u64,
        |p| progress.push(p),
    )?;

    assert_eq!(receipt.bytes, body.len() as u64);
    assert!(receipt.key.starts_with("csv-uploads/ana/"));
    assert!(progress.len() > 1, "expected several chunks, got {}", progress.len());
    assert!(progress.windows(2).all(|w| w[0].transferred < w[1].transferred));
    let last = progress.last().copied().expect("progress reported");
    assert_eq!(last.transferred, last.total);
    assert_eq!(last.percent(), 100.0);

    let stored = std::fs::read(dir.path().join(receipt.key.as_str()))?;
    assert_eq!(stored, body);
    Ok(())
}

#[test]
fn empty_file_reports_completion() -> HubResult<()> {
    let dir = tempfile::tempdir()?;
    let storage = LocalDirStorage::new(dir.path(), 8);
    let key = UploadKey::new("csv-uploads", "ana", "empty.csv");
    let mut progress = Vec::new();
    let receipt = storage.put(&key, &mut Cursor::new(Vec::new()), 0, &mut |p| progress.push(p))?;
    assert_eq!(receipt.bytes, 0);
    assert_eq!(progress, [UploadProgress { transferred: 0, total: 0 }]);
    assert!(storage.object_path(&key).exists());
    Ok(())
}

#[test]
fn signed_out_upload_is_refused() -> HubResult<()> {
    let dir = tempfile::tempdir()?;
    let hub = LiveHub::build_test()?;
    let storage = LocalDirStorage::new(dir.path(), 4);
    let err = hub
        .upload_file(&storage, "x.csv", &mut Cursor::new(b"a".to_vec()), 1, |_| {})
        .unwrap_err();
    assert!(matches!(err, HubError::NotSignedIn));
    assert!(std::fs::read_dir(dir.path())?.next().is_none());
    Ok(())
}
