use std::time::Duration;

use zoo_core::{File, FileStatus, Metadata, Provenance, Slot};

use crate::error::StoreError;
use crate::lock::DistributedLock;
use crate::repository::FileRepository;

/// Slot under a model id unique to this run, so suites can be re-run
/// against persistent backends.
fn fresh_slot(filename: &str) -> Slot {
    Slot::new(format!("conf-{}", uuid::Uuid::now_v7()), filename)
}

fn pending(slot: &Slot, size: u64) -> File {
    File::new_pending(
        "conf-user",
        slot.model_id.clone(),
        slot.filename.clone(),
        Provenance {
            framework: "keras".into(),
            framework_version: "2.1.0".into(),
            client_name: "conformance".into(),
        },
        size,
        Metadata::new(),
    )
}

async fn commit_new(repo: &dyn FileRepository, slot: &Slot, size: u64) -> Result<File, StoreError> {
    let file = pending(slot, size);
    repo.create(&file).await?;
    repo.commit(slot, &file.id).await
}

/// Run the full file repository conformance test suite.
///
/// Call this from your backend's test module with a fresh repository.
///
/// # Errors
///
/// Returns an error if any conformance test fails.
pub async fn run_file_repository_conformance_tests(
    repo: &dyn FileRepository,
) -> Result<(), StoreError> {
    test_create_and_get(repo).await?;
    test_pending_conflict(repo).await?;
    test_commit(repo).await?;
    test_delete_pending(repo).await?;
    test_retention_order(repo).await?;
    test_soft_delete(repo).await?;
    test_latest_by_model(repo).await?;
    test_scan_by_status(repo).await?;
    Ok(())
}

async fn test_create_and_get(repo: &dyn FileRepository) -> Result<(), StoreError> {
    let slot = fresh_slot("weights.bin");
    let mut file = pending(&slot, 42);
    file.metadata.insert("epoch".into(), serde_json::json!(7));
    repo.create(&file).await?;

    let got = repo.by_id(&file.id).await?.expect("created file should exist");
    assert_eq!(got.status, FileStatus::Pending);
    assert_eq!(got.size, 42);
    assert_eq!(got.filename, "weights.bin");
    assert_eq!(got.framework_version, "2.1.0");
    assert_eq!(got.metadata, file.metadata);

    assert!(repo.by_id("no-such-file").await?.is_none());

    let got = repo
        .by_ids(&[file.id.clone(), "no-such-file".into()])
        .await?;
    assert_eq!(got.len(), 1, "missing ids should be skipped");
    assert_eq!(got[0].id, file.id);
    Ok(())
}

async fn test_pending_conflict(repo: &dyn FileRepository) -> Result<(), StoreError> {
    let slot = fresh_slot("conflict.bin");
    repo.create(&pending(&slot, 1)).await?;

    let second = repo.create(&pending(&slot, 2)).await;
    assert!(
        matches!(second, Err(StoreError::PendingConflict(_))),
        "second pending file in a slot should conflict"
    );

    // Other slots are unaffected.
    repo.create(&pending(&fresh_slot("conflict.bin"), 3)).await?;
    Ok(())
}

async fn test_commit(repo: &dyn FileRepository) -> Result<(), StoreError> {
    let slot = fresh_slot("commit.bin");
    let file = pending(&slot, 10);
    repo.create(&file).await?;

    let wrong = repo.commit(&slot, "not-the-pending-id").await;
    assert!(matches!(wrong, Err(StoreError::NoPendingFile { .. })));

    let committed = repo.commit(&slot, &file.id).await?;
    assert_eq!(committed.id, file.id);
    assert_eq!(committed.status, FileStatus::Committed);

    let again = repo.commit(&slot, &file.id).await;
    assert!(
        matches!(again, Err(StoreError::NoPendingFile { .. })),
        "committing twice should fail"
    );

    // The slot is free for the next pending file.
    repo.create(&pending(&slot, 11)).await?;
    Ok(())
}

async fn test_delete_pending(repo: &dyn FileRepository) -> Result<(), StoreError> {
    let slot = fresh_slot("stale.bin");
    assert!(
        repo.delete_pending(&slot).await?.is_empty(),
        "delete_pending on an empty slot should be a no-op"
    );

    let committed = commit_new(repo, &slot, 1).await?;
    let stale = pending(&slot, 2);
    repo.create(&stale).await?;

    let removed = repo.delete_pending(&slot).await?;
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].id, stale.id);
    assert!(repo.by_id(&stale.id).await?.is_none());

    let kept = repo.by_id(&committed.id).await?.expect("committed survives");
    assert_eq!(kept.status, FileStatus::Committed);
    Ok(())
}

async fn test_retention_order(repo: &dyn FileRepository) -> Result<(), StoreError> {
    let slot = fresh_slot("ckpt.bin");
    let mut ids = Vec::new();
    for size in 0..5 {
        ids.push(commit_new(repo, &slot, size).await?.id);
    }

    let beyond = repo.files_beyond_retention(&slot, 3).await?;
    let beyond_ids: Vec<_> = beyond.iter().map(|f| f.id.clone()).collect();
    assert_eq!(beyond_ids, vec![ids[0].clone(), ids[1].clone()], "oldest first");

    assert!(repo.files_beyond_retention(&slot, 5).await?.is_empty());
    assert!(repo.files_beyond_retention(&slot, 10).await?.is_empty());
    assert_eq!(repo.files_beyond_retention(&slot, 0).await?.len(), 5);

    // Pending files never count against retention.
    repo.create(&pending(&slot, 99)).await?;
    assert_eq!(repo.files_beyond_retention(&slot, 3).await?.len(), 2);
    Ok(())
}

async fn test_soft_delete(repo: &dyn FileRepository) -> Result<(), StoreError> {
    let slot = fresh_slot("delete.bin");
    let old = commit_new(repo, &slot, 1).await?;
    commit_new(repo, &slot, 2).await?;

    assert!(repo.delete(&old.id).await?);
    let got = repo.by_id(&old.id).await?.expect("record is kept");
    assert_eq!(got.status, FileStatus::Deleted);

    assert!(
        !repo.delete(&old.id).await?,
        "deleting twice should report nothing changed"
    );
    assert!(!repo.delete("no-such-file").await?);
    assert_eq!(repo.files_beyond_retention(&slot, 0).await?.len(), 1);
    Ok(())
}

async fn test_latest_by_model(repo: &dyn FileRepository) -> Result<(), StoreError> {
    let a = fresh_slot("a.bin");
    let b = Slot::new(a.model_id.clone(), "b.bin");

    commit_new(repo, &a, 1).await?;
    let newest_a = commit_new(repo, &a, 2).await?;
    let only_b = commit_new(repo, &b, 3).await?;
    repo.create(&pending(&a, 4)).await?;

    let latest = repo.latest_by_model(&a.model_id).await?;
    let ids: Vec<_> = latest.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec![newest_a.id.as_str(), only_b.id.as_str()]);

    assert!(repo.latest_by_model("no-such-model").await?.is_empty());
    Ok(())
}

async fn test_scan_by_status(repo: &dyn FileRepository) -> Result<(), StoreError> {
    let slot = fresh_slot("scan.bin");
    let committed = commit_new(repo, &slot, 1).await?;
    let open = pending(&slot, 2);
    repo.create(&open).await?;

    let pending_ids: Vec<_> = repo
        .scan(Some(FileStatus::Pending))
        .await?
        .into_iter()
        .map(|f| f.id)
        .collect();
    assert!(pending_ids.contains(&open.id));
    assert!(!pending_ids.contains(&committed.id));

    let all_ids: Vec<_> = repo.scan(None).await?.into_iter().map(|f| f.id).collect();
    assert!(all_ids.contains(&open.id));
    assert!(all_ids.contains(&committed.id));
    Ok(())
}

/// Run the full distributed lock conformance test suite.
///
/// # Errors
///
/// Returns an error if any conformance test fails.
pub async fn run_lock_conformance_tests(lock: &dyn DistributedLock) -> Result<(), StoreError> {
    test_try_acquire_and_release(lock).await?;
    test_try_acquire_contention(lock).await?;
    test_lock_extend(lock).await?;
    test_acquire_timeout(lock).await?;
    Ok(())
}

async fn test_try_acquire_and_release(lock: &dyn DistributedLock) -> Result<(), StoreError> {
    let guard = lock
        .try_acquire("slot:conf:release", Duration::from_secs(10))
        .await?
        .expect("should acquire uncontested lock");
    assert!(guard.is_held().await?, "lock should be held");
    guard.release().await?;

    let again = lock
        .try_acquire("slot:conf:release", Duration::from_secs(10))
        .await?
        .expect("released lock should be free");
    again.release().await?;
    Ok(())
}

async fn test_try_acquire_contention(lock: &dyn DistributedLock) -> Result<(), StoreError> {
    let held = lock
        .try_acquire("slot:conf:contended", Duration::from_secs(10))
        .await?
        .expect("should acquire uncontested lock");

    let second = lock
        .try_acquire("slot:conf:contended", Duration::from_secs(10))
        .await?;
    assert!(
        second.is_none(),
        "second acquire should fail while lock is held"
    );

    held.release().await?;
    Ok(())
}

async fn test_lock_extend(lock: &dyn DistributedLock) -> Result<(), StoreError> {
    let guard = lock
        .try_acquire("slot:conf:extend", Duration::from_secs(5))
        .await?
        .expect("should acquire lock");

    guard.extend(Duration::from_secs(10)).await?;
    assert!(
        guard.is_held().await?,
        "lock should still be held after extend"
    );

    guard.release().await?;
    Ok(())
}

async fn test_acquire_timeout(lock: &dyn DistributedLock) -> Result<(), StoreError> {
    let held = lock
        .try_acquire("slot:conf:timeout", Duration::from_secs(30))
        .await?
        .expect("should acquire lock");

    let result = lock
        .acquire(
            "slot:conf:timeout",
            Duration::from_secs(5),
            Duration::from_millis(150),
        )
        .await;
    assert!(
        matches!(result, Err(StoreError::Timeout(_))),
        "acquire should time out while the lock is held"
    );

    held.release().await?;
    Ok(())
}
