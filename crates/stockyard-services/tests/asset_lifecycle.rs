//! Behaviour of the asset lifecycle engine against in-memory doubles.

use std::sync::Arc;

use stockyard_core::constants::MAX_UPLOAD_BYTES;
use stockyard_core::models::{Asset, CaptionUpdate, ParentKind, ThumbnailPaths, ThumbnailStatus};
use stockyard_core::AppError;
use stockyard_services::test_helpers::{
    asset_fixture, MockAssetRepository, MockStorage, RecordingEnqueuer, ScriptedAnalyzer,
    ScriptedHasher,
};
use stockyard_services::{AssetRepository, AssetService, UploadRequest};
use uuid::Uuid;

const BODY: &[u8] = b"not really a jpeg, the analyzer is scripted";

struct Harness {
    service: AssetService,
    repo: MockAssetRepository,
    storage: MockStorage,
    analyzer: ScriptedAnalyzer,
    enqueuer: RecordingEnqueuer,
    tenant: Uuid,
    parent: Uuid,
}

impl Harness {
    fn new() -> Self {
        Self::build(None)
    }

    fn with_hasher(hasher: ScriptedHasher) -> Self {
        Self::build(Some(hasher))
    }

    fn build(hasher: Option<ScriptedHasher>) -> Self {
        let repo = MockAssetRepository::new();
        let storage = MockStorage::new();
        let analyzer = ScriptedAnalyzer::default();
        let enqueuer = RecordingEnqueuer::new();

        let mut service = AssetService::new(
            Arc::new(repo.clone()),
            Arc::new(storage.clone()),
            Arc::new(analyzer.clone()),
            Arc::new(enqueuer.clone()),
        );
        if let Some(hasher) = hasher {
            service = service.with_hasher(Arc::new(hasher));
        }

        Self {
            service,
            repo,
            storage,
            analyzer,
            enqueuer,
            tenant: Uuid::new_v4(),
            parent: Uuid::new_v4(),
        }
    }

    fn request(&self, filename: &str) -> UploadRequest {
        UploadRequest {
            tenant_id: self.tenant,
            parent_id: self.parent,
            parent_kind: ParentKind::Item,
            uploaded_by: Uuid::new_v4(),
            filename: filename.to_string(),
            declared_size: BODY.len() as u64,
            content_type: "image/jpeg".to_string(),
            caption: None,
        }
    }

    async fn upload(&self, filename: &str) -> Asset {
        self.service
            .upload(self.request(filename), BODY)
            .await
            .expect("upload should succeed")
    }

    async fn listed(&self) -> Vec<Asset> {
        self.service
            .list_by_parent(self.parent, self.tenant)
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_upload_reorder_delete_walkthrough() {
    let h = Harness::new();

    let a = h.upload("a.jpg").await;
    assert!(a.is_primary);
    assert_eq!(a.display_order, 0);
    assert_eq!(a.thumbnails.status, ThumbnailStatus::Pending);

    let b = h.upload("b.jpg").await;
    assert!(!b.is_primary);
    assert_eq!(b.display_order, 1);

    h.service
        .reorder(h.parent, h.tenant, &[b.id, a.id])
        .await
        .unwrap();
    assert_eq!(h.repo.get(b.id).unwrap().display_order, 0);
    assert_eq!(h.repo.get(a.id).unwrap().display_order, 1);

    h.service.delete(b.id, h.tenant).await.unwrap();
    let remaining = h.listed().await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, a.id);
    assert!(remaining[0].is_primary);
}

#[tokio::test]
async fn test_upload_stores_original_and_enqueues_thumbnails() {
    let h = Harness::new();

    let asset = h.upload("../../etc/shelf photo.jpg").await;

    assert_eq!(asset.original_filename, "shelf photo.jpg");
    assert_eq!(asset.file_size, BODY.len() as i64);
    assert_eq!((asset.width, asset.height), (640, 480));
    assert_eq!(h.storage.save_calls(), vec![asset.storage_path.clone()]);
    assert_eq!(
        asset.storage_path,
        format!("assets/{}/{}/{}.jpg", h.tenant, h.parent, asset.id)
    );
    assert_eq!(h.enqueuer.jobs(), vec![asset.id]);
}

#[tokio::test]
async fn test_oversized_declared_upload_touches_nothing() {
    let h = Harness::new();
    let mut request = h.request("big.jpg");
    request.declared_size = MAX_UPLOAD_BYTES + 1;

    let result = h.service.upload(request, BODY).await;

    assert!(matches!(result, Err(AppError::FileTooLarge { .. })));
    assert!(h.storage.save_calls().is_empty());
    assert_eq!(h.analyzer.calls(), 0);
    assert!(h.repo.is_empty());
}

#[tokio::test]
async fn test_disallowed_type_touches_nothing() {
    let h = Harness::new();
    let mut request = h.request("anim.gif");
    request.content_type = "image/gif".to_string();

    let result = h.service.upload(request, BODY).await;

    assert!(matches!(result, Err(AppError::InvalidFileType(_))));
    assert!(h.storage.save_calls().is_empty());
    assert_eq!(h.analyzer.calls(), 0);
}

#[tokio::test]
async fn test_undecodable_upload_is_not_stored() {
    let h = Harness::new();
    h.analyzer.reject_all(true);

    let result = h.service.upload(h.request("broken.jpg"), BODY).await;

    assert!(matches!(result, Err(AppError::ImageProcessing(_))));
    assert!(h.storage.save_calls().is_empty());
    assert!(h.repo.is_empty());
    assert!(h.enqueuer.jobs().is_empty());
}

#[tokio::test]
async fn test_persistence_failure_deletes_saved_original() {
    let h = Harness::new();
    h.repo.fail_creates(true);

    let result = h.service.upload(h.request("a.jpg"), BODY).await;

    assert!(result.is_err());
    let saved = h.storage.save_calls();
    assert_eq!(saved.len(), 1);
    assert_eq!(h.storage.delete_calls(), saved);
    assert_eq!(h.storage.file_count(), 0);
    assert!(h.enqueuer.jobs().is_empty());
}

#[tokio::test]
async fn test_persistence_failure_surfaces_even_if_cleanup_fails() {
    let h = Harness::new();
    h.repo.fail_counts(true);
    h.storage.fail_deletes(true);

    let result = h.service.upload(h.request("a.jpg"), BODY).await;

    assert!(matches!(result, Err(AppError::Internal(_))));
    assert_eq!(h.storage.delete_calls(), h.storage.save_calls());
}

#[tokio::test]
async fn test_enqueue_failure_does_not_fail_upload() {
    let h = Harness::new();
    h.enqueuer.fail_enqueues(true);

    let asset = h.upload("a.jpg").await;

    assert_eq!(asset.thumbnails.status, ThumbnailStatus::Pending);
    assert!(h.repo.get(asset.id).is_some());
}

#[tokio::test]
async fn test_reorder_assigns_contiguous_orders() {
    let h = Harness::new();
    let mut ids = Vec::new();
    for name in ["a.jpg", "b.jpg", "c.jpg", "d.jpg"] {
        ids.push(h.upload(name).await.id);
    }
    h.service.delete(ids[1], h.tenant).await.unwrap();
    ids.remove(1);

    let wanted = vec![ids[2], ids[0], ids[1]];
    let reordered = h
        .service
        .reorder(h.parent, h.tenant, &wanted)
        .await
        .unwrap();

    let got: Vec<(Uuid, i32)> = reordered.iter().map(|a| (a.id, a.display_order)).collect();
    assert_eq!(got, vec![(wanted[0], 0), (wanted[1], 1), (wanted[2], 2)]);
}

#[tokio::test]
async fn test_reorder_mismatch_writes_nothing() {
    let h = Harness::new();
    let a = h.upload("a.jpg").await;
    let b = h.upload("b.jpg").await;
    let before: Vec<i32> = h.listed().await.iter().map(|x| x.display_order).collect();

    for bad in [
        vec![b.id],
        vec![b.id, a.id, Uuid::new_v4()],
        vec![b.id, Uuid::new_v4()],
        vec![b.id, b.id],
    ] {
        let result = h.service.reorder(h.parent, h.tenant, &bad).await;
        assert!(matches!(result, Err(AppError::InvalidDisplayOrder(_))));
    }

    let after: Vec<i32> = h.listed().await.iter().map(|x| x.display_order).collect();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_set_primary_swaps_atomically() {
    let h = Harness::new();
    let a = h.upload("a.jpg").await;
    let b = h.upload("b.jpg").await;

    let updated = h.service.set_primary(b.id, h.tenant).await.unwrap();

    assert!(updated.is_primary);
    assert!(h.repo.get(b.id).unwrap().is_primary);
    assert!(!h.repo.get(a.id).unwrap().is_primary);
    assert_eq!(h.repo.primary_count(h.parent), 1);
}

#[tokio::test]
async fn test_concurrent_set_primary_keeps_one_primary() {
    let h = Harness::new();
    let mut ids = Vec::new();
    for name in ["a.jpg", "b.jpg", "c.jpg"] {
        ids.push(h.upload(name).await.id);
    }

    let tasks: Vec<_> = ids
        .iter()
        .map(|id| {
            let service = h.service.clone();
            let (id, tenant) = (*id, h.tenant);
            tokio::spawn(async move { service.set_primary(id, tenant).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(h.repo.primary_count(h.parent), 1);
}

#[tokio::test]
async fn test_ownership_errors_are_distinct() {
    let h = Harness::new();
    let a = h.upload("a.jpg").await;
    let stranger = Uuid::new_v4();

    assert!(matches!(
        h.service.get_by_id(Uuid::new_v4(), h.tenant).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        h.service.get_by_id(a.id, stranger).await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        h.service.set_primary(a.id, stranger).await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        h.service.delete(a.id, stranger).await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(h.repo.get(a.id).is_some());
}

#[tokio::test]
async fn test_delete_primary_promotes_a_remaining_asset() {
    let h = Harness::new();
    let a = h.upload("a.jpg").await;
    h.upload("b.jpg").await;
    h.upload("c.jpg").await;

    h.service.delete(a.id, h.tenant).await.unwrap();

    assert_eq!(h.listed().await.len(), 2);
    assert_eq!(h.repo.primary_count(h.parent), 1);
}

#[tokio::test]
async fn test_delete_last_asset_leaves_no_primary() {
    let h = Harness::new();
    let a = h.upload("a.jpg").await;

    h.service.delete(a.id, h.tenant).await.unwrap();

    assert!(h.listed().await.is_empty());
    assert_eq!(h.repo.primary_count(h.parent), 0);
}

#[tokio::test]
async fn test_delete_of_non_primary_repairs_parent_without_primary() {
    // The flag moved onto the deleted record between its read and its delete.
    let h = Harness::new();
    let mut first = asset_fixture(h.tenant, h.parent);
    first.display_order = 0;
    let mut second = asset_fixture(h.tenant, h.parent);
    second.display_order = 1;
    h.repo.insert(first.clone());
    h.repo.insert(second.clone());
    assert_eq!(h.repo.primary_count(h.parent), 0);

    h.service.delete(second.id, h.tenant).await.unwrap();

    assert_eq!(h.repo.primary_count(h.parent), 1);
    assert!(h.repo.get(first.id).unwrap().is_primary);
}

#[tokio::test]
async fn test_upload_into_parent_without_primary_becomes_primary() {
    let h = Harness::new();
    h.repo.insert(asset_fixture(h.tenant, h.parent));

    let uploaded = h.upload("late.jpg").await;

    assert_eq!(uploaded.display_order, 1);
    assert!(uploaded.is_primary);
    assert_eq!(h.repo.primary_count(h.parent), 1);
}

#[tokio::test]
async fn test_ensure_primary_is_noop_when_primary_exists() {
    let h = Harness::new();
    let a = h.upload("a.jpg").await;
    h.upload("b.jpg").await;

    assert_eq!(h.repo.ensure_primary(h.tenant, h.parent).await.unwrap(), None);
    assert!(h.repo.get(a.id).unwrap().is_primary);
    assert_eq!(h.repo.primary_count(h.parent), 1);
}

#[tokio::test]
async fn test_delete_removes_every_storage_object_and_ignores_failures() {
    let h = Harness::new();
    let a = h.upload("a.jpg").await;
    h.repo
        .mark_thumbnail_processing(a.id)
        .await
        .unwrap();
    h.repo
        .mark_thumbnail_complete(
            a.id,
            &ThumbnailPaths {
                small: "s.jpg".to_string(),
                medium: "m.jpg".to_string(),
                large: "l.jpg".to_string(),
            },
        )
        .await
        .unwrap();
    h.storage.fail_deletes(true);

    h.service.delete(a.id, h.tenant).await.unwrap();

    let mut deleted = h.storage.delete_calls();
    deleted.sort();
    let mut expected = vec![
        a.storage_path.clone(),
        "s.jpg".to_string(),
        "m.jpg".to_string(),
        "l.jpg".to_string(),
    ];
    expected.sort();
    assert_eq!(deleted, expected);
    assert!(h.repo.get(a.id).is_none());
}

#[tokio::test]
async fn test_bulk_delete_rejects_foreign_parent_and_deletes_nothing() {
    let h = Harness::new();
    let a = h.upload("a.jpg").await;
    let foreign = asset_fixture(h.tenant, Uuid::new_v4());
    h.repo.insert(foreign.clone());

    let result = h
        .service
        .bulk_delete(h.parent, h.tenant, &[a.id, foreign.id])
        .await;

    match result {
        Err(AppError::Unauthorized(msg)) => assert!(msg.contains("does not belong to parent")),
        other => panic!("expected Unauthorized, got {:?}", other),
    }
    assert!(h.repo.get(a.id).is_some());
    assert!(h.repo.get(foreign.id).is_some());
    assert!(h.storage.delete_calls().is_empty());
}

#[tokio::test]
async fn test_bulk_delete_unknown_id_is_not_found() {
    let h = Harness::new();
    let a = h.upload("a.jpg").await;

    let result = h
        .service
        .bulk_delete(h.parent, h.tenant, &[a.id, Uuid::new_v4()])
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(h.repo.get(a.id).is_some());
}

#[tokio::test]
async fn test_bulk_delete_removes_records_objects_and_repairs_primary() {
    let h = Harness::new();
    let a = h.upload("a.jpg").await;
    let b = h.upload("b.jpg").await;
    let c = h.upload("c.jpg").await;

    let deleted = h
        .service
        .bulk_delete(h.parent, h.tenant, &[a.id, b.id])
        .await
        .unwrap();

    assert_eq!(deleted, 2);
    let remaining = h.listed().await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, c.id);
    assert!(remaining[0].is_primary);

    let mut deleted_keys = h.storage.delete_calls();
    deleted_keys.sort();
    let mut expected = vec![a.storage_path, b.storage_path];
    expected.sort();
    assert_eq!(deleted_keys, expected);
}

#[tokio::test]
async fn test_bulk_delete_empty_is_noop() {
    let h = Harness::new();
    h.upload("a.jpg").await;

    assert_eq!(h.service.bulk_delete(h.parent, h.tenant, &[]).await.unwrap(), 0);
    assert_eq!(h.repo.len(), 1);
}

#[tokio::test]
async fn test_bulk_captions_stop_at_first_failure() {
    let h = Harness::new();
    let a = h.upload("a.jpg").await;
    let b = h.upload("b.jpg").await;

    let updates = vec![
        CaptionUpdate {
            asset_id: a.id,
            caption: Some("front".to_string()),
        },
        CaptionUpdate {
            asset_id: Uuid::new_v4(),
            caption: Some("ghost".to_string()),
        },
        CaptionUpdate {
            asset_id: b.id,
            caption: Some("back".to_string()),
        },
    ];

    let result = h.service.bulk_update_captions(h.tenant, &updates).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(h.repo.get(a.id).unwrap().caption.as_deref(), Some("front"));
    assert_eq!(h.repo.get(b.id).unwrap().caption, None);
}

#[tokio::test]
async fn test_caption_can_be_cleared() {
    let h = Harness::new();
    let a = h.upload("a.jpg").await;

    h.service
        .update_caption(a.id, h.tenant, Some("label".to_string()))
        .await
        .unwrap();
    let cleared = h.service.update_caption(a.id, h.tenant, None).await.unwrap();

    assert_eq!(cleared.caption, None);
    assert!(h
        .service
        .bulk_update_captions(h.tenant, &[])
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_duplicates_without_hasher_is_empty() {
    let h = Harness::new();
    let a = h.upload("a.jpg").await;
    h.repo.set_signature(a.id, 0).await.unwrap();

    let found = h.service.check_duplicates(h.tenant, 0, None).await.unwrap();

    assert!(found.is_empty());
}

#[tokio::test]
async fn test_duplicates_ranked_by_distance() {
    let h = Harness::with_hasher(ScriptedHasher::new(0, 10));
    let far = h.upload("far.jpg").await;
    let exact = h.upload("exact.jpg").await;
    let near = h.upload("near.jpg").await;
    let unrelated = h.upload("unrelated.jpg").await;
    h.repo.set_signature(far.id, 0b111).await.unwrap();
    h.repo.set_signature(exact.id, 0).await.unwrap();
    h.repo.set_signature(near.id, 0b1).await.unwrap();
    h.repo.set_signature(unrelated.id, i64::MAX).await.unwrap();

    let found = h.service.check_duplicates(h.tenant, 0, None).await.unwrap();

    let ids: Vec<Uuid> = found.iter().map(|c| c.asset_id).collect();
    assert_eq!(ids, vec![exact.id, near.id, far.id]);
    assert_eq!(found[0].similarity_percent, 100.0);
    assert!((found[1].similarity_percent - 90.0).abs() < 1e-9);
    assert!((found[2].similarity_percent - 70.0).abs() < 1e-9);
    assert!(found.windows(2).all(|w| w[0].distance <= w[1].distance));
    assert_eq!(found[0].parent_id, h.parent);
    assert_eq!(found[0].original_filename, "exact.jpg");
}

#[tokio::test]
async fn test_duplicates_scoped_to_parent_and_tenant() {
    let h = Harness::with_hasher(ScriptedHasher::new(0, 10));
    let here = h.upload("here.jpg").await;
    h.repo.set_signature(here.id, 0).await.unwrap();

    let mut elsewhere = asset_fixture(h.tenant, Uuid::new_v4());
    elsewhere.perceptual_hash = Some(0);
    h.repo.insert(elsewhere.clone());
    let mut other_tenant = asset_fixture(Uuid::new_v4(), h.parent);
    other_tenant.perceptual_hash = Some(0);
    h.repo.insert(other_tenant);

    let tenant_wide = h.service.check_duplicates(h.tenant, 0, None).await.unwrap();
    let scoped = h
        .service
        .check_duplicates(h.tenant, 0, Some(h.parent))
        .await
        .unwrap();

    assert_eq!(tenant_wide.len(), 2);
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].asset_id, here.id);
}

#[tokio::test]
async fn test_compute_signature_uses_hasher() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("candidate.jpg");
    tokio::fs::write(&path, BODY).await.unwrap();

    let without = Harness::new();
    assert_eq!(without.service.compute_signature(&path).await.unwrap(), None);

    let hasher = ScriptedHasher::new(42, 10);
    let with = Harness::with_hasher(hasher.clone());
    assert_eq!(with.service.compute_signature(&path).await.unwrap(), Some(42));

    hasher.fail_hashing(true);
    assert!(matches!(
        with.service.compute_signature(&path).await,
        Err(AppError::Similarity(_))
    ));
}

#[tokio::test]
async fn test_retry_only_from_failed() {
    let h = Harness::new();
    let a = h.upload("a.jpg").await;

    assert!(matches!(
        h.service.retry_thumbnails(a.id, h.tenant).await,
        Err(AppError::InvalidStateTransition { .. })
    ));

    h.repo.mark_thumbnail_processing(a.id).await.unwrap();
    h.repo.mark_thumbnail_failed(a.id, "decoder crashed").await.unwrap();

    let retried = h.service.retry_thumbnails(a.id, h.tenant).await.unwrap();

    assert_eq!(retried.thumbnails.status, ThumbnailStatus::Pending);
    assert_eq!(retried.thumbnails.attempts, 1);
    assert_eq!(h.enqueuer.jobs(), vec![a.id, a.id]);
}

#[tokio::test]
async fn test_exactly_one_primary_across_operation_sequence() {
    let h = Harness::new();
    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(h.upload(&format!("{}.jpg", i)).await.id);
        assert_eq!(h.repo.primary_count(h.parent), 1);
    }

    h.service.set_primary(ids[3], h.tenant).await.unwrap();
    assert_eq!(h.repo.primary_count(h.parent), 1);

    h.service.delete(ids[3], h.tenant).await.unwrap();
    assert_eq!(h.repo.primary_count(h.parent), 1);

    let primary = h.listed().await.into_iter().find(|a| a.is_primary).unwrap();
    let others: Vec<Uuid> = ids
        .iter()
        .copied()
        .filter(|id| *id != ids[3] && *id != primary.id)
        .take(2)
        .collect();
    h.service
        .bulk_delete(h.parent, h.tenant, &[primary.id, others[0]])
        .await
        .unwrap();
    assert_eq!(h.repo.primary_count(h.parent), 1);

    h.upload("late.jpg").await;
    assert_eq!(h.repo.primary_count(h.parent), 1);
}
