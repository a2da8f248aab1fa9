//! Asset fixtures

use chrono::Utc;
use stockyard_core::models::{Asset, AssetMime, NewAsset, ParentKind};
use uuid::Uuid;

/// A `pending` JPEG asset with fresh ids, not primary, display order 0.
pub fn asset_fixture(tenant_id: Uuid, parent_id: Uuid) -> Asset {
    new_asset_fixture(tenant_id, parent_id).into_asset(false, Utc::now())
}

pub fn new_asset_fixture(tenant_id: Uuid, parent_id: Uuid) -> NewAsset {
    let id = Uuid::new_v4();
    NewAsset {
        id,
        tenant_id,
        parent_id,
        parent_kind: ParentKind::Item,
        original_filename: format!("{}.jpg", id),
        storage_path: format!("assets/{}/{}/{}.jpg", tenant_id, parent_id, id),
        file_size: 2048,
        content_type: AssetMime::Jpeg,
        width: 640,
        height: 480,
        display_order: 0,
        caption: None,
        uploaded_by: Uuid::new_v4(),
    }
}
