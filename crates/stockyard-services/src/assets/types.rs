//! Types used by the asset service

use stockyard_core::models::ParentKind;
use uuid::Uuid;

/// Metadata accompanying an upload body.
///
/// `declared_size` and `content_type` come from the caller and are checked
/// before any byte of the body is read.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub tenant_id: Uuid,
    pub parent_id: Uuid,
    pub parent_kind: ParentKind,
    pub uploaded_by: Uuid,
    pub filename: String,
    pub declared_size: u64,
    pub content_type: String,
    pub caption: Option<String>,
}
