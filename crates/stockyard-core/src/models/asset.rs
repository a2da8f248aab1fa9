use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use crate::AppError;

/// Image content types accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetMime {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/webp")]
    Webp,
}

impl AssetMime {
    pub const ALL: [AssetMime; 3] = [AssetMime::Jpeg, AssetMime::Png, AssetMime::Webp];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetMime::Jpeg => "image/jpeg",
            AssetMime::Png => "image/png",
            AssetMime::Webp => "image/webp",
        }
    }

    /// File extension used for stored originals.
    pub fn extension(&self) -> &'static str {
        match self {
            AssetMime::Jpeg => "jpg",
            AssetMime::Png => "png",
            AssetMime::Webp => "webp",
        }
    }

    /// Parse a declared content type. Parameters (`; charset=...`) and case are ignored.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        Self::ALL.into_iter().find(|m| m.as_str() == essence)
    }
}

impl fmt::Display for AssetMime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of the derived thumbnails of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "thumbnail_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailStatus {
    Pending,
    Processing,
    Complete,
    Failed,
}

impl ThumbnailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThumbnailStatus::Pending => "pending",
            ThumbnailStatus::Processing => "processing",
            ThumbnailStatus::Complete => "complete",
            ThumbnailStatus::Failed => "failed",
        }
    }

    /// Whether `value` names a member of this enumeration.
    pub fn is_recognized(value: &str) -> bool {
        value.parse::<ThumbnailStatus>().is_ok()
    }

    /// Legal moves: pending -> processing -> {complete, failed}, and failed -> pending
    /// when a retry is requested. Nothing leaves `complete`.
    pub fn can_transition_to(&self, next: ThumbnailStatus) -> bool {
        use ThumbnailStatus::*;
        matches!(
            (self, next),
            (Pending, Processing) | (Processing, Complete) | (Processing, Failed) | (Failed, Pending)
        )
    }

    pub fn ensure_transition(&self, next: ThumbnailStatus) -> Result<(), AppError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(AppError::InvalidStateTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for ThumbnailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThumbnailStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ThumbnailStatus::Pending),
            "processing" => Ok(ThumbnailStatus::Processing),
            "complete" => Ok(ThumbnailStatus::Complete),
            "failed" => Ok(ThumbnailStatus::Failed),
            other => Err(AppError::InvalidInput(format!(
                "Unknown thumbnail status: {}",
                other
            ))),
        }
    }
}

/// Kind of business record an asset is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "parent_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ParentKind {
    Item,
    RepairLog,
}

impl ParentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParentKind::Item => "item",
            ParentKind::RepairLog => "repair_log",
        }
    }

    pub fn is_recognized(value: &str) -> bool {
        value.parse::<ParentKind>().is_ok()
    }
}

impl FromStr for ParentKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "item" => Ok(ParentKind::Item),
            "repair_log" => Ok(ParentKind::RepairLog),
            other => Err(AppError::InvalidInput(format!("Unknown parent kind: {}", other))),
        }
    }
}

/// Derived-thumbnail sub-state. Written only by the thumbnail worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailState {
    pub status: ThumbnailStatus,
    pub small_path: Option<String>,
    pub medium_path: Option<String>,
    pub large_path: Option<String>,
    pub attempts: i32,
    pub last_error: Option<String>,
}

impl ThumbnailState {
    pub fn pending() -> Self {
        Self {
            status: ThumbnailStatus::Pending,
            small_path: None,
            medium_path: None,
            large_path: None,
            attempts: 0,
            last_error: None,
        }
    }
}

/// Storage paths produced by one successful thumbnail run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailPaths {
    pub small: String,
    pub medium: String,
    pub large: String,
}

/// Pick the thumbnail to display: medium first, then the legacy single thumbnail.
/// Empty strings count as absent.
pub fn best_available_thumbnail<'a>(
    medium: Option<&'a str>,
    legacy: Option<&'a str>,
) -> Option<&'a str> {
    medium
        .filter(|p| !p.is_empty())
        .or_else(|| legacy.filter(|p| !p.is_empty()))
}

/// One uploaded image attached to a parent record within a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub parent_id: Uuid,
    pub parent_kind: ParentKind,
    pub original_filename: String,
    pub storage_path: String,
    /// Single thumbnail written by the pre-worker synchronous pipeline.
    pub thumbnail_path: Option<String>,
    pub file_size: i64,
    pub content_type: AssetMime,
    pub width: i32,
    pub height: i32,
    pub display_order: i32,
    pub is_primary: bool,
    pub caption: Option<String>,
    pub uploaded_by: Uuid,
    pub thumbnails: ThumbnailState,
    pub perceptual_hash: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Asset {
    pub fn is_thumbnail_ready(&self) -> bool {
        self.thumbnails.status == ThumbnailStatus::Complete
    }

    pub fn has_thumbnail_failed(&self) -> bool {
        self.thumbnails.status == ThumbnailStatus::Failed
    }

    pub fn is_thumbnail_pending(&self) -> bool {
        matches!(
            self.thumbnails.status,
            ThumbnailStatus::Pending | ThumbnailStatus::Processing
        )
    }

    pub fn best_thumbnail(&self) -> Option<&str> {
        best_available_thumbnail(
            self.thumbnails.medium_path.as_deref(),
            self.thumbnail_path.as_deref(),
        )
    }

    /// Every storage object owned by this asset: original, legacy thumbnail and
    /// whichever sized thumbnails are set.
    pub fn storage_paths(&self) -> Vec<&str> {
        let mut paths = vec![self.storage_path.as_str()];
        paths.extend(
            [
                self.thumbnail_path.as_deref(),
                self.thumbnails.small_path.as_deref(),
                self.thumbnails.medium_path.as_deref(),
                self.thumbnails.large_path.as_deref(),
            ]
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty()),
        );
        paths
    }
}

/// Fields supplied by the upload pipeline when persisting a new asset.
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub parent_id: Uuid,
    pub parent_kind: ParentKind,
    pub original_filename: String,
    pub storage_path: String,
    pub file_size: i64,
    pub content_type: AssetMime,
    pub width: i32,
    pub height: i32,
    pub display_order: i32,
    pub caption: Option<String>,
    pub uploaded_by: Uuid,
}

impl NewAsset {
    /// Materialise the record as it looks right after creation.
    pub fn into_asset(self, is_primary: bool, now: DateTime<Utc>) -> Asset {
        Asset {
            id: self.id,
            tenant_id: self.tenant_id,
            parent_id: self.parent_id,
            parent_kind: self.parent_kind,
            original_filename: self.original_filename,
            storage_path: self.storage_path,
            thumbnail_path: None,
            file_size: self.file_size,
            content_type: self.content_type,
            width: self.width,
            height: self.height,
            display_order: self.display_order,
            is_primary,
            caption: self.caption,
            uploaded_by: self.uploaded_by,
            thumbnails: ThumbnailState::pending(),
            perceptual_hash: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One entry of a bulk caption update. `None` clears the caption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionUpdate {
    pub asset_id: Uuid,
    pub caption: Option<String>,
}

/// Database row for the assets table.
#[derive(Debug)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct AssetRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub parent_id: Uuid,
    pub parent_kind: ParentKind,
    pub original_filename: String,
    pub storage_path: String,
    pub thumbnail_path: Option<String>,
    pub file_size: i64,
    pub content_type: String,
    pub width: i32,
    pub height: i32,
    pub display_order: i32,
    pub is_primary: bool,
    pub caption: Option<String>,
    pub uploaded_by: Uuid,
    pub thumbnail_status: ThumbnailStatus,
    pub thumbnail_small_path: Option<String>,
    pub thumbnail_medium_path: Option<String>,
    pub thumbnail_large_path: Option<String>,
    pub thumbnail_attempts: i32,
    pub thumbnail_error: Option<String>,
    pub perceptual_hash: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AssetRow> for Asset {
    type Error = AppError;

    fn try_from(row: AssetRow) -> Result<Self, Self::Error> {
        let content_type = AssetMime::from_content_type(&row.content_type).ok_or_else(|| {
            AppError::Internal(format!(
                "Asset {} has unrecognised content type {}",
                row.id, row.content_type
            ))
        })?;

        Ok(Asset {
            id: row.id,
            tenant_id: row.tenant_id,
            parent_id: row.parent_id,
            parent_kind: row.parent_kind,
            original_filename: row.original_filename,
            storage_path: row.storage_path,
            thumbnail_path: row.thumbnail_path,
            file_size: row.file_size,
            content_type,
            width: row.width,
            height: row.height,
            display_order: row.display_order,
            is_primary: row.is_primary,
            caption: row.caption,
            uploaded_by: row.uploaded_by,
            thumbnails: ThumbnailState {
                status: row.thumbnail_status,
                small_path: row.thumbnail_small_path,
                medium_path: row.thumbnail_medium_path,
                large_path: row.thumbnail_large_path,
                attempts: row.thumbnail_attempts,
                last_error: row.thumbnail_error,
            },
            perceptual_hash: row.perceptual_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
