//! Upload validation rules applied before any bytes are stored.

use std::path::Path;

use crate::constants::MAX_UPLOAD_BYTES;
use crate::models::AssetMime;
use crate::AppError;

const MAX_FILENAME_LEN: usize = 255;
const MAX_CAPTION_LEN: usize = 2000;

/// Check the caller-declared size and content type. Returns the parsed MIME type.
pub fn validate_declared_upload(size: u64, content_type: &str) -> Result<AssetMime, AppError> {
    if size > MAX_UPLOAD_BYTES {
        return Err(AppError::FileTooLarge {
            size,
            max: MAX_UPLOAD_BYTES,
        });
    }
    if size == 0 {
        return Err(AppError::InvalidInput("File is empty".to_string()));
    }

    AssetMime::from_content_type(content_type).ok_or_else(|| {
        AppError::InvalidFileType(format!(
            "{} is not allowed; expected one of image/jpeg, image/png, image/webp",
            content_type
        ))
    })
}

/// Strip directory components and control characters from a client-supplied filename.
pub fn sanitize_filename(filename: &str) -> Result<String, AppError> {
    let base = Path::new(filename.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return Err(AppError::InvalidInput(format!(
            "Invalid filename: {:?}",
            filename
        )));
    }

    Ok(cleaned.chars().take(MAX_FILENAME_LEN).collect())
}

/// Captions are free text; only their length is bounded.
pub fn validate_caption(caption: Option<&str>) -> Result<(), AppError> {
    match caption {
        Some(c) if c.chars().count() > MAX_CAPTION_LEN => Err(AppError::InvalidInput(format!(
            "Caption exceeds {} characters",
            MAX_CAPTION_LEN
        ))),
        _ => Ok(()),
    }
}
