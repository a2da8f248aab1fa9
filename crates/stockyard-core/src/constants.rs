//! Fixed limits of the asset engine.

/// Upload ceiling, enforced from the declared size before the body is read.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Content types accepted for upload.
pub const ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// Longest edge in pixels for each generated thumbnail size.
pub const THUMBNAIL_SMALL_PX: u32 = 150;
pub const THUMBNAIL_MEDIUM_PX: u32 = 400;
pub const THUMBNAIL_LARGE_PX: u32 = 800;

/// Hamming distance at which the similarity percentage reaches zero.
pub const SIMILARITY_DISTANCE_SCALE: f64 = 10.0;
