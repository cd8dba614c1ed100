//! Media references.
//!
//! Only the relative path is stored; bytes live elsewhere. Bare file names are
//! placed under the upload prefix for their kind of media.

pub const THUMBNAIL_PREFIX: &str = "gallery/thumbnails/";
pub const GALLERY_PREFIX: &str = "gallery/products/";

/// Reference for a product thumbnail
pub fn thumbnail_path(name: &str) -> String {
    place(THUMBNAIL_PREFIX, name)
}

/// Reference for a gallery image or video
pub fn gallery_path(name: &str) -> String {
    place(GALLERY_PREFIX, name)
}

fn place(prefix: &str, name: &str) -> String {
    let name = name.trim();
    if name.is_empty() || name.contains('/') {
        name.to_string()
    } else {
        format!("{prefix}{name}")
    }
}
