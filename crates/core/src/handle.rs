//! Shared handles to decoded images.
//!
//! A handle is released when its last clone is dropped. History steps, the
//! editor's current image and in-flight jobs hold clones, so an image stays
//! alive exactly as long as something can still display it.

use image::DynamicImage;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Reference-counted decoded image with a stable identity.
#[derive(Clone)]
pub struct ImageHandle {
    id: u64,
    image: Arc<DynamicImage>,
}

impl ImageHandle {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            image: Arc::new(image),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Number of live clones of this handle, this one included.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.image)
    }
}

impl PartialEq for ImageHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ImageHandle {}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("id", &self.id)
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .finish()
    }
}

impl From<DynamicImage> for ImageHandle {
    fn from(image: DynamicImage) -> Self {
        Self::new(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_identity_and_count() {
        let a = ImageHandle::new(DynamicImage::new_rgba8(4, 4));
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(a.ref_count(), 2);
        drop(b);
        assert_eq!(a.ref_count(), 1);
    }

    #[test]
    fn distinct_images_have_distinct_ids() {
        let a = ImageHandle::new(DynamicImage::new_rgba8(4, 4));
        let b = ImageHandle::new(DynamicImage::new_rgba8(4, 4));
        assert_ne!(a, b);
    }
}
