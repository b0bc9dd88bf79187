//! Page rasters, region cropping and image composition.

mod compose;
mod crop;

pub use compose::{stack, stack_images};
pub use crop::{crop, CropResult, CONTEXT_HEIGHT, CROP_BACKGROUND, PIECE_GAP};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbImage;
use rayon::prelude::*;

use crate::error::Result;

/// A raster shared between units and chunks.
///
/// Sharing lets the compositor recognize the very same image handed to two
/// adjacent units without comparing pixels.
pub type SharedImage = Arc<RgbImage>;

/// File extensions recognized when loading page rasters from a directory.
const PAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// One rendered raster per PDF page.
#[derive(Debug, Clone, Default)]
pub struct PageRasters {
    pages: Vec<SharedImage>,
    page_from: usize,
}

impl PageRasters {
    /// Create rasters from decoded page images, first page first.
    pub fn new(pages: Vec<RgbImage>) -> Self {
        Self {
            pages: pages.into_iter().map(Arc::new).collect(),
            page_from: 0,
        }
    }

    /// Create rasters from already shared page images.
    pub fn from_shared(pages: Vec<SharedImage>) -> Self {
        Self {
            pages,
            page_from: 0,
        }
    }

    /// Set the index of the first rendered page within the whole document.
    ///
    /// Reported crop positions are offset by this value.
    pub fn with_page_from(mut self, page_from: usize) -> Self {
        self.page_from = page_from;
        self
    }

    /// Load every page image in `dir`, ordered by file name.
    ///
    /// Files are decoded in parallel.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_page_image(path))
            .collect();
        paths.sort();

        log::debug!(
            "Loading {} page rasters from {}",
            paths.len(),
            dir.as_ref().display()
        );

        let pages = paths
            .par_iter()
            .map(|path| -> Result<SharedImage> { Ok(Arc::new(image::open(path)?.to_rgb8())) })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::from_shared(pages))
    }

    /// Get the number of pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Check if no page is available.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Get the raster of a page by 0-based index.
    pub fn get(&self, index: usize) -> Option<&RgbImage> {
        self.pages.get(index).map(|page| page.as_ref())
    }

    /// Get page dimensions as `(width, height)` in pixels.
    pub fn size(&self, index: usize) -> Option<(u32, u32)> {
        self.get(index).map(|page| page.dimensions())
    }

    /// Get page height in pixels.
    pub fn height(&self, index: usize) -> Option<u32> {
        self.get(index).map(|page| page.height())
    }

    /// Get the index of the first rendered page within the document.
    pub fn page_from(&self) -> usize {
        self.page_from
    }

    /// Map a 0-based document page to a raster index.
    pub fn index_of(&self, page: usize) -> Option<usize> {
        page.checked_sub(self.page_from)
            .filter(|&index| index < self.pages.len())
    }

    /// Get the raster of a 0-based document page.
    pub fn page(&self, page: usize) -> Option<&SharedImage> {
        self.index_of(page).and_then(|index| self.pages.get(index))
    }
}

fn is_page_image(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| PAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_page_rasters_lookup() {
        let rasters = PageRasters::new(vec![
            RgbImage::new(100, 200),
            RgbImage::from_pixel(50, 60, Rgb([1, 2, 3])),
        ]);
        assert_eq!(rasters.len(), 2);
        assert_eq!(rasters.size(1), Some((50, 60)));
        assert_eq!(rasters.height(0), Some(200));
        assert!(rasters.get(2).is_none());
        assert_eq!(rasters.page_from(), 0);
    }

    #[test]
    fn test_document_page_lookup() {
        let rasters = PageRasters::new(vec![RgbImage::new(10, 10), RgbImage::new(20, 20)])
            .with_page_from(3);
        assert_eq!(rasters.index_of(2), None);
        assert_eq!(rasters.index_of(4), Some(1));
        assert_eq!(rasters.index_of(5), None);
        assert_eq!(rasters.page(3).map(|p| p.width()), Some(10));
    }

    #[test]
    fn test_load_dir_orders_by_name() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::new(10, 20)
            .save(dir.path().join("page_0002.png"))
            .unwrap();
        RgbImage::new(30, 40)
            .save(dir.path().join("page_0001.png"))
            .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let rasters = PageRasters::load_dir(dir.path()).unwrap();
        assert_eq!(rasters.len(), 2);
        assert_eq!(rasters.size(0), Some((30, 40)));
        assert_eq!(rasters.size(1), Some((10, 20)));
    }

    #[test]
    fn test_load_dir_corrupt_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page_0001.png"), b"not a png").unwrap();
        assert!(PageRasters::load_dir(dir.path()).is_err());
    }
}
