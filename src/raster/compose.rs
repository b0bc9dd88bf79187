//! Vertical image stacking.

use std::sync::Arc;

use image::{imageops, RgbImage};

use super::SharedImage;

/// Stack `b` below `a`.
///
/// A missing side yields the other one. Identical images (the same
/// allocation, or the same dimensions and pixels) are not doubled: `a` is
/// returned as is.
pub fn stack(a: Option<&SharedImage>, b: Option<&SharedImage>) -> Option<SharedImage> {
    match (a, b) {
        (None, None) => None,
        (Some(a), None) => Some(Arc::clone(a)),
        (None, Some(b)) => Some(Arc::clone(b)),
        (Some(a), Some(b)) => {
            if Arc::ptr_eq(a, b) || same_pixels(a, b) {
                return Some(Arc::clone(a));
            }
            Some(Arc::new(stack_images(a, b)))
        }
    }
}

/// Paste `a` at the top-left of a new canvas and `b` right below it.
///
/// The canvas is `max(width)` wide and `a.height + b.height` tall; any area
/// not covered by either image stays black.
pub fn stack_images(a: &RgbImage, b: &RgbImage) -> RgbImage {
    let width = a.width().max(b.width());
    let height = a.height() + b.height();

    let mut canvas = RgbImage::new(width, height);
    imageops::replace(&mut canvas, a, 0, 0);
    imageops::replace(&mut canvas, b, 0, i64::from(a.height()));
    canvas
}

fn same_pixels(a: &RgbImage, b: &RgbImage) -> bool {
    a.dimensions() == b.dimensions() && a.as_raw() == b.as_raw()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(width: u32, height: u32, value: u8) -> SharedImage {
        Arc::new(RgbImage::from_pixel(width, height, Rgb([value, value, value])))
    }

    #[test]
    fn test_stack_absent_sides() {
        let img = solid(4, 4, 10);
        assert!(stack(None, None).is_none());
        assert!(Arc::ptr_eq(&stack(Some(&img), None).unwrap(), &img));
        assert!(Arc::ptr_eq(&stack(None, Some(&img)).unwrap(), &img));
    }

    #[test]
    fn test_stack_same_reference() {
        let img = solid(8, 3, 200);
        let result = stack(Some(&img), Some(&img)).unwrap();
        assert_eq!(result.dimensions(), (8, 3));
    }

    #[test]
    fn test_stack_equal_pixels() {
        let a = solid(8, 3, 200);
        let b = solid(8, 3, 200);
        let result = stack(Some(&a), Some(&b)).unwrap();
        assert_eq!(result.dimensions(), (8, 3));
        assert!(Arc::ptr_eq(&result, &a));
    }

    #[test]
    fn test_stack_different_images() {
        let a = solid(10, 4, 50);
        let b = solid(6, 5, 150);
        let result = stack(Some(&a), Some(&b)).unwrap();
        assert_eq!(result.dimensions(), (10, 9));
        assert_eq!(result.get_pixel(0, 0), &Rgb([50, 50, 50]));
        assert_eq!(result.get_pixel(0, 4), &Rgb([150, 150, 150]));
        // Right of the narrower bottom image is unfilled
        assert_eq!(result.get_pixel(9, 8), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_stack_same_size_different_pixels() {
        let a = solid(5, 5, 1);
        let b = solid(5, 5, 2);
        let result = stack(Some(&a), Some(&b)).unwrap();
        assert_eq!(result.dimensions(), (5, 10));
    }
}
