//! Region cropping with cross-page stitching and context padding.
//!
//! Every region decoded from a position tag is cut out of its page raster at
//! a common width so the pieces line up, then the pieces are stacked on a
//! light gray canvas. A strip above the first region and a strip below the
//! last one are added dimmed, so a reader sees what surrounds the content
//! without mistaking it for the content itself.

use image::{imageops, Rgb, RgbImage};

use super::PageRasters;
use crate::model::ChunkPosition;
use crate::position::{self, DecodedRegion};

/// Height of the context strips above and below the content, in pixels.
pub const CONTEXT_HEIGHT: f32 = 120.0;

/// Gap between stacked pieces, in pixels.
pub const PIECE_GAP: u32 = 6;

/// Canvas background.
pub const CROP_BACKGROUND: Rgb<u8> = Rgb([245, 245, 245]);

/// Minimum crop width, in pixels.
const MIN_WIDTH: f32 = 6.0;

/// Minimum height given to degenerate regions, in pixels.
const MIN_HEIGHT: f32 = 2.0;

/// Composed image of a unit's regions.
#[derive(Debug, Clone)]
pub struct CropResult {
    /// The stacked pieces
    pub image: RgbImage,
    /// Pixel boxes actually cropped, context strips excluded
    pub positions: Vec<ChunkPosition>,
}

struct Piece {
    image: RgbImage,
    context: bool,
}

/// Crop the regions tagged in `text` out of `rasters`.
///
/// Returns `None` when no tag decodes, no raster is available, or no region
/// lies on an available page.
pub fn crop(text: &str, rasters: &PageRasters) -> Option<CropResult> {
    let decoded = position::decode(text);
    if decoded.is_empty() {
        return None;
    }
    if rasters.is_empty() {
        log::warn!("crop called without page rasters; skipping image generation");
        return None;
    }

    let regions = valid_regions(decoded, rasters);
    if regions.is_empty() {
        log::warn!("no valid positions after filtering; skipping crop");
        return None;
    }

    let max_width = regions
        .iter()
        .map(DecodedRegion::width)
        .fold(MIN_WIDTH, f32::max);

    let plan = with_context(regions, rasters)?;

    let mut pieces = Vec::new();
    let mut positions = Vec::new();
    for (region, context) in &plan {
        crop_region(
            region,
            *context,
            max_width,
            rasters,
            &mut pieces,
            &mut positions,
        );
    }

    if pieces.is_empty() {
        return None;
    }

    Some(CropResult {
        image: compose(&pieces),
        positions,
    })
}

/// Keep regions with at least one rendered page, with pages mapped to
/// raster indices.
fn valid_regions(decoded: Vec<DecodedRegion>, rasters: &PageRasters) -> Vec<DecodedRegion> {
    decoded
        .into_iter()
        .filter_map(|mut region| {
            if region.pages.is_empty() {
                log::warn!("empty page index list in crop; skipping this position");
                return None;
            }
            let requested = std::mem::take(&mut region.pages);
            region.pages = requested
                .iter()
                .filter_map(|&page| rasters.index_of(page))
                .collect();
            if region.pages.is_empty() {
                log::warn!(
                    "all page indices {:?} out of range for {} pages from {}; skipping",
                    requested,
                    rasters.len(),
                    rasters.page_from()
                );
                return None;
            }
            Some(region)
        })
        .collect()
}

/// Surround the content regions with a leading and a trailing context strip.
fn with_context(
    regions: Vec<DecodedRegion>,
    rasters: &PageRasters,
) -> Option<Vec<(DecodedRegion, bool)>> {
    let first = regions.first()?;
    let leading = DecodedRegion {
        pages: vec![first.pages[0]],
        x0: first.x0,
        x1: first.x1,
        top: (first.top - CONTEXT_HEIGHT).max(0.0),
        bottom: (first.top - PIECE_GAP as f32).max(0.0),
    };

    let last = regions.last()?;
    let last_page = *last.pages.last()?;
    let Some(last_height) = rasters.height(last_page) else {
        log::warn!("last page index {} has no raster; skipping crop", last_page);
        return None;
    };
    let last_height = last_height as f32;
    let trailing = DecodedRegion {
        pages: vec![last_page],
        x0: last.x0,
        x1: last.x1,
        top: last_height.min(last.bottom + PIECE_GAP as f32),
        bottom: last_height.min(last.bottom + CONTEXT_HEIGHT),
    };

    let mut plan = Vec::with_capacity(regions.len() + 2);
    plan.push((leading, true));
    plan.extend(regions.into_iter().map(|region| (region, false)));
    plan.push((trailing, true));
    Some(plan)
}

fn crop_region(
    region: &DecodedRegion,
    context: bool,
    max_width: f32,
    rasters: &PageRasters,
    pieces: &mut Vec<Piece>,
    positions: &mut Vec<ChunkPosition>,
) {
    let left = region.x0;
    let right = left + max_width;
    // A multi-page region's bottom is measured on its last page.
    let mut bottom = if region.pages.len() == 1 && region.bottom <= region.top {
        region.top + MIN_HEIGHT
    } else {
        region.bottom
    };

    for &page in &region.pages[1..] {
        match page.checked_sub(1).and_then(|prev| rasters.height(prev)) {
            Some(height) => bottom += height as f32,
            None => log::warn!(
                "page index {} has no preceding raster; skipping height accumulation",
                page
            ),
        }
    }

    let first_page = region.pages[0];
    let Some(page) = rasters.get(first_page) else {
        log::warn!("base page index {} has no raster; skipping segment", first_page);
        return;
    };
    let page_height = page.height() as f32;
    if let Some((image, bounds)) = crop_clamped(page, left, region.top, right, bottom) {
        if !context {
            positions.push(ChunkPosition::from_bounds(
                first_page + rasters.page_from(),
                bounds,
            ));
        }
        pieces.push(Piece { image, context });
    }
    bottom -= page_height;

    for &page_index in &region.pages[1..] {
        if bottom <= 0.0 {
            break;
        }
        let Some(page) = rasters.get(page_index) else {
            log::warn!("page index {} has no raster; skipping page", page_index);
            continue;
        };
        if let Some((image, bounds)) = crop_clamped(page, left, 0.0, right, bottom) {
            if !context {
                positions.push(ChunkPosition::from_bounds(
                    page_index + rasters.page_from(),
                    bounds,
                ));
            }
            pieces.push(Piece { image, context });
        }
        bottom -= page.height() as f32;
    }
}

/// Crop a box clamped to the page; `None` when nothing of it is on the page.
fn crop_clamped(
    page: &RgbImage,
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
) -> Option<(RgbImage, [u32; 4])> {
    let clamp_x = |v: f32| (v.max(0.0) as u32).min(page.width());
    let clamp_y = |v: f32| (v.max(0.0) as u32).min(page.height());

    let (left, right) = (clamp_x(x0), clamp_x(x1));
    let (top, bottom) = (clamp_y(y0), clamp_y(y1));
    if right <= left || bottom <= top {
        return None;
    }

    let image = imageops::crop_imm(page, left, top, right - left, bottom - top).to_image();
    Some((image, [left, right, top, bottom]))
}

fn compose(pieces: &[Piece]) -> RgbImage {
    let width = pieces.iter().map(|p| p.image.width()).max().unwrap_or(0);
    let height = pieces.iter().map(|p| p.image.height() + PIECE_GAP).sum();

    let mut canvas = RgbImage::from_pixel(width, height, CROP_BACKGROUND);
    let mut y = 0u32;
    for piece in pieces {
        if piece.context {
            imageops::replace(&mut canvas, &dimmed(&piece.image), 0, i64::from(y));
        } else {
            imageops::replace(&mut canvas, &piece.image, 0, i64::from(y));
        }
        y += piece.image.height() + PIECE_GAP;
    }
    canvas
}

/// Darken to roughly half brightness, as if covered by a 50% black overlay.
fn dimmed(image: &RgbImage) -> RgbImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = ((u32::from(*channel) * 127 + 127) / 255) as u8;
        }
    }
    out
}
