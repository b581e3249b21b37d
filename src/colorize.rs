//! Palette recovery: replaces the placeholder fills of solid-gray markup with colors
//! taken from the original photo.
//!
//! The markup is rendered at the photo's size, every rendered pixel is bucketed to the
//! nearest placeholder color, and each bucket's photo pixels are quantized to find the
//! color that dominates that region.

use tracing::{debug, warn};

use crate::classify::NearestColor;
use crate::color::{Rgb, hex_to_rgb};
use crate::config::ColorizeOptions;
use crate::markup::{FILL, SvgDocument};
use crate::quantize::dominant_color;
use crate::sample::{PixelGrid, sample_markup};
use crate::{VectorizeError, VectorizeResult};

/// One placeholder color and the photo region it was mapped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorBucket {
    pub placeholder: Rgb,
    /// Pixel indices, shared by the rendered markup and the photo.
    pub pixel_indices: Vec<usize>,
    pub recovered: Rgb,
}

/// Recolor `markup` from `original`, which must use a 3- or 4-channel layout.
pub fn colorize(
    markup: &str,
    original: &PixelGrid,
    options: &ColorizeOptions,
) -> VectorizeResult<String> {
    let mut doc = SvgDocument::parse(markup)?;
    colorize_document(&mut doc, original, options)?;
    Ok(doc.to_string())
}

/// In-place variant of [`colorize`]; returns the buckets it applied.
pub fn colorize_document(
    doc: &mut SvgDocument,
    original: &PixelGrid,
    options: &ColorizeOptions,
) -> VectorizeResult<Vec<ColorBucket>> {
    let buckets = recover_buckets(doc, original, options)?;

    for shape in doc.shapes_mut() {
        let Some(fill) = shape.fill().and_then(|fill| hex_to_rgb(fill).ok()) else {
            continue;
        };
        if let Some(bucket) = buckets.iter().find(|bucket| bucket.placeholder == fill) {
            shape.set_attribute(FILL, bucket.recovered.to_hex());
        }
    }

    Ok(buckets)
}

/// Distinct solid fills of the shapes, in document order.
pub fn placeholder_colors(doc: &SvgDocument) -> NearestColor {
    NearestColor::new(
        doc.shapes()
            .iter()
            .filter_map(|shape| shape.fill())
            .filter_map(|fill| hex_to_rgb(fill).ok()),
    )
}

/// Build the color buckets of `doc` against `original` without touching the markup.
pub fn recover_buckets(
    doc: &SvgDocument,
    original: &PixelGrid,
    options: &ColorizeOptions,
) -> VectorizeResult<Vec<ColorBucket>> {
    let classifier = placeholder_colors(doc);
    if classifier.palette().is_empty() {
        debug!("no placeholder fills to recolor");
        return Ok(Vec::new());
    }
    original.ensure_color_layout()?;

    let rendered = sample_markup(&doc.to_string(), original.width(), original.height())?;
    if rendered.dimensions() != original.dimensions() {
        return Err(VectorizeError::DimensionMismatch {
            expected: original.dimensions(),
            found: rendered.dimensions(),
        });
    }
    rendered.ensure_color_layout()?;

    let mut indices: Vec<Vec<usize>> = vec![Vec::new(); classifier.palette().len()];
    for (index, pixel) in rendered.pixels().enumerate() {
        let color = Rgb::from_channels(pixel)?;
        if let Some(bucket) = classifier.nearest_index(color) {
            indices[bucket].push(index);
        }
    }

    classifier
        .palette()
        .iter()
        .zip(indices)
        .map(|(&placeholder, pixel_indices)| -> VectorizeResult<ColorBucket> {
            let pixels = pixel_indices
                .iter()
                .filter_map(|&index| original.pixel(index))
                .map(Rgb::from_channels)
                .collect::<VectorizeResult<Vec<_>>>()?;
            let recovered = match dominant_color(&pixels, options.palette_size) {
                Some(color) => color,
                None => {
                    warn!(%placeholder, "no pixels rendered for fill, keeping placeholder");
                    placeholder
                }
            };
            debug!(%placeholder, %recovered, pixels = pixels.len(), "recovered bucket color");
            Ok(ColorBucket {
                placeholder,
                pixel_indices,
                recovered,
            })
        })
        .collect()
}
