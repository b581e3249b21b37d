//! Pixel sampling for raster buffers and rendered markup.
//!
//! The colorizer compares the rendered markup with the photo pixel by pixel, so both
//! grids are indexed the same way: pixel `i` is the `channels`-long slice at
//! `i * channels`, row-major.

use image::{DynamicImage, RgbImage, RgbaImage};
use resvg::{tiny_skia, usvg};

use crate::color::Rgb;
use crate::{VectorizeError, VectorizeResult};

/// A decoded image as a flat, row-major channel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl PixelGrid {
    pub fn from_raw(width: u32, height: u32, channels: u8, data: Vec<u8>) -> VectorizeResult<Self> {
        if channels == 0 {
            return Err(VectorizeError::UnsupportedChannelLayout { channels });
        }
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(VectorizeError::PixelBufferSize {
                expected,
                found: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.data.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn pixel(&self, index: usize) -> Option<&[u8]> {
        let size = self.channels as usize;
        self.data.get(index * size..(index + 1) * size)
    }

    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.channels as usize)
    }

    /// Fail unless pixels carry 3 or 4 channels.
    pub fn ensure_color_layout(&self) -> VectorizeResult<()> {
        match self.channels {
            3 | 4 => Ok(()),
            channels => Err(VectorizeError::UnsupportedChannelLayout { channels }),
        }
    }

    /// Opaque comparison color of every pixel, in index order.
    pub fn colors(&self) -> VectorizeResult<Vec<Rgb>> {
        self.ensure_color_layout()?;
        self.pixels().map(Rgb::from_channels).collect()
    }
}

impl From<&RgbImage> for PixelGrid {
    fn from(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            channels: 3,
            data: image.as_raw().clone(),
        }
    }
}

impl From<&RgbaImage> for PixelGrid {
    fn from(image: &RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            channels: 4,
            data: image.as_raw().clone(),
        }
    }
}

/// Sample a decoded image, keeping its channel count (16-bit and float data become 8-bit).
pub fn sample_image(image: &DynamicImage) -> PixelGrid {
    let (width, height) = (image.width(), image.height());
    let (channels, data) = match image.color().channel_count() {
        1 => (1, image.to_luma8().into_raw()),
        2 => (2, image.to_luma_alpha8().into_raw()),
        3 => (3, image.to_rgb8().into_raw()),
        _ => (4, image.to_rgba8().into_raw()),
    };
    PixelGrid {
        width,
        height,
        channels,
        data,
    }
}

/// Decode an encoded raster buffer (PNG, JPEG, ...) into a pixel grid.
pub fn sample_raster(bytes: &[u8]) -> VectorizeResult<PixelGrid> {
    let image = image::load_from_memory(bytes)?;
    Ok(sample_image(&image))
}

/// Render markup into an RGBA pixel grid of exactly `width` x `height`.
pub fn sample_markup(markup: &str, width: u32, height: u32) -> VectorizeResult<PixelGrid> {
    let rendered = render_svg(markup.as_bytes(), Some((width, height)))?;
    Ok(PixelGrid::from(&rendered))
}

/// Render SVG data with straight alpha. Without a target size the intrinsic size is used.
pub fn render_svg(data: &[u8], size: Option<(u32, u32)>) -> VectorizeResult<RgbaImage> {
    let tree = usvg::Tree::from_data(data, &usvg::Options::default())?;
    let intrinsic = tree.size();
    let (width, height) = size.unwrap_or((
        intrinsic.width().ceil() as u32,
        intrinsic.height().ceil() as u32,
    ));

    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| VectorizeError::Markup(format!("cannot render at {width}x{height}")))?;
    let transform = tiny_skia::Transform::from_scale(
        width as f32 / intrinsic.width(),
        height as f32 / intrinsic.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    let mut data = Vec::with_capacity(pixmap.pixels().len() * 4);
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        data.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    RgbaImage::from_raw(width, height, data)
        .ok_or_else(|| VectorizeError::Markup("rendered buffer has the wrong size".to_string()))
}
