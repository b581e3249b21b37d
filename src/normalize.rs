//! Upload validation and raster normalization.
//!
//! Every accepted upload is decoded, flattened onto white and shrunk so that its longer
//! side fits the configured maximum. The result is the raster the tracer and the
//! colorizer share.

use std::fmt;
use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat, Rgb as ImageRgb, RgbImage, RgbaImage};
use resvg::usvg;
use tracing::debug;

use crate::color::{Rgba, blend_over_white};
use crate::config::NormalizeSettings;
use crate::sample::render_svg;
use crate::{VectorizeError, VectorizeResult};

/// Image types accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Jpeg,
    Png,
    Webp,
    Gif,
    Svg,
    Heic,
}

impl MediaType {
    /// Validate a declared mime type.
    pub fn from_mime(mime: &str) -> VectorizeResult<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpg" | "image/jpeg" => Ok(MediaType::Jpeg),
            "image/png" => Ok(MediaType::Png),
            "image/webp" => Ok(MediaType::Webp),
            "image/gif" => Ok(MediaType::Gif),
            "image/svg+xml" => Ok(MediaType::Svg),
            "image/heic" => Ok(MediaType::Heic),
            _ => Err(VectorizeError::UnsupportedMediaType {
                mime: mime.to_string(),
            }),
        }
    }

    /// Guess the media type from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(MediaType::Jpeg),
            "png" => Some(MediaType::Png),
            "webp" => Some(MediaType::Webp),
            "gif" => Some(MediaType::Gif),
            "svg" => Some(MediaType::Svg),
            "heic" | "heif" => Some(MediaType::Heic),
            _ => None,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::Webp => "image/webp",
            MediaType::Gif => "image/gif",
            MediaType::Svg => "image/svg+xml",
            MediaType::Heic => "image/heic",
        }
    }

    fn image_format(self) -> Option<ImageFormat> {
        match self {
            MediaType::Jpeg => Some(ImageFormat::Jpeg),
            MediaType::Png => Some(ImageFormat::Png),
            MediaType::Webp => Some(ImageFormat::WebP),
            MediaType::Gif => Some(ImageFormat::Gif),
            MediaType::Svg | MediaType::Heic => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// A decoded upload, flattened onto white and capped in size.
#[derive(Debug, Clone)]
pub struct NormalizedRaster {
    image: RgbImage,
}

impl NormalizedRaster {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Always 3: alpha is gone after flattening.
    pub fn channels(&self) -> u8 {
        3
    }

    /// Lossless PNG encoding of the raster, the form the colorizer samples.
    pub fn to_png(&self) -> VectorizeResult<Vec<u8>> {
        let mut bytes = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }
}

/// Decode `bytes` and produce the normalized raster.
pub fn normalize(
    bytes: &[u8],
    media_type: MediaType,
    settings: &NormalizeSettings,
) -> VectorizeResult<NormalizedRaster> {
    let rgba = match media_type {
        MediaType::Svg => {
            let tree = usvg::Tree::from_data(bytes, &usvg::Options::default())?;
            let size = tree.size();
            let target = fit_within(
                size.width().ceil().max(1.0) as u32,
                size.height().ceil().max(1.0) as u32,
                settings.max_dimension,
            );
            render_svg(bytes, Some(target))?
        }
        MediaType::Heic => decode_heic(bytes)?,
        other => {
            let format = other.image_format().ok_or_else(|| VectorizeError::DecoderUnavailable {
                mime: other.mime().to_string(),
            })?;
            image::load_from_memory_with_format(bytes, format)?.to_rgba8()
        }
    };

    let flattened = flatten_onto_white(&rgba);
    let (width, height) = flattened.dimensions();
    let (target_w, target_h) = fit_within(width, height, settings.max_dimension);
    let image = if (target_w, target_h) == (width, height) {
        flattened
    } else {
        DynamicImage::ImageRgb8(flattened)
            .resize_exact(target_w, target_h, settings.resize_filter)
            .to_rgb8()
    };

    debug!(
        %media_type,
        from = ?(width, height),
        to = ?image.dimensions(),
        "normalized raster"
    );
    Ok(NormalizedRaster::new(image))
}

/// Decode the primary image of a HEIC/HEIF container with its alpha channel.
#[cfg(feature = "heic")]
fn decode_heic(bytes: &[u8]) -> VectorizeResult<RgbaImage> {
    use libheif_rs::{ColorSpace, HeifContext, HeifError, LibHeif, RgbChroma};

    let heic_error = |e: HeifError| VectorizeError::HeicDecode(e.to_string());
    let context = HeifContext::read_from_bytes(bytes).map_err(heic_error)?;
    let handle = context.primary_image_handle().map_err(heic_error)?;
    let image = LibHeif::new()
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgba), None)
        .map_err(heic_error)?;

    let planes = image.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| VectorizeError::HeicDecode("no interleaved RGBA plane".to_string()))?;
    let (width, height) = (plane.width, plane.height);
    let row_len = width as usize * 4;
    let mut data = Vec::with_capacity(row_len * height as usize);
    // rows are padded to `stride` bytes
    for row in plane.data.chunks(plane.stride.max(1)).take(height as usize) {
        let pixels = row
            .get(..row_len)
            .ok_or_else(|| VectorizeError::HeicDecode("row shorter than image width".to_string()))?;
        data.extend_from_slice(pixels);
    }
    RgbaImage::from_raw(width, height, data)
        .ok_or_else(|| VectorizeError::HeicDecode("truncated pixel data".to_string()))
}

#[cfg(not(feature = "heic"))]
fn decode_heic(_bytes: &[u8]) -> VectorizeResult<RgbaImage> {
    Err(VectorizeError::DecoderUnavailable {
        mime: MediaType::Heic.mime().to_string(),
    })
}

/// Composite every pixel over an opaque white background.
pub fn flatten_onto_white(image: &RgbaImage) -> RgbImage {
    let (w, h) = image.dimensions();
    let mut out = RgbImage::new(w, h);
    for (src, dst) in image.pixels().zip(out.pixels_mut()) {
        let [r, g, b, a] = src.0;
        let color = blend_over_white(Rgba::new(r, g, b, f64::from(a) / 255.0));
        *dst = ImageRgb([color.r, color.g, color.b]);
    }
    out
}

/// Scale `(width, height)` so the longer side is at most `max_dimension`, keeping the
/// aspect ratio. Never enlarges.
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let largest = width.max(height);
    if largest <= max_dimension || largest == 0 {
        return (width, height);
    }
    let ratio = f64::from(max_dimension) / f64::from(largest);
    let scale = |v: u32| ((f64::from(v) * ratio).round() as u32).max(1);
    (scale(width), scale(height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::sample_raster;
    use image::Rgba as ImageRgba;

    fn png_bytes(image: RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    mod media_type {
        use super::*;

        #[test]
        fn accepts_known_types() {
            assert_eq!(MediaType::from_mime("image/jpg").unwrap(), MediaType::Jpeg);
            assert_eq!(MediaType::from_mime("image/JPEG").unwrap(), MediaType::Jpeg);
            assert_eq!(MediaType::from_mime("image/svg+xml").unwrap(), MediaType::Svg);
            assert_eq!(MediaType::from_mime("image/heic").unwrap(), MediaType::Heic);
        }

        #[test]
        fn rejects_unknown_types() {
            let err = MediaType::from_mime("application/pdf").unwrap_err();
            assert!(matches!(err, VectorizeError::UnsupportedMediaType { .. }));
        }

        #[test]
        fn guesses_from_extension() {
            assert_eq!(MediaType::from_path(Path::new("a/b.PNG")), Some(MediaType::Png));
            assert_eq!(MediaType::from_path(Path::new("noext")), None);
        }
    }

    mod fit_within {
        use super::*;

        #[test]
        fn small_images_are_untouched() {
            assert_eq!(fit_within(640, 480, 1000), (640, 480));
        }

        #[test]
        fn longer_side_is_capped() {
            assert_eq!(fit_within(4000, 3000, 1000), (1000, 750));
            assert_eq!(fit_within(1500, 3000, 1000), (500, 1000));
        }

        #[test]
        fn thin_images_keep_one_pixel() {
            assert_eq!(fit_within(5000, 1, 1000), (1000, 1));
        }
    }

    mod normalize {
        use super::*;

        #[test]
        fn transparent_pixels_become_white() {
            let mut image = RgbaImage::from_pixel(2, 1, ImageRgba([255, 0, 0, 255]));
            image.put_pixel(1, 0, ImageRgba([0, 0, 0, 0]));
            let raster = normalize(&png_bytes(image), MediaType::Png, &NormalizeSettings::default())
                .unwrap();
            assert_eq!(raster.image().get_pixel(0, 0).0, [255, 0, 0]);
            assert_eq!(raster.image().get_pixel(1, 0).0, [255, 255, 255]);
            assert_eq!(raster.channels(), 3);
        }

        #[test]
        fn large_images_are_shrunk() {
            let image = RgbaImage::from_pixel(40, 20, ImageRgba([0, 0, 255, 255]));
            let settings = NormalizeSettings {
                max_dimension: 10,
                ..NormalizeSettings::default()
            };
            let raster = normalize(&png_bytes(image), MediaType::Png, &settings).unwrap();
            assert_eq!(raster.dimensions(), (10, 5));
        }

        #[test]
        fn svg_uploads_are_rendered() {
            let svg = br##"<svg xmlns="http://www.w3.org/2000/svg" width="6" height="3"><rect width="6" height="3" fill="#00ff00"/></svg>"##;
            let raster = normalize(svg, MediaType::Svg, &NormalizeSettings::default()).unwrap();
            assert_eq!(raster.dimensions(), (6, 3));
            assert_eq!(raster.image().get_pixel(3, 1).0, [0, 255, 0]);
        }

        #[test]
        #[cfg(not(feature = "heic"))]
        fn heic_has_no_decoder() {
            let err = normalize(b"", MediaType::Heic, &NormalizeSettings::default()).unwrap_err();
            assert!(matches!(err, VectorizeError::DecoderUnavailable { .. }));
        }

        #[test]
        #[cfg(feature = "heic")]
        fn heic_garbage_fails_to_decode() {
            let err =
                normalize(&[0; 16], MediaType::Heic, &NormalizeSettings::default()).unwrap_err();
            assert!(matches!(err, VectorizeError::HeicDecode(_)));
        }

        #[test]
        #[cfg(feature = "heic")]
        fn heic_is_flattened_and_shrunk() {
            use libheif_rs::{
                Channel, ColorSpace, CompressionFormat, EncoderQuality, HeifContext, Image,
                LibHeif, RgbChroma,
            };

            let (width, height) = (64u32, 32u32);
            let mut image = Image::new(width, height, ColorSpace::Rgb(RgbChroma::Rgb)).unwrap();
            image
                .create_plane(Channel::Interleaved, width, height, 8)
                .unwrap();
            let planes = image.planes_mut();
            let plane = planes.interleaved.unwrap();
            let stride = plane.stride;
            for y in 0..height as usize {
                for x in 0..width as usize {
                    plane.data[y * stride + x * 3..][..3].copy_from_slice(&[0, 0, 255]);
                }
            }

            let lib_heif = LibHeif::new();
            // libheif may be built without an HEVC encoder
            let Ok(mut encoder) = lib_heif.encoder_for_format(CompressionFormat::Hevc) else {
                return;
            };
            encoder.set_quality(EncoderQuality::LossLess).unwrap();
            let mut context = HeifContext::new().unwrap();
            context.encode_image(&image, &mut encoder, None).unwrap();
            let bytes = context.write_to_bytes().unwrap();

            let settings = NormalizeSettings {
                max_dimension: 16,
                ..NormalizeSettings::default()
            };
            let raster = normalize(&bytes, MediaType::Heic, &settings).unwrap();
            assert_eq!(raster.dimensions(), (16, 8));
            let [r, g, b] = raster.image().get_pixel(8, 4).0;
            assert!(r < 40 && g < 40 && b > 200, "got {r},{g},{b}");
        }

        #[test]
        fn png_samples_back_losslessly() {
            let image = RgbaImage::from_pixel(3, 3, ImageRgba([12, 34, 56, 255]));
            let raster = normalize(&png_bytes(image), MediaType::Png, &NormalizeSettings::default())
                .unwrap();
            let grid = sample_raster(&raster.to_png().unwrap()).unwrap();
            assert_eq!(grid.dimensions(), raster.dimensions());
            assert_eq!(grid.channels(), 3);
            assert!(grid.pixels().all(|pixel| pixel == [12, 34, 56]));
        }
    }
}
