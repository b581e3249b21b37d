use image::GrayImage;
use imageproc::contrast::{ThresholdType, threshold};
use tracing::debug;
use visioncortex::PathSimplifyMode;
use vtracer::{ColorImage, ColorMode, Config, Hierarchical, SvgFile, convert};

use crate::markup::{FILL, FILL_OPACITY, SvgDocument};
use crate::{VectorizeError, VectorizeResult};

use super::RasterTracer;
use super::posterize::{layer_opacities, luminance_bands};

/// Options handed to VTracer for every traced layer.
#[derive(Debug, Clone)]
pub struct TraceOptions {
    pub hierarchical: Hierarchical,
    pub simplify_mode: PathSimplifyMode,
    /// Clusters with fewer than `filter_speckle²` pixels are dropped.
    pub filter_speckle: usize,
    pub corner_threshold: i32,
    pub length_threshold: f64,
    pub max_iterations: usize,
    pub splice_threshold: i32,
    pub path_precision: Option<u32>,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            hierarchical: Hierarchical::Stacked,
            simplify_mode: PathSimplifyMode::Spline,
            filter_speckle: 2,
            corner_threshold: 60,
            length_threshold: 4.0,
            max_iterations: 10,
            splice_threshold: 45,
            path_precision: Some(2),
        }
    }
}

/// Trace a ColorImage into an SVG using VTracer's binary mode.
///
/// Pixels whose red channel is below 128 are foreground.
pub fn trace(img: ColorImage, options: &TraceOptions) -> VectorizeResult<SvgFile> {
    let cfg = Config {
        color_mode: ColorMode::Binary,
        hierarchical: options.hierarchical.clone(),
        mode: options.simplify_mode,
        filter_speckle: options.filter_speckle,
        corner_threshold: options.corner_threshold,
        length_threshold: options.length_threshold,
        max_iterations: options.max_iterations,
        splice_threshold: options.splice_threshold,
        path_precision: options.path_precision,
        ..Config::default()
    };

    convert(img, cfg).map_err(VectorizeError::TraceFailure)
}

/// Black for pixels with luminance `<= at_or_below`, white elsewhere.
pub fn foreground_color_image(luminance: &GrayImage, at_or_below: u8) -> ColorImage {
    let mask = threshold(luminance, at_or_below, ThresholdType::Binary);
    let (w, h) = mask.dimensions();
    let mut rgba = Vec::with_capacity(4 * w as usize * h as usize);
    for pixel in mask.pixels() {
        let v = pixel.0[0];
        rgba.extend_from_slice(&[v, v, v, 255]);
    }

    ColorImage {
        pixels: rgba,
        width: w as usize,
        height: h as usize,
    }
}

/// Fully opaque black shapes for every pixel at or below a luminance threshold.
#[derive(Debug, Clone, Copy)]
pub struct BinaryTracer {
    pub threshold: u8,
}

impl Default for BinaryTracer {
    fn default() -> Self {
        Self { threshold: 128 }
    }
}

impl RasterTracer for BinaryTracer {
    type Options = TraceOptions;
    type Output = String;

    fn trace(&self, luminance: &GrayImage, options: &Self::Options) -> VectorizeResult<String> {
        let svg_file = trace(foreground_color_image(luminance, self.threshold), options)?;
        Ok(svg_file.to_string())
    }
}

/// Stacked black layers, one per luminance band, each carrying a `fill-opacity`.
#[derive(Debug, Clone, Copy)]
pub struct PosterizeTracer {
    pub steps: u8,
}

impl Default for PosterizeTracer {
    fn default() -> Self {
        Self { steps: 4 }
    }
}

impl RasterTracer for PosterizeTracer {
    type Options = TraceOptions;
    type Output = String;

    fn trace(&self, luminance: &GrayImage, options: &Self::Options) -> VectorizeResult<String> {
        let (width, height) = luminance.dimensions();
        let bands = luminance_bands(luminance, self.steps);
        let intensities: Vec<f64> = bands.iter().map(|band| band.intensity).collect();
        let opacities = layer_opacities(&intensities);

        let mut out = format!(
            r#"<svg version="1.1" xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}">"#
        );
        for (band, opacity) in bands.iter().zip(opacities) {
            if opacity == 0.0 || band.upper == 0 {
                continue;
            }
            let layer = trace(foreground_color_image(luminance, band.upper - 1), options)?;
            let mut doc = SvgDocument::parse(&layer.to_string())?;
            if doc.shape_count() == 0 {
                continue;
            }
            debug!(upper = band.upper, opacity, shapes = doc.shape_count(), "traced layer");
            let opacity = format!("{opacity:.3}");
            for shape in doc.shapes_mut() {
                shape.set_attribute(FILL, "black");
                shape.set_attribute(FILL_OPACITY, opacity.as_str());
                out.push_str(&shape.to_string());
            }
        }
        out.push_str("</svg>");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, RgbImage, imageops::grayscale};

    fn red_square_on_white() -> GrayImage {
        let image = RgbImage::from_fn(7, 7, |x, y| {
            if (2..5).contains(&x) && (2..5).contains(&y) {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        });
        grayscale(&image)
    }

    mod foreground_color_image {
        use super::*;

        #[test]
        fn dark_pixels_become_black() {
            let mut input = GrayImage::from_pixel(3, 1, Luma([255]));
            input.put_pixel(0, 0, Luma([10]));
            input.put_pixel(1, 0, Luma([128]));
            let result = foreground_color_image(&input, 128);
            assert_eq!(result.width, 3);
            assert_eq!(result.pixels[0..4], [0, 0, 0, 255]);
            assert_eq!(result.pixels[4..8], [0, 0, 0, 255]);
            assert_eq!(result.pixels[8..12], [255, 255, 255, 255]);
        }
    }

    mod binary_tracer {
        use super::*;

        #[test]
        fn red_square_traces_to_one_opaque_shape() {
            let svg = BinaryTracer::default()
                .trace(&red_square_on_white(), &TraceOptions::default())
                .unwrap();
            let doc = SvgDocument::parse(&svg).unwrap();
            assert_eq!(doc.shape_count(), 1);
            assert!(doc.shapes()[0].attribute(FILL_OPACITY).is_none());
        }

        #[test]
        fn blank_image_has_no_shapes() {
            let blank = GrayImage::from_pixel(5, 5, Luma([255]));
            let svg = BinaryTracer::default()
                .trace(&blank, &TraceOptions::default())
                .unwrap();
            assert_eq!(SvgDocument::parse(&svg).unwrap().shape_count(), 0);
        }
    }

    mod posterize_tracer {
        use super::*;

        /// Black left half, mid-gray right half, white border.
        fn two_tone() -> GrayImage {
            GrayImage::from_fn(12, 8, |x, y| {
                if x == 0 || y == 0 || x == 11 || y == 7 {
                    Luma([255])
                } else if x < 6 {
                    Luma([0])
                } else {
                    Luma([128])
                }
            })
        }

        #[test]
        fn layers_carry_black_fill_and_opacity() {
            let svg = PosterizeTracer::default()
                .trace(&two_tone(), &TraceOptions::default())
                .unwrap();
            let doc = SvgDocument::parse(&svg).unwrap();
            assert!(doc.shape_count() >= 2);

            let mut opacities: Vec<&str> = doc
                .shapes()
                .iter()
                .map(|shape| {
                    assert_eq!(shape.fill(), Some("black"));
                    shape.attribute(FILL_OPACITY).unwrap()
                })
                .collect();
            opacities.dedup();
            assert_eq!(opacities.len(), 2);
            assert_eq!(opacities[1], "1.000");
            let lighter: f64 = opacities[0].parse().unwrap();
            assert!((0.45..0.55).contains(&lighter), "got {lighter}");
        }

        #[test]
        fn output_keeps_raster_size() {
            let svg = PosterizeTracer::default()
                .trace(&two_tone(), &TraceOptions::default())
                .unwrap();
            assert!(svg.starts_with("<svg"));
            assert!(svg.contains(r#"width="12" height="8""#));
        }

        #[test]
        fn white_image_is_an_empty_document() {
            let blank = GrayImage::from_pixel(4, 4, Luma([255]));
            let svg = PosterizeTracer::default()
                .trace(&blank, &TraceOptions::default())
                .unwrap();
            assert_eq!(SvgDocument::parse(&svg).unwrap().shape_count(), 0);
        }
    }
}
