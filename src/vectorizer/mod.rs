use image::GrayImage;

use crate::VectorizeResult;

/// An algorithm that turns a luminance raster into vector markup.
pub trait RasterTracer {
    type Options;
    type Output;

    fn trace(&self, luminance: &GrayImage, options: &Self::Options) -> VectorizeResult<Self::Output>;
}

pub mod posterize;
pub mod vtracer;
