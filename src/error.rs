use thiserror::Error;

/// Result type alias for operations that may fail with [`VectorizeError`].
pub type VectorizeResult<T> = std::result::Result<T, VectorizeError>;

/// Error types that can occur while turning a raster into colored vector markup.
///
/// This enum covers errors from media validation, decoding, tracing, color recovery
/// and markup optimization.
#[derive(Debug, Error)]
pub enum VectorizeError {
    /// The declared mime type is not one of the accepted image types.
    #[error("Unsupported media type: {mime}")]
    UnsupportedMediaType { mime: String },
    /// The media type is accepted but no decoder for it is compiled in.
    #[error("No decoder available for {mime}")]
    DecoderUnavailable { mime: String },
    /// Pixel data with neither 3 nor 4 channels.
    #[error("Unsupported number of channels: {channels}")]
    UnsupportedChannelLayout { channels: u8 },
    /// A raw pixel buffer whose length does not match its dimensions.
    #[error("Pixel buffer holds {found} bytes, expected {expected}")]
    PixelBufferSize { expected: usize, found: usize },
    /// HEIC/HEIF decoding error.
    #[error("HEIC decoding failed: {0}")]
    HeicDecode(String),
    /// Image loading, decoding, or encoding error.
    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),
    /// SVG parsing or rendering error.
    #[error("SVG processing failed: {0}")]
    Svg(#[from] resvg::usvg::Error),
    /// The markup could not be split into shapes.
    #[error("Malformed markup: {0}")]
    Markup(String),
    /// The tracer could not produce markup.
    #[error("Tracing failed: {0}")]
    TraceFailure(String),
    /// The optimizer could not minify the markup.
    #[error("Optimization failed: {0}")]
    OptimizeFailure(String),
    /// A color string that is not a hex or rgb(a) expression.
    #[error("Invalid color: {0}")]
    InvalidColor(String),
    /// The rendered markup does not line up with the source raster.
    #[error("Rendered markup size {found:?} does not match raster size {expected:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },
    /// File system I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
