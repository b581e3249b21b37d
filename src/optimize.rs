//! Markup minification through `usvg`.

use resvg::usvg;

use crate::{VectorizeError, VectorizeResult};

#[derive(Debug, Clone)]
pub struct OptimizeOptions {
    /// Decimal places kept for path coordinates.
    pub coordinates_precision: u8,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            coordinates_precision: 3,
        }
    }
}

/// Parse `markup` and write it back in usvg's compact form.
///
/// Geometry and fills survive; comments, whitespace and the XML prolog do not.
pub fn optimize_svg(markup: &str, options: &OptimizeOptions) -> VectorizeResult<String> {
    let tree = usvg::Tree::from_str(markup, &usvg::Options::default())
        .map_err(|e| VectorizeError::OptimizeFailure(e.to_string()))?;

    let write_options = usvg::WriteOptions {
        indent: usvg::Indent::None,
        attributes_indent: usvg::Indent::None,
        coordinates_precision: options.coordinates_precision,
        ..Default::default()
    };

    Ok(tree.to_string(&write_options))
}
