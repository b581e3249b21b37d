//! Opacity-stack resolution: turns posterized markup whose shapes only carry
//! `fill-opacity` into markup with solid gray fills.

use tracing::{debug, warn};

use crate::VectorizeResult;
use crate::color::{Rgb, Rgba, blend_over_white, combine_opacity};
use crate::config::{CohortOrder, ResolveOptions};
use crate::markup::{FILL, FILL_OPACITY, SvgDocument};

/// Fill value the posterizer emits as a placeholder; removed during resolution.
const PLAIN_BLACK: &str = "black";

/// A distinct `fill-opacity` value and the solid gray it resolves to.
#[derive(Debug, Clone, PartialEq)]
pub struct OpacityLevel {
    /// Attribute text exactly as found in the markup.
    pub attribute: String,
    pub opacity: f64,
    /// Opacity of this layer stacked with the rest of its cohort.
    pub true_opacity: f64,
    pub color: Rgb,
}

/// Resolve every `fill-opacity` in `markup` to a solid fill.
pub fn resolve_opacity_stack(markup: &str, options: &ResolveOptions) -> VectorizeResult<String> {
    let mut doc = SvgDocument::parse(markup)?;
    let levels = resolve_document(&mut doc, options);
    debug!(levels = levels.len(), shapes = doc.shape_count(), "resolved opacity stack");
    Ok(doc.to_string())
}

/// In-place variant of [`resolve_opacity_stack`]; returns the levels it applied.
pub fn resolve_document(doc: &mut SvgDocument, options: &ResolveOptions) -> Vec<OpacityLevel> {
    let levels = opacity_levels(doc, options.cohort_order);

    for shape in doc.shapes_mut() {
        if shape.fill() == Some(PLAIN_BLACK) {
            shape.remove_attribute(FILL);
        }
        let Some(attribute) = shape.attribute(FILL_OPACITY) else {
            continue;
        };
        if let Some(level) = levels.iter().find(|level| level.attribute == attribute) {
            shape.replace_attribute(FILL_OPACITY, FILL, level.color.to_hex());
        }
    }

    levels
}

/// Collect the distinct opacity values of `doc` and derive their solid grays.
///
/// With [`CohortOrder::ByOpacity`] the result is sorted from most to least opaque; with
/// [`CohortOrder::DocumentOrder`] it follows first appearance in the document.
pub fn opacity_levels(doc: &SvgDocument, order: CohortOrder) -> Vec<OpacityLevel> {
    let mut distinct: Vec<(String, f64)> = Vec::new();
    for shape in doc.shapes() {
        let Some(attribute) = shape.attribute(FILL_OPACITY) else {
            continue;
        };
        if distinct.iter().any(|(seen, _)| seen == attribute) {
            continue;
        }
        match attribute.trim().parse::<f64>() {
            Ok(opacity) if opacity.is_finite() => {
                distinct.push((attribute.to_string(), opacity.clamp(0.0, 1.0)))
            }
            _ => warn!(attribute, "ignoring unparseable fill-opacity"),
        }
    }

    let fold = |cohort: &[(String, f64)]| {
        cohort
            .iter()
            .fold(0.0, |acc, (_, opacity)| combine_opacity(acc, *opacity))
    };

    let cohorts: Vec<f64> = match order {
        CohortOrder::ByOpacity => {
            distinct.sort_by(|a, b| b.1.total_cmp(&a.1));
            (0..distinct.len()).map(|i| fold(&distinct[i..])).collect()
        }
        CohortOrder::DocumentOrder => (0..distinct.len())
            .map(|i| fold(&distinct[..=i]))
            .collect(),
    };

    distinct
        .into_iter()
        .zip(cohorts)
        .map(|((attribute, opacity), true_opacity)| OpacityLevel {
            attribute,
            opacity,
            true_opacity,
            color: blend_over_white(Rgba::new(0, 0, 0, true_opacity)),
        })
        .collect()
}
