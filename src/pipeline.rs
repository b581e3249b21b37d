//! Per-file pipeline and the parallel batch driver.
//!
//! Every file walks `Received → TypeValidated → Normalized → Traced`, then in color mode
//! `Resolved → Colorized`, and finally `Optimized → Done`. A failure stops that file
//! only and records the last stage it reached.

use std::fmt;
use std::fs;
use std::path::Path;

use image::imageops::{FilterType, grayscale};
use rayon::prelude::*;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::colorize::colorize;
use crate::config::{CohortOrder, ColorMode, PipelineSettings};
use crate::normalize::{MediaType, normalize};
use crate::optimize::optimize_svg;
use crate::resolve::resolve_opacity_stack;
use crate::sample::sample_raster;
use crate::vectorizer::RasterTracer;
use crate::vectorizer::vtracer::{BinaryTracer, PosterizeTracer, TraceOptions};
use crate::{VectorizeError, VectorizeResult};

/// Name reported for the tracing backend.
pub const ALGORITHM: &str = "vtracer";

/// Progress of a single file through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Received,
    TypeValidated,
    Normalized,
    Traced,
    Resolved,
    Colorized,
    Optimized,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Received => "received",
            Stage::TypeValidated => "type-validated",
            Stage::Normalized => "normalized",
            Stage::Traced => "traced",
            Stage::Resolved => "resolved",
            Stage::Colorized => "colorized",
            Stage::Optimized => "optimized",
            Stage::Done => "done",
        })
    }
}

/// An upload as received from the outer surface.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field_name: String,
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(
        field_name: impl Into<String>,
        original_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            original_name: original_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its mime type from the extension.
    ///
    /// Unknown extensions get `application/octet-stream`, which validation rejects.
    pub fn from_path(field_name: impl Into<String>, path: impl AsRef<Path>) -> VectorizeResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let mime_type = MediaType::from_path(path)
            .map(MediaType::mime)
            .unwrap_or("application/octet-stream");
        let original_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(field_name, original_name, mime_type, bytes))
    }
}

/// A successfully vectorized file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedResult {
    pub svg: String,
    pub field_name: String,
    pub original_name: String,
    pub mime_type: String,
}

/// A file that stopped part-way through the pipeline.
#[derive(Debug, Error)]
#[error("{original_name}: failed after stage {stage}: {error}")]
pub struct FileFailure {
    pub field_name: String,
    pub original_name: String,
    pub mime_type: String,
    /// Last stage the file reached before failing.
    pub stage: Stage,
    #[source]
    pub error: VectorizeError,
}

impl Serialize for FileFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FileFailure", 5)?;
        state.serialize_field("fieldName", &self.field_name)?;
        state.serialize_field("originalName", &self.original_name)?;
        state.serialize_field("mimeType", &self.mime_type)?;
        state.serialize_field("stage", &self.stage)?;
        state.serialize_field("error", &self.error.to_string())?;
        state.end()
    }
}

/// Outcome of one file in a batch.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum FileOutcome {
    Processed(ProcessedResult),
    Failed(FileFailure),
}

impl FileOutcome {
    pub fn is_processed(&self) -> bool {
        matches!(self, FileOutcome::Processed(_))
    }

    pub fn processed(&self) -> Option<&ProcessedResult> {
        match self {
            FileOutcome::Processed(result) => Some(result),
            FileOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FileFailure> {
        match self {
            FileOutcome::Processed(_) => None,
            FileOutcome::Failed(failure) => Some(failure),
        }
    }

    pub fn original_name(&self) -> &str {
        match self {
            FileOutcome::Processed(result) => &result.original_name,
            FileOutcome::Failed(failure) => &failure.original_name,
        }
    }
}

impl From<Result<ProcessedResult, FileFailure>> for FileOutcome {
    fn from(result: Result<ProcessedResult, FileFailure>) -> Self {
        match result {
            Ok(processed) => FileOutcome::Processed(processed),
            Err(failure) => FileOutcome::Failed(failure),
        }
    }
}

/// Outcomes of a batch, in input order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub algorithm: &'static str,
    pub color_mode: ColorMode,
    pub files: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn failed_count(&self) -> usize {
        self.files.iter().filter(|outcome| !outcome.is_processed()).count()
    }

    pub fn all_processed(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Entry point for configuring and running the vectorization pipeline.
#[derive(Debug, Clone, Default)]
pub struct Tonetrace {
    settings: PipelineSettings,
}

impl Tonetrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: PipelineSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Cap the longer side of the normalized raster.
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.settings.normalize.max_dimension = max_dimension;
        self
    }

    /// Set the filter used when shrinking the input.
    pub fn with_resize_filter(mut self, filter: FilterType) -> Self {
        self.settings.normalize.resize_filter = filter;
        self
    }

    pub fn with_trace_options(mut self, options: TraceOptions) -> Self {
        self.settings.trace = options;
        self
    }

    /// Number of luminance layers traced in color mode.
    pub fn with_steps(mut self, steps: u8) -> Self {
        self.settings.posterize.steps = steps;
        self
    }

    /// Luminance threshold for black-and-white mode.
    pub fn with_binary_threshold(mut self, threshold: u8) -> Self {
        self.settings.posterize.binary_threshold = threshold;
        self
    }

    pub fn with_cohort_order(mut self, order: CohortOrder) -> Self {
        self.settings.resolve.cohort_order = order;
        self
    }

    pub fn with_palette_size(mut self, palette_size: usize) -> Self {
        self.settings.colorize.palette_size = palette_size;
        self
    }

    /// Run one file through the pipeline for `mode`.
    pub fn process_file(
        &self,
        file: &UploadedFile,
        mode: ColorMode,
    ) -> Result<ProcessedResult, FileFailure> {
        let failed = |stage: Stage| {
            move |error: VectorizeError| FileFailure {
                field_name: file.field_name.clone(),
                original_name: file.original_name.clone(),
                mime_type: file.mime_type.clone(),
                stage,
                error,
            }
        };
        let settings = &self.settings;
        let name = file.original_name.as_str();
        debug!(file = name, mime = %file.mime_type, bytes = file.bytes.len(), "received");

        let media_type = MediaType::from_mime(&file.mime_type).map_err(failed(Stage::Received))?;
        debug!(file = name, stage = %Stage::TypeValidated);

        let raster = normalize(&file.bytes, media_type, &settings.normalize)
            .map_err(failed(Stage::TypeValidated))?;
        let luminance = grayscale(raster.image());
        debug!(file = name, stage = %Stage::Normalized, size = ?raster.dimensions());

        let markup = match mode {
            ColorMode::BlackAndWhite => {
                let tracer = BinaryTracer {
                    threshold: settings.posterize.binary_threshold,
                };
                let traced = tracer
                    .trace(&luminance, &settings.trace)
                    .map_err(failed(Stage::Normalized))?;
                debug!(file = name, stage = %Stage::Traced);
                optimize_svg(&traced, &settings.optimize).map_err(failed(Stage::Traced))?
            }
            ColorMode::Color => {
                let tracer = PosterizeTracer {
                    steps: settings.posterize.steps,
                };
                let traced = tracer
                    .trace(&luminance, &settings.trace)
                    .map_err(failed(Stage::Normalized))?;
                debug!(file = name, stage = %Stage::Traced);

                let solid = resolve_opacity_stack(&traced, &settings.resolve)
                    .map_err(failed(Stage::Traced))?;
                debug!(file = name, stage = %Stage::Resolved);

                let original = raster
                    .to_png()
                    .and_then(|png| sample_raster(&png))
                    .map_err(failed(Stage::Resolved))?;
                let colored = colorize(&solid, &original, &settings.colorize)
                    .map_err(failed(Stage::Resolved))?;
                debug!(file = name, stage = %Stage::Colorized);

                optimize_svg(&colored, &settings.optimize).map_err(failed(Stage::Colorized))?
            }
        };
        debug!(file = name, stage = %Stage::Optimized, svg_bytes = markup.len());

        Ok(ProcessedResult {
            svg: markup,
            field_name: file.field_name.clone(),
            original_name: file.original_name.clone(),
            mime_type: file.mime_type.clone(),
        })
    }

    /// Process every file in parallel; one outcome per file, in input order.
    pub fn process_files(&self, files: &[UploadedFile], mode: ColorMode) -> BatchReport {
        let outcomes: Vec<FileOutcome> = files
            .par_iter()
            .map(|file| FileOutcome::from(self.process_file(file, mode)))
            .collect();

        for failure in outcomes.iter().filter_map(FileOutcome::failure) {
            warn!(file = %failure.original_name, stage = %failure.stage, error = %failure.error, "file failed");
        }
        let report = BatchReport {
            algorithm: ALGORITHM,
            color_mode: mode,
            files: outcomes,
        };
        info!(
            mode = %mode,
            files = report.files.len(),
            failed = report.failed_count(),
            "batch finished"
        );
        report
    }
}
