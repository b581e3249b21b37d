use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tonetrace::{Tonetrace, UploadedFile, VectorizeError, VectorizeResult};
use tracing::warn;

use crate::cli::GlobalOptions;

/// Field name reported for files read from the command line.
const FIELD_NAME: &str = "files";

/// The convenience function to build a Tonetrace instance with the global options.
pub fn build_tonetrace(global: &GlobalOptions) -> Tonetrace {
    Tonetrace::new()
        .with_max_dimension(global.max_dimension)
        .with_resize_filter(global.resize_filter.into())
}

/// Size the global rayon pool; only the first call has an effect.
pub fn configure_threads(threads: Option<usize>) {
    let Some(threads) = threads else {
        return;
    };
    if let Err(err) = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        warn!(%err, threads, "could not size the worker pool");
    }
}

/// Read every input up front so that a missing file aborts before any work starts.
pub fn load_uploads(inputs: &[PathBuf]) -> VectorizeResult<Vec<UploadedFile>> {
    inputs
        .iter()
        .map(|path| {
            UploadedFile::from_path(FIELD_NAME, path).map_err(|err| {
                VectorizeError::from(io::Error::other(format!("{}: {err}", path.display())))
            })
        })
        .collect()
}

/// Derive an SVG file path by changing the extension to "svg", optionally moving it
/// into `output_dir`.
pub fn derive_svg_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let mut path = match (output_dir, input.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => input.to_path_buf(),
    };
    path.set_extension("svg");
    path
}

/// Write `svg` to `path`, creating the parent directory if needed.
pub fn write_svg(path: &Path, svg: &str) -> VectorizeResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, svg)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn svg_path_sits_beside_input_by_default() {
        assert_eq!(
            derive_svg_path(Path::new("photos/cat.jpeg"), None),
            PathBuf::from("photos/cat.svg")
        );
    }

    #[test]
    fn svg_path_moves_into_output_dir() {
        assert_eq!(
            derive_svg_path(Path::new("photos/cat.jpeg"), Some(Path::new("out"))),
            PathBuf::from("out/cat.svg")
        );
    }

    #[test]
    fn write_svg_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.svg");
        write_svg(&path, "<svg/>").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "<svg/>");
    }
}
