use tonetrace::{FileFailure, MediaType, VectorizeError};

const ACCEPTED: [MediaType; 6] = [
    MediaType::Jpeg,
    MediaType::Png,
    MediaType::Webp,
    MediaType::Gif,
    MediaType::Svg,
    MediaType::Heic,
];

pub fn report_error(err: &VectorizeError) {
    match err {
        VectorizeError::UnsupportedMediaType { mime } => {
            eprintln!("Unsupported media type: {mime}");
            eprintln!();
            eprintln!("Accepted types:");
            for media_type in ACCEPTED {
                eprintln!("  - {media_type}");
            }
        }
        VectorizeError::DecoderUnavailable { mime } => {
            eprintln!("{mime} is accepted but cannot be decoded by this build.");
            if mime == "image/heic" {
                eprintln!("Rebuild with `--features heic` to decode it through libheif.");
            }
            eprintln!("Convert the file to PNG or JPEG and try again.");
        }
        _ => {
            eprintln!("{err}");
        }
    }
}

/// Report one failed file of a batch.
pub fn report_failure(failure: &FileFailure) {
    eprint!("{} (stage: {}): ", failure.original_name, failure.stage);
    report_error(&failure.error);
}
