use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgb as ImageRgb, RgbImage};
use tonetrace::markup::FILL_OPACITY;
use tonetrace::{
    ColorMode, FileOutcome, Rgb, Stage, SvgDocument, Tonetrace, UploadedFile, VectorizeError,
    hex_to_rgb,
};

fn save_png(dir: &Path, name: &str, image: &RgbImage) -> PathBuf {
    let path = dir.join(name);
    image.save_with_format(&path, ImageFormat::Png).unwrap();
    path
}

fn red_square_on_white() -> RgbImage {
    RgbImage::from_fn(9, 9, |x, y| {
        if (3..6).contains(&x) && (3..6).contains(&y) {
            ImageRgb([255, 0, 0])
        } else {
            ImageRgb([255, 255, 255])
        }
    })
}

#[test]
fn black_and_white_red_square_is_one_opaque_shape() {
    let dir = tempfile::tempdir().unwrap();
    let path = save_png(dir.path(), "square.png", &red_square_on_white());
    let upload = UploadedFile::from_path("files", &path).unwrap();
    assert_eq!(upload.mime_type, "image/png");
    assert_eq!(upload.original_name, "square.png");

    let result = Tonetrace::new()
        .process_file(&upload, ColorMode::BlackAndWhite)
        .unwrap();
    let doc = SvgDocument::parse(&result.svg).unwrap();
    assert_eq!(doc.shape_count(), 1);
    assert!(doc.shapes()[0].attribute(FILL_OPACITY).is_none());
}

#[test]
fn color_mode_recovers_the_photo_color() {
    let dir = tempfile::tempdir().unwrap();
    let red = RgbImage::from_pixel(8, 8, ImageRgb([255, 0, 0]));
    let path = save_png(dir.path(), "red.png", &red);
    let upload = UploadedFile::from_path("files", &path).unwrap();

    let result = Tonetrace::new()
        .process_file(&upload, ColorMode::Color)
        .unwrap();
    let doc = SvgDocument::parse(&result.svg).unwrap();
    assert!(doc.shape_count() >= 1);
    for shape in doc.shapes() {
        assert!(shape.attribute(FILL_OPACITY).is_none());
        let fill = hex_to_rgb(shape.fill().unwrap()).unwrap();
        assert!(
            fill.distance_squared(Rgb::new(255, 0, 0)) < 3 * 16 * 16,
            "got {fill}"
        );
    }
}

#[test]
fn batch_keeps_going_past_a_bad_file() {
    let dir = tempfile::tempdir().unwrap();
    let good = save_png(dir.path(), "good.png", &red_square_on_white());
    let bad = dir.path().join("notes.txt");
    fs::write(&bad, "not an image").unwrap();
    let uploads = vec![
        UploadedFile::from_path("files", &bad).unwrap(),
        UploadedFile::from_path("files", &good).unwrap(),
    ];

    let report = Tonetrace::new().process_files(&uploads, ColorMode::BlackAndWhite);
    assert_eq!(report.failed_count(), 1);

    let FileOutcome::Failed(failure) = &report.files[0] else {
        panic!("expected the text file to fail");
    };
    assert_eq!(failure.stage, Stage::Received);
    assert!(matches!(
        failure.error,
        VectorizeError::UnsupportedMediaType { .. }
    ));
    assert!(report.files[1].is_processed());
}

#[test]
fn report_serializes_like_the_upload_response() {
    let png = {
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(red_square_on_white())
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    };
    let uploads = vec![
        UploadedFile::new("files", "a.png", "image/png", png),
        UploadedFile::new("files", "b.pdf", "application/pdf", vec![0]),
    ];
    let report = Tonetrace::new().process_files(&uploads, ColorMode::Color);
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["algorithm"], "vtracer");
    assert_eq!(json["colorMode"], "color");
    assert_eq!(json["files"][0]["fieldName"], "files");
    assert_eq!(json["files"][0]["originalName"], "a.png");
    assert_eq!(json["files"][0]["mimeType"], "image/png");
    assert!(json["files"][0]["svg"].as_str().unwrap().contains("<svg"));
    assert_eq!(json["files"][1]["stage"], "received");
    assert!(json["files"][1]["error"].is_string());
    assert!(json["files"][1].get("svg").is_none());
}

#[test]
#[cfg(not(feature = "heic"))]
fn heic_is_accepted_but_not_decoded() {
    let upload = UploadedFile::new("files", "shot.heic", "image/heic", vec![0; 16]);
    let failure = Tonetrace::new()
        .process_file(&upload, ColorMode::Color)
        .unwrap_err();
    assert_eq!(failure.stage, Stage::TypeValidated);
    assert!(matches!(
        failure.error,
        VectorizeError::DecoderUnavailable { .. }
    ));
}

#[test]
#[cfg(feature = "heic")]
fn corrupt_heic_fails_while_decoding() {
    let upload = UploadedFile::new("files", "shot.heic", "image/heic", vec![0; 16]);
    let failure = Tonetrace::new()
        .process_file(&upload, ColorMode::Color)
        .unwrap_err();
    assert_eq!(failure.stage, Stage::TypeValidated);
    assert!(matches!(failure.error, VectorizeError::HeicDecode(_)));
}
