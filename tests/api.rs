//! End-to-end tests of the HTTP API with fake OCR, translation and rendering

mod common;

use axum::http::StatusCode;
use image::RgbImage;

use arabic_image_translator::ocr::{BoundingBox, Detection};
use common::*;

fn decode(png: &[u8]) -> RgbImage {
    image::load_from_memory(png).unwrap().to_rgb8()
}

#[tokio::test]
async fn test_single_image_yields_one_entry_with_same_dimensions() {
    let app = test_app(vec![hello_detection()]);
    let png = solid_png(64, 48, [240, 240, 240]);

    let response = send(&app, upload_request("/translate-image", &[("file", "photo.png", "image/png", &png)])).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("application/zip"));
    assert_eq!(
        response.header("content-disposition"),
        Some("attachment; filename=\"photo_translated.zip\"")
    );
    assert_eq!(response.header("x-pages-total"), Some("1"));
    assert_eq!(response.header("x-pages-failed"), Some("0"));

    let entries = read_zip(&response.body);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, "photo_translated.png");
    assert_eq!(decode(&entries[0].1).dimensions(), (64, 48));

    let rendered = app.rendered();
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0].text, "مرحبا");
    assert_eq!(rendered[0].bbox, BoundingBox::new(10, 10, 40, 12));
    assert_eq!(app.workspace_count(), 0);
}

#[tokio::test]
async fn test_pdf_page_with_failed_ocr_is_passed_through() {
    let app = test_app(vec![hello_detection()]);
    let pdf = pdf_bytes(&[
        "0.9 g 0 0 144 144 re f",
        "1 0 0 rg 0 0 144 144 re f",
        "0.9 g 0 0 144 144 re f",
    ]);

    let response = send(
        &app,
        upload_request("/translate-image", &[("file", "scan.pdf", "application/pdf", &pdf)]),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("x-pages-total"), Some("3"));
    assert_eq!(response.header("x-pages-failed"), Some("1"));

    let entries = read_zip(&response.body);
    let names: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "page_001_translated.png",
            "page_002_translated.png",
            "page_003_translated.png"
        ]
    );

    for (name, png) in &entries {
        let page = decode(png);
        assert_eq!(page.dimensions(), (144, 144));
        let inside_box = page.get_pixel(20, 15).0;
        if name == "page_002_translated.png" {
            // Untouched: still the rasterized red page
            assert!(page.pixels().all(|p| is_red(p.0)));
        } else {
            assert_eq!(inside_box, [0, 0, 0], "{} was not rendered", name);
        }
    }

    assert_eq!(app.rendered().len(), 2);
    assert_eq!(app.workspace_count(), 0);
}

#[tokio::test]
async fn test_unsupported_format_is_rejected_without_leftovers() {
    let app = test_app(vec![hello_detection()]);
    let docx = zip_bytes(&[("word/document.xml", b"<w:document/>".as_slice())]);

    let response = send(
        &app,
        upload_request(
            "/translate-image",
            &[(
                "file",
                "report.docx",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                &docx,
            )],
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["kind"], "UnsupportedFormat");
    assert_eq!(app.workspace_count(), 0);
    assert_eq!(app.detector.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_size_limit_is_inclusive() {
    let png = solid_png(32, 32, [255, 255, 255]);
    let size = png.len() as u64;

    let at_limit = test_app_with(vec![], |config| config.upload.max_file_size = size);
    let response = send(&at_limit, upload_request("/translate-image", &[("file", "a.png", "image/png", &png)])).await;
    assert_eq!(response.status, StatusCode::OK);

    let below = test_app_with(vec![], |config| config.upload.max_file_size = size - 1);
    let response = send(&below, upload_request("/translate-image", &[("file", "a.png", "image/png", &png)])).await;
    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.json()["kind"], "FileTooLarge");
}

#[tokio::test]
async fn test_low_confidence_detections_are_not_rendered() {
    let app = test_app(vec![
        Detection::new("Barely visible", BoundingBox::new(2, 30, 20, 8), 0.2),
        hello_detection(),
    ]);
    let png = solid_png(64, 48, [255, 255, 255]);

    let response = send(&app, upload_request("/translate-image", &[("file", "photo.png", "image/png", &png)])).await;
    assert_eq!(response.status, StatusCode::OK);

    let rendered = app.rendered();
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0].bbox, hello_detection().bbox);
}

#[tokio::test]
async fn test_image_without_text_is_unchanged() {
    let app = test_app(vec![]);
    let image = noise_image(50, 40);
    let png = png_bytes(&image);

    let response = send(&app, upload_request("/translate-image", &[("file", "noise.png", "image/png", &png)])).await;
    assert_eq!(response.status, StatusCode::OK);

    let entries = read_zip(&response.body);
    assert_eq!(decode(&entries[0].1).into_raw(), image.into_raw());
    assert!(app.rendered().is_empty());
}

#[tokio::test]
async fn test_every_page_failing_is_an_error() {
    let app = test_app(vec![hello_detection()]);
    let png = solid_png(16, 16, [255, 0, 0]);

    let response = send(&app, upload_request("/translate-image", &[("file", "red.png", "image/png", &png)])).await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(response.json()["kind"], "NoContentProcessed");
    assert_eq!(app.workspace_count(), 0);
}

#[tokio::test]
async fn test_archive_pages_keep_listing_order() {
    let app = test_app(vec![hello_detection()]);
    let first = solid_png(60, 40, [250, 250, 250]);
    let second = solid_png(70, 30, [250, 250, 250]);
    let cbz = zip_bytes(&[
        ("002.png", second.as_slice()),
        ("ComicInfo.xml", b"<ComicInfo/>".as_slice()),
        ("001.png", first.as_slice()),
    ]);

    let response = send(
        &app,
        upload_request("/translate-image", &[("file", "comic.cbz", "application/octet-stream", &cbz)]),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let entries = read_zip(&response.body);
    assert_eq!(entries.len(), 2);
    assert_eq!(decode(&entries[0].1).dimensions(), (70, 30));
    assert_eq!(decode(&entries[1].1).dimensions(), (60, 40));
}

#[tokio::test]
async fn test_corrupt_archive_is_rejected() {
    let app = test_app(vec![]);
    let response = send(
        &app,
        upload_request("/translate-image", &[("file", "broken.zip", "application/zip", b"PK\x03\x04nope")]),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["kind"], "CorruptArchive");
}

#[tokio::test]
async fn test_missing_file_field() {
    let app = test_app(vec![]);
    let png = solid_png(8, 8, [0, 0, 0]);
    let response = send(&app, upload_request("/translate-image", &[("other", "a.png", "image/png", &png)])).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["kind"], "MissingFile");
}

#[tokio::test]
async fn test_translate_multiple_skips_invalid_files() {
    let app = test_app(vec![hello_detection()]);
    let a = solid_png(64, 48, [255, 255, 255]);
    let b = solid_png(64, 48, [200, 200, 200]);

    let response = send(
        &app,
        upload_request(
            "/translate-multiple",
            &[
                ("files", "a.png", "image/png", &a),
                ("files", "notes.txt", "text/plain", b"hello"),
                ("files", "b.png", "image/png", &b),
            ],
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.header("content-disposition"),
        Some("attachment; filename=\"translated_images.zip\"")
    );
    let names: Vec<String> = read_zip(&response.body).into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["a_translated.png", "b_translated.png"]);
}

#[tokio::test]
async fn test_translate_multiple_enforces_batch_size() {
    let app = test_app_with(vec![], |config| config.upload.max_batch_size = 1);
    let png = solid_png(8, 8, [255, 255, 255]);

    let response = send(
        &app,
        upload_request(
            "/translate-multiple",
            &[("files", "a.png", "image/png", &png), ("files", "b.png", "image/png", &png)],
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["kind"], "TooManyFiles");
}

#[tokio::test]
async fn test_translate_text_passes_arabic_through() {
    let app = test_app(vec![]);
    let text = "مرحبا بكم في المدينة";

    let response = send(&app, json_request("/translate-text", serde_json::json!({ "text": text }))).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["translated_text"], text);
    assert_eq!(body["language"], "Arabic");
    assert_eq!(body["outcome"], "passed_through");
}

#[tokio::test]
async fn test_translate_text_uses_provider() {
    let app = test_app(vec![]);
    let response = send(
        &app,
        json_request("/translate-text", serde_json::json!({ "text": "Good morning to all of you" })),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["translated_text"], "مرحبا");
    assert_eq!(response.json()["outcome"], "translated");
}

#[tokio::test]
async fn test_translate_text_requires_text() {
    let app = test_app(vec![]);
    let response = send(&app, json_request("/translate-text", serde_json::json!({ "text": "  " }))).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["kind"], "InvalidRequest");
}

#[tokio::test]
async fn test_extract_archive_lists_images() {
    let app = test_app(vec![]);
    let png = solid_png(4, 4, [1, 2, 3]);
    let zip = zip_bytes(&[
        ("b.png", png.as_slice()),
        ("readme.txt", b"hi".as_slice()),
        ("a.png", png.as_slice()),
    ]);

    let response = send(
        &app,
        upload_request("/extract-archive", &[("file", "pages.zip", "application/zip", &zip)]),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["archive_name"], "pages.zip");
    assert_eq!(body["extracted_images"], 2);
    assert_eq!(body["image_files"], serde_json::json!(["b.png", "a.png"]));
}

#[tokio::test]
async fn test_extract_pdf_counts_pages() {
    let app = test_app(vec![]);
    let pdf = pdf_bytes(&["0.5 g 0 0 144 144 re f", "0.5 g 0 0 144 144 re f"]);

    let response = send(&app, upload_request("/extract-pdf", &[("file", "doc.pdf", "application/pdf", &pdf)])).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["extracted_pages"], 2);
    assert_eq!(body["page_files"], serde_json::json!(["page_001.png", "page_002.png"]));
}

#[tokio::test]
async fn test_extract_pdf_rejects_images() {
    let app = test_app(vec![]);
    let png = solid_png(4, 4, [1, 2, 3]);
    let response = send(&app, upload_request("/extract-pdf", &[("file", "a.png", "image/png", &png)])).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["kind"], "UnsupportedFormat");
}

#[tokio::test]
async fn test_health_and_banner() {
    let app = test_app(vec![]);

    let request = axum::http::Request::builder()
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["status"], "healthy");

    let request = axum::http::Request::builder()
        .uri("/")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["max_file_size_mb"], 200);
    assert_eq!(body["features"]["ocr_engine"], "fake");
}
