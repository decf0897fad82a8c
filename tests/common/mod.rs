//! Shared helpers for the HTTP tests: fake backends and fixture builders

#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use arabic_image_translator::config::Config;
use arabic_image_translator::imaging::{
    FastMarchingInpainter, ImagingError, TextPlacement, TextRenderer,
};
use arabic_image_translator::ocr::{BoundingBox, Detection, OcrError, TextDetector};
use arabic_image_translator::state::{AppState, Services};
use arabic_image_translator::translate::{ProviderTranslation, TranslationError, TranslationProvider};
use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use image::{DynamicImage, Rgb, RgbImage, Rgba};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use tower::ServiceExt; // for `oneshot`

pub const BOUNDARY: &str = "----translator-test-boundary";

// ============================================================================
// Fake backends
// ============================================================================

/// Returns the same detections for every image, except mostly-red ones on
/// which it fails
pub struct FakeDetector {
    pub detections: Vec<Detection>,
    pub calls: AtomicUsize,
}

impl FakeDetector {
    pub fn new(detections: Vec<Detection>) -> Arc<Self> {
        Arc::new(Self {
            detections,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TextDetector for FakeDetector {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn detect(&self, image_data: &[u8]) -> Result<Vec<Detection>, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let image = image::load_from_memory(image_data)
            .map_err(|e| OcrError::ProcessingError(e.to_string()))?
            .to_rgb8();
        let center = image.get_pixel(image.width() / 2, image.height() / 2).0;
        if is_red(center) {
            return Err(OcrError::ProcessingError("engine crashed".to_string()));
        }
        Ok(self.detections.clone())
    }
}

pub fn is_red([r, g, b]: [u8; 3]) -> bool {
    r > 200 && g < 60 && b < 60
}

/// Always answers with the same Arabic text
pub struct FakeProvider;

#[async_trait]
impl TranslationProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn translate(
        &self,
        _text: &str,
        _source: Option<&str>,
        _target: &str,
    ) -> Result<ProviderTranslation, TranslationError> {
        Ok(ProviderTranslation {
            text: "مرحبا".to_string(),
            detected_language: None,
        })
    }
}

/// Paints each box solid black and remembers what it was asked to draw
#[derive(Default)]
pub struct RecordingRenderer {
    pub placements: Mutex<Vec<TextPlacement>>,
}

impl TextRenderer for RecordingRenderer {
    fn render(&self, image: &DynamicImage, placements: &[TextPlacement]) -> Result<DynamicImage, ImagingError> {
        self.placements.lock().unwrap().extend_from_slice(placements);

        let mut canvas = image.to_rgba8();
        for placement in placements {
            let bbox = placement.bbox;
            let rect = Rect::at(bbox.x as i32, bbox.y as i32).of_size(bbox.width, bbox.height);
            draw_filled_rect_mut(&mut canvas, rect, Rgba([0, 0, 0, 255]));
        }
        Ok(DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8()))
    }
}

// ============================================================================
// Application
// ============================================================================

pub struct TestApp {
    pub router: Router,
    pub detector: Arc<FakeDetector>,
    pub renderer: Arc<RecordingRenderer>,
    pub temp_root: tempfile::TempDir,
}

impl TestApp {
    pub fn workspace_count(&self) -> usize {
        std::fs::read_dir(self.temp_root.path()).unwrap().count()
    }

    pub fn rendered(&self) -> Vec<TextPlacement> {
        self.renderer.placements.lock().unwrap().clone()
    }
}

/// Detection used by most tests
pub fn hello_detection() -> Detection {
    Detection::new("Hello world", BoundingBox::new(10, 10, 40, 12), 0.9)
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.upload.pdf_dpi = 72.0;
    config.ocr.bbox_expansion_ratio = 0.0;
    config
}

pub fn test_app(detections: Vec<Detection>) -> TestApp {
    test_app_with(detections, |_| {})
}

pub fn test_app_with(detections: Vec<Detection>, configure: impl FnOnce(&mut Config)) -> TestApp {
    let temp_root = tempfile::TempDir::new().unwrap();

    let mut config = test_config();
    config.upload.temp_dir = Some(temp_root.path().to_path_buf());
    configure(&mut config);

    let detector = FakeDetector::new(detections);
    let renderer = Arc::new(RecordingRenderer::default());
    let services = Services {
        detector: detector.clone(),
        providers: vec![Arc::new(FakeProvider)],
        inpainter: Arc::new(FastMarchingInpainter::new(config.render.inpaint_radius)),
        renderer: renderer.clone(),
    };

    let state = AppState::new(config, services);
    TestApp {
        router: arabic_image_translator::routes::app(state),
        detector,
        renderer,
        temp_root,
    }
}

// ============================================================================
// Requests
// ============================================================================

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub async fn send(app: &TestApp, request: Request<Body>) -> TestResponse {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    TestResponse { status, headers, body }
}

/// Multipart body with one part per `(field, file name, content type, data)`
pub fn multipart_body(parts: &[(&str, &str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, file_name, content_type, data) in parts {
        write!(
            body,
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            BOUNDARY, field, file_name, content_type
        )
        .unwrap();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    write!(body, "--{}--\r\n", BOUNDARY).unwrap();
    body
}

pub fn upload_request(uri: &str, parts: &[(&str, &str, &str, &[u8])]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn png_bytes(image: &RgbImage) -> Vec<u8> {
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .unwrap();
    buffer
}

pub fn solid_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    png_bytes(&RgbImage::from_pixel(width, height, Rgb(color)))
}

/// Deterministic noisy image
pub fn noise_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let v = x.wrapping_mul(31) ^ y.wrapping_mul(17);
        Rgb([(v % 251) as u8, (v * 7 % 253) as u8, (x + y) as u8])
    })
}

pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buffer = Vec::new();
    {
        let mut writer = zip::ZipWriter::new(Cursor::new(&mut buffer));
        for (name, data) in entries {
            writer
                .start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }
    buffer
}

/// Entries of a ZIP in listing order
pub fn read_zip(data: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data.to_vec())).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            (entry.name().to_string(), content)
        })
        .collect()
}

/// Minimal PDF with one 144x144pt page per content stream
pub fn pdf_bytes(page_contents: &[&str]) -> Vec<u8> {
    let mut objects: Vec<String> = Vec::new();
    let page_count = page_contents.len();

    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    let kids: Vec<String> = (0..page_count).map(|i| format!("{} 0 R", 3 + i * 2)).collect();
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        page_count
    ));
    for (i, content) in page_contents.iter().enumerate() {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 144 144] /Contents {} 0 R >>",
            4 + i * 2
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ));
    }

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, object) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, object).as_bytes());
    }

    let xref_offset = pdf.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        xref.push_str(&format!("{:010} 00000 n \n", offset));
    }
    xref.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_offset
    ));
    pdf.extend_from_slice(xref.as_bytes());
    pdf
}
