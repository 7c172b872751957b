use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use image::{DynamicImage, GrayImage, Luma};
use std::sync::Arc;
use tower::ServiceExt;

use dymo_label::{
    create_router, encode_png, DryRunPrinterService, LabelOptions, LabelService, Printer,
    TapeGeometry, TapeKind,
};

const SERIAL: &str = "012345678901";
const BOUNDARY: &str = "label-boundary";

fn setup() -> (Arc<DryRunPrinterService>, Router) {
    setup_with_limit(1024 * 1024)
}

fn setup_with_limit(max_upload: usize) -> (Arc<DryRunPrinterService>, Router) {
    let printers = Arc::new(DryRunPrinterService::new(vec![
        Printer::new(SERIAL, &TapeGeometry::label_manager_pnp()),
        Printer::new("NARROW", &TapeGeometry::new([(TapeKind::D1_6_MM, 32)])),
    ]));
    let service = Arc::new(LabelService::new(printers.clone(), LabelOptions::default()));
    (printers, create_router(service, max_upload))
}

fn test_png(width: u32, height: u32) -> Vec<u8> {
    let image = GrayImage::from_fn(width, height, |x, _| Luma([if x % 2 == 0 { 0 } else { 255 }]));
    encode_png(&DynamicImage::ImageLuma8(image)).unwrap()
}

fn multipart(part: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{p}\"; filename=\"label.png\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            b = BOUNDARY,
            p = part
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn post(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

#[tokio::test]
async fn list_printers() {
    let (_, app) = setup();
    let response = app.oneshot(get("/printers")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json[0]["serialNumber"], SERIAL);
    assert_eq!(json[0]["labelHeight"]["D1_12_MM"], 64);
    assert_eq!(json[1]["serialNumber"], "NARROW");
}

#[tokio::test]
async fn get_printer_by_serial() {
    let (_, app) = setup();
    let response = app
        .clone()
        .oneshot(get(&format!("/printers/{}", SERIAL)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/printers/UNKNOWN")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn preview_returns_scaled_png_without_printing() {
    let (printers, app) = setup();
    let uri = format!("/printers/{}?tape=D1_12_MM&preview=true", SERIAL);
    let response = app
        .oneshot(post(&uri, multipart("multipartFile", &test_png(100, 32))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let length: usize = response.headers()[header::CONTENT_LENGTH]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();

    let body = body_bytes(response).await;
    assert_eq!(body.len(), length);
    let label = image::load_from_memory(&body).unwrap();
    assert_eq!((label.width(), label.height()), (200, 64));
    assert!(printers.jobs().is_empty());
}

#[tokio::test]
async fn print_dispatches_with_default_tape() {
    let (printers, app) = setup();
    let uri = format!("/printers/{}", SERIAL);
    let response = app
        .oneshot(post(&uri, multipart("multipartFile", &test_png(50, 128))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let jobs = printers.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].tape, TapeKind::D1_12_MM);
    assert_eq!((jobs[0].width, jobs[0].height), (25, 64));
}

#[tokio::test]
async fn unknown_printer_is_404() {
    let (printers, app) = setup();
    let response = app
        .oneshot(post("/printers/UNKNOWN", multipart("multipartFile", b"garbage")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(printers.jobs().is_empty());
}

#[tokio::test]
async fn unsupported_tape_is_400() {
    let (_, app) = setup();
    let response = app
        .oneshot(post(
            "/printers/NARROW?tape=D1_12_MM",
            multipart("multipartFile", &test_png(10, 64)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"], "Unsupported tape! D1_12_MM");
}

#[tokio::test]
async fn unknown_tape_name_is_400() {
    let (_, app) = setup();
    let uri = format!("/printers/{}?tape=D1_24_MM", SERIAL);
    let response = app
        .oneshot(post(&uri, multipart("multipartFile", &test_png(10, 64))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn undecodable_image_is_400() {
    let (printers, app) = setup();
    let uri = format!("/printers/{}", SERIAL);
    let response = app
        .oneshot(post(&uri, multipart("multipartFile", b"definitely not an image")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["error"], "Unsupported image type!");
    assert!(printers.jobs().is_empty());
}

#[tokio::test]
async fn missing_image_part_is_400() {
    let (_, app) = setup();
    let uri = format!("/printers/{}", SERIAL);
    let response = app
        .oneshot(post(&uri, multipart("somethingElse", &test_png(10, 64))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn identical_previews_are_byte_identical() {
    let (_, app) = setup();
    let uri = format!("/printers/{}?tape=D1_9_MM&preview=true", SERIAL);
    let upload = test_png(90, 30);

    let first = app
        .clone()
        .oneshot(post(&uri, multipart("multipartFile", &upload)))
        .await
        .unwrap();
    let second = app
        .oneshot(post(&uri, multipart("multipartFile", &upload)))
        .await
        .unwrap();

    assert_eq!(body_bytes(first).await, body_bytes(second).await);
}

#[tokio::test]
async fn oversized_upload_is_400() {
    let (printers, app) = setup_with_limit(1000);
    let uri = format!("/printers/{}?preview=true", SERIAL);
    let response = app
        .oneshot(post(&uri, multipart("multipartFile", &vec![0u8; 5000])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "error");
    assert!(printers.jobs().is_empty());
}

#[tokio::test]
async fn preview_flag_accepts_setting_spellings() {
    let (printers, app) = setup();
    for flag in ["yes", "on", "1", "TRUE"] {
        let uri = format!("/printers/{}?preview={}", SERIAL, flag);
        let response = app
            .clone()
            .oneshot(post(&uri, multipart("multipartFile", &test_png(10, 64))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "preview={}", flag);
    }
    assert!(printers.jobs().is_empty());

    let uri = format!("/printers/{}?preview=0", SERIAL);
    let response = app
        .clone()
        .oneshot(post(&uri, multipart("multipartFile", &test_png(10, 64))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(printers.jobs().len(), 1);

    let uri = format!("/printers/{}?preview=maybe", SERIAL);
    let response = app
        .oneshot(post(&uri, multipart("multipartFile", &test_png(10, 64))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
