// End-to-end scenarios over the HTTP surface: runtime file serving and the
// upload -> run -> export flow, driven through the bundled mock runtime.

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use std::fs;
use std::sync::Mutex;

use litert_harness::config::HarnessConfig;
use litert_harness::mock::{MockModel, MockRuntime, MockTensor};
use litert_harness::session::InferenceSession;
use litert_harness::tensor::{Accelerator, DType, TensorData, TensorDescriptor};
use litert_harness::ui::routes::configure_app;

fn gpt2_like_model() -> MockModel {
    let inputs = vec![TensorDescriptor::new("input_ids", vec![1, 8], DType::Int32)];
    let logits_desc = TensorDescriptor::new("logits", vec![1, 8, 4], DType::Float32);
    let values: Vec<f32> = (0..logits_desc.total_elements()).map(|i| i as f32 * 0.5).collect();
    let logits = MockTensor::new(logits_desc, TensorData::Float32(values), Accelerator::Wasm);
    MockModel::new(inputs, vec![logits])
}

fn harness_app_data(
    wasm_dir: &std::path::Path,
) -> (web::Data<Mutex<InferenceSession>>, web::Data<HarnessConfig>) {
    let mut session = InferenceSession::new(Box::new(MockRuntime::new(gpt2_like_model())));
    session.initialize().expect("mock runtime init");
    let config = HarnessConfig {
        wasm_dir: wasm_dir.to_string_lossy().into_owned(),
        ..HarnessConfig::default()
    };
    (web::Data::new(Mutex::new(session)), web::Data::new(config))
}

fn multipart_body(file_name: &str, content: &[u8]) -> (&'static str, Vec<u8>) {
    let mut body = Vec::new();
    body.extend_from_slice(b"--XBOUNDARY\r\n");
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(b"\r\n--XBOUNDARY--\r\n");
    ("multipart/form-data; boundary=XBOUNDARY", body)
}

#[actix_rt::test]
async fn serves_runtime_files_and_404s_missing_ones() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("runtime.wasm"), b"\0asm\x01\0\0\0").unwrap();

    let (session, config) = harness_app_data(dir.path());
    let app = test::init_service(
        App::new()
            .app_data(session)
            .app_data(config)
            .configure(configure_app),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/wasm/runtime.wasm").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("Content-Type").unwrap(), "application/wasm");
    assert_eq!(
        resp.headers().get("Cross-Origin-Embedder-Policy").unwrap(),
        "require-corp"
    );
    assert_eq!(
        resp.headers().get("Cross-Origin-Opener-Policy").unwrap(),
        "same-origin"
    );
    let body = test::read_body(resp).await;
    assert_eq!(&body[..], b"\0asm\x01\0\0\0");

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/wasm/does-not-exist.wasm")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn full_session_flow_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let (session, config) = harness_app_data(dir.path());
    let app = test::init_service(
        App::new()
            .app_data(session)
            .app_data(config)
            .configure(configure_app),
    )
    .await;

    // Running before any model is uploaded is refused.
    let resp = test::call_service(&app, test::TestRequest::post().uri("/run").to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Upload the model; the response lists the declared signature.
    let (content_type, body) = multipart_body("gpt2.tflite", b"tflite-model-bytes");
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/upload")
            .insert_header(("Content-Type", content_type))
            .set_payload(body)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let details: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(details["model"], "gpt2.tflite");
    assert_eq!(details["inputs"][0]["name"], "input_ids");
    assert_eq!(details["inputs"][0]["dtype"], "int32");
    assert_eq!(details["outputs"][0]["shape"], serde_json::json!([1, 8, 4]));

    // Run one pass and check the reduced results.
    let resp = test::call_service(&app, test::TestRequest::post().uri("/run").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let results: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(results[0]["name"], "logits");
    assert_eq!(results[0]["totalElements"], 32);
    assert_eq!(results[0]["stats"]["min"], 0.0);
    assert_eq!(results[0]["stats"]["max"], 15.5);

    // Export carries metadata, outputs and the glossary.
    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/results/export").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let doc: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(doc["metadata"]["model"], "gpt2.tflite");
    assert_eq!(doc["outputs"][0]["name"], "logits");
    assert!(doc["what_is_this"]["stats"].as_str().is_some());

    // The text rendering is available for clipboard copy.
    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/results/text").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(text.starts_with("Output 0 (logits):"));
}
