//! # Web Server Routes for the Inference Demo UI
//!
//! This module defines the Actix web server routes and handlers for the
//! in-browser inference demo. It serves the main HTML page and the runtime
//! support files, handles model uploads, and exposes the inference session's
//! run/export/copy operations over HTTP.

use actix_files::NamedFile;
use actix_multipart::Multipart;
use actix_web::{web, App, Error, HttpResponse, HttpServer};
use chrono::Utc;
use futures_util::TryStreamExt;
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, TryLockError};

use crate::config::HarnessConfig;
use crate::export::export_file_name;
use crate::session::{InferenceSession, SessionError};
use crate::tensor::TensorDescriptor;

/// The session is shared across workers and locked for the duration of each
/// operation; `/run` refuses to queue behind an in-flight run.
pub type SharedSession = web::Data<Mutex<InferenceSession>>;

/// Serves the main HTML page for the demo UI.
///
/// This function handles GET requests to the root path (`/`). It
/// asynchronously opens and returns the configured page file.
pub async fn index(config: web::Data<HarnessConfig>) -> actix_web::Result<NamedFile> {
    Ok(NamedFile::open_async(&config.page_path).await?)
}

fn wasm_content_type(file_name: &str) -> &'static str {
    if file_name.ends_with(".wasm") {
        "application/wasm"
    } else if file_name.ends_with(".js") {
        "application/javascript"
    } else {
        "application/octet-stream"
    }
}

/// Serves one runtime support file from the configured wasm directory.
///
/// The file name must be a bare name; anything that could climb out of the
/// directory is answered 404. Successful responses carry the content type
/// chosen by suffix plus the two cross-origin isolation headers the runtime
/// needs (`COEP: require-corp`, `COOP: same-origin`). A missing file is 404,
/// a read failure 500; neither ever terminates the server.
pub async fn wasm_file(
    config: web::Data<HarnessConfig>,
    path: web::Path<String>,
) -> HttpResponse {
    let file_name = path.into_inner();
    if file_name.is_empty() {
        return HttpResponse::BadRequest().body("File name required");
    }
    if file_name.contains('/') || file_name.contains('\\') || file_name.contains("..") {
        return HttpResponse::NotFound().body("File not found");
    }

    let file_path = Path::new(&config.wasm_dir).join(&file_name);
    match std::fs::read(&file_path) {
        Ok(bytes) => HttpResponse::Ok()
            .content_type(wasm_content_type(&file_name))
            .insert_header(("Cross-Origin-Embedder-Policy", "require-corp"))
            .insert_header(("Cross-Origin-Opener-Policy", "same-origin"))
            .body(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            HttpResponse::NotFound().body("File not found")
        }
        Err(e) => HttpResponse::InternalServerError().body(format!("Error: {}", e)),
    }
}

#[derive(Serialize)]
struct ModelDetailsResponse<'a> {
    model: &'a str,
    status: &'static str,
    inputs: &'a [TensorDescriptor],
    outputs: &'a [TensorDescriptor],
}

/// Handles the model upload from the UI.
///
/// Expects `multipart/form-data` with one file field. The file is read fully
/// into memory and handed to the session for compilation; no local format
/// validation is performed (the runtime is the validator). On success the
/// response lists the model's declared input and output signatures.
pub async fn upload_model(
    session: SharedSession,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    let mut file_name = String::from("unknown_file");
    let mut file_bytes: Vec<u8> = Vec::new();
    let mut saw_file = false;

    while let Some(mut field) = payload.try_next().await? {
        let name = field.content_disposition().get_filename().map(str::to_string);
        // One model per upload; non-file fields and any further file fields
        // are drained and ignored.
        let keep = !saw_file && name.is_some();
        if let Some(name) = name.filter(|_| keep) {
            saw_file = true;
            file_name = name;
        }
        while let Some(chunk) = field.try_next().await? {
            if keep {
                file_bytes.extend_from_slice(&chunk);
            }
        }
    }

    if !saw_file {
        return Ok(HttpResponse::BadRequest().body("No model file in upload"));
    }

    let mut guard = match session.lock() {
        Ok(g) => g,
        Err(_) => return Ok(HttpResponse::InternalServerError().body("Session lock poisoned")),
    };

    match guard.load_model(&file_bytes, &file_name) {
        Ok(()) => {
            let response = ModelDetailsResponse {
                model: guard.model_name().unwrap_or(&file_name),
                status: "Model ready. Click Run Inference to execute.",
                inputs: guard.input_details().unwrap_or_default(),
                outputs: guard.output_details().unwrap_or_default(),
            };
            Ok(HttpResponse::Ok().json(&response))
        }
        Err(e @ SessionError::ModelCompile(_)) => {
            Ok(HttpResponse::BadRequest().body(e.to_string()))
        }
        Err(e) => Ok(HttpResponse::InternalServerError().body(e.to_string())),
    }
}

/// Executes one inference pass and answers the stored result list as JSON.
///
/// While a run is in flight the session lock is held, so an overlapping
/// request is answered `409 Conflict` instead of being queued.
pub async fn run_inference(session: SharedSession) -> HttpResponse {
    let mut guard = match session.try_lock() {
        Ok(g) => g,
        Err(TryLockError::WouldBlock) => {
            return HttpResponse::Conflict().body("A run is already in progress")
        }
        Err(TryLockError::Poisoned(_)) => {
            return HttpResponse::InternalServerError().body("Session lock poisoned")
        }
    };

    match guard.run_inference() {
        Ok(results) => HttpResponse::Ok().json(results),
        Err(e @ SessionError::NoModelLoaded) => HttpResponse::BadRequest().body(e.to_string()),
        Err(
            e @ (SessionError::UnsupportedDtype(_) | SessionError::MissingInputDescriptor),
        ) => HttpResponse::UnprocessableEntity().body(e.to_string()),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

/// The full results document as a timestamped attachment download.
pub async fn export_results(session: SharedSession) -> HttpResponse {
    let mut guard = match session.lock() {
        Ok(g) => g,
        Err(_) => return HttpResponse::InternalServerError().body("Session lock poisoned"),
    };

    let now = Utc::now();
    match guard.export_document(now) {
        Ok(json) => HttpResponse::Ok()
            .content_type("application/json")
            .insert_header((
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", export_file_name(now)),
            ))
            .body(json),
        Err(e @ SessionError::NoResults) => HttpResponse::NotFound().body(e.to_string()),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

/// The condensed text summary the UI copies to the clipboard.
pub async fn results_text(session: SharedSession) -> HttpResponse {
    let guard = match session.lock() {
        Ok(g) => g,
        Err(_) => return HttpResponse::InternalServerError().body("Session lock poisoned"),
    };

    match guard.copy_text() {
        Ok(text) => HttpResponse::Ok().content_type("text/plain").body(text),
        Err(e @ SessionError::NoResults) => HttpResponse::NotFound().body(e.to_string()),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

/// The session's timestamped event log, the text shown in the demo page's
/// output panel.
pub async fn session_log(session: SharedSession) -> HttpResponse {
    let guard = match session.lock() {
        Ok(g) => g,
        Err(_) => return HttpResponse::InternalServerError().body("Session lock poisoned"),
    };
    HttpResponse::Ok()
        .content_type("text/plain")
        .body(guard.event_log_text())
}

/// Registers every route; `run_server` and the tests share this wiring.
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/wasm/{filename}", web::get().to(wasm_file))
        .route("/upload", web::post().to(upload_model))
        .route("/run", web::post().to(run_inference))
        .route("/results/export", web::get().to(export_results))
        .route("/results/text", web::get().to(results_text))
        .route("/log", web::get().to(session_log));
}

/// Initializes and runs the Actix web server.
///
/// # Returns
/// A `std::io::Result<()>` which is `Ok(())` if the server runs successfully,
/// or an `Err` if there's an issue binding to the port or starting the server.
pub async fn run_server(config: HarnessConfig, session: InferenceSession) -> std::io::Result<()> {
    println!("Starting server at http://{}:{}/", config.host, config.port);
    println!("Open your browser to run LiteRT inference");

    let bind_addr = (config.host.clone(), config.port);
    let session = web::Data::new(Mutex::new(session));
    let config = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .app_data(session.clone())
            .app_data(config.clone())
            .configure(configure_app)
    })
    .bind(bind_addr)?
    .run()
    .await
}
