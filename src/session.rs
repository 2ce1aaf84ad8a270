// src/session.rs
//
// One inference session: runtime initialization, model compilation, input
// synthesis, a single inference pass, and the reduction of each output into a
// stored result record. All session state lives on this object; the caller
// (the web layer) owns it and serializes access.

use std::error::Error;
use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::export::{clipboard_text, ResultsDocument};
use crate::runtime::{CompiledModel, HostTensor, InferenceRuntime, RuntimeError};
use crate::stats::{tensor_stats, SummaryStatistics};
use crate::tensor::{DType, TensorData, TensorDescriptor};

/// Cap on raw values stored per output tensor; larger outputs keep a prefix.
pub const MAX_DATA_SAMPLE: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    RuntimeLoading,
    RuntimeReady,
    ModelLoading,
    ModelReady,
    InputPrepared,
    Inferring,
    OutputsReady,
    ResultsExported,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::RuntimeLoading => "runtime-loading",
            SessionState::RuntimeReady => "runtime-ready",
            SessionState::ModelLoading => "model-loading",
            SessionState::ModelReady => "model-ready",
            SessionState::InputPrepared => "input-prepared",
            SessionState::Inferring => "inferring",
            SessionState::OutputsReady => "outputs-ready",
            SessionState::ResultsExported => "results-exported",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug)]
pub enum SessionError {
    RuntimeInit(RuntimeError),
    RuntimeNotReady,
    ModelCompile(RuntimeError),
    NoModelLoaded,
    MissingInputDescriptor,
    UnsupportedDtype(String),
    Inference(RuntimeError),
    NoResults,
    Export(serde_json::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::RuntimeInit(e) => write!(f, "Error initializing runtime: {}", e),
            SessionError::RuntimeNotReady => write!(f, "Runtime is not initialized yet"),
            SessionError::ModelCompile(e) => write!(f, "Error loading model: {}", e),
            SessionError::NoModelLoaded => {
                write!(f, "No model loaded. Please upload a model first.")
            }
            SessionError::MissingInputDescriptor => write!(f, "Model has no input details"),
            SessionError::UnsupportedDtype(tag) => write!(f, "Unsupported input dtype: {}", tag),
            SessionError::Inference(e) => write!(f, "Inference failed: {}", e),
            SessionError::NoResults => write!(f, "No inference results available"),
            SessionError::Export(e) => write!(f, "Failed to serialize results: {}", e),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SessionError::RuntimeInit(e)
            | SessionError::ModelCompile(e)
            | SessionError::Inference(e) => Some(e),
            SessionError::Export(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Export(err)
    }
}

/// One stored output record: descriptor fields, summary statistics and a
/// bounded sample of the raw values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceResult {
    pub name: String,
    pub data: Vec<f64>,
    pub shape: Vec<usize>,
    pub dtype: String,
    pub stats: SummaryStatistics,
    #[serde(rename = "totalElements")]
    pub total_elements: usize,
}

/// Materializes the deterministic input buffer for a declared input signature.
///
/// int32 inputs are filled with 0, float32 inputs with 0.5. Any other declared
/// element kind aborts the run before the runtime is invoked.
pub fn synthesize_input(desc: &TensorDescriptor) -> Result<TensorData, SessionError> {
    let count = desc.total_elements();
    match desc.dtype {
        DType::Int32 => Ok(TensorData::Int32(vec![0; count])),
        DType::Float32 => Ok(TensorData::Float32(vec![0.5; count])),
        other => Err(SessionError::UnsupportedDtype(other.to_string())),
    }
}

pub struct InferenceSession {
    runtime: Box<dyn InferenceRuntime>,
    state: SessionState,
    model: Option<Box<dyn CompiledModel>>,
    model_name: Option<String>,
    last_results: Option<Vec<InferenceResult>>,
    events: Vec<String>,
}

impl InferenceSession {
    pub fn new(runtime: Box<dyn InferenceRuntime>) -> Self {
        Self {
            runtime,
            state: SessionState::Idle,
            model: None,
            model_name: None,
            last_results: None,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model_name.as_deref()
    }

    pub fn input_details(&self) -> Option<&[TensorDescriptor]> {
        self.model.as_ref().map(|m| m.input_details())
    }

    pub fn output_details(&self) -> Option<&[TensorDescriptor]> {
        self.model.as_ref().map(|m| m.output_details())
    }

    pub fn last_results(&self) -> Option<&[InferenceResult]> {
        self.last_results.as_deref()
    }

    /// Timestamped event lines, oldest first. This is the text shown in the
    /// demo page's output panel.
    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn event_log_text(&self) -> String {
        let mut text = self.events.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        text
    }

    fn log_event(&mut self, message: impl Into<String>) {
        let message = message.into();
        if message.starts_with("ERROR") {
            log::error!("{}", message);
        } else {
            log::info!("{}", message);
        }
        let timestamp = Local::now().format("%H:%M:%S");
        self.events.push(format!("[{}] {}", timestamp, message));
    }

    /// Loads the runtime's support files. `Idle -> RuntimeLoading ->
    /// RuntimeReady`, falling back to `Idle` on failure.
    pub fn initialize(&mut self) -> Result<(), SessionError> {
        self.state = SessionState::RuntimeLoading;
        self.log_event(format!("Loading {} runtime support files...", self.runtime.name()));
        match self.runtime.initialize() {
            Ok(()) => {
                self.state = SessionState::RuntimeReady;
                self.log_event(format!("{} runtime initialized successfully", self.runtime.name()));
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Idle;
                let err = SessionError::RuntimeInit(e);
                self.log_event(format!("ERROR: {}", err));
                Err(err)
            }
        }
    }

    /// Compiles raw model bytes. `-> ModelLoading -> ModelReady`, falling back
    /// to `RuntimeReady` on failure. The bytes are passed through unvalidated;
    /// the runtime is the validator.
    pub fn load_model(&mut self, model_bytes: &[u8], file_name: &str) -> Result<(), SessionError> {
        if matches!(self.state, SessionState::Idle | SessionState::RuntimeLoading) {
            let err = SessionError::RuntimeNotReady;
            self.log_event(format!("ERROR: {}", err));
            return Err(err);
        }

        self.state = SessionState::ModelLoading;
        self.log_event(format!(
            "Loading model: {} ({:.2} KB)",
            file_name,
            model_bytes.len() as f64 / 1024.0
        ));

        match self.runtime.load_and_compile(model_bytes) {
            Ok(model) => {
                self.log_event("Model loaded successfully");
                self.log_event(format!("Input details: {:?}", model.input_details()));
                self.log_event(format!("Output details: {:?}", model.output_details()));
                self.model = Some(model);
                self.model_name = Some(file_name.to_string());
                self.state = SessionState::ModelReady;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::RuntimeReady;
                let err = SessionError::ModelCompile(e);
                self.log_event(format!("ERROR: {}", err));
                Err(err)
            }
        }
    }

    /// Runs one inference pass: synthesize the input from the first declared
    /// input descriptor, execute, reduce every output to a stored result.
    /// `ModelReady -> InputPrepared -> Inferring -> OutputsReady`, falling
    /// back to `ModelReady` on failure. The previous result list is discarded
    /// up front.
    pub fn run_inference(&mut self) -> Result<&[InferenceResult], SessionError> {
        let mut model = match self.model.take() {
            Some(m) => m,
            None => {
                let err = SessionError::NoModelLoaded;
                self.log_event(format!("ERROR: {}", err));
                return Err(err);
            }
        };

        self.last_results = None;
        let outcome = self.execute(model.as_mut());
        self.model = Some(model);

        match outcome {
            Ok(results) => {
                self.last_results = Some(results);
                self.state = SessionState::OutputsReady;
                self.log_event("Inference complete. Results available for download.");
                Ok(self.last_results.as_deref().unwrap_or_default())
            }
            Err(e) => {
                self.state = SessionState::ModelReady;
                self.log_event(format!("ERROR: {}", e));
                Err(e)
            }
        }
    }

    fn execute(&mut self, model: &mut dyn CompiledModel) -> Result<Vec<InferenceResult>, SessionError> {
        let first_input = model
            .input_details()
            .first()
            .cloned()
            .ok_or(SessionError::MissingInputDescriptor)?;

        let input = synthesize_input(&first_input)?;
        self.log_event(format!(
            "Creating input tensor with dtype: {}, shape: [{}]",
            first_input.dtype,
            join_shape(&first_input.shape)
        ));
        self.state = SessionState::InputPrepared;

        self.log_event("Running model inference...");
        self.state = SessionState::Inferring;
        let outputs = model.run(&input).map_err(SessionError::Inference)?;
        let output_details = model.output_details().to_vec();
        self.log_event(format!("Got {} output(s)", outputs.len()));

        let mut results = Vec::with_capacity(outputs.len());
        for (i, tensor) in outputs.into_iter().enumerate() {
            let host = HostTensor::stage(tensor).map_err(SessionError::Inference)?;
            let desc = host.descriptor().clone();
            let data = host.read().map_err(SessionError::Inference)?;
            host.finish();

            let name = output_details
                .get(i)
                .map(|d| d.name.clone())
                .unwrap_or_else(|| format!("output_{}", i));
            let total_elements = data.len();
            let stats = tensor_stats(&data);
            let sample = data.sample_values(MAX_DATA_SAMPLE);

            self.log_event(format!("Output {} ({}):", i, name));
            self.log_event(format!("  Shape: [{}]", join_shape(&desc.shape)));
            self.log_event(format!("  Dtype: {}", desc.dtype));
            self.log_event(format!(
                "  Stats: min={:.4}, max={:.4}, mean={:.4}, std={:.4}",
                stats.min, stats.max, stats.mean, stats.std
            ));
            if total_elements > MAX_DATA_SAMPLE {
                self.log_event(format!(
                    "  Total elements: {} (stored sample of {})",
                    total_elements, MAX_DATA_SAMPLE
                ));
            } else {
                self.log_event(format!("  Total elements: {}", total_elements));
            }

            results.push(InferenceResult {
                name,
                data: sample,
                shape: desc.shape,
                dtype: desc.dtype.to_string(),
                stats,
                total_elements,
            });
        }

        Ok(results)
    }

    /// The full export document as pretty-printed JSON. A successful export
    /// moves the session to `ResultsExported`.
    pub fn export_document(&mut self, now: DateTime<Utc>) -> Result<String, SessionError> {
        let results = self.last_results.as_deref().ok_or(SessionError::NoResults)?;
        let model_name = self
            .model_name
            .clone()
            .unwrap_or_else(|| "GPT-2 LiteRT model".to_string());
        let doc = ResultsDocument::new(&model_name, results, now);
        let json = serde_json::to_string_pretty(&doc)?;
        self.state = SessionState::ResultsExported;
        self.log_event("Results downloaded as JSON with metadata");
        Ok(json)
    }

    /// The condensed plain-text rendering intended for clipboard copy.
    pub fn copy_text(&self) -> Result<String, SessionError> {
        let results = self.last_results.as_deref().ok_or(SessionError::NoResults)?;
        Ok(clipboard_text(results))
    }
}

fn join_shape(shape: &[usize]) -> String {
    shape
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
