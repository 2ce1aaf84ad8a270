// src/mock.rs
//
// Deterministic in-process stand-in for the external inference runtime. The
// demo binary and the test suite drive the full session flow through it
// without a browser or the real wasm runtime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::runtime::{CompiledModel, DeviceTensor, InferenceRuntime, RuntimeError};
use crate::tensor::{Accelerator, DType, TensorData, TensorDescriptor};

/// A runtime-owned tensor handle with scripted residency.
///
/// Clones share the release probe, so a test can keep the probe from the
/// tensor it scripted and observe whether any handle derived from it (the
/// tensor itself or a host copy) was released.
#[derive(Debug, Clone)]
pub struct MockTensor {
    desc: TensorDescriptor,
    data: TensorData,
    accelerator: Accelerator,
    released: Arc<AtomicBool>,
}

impl MockTensor {
    pub fn new(desc: TensorDescriptor, data: TensorData, accelerator: Accelerator) -> Self {
        Self {
            desc,
            data,
            accelerator,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn release_probe(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released)
    }
}

impl DeviceTensor for MockTensor {
    fn descriptor(&self) -> &TensorDescriptor {
        &self.desc
    }

    fn accelerator(&self) -> Accelerator {
        self.accelerator
    }

    fn move_to(&self, target: Accelerator) -> Result<Box<dyn DeviceTensor>, RuntimeError> {
        let mut copy = self.clone();
        copy.accelerator = target;
        Ok(Box::new(copy))
    }

    fn read(&self) -> Result<TensorData, RuntimeError> {
        if self.accelerator != Accelerator::default() {
            return Err(RuntimeError::Transfer(format!(
                "tensor '{}' is resident on {} and is not host-readable",
                self.desc.name, self.accelerator
            )));
        }
        Ok(self.data.clone())
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// A compiled model with a scripted signature and scripted outputs.
#[derive(Debug, Clone)]
pub struct MockModel {
    inputs: Vec<TensorDescriptor>,
    output_descs: Vec<TensorDescriptor>,
    outputs: Vec<MockTensor>,
    fail_run: Option<String>,
}

impl MockModel {
    pub fn new(inputs: Vec<TensorDescriptor>, outputs: Vec<MockTensor>) -> Self {
        let output_descs = outputs.iter().map(|t| t.desc.clone()).collect();
        Self {
            inputs,
            output_descs,
            outputs,
            fail_run: None,
        }
    }

    /// Scripts `run` to fail with an execution error.
    pub fn failing_run(mut self, message: impl Into<String>) -> Self {
        self.fail_run = Some(message.into());
        self
    }

    /// Overrides the declared output details, e.g. to model a runtime that
    /// names fewer outputs than it produces.
    pub fn with_output_details(mut self, descs: Vec<TensorDescriptor>) -> Self {
        self.output_descs = descs;
        self
    }
}

impl CompiledModel for MockModel {
    fn input_details(&self) -> &[TensorDescriptor] {
        &self.inputs
    }

    fn output_details(&self) -> &[TensorDescriptor] {
        &self.output_descs
    }

    fn run(&mut self, input: &TensorData) -> Result<Vec<Box<dyn DeviceTensor>>, RuntimeError> {
        if let Some(msg) = &self.fail_run {
            return Err(RuntimeError::Execution(msg.clone()));
        }
        if let Some(first) = self.inputs.first() {
            if input.len() != first.total_elements() {
                return Err(RuntimeError::Execution(format!(
                    "input has {} elements, model expects {}",
                    input.len(),
                    first.total_elements()
                )));
            }
            if input.dtype() != first.dtype {
                return Err(RuntimeError::Execution(format!(
                    "input dtype {} does not match declared {}",
                    input.dtype(),
                    first.dtype
                )));
            }
        }
        Ok(self
            .outputs
            .iter()
            .cloned()
            .map(|t| Box::new(t) as Box<dyn DeviceTensor>)
            .collect())
    }
}

/// Runtime stand-in that hands out clones of one scripted model.
pub struct MockRuntime {
    model: MockModel,
    initialized: bool,
    fail_init: Option<String>,
}

impl MockRuntime {
    pub fn new(model: MockModel) -> Self {
        Self {
            model,
            initialized: false,
            fail_init: None,
        }
    }

    /// A small GPT-2-shaped demo model: token ids in, a deterministic logits
    /// grid out.
    pub fn demo() -> Self {
        let inputs = vec![TensorDescriptor::new("input_ids", vec![1, 64], DType::Int32)];
        let logits_desc = TensorDescriptor::new("logits", vec![1, 64, 256], DType::Float32);
        let values: Vec<f32> = (0..logits_desc.total_elements())
            .map(|i| (i % 17) as f32 * 0.125 - 1.0)
            .collect();
        let logits = MockTensor::new(logits_desc, TensorData::Float32(values), Accelerator::Wasm);
        Self::new(MockModel::new(inputs, vec![logits]))
    }

    /// Scripts `initialize` to fail.
    pub fn failing_init(mut self, message: impl Into<String>) -> Self {
        self.fail_init = Some(message.into());
        self
    }
}

impl InferenceRuntime for MockRuntime {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn initialize(&mut self) -> Result<(), RuntimeError> {
        if let Some(msg) = &self.fail_init {
            return Err(RuntimeError::Init(msg.clone()));
        }
        self.initialized = true;
        Ok(())
    }

    fn load_and_compile(&self, model_bytes: &[u8]) -> Result<Box<dyn CompiledModel>, RuntimeError> {
        if !self.initialized {
            return Err(RuntimeError::Init("runtime has not been initialized".to_string()));
        }
        if model_bytes.is_empty() {
            return Err(RuntimeError::Compile("model file was empty".to_string()));
        }
        Ok(Box::new(self.model.clone()))
    }
}
