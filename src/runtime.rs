// src/runtime.rs
//
// Trait boundary to the inference runtime. The harness never compiles or
// executes a graph itself; it hands model bytes to an `InferenceRuntime` and
// reads the resulting tensors back through these traits.

use std::error::Error;
use std::fmt;

use crate::tensor::{Accelerator, TensorData, TensorDescriptor};

#[derive(Debug)]
pub enum RuntimeError {
    Init(String),
    Compile(String),
    Execution(String),
    Transfer(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Init(msg) => write!(f, "Runtime initialization failed: {}", msg),
            RuntimeError::Compile(msg) => write!(f, "Model compilation failed: {}", msg),
            RuntimeError::Execution(msg) => write!(f, "Inference execution failed: {}", msg),
            RuntimeError::Transfer(msg) => write!(f, "Tensor transfer failed: {}", msg),
        }
    }
}

impl Error for RuntimeError {}

/// The collaborator that owns runtime support files, graph compilation and
/// execution. Implementations must be usable from the server's worker threads.
pub trait InferenceRuntime: Send {
    fn name(&self) -> &'static str;

    /// Loads the runtime's support files and prepares it for compilation.
    fn initialize(&mut self) -> Result<(), RuntimeError>;

    /// Compiles raw model bytes into an executable model. The runtime is the
    /// validator; the harness performs no format checks of its own.
    fn load_and_compile(&self, model_bytes: &[u8]) -> Result<Box<dyn CompiledModel>, RuntimeError>;
}

/// One compiled model with a declared input/output signature.
pub trait CompiledModel: Send {
    fn input_details(&self) -> &[TensorDescriptor];
    fn output_details(&self) -> &[TensorDescriptor];

    /// Executes one inference pass over a single input buffer.
    fn run(&mut self, input: &TensorData) -> Result<Vec<Box<dyn DeviceTensor>>, RuntimeError>;
}

/// A tensor handle owned by the runtime, possibly resident off the default
/// execution target.
pub trait DeviceTensor: Send + std::fmt::Debug {
    fn descriptor(&self) -> &TensorDescriptor;
    fn accelerator(&self) -> Accelerator;

    /// Produces a copy of this tensor on `target`. The caller owns the copy
    /// and is responsible for releasing it.
    fn move_to(&self, target: Accelerator) -> Result<Box<dyn DeviceTensor>, RuntimeError>;

    /// Copies the element data out. Only valid for tensors resident on the
    /// default target.
    fn read(&self) -> Result<TensorData, RuntimeError>;

    /// Returns the handle's storage to the runtime.
    fn release(&mut self);
}

/// A host-readable view of one output tensor, tagged by whether the harness
/// owns it.
///
/// An output already resident on the default target is read in place and must
/// never be released here; an output copied in from another target is owned by
/// the harness and is always released once its data has been read out.
pub enum HostTensor {
    Resident(Box<dyn DeviceTensor>),
    Copied(Box<dyn DeviceTensor>),
}

impl HostTensor {
    /// Stages `tensor` for host reads, copying it to the default target only
    /// when it lives elsewhere.
    pub fn stage(tensor: Box<dyn DeviceTensor>) -> Result<Self, RuntimeError> {
        if tensor.accelerator() == Accelerator::default() {
            Ok(HostTensor::Resident(tensor))
        } else {
            let copy = tensor.move_to(Accelerator::default())?;
            Ok(HostTensor::Copied(copy))
        }
    }

    pub fn descriptor(&self) -> &TensorDescriptor {
        match self {
            HostTensor::Resident(t) | HostTensor::Copied(t) => t.descriptor(),
        }
    }

    pub fn read(&self) -> Result<TensorData, RuntimeError> {
        match self {
            HostTensor::Resident(t) | HostTensor::Copied(t) => t.read(),
        }
    }

    /// Releases the handle if and only if it was copied in.
    pub fn finish(self) {
        match self {
            HostTensor::Resident(_) => {}
            HostTensor::Copied(mut t) => t.release(),
        }
    }
}
