// src/tensor.rs

use serde::{Serialize, Serializer};

/// Element kinds a compiled model can declare for its tensors.
///
/// The runtime reports these as lowercase string tags (`"float32"`, `"int32"`, ...).
/// Only `Float32` and `Int32` can be synthesized locally; the remaining tags exist
/// so a model declaring one of them is reported as unsupported instead of being
/// silently mangled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Float32,
    Int32,
    Float16,
    Int64,
    UInt8,
    Bool,
}

impl DType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DType::Float32 => "float32",
            DType::Int32 => "int32",
            DType::Float16 => "float16",
            DType::Int64 => "int64",
            DType::UInt8 => "uint8",
            DType::Bool => "bool",
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for DType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// Represents the execution target a tensor physically resides on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accelerator {
    Wasm,
    WebGpu,
}

impl Default for Accelerator {
    fn default() -> Self {
        Accelerator::Wasm // The CPU-in-browser target is the default
    }
}

impl std::fmt::Display for Accelerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Accelerator::Wasm => write!(f, "wasm"),
            Accelerator::WebGpu => write!(f, "webgpu"),
        }
    }
}

/// Declared signature of one model input or output.
///
/// `name` falls back to a positional placeholder (`output_<i>`) when the runtime
/// does not supply one; callers construct that fallback themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TensorDescriptor {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: DType,
}

impl TensorDescriptor {
    pub fn new(name: impl Into<String>, shape: Vec<usize>, dtype: DType) -> Self {
        Self {
            name: name.into(),
            shape,
            dtype,
        }
    }

    /// Count of scalar values in the tensor: the product of all shape entries.
    pub fn total_elements(&self) -> usize {
        self.shape.iter().product()
    }
}

/// A flat, host-resident buffer of tensor elements.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    Float32(Vec<f32>),
    Int32(Vec<i32>),
}

impl TensorData {
    pub fn len(&self) -> usize {
        match self {
            TensorData::Float32(v) => v.len(),
            TensorData::Int32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        match self {
            TensorData::Float32(_) => DType::Float32,
            TensorData::Int32(_) => DType::Int32,
        }
    }

    /// Raw little-endian byte view, for handing the buffer across the runtime
    /// boundary without copying.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            TensorData::Float32(v) => bytemuck::cast_slice(v),
            TensorData::Int32(v) => bytemuck::cast_slice(v),
        }
    }

    /// The first `min(len, cap)` elements widened to f64, the form results are
    /// stored and exported in.
    pub fn sample_values(&self, cap: usize) -> Vec<f64> {
        match self {
            TensorData::Float32(v) => v.iter().take(cap).map(|&x| f64::from(x)).collect(),
            TensorData::Int32(v) => v.iter().take(cap).map(|&x| f64::from(x)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_elements_is_product_of_shape() {
        let desc = TensorDescriptor::new("logits", vec![1, 64, 50257], DType::Float32);
        assert_eq!(desc.total_elements(), 64 * 50257);

        let scalar = TensorDescriptor::new("flag", vec![], DType::Int32);
        assert_eq!(scalar.total_elements(), 1); // empty product

        let degenerate = TensorDescriptor::new("empty", vec![4, 0, 2], DType::Float32);
        assert_eq!(degenerate.total_elements(), 0);
    }

    #[test]
    fn dtype_tags_round_trip_through_display() {
        assert_eq!(DType::Float32.to_string(), "float32");
        assert_eq!(DType::Int32.to_string(), "int32");
        assert_eq!(DType::Float16.to_string(), "float16");
    }

    #[test]
    fn default_accelerator_is_wasm() {
        assert_eq!(Accelerator::default(), Accelerator::Wasm);
    }

    #[test]
    fn byte_view_is_little_endian() {
        let data = TensorData::Int32(vec![1, 256]);
        assert_eq!(data.as_bytes(), &[1, 0, 0, 0, 0, 1, 0, 0]);

        let floats = TensorData::Float32(vec![0.5]);
        assert_eq!(floats.as_bytes(), &0.5f32.to_le_bytes());
    }

    #[test]
    fn sample_values_takes_a_prefix() {
        let data = TensorData::Int32((0..10).collect());
        assert_eq!(data.sample_values(4), vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(data.sample_values(100).len(), 10);
    }
}
