// src/stats.rs
//
// Summary statistics over a flat output buffer. This mirrors the reduction the
// result viewer performs before results are stored or exported.

use serde::Serialize;

use crate::tensor::TensorData;

/// Five-number summary of one output tensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub sum: f64,
    pub std: f64,
}

/// Reduces a buffer to `{min, max, mean, sum, std}` in two passes.
///
/// Elements that are not a number are skipped for min/max/sum accumulation and
/// for the squared-deviation sum, but `mean` and the variance still divide by
/// the total element count, skipped elements included. An empty buffer yields
/// `min = +inf`, `max = -inf`, `sum = 0` and NaN mean/std; callers rely on
/// these boundary values, so there is no guarded error path.
pub fn summarize<T: Into<f64> + Copy>(data: &[T]) -> SummaryStatistics {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;

    for &v in data {
        let val: f64 = v.into();
        if !val.is_nan() {
            if val < min {
                min = val;
            }
            if val > max {
                max = val;
            }
            sum += val;
        }
    }

    let mean = sum / data.len() as f64;

    let mut variance = 0.0;
    for &v in data {
        let val: f64 = v.into();
        if !val.is_nan() {
            let diff = val - mean;
            variance += diff * diff;
        }
    }
    variance /= data.len() as f64;
    let std = variance.sqrt();

    SummaryStatistics {
        min,
        max,
        mean,
        sum,
        std,
    }
}

/// Dispatches `summarize` over the buffer's element kind.
pub fn tensor_stats(data: &TensorData) -> SummaryStatistics {
    match data {
        TensorData::Float32(v) => summarize(v),
        TensorData::Int32(v) => summarize(v),
    }
}
