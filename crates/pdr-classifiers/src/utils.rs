use candle_core::utils::{cuda_is_available, metal_is_available};
use candle_core::{Device, Tensor};
use ndarray::Array2;

use crate::error::{ClassifierError, Result};

/// Resolve a device string ("cpu", "cuda", "cuda:1", "metal") to a candle
/// device, failing with a configuration error when it is not available in
/// this build or on this host.
pub fn get_device(device_str: &str) -> Result<Device> {
    let device_str = device_str.trim().to_lowercase();
    let parse_index = |prefix: &str| -> Result<usize> {
        match device_str.strip_prefix(prefix) {
            None | Some("") => Ok(0),
            Some(rest) => rest.trim_start_matches(':').parse().map_err(|_| {
                ClassifierError::Configuration(format!("Invalid device index in '{}'", device_str))
            }),
        }
    };

    if device_str.starts_with("cuda") {
        let cuda_index = parse_index("cuda")?;
        if !cuda_is_available() {
            return Err(ClassifierError::Configuration(format!(
                "CUDA device {} is not available",
                cuda_index
            )));
        }
        Ok(Device::new_cuda(cuda_index)?)
    } else if device_str.starts_with("metal") {
        let metal_index = parse_index("metal")?;
        if !metal_is_available() {
            return Err(ClassifierError::Configuration(format!(
                "Metal device {} is not available",
                metal_index
            )));
        }
        Ok(Device::new_metal(metal_index)?)
    } else {
        match device_str.as_str() {
            "cpu" => Ok(Device::Cpu),
            _ => Err(ClassifierError::Configuration(format!(
                "Unsupported device type: {}",
                device_str
            ))),
        }
    }
}

/// Lay out a `(samples, features)` matrix as a `(samples, 1, features)`
/// tensor: one input channel whose length is the feature count, so each
/// feature is treated as a timestep.
pub fn matrix_to_sequence_tensor(x: &Array2<f32>, device: &Device) -> Result<Tensor> {
    let (n_samples, n_features) = x.dim();
    let data: Vec<f32> = x.iter().copied().collect();
    Ok(Tensor::from_vec(data, (n_samples, 1, n_features), device)?)
}

/// Copy a rank-2 tensor back into an ndarray matrix.
pub fn tensor_to_matrix(tensor: &Tensor) -> Result<Array2<f32>> {
    let (rows, cols) = tensor.dims2()?;
    let data = tensor.flatten_all()?.to_vec1::<f32>()?;
    Ok(Array2::from_shape_vec((rows, cols), data)?)
}
