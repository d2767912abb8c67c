//! Accelerator precondition.
//!
//! The rendering server cannot do useful work without a CUDA device,
//! so a worker that starts on a GPU-less host must refuse to accept
//! jobs at all rather than fail every job it is handed.

use nvml_wrapper::Nvml;

/// No usable accelerator at process start.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("NVML initialisation failed: {0}")]
    Nvml(#[from] nvml_wrapper::error::NvmlError),

    #[error("no CUDA-capable GPU visible on this host")]
    NoDevice,
}

/// Assert that at least one CUDA device is visible.
///
/// On success, pins `CUDA_VISIBLE_DEVICES=0` so the rendering server
/// and the worker agree on the device.
pub fn assert_gpu_available() -> Result<(), GpuError> {
    let nvml = Nvml::init()?;
    let count = nvml.device_count()?;
    if count == 0 {
        return Err(GpuError::NoDevice);
    }

    std::env::set_var("CUDA_VISIBLE_DEVICES", "0");
    tracing::info!(gpu_count = count, "CUDA device available");
    Ok(())
}
