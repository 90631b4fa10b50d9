use candle_core::Device;

/// `APP_FORCE_CPU=1` keeps inference on the CPU even when an accelerator
/// feature is compiled in.
fn force_cpu() -> bool {
    std::env::var("APP_FORCE_CPU").map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

/// Inference device shared by the embedder and the cross-encoder: an
/// accelerator when one was compiled in and responds, otherwise the CPU.
pub fn select_device() -> Device {
    if force_cpu() {
        tracing::info!(device = "cpu", "inference device (forced)");
        return Device::Cpu;
    }
    #[cfg(feature = "cuda")]
    {
        match Device::new_cuda(0) {
            Ok(dev) => {
                tracing::info!(device = "cuda:0", "inference device");
                return dev;
            }
            Err(e) => tracing::warn!(error = %e, "CUDA unavailable, trying next device"),
        }
    }
    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(dev) => {
                tracing::info!(device = "metal:0", "inference device");
                return dev;
            }
            Err(e) => tracing::warn!(error = %e, "Metal unavailable, falling back to CPU"),
        }
    }
    tracing::info!(device = "cpu", "inference device");
    Device::Cpu
}
