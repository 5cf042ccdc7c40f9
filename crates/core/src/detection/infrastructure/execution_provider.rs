use ort::execution_providers::ExecutionProviderDispatch;

/// Hardware accelerator tried before ONNX Runtime's CPU fallback, if any.
pub fn accelerator_name() -> Option<&'static str> {
    if cfg!(target_os = "macos") {
        Some("CoreML")
    } else if cfg!(target_os = "windows") {
        Some("DirectML")
    } else {
        None
    }
}

/// Execution providers registered on every inference session.
///
/// ONNX Runtime silently falls back to CPU when a provider fails to
/// register, so an empty list and a failed accelerator behave the same.
pub fn preferred_execution_providers() -> Vec<ExecutionProviderDispatch> {
    log::debug!(
        "Inference accelerator: {}",
        accelerator_name().unwrap_or("none (CPU)")
    );

    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}
