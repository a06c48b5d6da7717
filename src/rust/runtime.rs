use once_cell::sync::OnceCell;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::Result as OrtResult;

static ENVIRONMENT: OnceCell<()> = OnceCell::new();

/// Settings for the ONNX Runtime sessions that host the classifier
#[derive(Debug)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization_level: GraphOptimizationLevel,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inter_threads: 0, // Let ONNX Runtime decide
            intra_threads: 0, // Let ONNX Runtime decide
            optimization_level: GraphOptimizationLevel::Level3,
        }
    }
}

impl Clone for RuntimeConfig {
    fn clone(&self) -> Self {
        Self {
            inter_threads: self.inter_threads,
            intra_threads: self.intra_threads,
            optimization_level: copy_level(&self.optimization_level),
        }
    }
}

impl RuntimeConfig {
    /// Builds a config from a numeric optimization level (0 disables, 3 is the maximum)
    pub fn with_level(inter_threads: usize, intra_threads: usize, level: u8) -> Self {
        let optimization_level = match level {
            0 => GraphOptimizationLevel::Disable,
            1 => GraphOptimizationLevel::Level1,
            2 => GraphOptimizationLevel::Level2,
            _ => GraphOptimizationLevel::Level3,
        };
        Self {
            inter_threads,
            intra_threads,
            optimization_level,
        }
    }

    pub fn level(&self) -> u8 {
        match self.optimization_level {
            GraphOptimizationLevel::Disable => 0,
            GraphOptimizationLevel::Level1 => 1,
            GraphOptimizationLevel::Level2 => 2,
            GraphOptimizationLevel::Level3 => 3,
        }
    }
}

fn copy_level(level: &GraphOptimizationLevel) -> GraphOptimizationLevel {
    match level {
        GraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
        GraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
        GraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        GraphOptimizationLevel::Disable => GraphOptimizationLevel::Disable,
    }
}

fn init_onnx_environment() -> OrtResult<()> {
    ort::init()
        .with_name("viral-predictor")
        .commit()?;
    Ok(())
}

/// Initialises the process-wide ONNX Runtime environment once. A failed
/// initialisation is retried on the next call.
pub fn ensure_initialized() -> OrtResult<()> {
    ENVIRONMENT.get_or_try_init(init_onnx_environment)?;
    Ok(())
}

pub fn create_session_builder(config: &RuntimeConfig) -> OrtResult<SessionBuilder> {
    ensure_initialized()?;
    let mut builder = Session::builder()?;

    // Configure threading
    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }

    builder = builder.with_optimization_level(copy_level(&config.optimization_level))?;

    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(RuntimeConfig::with_level(1, 2, 0).level(), 0);
        assert_eq!(RuntimeConfig::with_level(1, 2, 2).level(), 2);
        assert_eq!(RuntimeConfig::with_level(1, 2, 9).level(), 3);
        assert_eq!(RuntimeConfig::default().level(), 3);
    }

    #[test]
    fn test_clone_keeps_settings() {
        let config = RuntimeConfig::with_level(4, 2, 1);
        let cloned = config.clone();
        assert_eq!(cloned.inter_threads, 4);
        assert_eq!(cloned.intra_threads, 2);
        assert_eq!(cloned.level(), 1);
    }
}
