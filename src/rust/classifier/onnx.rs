use std::collections::HashMap;
use std::path::Path;

use log::{error, info};
use ndarray::{Array2, ArrayView2};
use ort::session::Session;
use ort::value::{Tensor, ValueType};

use super::adapter::BinaryClassifier;
use crate::error::PredictorError;
use crate::runtime::{create_session_builder, RuntimeConfig};

pub const DEFAULT_LABEL_OUTPUT: &str = "label";
pub const DEFAULT_PROBABILITY_OUTPUT: &str = "probabilities";

/// A binary classifier exported to ONNX, as produced by skl2onnx with
/// `zipmap=False`: one float input of shape `[N, F]`, an int64 class output
/// of shape `[N]` and a float probability output of shape `[N, 2]`.
#[derive(Debug)]
pub struct OnnxClassifier {
    session: Session,
    input_name: String,
    label_output: String,
    probability_output: Option<String>,
    input_width: Option<usize>,
}

impl OnnxClassifier {
    /// Loads a classifier using the default output names
    pub fn from_file<P: AsRef<Path>>(path: P, runtime: &RuntimeConfig) -> Result<Self, PredictorError> {
        Self::from_file_with_outputs(path, runtime, DEFAULT_LABEL_OUTPUT, DEFAULT_PROBABILITY_OUTPUT)
    }

    /// Loads a classifier, naming its class and probability outputs
    ///
    /// # Errors
    /// - `ClassifierUnavailable` if the file is missing, cannot be loaded, or
    ///   lacks an input or the class output
    pub fn from_file_with_outputs<P: AsRef<Path>>(
        path: P,
        runtime: &RuntimeConfig,
        label_output: &str,
        probability_output: &str,
    ) -> Result<Self, PredictorError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PredictorError::ClassifierUnavailable(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        let session = create_session_builder(runtime)
            .and_then(|builder| builder.commit_from_file(path))
            .map_err(|e| {
                error!("Failed to load classifier from {:?}: {}", path, e);
                PredictorError::ClassifierUnavailable(format!("Failed to load {}: {}", path.display(), e))
            })?;

        let (input_name, input_width) = Self::validate_model(&session, label_output)?;
        let has_probabilities = session.outputs.iter().any(|o| o.name == probability_output);
        if !has_probabilities {
            info!("Model has no '{}' output, probabilities disabled", probability_output);
        }
        info!(
            "Classifier loaded from {:?} (input '{}', width {:?})",
            path, input_name, input_width
        );

        Ok(Self {
            session,
            input_name,
            label_output: label_output.to_string(),
            probability_output: has_probabilities.then(|| probability_output.to_string()),
            input_width,
        })
    }

    /// Checks the model has one input and the class output, and reads the
    /// input width when it is static
    fn validate_model(session: &Session, label_output: &str) -> Result<(String, Option<usize>), PredictorError> {
        let input = session.inputs.first().ok_or_else(|| {
            PredictorError::ClassifierUnavailable("Model must have at least 1 input".to_string())
        })?;
        if !session.outputs.iter().any(|o| o.name == label_output) {
            return Err(PredictorError::ClassifierUnavailable(format!(
                "Model has no '{}' output",
                label_output
            )));
        }

        let width = match &input.input_type {
            ValueType::Tensor { dimensions, .. } => dimensions
                .last()
                .and_then(|&d| usize::try_from(d).ok())
                .filter(|&d| d > 0),
            _ => None,
        };
        Ok((input.name.clone(), width))
    }

    /// Runs the model once, extracting the class output and, when asked
    /// and available, the probability output
    fn infer(
        &self,
        features: ArrayView2<'_, f64>,
        with_probabilities: bool,
    ) -> Result<(Vec<i64>, Option<Array2<f64>>), PredictorError> {
        let input_array = features.mapv(|v| v as f32).into_dyn();
        let input = input_array.as_standard_layout();

        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            self.input_name.as_str(),
            Tensor::from_array(&input)
                .map_err(|e| PredictorError::PredictionError(format!("Failed to create input tensor: {}", e)))?,
        );

        let outputs = self.session.run(input_tensors)
            .map_err(|e| PredictorError::PredictionError(format!("Failed to run model: {}", e)))?;

        let labels = outputs
            .get(self.label_output.as_str())
            .ok_or_else(|| PredictorError::PredictionError(format!("Missing '{}' output", self.label_output)))?
            .try_extract_tensor::<i64>()
            .map_err(|e| PredictorError::PredictionError(format!("Failed to extract labels: {}", e)))?;
        let labels: Vec<i64> = labels.iter().copied().collect();

        let name = match self.probability_output.as_deref() {
            Some(name) if with_probabilities => name,
            _ => return Ok((labels, None)),
        };
        let proba = outputs
            .get(name)
            .ok_or_else(|| PredictorError::PredictionError(format!("Missing '{}' output", name)))?
            .try_extract_tensor::<f32>()
            .map_err(|e| PredictorError::PredictionError(format!("Failed to extract probabilities: {}", e)))?;

        let shape = proba.shape().to_vec();
        if shape.len() != 2 {
            return Err(PredictorError::PredictionError(format!(
                "expected probabilities of rank 2, got shape {:?}",
                shape
            )));
        }
        let values: Vec<f64> = proba.iter().map(|&p| f64::from(p)).collect();
        let proba = Array2::from_shape_vec((shape[0], shape[1]), values)
            .map_err(|e| PredictorError::PredictionError(format!("Failed to read probabilities: {}", e)))?;
        Ok((labels, Some(proba)))
    }
}

impl BinaryClassifier for OnnxClassifier {
    fn expected_features(&self) -> Option<usize> {
        self.input_width
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<i64>, PredictorError> {
        self.infer(features, false).map(|(labels, _)| labels)
    }

    fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Result<Option<Array2<f64>>, PredictorError> {
        if self.probability_output.is_none() {
            return Ok(None);
        }
        self.infer(features, true).map(|(_, proba)| proba)
    }

    fn predict_with_proba(
        &self,
        features: ArrayView2<'_, f64>,
    ) -> Result<(Vec<i64>, Option<Array2<f64>>), PredictorError> {
        self.infer(features, self.probability_output.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_file() {
        let err = OnnxClassifier::from_file("/nonexistent/model.onnx", &RuntimeConfig::default()).unwrap_err();
        assert!(matches!(err, PredictorError::ClassifierUnavailable(_)));
    }
}
