use log::debug;
use ndarray::{Array2, ArrayView2};

use super::prediction::{ClassProbabilities, Prediction, ViralLabel};
use crate::error::PredictorError;
use crate::features::{FeatureMatrix, FeatureSchema};

/// A trained binary classifier, consumed as an opaque function.
///
/// Implementations receive one row per post with columns in the order the
/// model was trained on. `predict` returns one class index per row;
/// `predict_proba` returns one `(p0, p1)` row per input row, or `None`
/// when the model has no probability output. Models that produce both in
/// one run should override `predict_with_proba`.
pub trait BinaryClassifier: Send + Sync {
    /// Number of input columns the model declares, when it declares one
    fn expected_features(&self) -> Option<usize> {
        None
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<i64>, PredictorError>;

    fn predict_proba(&self, _features: ArrayView2<'_, f64>) -> Result<Option<Array2<f64>>, PredictorError> {
        Ok(None)
    }

    /// Classes and probabilities of the same rows
    fn predict_with_proba(
        &self,
        features: ArrayView2<'_, f64>,
    ) -> Result<(Vec<i64>, Option<Array2<f64>>), PredictorError> {
        let classes = self.predict(features)?;
        let probabilities = self.predict_proba(features)?;
        Ok((classes, probabilities))
    }
}

/// Guards a `BinaryClassifier` with the feature schema it was trained on.
///
/// Every matrix is checked against the schema before the model sees it, and
/// every model output is checked against the input before it is returned.
pub struct ClassifierAdapter {
    schema: FeatureSchema,
    model: Box<dyn BinaryClassifier>,
}

impl std::fmt::Debug for ClassifierAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierAdapter")
            .field("schema", &self.schema)
            .field("expected_features", &self.model.expected_features())
            .finish()
    }
}

impl ClassifierAdapter {
    /// Wraps a model, failing fast when its declared width differs from the schema
    ///
    /// # Errors
    /// - `FeatureCountMismatch` if the model declares a different input width
    pub fn new(schema: FeatureSchema, model: Box<dyn BinaryClassifier>) -> Result<Self, PredictorError> {
        if let Some(width) = model.expected_features() {
            if width != schema.len() {
                return Err(PredictorError::FeatureCountMismatch {
                    expected: schema.len(),
                    actual: width,
                });
            }
        }
        Ok(Self { schema, model })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn check_input(&self, matrix: &FeatureMatrix) -> Result<(), PredictorError> {
        if let Some(diff) = self.schema.diff(matrix.schema()) {
            return Err(PredictorError::SchemaMismatch(format!(
                "matrix was built against another schema: {}",
                diff
            )));
        }
        if matrix.ncols() != self.schema.len() {
            return Err(PredictorError::FeatureCountMismatch {
                expected: self.schema.len(),
                actual: matrix.ncols(),
            });
        }
        Ok(())
    }

    /// Runs the model on every row of the matrix
    ///
    /// # Errors
    /// - `SchemaMismatch` / `FeatureCountMismatch` if the matrix does not match the schema
    /// - `RowCountMismatch` if the model returns a different number of rows
    /// - `PredictionError` if the model fails or returns labels outside {0, 1}
    ///   or malformed probability rows
    pub fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<Prediction>, PredictorError> {
        self.check_input(matrix)?;
        let rows = matrix.nrows();
        if rows == 0 {
            return Ok(Vec::new());
        }

        let (classes, proba) = self.model.predict_with_proba(matrix.view())?;
        if classes.len() != rows {
            return Err(PredictorError::RowCountMismatch { expected: rows, actual: classes.len() });
        }

        let probabilities = match proba {
            Some(proba) => {
                if proba.nrows() != rows {
                    return Err(PredictorError::RowCountMismatch { expected: rows, actual: proba.nrows() });
                }
                if proba.ncols() != 2 {
                    return Err(PredictorError::PredictionError(format!(
                        "expected 2 probability columns, got {}",
                        proba.ncols()
                    )));
                }
                proba
                    .rows()
                    .into_iter()
                    .map(|row| ClassProbabilities::new(row[0], row[1]).map(Some))
                    .collect::<Result<Vec<_>, _>>()?
            }
            None => vec![None; rows],
        };

        debug!("Classified {} rows", rows);
        classes
            .into_iter()
            .zip(probabilities)
            .map(|(class, probabilities)| {
                Ok(Prediction {
                    label: ViralLabel::from_class(class)?,
                    probabilities,
                })
            })
            .collect()
    }
}
