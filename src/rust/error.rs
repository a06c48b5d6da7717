use std::io;

/// Represents the different types of errors that can occur while aligning
/// features and running the virality classifier.
#[derive(Debug, thiserror::Error)]
pub enum PredictorError {
    /// The feature schema could not be resolved
    #[error("Schema unavailable: {0}")]
    SchemaUnavailable(String),
    /// Two schemas that must agree do not
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error("Field '{field}' out of range: {value} is not within [{min}, {max}]")]
    InvalidRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("Missing required field '{0}'")]
    MissingField(String),
    #[error("Unknown {field} category '{value}'")]
    UnknownCategory { field: String, value: String },
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("No schema column could be recovered from the uploaded table")]
    EmptyProjection,
    #[error("Classifier returned {actual} rows for {expected} input rows")]
    RowCountMismatch { expected: usize, actual: usize },
    #[error("Feature count mismatch: expected {expected}, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },
    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(String),
    #[error("Prediction error: {0}")]
    PredictionError(String),
    /// A validation error raised on one row of a batch (0-based index)
    #[error("Row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: Box<PredictorError>,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PredictorError {
    pub(crate) fn at_row(self, row: usize) -> Self {
        PredictorError::Row {
            row,
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, looking through batch row wrappers.
    pub fn root(&self) -> &PredictorError {
        match self {
            PredictorError::Row { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns true for errors caused by the caller's input rather than by
    /// the schema, the classifier or the environment.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.root(),
            PredictorError::InvalidRange { .. }
                | PredictorError::MissingField(_)
                | PredictorError::UnknownCategory { .. }
                | PredictorError::InvalidValue { .. }
                | PredictorError::EmptyProjection
        )
    }
}

impl From<ort::Error> for PredictorError {
    fn from(err: ort::Error) -> Self {
        PredictorError::PredictionError(err.to_string())
    }
}
