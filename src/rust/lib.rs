//! Social media virality prediction around an already trained binary classifier.
//!
//! A post is described either through a manual form or as one row of an
//! uploaded table. Both are aligned to the single feature schema the
//! classifier was trained on, and the classifier is never called with a
//! vector that does not match that schema.
//!
//! # Basic Usage
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use ndarray::ArrayView2;
//! use viral_predictor::{BinaryClassifier, FeatureSchema, ManualForm, PredictorError, ViralPredictor};
//!
//! // Any trained model can sit behind the `BinaryClassifier` trait.
//! struct EngagementThreshold;
//!
//! impl BinaryClassifier for EngagementThreshold {
//!     fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<i64>, PredictorError> {
//!         Ok(features.rows().into_iter().map(|row| i64::from(row[4] > 0.1)).collect())
//!     }
//! }
//!
//! let predictor = ViralPredictor::builder()
//!     .with_literal_schema(FeatureSchema::manual_form())
//!     .with_classifier(EngagementThreshold)
//!     .build()?;
//!
//! let prediction = predictor.predict_form(&ManualForm::default())?;
//! println!("Predicted: {}", prediction.label);
//! # Ok(())
//! # }
//! ```
//!
//! # Batch Usage
//!
//! Uploaded tables may miss schema columns or carry extra ones. Missing
//! features are filled from the reference dataset statistics and every fill
//! is reported with its row:
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # use ndarray::ArrayView2;
//! # use viral_predictor::{BinaryClassifier, FeatureSchema, PredictorError, ViralPredictor};
//! # struct NeverViral;
//! # impl BinaryClassifier for NeverViral {
//! #     fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<i64>, PredictorError> {
//! #         Ok(vec![0; features.nrows()])
//! #     }
//! # }
//! use viral_predictor::Table;
//!
//! let predictor = ViralPredictor::builder()
//!     .with_literal_schema(FeatureSchema::manual_form())
//!     .with_classifier(NeverViral)
//!     .build()?;
//!
//! let table = Table::from_reader("platform,likes\nTikTok,900\n".as_bytes(), b',')?;
//! let result = predictor.predict_batch(&table)?;
//! for row in &result.rows {
//!     println!("{} ({} fallbacks)", row.prediction.label, row.fallbacks.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod artifacts;
pub mod classifier;
pub mod config;
mod error;
pub mod features;
mod predictor;
mod runtime;

pub use artifacts::{ArtifactStore, HOME_ENV};
pub use classifier::{
    BatchPrediction, BatchRowPrediction, BinaryClassifier, ClassProbabilities, ClassifierAdapter, OnnxClassifier,
    Prediction, ViralLabel,
};
pub use config::{ModelConfig, PredictorConfig, RuntimeSettings};
pub use error::PredictorError;
pub use features::{
    build_vector, reconcile, ContentType, DatasetSummary, Fallback, FeatureMatrix, FeatureSchema, FeatureVector,
    FillCause, ManualForm, Platform, RawInput, RawValue, ReconciledBatch, ReferenceCache, ReferenceData,
    ReferenceStats, SchemaOrigin, SchemaRegistry, Table,
};
pub use predictor::{PredictorBuilder, ViralPredictor};
pub use runtime::{create_session_builder, RuntimeConfig};

pub fn init_logger() {
    env_logger::init();
}
