use std::sync::Arc;

use log::{info, warn};

use crate::artifacts::ArtifactStore;
use crate::classifier::{
    BatchPrediction, BatchRowPrediction, BinaryClassifier, ClassifierAdapter, OnnxClassifier, Prediction,
};
use crate::config::PredictorConfig;
use crate::error::PredictorError;
use crate::features::{
    build_vector, BatchReconciler, DatasetSummary, FeatureMatrix, FeatureSchema, ManualForm, RawInput,
    ReferenceCache, ReferenceData, ReferenceStats, SchemaOrigin, SchemaRegistry, Table, DEFAULT_LABEL_COLUMN,
};
use crate::runtime::RuntimeConfig;

/// Predicts whether a post goes viral, from a manual form or an uploaded table.
///
/// Both paths share one feature schema, resolved once when the predictor is
/// built, and one classifier guarded by that schema.
///
/// # Example
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use viral_predictor::{ManualForm, PredictorConfig, ArtifactStore, ViralPredictor};
///
/// let config = PredictorConfig::from_file("viral_predictor.toml")?;
/// let store = ArtifactStore::new_default()?;
/// let predictor = ViralPredictor::from_config(&config, &store)?;
///
/// let prediction = predictor.predict_form(&ManualForm::default())?;
/// println!("{}", prediction.label);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ViralPredictor {
    registry: SchemaRegistry,
    adapter: ClassifierAdapter,
    reconciler: BatchReconciler,
    stats: ReferenceStats,
    reference: Option<Arc<ReferenceData>>,
}

impl ViralPredictor {
    pub fn builder() -> PredictorBuilder {
        PredictorBuilder::new()
    }

    /// Builds a predictor from a configuration file's settings, resolving
    /// relative artifact paths through `store`
    ///
    /// # Errors
    /// - `ClassifierUnavailable` if no model path is configured, the artifact
    ///   is missing, its digest differs from the pinned one, or it cannot be loaded
    /// - `SchemaUnavailable` / `SchemaMismatch` as for [`PredictorBuilder::build`]
    pub fn from_config(config: &PredictorConfig, store: &ArtifactStore) -> Result<Self, PredictorError> {
        let mut builder = Self::builder().with_label_column(config.label_column.clone());

        if let Some(dataset) = &config.reference_dataset {
            let cache = ReferenceCache::new(store.locate(dataset), config.label_column.clone(), config.delimiter_byte());
            builder = builder.with_reference_cache(&cache);
        }
        if config.literal_schema {
            builder = builder.with_literal_schema(FeatureSchema::manual_form());
        }

        let model_path = config
            .model
            .path
            .as_ref()
            .map(|path| store.locate(path))
            .ok_or_else(|| PredictorError::ClassifierUnavailable("no model path configured".into()))?;
        store.verify(&model_path, config.model.sha256.as_deref())?;
        let model = OnnxClassifier::from_file_with_outputs(
            &model_path,
            &RuntimeConfig::from(&config.runtime),
            &config.model.label_output,
            &config.model.probability_output,
        )?;

        builder.with_boxed_classifier(Box::new(model)).build()
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.registry.get_schema()
    }

    pub fn schema_origin(&self) -> SchemaOrigin {
        self.registry.origin()
    }

    pub fn reference(&self) -> Option<&ReferenceData> {
        self.reference.as_deref()
    }

    pub fn reference_stats(&self) -> &ReferenceStats {
        &self.stats
    }

    /// Overview of the reference dataset, when one was loaded
    pub fn summary(&self) -> Option<DatasetSummary> {
        self.reference.as_ref().map(|reference| reference.summary())
    }

    /// Classifies one post
    ///
    /// The input is validated in full before the classifier runs.
    ///
    /// # Errors
    /// - `InvalidRange`, `MissingField`, `UnknownCategory` or `InvalidValue` for bad input
    /// - any error of [`ClassifierAdapter::predict`]
    pub fn predict(&self, raw: &RawInput) -> Result<Prediction, PredictorError> {
        let vector = build_vector(raw, self.schema())?;
        let matrix = FeatureMatrix::from(vector);
        self.adapter
            .predict(&matrix)?
            .into_iter()
            .next()
            .ok_or(PredictorError::RowCountMismatch { expected: 1, actual: 0 })
    }

    pub fn predict_form(&self, form: &ManualForm) -> Result<Prediction, PredictorError> {
        self.predict(&RawInput::from(form))
    }

    /// Classifies every row of an uploaded table
    ///
    /// Rows are aligned to the schema first. Every fallback applied to a row
    /// is returned with that row's prediction.
    ///
    /// # Errors
    /// - `EmptyProjection`, `SchemaMismatch` or `Row` from the reconciliation
    /// - any error of [`ClassifierAdapter::predict`]
    pub fn predict_batch(&self, table: &Table) -> Result<BatchPrediction, PredictorError> {
        let batch = self.reconciler.reconcile(table, self.schema(), &self.stats)?;
        let degraded_features: Vec<String> = batch.degraded_features().into_iter().map(String::from).collect();
        if !degraded_features.is_empty() {
            warn!("Degraded fill (0) used for features: {:?}", degraded_features);
        }

        let predictions = self.adapter.predict(batch.matrix())?;
        let dropped_columns = batch.dropped_columns().to_vec();
        let (_, fallbacks) = batch.into_parts();

        let rows: Vec<BatchRowPrediction> = predictions
            .into_iter()
            .zip(fallbacks)
            .map(|(prediction, fallbacks)| BatchRowPrediction { prediction, fallbacks })
            .collect();
        info!(
            "Batch classified: {} rows, {} viral",
            rows.len(),
            rows.iter().filter(|r| r.prediction.label.is_viral()).count()
        );

        Ok(BatchPrediction {
            rows,
            dropped_columns,
            degraded_features,
        })
    }
}

/// A builder for constructing a [`ViralPredictor`] with a fluent interface.
#[derive(Default)]
pub struct PredictorBuilder {
    reference: Option<Arc<ReferenceData>>,
    reference_error: Option<PredictorError>,
    literal_schema: Option<FeatureSchema>,
    reference_stats: Option<ReferenceStats>,
    classifier: Option<Box<dyn BinaryClassifier>>,
    label_column: Option<String>,
}

impl PredictorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an already loaded reference dataset for the schema and fill values
    pub fn with_reference(mut self, reference: Arc<ReferenceData>) -> Self {
        self.reference = Some(reference);
        self.reference_error = None;
        self
    }

    /// Loads the reference dataset through `cache`.
    ///
    /// A load failure is kept until [`build`](Self::build), where it is
    /// tolerated only when a literal schema is configured.
    pub fn with_reference_cache(mut self, cache: &ReferenceCache) -> Self {
        match cache.get() {
            Ok(reference) => return self.with_reference(reference),
            Err(e) => {
                warn!("Failed to load reference dataset {:?}: {}", cache.path(), e);
                self.reference = None;
                self.reference_error = Some(e);
            }
        }
        self
    }

    /// Sets the literal schema the derived one must equal, and the schema
    /// used when no reference dataset is available
    pub fn with_literal_schema(mut self, schema: FeatureSchema) -> Self {
        self.literal_schema = Some(schema);
        self
    }

    /// Overrides the batch fill values taken from the reference dataset
    pub fn with_reference_stats(mut self, stats: ReferenceStats) -> Self {
        self.reference_stats = Some(stats);
        self
    }

    pub fn with_classifier(self, classifier: impl BinaryClassifier + 'static) -> Self {
        self.with_boxed_classifier(Box::new(classifier))
    }

    pub fn with_boxed_classifier(mut self, classifier: Box<dyn BinaryClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Label column excluded from uploaded tables. Defaults to the reference
    /// dataset's label column, or `is_viral`.
    pub fn with_label_column(mut self, label_column: impl Into<String>) -> Self {
        self.label_column = Some(label_column.into());
        self
    }

    /// Resolves the schema and wraps the classifier
    ///
    /// # Errors
    /// - `SchemaUnavailable` if there is neither a reference dataset nor a literal schema
    /// - `SchemaMismatch` if the derived and literal schemas differ
    /// - `ClassifierUnavailable` if no classifier was given
    /// - `FeatureCountMismatch` if the classifier's input width differs from the schema
    pub fn build(self) -> Result<ViralPredictor, PredictorError> {
        if let Some(error) = self.reference_error {
            if self.literal_schema.is_none() {
                return Err(PredictorError::SchemaUnavailable(format!(
                    "reference dataset could not be loaded: {}",
                    error
                )));
            }
        }

        let derived = self.reference.as_ref().map(|reference| reference.schema().clone());
        let registry = SchemaRegistry::resolve(derived, self.literal_schema)?;

        let classifier = self
            .classifier
            .ok_or_else(|| PredictorError::ClassifierUnavailable("no classifier configured".into()))?;
        let adapter = ClassifierAdapter::new(registry.get_schema().clone(), classifier)?;

        let stats = match (self.reference_stats, &self.reference) {
            (Some(stats), _) => stats,
            (None, Some(reference)) => reference.stats().clone(),
            (None, None) => ReferenceStats::new(),
        };
        let label_column = self
            .label_column
            .or_else(|| self.reference.as_ref().map(|r| r.label_column().to_string()))
            .unwrap_or_else(|| DEFAULT_LABEL_COLUMN.to_string());

        info!(
            "Predictor ready: {} features ({:?}), {} fill values, label column '{}'",
            registry.get_schema().len(),
            registry.origin(),
            stats.len(),
            label_column
        );

        Ok(ViralPredictor {
            registry,
            adapter,
            reconciler: BatchReconciler::new(label_column),
            stats,
            reference: self.reference,
        })
    }
}
