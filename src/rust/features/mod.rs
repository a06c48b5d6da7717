mod batch;
mod category;
mod input;
mod reference;
mod schema;
mod table;
mod vector;

pub use batch::{reconcile, BatchReconciler, Fallback, FillCause, ReconciledBatch, DEFAULT_LABEL_COLUMN};
pub use category::{
    bounds_for, check_range, CategoricalField, ContentType, FieldBounds, Platform, NUMERIC_FIELDS,
};
pub use input::{ManualForm, RawInput, RawValue};
pub use reference::{
    derive_schema, ColumnSummary, DatasetSummary, PlatformEngagement, ReferenceCache, ReferenceData,
    ReferenceStats,
};
pub use schema::{FeatureSchema, SchemaOrigin, SchemaRegistry};
pub use table::Table;
pub use vector::{build_vector, derive_engagement_rate, FeatureMatrix, FeatureVector};
