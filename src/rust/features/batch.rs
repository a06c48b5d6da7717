use std::collections::HashSet;
use std::fmt;

use log::{info, warn};
use ndarray::Array2;

use super::category::{CategoricalField, ENGAGEMENT_INPUTS, ENGAGEMENT_RATE};
use super::input::RawInput;
use super::reference::ReferenceStats;
use super::schema::FeatureSchema;
use super::table::Table;
use super::vector::{expand, FeatureMatrix};
use crate::error::PredictorError;

pub const DEFAULT_LABEL_COLUMN: &str = "is_viral";

/// Why a feature had no value of its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillCause {
    /// The table has no column for the feature
    MissingColumn,
    /// The column exists but this row's cell is empty
    EmptyCell,
}

/// A value the reconciler supplied instead of reading it from the row.
#[derive(Debug, Clone, PartialEq)]
pub enum Fallback {
    /// Filled with the configured reference statistic
    ReferenceFill { feature: String, value: f64, cause: FillCause },
    /// No reference statistic configured, filled with 0
    DegradedFill { feature: String, cause: FillCause },
    /// Engagement rate computed from followers, likes and shares
    DerivedEngagement { value: f64 },
}

impl Fallback {
    pub fn feature(&self) -> &str {
        match self {
            Fallback::ReferenceFill { feature, .. } | Fallback::DegradedFill { feature, .. } => feature.as_str(),
            Fallback::DerivedEngagement { .. } => ENGAGEMENT_RATE,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Fallback::DegradedFill { .. })
    }
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fallback::ReferenceFill { feature, value, .. } => write!(f, "{}=reference({})", feature, value),
            Fallback::DegradedFill { feature, .. } => write!(f, "{}=degraded(0)", feature),
            Fallback::DerivedEngagement { value } => write!(f, "{}=derived({:.6})", ENGAGEMENT_RATE, value),
        }
    }
}

/// Result of aligning an uploaded table to the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledBatch {
    matrix: FeatureMatrix,
    fallbacks: Vec<Vec<Fallback>>,
    dropped_columns: Vec<String>,
}

impl ReconciledBatch {
    pub fn matrix(&self) -> &FeatureMatrix {
        &self.matrix
    }

    pub fn into_parts(self) -> (FeatureMatrix, Vec<Vec<Fallback>>) {
        (self.matrix, self.fallbacks)
    }

    /// Fallbacks applied to each row, in row order
    pub fn fallbacks(&self) -> &[Vec<Fallback>] {
        &self.fallbacks
    }

    /// Uploaded columns that played no part in the projection
    pub fn dropped_columns(&self) -> &[String] {
        &self.dropped_columns
    }

    /// Features filled with 0 on at least one row, in schema order
    pub fn degraded_features(&self) -> Vec<&str> {
        let degraded: HashSet<&str> = self
            .fallbacks
            .iter()
            .flatten()
            .filter(|f| f.is_degraded())
            .map(Fallback::feature)
            .collect();
        self.matrix
            .schema()
            .iter()
            .filter(|f| degraded.contains(f))
            .collect()
    }

    pub fn is_degraded(&self) -> bool {
        self.fallbacks.iter().flatten().any(Fallback::is_degraded)
    }
}

/// Aligns uploaded tables to a feature schema.
#[derive(Debug, Clone)]
pub struct BatchReconciler {
    label_column: String,
}

impl Default for BatchReconciler {
    fn default() -> Self {
        Self::new(DEFAULT_LABEL_COLUMN)
    }
}

/// How each uploaded column takes part in the projection
enum ColumnRole {
    Label,
    Categorical(CategoricalField),
    Numeric,
    Dropped,
}

impl BatchReconciler {
    pub fn new(label_column: impl Into<String>) -> Self {
        Self { label_column: label_column.into() }
    }

    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    fn role(&self, column: &str, schema: &FeatureSchema) -> ColumnRole {
        if column == self.label_column {
            ColumnRole::Label
        } else if let Some(categorical) = CategoricalField::from_column(column) {
            ColumnRole::Categorical(categorical)
        } else if schema.contains(column) || ENGAGEMENT_INPUTS.contains(&column) {
            ColumnRole::Numeric
        } else {
            ColumnRole::Dropped
        }
    }

    /// Projects every row of `table` onto `schema`.
    ///
    /// The label column is excluded, categorical columns are encoded with
    /// their fixed enumeration, unrelated columns are dropped, and schema
    /// features without a value are filled from `reference_stats` (or with
    /// 0, flagged as degraded). Every fill is recorded on its row.
    ///
    /// # Errors
    /// - `EmptyProjection` if no schema feature can be recovered from the table
    /// - `SchemaMismatch` if a categorical column and its encoded columns are both present
    /// - `Row` wrapping `UnknownCategory`, `InvalidRange` or `InvalidValue` for bad cells
    pub fn reconcile(
        &self,
        table: &Table,
        schema: &FeatureSchema,
        reference_stats: &ReferenceStats,
    ) -> Result<ReconciledBatch, PredictorError> {
        let mut used: Vec<(usize, &str)> = Vec::new();
        let mut dropped_columns = Vec::new();
        let mut covered: HashSet<&str> = HashSet::new();

        for (index, column) in table.headers().iter().enumerate() {
            match self.role(column, schema) {
                ColumnRole::Label => info!("Excluding label column '{}' from prediction input", column),
                ColumnRole::Categorical(categorical) => {
                    if let Some(encoded) = categorical
                        .indicator_features()
                        .iter()
                        .find(|f| table.has_column(f))
                    {
                        return Err(PredictorError::SchemaMismatch(format!(
                            "table has both '{}' and its encoded column '{}'",
                            column, encoded
                        )));
                    }
                    covered.extend(categorical.indicator_features().iter().copied().filter(|f| schema.contains(f)));
                    used.push((index, column.as_str()));
                }
                ColumnRole::Numeric => {
                    if schema.contains(column) {
                        covered.insert(column);
                    }
                    used.push((index, column.as_str()));
                }
                ColumnRole::Dropped => dropped_columns.push(column.clone()),
            }
        }

        if schema.contains(ENGAGEMENT_RATE) && ENGAGEMENT_INPUTS.iter().all(|c| table.has_column(c)) {
            covered.insert(ENGAGEMENT_RATE);
        }
        if covered.is_empty() {
            return Err(PredictorError::EmptyProjection);
        }

        if !dropped_columns.is_empty() {
            warn!("Dropping columns not used by the schema: {:?}", dropped_columns);
        }
        for feature in schema.iter().filter(|f| !covered.contains(f)) {
            match reference_stats.get(feature) {
                Some(value) => info!("Column '{}' missing, filling with reference value {}", feature, value),
                None => warn!("Column '{}' missing and no reference value configured, filling with 0", feature),
            }
        }

        let mut values = Array2::zeros((table.len(), schema.len()));
        let mut fallbacks = Vec::with_capacity(table.len());

        for (row_index, row) in table.rows().iter().enumerate() {
            let raw: RawInput = used
                .iter()
                .filter(|(i, _)| !row[*i].is_empty())
                .map(|(i, column)| (*column, row[*i].as_str()))
                .collect();
            let (expanded, derived) = expand(&raw, schema).map_err(|e| e.at_row(row_index))?;

            let mut row_fallbacks = Vec::new();
            if derived {
                if let Some(&value) = expanded.get(ENGAGEMENT_RATE) {
                    row_fallbacks.push(Fallback::DerivedEngagement { value });
                }
            }

            for (col, feature) in schema.iter().enumerate() {
                let value = match expanded.get(feature) {
                    Some(&value) => value,
                    None => {
                        let cause = if has_source_column(table, feature) {
                            FillCause::EmptyCell
                        } else {
                            FillCause::MissingColumn
                        };
                        match reference_stats.get(feature) {
                            Some(value) => {
                                row_fallbacks.push(Fallback::ReferenceFill {
                                    feature: feature.to_string(),
                                    value,
                                    cause,
                                });
                                value
                            }
                            None => {
                                row_fallbacks.push(Fallback::DegradedFill {
                                    feature: feature.to_string(),
                                    cause,
                                });
                                0.0
                            }
                        }
                    }
                };
                values[[row_index, col]] = value;
            }
            fallbacks.push(row_fallbacks);
        }

        Ok(ReconciledBatch {
            matrix: FeatureMatrix::from_array(schema.clone(), values),
            fallbacks,
            dropped_columns,
        })
    }
}

/// Whether a column of `table` carries `feature`, directly or as the raw
/// categorical column it is encoded from. A derivable engagement rate has
/// no column of its own.
fn has_source_column(table: &Table, feature: &str) -> bool {
    table.has_column(feature) || CategoricalField::owning(feature).is_some_and(|c| table.has_column(c.column()))
}

/// Projects `table` onto `schema` using the default `is_viral` label column.
pub fn reconcile(
    table: &Table,
    schema: &FeatureSchema,
    reference_stats: &ReferenceStats,
) -> Result<ReconciledBatch, PredictorError> {
    BatchReconciler::default().reconcile(table, schema, reference_stats)
}
