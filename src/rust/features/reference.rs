use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use super::category::{CategoricalField, Platform, ENGAGEMENT_RATE, PLATFORM_COLUMN};
use super::schema::FeatureSchema;
use super::table::Table;
use crate::error::PredictorError;

/// Per-feature fallback values used to fill features an upload lacks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceStats {
    values: BTreeMap<String, f64>,
}

impl ReferenceStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, feature: impl Into<String>, value: f64) -> Self {
        self.values.insert(feature.into(), value);
        self
    }

    pub fn get(&self, feature: &str) -> Option<f64> {
        self.values.get(feature).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for ReferenceStats {
    fn from_iter<T: IntoIterator<Item = (K, f64)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Derives the feature schema of a dataset: columns in file order, label
/// excluded, categorical columns expanded with their fixed indicator
/// layout, other text columns skipped.
pub fn derive_schema(table: &Table, label_column: &str) -> Result<FeatureSchema, PredictorError> {
    let mut names = Vec::new();
    for header in table.headers() {
        if header == label_column {
            continue;
        }
        if let Some(categorical) = CategoricalField::from_column(header) {
            names.extend(categorical.indicator_features().iter().map(|s| s.to_string()));
        } else if table.is_numeric_column(header) {
            names.push(header.clone());
        } else {
            debug!("Skipping non-numeric reference column '{}'", header);
        }
    }
    FeatureSchema::new(names)
}

/// Mean of every schema feature over the dataset, empty cells ignored.
fn feature_means(table: &Table, schema: &FeatureSchema) -> Result<ReferenceStats, PredictorError> {
    let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();

    for (row_index, row) in table.rows().iter().enumerate() {
        for (header, cell) in table.headers().iter().zip(row) {
            if cell.is_empty() {
                continue;
            }
            if let Some(categorical) = CategoricalField::from_column(header) {
                let encoded = categorical.encode(cell).map_err(|e| e.at_row(row_index))?;
                for (feature, value) in encoded {
                    let entry = sums.entry(feature).or_insert((0.0, 0));
                    entry.0 += value;
                    entry.1 += 1;
                }
            } else if schema.contains(header) {
                let value: f64 = cell.parse().map_err(|_| {
                    PredictorError::InvalidValue {
                        field: header.clone(),
                        reason: format!("'{}' is not a number", cell),
                    }
                    .at_row(row_index)
                })?;
                let entry = sums.entry(header.as_str()).or_insert((0.0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
        }
    }

    Ok(schema
        .iter()
        .filter_map(|feature| {
            sums.get(feature)
                .filter(|(_, n)| *n > 0)
                .map(|(sum, n)| (feature, sum / *n as f64))
        })
        .collect())
}

/// The reference (training) dataset, its derived schema and fill statistics.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    table: Table,
    label_column: String,
    schema: FeatureSchema,
    stats: ReferenceStats,
}

impl ReferenceData {
    /// Loads the reference dataset from a delimited file
    ///
    /// # Errors
    /// - `Io` / `Csv` if the file cannot be read
    /// - `SchemaUnavailable` if required columns are missing or no schema can be derived
    pub fn load<P: AsRef<Path>>(path: P, label_column: &str, delimiter: u8) -> Result<Self, PredictorError> {
        let table = Table::from_path(path, delimiter)?;
        Self::from_table(table, label_column)
    }

    pub fn from_table(table: Table, label_column: &str) -> Result<Self, PredictorError> {
        for required in [label_column, PLATFORM_COLUMN, ENGAGEMENT_RATE] {
            if !table.has_column(required) {
                return Err(PredictorError::SchemaUnavailable(format!(
                    "reference dataset has no '{}' column",
                    required
                )));
            }
        }
        let schema = derive_schema(&table, label_column)?;
        let stats = feature_means(&table, &schema)?;
        info!(
            "Reference dataset ready: {} rows, {} features, {} fill values",
            table.len(),
            schema.len(),
            stats.len()
        );
        Ok(Self {
            table,
            label_column: label_column.to_string(),
            schema,
            stats,
        })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn stats(&self) -> &ReferenceStats {
        &self.stats
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary::compute(&self.table, &self.label_column)
    }
}

/// Lazily loaded, immutable copy of the reference dataset.
///
/// The file is read on first access and shared for the rest of the
/// process. A failed load is not cached, so a later call retries.
#[derive(Debug)]
pub struct ReferenceCache {
    path: PathBuf,
    label_column: String,
    delimiter: u8,
    cell: OnceCell<Arc<ReferenceData>>,
}

impl ReferenceCache {
    pub fn new(path: impl Into<PathBuf>, label_column: impl Into<String>, delimiter: u8) -> Self {
        Self {
            path: path.into(),
            label_column: label_column.into(),
            delimiter,
            cell: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Returns the cached dataset, loading it on first use
    pub fn get(&self) -> Result<Arc<ReferenceData>, PredictorError> {
        let data = self.cell.get_or_try_init(|| {
            info!("Loading reference dataset from {:?}", self.path);
            ReferenceData::load(&self.path, &self.label_column, self.delimiter).map(Arc::new)
        })?;
        Ok(Arc::clone(data))
    }
}

/// `describe`-style statistics of one numeric column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation, undefined below two values
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
}

impl ColumnSummary {
    fn from_values(name: &str, values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let std = (count > 1).then(|| {
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            var.sqrt()
        });
        Some(Self {
            name: name.to_string(),
            count,
            mean,
            std,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformEngagement {
    pub platform: Platform,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
}

/// Overview of a labelled dataset: size, class balance, numeric columns
/// and engagement rate per platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub total_rows: usize,
    pub viral: usize,
    pub not_viral: usize,
    pub columns: Vec<ColumnSummary>,
    pub engagement_by_platform: Vec<PlatformEngagement>,
}

impl DatasetSummary {
    pub fn compute(table: &Table, label_column: &str) -> Self {
        let (mut viral, mut not_viral) = (0, 0);
        if let Some(labels) = table.column(label_column) {
            for label in labels {
                match label.parse::<f64>() {
                    Ok(v) if v == 1.0 => viral += 1,
                    Ok(v) if v == 0.0 => not_viral += 1,
                    _ => {}
                }
            }
        }

        let columns = table
            .headers()
            .iter()
            .filter(|h| table.is_numeric_column(h))
            .filter_map(|h| {
                let values: Vec<f64> = table
                    .column(h)?
                    .filter_map(|c| c.parse::<f64>().ok())
                    .collect();
                ColumnSummary::from_values(h, &values)
            })
            .collect();

        Self {
            total_rows: table.len(),
            viral,
            not_viral,
            columns,
            engagement_by_platform: Self::engagement_by_platform(table),
        }
    }

    fn engagement_by_platform(table: &Table) -> Vec<PlatformEngagement> {
        let (Some(platform_idx), Some(rate_idx)) =
            (table.column_index(PLATFORM_COLUMN), table.column_index(ENGAGEMENT_RATE))
        else {
            return Vec::new();
        };

        let mut groups: BTreeMap<Platform, Vec<f64>> = BTreeMap::new();
        for row in table.rows() {
            let Ok(platform) = row[platform_idx].parse::<Platform>() else {
                continue;
            };
            let Ok(rate) = row[rate_idx].parse::<f64>() else {
                continue;
            };
            groups.entry(platform).or_default().push(rate);
        }

        groups
            .into_iter()
            .map(|(platform, mut rates)| {
                rates.sort_by(f64::total_cmp);
                let n = rates.len();
                let median = if n % 2 == 1 {
                    rates[n / 2]
                } else {
                    (rates[n / 2 - 1] + rates[n / 2]) / 2.0
                };
                PlatformEngagement {
                    platform,
                    count: n,
                    mean: rates.iter().sum::<f64>() / n as f64,
                    median,
                }
            })
            .collect()
    }
}
