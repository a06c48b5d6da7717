use std::collections::BTreeMap;

use log::debug;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use super::category::{check_range, CategoricalField, ENGAGEMENT_INPUTS, ENGAGEMENT_RATE, FOLLOWERS, LIKES, SHARES};
use super::input::{RawInput, RawValue};
use super::schema::FeatureSchema;
use crate::error::PredictorError;

/// One row of numeric features, laid out in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    schema: FeatureSchema,
    values: Array1<f64>,
}

impl FeatureVector {
    pub(crate) fn new(schema: FeatureSchema, values: Vec<f64>) -> Self {
        debug_assert_eq!(schema.len(), values.len());
        Self { schema, values: Array1::from(values) }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.to_vec()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a named feature
    pub fn get(&self, feature: &str) -> Option<f64> {
        self.schema.position(feature).map(|i| self.values[i])
    }
}

/// Rows of feature vectors sharing one schema, ready for the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    schema: FeatureSchema,
    values: Array2<f64>,
}

impl FeatureMatrix {
    /// Stacks vectors built against `schema` into a matrix.
    ///
    /// # Errors
    /// - `SchemaMismatch` if a vector was built against a different schema
    pub fn from_vectors(
        schema: &FeatureSchema,
        vectors: &[FeatureVector],
    ) -> Result<Self, PredictorError> {
        let mut values = Array2::zeros((vectors.len(), schema.len()));
        for (i, vector) in vectors.iter().enumerate() {
            if let Some(diff) = schema.diff(vector.schema()) {
                return Err(PredictorError::SchemaMismatch(format!("vector {}: {}", i, diff)));
            }
            values.row_mut(i).assign(&vector.values);
        }
        Ok(Self { schema: schema.clone(), values })
    }

    pub(crate) fn from_array(schema: FeatureSchema, values: Array2<f64>) -> Self {
        debug_assert_eq!(schema.len(), values.ncols());
        Self { schema, values }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// Copies one row out as a vector
    pub fn row(&self, index: usize) -> Option<FeatureVector> {
        (index < self.nrows()).then(|| FeatureVector {
            schema: self.schema.clone(),
            values: self.values.row(index).to_owned(),
        })
    }
}

impl From<FeatureVector> for FeatureMatrix {
    fn from(vector: FeatureVector) -> Self {
        Self {
            schema: vector.schema,
            values: vector.values.insert_axis(Axis(0)),
        }
    }
}

/// Engagement rate used when none is supplied: `(likes + shares) / max(followers, 1)`.
pub fn derive_engagement_rate(followers: f64, likes: f64, shares: f64) -> f64 {
    (likes + shares) / followers.max(1.0)
}

/// Expands raw fields into named numeric features.
///
/// Numeric fields are range-checked, categorical fields are one-hot encoded
/// with their fixed enumeration and the engagement rate is derived when it
/// is absent but its inputs are present. Fields that are neither schema
/// features, categorical columns nor engagement inputs are skipped. The
/// returned flag tells whether the derivation happened.
pub(crate) fn expand(
    raw: &RawInput,
    schema: &FeatureSchema,
) -> Result<(BTreeMap<String, f64>, bool), PredictorError> {
    for categorical in CategoricalField::ALL {
        if raw.contains(categorical.column()) {
            if let Some(indicator) = categorical.indicator_features().iter().find(|f| raw.contains(f)) {
                return Err(PredictorError::SchemaMismatch(format!(
                    "input has both '{}' and its encoded field '{}'",
                    categorical.column(),
                    indicator
                )));
            }
        }
    }

    let mut expanded = BTreeMap::new();

    for (field, value) in raw.iter() {
        if let Some(categorical) = CategoricalField::from_column(field) {
            let text = match value {
                RawValue::Text(text) => text,
                RawValue::Number(n) => {
                    return Err(PredictorError::InvalidValue {
                        field: field.to_string(),
                        reason: format!("expected a category name, got number {}", n),
                    })
                }
            };
            for (feature, indicator) in categorical.encode(text)? {
                expanded.insert(feature.to_string(), indicator);
            }
            continue;
        }

        if !schema.contains(field) && !ENGAGEMENT_INPUTS.contains(&field) {
            debug!("Ignoring field '{}' not used by the schema", field);
            continue;
        }

        let number = match value {
            RawValue::Number(n) => *n,
            RawValue::Text(text) => text.trim().parse::<f64>().map_err(|_| PredictorError::InvalidValue {
                field: field.to_string(),
                reason: format!("'{}' is not a number", text),
            })?,
        };
        check_range(field, number)?;
        expanded.insert(field.to_string(), number);
    }

    for categorical in CategoricalField::ALL {
        if raw.contains(categorical.column()) {
            continue;
        }
        let present: Vec<(&str, f64)> = categorical
            .indicator_features()
            .iter()
            .filter_map(|f| expanded.get(*f).map(|v| (*f, *v)))
            .collect();
        if !present.is_empty() {
            categorical.check_encoded(&present)?;
        }
    }

    let mut derived = false;
    if !expanded.contains_key(ENGAGEMENT_RATE) {
        if let (Some(&followers), Some(&likes), Some(&shares)) =
            (expanded.get(FOLLOWERS), expanded.get(LIKES), expanded.get(SHARES))
        {
            let rate = derive_engagement_rate(followers, likes, shares);
            check_range(ENGAGEMENT_RATE, rate)?;
            debug!("Derived engagement_rate {} from followers/likes/shares", rate);
            expanded.insert(ENGAGEMENT_RATE.to_string(), rate);
            derived = true;
        }
    }

    Ok((expanded, derived))
}

/// Builds the feature vector of one raw input, in exact schema order.
///
/// # Errors
/// - `InvalidRange` if a numeric field or the derived engagement rate is outside its bounds
/// - `UnknownCategory` if a categorical value is outside its enumeration
/// - `InvalidValue` if a field holds the wrong kind of value or encoded
///   indicators are not one-hot
/// - `SchemaMismatch` if a categorical field is given both raw and encoded
/// - `MissingField` if a schema feature has no value and cannot be derived
///
/// # Example
/// ```
/// use viral_predictor::{build_vector, FeatureSchema, RawInput};
///
/// let input = RawInput::new()
///     .with("followers", 50_000.0)
///     .with("likes", 1000.0)
///     .with("shares", 100.0)
///     .with("comments", 50.0)
///     .with("engagement_rate", 0.05)
///     .with("hour", 12.0)
///     .with("platform", "Twitter")
///     .with("content_type", "Image");
/// let vector = build_vector(&input, &FeatureSchema::manual_form()).unwrap();
/// assert_eq!(vector.get("platform_Twitter"), Some(1.0));
/// ```
pub fn build_vector(raw: &RawInput, schema: &FeatureSchema) -> Result<FeatureVector, PredictorError> {
    let (expanded, _) = expand(raw, schema)?;

    let mut values = Vec::with_capacity(schema.len());
    for feature in schema.iter() {
        match expanded.get(feature) {
            Some(&value) => values.push(value),
            None => {
                let field = CategoricalField::owning(feature)
                    .map(|c| c.column())
                    .unwrap_or(feature);
                return Err(PredictorError::MissingField(field.to_string()));
            }
        }
    }

    for field in expanded.keys().filter(|k| !schema.contains(k)) {
        debug!("Ignoring field '{}' not used by the schema", field);
    }

    Ok(FeatureVector::new(schema.clone(), values))
}
