use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use log::{info, warn};

use super::category::{
    CategoricalField, COMMENTS, ENGAGEMENT_RATE, FOLLOWERS, HOUR, IS_VIDEO_FEATURE, LIKES, SHARES,
};
use crate::error::PredictorError;

/// Ordered, duplicate-free list of feature names the classifier was trained on.
///
/// Cloning is cheap: the names live behind an `Arc`, so every vector and
/// matrix built against a schema can carry it along.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Arc<[String]>,
}

impl FeatureSchema {
    /// Creates a schema from an ordered list of feature names
    ///
    /// # Errors
    /// - `SchemaUnavailable` if the list is empty, or a name is empty or repeated
    pub fn new<I, S>(names: I) -> Result<Self, PredictorError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(PredictorError::SchemaUnavailable("Feature schema cannot be empty".into()));
        }
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if name.is_empty() {
                return Err(PredictorError::SchemaUnavailable("Feature name cannot be empty".into()));
            }
            if !seen.insert(name.as_str()) {
                return Err(PredictorError::SchemaUnavailable(format!(
                    "Feature '{}' appears more than once",
                    name
                )));
            }
        }
        Ok(Self { names: names.into() })
    }

    /// The 13-feature layout of the manual prediction form.
    pub fn manual_form() -> Self {
        let mut names: Vec<String> = [FOLLOWERS, LIKES, SHARES, COMMENTS, ENGAGEMENT_RATE, HOUR]
            .iter()
            .map(|s| s.to_string())
            .collect();
        names.extend(
            CategoricalField::Platform
                .indicator_features()
                .iter()
                .map(|s| s.to_string()),
        );
        names.push(IS_VIDEO_FEATURE.to_string());
        Self { names: names.into() }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.position(feature).is_some()
    }

    pub fn position(&self, feature: &str) -> Option<usize> {
        self.names.iter().position(|n| n == feature)
    }

    /// Describes how `other` differs from this schema, or `None` when equal.
    pub fn diff(&self, other: &FeatureSchema) -> Option<String> {
        if self == other {
            return None;
        }
        let missing: Vec<&str> = self.iter().filter(|n| !other.contains(n)).collect();
        let extra: Vec<&str> = other.iter().filter(|n| !self.contains(n)).collect();
        if missing.is_empty() && extra.is_empty() {
            let first = self
                .iter()
                .zip(other.iter())
                .position(|(a, b)| a != b)
                .unwrap_or(0);
            return Some(format!(
                "same features in a different order (first difference at position {}: '{}' vs '{}')",
                first, self.names[first], other.names[first]
            ));
        }
        Some(format!("missing {:?}, unexpected {:?}", missing, extra))
    }
}

impl fmt::Display for FeatureSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.names.join(", "))
    }
}

/// Where the registry's schema came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaOrigin {
    /// Derived from the reference dataset and confirmed against the literal list
    Verified,
    /// Derived from the reference dataset, no literal list configured
    Derived,
    /// Literal list only; the reference dataset was not available
    Literal,
}

/// Holds the one schema shared by the manual and batch prediction paths.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schema: FeatureSchema,
    origin: SchemaOrigin,
}

impl SchemaRegistry {
    /// Resolves the canonical schema from a derived and a literal candidate.
    ///
    /// When both are present they must be identical, names and order.
    ///
    /// # Errors
    /// - `SchemaMismatch` if derived and literal schemas differ
    /// - `SchemaUnavailable` if neither is available
    pub fn resolve(
        derived: Option<FeatureSchema>,
        literal: Option<FeatureSchema>,
    ) -> Result<Self, PredictorError> {
        match (derived, literal) {
            (Some(derived), Some(literal)) => {
                if let Some(diff) = literal.diff(&derived) {
                    return Err(PredictorError::SchemaMismatch(format!(
                        "reference dataset schema differs from the literal schema: {}",
                        diff
                    )));
                }
                info!("Feature schema verified ({} features)", derived.len());
                Ok(Self { schema: derived, origin: SchemaOrigin::Verified })
            }
            (Some(derived), None) => {
                info!("Feature schema derived from reference dataset ({} features)", derived.len());
                Ok(Self { schema: derived, origin: SchemaOrigin::Derived })
            }
            (None, Some(literal)) => {
                warn!("Reference dataset unavailable, using literal feature schema");
                Ok(Self { schema: literal, origin: SchemaOrigin::Literal })
            }
            (None, None) => Err(PredictorError::SchemaUnavailable(
                "reference dataset unavailable and no literal schema configured".into(),
            )),
        }
    }

    pub fn get_schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn origin(&self) -> SchemaOrigin {
        self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_form_layout() {
        let schema = FeatureSchema::manual_form();
        assert_eq!(schema.len(), 13);
        assert_eq!(schema.names()[0], "followers");
        assert_eq!(schema.names()[5], "hour");
        assert_eq!(schema.names()[10], "platform_Twitter");
        assert_eq!(schema.names()[12], "is_video");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = FeatureSchema::new(["likes", "shares", "likes"]).unwrap_err();
        assert!(matches!(err, PredictorError::SchemaUnavailable(_)));
        assert!(FeatureSchema::new(Vec::<String>::new()).is_err());
    }

    #[test]
    fn test_diff_reports_order() {
        let a = FeatureSchema::new(["likes", "shares"]).unwrap();
        let b = FeatureSchema::new(["shares", "likes"]).unwrap();
        let diff = a.diff(&b).unwrap();
        assert!(diff.contains("different order"));
        assert!(a.diff(&a.clone()).is_none());
    }

    #[test]
    fn test_resolve_prefers_verified() {
        let registry = SchemaRegistry::resolve(
            Some(FeatureSchema::manual_form()),
            Some(FeatureSchema::manual_form()),
        )
        .unwrap();
        assert_eq!(registry.origin(), SchemaOrigin::Verified);
    }

    #[test]
    fn test_resolve_mismatch_fails_fast() {
        let derived = FeatureSchema::new(["likes", "followers"]).unwrap();
        let err = SchemaRegistry::resolve(Some(derived), Some(FeatureSchema::manual_form())).unwrap_err();
        assert!(matches!(err, PredictorError::SchemaMismatch(_)));
    }

    #[test]
    fn test_resolve_without_sources() {
        let err = SchemaRegistry::resolve(None, None).unwrap_err();
        assert!(matches!(err, PredictorError::SchemaUnavailable(_)));
        let literal = SchemaRegistry::resolve(None, Some(FeatureSchema::manual_form())).unwrap();
        assert_eq!(literal.origin(), SchemaOrigin::Literal);
    }
}
