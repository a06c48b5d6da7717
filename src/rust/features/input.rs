use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::category::{
    ContentType, Platform, COMMENTS, CONTENT_TYPE_COLUMN, ENGAGEMENT_RATE, FOLLOWERS, HOUR, LIKES,
    PLATFORM_COLUMN, SHARES,
};

/// A single raw field value, before any encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<u32> for RawValue {
    fn from(value: u32) -> Self {
        RawValue::Number(f64::from(value))
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

/// Field name to value mapping for one post, as collected from the manual
/// form or from one uploaded row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawInput {
    fields: BTreeMap<String, RawValue>,
}

impl RawInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a field
    ///
    /// # Example
    /// ```
    /// use viral_predictor::RawInput;
    ///
    /// let input = RawInput::new()
    ///     .with("likes", 1000.0)
    ///     .with("platform", "Twitter");
    /// assert_eq!(input.len(), 2);
    /// ```
    pub fn with(mut self, field: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&RawValue> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K, V> FromIterator<(K, V)> for RawInput
where
    K: Into<String>,
    V: Into<RawValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// The manual prediction form. `engagement_rate` may be left out, in which
/// case it is derived from followers, likes and shares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualForm {
    pub followers: u32,
    pub likes: u32,
    pub shares: u32,
    pub comments: u32,
    pub engagement_rate: Option<f64>,
    pub hour: u32,
    pub platform: Platform,
    pub content_type: ContentType,
}

impl Default for ManualForm {
    fn default() -> Self {
        Self {
            followers: 50_000,
            likes: 1_000,
            shares: 100,
            comments: 50,
            engagement_rate: Some(0.05),
            hour: 12,
            platform: Platform::Facebook,
            content_type: ContentType::Image,
        }
    }
}

impl From<&ManualForm> for RawInput {
    fn from(form: &ManualForm) -> Self {
        let mut input = RawInput::new()
            .with(FOLLOWERS, form.followers)
            .with(LIKES, form.likes)
            .with(SHARES, form.shares)
            .with(COMMENTS, form.comments)
            .with(HOUR, form.hour)
            .with(PLATFORM_COLUMN, form.platform.name())
            .with(CONTENT_TYPE_COLUMN, form.content_type.name());
        if let Some(rate) = form.engagement_rate {
            input.insert(ENGAGEMENT_RATE, rate);
        }
        input
    }
}

impl From<ManualForm> for RawInput {
    fn from(form: ManualForm) -> Self {
        RawInput::from(&form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_form_conversion() {
        let form = ManualForm {
            platform: Platform::TikTok,
            content_type: ContentType::Video,
            engagement_rate: None,
            ..ManualForm::default()
        };
        let input = RawInput::from(&form);
        assert_eq!(input.get("followers"), Some(&RawValue::Number(50_000.0)));
        assert_eq!(input.get("platform"), Some(&RawValue::Text("TikTok".into())));
        assert_eq!(input.get("content_type"), Some(&RawValue::Text("Video".into())));
        assert!(!input.contains("engagement_rate"));
    }

    #[test]
    fn test_collect_from_pairs() {
        let input: RawInput = vec![("likes", "10"), ("platform", "Twitter")].into_iter().collect();
        assert_eq!(input.len(), 2);
        assert_eq!(input.get("likes"), Some(&RawValue::Text("10".into())));
    }
}
