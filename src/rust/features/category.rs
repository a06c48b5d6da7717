use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PredictorError;

/// Publishing platform of a post. The variant order is the one-hot order
/// the classifier was trained with, and also their sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Platform {
    Facebook,
    Instagram,
    LinkedIn,
    TikTok,
    Twitter,
    YouTube,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Facebook,
        Platform::Instagram,
        Platform::LinkedIn,
        Platform::TikTok,
        Platform::Twitter,
        Platform::YouTube,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Platform::Facebook => "Facebook",
            Platform::Instagram => "Instagram",
            Platform::LinkedIn => "LinkedIn",
            Platform::TikTok => "TikTok",
            Platform::Twitter => "Twitter",
            Platform::YouTube => "YouTube",
        }
    }

    /// Name of the indicator column for this platform
    pub fn feature_name(self) -> &'static str {
        match self {
            Platform::Facebook => "platform_Facebook",
            Platform::Instagram => "platform_Instagram",
            Platform::LinkedIn => "platform_LinkedIn",
            Platform::TikTok => "platform_TikTok",
            Platform::Twitter => "platform_Twitter",
            Platform::YouTube => "platform_YouTube",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = PredictorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        Platform::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(value))
            .ok_or_else(|| PredictorError::UnknownCategory {
                field: PLATFORM_COLUMN.to_string(),
                value: value.to_string(),
            })
    }
}

/// Media type of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Image,
    Video,
}

impl ContentType {
    pub const ALL: [ContentType; 2] = [ContentType::Image, ContentType::Video];

    pub fn name(self) -> &'static str {
        match self {
            ContentType::Image => "Image",
            ContentType::Video => "Video",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContentType {
    type Err = PredictorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        ContentType::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(value))
            .ok_or_else(|| PredictorError::UnknownCategory {
                field: CONTENT_TYPE_COLUMN.to_string(),
                value: value.to_string(),
            })
    }
}

pub const PLATFORM_COLUMN: &str = "platform";
pub const CONTENT_TYPE_COLUMN: &str = "content_type";
pub const IS_VIDEO_FEATURE: &str = "is_video";

const PLATFORM_FEATURES: [&str; 6] = [
    "platform_Facebook",
    "platform_Instagram",
    "platform_LinkedIn",
    "platform_TikTok",
    "platform_Twitter",
    "platform_YouTube",
];
const CONTENT_TYPE_FEATURES: [&str; 1] = [IS_VIDEO_FEATURE];

/// A raw categorical column and the fixed indicator layout it expands into.
///
/// Both the manual form and uploaded batches go through this type, so a
/// category can never produce an indicator column the schema does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoricalField {
    Platform,
    ContentType,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 2] = [CategoricalField::Platform, CategoricalField::ContentType];

    /// Looks up the categorical field stored under a raw column name
    pub fn from_column(column: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.column() == column)
    }

    /// Looks up the categorical field that owns an indicator feature
    pub fn owning(feature: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.indicator_features().iter().any(|name| *name == feature))
    }

    pub fn column(self) -> &'static str {
        match self {
            CategoricalField::Platform => PLATFORM_COLUMN,
            CategoricalField::ContentType => CONTENT_TYPE_COLUMN,
        }
    }

    pub fn indicator_features(self) -> &'static [&'static str] {
        match self {
            CategoricalField::Platform => &PLATFORM_FEATURES,
            CategoricalField::ContentType => &CONTENT_TYPE_FEATURES,
        }
    }

    /// Expands a raw category into `(feature, indicator)` pairs in layout order.
    ///
    /// # Errors
    /// - `UnknownCategory` if the value is outside the enumeration
    pub fn encode(self, value: &str) -> Result<Vec<(&'static str, f64)>, PredictorError> {
        match self {
            CategoricalField::Platform => {
                let platform: Platform = value.parse()?;
                Ok(Platform::ALL
                    .into_iter()
                    .map(|p| (p.feature_name(), if p == platform { 1.0 } else { 0.0 }))
                    .collect())
            }
            CategoricalField::ContentType => {
                let content: ContentType = value.parse()?;
                let is_video = if content == ContentType::Video { 1.0 } else { 0.0 };
                Ok(vec![(IS_VIDEO_FEATURE, is_video)])
            }
        }
    }

    /// Validates indicator values that were supplied already encoded.
    ///
    /// Every indicator must be 0 or 1. In a group with more than one
    /// indicator at most one may be set, and a complete group must have
    /// exactly one set. `present` holds the indicators the input carried.
    ///
    /// # Errors
    /// - `InvalidValue` if an indicator is not 0 or 1, or the group is not one-hot
    pub fn check_encoded(self, present: &[(&str, f64)]) -> Result<(), PredictorError> {
        for (feature, value) in present {
            if *value != 0.0 && *value != 1.0 {
                return Err(PredictorError::InvalidValue {
                    field: feature.to_string(),
                    reason: format!("indicator must be 0 or 1, got {}", value),
                });
            }
        }
        let layout = self.indicator_features();
        if layout.len() < 2 {
            return Ok(());
        }
        let set = present.iter().filter(|(_, v)| *v == 1.0).count();
        if set > 1 || (present.len() == layout.len() && set != 1) {
            return Err(PredictorError::InvalidValue {
                field: self.column().to_string(),
                reason: format!("encoded {} columns must have exactly one set, found {}", self.column(), set),
            });
        }
        Ok(())
    }
}

/// Inclusive bounds of a numeric input field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldBounds {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
}

pub const FOLLOWERS: &str = "followers";
pub const LIKES: &str = "likes";
pub const SHARES: &str = "shares";
pub const COMMENTS: &str = "comments";
pub const ENGAGEMENT_RATE: &str = "engagement_rate";
pub const HOUR: &str = "hour";

/// Fields the engagement rate is derived from.
pub const ENGAGEMENT_INPUTS: [&str; 3] = [FOLLOWERS, LIKES, SHARES];

/// Documented input bounds of the manual form.
pub const NUMERIC_FIELDS: [FieldBounds; 6] = [
    FieldBounds { name: FOLLOWERS, min: 0.0, max: 10_000_000.0 },
    FieldBounds { name: LIKES, min: 0.0, max: 1_000_000.0 },
    FieldBounds { name: SHARES, min: 0.0, max: 500_000.0 },
    FieldBounds { name: COMMENTS, min: 0.0, max: 100_000.0 },
    FieldBounds { name: ENGAGEMENT_RATE, min: 0.0, max: 1.0 },
    FieldBounds { name: HOUR, min: 0.0, max: 23.0 },
];

/// Returns the bounds for a feature, if it has documented ones.
/// Indicator features are bounded to [0, 1].
pub fn bounds_for(feature: &str) -> Option<FieldBounds> {
    if let Some(bounds) = NUMERIC_FIELDS.iter().find(|b| b.name == feature) {
        return Some(*bounds);
    }
    CategoricalField::ALL
        .iter()
        .flat_map(|field| field.indicator_features().iter())
        .find(|name| **name == feature)
        .map(|name| FieldBounds { name: *name, min: 0.0, max: 1.0 })
}

/// Rejects non-finite values and values outside the documented bounds.
pub fn check_range(feature: &str, value: f64) -> Result<(), PredictorError> {
    let (min, max) = match bounds_for(feature) {
        Some(b) => (b.min, b.max),
        None => (f64::MIN, f64::MAX),
    };
    if !value.is_finite() || value < min || value > max {
        return Err(PredictorError::InvalidRange {
            field: feature.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(())
}
